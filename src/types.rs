//! Core types for downloads-catalog

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use utoipa::ToSchema;

use crate::error::ValidationError;
use crate::terms::TermSet;
use crate::text::sanitize_text;

/// Unique identifier for a download record
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct DownloadId(pub i64);

impl DownloadId {
    /// Create a new DownloadId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for DownloadId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<DownloadId> for i64 {
    fn from(id: DownloadId) -> Self {
        id.0
    }
}

impl std::fmt::Display for DownloadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DownloadId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl sqlx::Type<sqlx::Sqlite> for DownloadId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for DownloadId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for DownloadId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let id = <i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(id))
    }
}

/// How a download is delivered
///
/// Deserialization is lenient: any unknown value falls back to [`FileSource::Media`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileSource {
    /// Attachment in the media library, referenced by `file_id`
    #[default]
    Media,
    /// External URL stored in `direct_url`
    Direct,
}

impl FileSource {
    /// Storage/wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FileSource::Media => "media",
            FileSource::Direct => "direct",
        }
    }

    /// Parse, falling back to `Media` for anything unrecognized
    pub fn from_str_lossy(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => FileSource::Direct,
            _ => FileSource::Media,
        }
    }
}

impl<'de> Deserialize<'de> for FileSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_str_lossy(&raw))
    }
}

/// Publication status
///
/// Deserialization is lenient: anything other than `draft` is `publish`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    /// Visible on public listings and deliverable
    #[default]
    Publish,
    /// Hidden from public reads; treated as absent
    Draft,
}

impl DownloadStatus {
    /// Storage/wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadStatus::Publish => "publish",
            DownloadStatus::Draft => "draft",
        }
    }

    /// Parse, falling back to `Publish` for anything unrecognized
    pub fn from_str_lossy(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => DownloadStatus::Draft,
            _ => DownloadStatus::Publish,
        }
    }

    /// Parse a status filter: empty means "any status"
    pub fn filter_from_str(s: &str) -> Option<Self> {
        if s.trim().is_empty() {
            None
        } else {
            Some(Self::from_str_lossy(s))
        }
    }
}

impl<'de> Deserialize<'de> for DownloadStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_str_lossy(&raw))
    }
}

impl Serialize for TermSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_csv())
    }
}

impl<'de> Deserialize<'de> for TermSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(TermSet::parse(&raw))
    }
}

/// A persisted download record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DownloadRecord {
    /// Store-assigned identifier
    pub id: DownloadId,
    /// Display title
    pub title: String,
    /// URL-friendly slug (not unique)
    pub slug: String,
    /// Rich text description
    pub description: String,
    /// Explicit excerpt; empty means "derive from description"
    pub excerpt: String,
    /// Featured image asset (0 = none)
    pub featured_image_id: i64,
    /// Delivery strategy
    pub file_source: FileSource,
    /// Media attachment (only meaningful for `media`)
    pub file_id: i64,
    /// External URL (only meaningful for `direct`)
    pub direct_url: String,
    /// Category membership
    #[schema(value_type = String)]
    pub categories: TermSet,
    /// Tag membership
    #[schema(value_type = String)]
    pub tags: TermSet,
    /// Number of tracked downloads
    pub download_count: u64,
    /// Publication status
    pub status: DownloadStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl DownloadRecord {
    /// Whether the record is visible to public reads
    pub fn is_published(&self) -> bool {
        self.status == DownloadStatus::Publish
    }
}

/// Input for creating or updating a download
///
/// `id` absent (or 0) inserts a new record; otherwise the record is updated.
/// Sanitization (trimming, slug derivation, term normalization, source
/// exclusivity) happens on save; [`validate`](Self::validate) is the caller's
/// responsibility.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct DownloadInput {
    /// Record to update; `None`/0 creates a new one
    #[serde(default)]
    pub id: Option<DownloadId>,
    /// Display title (required)
    #[serde(default)]
    pub title: String,
    /// Explicit slug; derived from the title when empty
    #[serde(default)]
    pub slug: Option<String>,
    /// Rich text description
    #[serde(default)]
    pub description: String,
    /// Explicit excerpt
    #[serde(default)]
    pub excerpt: String,
    /// Featured image asset (0 = none)
    #[serde(default)]
    pub featured_image_id: i64,
    /// Delivery strategy
    #[serde(default)]
    pub file_source: FileSource,
    /// Media attachment
    #[serde(default)]
    pub file_id: i64,
    /// External URL
    #[serde(default)]
    pub direct_url: String,
    /// Comma-delimited categories
    #[serde(default)]
    pub categories: String,
    /// Comma-delimited tags
    #[serde(default)]
    pub tags: String,
    /// Publication status
    #[serde(default)]
    pub status: DownloadStatus,
}

impl DownloadInput {
    /// Check the input the way the admin form does before saving
    ///
    /// The title is judged after the same markup stripping the store
    /// applies, so a title made only of tags is rejected.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if sanitize_text(&self.title).is_empty() {
            return Err(ValidationError::MissingTitle);
        }

        match self.file_source {
            FileSource::Media if self.file_id <= 0 => Err(ValidationError::MissingFile),
            FileSource::Direct => {
                let direct_url = self.direct_url.trim();
                if direct_url.is_empty() {
                    return Err(ValidationError::MissingDirectUrl);
                }
                match url::Url::parse(direct_url) {
                    Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
                    _ => Err(ValidationError::InvalidDirectUrl(direct_url.to_string())),
                }
            }
            FileSource::Media => Ok(()),
        }
    }

    /// Whether this input targets an existing record
    pub fn existing_id(&self) -> Option<DownloadId> {
        self.id.filter(|id| id.0 > 0)
    }
}

/// One page of query results plus pagination metadata
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueryPage<T> {
    /// Records on this page
    pub items: Vec<T>,
    /// Total number of matching records
    pub total: u64,
    /// Current page (1-based, after clamping)
    pub page: u32,
    /// Page size (after clamping)
    pub per_page: u32,
    /// `ceil(total / per_page)`, 0 when nothing matched
    pub total_pages: u32,
}

impl<T> QueryPage<T> {
    /// Map the items while keeping pagination metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> QueryPage<U> {
        QueryPage {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
        }
    }
}

/// Lightweight autocomplete result
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TitleMatch {
    /// Record id
    pub id: DownloadId,
    /// Title
    pub title: String,
    /// Slug
    pub slug: String,
    /// Publication status
    pub status: DownloadStatus,
}

/// Term reference embedded in a download payload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TermRef {
    /// Stable numeric id (CRC-32 of the slug)
    pub id: u32,
    /// Slug
    pub slug: String,
    /// Display name
    pub name: String,
}

/// Full public representation of a download
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DownloadPayload {
    /// Record id
    pub id: DownloadId,
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Excerpt, derived from the description when not set
    pub excerpt: String,
    /// Tracking URL (through the delivery endpoint)
    pub download_url: String,
    /// Number of tracked downloads
    pub download_count: u64,
    /// Delivery strategy
    pub source: FileSource,
    /// Media attachment
    pub file_id: i64,
    /// External URL
    pub direct_url: String,
    /// Resolved featured image URL, empty when unavailable
    pub featured_image: String,
    /// Categories
    pub categories: Vec<TermRef>,
    /// Tags
    pub tags: Vec<TermRef>,
    /// Publication status
    pub status: DownloadStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

/// Outcome of a tracking call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TrackResponse {
    /// Whether the counter was incremented
    pub tracked: bool,
    /// Whether the call was suppressed by the throttle
    pub throttled: bool,
    /// Counter value after the call
    pub download_count: u64,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn media_input() -> DownloadInput {
        DownloadInput {
            title: "Guide".into(),
            file_source: FileSource::Media,
            file_id: 12,
            ..Default::default()
        }
    }

    #[test]
    fn file_source_is_lenient() {
        assert_eq!(FileSource::from_str_lossy("direct"), FileSource::Direct);
        assert_eq!(FileSource::from_str_lossy(" DIRECT "), FileSource::Direct);
        assert_eq!(FileSource::from_str_lossy("ftp"), FileSource::Media);

        let parsed: FileSource = serde_json::from_str("\"bogus\"").unwrap();
        assert_eq!(parsed, FileSource::Media);
    }

    #[test]
    fn status_is_lenient() {
        assert_eq!(DownloadStatus::from_str_lossy("draft"), DownloadStatus::Draft);
        assert_eq!(DownloadStatus::from_str_lossy("pending"), DownloadStatus::Publish);
        assert_eq!(DownloadStatus::filter_from_str(""), None);
        assert_eq!(
            DownloadStatus::filter_from_str("draft"),
            Some(DownloadStatus::Draft)
        );
    }

    #[test]
    fn validate_requires_title() {
        for title in ["   ", "<b></b>", " <span> </span>\n", "<script>x</script>"] {
            let input = DownloadInput {
                title: title.into(),
                ..media_input()
            };
            assert_eq!(input.validate(), Err(ValidationError::MissingTitle), "{title:?}");
        }

        let marked_up = DownloadInput {
            title: "<b>Guide</b>".into(),
            ..media_input()
        };
        assert!(marked_up.validate().is_ok());
    }

    #[test]
    fn validate_media_requires_file() {
        let input = DownloadInput {
            file_id: 0,
            ..media_input()
        };
        assert_eq!(input.validate(), Err(ValidationError::MissingFile));
        assert!(media_input().validate().is_ok());
    }

    #[test]
    fn validate_direct_requires_absolute_http_url() {
        let mut input = DownloadInput {
            title: "Guide".into(),
            file_source: FileSource::Direct,
            ..Default::default()
        };
        assert_eq!(input.validate(), Err(ValidationError::MissingDirectUrl));

        input.direct_url = "not a url".into();
        assert!(matches!(
            input.validate(),
            Err(ValidationError::InvalidDirectUrl(_))
        ));

        input.direct_url = "ftp://files.example.com/a.zip".into();
        assert!(matches!(
            input.validate(),
            Err(ValidationError::InvalidDirectUrl(_))
        ));

        input.direct_url = "https://x.example/y.pdf".into();
        assert!(input.validate().is_ok());
    }

    #[test]
    fn existing_id_ignores_zero() {
        let mut input = media_input();
        assert_eq!(input.existing_id(), None);
        input.id = Some(DownloadId(0));
        assert_eq!(input.existing_id(), None);
        input.id = Some(DownloadId(5));
        assert_eq!(input.existing_id(), Some(DownloadId(5)));
    }

    #[test]
    fn input_deserializes_with_defaults() {
        let input: DownloadInput =
            serde_json::from_str(r#"{"title":"Guide","file_source":"direct"}"#).unwrap();
        assert_eq!(input.file_source, FileSource::Direct);
        assert_eq!(input.status, DownloadStatus::Publish);
        assert!(input.id.is_none());
        assert_eq!(input.categories, "");
    }

    #[test]
    fn term_set_serializes_as_csv() {
        let set = TermSet::parse("b,a,b");
        assert_eq!(serde_json::to_string(&set).unwrap(), "\"b,a\"");
        let back: TermSet = serde_json::from_str("\"X, y\"").unwrap();
        assert_eq!(back.to_csv(), "x,y");
    }

    #[test]
    fn query_page_map_keeps_metadata() {
        let page = QueryPage {
            items: vec![1, 2],
            total: 25,
            page: 3,
            per_page: 12,
            total_pages: 3,
        };
        let mapped = page.map(|n| n * 10);
        assert_eq!(mapped.items, vec![10, 20]);
        assert_eq!(mapped.total_pages, 3);
    }
}
