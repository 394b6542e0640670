//! Term slugs and comma-delimited term sets
//!
//! Categories and tags are stored on every download as a single
//! comma-delimited string of slugs (`"pdf,guide,how-to"`). [`TermSet`] is the
//! in-memory view of that string: parsing normalizes every entry, drops empty
//! entries and collapses duplicates while keeping first-seen order.
//!
//! Every string that is persisted to a `categories`/`tags` column goes through
//! [`TermSet::to_csv`], so stored values are always already normalized.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Normalize free text into a term slug.
///
/// Markup is stripped, text is lowercased, whitespace, dots and slashes
/// become `-`, anything that is not alphanumeric, `-` or `_` is dropped, and
/// runs of `-` collapse into one. Leading/trailing `-` are trimmed.
///
/// The function is idempotent: `normalize_slug(&normalize_slug(s)) == normalize_slug(s)`.
///
/// ```
/// use downloads_catalog::terms::normalize_slug;
///
/// assert_eq!(normalize_slug("  How To <b>Guides</b> "), "how-to-guides");
/// assert_eq!(normalize_slug("v1.2 Release!"), "v1-2-release");
/// ```
pub fn normalize_slug(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut in_tag = false;
    let mut pending_dash = false;

    for c in raw.chars() {
        match c {
            '<' => {
                in_tag = true;
                continue;
            }
            '>' if in_tag => {
                in_tag = false;
                continue;
            }
            _ if in_tag => continue,
            _ => {}
        }

        for lower in c.to_lowercase() {
            if lower.is_alphanumeric() || lower == '_' {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push(lower);
            } else if lower == '-' || lower == '.' || lower == '/' || lower.is_whitespace() {
                pending_dash = true;
            }
        }
    }

    slug
}

/// Human-readable name for a slug: `-`/`_` become spaces and every word is
/// capitalized (`"how-to_guides"` -> `"How To Guides"`).
pub fn display_name(slug: &str) -> String {
    let spaced = slug.replace(['-', '_'], " ");
    let mut name = String::with_capacity(spaced.len());
    let mut at_word_start = true;

    for c in spaced.chars() {
        if c.is_whitespace() {
            at_word_start = true;
            name.push(c);
        } else if at_word_start {
            name.extend(c.to_uppercase());
            at_word_start = false;
        } else {
            name.push(c);
        }
    }

    name
}

/// Ordered, duplicate-free set of normalized slugs
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TermSet {
    slugs: Vec<String>,
}

impl TermSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a comma-delimited membership string
    pub fn parse(csv: &str) -> Self {
        Self::from_slugs(csv.split(','))
    }

    /// Build a set from individual (not yet normalized) entries
    pub fn from_slugs<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for entry in entries {
            set.insert(entry.as_ref());
        }
        set
    }

    /// Whether the set contains the (normalized) slug
    pub fn contains(&self, slug: &str) -> bool {
        let slug = normalize_slug(slug);
        self.slugs.iter().any(|s| *s == slug)
    }

    /// Insert a slug, returning `false` if it normalized to nothing or was already present
    pub fn insert(&mut self, slug: &str) -> bool {
        let slug = normalize_slug(slug);
        if slug.is_empty() || self.slugs.contains(&slug) {
            return false;
        }
        self.slugs.push(slug);
        true
    }

    /// Remove a slug, returning whether it was present
    pub fn remove(&mut self, slug: &str) -> bool {
        let slug = normalize_slug(slug);
        let before = self.slugs.len();
        self.slugs.retain(|s| *s != slug);
        self.slugs.len() != before
    }

    /// Replace `old` with `new` in place.
    ///
    /// If `new` is already a member, `old` is simply dropped so the set stays
    /// duplicate-free. Returns whether the set changed.
    pub fn replace(&mut self, old: &str, new: &str) -> bool {
        let old = normalize_slug(old);
        let new = normalize_slug(new);

        let Some(position) = self.slugs.iter().position(|s| *s == old) else {
            return false;
        };
        if old == new {
            return false;
        }

        if new.is_empty() || self.slugs.contains(&new) {
            self.slugs.remove(position);
        } else {
            self.slugs[position] = new;
        }
        true
    }

    /// Iterate over the slugs in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.slugs.iter().map(String::as_str)
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.slugs.len()
    }

    /// Whether the set has no members
    pub fn is_empty(&self) -> bool {
        self.slugs.is_empty()
    }

    /// Storage encoding: slugs joined by `,`
    pub fn to_csv(&self) -> String {
        self.slugs.join(",")
    }

    /// Display names joined by `", "`, as shown on cards and tables
    pub fn display_names(&self) -> String {
        self.slugs
            .iter()
            .map(|s| display_name(s))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for TermSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_csv())
    }
}

/// Count, per slug, how many membership strings contain it
pub fn facet_counts<'a, I>(memberships: I) -> BTreeMap<String, u64>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts = BTreeMap::new();
    for csv in memberships {
        for slug in TermSet::parse(csv).iter() {
            *counts.entry(slug.to_string()).or_insert(0) += 1;
        }
    }
    counts
}

/// Which membership column a term operation targets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TermColumn {
    /// The `categories` column
    Categories,
    /// The `tags` column
    Tags,
}

impl TermColumn {
    /// SQL column name
    pub fn column(&self) -> &'static str {
        match self {
            TermColumn::Categories => "categories",
            TermColumn::Tags => "tags",
        }
    }

    /// `runtime_state` key holding the zero-count registry for this column
    pub fn registry_key(&self) -> &'static str {
        match self {
            TermColumn::Categories => "terms:categories",
            TermColumn::Tags => "terms:tags",
        }
    }
}

impl fmt::Display for TermColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for TermColumn {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "categories" => Ok(TermColumn::Categories),
            "tags" => Ok(TermColumn::Tags),
            other => Err(crate::Error::NotFound(format!("term column '{}'", other))),
        }
    }
}

/// A facet entry: slug, display name and number of member downloads
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Term {
    /// Normalized slug
    pub slug: String,
    /// Title-cased display name
    pub name: String,
    /// Number of downloads whose set contains the slug
    pub count: u64,
}

impl Term {
    /// Build a term, deriving its display name from the slug
    pub fn new(slug: impl Into<String>, count: u64) -> Self {
        let slug = slug.into();
        Self {
            name: display_name(&slug),
            slug,
            count,
        }
    }
}
