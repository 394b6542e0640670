//! Per-request client identity used by the throttle

use crate::config::TrackingConfig;
use crate::types::DownloadId;
use axum::http::HeaderMap;
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};

/// Who is downloading, as far as the throttle can tell
///
/// Built at the HTTP boundary and passed explicitly into
/// [`DownloadService::track_download`](super::DownloadService::track_download).
/// Besides the client address it carries the marker cookies the client sent
/// and collects the markers the response should set.
#[derive(Clone, Debug)]
pub struct ClientContext {
    ip: IpAddr,
    markers: HashSet<DownloadId>,
    armed: Vec<DownloadId>,
}

impl ClientContext {
    /// Client with a known address and no markers
    pub fn new(ip: IpAddr) -> Self {
        Self {
            ip,
            markers: HashSet::new(),
            armed: Vec::new(),
        }
    }

    /// Client whose address could not be determined (`0.0.0.0`)
    pub fn unknown() -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }

    /// Add a marker the client presented
    pub fn with_marker(mut self, id: DownloadId) -> Self {
        self.markers.insert(id);
        self
    }

    /// Build from request headers, cookies and the peer address
    ///
    /// `cookies` yields `(name, value)` pairs; only names of the form
    /// `{cookie_prefix}{id}` count as markers.
    pub fn from_request<'a, I>(
        headers: &HeaderMap,
        peer: Option<IpAddr>,
        cookies: I,
        tracking: &TrackingConfig,
    ) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut context = Self::new(client_ip(
            headers,
            peer,
            tracking.trusted_proxy_header.as_deref(),
        ));

        for (name, _value) in cookies {
            if let Some(id) = name
                .strip_prefix(tracking.cookie_prefix.as_str())
                .and_then(|suffix| suffix.parse::<i64>().ok())
                .filter(|id| *id > 0)
            {
                context.markers.insert(DownloadId(id));
            }
        }

        context
    }

    /// Client address
    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    /// Whether the client presented a marker for this download
    pub fn has_marker(&self, id: DownloadId) -> bool {
        self.markers.contains(&id)
    }

    /// Ask the response to set a marker for this download
    pub fn arm_marker(&mut self, id: DownloadId) {
        if !self.armed.contains(&id) {
            self.armed.push(id);
        }
    }

    /// Markers the response should set
    pub fn armed_markers(&self) -> &[DownloadId] {
        &self.armed
    }
}

/// Client address, proxy-aware
///
/// Order: the trusted proxy header, then the first entry of
/// `X-Forwarded-For`, then the peer address. Unparseable values are skipped;
/// with nothing usable the result is `0.0.0.0`.
pub fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>, trusted_header: Option<&str>) -> IpAddr {
    let header_ip = |name: &str, first_only: bool| -> Option<IpAddr> {
        let value = headers.get(name)?.to_str().ok()?;
        let candidate = if first_only {
            value.split(',').next().unwrap_or_default()
        } else {
            value
        };
        candidate.trim().parse().ok()
    };

    trusted_header
        .filter(|name| !name.trim().is_empty())
        .and_then(|name| header_ip(name, false))
        .or_else(|| header_ip("x-forwarded-for", true))
        .or(peer)
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}
