//! Origin matching against an allow-list.
//!
//! Supported entry forms:
//! - exact strings like `"https://app.example.com"`
//! - `"*.example.com"` → one or more subdomain levels of `example.com`,
//!   never the bare domain
//! - compiled regular expressions, tested against the full origin string
//!
//! Comparison is case-sensitive. Ports and schemes are not interpreted: whatever
//! the entry embeds is compared literally.

use std::fmt;

use regex::Regex;

const WILDCARD_PREFIX: &str = "*.";

#[derive(Clone, Debug)]
pub enum AllowListEntry {
    Exact(String),
    /// Raw `*.<domain>` text. The leading `*` is kept so the entry still
    /// compares equal to its own textual form.
    Wildcard(String),
    Pattern(Regex),
}

impl AllowListEntry {
    /// Compile `source` into a [`AllowListEntry::Pattern`].
    pub fn pattern(source: &str) -> Result<Self, regex::Error> {
        Regex::new(source).map(Self::Pattern)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Exact(s) | Self::Wildcard(s) => s,
            Self::Pattern(re) => re.as_str(),
        }
    }

    /// Whether `origin` is permitted by this single entry.
    pub fn matches(&self, origin: &str) -> bool {
        match self {
            Self::Exact(exact) => exact == origin,
            Self::Wildcard(raw) => raw == origin || matches_wildcard(raw, origin),
            Self::Pattern(re) => re.is_match(origin),
        }
    }
}

impl From<&str> for AllowListEntry {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<String> for AllowListEntry {
    fn from(value: String) -> Self {
        if value.len() > WILDCARD_PREFIX.len() && value.starts_with(WILDCARD_PREFIX) {
            Self::Wildcard(value)
        } else {
            Self::Exact(value)
        }
    }
}

impl From<Regex> for AllowListEntry {
    fn from(value: Regex) -> Self {
        Self::Pattern(value)
    }
}

impl fmt::Display for AllowListEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(re) => write!(f, "/{}/", re.as_str()),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Returns true if any entry in `allow_list` permits `origin`.
pub fn match_origin(origin: &str, allow_list: &[AllowListEntry]) -> bool {
    allow_list.iter().any(|entry| entry.matches(origin))
}

// Only `*.<domain>` with a non-empty domain can match; the leading `.` stays in the suffix.
fn matches_wildcard(raw: &str, origin: &str) -> bool {
    let Some(domain) = raw.strip_prefix(WILDCARD_PREFIX) else {
        return false;
    };
    if domain.is_empty() {
        return false;
    }

    let host = strip_scheme(origin);
    match host.strip_suffix(domain) {
        Some(rest) => match rest.strip_suffix('.') {
            Some(label) => !label.is_empty(),
            None => false,
        },
        None => false,
    }
}

fn strip_scheme(origin: &str) -> &str {
    match origin.split_once("://") {
        Some((_, rest)) => rest,
        None => origin,
    }
}
