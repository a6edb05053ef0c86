//! Unit identifiers
//!
//! User stories get a `UnitId` when the user-story generation stage creates
//! them: `us-{seq}-{slug}`, e.g. `us-2-reset-password`. Every per-unit
//! artifact is keyed by this id, so two stories with the same title never
//! collide.

use serde::{Deserialize, Serialize};

/// Maximum slug length kept in an id
const MAX_SLUG_LEN: usize = 40;

/// Slugify a title for use in IDs
pub fn slugify(title: &str) -> String {
    let slug = title
        .to_lowercase()
        .chars()
        // Strip apostrophes entirely, replace other non-alphanumeric with hyphens
        .filter_map(|c| {
            if c.is_alphanumeric() {
                Some(c)
            } else if c == '\'' || c == '\u{2019}' || c == '\u{2018}' {
                None
            } else {
                Some('-')
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if slug.chars().count() <= MAX_SLUG_LEN {
        return slug;
    }
    let truncated: String = slug.chars().take(MAX_SLUG_LEN).collect();
    truncated.trim_end_matches('-').to_string()
}

/// Stable identifier of one user story (a processing unit)
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(String);

impl UnitId {
    /// Id for the story at 1-based position `seq` in generation order
    pub fn new(seq: usize, title: &str) -> Self {
        let slug = slugify(title);
        if slug.is_empty() {
            Self(format!("us-{}", seq))
        } else {
            Self(format!("us-{}-{}", seq, slug))
        }
    }

    /// Get the full ID string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Position in generation order, if the id carries one
    pub fn seq(&self) -> Option<usize> {
        self.0.strip_prefix("us-")?.split('-').next()?.parse().ok()
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UnitId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UnitId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for UnitId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
