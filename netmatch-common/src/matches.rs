//! Match model produced by the external scoring unit
//!
//! The scoring unit owns these documents; NETMATCH only reads them. A Match
//! Set document nests per-user entries under `all_matches` (or `matches`),
//! each entry either a list of matches or an object carrying a `matches`
//! list. Entry order and per-entry list order are preserved.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// A single scored recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Conventionally 0.0-1.0
    pub match_score: f64,
    /// 0-100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
}

impl Match {
    /// Reported percentage, or `round(match_score * 100)` when absent
    pub fn percentage(&self) -> f64 {
        self.match_percentage
            .unwrap_or_else(|| (self.match_score * 100.0).round())
    }

    /// Copy of this match with `match_percentage` always populated
    pub fn with_percentage(mut self) -> Self {
        self.match_percentage = Some(self.percentage());
        self
    }
}

/// Per-user ordered match lists, in document order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchSet {
    entries: Vec<(String, Vec<Match>)>,
}

impl MatchSet {
    /// Extract a Match Set from a scoring unit result document
    ///
    /// Entries that are not match lists and individual matches that do not
    /// parse are skipped with a warning.
    pub fn from_document(document: &Value) -> Self {
        let container = document
            .get("all_matches")
            .filter(|v| v.is_object())
            .or_else(|| document.get("matches").filter(|v| v.is_object()))
            .unwrap_or(document);

        let Some(object) = container.as_object() else {
            return Self::default();
        };

        let entries = object
            .iter()
            .filter_map(|(user, entry)| {
                let list = match entry {
                    Value::Array(list) => list,
                    Value::Object(inner) => inner.get("matches")?.as_array()?,
                    _ => return None,
                };
                let matches = list
                    .iter()
                    .filter_map(|raw| match serde_json::from_value::<Match>(raw.clone()) {
                        Ok(m) => Some(m),
                        Err(e) => {
                            warn!(user = %user, error = %e, "Skipping unparsable match entry");
                            None
                        }
                    })
                    .collect();
                Some((user.clone(), matches))
            })
            .collect();

        Self { entries }
    }

    /// Matches for one user, if present
    pub fn for_user(&self, user: &str) -> Option<&[Match]> {
        self.entries
            .iter()
            .find(|(key, _)| key == user)
            .map(|(_, matches)| matches.as_slice())
    }

    /// Users in document order
    pub fn users(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every match across all users, in document order, percentages filled
    pub fn flatten(self) -> Vec<Match> {
        self.entries
            .into_iter()
            .flat_map(|(_, matches)| matches)
            .map(Match::with_percentage)
            .collect()
    }
}
