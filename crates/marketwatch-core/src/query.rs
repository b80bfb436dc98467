//! Canonical query-string construction.
//!
//! Pairs are appended in the order the caller declares them and encoded
//! with percent-encoding. Because the order is fixed per parameter type,
//! the resulting URL doubles as a stable cache and dedup key.

use std::fmt::Display;

/// Ordered list of query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPairs {
    pairs: Vec<(String, String)>,
}

impl QueryPairs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &str, value: impl Display) {
        self.pairs.push((name.to_string(), value.to_string()));
    }

    pub fn push_opt(&mut self, name: &str, value: Option<&impl Display>) {
        if let Some(value) = value {
            self.push(name, value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Render as `name=value&...` without a leading `?`.
    pub fn to_query_string(&self) -> String {
        self.pairs
            .iter()
            .map(|(name, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(name),
                    urlencoding::encode(value)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Append to a path, adding the `?` only when parameters exist.
    pub fn append_to(&self, path: &str) -> String {
        if self.is_empty() {
            path.to_string()
        } else {
            format!("{path}?{}", self.to_query_string())
        }
    }
}
