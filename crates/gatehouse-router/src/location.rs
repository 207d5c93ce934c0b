//! Parsed navigation targets.

use std::fmt;

use crate::RouterError;

/// A path plus its decoded query parameters. Fragments are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    path: String,
    query: Vec<(String, String)>,
}

impl Location {
    /// A location without query parameters.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
        }
    }

    /// Adds a query parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Parses `/path?k=v#fragment`.
    ///
    /// # Errors
    /// [`RouterError::InvalidHref`] unless `href` starts with `/`.
    pub fn parse(href: &str) -> Result<Self, RouterError> {
        if !href.starts_with('/') {
            return Err(RouterError::InvalidHref(href.to_string()));
        }
        let without_fragment = href.split_once('#').map_or(href, |(before, _)| before);
        let (path, query) = without_fragment
            .split_once('?')
            .unwrap_or((without_fragment, ""));
        Ok(Self {
            path: path.to_string(),
            query: parse_query(query),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The first value of `key`, if present.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The encoded query string, without the leading `?`.
    pub fn query_string(&self) -> String {
        self.query
            .iter()
            .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// The full `path?query` form.
    pub fn href(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query_string())
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.href())
    }
}

/// Decodes `a=1&b=2`. A leading `?` is ignored, `+` means space, and a pair
/// that does not decode is skipped.
pub(crate) fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = urlencoding::decode(&key.replace('+', " ")).ok()?.into_owned();
            let value = urlencoding::decode(&value.replace('+', " ")).ok()?.into_owned();
            Some((key, value))
        })
        .collect()
}

// Slashes stay readable in redirect targets: `?route=/invoice`.
fn encode(raw: &str) -> String {
    urlencoding::encode(raw).replace("%2F", "/")
}
