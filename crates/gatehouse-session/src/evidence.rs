//! Parsing of cookie-style session evidence.
//!
//! Evidence looks like `user_id=alice%40example.com; sid=...; full_name=Alice`.
//! Values are percent-encoded, keys are not. Everything that decides whether
//! a string is well-formed lives in [`parse_evidence`].

use std::collections::HashMap;

use crate::SessionParseError;

/// The evidence key carrying the identity reference.
pub const IDENTITY_KEY: &str = "user_id";

/// Parsed session evidence: decoded key/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evidence {
    pairs: HashMap<String, String>,
}

impl Evidence {
    /// Returns the decoded value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(key).map(String::as_str)
    }

    /// The identity reference, if present and non-empty.
    pub fn identity_reference(&self) -> Option<&str> {
        self.get(IDENTITY_KEY).filter(|v| !v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Parses `k1=v1; k2=v2` evidence.
///
/// - Pairs are separated by `;`; surrounding whitespace and empty segments
///   (a trailing `;`) are ignored.
/// - Each pair splits on its first `=`, so values may contain `=`.
/// - Values are percent-decoded; `+` is kept literally.
/// - Duplicate keys: the last one wins.
///
/// # Errors
/// [`SessionParseError::MissingSeparator`] for a pair without `=`,
/// [`SessionParseError::EmptyKey`] for `=value`, and
/// [`SessionParseError::InvalidEncoding`] for a broken escape such as `%zz`
/// or a value that does not decode to UTF-8.
pub fn parse_evidence(raw: &str) -> Result<Evidence, SessionParseError> {
    let mut pairs = HashMap::new();

    for segment in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let (key, value) = segment
            .split_once('=')
            .ok_or_else(|| SessionParseError::MissingSeparator(segment.to_string()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(SessionParseError::EmptyKey(segment.to_string()));
        }

        let decoded = decode_value(value.trim())
            .ok_or_else(|| SessionParseError::InvalidEncoding { key: key.to_string() })?;
        pairs.insert(key.to_string(), decoded);
    }

    Ok(Evidence { pairs })
}

/// Strict percent-decoding: every `%` must start a two-digit hex escape.
fn decode_value(value: &str) -> Option<String> {
    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape = bytes.get(i + 1..i + 3)?;
            if !escape.iter().all(u8::is_ascii_hexdigit) {
                return None;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    urlencoding::decode(value).ok().map(|v| v.into_owned())
}
