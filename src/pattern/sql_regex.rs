//! Serializable regular expressions
//!
//! Wire format: `/pattern/flags`, e.g. `/^\s*CREATE\s+TABLE\s+(\w+)/i`.
//!
//! Supported flags:
//! - `i`: case-insensitive
//! - `m`: `^`/`$` match at line boundaries
//! - `s`: `.` matches newlines
//! - `x`: ignore whitespace in the pattern
//! - `g`, `u`, `y`: accepted for compatibility, no effect

use crate::{Error, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const ACCEPTED_FLAGS: &str = "imsxguy";

/// A regex that remembers the source and flags it was built from.
#[derive(Clone)]
pub struct SqlRegex {
    source: String,
    flags: String,
    compiled: Regex,
}

impl SqlRegex {
    /// Compile `source` with the given flag letters.
    pub fn new(source: impl Into<String>, flags: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let flags = normalize_flags(&flags.into());

        if let Some(bad) = flags.chars().find(|c| !ACCEPTED_FLAGS.contains(*c)) {
            return Err(Error::InvalidRegex {
                pattern: source,
                reason: format!("unsupported flag '{}'", bad),
            });
        }

        let compiled = RegexBuilder::new(&source)
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .dot_matches_new_line(flags.contains('s'))
            .ignore_whitespace(flags.contains('x'))
            .build()
            .map_err(|e| Error::InvalidRegex {
                pattern: source.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self { source, flags, compiled })
    }

    /// Parse the `/pattern/flags` wire form.
    pub fn parse(wire: &str) -> Result<Self> {
        let body = wire.strip_prefix('/').ok_or_else(|| Error::InvalidRegex {
            pattern: wire.to_string(),
            reason: "expected /pattern/flags".to_string(),
        })?;

        let (source, flags) = body.rsplit_once('/').ok_or_else(|| Error::InvalidRegex {
            pattern: wire.to_string(),
            reason: "missing closing '/'".to_string(),
        })?;

        if source.is_empty() {
            return Err(Error::InvalidRegex {
                pattern: wire.to_string(),
                reason: "empty pattern".to_string(),
            });
        }

        Self::new(source, flags)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn flags(&self) -> &str {
        &self.flags
    }

    pub fn regex(&self) -> &Regex {
        &self.compiled
    }

    /// Render the `/pattern/flags` wire form
    pub fn to_wire(&self) -> String {
        format!("/{}/{}", self.source, self.flags)
    }
}

/// Deduplicate and sort flag letters so equal regexes compare equal.
fn normalize_flags(flags: &str) -> String {
    let mut letters: Vec<char> = flags.chars().filter(|c| !c.is_whitespace()).collect();
    letters.sort_unstable();
    letters.dedup();
    letters.into_iter().collect()
}

impl PartialEq for SqlRegex {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.flags == other.flags
    }
}

impl Eq for SqlRegex {}

impl fmt::Debug for SqlRegex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SqlRegex({})", self.to_wire())
    }
}

impl fmt::Display for SqlRegex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_wire())
    }
}

impl FromStr for SqlRegex {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for SqlRegex {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_wire())
    }
}

impl<'de> Deserialize<'de> for SqlRegex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let wire = String::deserialize(deserializer)?;
        Self::parse(&wire).map_err(serde::de::Error::custom)
    }
}
