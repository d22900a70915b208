//! Classification pattern table
//!
//! The table maps statement types to ordered lists of patterns. Iteration
//! order is part of the contract: the classifier walks types in table order,
//! patterns in list order and regexes in pattern order, and the first hit
//! wins. Callers may add custom patterns, reorder types and reset to the
//! factory table.

mod defaults;
pub mod interchange;
pub mod sql_regex;

pub use sql_regex::SqlRegex;
pub use interchange::{ImportReport, PatternRecord, RejectedPattern};

use crate::{Error, Result};
use chrono::{DateTime, Utc};

/// A classification pattern for one statement type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    /// Statement type produced on match
    pub kind: String,
    /// Regexes tried in order
    pub regexes: Vec<SqlRegex>,
    /// Whether this pattern ships with the factory table
    pub is_default: bool,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Pattern {
    /// Create a custom (non-default) pattern
    pub fn custom(kind: impl Into<String>, regexes: Vec<SqlRegex>, description: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            regexes,
            is_default: false,
            description: description.into(),
            created_at: Utc::now(),
        }
    }
}

/// All patterns registered for one statement type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternGroup {
    pub kind: String,
    pub patterns: Vec<Pattern>,
}

/// Ordered type -> patterns table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternTable {
    groups: Vec<PatternGroup>,
}

impl Default for PatternTable {
    fn default() -> Self {
        Self::defaults()
    }
}

impl PatternTable {
    /// An empty table; only the classifier's built-in rules apply.
    pub fn empty() -> Self {
        Self { groups: Vec::new() }
    }

    /// The factory table.
    pub fn defaults() -> Self {
        let mut table = Self::empty();
        for def in defaults::default_patterns() {
            let regex = match SqlRegex::new(def.source, def.flags) {
                Ok(regex) => regex,
                Err(e) => {
                    tracing::warn!("Skipping factory pattern {}: {}", def.description, e);
                    continue;
                }
            };
            table.push(Pattern {
                kind: def.kind.to_string(),
                regexes: vec![regex],
                is_default: true,
                description: def.description.to_string(),
                created_at: DateTime::<Utc>::UNIX_EPOCH,
            });
        }
        table
    }

    /// Restore the factory table, dropping custom patterns and ordering.
    pub fn reset(&mut self) {
        *self = Self::defaults();
    }

    /// Append a pattern to its type's group, creating the group at the end
    /// of the table when the type is new.
    pub fn push(&mut self, pattern: Pattern) {
        match self.groups.iter_mut().find(|g| g.kind == pattern.kind) {
            Some(group) => group.patterns.push(pattern),
            None => self.groups.push(PatternGroup {
                kind: pattern.kind.clone(),
                patterns: vec![pattern],
            }),
        }
    }

    /// Add a custom pattern from its `/pattern/flags` wire form.
    pub fn add_custom(&mut self, kind: &str, regex: &str, description: &str) -> Result<&Pattern> {
        let regex = SqlRegex::parse(regex)?;
        let pattern = Pattern::custom(kind, vec![regex], description);
        self.push(pattern);

        let group = self
            .groups
            .iter()
            .find(|g| g.kind == kind)
            .ok_or_else(|| Error::UnknownKind(kind.to_string()))?;
        group
            .patterns
            .last()
            .ok_or_else(|| Error::UnknownKind(kind.to_string()))
    }

    /// Move the given types to the front of the table, in the given order.
    /// Types not mentioned keep their relative order after them.
    pub fn set_order(&mut self, kinds: &[&str]) -> Result<()> {
        for kind in kinds {
            if !self.groups.iter().any(|g| g.kind == *kind) {
                return Err(Error::UnknownKind(kind.to_string()));
            }
        }

        let mut reordered = Vec::with_capacity(self.groups.len());
        for kind in kinds {
            if let Some(pos) = self.groups.iter().position(|g| g.kind == *kind) {
                reordered.push(self.groups.remove(pos));
            }
        }
        reordered.append(&mut self.groups);
        self.groups = reordered;
        Ok(())
    }

    /// Types in precedence order
    pub fn kinds(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.kind.as_str()).collect()
    }

    pub fn groups(&self) -> &[PatternGroup] {
        &self.groups
    }

    /// Every pattern in precedence order
    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.groups.iter().flat_map(|g| g.patterns.iter())
    }

    /// Custom patterns only, in precedence order
    pub fn custom_patterns(&self) -> impl Iterator<Item = &Pattern> {
        self.iter().filter(|p| !p.is_default)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|g| g.patterns.is_empty())
    }
}
