//! Version resolution
//!
//! Every statement is a version of the object identified by `(type, name)`.
//! The latest version has the greatest timestamp; on a tie the one seen last
//! wins, so later files in a batch override earlier ones.

use crate::Statement;
use serde::Serialize;
use std::collections::HashMap;

/// All versions of one object, newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionSet {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub versions: Vec<Statement>,
}

impl VersionSet {
    /// The version that [`latest_versions`] would keep
    pub fn latest(&self) -> Option<&Statement> {
        self.versions.first()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

/// Keep one statement per `(type, name)`: the greatest timestamp, ties
/// going to the last one seen. Output follows first occurrence of each key.
pub fn latest_versions(statements: &[Statement]) -> Vec<Statement> {
    let mut slots: HashMap<(&str, &str), usize> = HashMap::new();
    let mut latest: Vec<&Statement> = Vec::new();

    for statement in statements {
        match slots.get(&statement.key()) {
            Some(&slot) => {
                if statement.timestamp >= latest[slot].timestamp {
                    latest[slot] = statement;
                }
            }
            None => {
                slots.insert(statement.key(), latest.len());
                latest.push(statement);
            }
        }
    }

    latest.into_iter().cloned().collect()
}

/// Full histories per key in first-occurrence order. Versions are sorted
/// newest first; ties keep the last seen in front.
pub fn version_sets(statements: &[Statement]) -> Vec<VersionSet> {
    let mut slots: HashMap<(&str, &str), usize> = HashMap::new();
    let mut sets: Vec<VersionSet> = Vec::new();

    for statement in statements {
        let slot = *slots.entry(statement.key()).or_insert_with(|| {
            sets.push(VersionSet {
                kind: statement.kind.clone(),
                name: statement.name.clone(),
                versions: Vec::new(),
            });
            sets.len() - 1
        });
        sets[slot].versions.push(statement.clone());
    }

    for set in &mut sets {
        set.versions.reverse();
        // stable, so the reversal above puts later duplicates first
        set.versions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    }

    sets
}
