//! Statement types - one classified, semicolon-bounded SQL unit
//!
//! Statement types are open-ended string tags. The well-known tags live in
//! [`kind`]; custom patterns and the fallback chain may introduce others
//! (`dropTable`, `insert`, ...).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Well-known statement type tags.
pub mod kind {
    pub const SCHEMA: &str = "schema";
    pub const EXTENSION: &str = "extension";
    pub const TYPE: &str = "type";
    pub const SEQUENCE: &str = "sequence";
    pub const TABLE: &str = "table";
    pub const VIEW: &str = "view";
    pub const FUNCTION: &str = "function";
    pub const TRIGGER: &str = "trigger";
    pub const INDEX: &str = "index";
    pub const CONSTRAINT: &str = "constraint";
    pub const POLICY: &str = "policy";
    pub const ALTER_RLS_POLICY: &str = "alterRLSPolicy";
    pub const COMMENT: &str = "comment";
    pub const GRANT: &str = "grant";
    pub const REVOKE: &str = "revoke";
    pub const ALTER: &str = "alter";
    pub const PLPGSQL: &str = "plpgsql";
}

/// A classified statement.
///
/// Statements are immutable. Editing one produces a new version through
/// [`Statement::revise`]; the old version stays in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statement {
    /// Unique identifier for this version
    pub id: String,
    /// Statement type tag (table, function, dropTable, ...)
    #[serde(rename = "type")]
    pub kind: String,
    /// Best-effort object name
    pub name: String,
    /// Trimmed SQL text
    pub content: String,
    /// Source file, as the path or name it was parsed under
    pub file_name: String,
    /// Version timestamp
    pub timestamp: DateTime<Utc>,
    /// Whitespace-insensitive content fingerprint
    pub hash: String,
    /// Whether the statement came out of the classifier
    pub parsed: bool,
}

impl Statement {
    /// Create a new statement; the content is trimmed and hashed.
    pub fn new(
        kind: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
        file_name: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let content = content.into().trim().to_string();
        let hash = content_hash(&content);

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind: kind.into(),
            name: name.into(),
            content,
            file_name: file_name.into(),
            timestamp,
            hash,
            parsed: true,
        }
    }

    /// Version key shared by every revision of the same object
    pub fn key(&self) -> (&str, &str) {
        (&self.kind, &self.name)
    }

    /// Produce a new version of this statement with edited content.
    ///
    /// The revision keeps type, name and file, and always sorts after the
    /// statement it revises.
    pub fn revise(&self, content: impl Into<String>) -> Self {
        let now = Utc::now();
        let timestamp = if now > self.timestamp {
            now
        } else {
            self.timestamp + Duration::milliseconds(1)
        };

        let mut revised = Self::new(
            self.kind.clone(),
            self.name.clone(),
            content,
            self.file_name.clone(),
            timestamp,
        );
        revised.parsed = self.parsed;
        revised
    }

    /// Number of non-blank lines in the content
    pub fn line_count(&self) -> usize {
        non_blank_lines(&self.content)
    }

    /// Get a short description for display
    pub fn short_description(&self) -> String {
        format!("{} {}", self.kind, self.name)
    }
}

/// Fingerprint of `content` with whitespace runs collapsed.
///
/// Only used for change detection and version identity.
pub fn content_hash(content: &str) -> String {
    let normalized = content.split_whitespace().collect::<Vec<_>>().join(" ");
    let digest = blake3::hash(normalized.as_bytes()).to_hex();
    digest.as_str()[..16].to_string()
}

pub(crate) fn non_blank_lines(text: &str) -> usize {
    text.lines().filter(|l| !l.trim().is_empty()).count()
}
