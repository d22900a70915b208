//! # sqlfold - Migration Consolidator
//!
//! Splits multi-statement PostgreSQL migration files into classified,
//! versioned statements and folds them back into one deterministic script.
//!
//! sqlfold provides:
//! - A line-oriented segmenter aware of comments, dollar-quoted bodies and triggers
//! - An ordered, user-extensible pattern table for statement classification
//! - Version resolution keyed by `(type, name)` with last-seen tie breaking
//! - Heuristic execution ordering, dependency lookup and script generation

pub mod statement;
pub mod pattern;
pub mod segmenter;
pub mod classifier;
pub mod timestamp;
pub mod parser;
pub mod version;
pub mod order;
pub mod dependency;
pub mod generator;
pub mod workspace;
pub mod discovery;
pub mod config;
pub mod output;
pub mod ui;

// Re-exports for convenient access
pub use statement::Statement;
pub use pattern::{Pattern, PatternTable, SqlRegex};
pub use segmenter::{Candidate, Segmenter, SegmenterOptions};
pub use classifier::{Classification, Classifier, MatchSource, PinnedRule};
pub use parser::{BatchParser, BatchResult, FileFailure, ParsedFile, SourceFile};
pub use version::{latest_versions, version_sets, VersionSet};
pub use order::{execution_order, type_priority};
pub use dependency::find_dependencies;
pub use generator::{generate_sql, GeneratorOptions, SqlGenerator};
pub use workspace::Workspace;
pub use discovery::Discovery;

/// Result type alias for sqlfold operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for sqlfold operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid regex {pattern}: {reason}")]
    InvalidRegex { pattern: String, reason: String },

    #[error("Invalid glob {pattern}: {reason}")]
    InvalidGlob { pattern: String, reason: String },

    #[error("Malformed pattern import: {0}")]
    MalformedPatternImport(String),

    #[error("Unknown statement type: {0}")]
    UnknownKind(String),

    #[error("Statement not found: {0}")]
    StatementNotFound(String),

    #[error("Parser worker panicked")]
    WorkerPanic,
}
