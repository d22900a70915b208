//! Migration file parsing
//!
//! [`FileParser`] turns one file into a [`ParsedFile`]: segment, classify,
//! build statements, collect the unparsed residue and line statistics.
//! [`BatchParser`] fans a set of files out over a worker pool.

pub mod batch;
pub mod file;

pub use batch::{BatchParser, BatchResult, FileFailure};
pub use file::{FileParser, FileStats, ParsedFile, SourceFile};
