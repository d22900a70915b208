use crate::classifier::{strip_leading_comments, Classifier, PinnedRule};
use crate::pattern::PatternTable;
use crate::segmenter::{Segmenter, SegmenterOptions};
use crate::statement::{non_blank_lines, Statement};
use crate::{timestamp, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// Raw migration text plus the name it is known by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Read a file from disk. The name is the path as given, so files with
    /// the same basename in different directories stay distinct; the
    /// migration timestamp is still read from the final component.
    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self {
            name: path.display().to_string(),
            content,
        })
    }
}

/// Line coverage of one file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStats {
    /// Non-blank lines in the original text
    pub total_lines: usize,
    /// Non-blank lines that ended up in a statement
    pub parsed_lines: usize,
    /// `round(parsed / total * 100)`, 0 for an empty file
    pub percentage: u32,
}

impl FileStats {
    fn new(total_lines: usize, parsed_lines: usize) -> Self {
        let percentage = if total_lines == 0 {
            0
        } else {
            (parsed_lines as f64 / total_lines as f64 * 100.0).round() as u32
        };
        Self {
            total_lines,
            parsed_lines,
            percentage,
        }
    }
}

/// Result of parsing one file. Re-parsing a file replaces this wholesale.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedFile {
    pub filename: String,
    pub original_content: String,
    pub statements: Vec<Statement>,
    /// Candidates no rule could classify, separated by blank lines
    pub unparsed: String,
    pub stats: FileStats,
}

impl ParsedFile {
    pub fn has_unparsed(&self) -> bool {
        !self.unparsed.is_empty()
    }
}

/// Segment + classify for single files.
pub struct FileParser<'a> {
    classifier: Classifier<'a>,
    segmenter: Segmenter,
}

impl<'a> FileParser<'a> {
    pub fn new(table: &'a PatternTable) -> Self {
        Self {
            classifier: Classifier::new(table),
            segmenter: Segmenter::new(),
        }
    }

    pub fn with_options(mut self, options: SegmenterOptions) -> Self {
        self.segmenter = Segmenter::with_options(options);
        self
    }

    pub fn with_pins(mut self, pins: Vec<PinnedRule>) -> Self {
        self.classifier = self.classifier.with_pins(pins);
        self
    }

    /// Parse `source`. Files without a filename timestamp are stamped with
    /// `fallback`; every statement of a file shares one timestamp.
    pub fn parse(&self, source: &SourceFile, fallback: DateTime<Utc>) -> ParsedFile {
        let timestamp = timestamp::resolve(&source.name, fallback);
        let mut statements = Vec::new();
        let mut residue: Vec<String> = Vec::new();

        for candidate in self.segmenter.split(&source.content) {
            match self
                .classifier
                .classify_with_preamble(&candidate.text, &candidate.preamble)
            {
                Some(found) => statements.push(Statement::new(
                    found.kind,
                    found.name,
                    candidate.text,
                    source.name.as_str(),
                    timestamp,
                )),
                None if strip_leading_comments(&candidate.text).is_empty() => {}
                None => residue.push(candidate.text),
            }
        }

        let parsed_lines = statements.iter().map(Statement::line_count).sum();
        let stats = FileStats::new(non_blank_lines(&source.content), parsed_lines);

        tracing::debug!(
            "Parsed {}: {} statements, {}% coverage",
            source.name,
            statements.len(),
            stats.percentage
        );

        ParsedFile {
            filename: source.name.clone(),
            original_content: source.content.clone(),
            statements,
            unparsed: residue.join("\n\n"),
            stats,
        }
    }

    /// Parse with the wall clock as fallback timestamp.
    pub fn parse_now(&self, source: &SourceFile) -> ParsedFile {
        self.parse(source, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn parse(name: &str, content: &str) -> ParsedFile {
        let table = PatternTable::defaults();
        FileParser::new(&table).parse_now(&SourceFile::new(name, content))
    }

    #[test]
    fn test_single_table() {
        let file = parse("a.sql", "CREATE TABLE users (id INT PRIMARY KEY);");
        assert_eq!(file.statements.len(), 1);
        assert_eq!(file.statements[0].kind, "table");
        assert_eq!(file.statements[0].name, "users");
        assert_eq!(file.unparsed, "");
        assert_eq!(file.stats, FileStats { total_lines: 1, parsed_lines: 1, percentage: 100 });
    }

    #[test]
    fn test_comment_only_file() {
        let file = parse("a.sql", "-- comment only\n");
        assert!(file.statements.is_empty());
        assert!(!file.has_unparsed());
        assert_eq!(file.stats.total_lines, 1);
        assert_eq!(file.stats.percentage, 0);
    }

    #[test]
    fn test_empty_file_stats() {
        let file = parse("a.sql", "");
        assert_eq!(file.stats, FileStats::default());
    }

    #[test]
    fn test_residue_joined_with_blank_line() {
        let sql = "SELECT 1;\nCREATE TABLE t (id int);\nSELECT 2;\n";
        let file = parse("a.sql", sql);
        assert_eq!(file.statements.len(), 1);
        assert_eq!(file.unparsed, "SELECT 1;\n\nSELECT 2;");
        assert_eq!(file.stats.parsed_lines, 1);
        assert_eq!(file.stats.percentage, 33);
    }

    #[test]
    fn test_statements_share_filename_timestamp() {
        let file = parse(
            "20240115093000_init.sql",
            "CREATE SCHEMA app;\nCREATE TABLE app.users (id int);\n",
        );
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap();
        assert!(file.statements.iter().all(|s| s.timestamp == expected));
        assert!(file.statements.iter().all(|s| s.file_name == "20240115093000_init.sql"));
    }

    #[test]
    fn test_fallback_clock_used() {
        let table = PatternTable::defaults();
        let fallback = Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap();
        let file = FileParser::new(&table).parse(&SourceFile::new("seed.sql", "CREATE TABLE t (id int);"), fallback);
        assert_eq!(file.statements[0].timestamp, fallback);
    }

    #[test]
    fn test_read_keeps_path_and_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("20240101000000_x.sql");
        std::fs::write(&path, "CREATE TABLE x (id int);").unwrap();
        let source = SourceFile::read(&path).unwrap();
        assert_eq!(source.name, path.display().to_string());
        assert!(SourceFile::read(&dir.path().join("missing.sql")).is_err());

        let file = parse(&source.name, &source.content);
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(file.statements[0].timestamp, expected);
        assert_eq!(file.statements[0].file_name, source.name);
    }

    #[test]
    fn test_pinned_rule_sees_comment_above_statement() {
        let sql = "create table profiles (id uuid);\n\n-- trigger the function every time a user is created\ncreate trigger on_auth_user_created\n  after insert on auth.users\n  for each row execute procedure public.handle_new_user();\n";
        let table = PatternTable::empty();
        let file = FileParser::new(&table).parse_now(&SourceFile::new("a.sql", sql));

        let trigger = file
            .statements
            .iter()
            .find(|s| s.name == "on_auth_user_created")
            .unwrap();
        assert_eq!(trigger.kind, "trigger");
        assert!(trigger.content.starts_with("create trigger"));

        let unpinned = FileParser::new(&table)
            .with_pins(Vec::new())
            .parse_now(&SourceFile::new("a.sql", sql));
        assert!(unpinned.statements.iter().all(|s| s.kind != "trigger"));
    }
}
