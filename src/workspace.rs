//! Workspace - owns everything one consolidation session works on
//!
//! The pattern table, parsed files and statement revisions live here rather
//! than in globals. Files are kept in first-parse order; re-parsing a file
//! replaces its entry in place.

use crate::classifier::PinnedRule;
use crate::dependency::find_dependencies;
use crate::generator::{GeneratorOptions, SqlGenerator};
use crate::parser::{BatchParser, FileFailure, FileParser, ParsedFile, SourceFile};
use crate::pattern::PatternTable;
use crate::segmenter::SegmenterOptions;
use crate::ui::ProgressMessage;
use crate::version::{latest_versions, version_sets, VersionSet};
use crate::{Error, Result, Statement};
use chrono::Utc;
use crossbeam::channel::Sender;
use std::path::PathBuf;

/// In-memory consolidation state.
#[derive(Debug, Default)]
pub struct Workspace {
    table: PatternTable,
    options: SegmenterOptions,
    pins: Option<Vec<PinnedRule>>,
    generator: GeneratorOptions,
    threads: Option<usize>,
    /// Parsed files in first-parse order
    files: Vec<ParsedFile>,
    /// Edited statement versions, oldest first
    revisions: Vec<Statement>,
}

impl Workspace {
    /// Create a workspace with the factory pattern table
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(table: PatternTable) -> Self {
        Self {
            table,
            ..Self::default()
        }
    }

    pub fn table(&self) -> &PatternTable {
        &self.table
    }

    /// Mutable table access. Already parsed files are not reclassified.
    pub fn table_mut(&mut self) -> &mut PatternTable {
        &mut self.table
    }

    pub fn set_segmenter_options(&mut self, options: SegmenterOptions) {
        self.options = options;
    }

    pub fn set_pins(&mut self, pins: Vec<PinnedRule>) {
        self.pins = Some(pins);
    }

    pub fn set_generator_options(&mut self, options: GeneratorOptions) {
        self.generator = options;
    }

    pub fn set_threads(&mut self, threads: usize) {
        self.threads = Some(threads);
    }

    fn file_parser(&self) -> FileParser<'_> {
        let parser = FileParser::new(&self.table).with_options(self.options.clone());
        match &self.pins {
            Some(pins) => parser.with_pins(pins.clone()),
            None => parser,
        }
    }

    fn batch_parser(&self, progress: Option<Sender<ProgressMessage>>) -> BatchParser<'_> {
        let mut parser = BatchParser::new(&self.table).with_options(self.options.clone());
        if let Some(pins) = &self.pins {
            parser = parser.with_pins(pins.clone());
        }
        if let Some(threads) = self.threads {
            parser = parser.with_threads(threads);
        }
        if let Some(tx) = progress {
            parser = parser.with_progress(tx);
        }
        parser
    }

    /// Parse one in-memory file, replacing any previous parse of it.
    pub fn parse_source(&mut self, name: &str, content: &str) -> &ParsedFile {
        let parsed = self
            .file_parser()
            .parse(&SourceFile::new(name, content), Utc::now());
        let index = self.insert(parsed);
        &self.files[index]
    }

    /// Parse files from disk on the worker pool. Unreadable files are
    /// returned as failures; everything else lands in the workspace.
    pub fn parse_paths(
        &mut self,
        paths: &[PathBuf],
        progress: Option<Sender<ProgressMessage>>,
    ) -> Result<Vec<FileFailure>> {
        let result = self.batch_parser(progress).parse_paths(paths)?;
        for file in result.files {
            self.insert(file);
        }
        Ok(result.failures)
    }

    /// Parse in-memory sources on the worker pool
    pub fn parse_sources(&mut self, sources: &[SourceFile]) -> Result<()> {
        let result = self.batch_parser(None).parse_sources(sources)?;
        for file in result.files {
            self.insert(file);
        }
        Ok(())
    }

    fn insert(&mut self, parsed: ParsedFile) -> usize {
        // Edits made against the old parse no longer apply.
        self.revisions.retain(|r| r.file_name != parsed.filename);

        match self.files.iter().position(|f| f.filename == parsed.filename) {
            Some(index) => {
                tracing::debug!("Replacing parse of {}", parsed.filename);
                self.files[index] = parsed;
                index
            }
            None => {
                self.files.push(parsed);
                self.files.len() - 1
            }
        }
    }

    /// Forget a file and its revisions
    pub fn remove_file(&mut self, filename: &str) -> bool {
        let before = self.files.len();
        self.files.retain(|f| f.filename != filename);
        self.revisions.retain(|r| r.file_name != filename);
        self.files.len() != before
    }

    pub fn files(&self) -> &[ParsedFile] {
        &self.files
    }

    pub fn file(&self, filename: &str) -> Option<&ParsedFile> {
        self.files.iter().find(|f| f.filename == filename)
    }

    /// Every statement version: parsed statements in file order, then edits.
    pub fn statements(&self) -> Vec<Statement> {
        self.files
            .iter()
            .flat_map(|f| f.statements.iter())
            .chain(self.revisions.iter())
            .cloned()
            .collect()
    }

    /// Find any version by id
    pub fn statement(&self, id: &str) -> Option<&Statement> {
        self.files
            .iter()
            .flat_map(|f| f.statements.iter())
            .chain(self.revisions.iter())
            .find(|s| s.id == id)
    }

    /// Record an edit as a new version of statement `id`.
    pub fn edit_statement(&mut self, id: &str, content: &str) -> Result<&Statement> {
        let revised = self
            .statement(id)
            .map(|s| s.revise(content))
            .ok_or_else(|| Error::StatementNotFound(id.to_string()))?;

        tracing::debug!("Revised {} as {}", id, revised.id);
        self.revisions.push(revised);
        self.revisions
            .last()
            .ok_or_else(|| Error::StatementNotFound(id.to_string()))
    }

    /// Residue of all files, separated by blank lines
    pub fn unparsed(&self) -> String {
        self.files
            .iter()
            .filter(|f| f.has_unparsed())
            .map(|f| f.unparsed.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn latest(&self) -> Vec<Statement> {
        latest_versions(&self.statements())
    }

    pub fn version_sets(&self) -> Vec<VersionSet> {
        version_sets(&self.statements())
    }

    /// Latest statements that reference `object_name`
    pub fn dependencies(&self, object_name: &str) -> Vec<Statement> {
        let latest = self.latest();
        find_dependencies(&latest, object_name)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Render the consolidated script
    pub fn generate(&self) -> String {
        SqlGenerator::with_options(self.generator.clone()).generate(&self.statements())
    }

    pub fn clear(&mut self) {
        self.files.clear();
        self.revisions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reparse_replaces_file() {
        let mut ws = Workspace::new();
        ws.parse_source("a.sql", "CREATE TABLE a (id int);\nCREATE TABLE b (id int);");
        ws.parse_source("b.sql", "CREATE VIEW v AS SELECT 1;");
        ws.parse_source("a.sql", "CREATE TABLE c (id int);");

        assert_eq!(ws.files().len(), 2);
        assert_eq!(ws.files()[0].filename, "a.sql");
        let names: Vec<String> = ws.statements().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["c", "v"]);
    }

    #[test]
    fn test_edit_appends_version() {
        let mut ws = Workspace::new();
        let id = ws.parse_source("a.sql", "CREATE TABLE users (id int);").statements[0].id.clone();

        let revised_id = ws
            .edit_statement(&id, "CREATE TABLE users (id bigint);")
            .unwrap()
            .id
            .clone();
        assert_ne!(revised_id, id);
        assert_eq!(ws.statements().len(), 2);

        let latest = ws.latest();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].id, revised_id);
        assert!(ws.generate().contains("bigint"));

        let sets = ws.version_sets();
        assert_eq!(sets[0].versions.len(), 2);
        assert_eq!(sets[0].versions[0].id, revised_id);
    }

    #[test]
    fn test_edit_unknown_statement() {
        let mut ws = Workspace::new();
        assert!(matches!(
            ws.edit_statement("nope", "SELECT 1;"),
            Err(Error::StatementNotFound(_))
        ));
    }

    #[test]
    fn test_reparse_drops_revisions() {
        let mut ws = Workspace::new();
        let id = ws.parse_source("a.sql", "CREATE TABLE t (id int);").statements[0].id.clone();
        ws.edit_statement(&id, "CREATE TABLE t (id bigint);").unwrap();
        ws.parse_source("a.sql", "CREATE TABLE t (id text);");
        assert_eq!(ws.statements().len(), 1);
        assert!(ws.generate().contains("id text"));
    }

    #[test]
    fn test_unparsed_and_dependencies() {
        let mut ws = Workspace::new();
        ws.parse_source("a.sql", "CREATE TABLE users (id int);\nSELECT 1;");
        ws.parse_source("b.sql", "CREATE INDEX idx_users ON users (id);\nSELECT 2;");

        assert_eq!(ws.unparsed(), "SELECT 1;\n\nSELECT 2;");
        let deps = ws.dependencies("users");
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].name, "idx_users");
    }

    #[test]
    fn test_custom_pattern_applies_to_later_parses() {
        let mut ws = Workspace::new();
        ws.table_mut()
            .add_custom("cron", r"/^\s*SELECT\s+cron\.schedule\s*\(\s*'([^']+)'/i", "pg_cron job")
            .unwrap();
        let file = ws.parse_source("a.sql", "SELECT cron.schedule('nightly', '0 0 * * *', 'VACUUM');");
        assert_eq!(file.statements[0].kind, "cron");
        assert_eq!(file.statements[0].name, "nightly");
    }

    #[test]
    fn test_same_basename_in_different_directories() {
        let dir = tempfile::tempdir().unwrap();
        let paths: Vec<PathBuf> = ["a", "b"]
            .iter()
            .map(|sub| {
                let path = dir.path().join(sub).join("001.sql");
                std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                std::fs::write(&path, format!("CREATE TABLE {sub}1 (id int);")).unwrap();
                path
            })
            .collect();

        let mut ws = Workspace::new();
        let failures = ws.parse_paths(&paths, None).unwrap();
        assert!(failures.is_empty());
        assert_eq!(ws.files().len(), 2);
        let names: Vec<String> = ws.statements().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["a1", "b1"]);
    }

    #[test]
    fn test_batch_sources() {
        let mut ws = Workspace::new();
        ws.set_threads(2);
        ws.parse_sources(&[
            SourceFile::new("20240101000000_a.sql", "CREATE TABLE orders (id int);"),
            SourceFile::new("20240201000000_b.sql", "CREATE TABLE orders (id bigint);"),
        ])
        .unwrap();
        let latest = ws.latest();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].file_name, "20240201000000_b.sql");
        assert!(ws.remove_file("20240201000000_b.sql"));
        assert_eq!(ws.latest()[0].file_name, "20240101000000_a.sql");
    }
}
