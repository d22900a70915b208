use crate::parser::ParsedFile;
use crate::pattern::PatternTable;
use crate::version::VersionSet;
use crate::Statement;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Tabled)]
pub struct FileRow {
    #[tabled(rename = "File")]
    pub file: String,
    #[tabled(rename = "Statements")]
    pub statements: usize,
    #[tabled(rename = "Lines")]
    pub lines: String,
    #[tabled(rename = "Coverage")]
    pub coverage: String,
}

impl From<&ParsedFile> for FileRow {
    fn from(file: &ParsedFile) -> Self {
        Self {
            file: file.filename.clone(),
            statements: file.statements.len(),
            lines: format!("{}/{}", file.stats.parsed_lines, file.stats.total_lines),
            coverage: format!("{}%", file.stats.percentage),
        }
    }
}

#[derive(Tabled)]
pub struct StatementRow {
    #[tabled(rename = "Type")]
    pub kind: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "File")]
    pub file: String,
    #[tabled(rename = "Hash")]
    pub hash: String,
}

impl From<&Statement> for StatementRow {
    fn from(statement: &Statement) -> Self {
        Self {
            kind: statement.kind.clone(),
            name: statement.name.clone(),
            file: statement.file_name.clone(),
            hash: statement.hash.clone(),
        }
    }
}

#[derive(Tabled)]
pub struct VersionRow {
    #[tabled(rename = "Type")]
    pub kind: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Versions")]
    pub versions: usize,
    #[tabled(rename = "Latest")]
    pub latest: String,
    #[tabled(rename = "From")]
    pub file: String,
}

impl From<&VersionSet> for VersionRow {
    fn from(set: &VersionSet) -> Self {
        let latest = set.latest();
        Self {
            kind: set.kind.clone(),
            name: set.name.clone(),
            versions: set.len(),
            latest: latest
                .map(|s| s.timestamp.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
            file: latest.map(|s| s.file_name.clone()).unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
pub struct PatternRow {
    #[tabled(rename = "#")]
    pub position: usize,
    #[tabled(rename = "Type")]
    pub kind: String,
    #[tabled(rename = "Regex")]
    pub regex: String,
    #[tabled(rename = "Description")]
    pub description: String,
    #[tabled(rename = "Source")]
    pub source: &'static str,
}

pub fn pattern_rows(table: &PatternTable) -> Vec<PatternRow> {
    table
        .iter()
        .enumerate()
        .flat_map(|(i, pattern)| {
            pattern.regexes.iter().map(move |re| PatternRow {
                position: i + 1,
                kind: pattern.kind.clone(),
                regex: re.to_wire(),
                description: pattern.description.clone(),
                source: if pattern.is_default { "default" } else { "custom" },
            })
        })
        .collect()
}

/// Render rows with the rounded style; empty input renders nothing.
pub fn render<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        render(&self.rows)
    }
}

pub fn stats_table(stats: &[(&str, String)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}
