//! Consolidated script generation
//!
//! Reduces statements to their latest versions, orders them for execution and
//! renders one script. Output contains no clock or random data, so the same
//! input always yields the same bytes.

use crate::order::execution_order;
use crate::version::latest_versions;
use crate::Statement;
use std::collections::HashMap;

const RULE: &str = "-- ============================================================";

/// Rendering options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Emit the per-type count block after the header
    pub include_summary: bool,
    pub title: String,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            include_summary: true,
            title: "Consolidated migration".to_string(),
        }
    }
}

/// Renders statements into a single SQL script
#[derive(Debug, Clone, Default)]
pub struct SqlGenerator {
    options: GeneratorOptions,
}

impl SqlGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: GeneratorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Latest versions in execution order, grouped by type. A group sits
    /// where its type first appears; types sharing a priority never split
    /// each other's group.
    pub fn plan(&self, statements: &[Statement]) -> Vec<(String, Vec<Statement>)> {
        let ordered = execution_order(&latest_versions(statements));

        let mut slots: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<(String, Vec<Statement>)> = Vec::new();
        for statement in ordered {
            match slots.get(&statement.kind) {
                Some(&slot) => groups[slot].1.push(statement),
                None => {
                    slots.insert(statement.kind.clone(), groups.len());
                    groups.push((statement.kind.clone(), vec![statement]));
                }
            }
        }
        groups
    }

    pub fn generate(&self, statements: &[Statement]) -> String {
        let groups = self.plan(statements);
        let total: usize = groups.iter().map(|(_, members)| members.len()).sum();

        let mut out = String::new();
        out.push_str(RULE);
        out.push('\n');
        out.push_str(&format!("-- {}\n", self.options.title));
        out.push_str("-- Generated by sqlfold\n");
        out.push_str(RULE);
        out.push_str("\n\n");

        if self.options.include_summary {
            out.push_str("-- Summary:\n");
            for (kind, members) in &groups {
                out.push_str(&format!("--   {}: {}\n", kind, members.len()));
            }
            out.push_str(&format!("-- Total: {} statements\n\n", total));
        }

        for (kind, members) in &groups {
            out.push_str(RULE);
            out.push('\n');
            out.push_str(&format!("-- {} ({})\n", kind.to_uppercase(), members.len()));
            out.push_str(RULE);
            out.push_str("\n\n");

            for statement in members {
                out.push_str(&format!(
                    "-- From: {}\n-- Object: {}\n{}\n\n",
                    statement.file_name, statement.name, statement.content
                ));
            }
        }

        tracing::debug!("Generated script: {} statements in {} groups", total, groups.len());
        out
    }
}

/// Generate with default options
pub fn generate_sql(statements: &[Statement]) -> String {
    SqlGenerator::new().generate(statements)
}
