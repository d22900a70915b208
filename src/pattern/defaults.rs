//! Factory pattern table
//!
//! Order matters: the classifier walks types top to bottom and the first
//! regex that matches wins. Every default regex is anchored at the start of
//! the statement body (leading comments already stripped).

use crate::statement::kind;

/// Possibly schema-qualified, possibly quoted identifier (capturing).
pub(crate) const IDENT: &str = r#"((?:"[^"]+"|[\w$]+)(?:\s*\.\s*(?:"[^"]+"|[\w$]+))*)"#;

/// Same as [`IDENT`] without a capture group.
pub(crate) const IDENT_NC: &str = r#"(?:"[^"]+"|[\w$]+)(?:\s*\.\s*(?:"[^"]+"|[\w$]+))*"#;

/// One factory pattern: type, regex source, flags, description.
pub(crate) struct DefaultPattern {
    pub kind: &'static str,
    pub source: String,
    pub flags: &'static str,
    pub description: &'static str,
}

fn pat(kind: &'static str, source: String, flags: &'static str, description: &'static str) -> DefaultPattern {
    DefaultPattern { kind, source, flags, description }
}

/// The factory table in precedence order.
pub(crate) fn default_patterns() -> Vec<DefaultPattern> {
    vec![
        // ── extension ────────────────────────────────────────────────────
        pat(
            kind::EXTENSION,
            r#"^\s*CREATE\s+EXTENSION\s+(?:IF\s+NOT\s+EXISTS\s+)?("?[\w-]+"?)"#.to_string(),
            "i",
            "CREATE EXTENSION",
        ),
        // ── schema ───────────────────────────────────────────────────────
        pat(
            kind::SCHEMA,
            format!(r"^\s*CREATE\s+SCHEMA\s+(?:IF\s+NOT\s+EXISTS\s+)?{IDENT}"),
            "i",
            "CREATE SCHEMA",
        ),
        // ── type ─────────────────────────────────────────────────────────
        pat(
            kind::TYPE,
            format!(r"^\s*CREATE\s+TYPE\s+{IDENT}"),
            "i",
            "CREATE TYPE (enum, composite, range)",
        ),
        pat(
            kind::TYPE,
            format!(r"^\s*CREATE\s+DOMAIN\s+{IDENT}"),
            "i",
            "CREATE DOMAIN",
        ),
        // ── sequence ─────────────────────────────────────────────────────
        pat(
            kind::SEQUENCE,
            format!(r"^\s*CREATE\s+(?:(?:TEMP|TEMPORARY|UNLOGGED)\s+)?SEQUENCE\s+(?:IF\s+NOT\s+EXISTS\s+)?{IDENT}"),
            "i",
            "CREATE SEQUENCE",
        ),
        // ── table ────────────────────────────────────────────────────────
        pat(
            kind::TABLE,
            format!(
                r"^\s*CREATE\s+(?:(?:GLOBAL|LOCAL)\s+)?(?:(?:TEMP|TEMPORARY|UNLOGGED)\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?{IDENT}"
            ),
            "i",
            "CREATE TABLE",
        ),
        // ── view ─────────────────────────────────────────────────────────
        pat(
            kind::VIEW,
            format!(
                r"^\s*CREATE\s+(?:OR\s+REPLACE\s+)?(?:(?:TEMP|TEMPORARY)\s+)?(?:RECURSIVE\s+)?(?:MATERIALIZED\s+)?VIEW\s+(?:IF\s+NOT\s+EXISTS\s+)?{IDENT}"
            ),
            "i",
            "CREATE [MATERIALIZED] VIEW",
        ),
        // ── function ─────────────────────────────────────────────────────
        pat(
            kind::FUNCTION,
            format!(r"^\s*CREATE\s+(?:OR\s+REPLACE\s+)?(?:FUNCTION|PROCEDURE)\s+{IDENT}"),
            "i",
            "CREATE FUNCTION / PROCEDURE",
        ),
        // ── trigger ──────────────────────────────────────────────────────
        pat(
            kind::TRIGGER,
            format!(r"^\s*CREATE\s+(?:OR\s+REPLACE\s+)?(?:CONSTRAINT\s+)?TRIGGER\s+{IDENT}"),
            "i",
            "CREATE TRIGGER",
        ),
        pat(
            kind::TRIGGER,
            format!(r"^\s*CREATE\s+EVENT\s+TRIGGER\s+{IDENT}"),
            "i",
            "CREATE EVENT TRIGGER",
        ),
        // ── index ────────────────────────────────────────────────────────
        pat(
            kind::INDEX,
            r"^\s*CREATE\s+(?:UNIQUE\s+)?INDEX\s+(?:CONCURRENTLY\s+)?ON\s".to_string(),
            "i",
            "CREATE INDEX without a name",
        ),
        pat(
            kind::INDEX,
            format!(
                r"^\s*CREATE\s+(?:UNIQUE\s+)?INDEX\s+(?:CONCURRENTLY\s+)?(?:IF\s+NOT\s+EXISTS\s+)?{IDENT}"
            ),
            "i",
            "CREATE INDEX",
        ),
        // ── constraint ───────────────────────────────────────────────────
        pat(
            kind::CONSTRAINT,
            format!(
                r"^\s*ALTER\s+TABLE\s+(?:IF\s+EXISTS\s+)?(?:ONLY\s+)?{IDENT_NC}\s+ADD\s+CONSTRAINT\s+{IDENT}"
            ),
            "i",
            "ALTER TABLE ... ADD CONSTRAINT",
        ),
        // ── policy ───────────────────────────────────────────────────────
        pat(
            kind::POLICY,
            format!(r#"^\s*CREATE\s+POLICY\s+((?:"[^"]+"|[\w$]+)\s+ON\s+{IDENT_NC})"#),
            "i",
            "CREATE POLICY (named by policy and table)",
        ),
        // ── comment ──────────────────────────────────────────────────────
        pat(
            kind::COMMENT,
            format!(
                r"^\s*COMMENT\s+ON\s+(?:TABLE|COLUMN|FUNCTION|PROCEDURE|MATERIALIZED\s+VIEW|VIEW|SCHEMA|TYPE|DOMAIN|INDEX|SEQUENCE|POLICY|TRIGGER|EXTENSION|CONSTRAINT)\s+{IDENT}"
            ),
            "i",
            "COMMENT ON",
        ),
        // ── grant ────────────────────────────────────────────────────────
        pat(
            kind::GRANT,
            format!(
                r"^\s*GRANT\s+(.+?)\s+ON\s+(?:(?:TABLE|SEQUENCE|FUNCTION|PROCEDURE|ROUTINE|SCHEMA|TYPE|DOMAIN)\s+|ALL\s+(?:TABLES|SEQUENCES|FUNCTIONS|PROCEDURES|ROUTINES)\s+IN\s+SCHEMA\s+)?{IDENT}"
            ),
            "is",
            "GRANT privileges ON object",
        ),
        pat(
            kind::GRANT,
            format!(r"^\s*GRANT\s+{IDENT}\s+TO\s"),
            "i",
            "GRANT role TO role",
        ),
        // ── revoke ───────────────────────────────────────────────────────
        pat(
            kind::REVOKE,
            format!(
                r"^\s*REVOKE\s+(.+?)\s+ON\s+(?:(?:TABLE|SEQUENCE|FUNCTION|PROCEDURE|ROUTINE|SCHEMA|TYPE|DOMAIN)\s+|ALL\s+(?:TABLES|SEQUENCES|FUNCTIONS|PROCEDURES|ROUTINES)\s+IN\s+SCHEMA\s+)?{IDENT}"
            ),
            "is",
            "REVOKE privileges ON object",
        ),
        pat(
            kind::REVOKE,
            format!(r"^\s*REVOKE\s+{IDENT}\s+FROM\s"),
            "i",
            "REVOKE role FROM role",
        ),
    ]
}
