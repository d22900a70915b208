//! Textual dependency lookup
//!
//! Finds statements that mention an object by name. Matching is a
//! case-insensitive substring test against a few reference shapes, so it
//! both over- and under-reports; good enough to answer "what touches
//! `users`?" before editing a table.

use crate::statement::kind;
use crate::Statement;

/// Types whose statement creates the object it is named after
const DEFINING_KINDS: &[&str] = &[
    kind::SCHEMA,
    kind::EXTENSION,
    kind::TYPE,
    kind::SEQUENCE,
    kind::TABLE,
    kind::VIEW,
    kind::FUNCTION,
    kind::TRIGGER,
    kind::INDEX,
    kind::CONSTRAINT,
    kind::POLICY,
    "create",
];

/// Reference shapes tried against lowercased statement text
fn reference_needles(name: &str) -> [String; 6] {
    let name = name.to_lowercase();
    [
        format!(" {name} "),
        format!(" {name}("),
        format!(" {name}."),
        format!("({name}"),
        format!("on {name}"),
        format!("on public.{name}"),
    ]
}

/// Whether `statement` is the definition of `object_name`
fn defines(statement: &Statement, object_name: &str) -> bool {
    statement.name.eq_ignore_ascii_case(object_name) && DEFINING_KINDS.contains(&statement.kind.as_str())
}

/// Statements whose content references `object_name`, in input order.
/// The statements defining `object_name` are excluded; grants, alters and
/// other statements merely named after it are kept.
pub fn find_dependencies<'a>(all: &'a [Statement], object_name: &str) -> Vec<&'a Statement> {
    if object_name.trim().is_empty() {
        return Vec::new();
    }
    let needles = reference_needles(object_name);

    all.iter()
        .filter(|s| !defines(s, object_name))
        .filter(|s| {
            let content = s.content.to_lowercase();
            needles.iter().any(|needle| content.contains(needle.as_str()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn stmt(kind: &str, name: &str, content: &str) -> Statement {
        Statement::new(kind, name, content, "f.sql", Utc::now())
    }

    fn names<'a>(found: &[&'a Statement]) -> Vec<&'a str> {
        found.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_finds_references() {
        let all = vec![
            stmt("table", "users", "CREATE TABLE users (id int);"),
            stmt("table", "orders", "CREATE TABLE orders (user_id int REFERENCES users(id));"),
            stmt("policy", "read ON profiles", "CREATE POLICY read ON public.users FOR SELECT USING (true);"),
            stmt("index", "idx", "CREATE INDEX idx ON users (email);"),
            stmt("table", "settings", "CREATE TABLE settings (id int);"),
        ];
        let found = find_dependencies(&all, "users");
        assert_eq!(names(&found), vec!["orders", "read ON profiles", "idx"]);
    }

    #[test]
    fn test_case_insensitive() {
        let all = vec![stmt("view", "v", "CREATE VIEW v AS SELECT * FROM Users WHERE x;")];
        assert_eq!(find_dependencies(&all, "USERS").len(), 1);
    }

    #[test]
    fn test_excludes_definition_and_prefix_names() {
        let all = vec![
            stmt("table", "users", "CREATE TABLE users (id int);"),
            stmt("table", "users_archive", "CREATE TABLE users_archive (id int);"),
        ];
        assert!(find_dependencies(&all, "users").is_empty());
    }

    #[test]
    fn test_definition_excluded_case_insensitively() {
        let all = vec![
            stmt("table", "users", "CREATE TABLE users (id int);"),
            stmt("index", "i", "CREATE INDEX i ON users (id);"),
        ];
        assert_eq!(names(&find_dependencies(&all, "Users")), vec!["i"]);
    }

    #[test]
    fn test_same_named_references_kept() {
        let all = vec![
            stmt("table", "users", "CREATE TABLE users (id int);"),
            stmt("grant", "users", "GRANT SELECT ON users TO anon;"),
            stmt("alter", "users", "ALTER TABLE users ADD COLUMN age int;"),
        ];
        let found = find_dependencies(&all, "users");
        let kinds: Vec<&str> = found.iter().map(|s| s.kind.as_str()).collect();
        assert_eq!(kinds, vec!["grant", "alter"]);
    }

    #[test]
    fn test_blank_name() {
        let all = vec![stmt("table", "t", "CREATE TABLE t (id int);")];
        assert!(find_dependencies(&all, "  ").is_empty());
    }
}
