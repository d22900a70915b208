//! Execution ordering
//!
//! A heuristic: statements run grouped by type priority, then by name. This
//! is not a dependency sort; a view over a later-named view can still come
//! out first.

use crate::statement::kind;
use crate::Statement;

/// Priority assigned to types without an entry
pub const UNKNOWN_PRIORITY: u32 = 999;

/// Execution priority of a statement type; lower runs first.
pub fn type_priority(kind_tag: &str) -> u32 {
    match kind_tag {
        kind::SCHEMA => 0,
        kind::EXTENSION => 1,
        kind::TYPE | kind::SEQUENCE => 2,
        kind::TABLE => 3,
        kind::VIEW => 4,
        kind::FUNCTION => 5,
        kind::TRIGGER => 6,
        kind::INDEX => 7,
        kind::CONSTRAINT => 8,
        kind::POLICY | kind::ALTER_RLS_POLICY => 9,
        kind::COMMENT => 10,
        kind::GRANT => 11,
        kind::REVOKE => 12,
        kind::ALTER => 13,
        kind::PLPGSQL => 14,
        _ => UNKNOWN_PRIORITY,
    }
}

/// Stable sort by `(priority, name)`; names compare case-sensitively.
pub fn execution_order(statements: &[Statement]) -> Vec<Statement> {
    let mut ordered = statements.to_vec();
    ordered.sort_by(|a, b| {
        type_priority(&a.kind)
            .cmp(&type_priority(&b.kind))
            .then_with(|| a.name.cmp(&b.name))
    });
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn stmt(kind: &str, name: &str) -> Statement {
        Statement::new(kind, name, format!("-- {kind} {name}"), "f.sql", Utc::now())
    }

    fn keys(statements: &[Statement]) -> Vec<(String, String)> {
        statements.iter().map(|s| (s.kind.clone(), s.name.clone())).collect()
    }

    #[test]
    fn test_priority_table() {
        assert_eq!(type_priority("schema"), 0);
        assert_eq!(type_priority("type"), type_priority("sequence"));
        assert_eq!(type_priority("policy"), type_priority("alterRLSPolicy"));
        assert_eq!(type_priority("plpgsql"), 14);
        assert_eq!(type_priority("dropTable"), UNKNOWN_PRIORITY);
        assert_eq!(type_priority("Table"), UNKNOWN_PRIORITY);
    }

    #[test]
    fn test_orders_by_priority_then_name() {
        let input = vec![
            stmt("grant", "users"),
            stmt("table", "users"),
            stmt("insert", "settings"),
            stmt("table", "accounts"),
            stmt("schema", "app"),
            stmt("function", "touch"),
        ];
        let ordered = execution_order(&input);
        assert_eq!(
            keys(&ordered),
            vec![
                ("schema".into(), "app".into()),
                ("table".into(), "accounts".into()),
                ("table".into(), "users".into()),
                ("function".into(), "touch".into()),
                ("grant".into(), "users".into()),
                ("insert".into(), "settings".into()),
            ]
        );
    }

    #[test]
    fn test_names_case_sensitive() {
        let ordered = execution_order(&[stmt("table", "b"), stmt("table", "B"), stmt("table", "a")]);
        let names: Vec<&str> = ordered.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["B", "a", "b"]);
    }

    #[test]
    fn test_stable_for_equal_keys() {
        let first = stmt("policy", "p");
        let second = stmt("alterRLSPolicy", "p");
        let ordered = execution_order(&[first.clone(), second.clone()]);
        assert_eq!(ordered[0].id, first.id);
        assert_eq!(ordered[1].id, second.id);
    }
}
