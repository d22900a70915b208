//! Statement Classifier
//!
//! Maps a candidate to a `(type, name)` pair. Rules, strictly in order:
//! 1. Comment-only candidates are rejected
//! 2. Pinned literal exceptions
//! 3. `ALTER TABLE ... ENABLE|DISABLE ROW LEVEL SECURITY`
//! 4. The pattern table, in table order
//! 5. Fallbacks: `DROP <kind>`, `ALTER <kind>`, generic DML/DDL verbs, anonymous blocks
//!
//! Anything left over is unclassified and belongs in the unparsed residue.

use crate::pattern::{PatternTable, SqlRegex};
use crate::statement::kind;
use regex::{Captures, Regex};
use std::sync::LazyLock;

static ROW_LEVEL_SECURITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)^\s*ALTER\s+TABLE\s+(?:IF\s+EXISTS\s+)?(?:ONLY\s+)?((?:"[^"]+"|[\w$]+)(?:\s*\.\s*(?:"[^"]+"|[\w$]+))*)\s+(?:ENABLE|DISABLE)\s+ROW\s+LEVEL\s+SECURITY"#)
        .expect("static regex")
});

static DROP_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)^\s*DROP\s+(MATERIALIZED\s+VIEW|EVENT\s+TRIGGER|FOREIGN\s+TABLE|[a-z]+)\s+(?:CONCURRENTLY\s+)?(?:IF\s+EXISTS\s+)?((?:"[^"]+"|[\w$]+)(?:\s*\.\s*(?:"[^"]+"|[\w$]+))*)"#)
        .expect("static regex")
});

static ALTER_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)^\s*ALTER\s+(?:MATERIALIZED\s+VIEW|[a-z]+)\s+(?:IF\s+EXISTS\s+)?(?:ONLY\s+)?((?:"[^"]+"|[\w$]+)(?:\s*\.\s*(?:"[^"]+"|[\w$]+))*)"#)
        .expect("static regex")
});

static GENERIC_VERB: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"(?is)^\s*(INSERT)\s+INTO\s+((?:"[^"]+"|[\w$]+)(?:\s*\.\s*(?:"[^"]+"|[\w$]+))*)"#,
        r#"(?is)^\s*(UPDATE)\s+(?:ONLY\s+)?((?:"[^"]+"|[\w$]+)(?:\s*\.\s*(?:"[^"]+"|[\w$]+))*)"#,
        r#"(?is)^\s*(DELETE)\s+FROM\s+(?:ONLY\s+)?((?:"[^"]+"|[\w$]+)(?:\s*\.\s*(?:"[^"]+"|[\w$]+))*)"#,
        r#"(?is)^\s*(CREATE)\s+(?:OR\s+REPLACE\s+)?(?:[a-z]+\s+)??[a-z]+\s+(?:IF\s+NOT\s+EXISTS\s+)?((?:"[^"]+"|[\w$]+)(?:\s*\.\s*(?:"[^"]+"|[\w$]+))*)"#,
    ]
    .iter()
    .map(|src| Regex::new(src).expect("static regex"))
    .collect()
});

static ANONYMOUS_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*(?:BEGIN\b|DO\s+(?:LANGUAGE\s+\w+\s+)?\$)").expect("static regex")
});

/// How a classification was reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchSource {
    /// Pinned literal exception
    Pinned,
    /// Row level security toggle
    RowLevelSecurity,
    /// Pattern table hit
    Table { description: String },
    /// Fallback chain
    Fallback,
}

/// Classifier output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: String,
    pub name: String,
    pub source: MatchSource,
}

impl Classification {
    fn new(kind: impl Into<String>, name: impl Into<String>, source: MatchSource) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            source,
        }
    }
}

/// A literal-match override checked before the pattern table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnedRule {
    /// Literal object name that must appear in the statement
    pub name_literal: String,
    /// Second literal (usually a comment) that must also appear
    pub marker_literal: String,
    /// Type assigned on match
    pub kind: String,
}

impl PinnedRule {
    fn matches(&self, lowered: &str) -> bool {
        lowered.contains(&self.name_literal.to_lowercase())
            && lowered.contains(&self.marker_literal.to_lowercase())
    }
}

/// The auth-user trigger shipped in Supabase starter migrations. Its
/// commented, multi-clause form defeats the pattern table.
pub fn default_pins() -> Vec<PinnedRule> {
    vec![PinnedRule {
        name_literal: "on_auth_user_created".to_string(),
        marker_literal: "trigger the function every time a user is created".to_string(),
        kind: kind::TRIGGER.to_string(),
    }]
}

/// Classifies candidates against a pattern table
pub struct Classifier<'a> {
    table: &'a PatternTable,
    pins: Vec<PinnedRule>,
}

impl<'a> Classifier<'a> {
    pub fn new(table: &'a PatternTable) -> Self {
        Self {
            table,
            pins: default_pins(),
        }
    }

    /// Replace the pinned literal rules
    pub fn with_pins(mut self, pins: Vec<PinnedRule>) -> Self {
        self.pins = pins;
        self
    }

    /// Classify one candidate, or `None` when it belongs in the residue.
    pub fn classify(&self, candidate: &str) -> Option<Classification> {
        self.classify_with_preamble(candidate, "")
    }

    /// Like [`Classifier::classify`], with the comment block written directly
    /// above the candidate visible to the pinned rules.
    pub fn classify_with_preamble(&self, candidate: &str, preamble: &str) -> Option<Classification> {
        let body = strip_leading_comments(candidate);
        if body.is_empty() {
            return None;
        }

        let lowered = format!("{}\n{}", preamble, candidate).to_lowercase();
        if let Some(pin) = self.pins.iter().find(|p| p.matches(&lowered)) {
            return Some(Classification::new(&pin.kind, &pin.name_literal, MatchSource::Pinned));
        }

        if let Some(caps) = ROW_LEVEL_SECURITY.captures(body) {
            return Some(Classification::new(
                kind::ALTER_RLS_POLICY,
                normalize_name(&caps[1]),
                MatchSource::RowLevelSecurity,
            ));
        }

        if let Some(found) = self.match_table(body) {
            return Some(found);
        }

        let fallback = fallback(body);
        if fallback.is_none() {
            tracing::trace!("Unclassified candidate: {}", first_line(body));
        }
        fallback
    }

    fn match_table(&self, body: &str) -> Option<Classification> {
        for pattern in self.table.iter() {
            for regex in &pattern.regexes {
                if let Some(caps) = regex.regex().captures(body) {
                    let name = extract_name(&pattern.kind, regex, &caps);
                    return Some(Classification::new(
                        &pattern.kind,
                        name,
                        MatchSource::Table {
                            description: pattern.description.clone(),
                        },
                    ));
                }
            }
        }
        None
    }
}

/// Group 1, else group 2, else a synthesized name. Grants and revokes name
/// the object (group 2) rather than the privilege list.
fn extract_name(kind_tag: &str, regex: &SqlRegex, caps: &Captures) -> String {
    let group = |i: usize| {
        caps.get(i)
            .map(|m| normalize_name(m.as_str()))
            .filter(|s| !s.is_empty())
    };

    let name = if kind_tag == kind::GRANT || kind_tag == kind::REVOKE {
        group(2).or_else(|| group(1))
    } else {
        group(1).or_else(|| group(2))
    };

    name.unwrap_or_else(|| {
        tracing::trace!(pattern = %regex, "No capture group, synthesizing name");
        format!("anonymous_{}_{}", kind_tag, random_suffix())
    })
}

fn fallback(body: &str) -> Option<Classification> {
    if let Some(caps) = DROP_OBJECT.captures(body) {
        return Some(Classification::new(
            drop_kind(&caps[1]),
            normalize_name(&caps[2]),
            MatchSource::Fallback,
        ));
    }

    if let Some(caps) = ALTER_OBJECT.captures(body) {
        return Some(Classification::new(kind::ALTER, normalize_name(&caps[1]), MatchSource::Fallback));
    }

    for regex in GENERIC_VERB.iter() {
        if let Some(caps) = regex.captures(body) {
            return Some(Classification::new(
                caps[1].to_lowercase(),
                normalize_name(&caps[2]),
                MatchSource::Fallback,
            ));
        }
    }

    if ANONYMOUS_BLOCK.is_match(body) {
        return Some(Classification::new(
            kind::PLPGSQL,
            format!("sql_block_{}", random_suffix()),
            MatchSource::Fallback,
        ));
    }

    None
}

/// `MATERIALIZED VIEW` -> `dropMaterializedView`
fn drop_kind(object: &str) -> String {
    let mut tag = String::from("drop");
    for word in object.split_whitespace() {
        let lower = word.to_lowercase();
        let mut chars = lower.chars();
        if let Some(first) = chars.next() {
            tag.extend(first.to_uppercase());
            tag.push_str(chars.as_str());
        }
    }
    tag
}

/// Strip quotes and collapse whitespace
pub fn normalize_name(raw: &str) -> String {
    raw.replace('"', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Skip leading `--` lines and `/* */` blocks.
pub fn strip_leading_comments(text: &str) -> &str {
    let mut rest = text.trim_start();
    loop {
        if rest.starts_with("--") {
            rest = match rest.find('\n') {
                Some(pos) => rest[pos + 1..].trim_start(),
                None => "",
            };
        } else if rest.starts_with("/*") {
            rest = match rest.find("*/") {
                Some(pos) => rest[pos + 2..].trim_start(),
                None => "",
            };
        } else {
            return rest.trim_end();
        }
    }
}

fn random_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}
