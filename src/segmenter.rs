//! Statement Segmenter - splits migration text into candidate statements
//!
//! The segmenter scans line by line and accumulates a buffer until a line
//! closes the statement. A line closes the buffer when:
//! - no block comment, dollar-quoted body, string literal or trigger is open
//! - the running parenthesis balance is zero
//! - the code part of the line (trailing `--` comment removed) ends with `;`
//!
//! Blank lines and full-line `--` comments seen between statements belong to
//! no statement and are dropped from the candidate text. The comment block
//! written directly above a statement is kept aside as its preamble. Whatever
//! is left in the buffer at the end of input becomes a final candidate even
//! though it was never terminated.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// Stands in for `;` inside `EXECUTE FUNCTION f(...)` argument lists while
/// scanning. Private-use code point, restored before a candidate is emitted.
const SEMICOLON_SENTINEL: char = '\u{E000}';

static EXECUTE_ARGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(EXECUTE\s+(?:PROCEDURE|FUNCTION)\s+[\w$."]+\s*\()([^)]*)(\))"#)
        .expect("static regex")
});

static TRIGGER_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*CREATE\s+(?:OR\s+REPLACE\s+)?(?:CONSTRAINT\s+)?TRIGGER\b").expect("static regex")
});

static TRIGGER_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)EXECUTE\s+(?:PROCEDURE|FUNCTION)\b.*\)\s*;").expect("static regex")
});

static TRIGGER_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*CREATE\s+(?:OR\s+REPLACE\s+)?(?:CONSTRAINT\s+)?TRIGGER\b").expect("static regex")
});

static ALTER_TABLE_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*ALTER\s+TABLE\b").expect("static regex"));

static CREATE_FUNCTION_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*CREATE\s+(?:OR\s+REPLACE\s+)?FUNCTION\b").expect("static regex")
});

static EXECUTE_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bEXECUTE\s+(?:PROCEDURE|FUNCTION)\b").expect("static regex"));

static DOLLAR_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$(?:[A-Za-z_][A-Za-z0-9_]*)?\$").expect("static regex"));

/// Segmenter behaviour switches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmenterOptions {
    /// Keep merging when a bare `CREATE TRIGGER ...;` is immediately followed
    /// by `CREATE FUNCTION`. Off by default: it can glue unrelated statements.
    pub merge_trigger_function: bool,
}

/// An unclassified segmenter output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Trimmed statement text
    pub text: String,
    /// First line of the candidate (1-indexed)
    pub start_line: usize,
    /// Last line of the candidate (1-indexed, inclusive)
    pub end_line: usize,
    /// Full-line `--` comments directly above the candidate, joined by `\n`
    pub preamble: String,
}

/// Line-oriented statement splitter
#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    options: SegmenterOptions,
}

impl Segmenter {
    /// Create a segmenter with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a segmenter with custom options
    pub fn with_options(options: SegmenterOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SegmenterOptions {
        &self.options
    }

    /// Split `text` into ordered candidates.
    pub fn split(&self, text: &str) -> Vec<Candidate> {
        let text = normalize_newlines(text);
        let lines: Vec<&str> = text.lines().collect();

        let mut candidates = Vec::new();
        let mut state = ScanState::default();
        let mut buffer = Buffer::default();
        let mut preamble: Vec<&str> = Vec::new();

        for (idx, &raw) in lines.iter().enumerate() {
            let line = mask_execute_args(raw);

            if buffer.is_empty() && state.at_rest() {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    preamble.clear();
                    continue;
                }
                if trimmed.starts_with("--") {
                    preamble.push(trimmed);
                    continue;
                }
            }

            let in_body_before = state.dollar_tag.is_some() || state.comment_depth > 0;
            let in_literal_before = state.in_string || state.in_ident;
            let code = state.scan(&line);
            if !in_body_before && !in_literal_before {
                buffer.mark(&code);
            }
            buffer.push(idx + 1, &line);

            if !in_body_before {
                track_trigger(&mut state, &code);
            }

            if !(state.at_rest() && code.trim_end().ends_with(';')) {
                continue;
            }

            if self.options.merge_trigger_function
                && is_bare_trigger(&buffer.text())
                && next_code_line_creates_function(&lines[idx + 1..])
            {
                tracing::trace!(line = idx + 1, "Merging bare trigger with following function");
                continue;
            }

            candidates.extend(buffer.take(preamble.join("\n")));
            preamble.clear();
        }

        candidates.extend(buffer.take(preamble.join("\n")));
        candidates
    }
}

/// Scanner state carried across lines
#[derive(Debug, Default)]
struct ScanState {
    comment_depth: usize,
    dollar_tag: Option<String>,
    in_string: bool,
    /// The open string is an `E'...'` literal with backslash escapes
    escape_string: bool,
    in_ident: bool,
    paren_depth: usize,
    in_trigger: bool,
}

impl ScanState {
    /// No construct open that forbids a boundary
    fn at_rest(&self) -> bool {
        self.comment_depth == 0
            && self.dollar_tag.is_none()
            && !self.in_string
            && !self.in_ident
            && !self.in_trigger
            && self.paren_depth == 0
    }

    /// Advance over one line and return its code part: the text outside
    /// comments and dollar-quoted bodies (delimiters kept).
    fn scan(&mut self, line: &str) -> String {
        let mut code = String::with_capacity(line.len());
        let mut i = 0;

        while i < line.len() {
            let rest = &line[i..];
            let Some(ch) = rest.chars().next() else { break };
            let width = ch.len_utf8();

            if self.comment_depth > 0 {
                if rest.starts_with("*/") {
                    self.comment_depth -= 1;
                    i += 2;
                } else if rest.starts_with("/*") {
                    self.comment_depth += 1;
                    i += 2;
                } else {
                    i += width;
                }
                continue;
            }

            if let Some(tag) = &self.dollar_tag {
                if rest.starts_with(tag.as_str()) {
                    code.push_str(tag);
                    i += tag.len();
                    self.dollar_tag = None;
                } else {
                    i += width;
                }
                continue;
            }

            if self.in_string {
                code.push(ch);
                i += width;
                if ch == '\\' && self.escape_string {
                    if let Some(next) = line[i..].chars().next() {
                        code.push(next);
                        i += next.len_utf8();
                    }
                } else if ch == '\'' {
                    if line[i..].starts_with('\'') {
                        // doubled quote stays inside the literal
                        code.push('\'');
                        i += 1;
                    } else {
                        self.in_string = false;
                        self.escape_string = false;
                    }
                }
                continue;
            }

            if self.in_ident {
                if ch == '"' {
                    self.in_ident = false;
                }
                code.push(ch);
                i += width;
                continue;
            }

            if rest.starts_with("--") {
                break;
            }
            if rest.starts_with("/*") {
                self.comment_depth = 1;
                i += 2;
                continue;
            }

            match ch {
                '$' => {
                    if let Some(m) = DOLLAR_TAG.find(rest) {
                        let tag = m.as_str().to_string();
                        code.push_str(&tag);
                        i += tag.len();
                        self.dollar_tag = Some(tag);
                        continue;
                    }
                }
                '\'' => {
                    self.in_string = true;
                    self.escape_string = opens_escape_string(&line[..i]);
                }
                '"' => self.in_ident = true,
                '(' => self.paren_depth += 1,
                ')' => self.paren_depth = self.paren_depth.saturating_sub(1),
                _ => {}
            }

            code.push(ch);
            i += width;
        }

        code
    }
}

/// Lines accumulated for the statement being built
#[derive(Debug, Default)]
struct Buffer {
    lines: Vec<String>,
    start_line: usize,
    /// First code line seen
    has_code: bool,
    /// The statement opens with a `CREATE TRIGGER` clause
    trigger_head: bool,
    /// Index of an `ALTER TABLE` line glued onto the trigger
    split_at: Option<usize>,
}

impl Buffer {
    fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Inspect the code part of the next line, scanned outside any body or
    /// literal, before it is pushed.
    fn mark(&mut self, code: &str) {
        if code.trim().is_empty() {
            return;
        }
        if !self.has_code {
            self.has_code = true;
            self.trigger_head = TRIGGER_START.is_match(code);
            return;
        }
        if self.trigger_head && self.split_at.is_none() && ALTER_TABLE_START.is_match(code) {
            self.split_at = Some(self.lines.len());
        }
    }

    fn push(&mut self, line_no: usize, line: &str) {
        if self.lines.is_empty() {
            self.start_line = line_no;
        }
        self.lines.push(line.to_string());
    }

    fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Drain the buffer into candidates, split at a glued `ALTER TABLE`.
    fn take(&mut self, preamble: String) -> Vec<Candidate> {
        let buffer = std::mem::take(self);
        let first = buffer.start_line;

        match buffer.split_at {
            Some(at) => {
                tracing::trace!(line = first + at, "Splitting ALTER TABLE off a trigger");
                let head = candidate(&buffer.lines[..at], first, preamble);
                let tail = candidate(&buffer.lines[at..], first + at, String::new());
                head.into_iter().chain(tail).collect()
            }
            None => candidate(&buffer.lines, first, preamble).into_iter().collect(),
        }
    }
}

/// Build a candidate from consecutive lines starting at `first_line`,
/// restoring masked semicolons.
fn candidate(lines: &[String], first_line: usize, preamble: String) -> Option<Candidate> {
    let text = unmask(&lines.join("\n"));
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let leading = lines.iter().take_while(|l| l.trim().is_empty()).count();
    let last = lines.iter().rposition(|l| !l.trim().is_empty()).unwrap_or(leading);

    Some(Candidate {
        text: trimmed.to_string(),
        start_line: first_line + leading,
        end_line: first_line + last,
        preamble,
    })
}

fn normalize_newlines(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// A quote preceded by a standalone `E`/`e` opens an escape string.
fn opens_escape_string(before: &str) -> bool {
    let mut rev = before.chars().rev();
    matches!(rev.next(), Some('E' | 'e'))
        && !rev.next().is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Hide semicolons inside `EXECUTE FUNCTION f(...)` argument lists.
fn mask_execute_args(line: &str) -> Cow<'_, str> {
    if !line.contains(';') {
        return Cow::Borrowed(line);
    }
    EXECUTE_ARGS.replace_all(line, |caps: &regex::Captures| {
        format!(
            "{}{}{}",
            &caps[1],
            caps[2].replace(';', &SEMICOLON_SENTINEL.to_string()),
            &caps[3]
        )
    })
}

fn unmask(text: &str) -> String {
    text.replace(SEMICOLON_SENTINEL, ";")
}

/// Enter trigger mode on an unterminated `CREATE TRIGGER` line and leave it
/// on the `EXECUTE FUNCTION ...);` line.
fn track_trigger(state: &mut ScanState, code: &str) {
    if state.in_trigger {
        if TRIGGER_END.is_match(code) {
            state.in_trigger = false;
        }
        return;
    }

    if TRIGGER_START.is_match(code)
        && !TRIGGER_END.is_match(code)
        && !code.trim_end().ends_with(';')
    {
        state.in_trigger = true;
    }
}

/// `CREATE TRIGGER ...;` with no EXECUTE clause
fn is_bare_trigger(text: &str) -> bool {
    TRIGGER_CLAUSE.is_match(text) && !EXECUTE_CLAUSE.is_match(text)
}

fn next_code_line_creates_function(rest: &[&str]) -> bool {
    rest.iter()
        .find(|l| !l.trim().is_empty())
        .is_some_and(|l| CREATE_FUNCTION_START.is_match(l))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str) -> Vec<String> {
        Segmenter::new().split(input).into_iter().map(|c| c.text).collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(Segmenter::new().split("").is_empty());
        assert!(Segmenter::new().split("\n\n   \n").is_empty());
    }

    #[test]
    fn test_simple_statements() {
        let out = texts("CREATE TABLE a (id INT);\nCREATE TABLE b (id INT);\n");
        assert_eq!(out, vec!["CREATE TABLE a (id INT);", "CREATE TABLE b (id INT);"]);
    }

    #[test]
    fn test_comment_lines_between_statements_dropped() {
        let out = texts("-- users\n\nCREATE TABLE users (id INT);\n-- trailing\n");
        assert_eq!(out, vec!["CREATE TABLE users (id INT);"]);
        assert!(texts("-- comment only\n").is_empty());
    }

    #[test]
    fn test_multiline_parens() {
        let input = "CREATE TABLE t (\n  id INT,\n  note TEXT DEFAULT ';'\n);\nSELECT 1;";
        let out = texts(input);
        assert_eq!(out.len(), 2);
        assert!(out[0].starts_with("CREATE TABLE t ("));
        assert!(out[0].ends_with(");"));
    }

    #[test]
    fn test_semicolon_inside_open_paren_does_not_close() {
        let out = texts("SELECT f(\n  1;\n);\n");
        assert_eq!(out, vec!["SELECT f(\n  1;\n);"]);
    }

    #[test]
    fn test_dollar_body_kept_whole() {
        let input = "CREATE OR REPLACE FUNCTION f() RETURNS void AS $$\nBEGIN\nEND;\n$$;\n";
        let out = Segmenter::new().split(input);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, input.trim());
        assert_eq!((out[0].start_line, out[0].end_line), (1, 4));
    }

    #[test]
    fn test_tagged_dollar_body() {
        let input = "CREATE FUNCTION g() RETURNS int AS $body$\nBEGIN\n  PERFORM 1; -- $$ inside\n  RETURN 1;\nEND;\n$body$ LANGUAGE plpgsql;\nSELECT 2;";
        let out = texts(input);
        assert_eq!(out.len(), 2);
        assert!(out[0].ends_with("$body$ LANGUAGE plpgsql;"));
        assert_eq!(out[1], "SELECT 2;");
    }

    #[test]
    fn test_block_comment_lines_never_close() {
        let input = "/*\n drop table x;\n*/\nCREATE TABLE y (id INT);";
        let out = texts(input);
        assert_eq!(out.len(), 1);
        assert!(out[0].starts_with("/*"));
        assert!(out[0].ends_with("CREATE TABLE y (id INT);"));
    }

    #[test]
    fn test_trailing_line_comment_ignored_for_boundary() {
        let out = texts("CREATE TABLE a (id INT); -- first\nCREATE TABLE b (id INT);");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], "CREATE TABLE a (id INT); -- first");
    }

    #[test]
    fn test_multi_line_trigger() {
        let input = "CREATE TRIGGER on_change\n  AFTER INSERT ON t\n  FOR EACH ROW\n  EXECUTE FUNCTION notify('a;b');\nSELECT 1;";
        let out = texts(input);
        assert_eq!(out.len(), 2);
        assert!(out[0].ends_with("EXECUTE FUNCTION notify('a;b');"));
    }

    #[test]
    fn test_trigger_waits_for_execute_clause() {
        let input = "CREATE TRIGGER t\n  BEFORE UPDATE ON x\n  FOR EACH ROW WHEN (true);\n  EXECUTE PROCEDURE touch();\nSELECT 1;";
        let out = texts(input);
        assert_eq!(out.len(), 2);
        assert!(out[0].contains("WHEN (true);"));
        assert!(out[0].ends_with("EXECUTE PROCEDURE touch();"));
    }

    #[test]
    fn test_execute_args_masked_and_restored() {
        assert_eq!(
            mask_execute_args("EXECUTE FUNCTION f('a;b');").as_ref(),
            format!("EXECUTE FUNCTION f('a{}b');", SEMICOLON_SENTINEL)
        );
        let out = texts("CREATE TRIGGER t AFTER INSERT ON x FOR EACH ROW EXECUTE FUNCTION f('a;b');");
        assert_eq!(out, vec!["CREATE TRIGGER t AFTER INSERT ON x FOR EACH ROW EXECUTE FUNCTION f('a;b');"]);
    }

    #[test]
    fn test_trigger_followed_by_alter_table_is_split() {
        let input = "CREATE TRIGGER t\n  AFTER INSERT ON x\n  FOR EACH ROW\nALTER TABLE x ENABLE ROW LEVEL SECURITY;\n  EXECUTE FUNCTION f();";
        let out = Segmenter::new().split(input);
        assert_eq!(out.len(), 2);
        assert!(out[0].text.starts_with("CREATE TRIGGER t"));
        assert_eq!(out[0].end_line, 3);
        assert!(out[1].text.starts_with("ALTER TABLE x ENABLE ROW LEVEL SECURITY;"));
        assert_eq!(out[1].start_line, 4);
    }

    #[test]
    fn test_trigger_and_alter_inside_function_body_stay_whole() {
        let input = "CREATE FUNCTION setup() RETURNS void AS $$\nBEGIN\n  CREATE TRIGGER t AFTER INSERT ON x FOR EACH ROW EXECUTE FUNCTION f();\n  ALTER TABLE x ENABLE ROW LEVEL SECURITY;\nEND;\n$$ LANGUAGE plpgsql;";
        let out = Segmenter::new().split(input);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, input);
    }

    #[test]
    fn test_alter_after_non_trigger_head_not_split() {
        let input = "SELECT f(\n  'CREATE TRIGGER t'\n);\nALTER TABLE x ADD COLUMN y int;";
        let out = texts(input);
        assert_eq!(out.len(), 2);
        assert!(out[1].starts_with("ALTER TABLE x"));
    }

    #[test]
    fn test_escape_string_literal() {
        let input = "INSERT INTO t VALUES (E'it\\'s');\nCREATE TABLE x (id int);\nCREATE TABLE y (id int);";
        let out = texts(input);
        assert_eq!(
            out,
            vec![
                "INSERT INTO t VALUES (E'it\\'s');",
                "CREATE TABLE x (id int);",
                "CREATE TABLE y (id int);",
            ]
        );
    }

    #[test]
    fn test_backslash_in_plain_string_is_literal() {
        let out = texts("INSERT INTO t VALUES ('C:\\');\nSELECT 'it''s; fine';\nSELECT 2;");
        assert_eq!(out, vec!["INSERT INTO t VALUES ('C:\\');", "SELECT 'it''s; fine';", "SELECT 2;"]);
    }

    #[test]
    fn test_comment_block_kept_as_preamble() {
        let input = "-- stale note\n\n-- trigger the function\n-- every time\nCREATE TRIGGER t AFTER INSERT ON x FOR EACH ROW EXECUTE FUNCTION f();\nSELECT 1;";
        let out = Segmenter::new().split(input);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].preamble, "-- trigger the function\n-- every time");
        assert!(out[0].text.starts_with("CREATE TRIGGER"));
        assert_eq!(out[0].start_line, 5);
        assert_eq!(out[1].preamble, "");
    }

    #[test]
    fn test_bare_trigger_lookahead_is_opt_in() {
        let input = "CREATE TRIGGER t;\nCREATE FUNCTION f() RETURNS trigger AS $$ BEGIN RETURN NEW; END; $$ LANGUAGE plpgsql;";

        assert_eq!(texts(input).len(), 2);

        let merging = Segmenter::with_options(SegmenterOptions { merge_trigger_function: true });
        let out = merging.split(input);
        assert_eq!(out.len(), 1);
        assert!(out[0].text.contains("CREATE FUNCTION f()"));
    }

    #[test]
    fn test_unterminated_tail_emitted() {
        let out = Segmenter::new().split("CREATE TABLE a (id INT);\nSELECT broken\n\n");
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].text, "SELECT broken");
        assert_eq!(out[1].start_line, 2);
    }

    #[test]
    fn test_crlf_normalized() {
        let out = texts("CREATE TABLE a (id INT);\r\nCREATE TABLE b (id INT);\r\n");
        assert_eq!(out, vec!["CREATE TABLE a (id INT);", "CREATE TABLE b (id INT);"]);
    }
}
