//! Pattern interchange format
//!
//! A JSON array of records:
//!
//! ```json
//! [{"regex": "/^\\s*SELECT\\s+cron\\.schedule/i", "description": "cron job",
//!   "type": "cron", "createdAt": "2024-05-01T12:00:00Z"}]
//! ```
//!
//! Import is lenient per entry: a record with a missing or malformed `regex`
//! (or no `type`) is rejected on its own and the rest of the batch still
//! loads. Only a document that is not a JSON array fails as a whole.

use super::{Pattern, PatternTable, SqlRegex};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One exported pattern regex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternRecord {
    /// `/pattern/flags`
    pub regex: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

/// An import entry that could not be loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedPattern {
    /// Position in the imported array
    pub index: usize,
    pub reason: String,
}

/// Outcome of a pattern import.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub rejected: Vec<RejectedPattern>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

impl PatternTable {
    /// Flatten patterns into interchange records, one per regex.
    pub fn to_records(&self, custom_only: bool) -> Vec<PatternRecord> {
        self.iter()
            .filter(|p| !custom_only || !p.is_default)
            .flat_map(|p| {
                p.regexes.iter().map(move |re| PatternRecord {
                    regex: re.to_wire(),
                    description: p.description.clone(),
                    kind: p.kind.clone(),
                    created_at: p.created_at,
                })
            })
            .collect()
    }

    /// Serialize patterns as a pretty JSON array.
    pub fn export_json(&self, custom_only: bool) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_records(custom_only))?)
    }

    /// Import records as custom patterns, appended in array order.
    pub fn import_json(&mut self, json: &str) -> Result<ImportReport> {
        let document: Value = serde_json::from_str(json)
            .map_err(|e| Error::MalformedPatternImport(format!("invalid JSON: {}", e)))?;

        let entries = document
            .as_array()
            .ok_or_else(|| Error::MalformedPatternImport("expected a JSON array".to_string()))?;

        let mut report = ImportReport::default();
        for (index, entry) in entries.iter().enumerate() {
            match record_to_pattern(entry) {
                Ok(pattern) => {
                    self.push(pattern);
                    report.imported += 1;
                }
                Err(reason) => {
                    tracing::warn!("Rejected pattern #{}: {}", index, reason);
                    report.rejected.push(RejectedPattern { index, reason });
                }
            }
        }

        Ok(report)
    }
}

fn record_to_pattern(entry: &Value) -> std::result::Result<Pattern, String> {
    let wire = entry
        .get("regex")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing \"regex\" string".to_string())?;
    let regex = SqlRegex::parse(wire).map_err(|e| e.to_string())?;

    let kind = entry
        .get("type")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| "missing \"type\" string".to_string())?;

    let description = entry
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let mut pattern = Pattern::custom(kind, vec![regex], description);
    if let Some(created_at) = entry
        .get("createdAt")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
    {
        pattern.created_at = created_at.with_timezone(&Utc);
    }

    Ok(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_skips_bad_entries() {
        let mut table = PatternTable::defaults();
        let json = r#"[
            {"regex": "/^\\s*SELECT\\s+cron\\.schedule\\s*\\(\\s*'([^']+)'/i", "description": "cron", "type": "cron", "createdAt": "2024-05-01T12:00:00Z"},
            {"description": "no regex", "type": "x"},
            {"regex": "missing-slashes", "type": "x"},
            {"regex": "/(/i", "type": "x"},
            {"regex": "/ok/i"},
            {"regex": "/^\\s*NOTIFY\\s+(\\w+)/i", "type": "notify"}
        ]"#;

        let report = table.import_json(json).unwrap();
        assert_eq!(report.imported, 2);
        let rejected: Vec<usize> = report.rejected.iter().map(|r| r.index).collect();
        assert_eq!(rejected, vec![1, 2, 3, 4]);

        let kinds = table.kinds();
        assert_eq!(&kinds[kinds.len() - 2..], &["cron", "notify"]);

        let cron = table.custom_patterns().next().unwrap();
        assert_eq!(cron.created_at.to_rfc3339(), "2024-05-01T12:00:00+00:00");
    }

    #[test]
    fn test_import_rejects_non_array() {
        let mut table = PatternTable::defaults();
        assert!(matches!(
            table.import_json(r#"{"regex": "/a/i"}"#),
            Err(Error::MalformedPatternImport(_))
        ));
        assert!(matches!(
            table.import_json("not json"),
            Err(Error::MalformedPatternImport(_))
        ));
    }

    #[test]
    fn test_export_then_import_custom() {
        let mut table = PatternTable::defaults();
        table.add_custom("cron", "/cron\\.schedule/i", "cron").unwrap();
        let json = table.export_json(true).unwrap();

        let records: Vec<PatternRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].regex, "/cron\\.schedule/i");

        let mut fresh = PatternTable::defaults();
        let report = fresh.import_json(&json).unwrap();
        assert!(report.is_clean());
        assert_eq!(fresh.kinds(), table.kinds());
    }

    #[test]
    fn test_export_all_includes_defaults() {
        let table = PatternTable::defaults();
        assert_eq!(table.to_records(false).len(), table.len());
        assert!(table.to_records(true).is_empty());
    }
}
