use crate::pattern::{PatternRecord, PatternTable};
use crate::segmenter::SegmenterOptions;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlfoldConfig {
    /// Custom pattern store
    pub patterns: String,
    /// Filename globs to pick up when walking directories
    pub include: Vec<String>,
    /// Gitignore-style exclude lines
    pub exclude: Vec<String>,
    /// Default output file for `generate`
    pub output: Option<String>,
    pub summary: bool,
    pub threads: Option<usize>,
    pub merge_trigger_function: bool,
}

impl Default for SqlfoldConfig {
    fn default() -> Self {
        Self {
            patterns: default_patterns_path().display().to_string(),
            include: vec!["*.sql".to_string()],
            exclude: Vec::new(),
            output: None,
            summary: true,
            threads: None,
            merge_trigger_function: false,
        }
    }
}

impl SqlfoldConfig {
    pub fn segmenter_options(&self) -> SegmenterOptions {
        SegmenterOptions {
            merge_trigger_function: self.merge_trigger_function,
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("sqlfold.toml")
}

pub fn default_patterns_path() -> PathBuf {
    PathBuf::from(".sqlfold").join("patterns.json")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<SqlfoldConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: SqlfoldConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &SqlfoldConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

pub fn ensure_gitignore(project_root: &Path) -> anyhow::Result<()> {
    let gitignore_path = project_root.join(".gitignore");
    let entry = ".sqlfold/";

    let mut content = String::new();
    if gitignore_path.exists() {
        content = std::fs::read_to_string(&gitignore_path)?;
        if content.lines().any(|line| line.trim() == entry) {
            return Ok(());
        }
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
    }
    content.push_str(entry);
    content.push('\n');
    std::fs::write(&gitignore_path, content)?;
    Ok(())
}

/// On-disk pattern store: custom patterns plus the table order.
///
/// A bare interchange array is accepted too, as written by `patterns export`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PatternStore {
    #[serde(default)]
    order: Vec<String>,
    #[serde(default)]
    patterns: Vec<Value>,
}

/// Factory table plus whatever the store at `path` adds.
pub fn load_patterns(path: &Path) -> anyhow::Result<PatternTable> {
    let mut table = PatternTable::defaults();
    if !path.exists() {
        return Ok(table);
    }

    let contents = std::fs::read_to_string(path)?;
    let store = match serde_json::from_str::<Value>(&contents)? {
        Value::Array(patterns) => PatternStore {
            order: Vec::new(),
            patterns,
        },
        other => serde_json::from_value(other)?,
    };

    let report = table.import_json(&serde_json::to_string(&store.patterns)?)?;
    if !report.is_clean() {
        tracing::warn!(
            "{} stored patterns in {} could not be loaded",
            report.rejected.len(),
            path.display()
        );
    }

    let known = table.kinds().into_iter().map(str::to_string).collect::<Vec<_>>();
    let order: Vec<&str> = store
        .order
        .iter()
        .map(String::as_str)
        .filter(|kind| known.iter().any(|k| k == kind))
        .collect();
    table.set_order(&order)?;

    Ok(table)
}

/// Persist the custom patterns and the current table order.
pub fn save_patterns(path: &Path, table: &PatternTable) -> anyhow::Result<()> {
    let records: Vec<PatternRecord> = table.to_records(true);
    let store = serde_json::json!({
        "order": table.kinds(),
        "patterns": records,
    });

    ensure_parent_dir(path)?;
    std::fs::write(path, serde_json::to_string_pretty(&store)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let config: SqlfoldConfig = toml::from_str("summary = false\ninclude = [\"*.up.sql\"]\n").unwrap();
        assert!(!config.summary);
        assert_eq!(config.include, vec!["*.up.sql"]);
        assert_eq!(config.patterns, default_patterns_path().display().to_string());
        assert!(!config.merge_trigger_function);
    }

    #[test]
    fn test_write_and_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sqlfold.toml");
        let config = SqlfoldConfig {
            threads: Some(2),
            merge_trigger_function: true,
            ..SqlfoldConfig::default()
        };

        write_config(&path, &config, false).unwrap();
        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &config, true).unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded, config);
        assert!(loaded.segmenter_options().merge_trigger_function);
        assert!(load_config(Some(&dir.path().join("none.toml"))).unwrap().is_none());
    }

    #[test]
    fn test_ensure_gitignore_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "target/").unwrap();
        ensure_gitignore(dir.path()).unwrap();
        ensure_gitignore(dir.path()).unwrap();
        let content = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(content, "target/\n.sqlfold/\n");
    }

    #[test]
    fn test_pattern_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".sqlfold").join("patterns.json");

        let mut table = PatternTable::defaults();
        table.add_custom("cron", r"/^\s*SELECT\s+cron\.schedule/i", "pg_cron").unwrap();
        table.set_order(&["cron", "policy"]).unwrap();
        save_patterns(&path, &table).unwrap();

        let loaded = load_patterns(&path).unwrap();
        assert_eq!(loaded.kinds(), table.kinds());
        assert_eq!(loaded.custom_patterns().count(), 1);
    }

    #[test]
    fn test_bare_array_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patterns.json");
        std::fs::write(&path, r#"[{"regex": "/^\\s*NOTIFY\\s+(\\w+)/i", "type": "notify", "description": ""}]"#).unwrap();
        let loaded = load_patterns(&path).unwrap();
        assert_eq!(loaded.kinds().last(), Some(&"notify"));
    }

    #[test]
    fn test_missing_store_is_factory_table() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_patterns(&dir.path().join("nope.json")).unwrap();
        assert_eq!(loaded, PatternTable::defaults());
    }
}
