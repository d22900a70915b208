//! Migration timestamps recovered from filenames
//!
//! Supabase and most migration tools prefix files with `YYYYMMDDHHMMSS_`.

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

static FILENAME_TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|_)(\d{14})_").expect("static regex"));

/// Extract the timestamp embedded in a migration filename, if any.
///
/// Only the final path component is inspected.
pub fn from_filename(file_name: &str) -> Option<DateTime<Utc>> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let caps = FILENAME_TIMESTAMP.captures(base)?;
    match NaiveDateTime::parse_from_str(&caps[1], "%Y%m%d%H%M%S") {
        Ok(naive) => Some(naive.and_utc()),
        Err(e) => {
            tracing::debug!("Ignoring timestamp in {}: {}", base, e);
            None
        }
    }
}

/// Filename timestamp, else `fallback`.
pub fn resolve(file_name: &str, fallback: DateTime<Utc>) -> DateTime<Utc> {
    from_filename(file_name).unwrap_or(fallback)
}
