use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

/// `SQLFOLD_QUIET=1` (or `true`) suppresses banners, progress and tables.
pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var("SQLFOLD_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}
