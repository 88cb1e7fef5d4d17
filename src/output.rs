use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

/// `NODEPREFS_QUIET=1` strips icons and colors from human output
pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var("NODEPREFS_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}
