use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

/// `SHAPEGREP_QUIET=1` (or `true`) turns off the human summary block
pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var("SHAPEGREP_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}
