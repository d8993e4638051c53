//! # Output Configuration
//!
//! Colour and emoji decisions for the final run summary. Per-repository
//! lines (`PLAN`, `SKIP`, `ERROR`, ...) are plain text written through the
//! [`Reporter`](crate::workflow::environment::Reporter) so they stay easy to
//! grep; only the summary is decorated.
//!
//! ## Respecting User Preferences
//!
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals

use crate::workflow::executor::ExecutionOutcome;
use console::style;
use std::env;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Builds the configuration from the `--color` flag value ("always",
    /// "never" or "auto"). In auto mode the environment decides.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_ascii_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => color_from_env(|key| env::var_os(key).map(|v| v.to_string_lossy().into_owned()))
                .unwrap_or_else(|| console::Term::stdout().features().colors_supported()),
        };
        Self { use_color }
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

/// The colour decision the environment forces, if any. `None` leaves it to
/// terminal detection.
fn color_from_env(lookup: impl Fn(&str) -> Option<String>) -> Option<bool> {
    // NO_COLOR counts even when empty.
    if lookup("NO_COLOR").is_some() || lookup("CLICOLOR").as_deref() == Some("0") {
        return Some(false);
    }
    match lookup("CLICOLOR_FORCE") {
        Some(force) if !force.is_empty() && force != "0" => return Some(true),
        _ => {}
    }
    match lookup("TERM").as_deref() {
        Some("dumb") => Some(false),
        _ => None,
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns `emoji_str` when colors are enabled, `plain` otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// One-line summary of a run, e.g.
/// `[DONE] 3 processed, 1 skipped, 0 failed (dry run)`.
pub fn summary_line(config: &OutputConfig, outcome: &ExecutionOutcome, dry_run: bool) -> String {
    let (marker, plain) = if outcome.has_failures() {
        ("❌", "[FAIL]")
    } else if outcome.cancelled {
        ("⚠️", "[STOP]")
    } else {
        ("✅", "[DONE]")
    };

    let failed = format!("{} failed", outcome.failed());
    let failed = if config.use_color && outcome.has_failures() {
        style(failed).red().bold().to_string()
    } else {
        failed
    };

    let mut line = format!(
        "{} {} processed, {} skipped, {}",
        emoji(config, marker, plain),
        outcome.processed(),
        outcome.skipped(),
        failed
    );
    if outcome.cancelled {
        line.push_str(" (cancelled)");
    }
    if dry_run {
        line.push_str(" (dry run)");
    }
    line
}
