//! Default values for repo-fleet.
//!
//! This module provides centralized default values used across commands,
//! so the CLI, the settings loader and the tests agree on them.

use std::path::PathBuf;

/// Environment variable naming an explicit settings file.
pub const SETTINGS_ENV: &str = "REPO_FLEET_SETTINGS";

/// Environment variable holding the default discovery root.
pub const ROOTS_ENV: &str = "REPO_FLEET_ROOTS";

/// File name of the user settings file inside the config directory.
pub const SETTINGS_FILENAME: &str = "settings.yaml";

/// Root scanned when neither flags nor settings name one.
pub const DEFAULT_ROOT: &str = ".";

/// Remote name used by every remote-aware action unless overridden.
pub const DEFAULT_REMOTE: &str = "origin";

/// Returns the default settings file location.
///
/// Uses the platform-appropriate config directory:
/// - Linux: `~/.config/repo-fleet/settings.yaml` (XDG Base Directory)
/// - macOS: `~/Library/Application Support/repo-fleet/settings.yaml`
/// - Windows: `{FOLDERID_RoamingAppData}\repo-fleet\settings.yaml`
///
/// Returns `None` when the platform config directory cannot be determined.
/// This can be overridden by the `--settings` CLI flag or the
/// `REPO_FLEET_SETTINGS` environment variable.
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|directory| directory.join("repo-fleet").join(SETTINGS_FILENAME))
}
