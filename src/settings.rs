//! User settings: defaults for roots, template variables and prompting.
//!
//! The settings file is optional YAML:
//!
//! ```yaml
//! roots: [~/src/work]
//! variables:
//!   owner: acme
//! assume_yes: false
//! include_nested: false
//! ```
//!
//! It is looked up at `--settings <FILE>`, then `$REPO_FLEET_SETTINGS`, then
//! the platform config directory (see [`default_settings_path`]). A file named
//! by the flag or the variable must exist; the default one may be absent.
//! Command-line flags always win over values read here.

use crate::defaults::{default_settings_path, SETTINGS_ENV};
use crate::error::{Error, Result};
use crate::filesystem::FileSystem;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub roots: Vec<PathBuf>,
    pub variables: BTreeMap<String, String>,
    pub assume_yes: bool,
    pub include_nested: bool,
}

impl Settings {
    /// Settings variables overlaid with `overrides` (later wins).
    pub fn merged_variables(
        &self,
        overrides: impl IntoIterator<Item = (String, String)>,
    ) -> BTreeMap<String, String> {
        let mut variables = self.variables.clone();
        variables.extend(overrides);
        variables
    }
}

/// Where settings would be read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsLocation {
    pub path: PathBuf,
    /// Named explicitly, so a missing file is an error.
    pub required: bool,
}

/// Picks the settings file: flag, then environment value, then default.
pub fn locate(
    flag: Option<&Path>,
    environment: Option<OsString>,
    default: Option<PathBuf>,
) -> Option<SettingsLocation> {
    if let Some(path) = flag {
        return Some(SettingsLocation {
            path: path.to_path_buf(),
            required: true,
        });
    }
    if let Some(value) = environment.filter(|value| !value.is_empty()) {
        return Some(SettingsLocation {
            path: PathBuf::from(value),
            required: true,
        });
    }
    default.map(|path| SettingsLocation {
        path,
        required: false,
    })
}

/// [`locate`] with the process environment and the platform default.
pub fn locate_from_env(flag: Option<&Path>) -> Option<SettingsLocation> {
    locate(flag, std::env::var_os(SETTINGS_ENV), default_settings_path())
}

/// Parses settings YAML. An empty document yields the defaults.
pub fn parse(text: &str) -> Result<Settings> {
    if text.trim().is_empty() {
        return Ok(Settings::default());
    }
    serde_yaml::from_str(text).map_err(|error| Error::ConfigParse {
        message: format!("invalid settings: {error}"),
        hint: Some("settings keys are roots, variables, assume_yes and include_nested".to_string()),
    })
}

/// Reads the settings at `location`. A missing optional file yields the
/// defaults; a missing required one is a `ConfigParse` error.
pub fn load(filesystem: &dyn FileSystem, location: &SettingsLocation) -> Result<Settings> {
    if !filesystem.exists(&location.path)? {
        if location.required {
            return Err(Error::ConfigParse {
                message: format!("settings file not found: {}", location.path.display()),
                hint: None,
            });
        }
        log::debug!("no settings at {}", location.path.display());
        return Ok(Settings::default());
    }
    let bytes = filesystem.read_file(&location.path)?;
    let text = String::from_utf8(bytes).map_err(|error| Error::ConfigParse {
        message: format!("{} is not UTF-8: {}", location.path.display(), error),
        hint: None,
    })?;
    parse(&text)
}
