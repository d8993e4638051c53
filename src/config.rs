//! # Workflow Configuration Parsing
//!
//! This module defines the data structures for a workflow document and the
//! logic for parsing it. Parsing is purely structural: step options stay an
//! untyped YAML tree and are only interpreted later by the compiler and the
//! template renderer.
//!
//! ## Format
//!
//! ```yaml
//! workflow:
//!   - step:
//!       name: canonical remotes
//!       command: ["remote", "update-to-canonical"]
//!       with:
//!         owner: acme
//! ```
//!
//! `command` may also be written as a single string (`command: remote
//! update-to-canonical`); it is split on whitespace.
//!
//! The parser first tries the documented format. If that fails it falls back
//! to a bare list of `- step:` entries without the `workflow:` wrapper, so
//! that snippets copied out of a larger document still load.

use crate::error::{Error, Result};
use crate::workflow::options::OptionMap;
use serde::{Deserialize, Deserializer, Serialize};

const FORMAT_HINT: &str =
    "expected a top-level `workflow:` list of `- step: { name, command, with }` entries";

/// A parsed workflow: steps in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Configuration {
    pub steps: Vec<StepConfiguration>,
}

impl Configuration {
    pub fn new(steps: Vec<StepConfiguration>) -> Self {
        Self { steps }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Serializes back into the documented format.
    pub fn to_yaml(&self) -> Result<String> {
        let document = WorkflowDocument {
            workflow: self
                .steps
                .iter()
                .cloned()
                .map(|step| StepEntry { step })
                .collect(),
        };
        Ok(serde_yaml::to_string(&document)?)
    }
}

/// One workflow step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepConfiguration {
    #[serde(default)]
    pub name: String,
    /// Command path, e.g. `["tasks", "apply"]`.
    #[serde(deserialize_with = "deserialize_command")]
    pub command: Vec<String>,
    /// Raw options from `with:`.
    #[serde(rename = "with", default, skip_serializing_if = "OptionMap::is_empty")]
    pub options: OptionMap,
}

impl StepConfiguration {
    pub fn new<I, S>(name: impl Into<String>, command: I, options: OptionMap) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            command: command.into_iter().map(Into::into).collect(),
            options,
        }
    }

    /// Step name, or the command path when the step is unnamed.
    pub fn display_name(&self) -> String {
        if self.name.trim().is_empty() {
            self.command.join(" ")
        } else {
            self.name.clone()
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CommandSpelling {
    Words(Vec<String>),
    Line(String),
}

fn deserialize_command<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Vec<String>, D::Error> {
    Ok(match CommandSpelling::deserialize(deserializer)? {
        CommandSpelling::Words(words) => words,
        CommandSpelling::Line(line) => line.split_whitespace().map(str::to_string).collect(),
    })
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StepEntry {
    step: StepConfiguration,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WorkflowDocument {
    #[serde(default)]
    workflow: Vec<StepEntry>,
}

/// Parses a workflow document.
pub fn parse(yaml_content: &str) -> Result<Configuration> {
    if yaml_content.trim().is_empty() {
        return Ok(Configuration::default());
    }

    match serde_yaml::from_str::<WorkflowDocument>(yaml_content) {
        Ok(document) => Ok(into_configuration(document.workflow)),
        Err(document_error) => match serde_yaml::from_str::<Vec<StepEntry>>(yaml_content) {
            Ok(entries) => Ok(into_configuration(entries)),
            Err(_) => Err(Error::ConfigParse {
                message: document_error.to_string(),
                hint: Some(FORMAT_HINT.to_string()),
            }),
        },
    }
}

fn into_configuration(entries: Vec<StepEntry>) -> Configuration {
    Configuration::new(entries.into_iter().map(|entry| entry.step).collect())
}

/// Parses a workflow document from a file.
pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Configuration> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| Error::ConfigParse {
        message: format!("cannot read {}: {}", path.display(), e),
        hint: None,
    })?;
    parse(&content)
}
