//! Untyped option trees and typed accessors over them.
//!
//! Workflow steps and task actions carry their settings as an ordered YAML
//! mapping (`OptionMap`). Interpretation happens late: the compiler checks the
//! shape it needs, and action handlers read rendered values through
//! [`ActionOptions`], which turns every shape problem into a
//! [`Error::Validation`] naming the option.

use crate::error::{Error, Result};
use serde_yaml::Value;

/// Ordered, untyped option tree as written under `with:` or `options:`.
pub type OptionMap = serde_yaml::Mapping;

/// Typed, read-only view of an option map.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOptions {
    context: String,
    values: OptionMap,
}

impl ActionOptions {
    /// Wraps `values`; `context` names the step or action in error messages.
    pub fn new(context: impl Into<String>, values: OptionMap) -> Self {
        Self {
            context: context.into(),
            values,
        }
    }

    /// Name used when reporting problems with these options.
    pub fn context(&self) -> &str {
        &self.context
    }

    /// The underlying option tree.
    pub fn values(&self) -> &OptionMap {
        &self.values
    }

    /// Whether a key is present (even if null).
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn invalid(&self, message: String) -> Error {
        Error::validation(self.context.clone(), message)
    }

    /// A required, non-empty string option.
    pub fn string(&self, key: &str) -> Result<String> {
        match self.optional_string(key)? {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(self.invalid(format!("option '{key}' is required"))),
        }
    }

    /// An optional string option. Numbers and booleans are accepted and
    /// converted to their textual form.
    pub fn optional_string(&self, key: &str) -> Result<Option<String>> {
        match self.values.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.clone())),
            Some(Value::Number(value)) => Ok(Some(value.to_string())),
            Some(Value::Bool(value)) => Ok(Some(value.to_string())),
            Some(_) => Err(self.invalid(format!("option '{key}' must be a string"))),
        }
    }

    /// A string option with a default for missing or empty values.
    pub fn string_or(&self, key: &str, default: &str) -> Result<String> {
        Ok(self
            .optional_string(key)?
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| default.to_string()))
    }

    /// A boolean option. Rendered templates produce strings, so `"true"` and
    /// `"false"` are accepted as well.
    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool> {
        match self.values.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Bool(value)) => Ok(*value),
            Some(Value::String(value)) => match value.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" => Ok(true),
                "false" | "no" => Ok(false),
                "" => Ok(default),
                _ => Err(self.invalid(format!("option '{key}' must be a boolean"))),
            },
            Some(_) => Err(self.invalid(format!("option '{key}' must be a boolean"))),
        }
    }

    /// A non-negative integer option.
    pub fn u64_or(&self, key: &str, default: u64) -> Result<u64> {
        match self.values.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Number(value)) => value
                .as_u64()
                .ok_or_else(|| self.invalid(format!("option '{key}' must be a positive integer"))),
            Some(Value::String(value)) => value
                .trim()
                .parse::<u64>()
                .map_err(|_| self.invalid(format!("option '{key}' must be a positive integer"))),
            Some(_) => Err(self.invalid(format!("option '{key}' must be a positive integer"))),
        }
    }

    /// A list of strings. A single string is treated as a one-element list.
    pub fn string_list(&self, key: &str) -> Result<Vec<String>> {
        match self.values.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::String(value)) => Ok(vec![value.clone()]),
            Some(Value::Sequence(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(value) => Ok(value.clone()),
                    Value::Number(value) => Ok(value.to_string()),
                    _ => Err(self.invalid(format!("option '{key}' must be a list of strings"))),
                })
                .collect(),
            Some(_) => Err(self.invalid(format!("option '{key}' must be a list of strings"))),
        }
    }

    /// A list of strings that must contain at least one entry.
    pub fn required_string_list(&self, key: &str) -> Result<Vec<String>> {
        let values: Vec<String> = self
            .string_list(key)?
            .into_iter()
            .filter(|value| !value.trim().is_empty())
            .collect();
        if values.is_empty() {
            return Err(self.invalid(format!("option '{key}' must list at least one value")));
        }
        Ok(values)
    }

    /// A list of strings with a default for missing or empty lists.
    pub fn string_list_or(&self, key: &str, default: &[&str]) -> Result<Vec<String>> {
        let values = self.string_list(key)?;
        if values.is_empty() {
            Ok(default.iter().map(|value| value.to_string()).collect())
        } else {
            Ok(values)
        }
    }

    /// Fails when any key outside `allowed` is present.
    pub fn reject_unknown(&self, allowed: &[&str]) -> Result<()> {
        for key in self.values.keys() {
            let name = key.as_str().unwrap_or_default();
            if !allowed.contains(&name) {
                return Err(self.invalid(format!(
                    "unknown option '{}' (expected one of: {})",
                    name,
                    allowed.join(", ")
                )));
            }
        }
        Ok(())
    }
}
