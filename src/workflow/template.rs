//! Placeholder rendering for branch names, commit messages, paths and options.
//!
//! Supported placeholders:
//!
//! - `{{ .Repository.Name }}`, `{{ .Repository.Owner }}`,
//!   `{{ .Repository.FullName }}`, `{{ .Repository.Path }}`,
//!   `{{ .Repository.DefaultBranch }}`, `{{ .Repository.CurrentBranch }}`,
//!   `{{ .Repository.RemoteURL }}`
//! - `{{ .Environment.<key> }}` for run variables
//!
//! Rendering is done per repository, right before a value is used.

use crate::error::{Error, Result};
use crate::workflow::environment::RepositoryState;
use crate::workflow::options::OptionMap;
use regex::Regex;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

fn placeholder_regex() -> Result<&'static Regex> {
    static PLACEHOLDER: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    PLACEHOLDER
        .get_or_init(|| Regex::new(r"\{\{(.*?)\}\}"))
        .as_ref()
        .map_err(|e| Error::Regex(e.clone()))
}

/// Whether `text` contains anything that looks like a placeholder.
pub fn contains_placeholder(text: &str) -> bool {
    text.contains("{{")
}

/// Values available to templates while processing one repository.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    repository: &'a RepositoryState,
    environment: &'a BTreeMap<String, String>,
}

impl<'a> TemplateContext<'a> {
    pub fn new(repository: &'a RepositoryState, environment: &'a BTreeMap<String, String>) -> Self {
        Self {
            repository,
            environment,
        }
    }

    fn lookup(&self, expression: &str) -> Result<String> {
        let unsupported = || Error::Template {
            message: format!("unsupported template expression '{{{{{expression}}}}}'"),
            variable: None,
        };

        let path = expression.trim().strip_prefix('.').ok_or_else(unsupported)?;
        let (scope, field) = path.split_once('.').ok_or_else(unsupported)?;

        match scope {
            "Repository" => self.repository_field(field),
            "Environment" => self.environment.get(field).cloned().ok_or_else(|| Error::Template {
                message: "undefined variable".to_string(),
                variable: Some(format!("Environment.{field}")),
            }),
            _ => Err(unsupported()),
        }
    }

    fn repository_field(&self, field: &str) -> Result<String> {
        let repository = self.repository;
        let value = match field {
            "Name" => Some(repository.name()),
            "Owner" => repository.owner(),
            "FullName" => repository.full_name(),
            "Path" => Some(repository.path.display().to_string()),
            "DefaultBranch" => repository.default_branch().map(str::to_string),
            "CurrentBranch" => repository.current_branch.clone(),
            "RemoteURL" => repository.remote_url.clone(),
            _ => {
                return Err(Error::Template {
                    message: "unknown repository field".to_string(),
                    variable: Some(format!("Repository.{field}")),
                })
            }
        };

        value.filter(|value| !value.is_empty()).ok_or_else(|| Error::Template {
            message: format!("value is unavailable for {}", repository.path.display()),
            variable: Some(format!("Repository.{field}")),
        })
    }
}

/// Renders every placeholder in `template`.
pub fn render(template: &str, context: &TemplateContext<'_>) -> Result<String> {
    if !contains_placeholder(template) {
        return Ok(template.to_string());
    }

    let mut rendered = String::with_capacity(template.len());
    let mut last = 0;
    for captures in placeholder_regex()?.captures_iter(template) {
        let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        rendered.push_str(&template[last..whole.start()]);
        rendered.push_str(&context.lookup(inner.as_str())?);
        last = whole.end();
    }
    rendered.push_str(&template[last..]);

    if template[last..].contains("{{") {
        return Err(Error::Template {
            message: format!("unterminated placeholder in '{template}'"),
            variable: None,
        });
    }

    Ok(rendered)
}

/// Renders every string inside a YAML value, recursively.
pub fn render_value(value: &Value, context: &TemplateContext<'_>) -> Result<Value> {
    Ok(match value {
        Value::String(text) => Value::String(render(text, context)?),
        Value::Sequence(items) => Value::Sequence(
            items
                .iter()
                .map(|item| render_value(item, context))
                .collect::<Result<Vec<_>>>()?,
        ),
        Value::Mapping(map) => Value::Mapping(render_options(map, context)?),
        Value::Tagged(tagged) => render_value(&tagged.value, context)?,
        other => other.clone(),
    })
}

/// Renders every string value of an option map. Keys are left alone.
pub fn render_options(options: &OptionMap, context: &TemplateContext<'_>) -> Result<OptionMap> {
    let mut rendered = OptionMap::with_capacity(options.len());
    for (key, value) in options {
        rendered.insert(key.clone(), render_value(value, context)?);
    }
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::RepositoryMetadata;
    use std::path::PathBuf;

    fn repository() -> RepositoryState {
        let mut state = RepositoryState::new(PathBuf::from("/src/widgets"));
        state.remote_url = Some("git@github.com:acme/widgets.git".to_string());
        state.remote = crate::remote_url::RemoteRepository::parse("git@github.com:acme/widgets.git").ok();
        state.current_branch = Some("feature".to_string());
        state.metadata = Some(RepositoryMetadata {
            name_with_owner: "acme-inc/widgets".to_string(),
            default_branch: "main".to_string(),
            is_archived: false,
        });
        state
    }

    fn variables() -> BTreeMap<String, String> {
        BTreeMap::from([("ticket".to_string(), "OPS-42".to_string())])
    }

    #[test]
    fn test_render_repository_fields() {
        let state = repository();
        let vars = variables();
        let context = TemplateContext::new(&state, &vars);

        assert_eq!(render("{{ .Repository.Name }}", &context).unwrap(), "widgets");
        assert_eq!(render("{{.Repository.Owner}}", &context).unwrap(), "acme-inc");
        assert_eq!(
            render("sync/{{ .Repository.DefaultBranch }}-{{ .Environment.ticket }}", &context).unwrap(),
            "sync/main-OPS-42"
        );
        assert_eq!(render("{{ .Repository.Path }}", &context).unwrap(), "/src/widgets");
        assert_eq!(render("{{ .Repository.CurrentBranch }}", &context).unwrap(), "feature");
    }

    #[test]
    fn test_render_plain_text_unchanged() {
        let state = repository();
        let vars = variables();
        let context = TemplateContext::new(&state, &vars);
        assert_eq!(render("no placeholders", &context).unwrap(), "no placeholders");
    }

    #[test]
    fn test_undefined_environment_variable() {
        let state = repository();
        let vars = variables();
        let context = TemplateContext::new(&state, &vars);
        let err = render("{{ .Environment.missing }}", &context).unwrap_err();
        assert!(err.to_string().contains("Environment.missing"));
    }

    #[test]
    fn test_unavailable_default_branch() {
        let state = RepositoryState::new(PathBuf::from("/src/bare"));
        let vars = BTreeMap::new();
        let context = TemplateContext::new(&state, &vars);
        let err = render("{{ .Repository.DefaultBranch }}", &context).unwrap_err();
        assert!(err.to_string().contains("Repository.DefaultBranch"));
        assert_eq!(render("{{ .Repository.Name }}", &context).unwrap(), "bare");
    }

    #[test]
    fn test_unsupported_expressions() {
        let state = repository();
        let vars = variables();
        let context = TemplateContext::new(&state, &vars);
        assert!(render("{{ .Other.Name }}", &context).is_err());
        assert!(render("{{ Repository.Name }}", &context).is_err());
        assert!(render("{{ .Repository.Nope }}", &context).is_err());
        assert!(render("dangling {{ .Repository.Name", &context).is_err());
    }

    #[test]
    fn test_render_options_recursively() {
        let state = repository();
        let vars = variables();
        let context = TemplateContext::new(&state, &vars);
        let options: OptionMap = serde_yaml::from_str(
            "package: '{{ .Repository.Name }}'\npaths: ['{{ .Environment.ticket }}.txt', keep]\nnested: { owner: '{{ .Repository.Owner }}' }\nlimit: 3\n",
        )
        .unwrap();

        let rendered = render_options(&options, &context).unwrap();
        let expected: OptionMap = serde_yaml::from_str(
            "package: widgets\npaths: [OPS-42.txt, keep]\nnested: { owner: acme-inc }\nlimit: 3\n",
        )
        .unwrap();
        assert_eq!(rendered, expected);
    }
}
