//! Action type → handler table.
//!
//! The registry is built once at start-up (see
//! [`crate::actions::register_builtin_actions`]) and then only read. Handlers
//! receive options that have already been rendered for the repository.

use crate::error::{Error, Result};
use crate::workflow::environment::{Environment, RepositoryState};
use crate::workflow::options::ActionOptions;
use std::collections::BTreeMap;
use std::fmt;

/// A registered unit of repository work.
pub trait TaskAction {
    fn execute(
        &self,
        environment: &mut Environment<'_>,
        repository: &mut RepositoryState,
        options: &ActionOptions,
    ) -> Result<()>;
}

impl<F> TaskAction for F
where
    F: Fn(&mut Environment<'_>, &mut RepositoryState, &ActionOptions) -> Result<()>,
{
    fn execute(
        &self,
        environment: &mut Environment<'_>,
        repository: &mut RepositoryState,
        options: &ActionOptions,
    ) -> Result<()> {
        self(environment, repository, options)
    }
}

#[derive(Default)]
pub struct ActionRegistry {
    actions: BTreeMap<String, Box<dyn TaskAction>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `action` under `action_type`, replacing any earlier handler.
    pub fn register(&mut self, action_type: impl Into<String>, action: impl TaskAction + 'static) {
        self.actions.insert(action_type.into(), Box::new(action));
    }

    /// Registers a closure. The explicit `Fn` bound lets closure signatures
    /// be inferred at the call site.
    pub fn register_fn<F>(&mut self, action_type: impl Into<String>, action: F)
    where
        F: Fn(&mut Environment<'_>, &mut RepositoryState, &ActionOptions) -> Result<()> + 'static,
    {
        self.register(action_type, action);
    }

    pub fn get(&self, action_type: &str) -> Option<&dyn TaskAction> {
        self.actions.get(action_type).map(|action| action.as_ref())
    }

    pub fn contains(&self, action_type: &str) -> bool {
        self.actions.contains_key(action_type)
    }

    /// Registered types, sorted.
    pub fn action_types(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    /// Looks up and runs the handler for `action_type`.
    pub fn dispatch(
        &self,
        action_type: &str,
        environment: &mut Environment<'_>,
        repository: &mut RepositoryState,
        options: &ActionOptions,
    ) -> Result<()> {
        let action = self.get(action_type).ok_or_else(|| Error::UnknownAction {
            action_type: action_type.to_string(),
        })?;
        action.execute(environment, repository, options)
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .finish()
    }
}
