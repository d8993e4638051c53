//! Yes / no / yes-to-all confirmation.
//!
//! The executor owns one [`ConfirmationState`] per run. Once any answer
//! carries `apply_to_all`, the state behaves as if `--yes` had been given
//! and the prompter is never consulted again.

use crate::error::{Error, Result};
use dialoguer::{theme::ColorfulTheme, Select};
use log::debug;

/// One answer from a prompter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfirmationResult {
    pub confirmed: bool,
    pub apply_to_all: bool,
}

impl ConfirmationResult {
    pub fn yes() -> Self {
        Self {
            confirmed: true,
            apply_to_all: false,
        }
    }

    pub fn no() -> Self {
        Self::default()
    }

    pub fn yes_to_all() -> Self {
        Self {
            confirmed: true,
            apply_to_all: true,
        }
    }
}

/// Asks the user about one change.
pub trait ConfirmationPrompter {
    fn confirm(&self, prompt: &str) -> Result<ConfirmationResult>;
}

/// Cascading confirmation state for a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfirmationState {
    assume_yes: bool,
}

impl ConfirmationState {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }

    pub fn assume_yes(&self) -> bool {
        self.assume_yes
    }

    /// Returns whether to proceed, consulting `prompter` unless an earlier
    /// answer (or the run options) already said yes to everything.
    pub fn confirm(&mut self, prompter: &dyn ConfirmationPrompter, prompt: &str) -> Result<bool> {
        if self.assume_yes {
            debug!("auto-confirmed: {}", prompt);
            return Ok(true);
        }

        let result = prompter.confirm(prompt)?;
        if result.apply_to_all {
            self.assume_yes = true;
        }
        Ok(result.confirmed || result.apply_to_all)
    }
}

/// Interactive prompter on the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

const CHOICES: [&str; 3] = ["Yes", "No", "Yes to all"];

fn answer_for(choice: usize) -> ConfirmationResult {
    match choice {
        0 => ConfirmationResult::yes(),
        2 => ConfirmationResult::yes_to_all(),
        _ => ConfirmationResult::no(),
    }
}

impl ConfirmationPrompter for TerminalPrompter {
    fn confirm(&self, prompt: &str) -> Result<ConfirmationResult> {
        let theme = ColorfulTheme::default();
        let choice = Select::with_theme(&theme)
            .with_prompt(prompt)
            .items(&CHOICES)
            .default(0)
            .interact()
            .map_err(|e| Error::Prompt {
                message: e.to_string(),
            })?;

        Ok(answer_for(choice))
    }
}

/// Refuses everything; used when stdin is not a terminal and `--yes` is absent.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclineAllPrompter;

impl ConfirmationPrompter for DeclineAllPrompter {
    fn confirm(&self, prompt: &str) -> Result<ConfirmationResult> {
        debug!("declined without a terminal: {}", prompt);
        Ok(ConfirmationResult::no())
    }
}
