//! Acquisition inquiry wizard.
//!
//! The controller is a two-state machine: `Editing(step)` and `Submitted`.
//! Advancing validates the current step against the accumulated answers; the
//! final advance runs the submission gate. Answers are never cleared by
//! navigation, and nothing leaves `Submitted`.
pub mod gate;
pub mod steps;

use gate::{GateOutcome, SubmissionGate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use steps::{StepDefinition, StepRegistry, ValidationResult};

/// A collected answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Text(String),
    Many(Vec<String>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(value) => Some(value),
            _ => None,
        }
    }

    /// True for `false`, empty sets and zero-length text. Whitespace counts as
    /// present.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Flag(flag) => !flag,
            FieldValue::Text(value) => value.is_empty(),
            FieldValue::Many(values) => values.is_empty(),
        }
    }

    /// Render the answer the way flat attribute stores expect it.
    pub fn to_flat_string(&self) -> String {
        match self {
            FieldValue::Flag(true) => "Yes".to_string(),
            FieldValue::Flag(false) => "No".to_string(),
            FieldValue::Text(value) => value.clone(),
            FieldValue::Many(values) => values.join(", "),
        }
    }
}

/// Answers keyed by field name.
pub type FieldValues = BTreeMap<String, FieldValue>;

/// Human-readable validation messages keyed by field name.
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardPhase {
    Editing(usize),
    Submitted,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WizardState {
    pub current_step_index: usize,
    pub field_values: FieldValues,
    pub submitted: bool,
}

/// Errors surfaced to the step UI.
#[derive(Debug, Clone, PartialEq)]
pub enum WizardError {
    /// The current step failed validation; the wizard did not move.
    Invalid(FieldErrors),
    /// The bot check rejected the final submission; the user may retry.
    SpamRejected(String),
    /// The wizard already reached `Submitted`.
    AlreadySubmitted,
}

impl fmt::Display for WizardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WizardError::Invalid(errors) => {
                let fields = errors.keys().cloned().collect::<Vec<_>>().join(", ");
                write!(f, "invalid fields: {fields}")
            }
            WizardError::SpamRejected(reason) => write!(f, "spam protection: {reason}"),
            WizardError::AlreadySubmitted => f.write_str("inquiry already submitted"),
        }
    }
}

impl std::error::Error for WizardError {}

/// Result of a successful advance.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    Moved(usize),
    Submitted(GateOutcome),
}

/// Drives one wizard instance from step 0 to `Submitted`.
pub struct WizardController<'a> {
    registry: &'a StepRegistry,
    gate: SubmissionGate<'a>,
    state: WizardState,
}

impl<'a> WizardController<'a> {
    pub fn new(registry: &'a StepRegistry, gate: SubmissionGate<'a>) -> Self {
        Self {
            registry,
            gate,
            state: WizardState::default(),
        }
    }

    pub fn registry(&self) -> &StepRegistry {
        self.registry
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn phase(&self) -> WizardPhase {
        if self.state.submitted {
            WizardPhase::Submitted
        } else {
            WizardPhase::Editing(self.state.current_step_index)
        }
    }

    pub fn current_step(&self) -> Option<&StepDefinition> {
        match self.phase() {
            WizardPhase::Editing(index) => self.registry.step_at(index),
            WizardPhase::Submitted => None,
        }
    }

    pub fn is_final_step(&self) -> bool {
        self.state.current_step_index + 1 >= self.registry.step_count()
    }

    /// Validate the current step with `values` overlaid on earlier answers and
    /// move forward, or run the submission gate on the final step.
    pub fn advance(&mut self, values: FieldValues) -> Result<Advance, WizardError> {
        let index = match self.phase() {
            WizardPhase::Editing(index) => index,
            WizardPhase::Submitted => return Err(WizardError::AlreadySubmitted),
        };

        let mut merged = self.state.field_values.clone();
        merged.extend(values);
        if let ValidationResult::Invalid(errors) = self.registry.validate(index, &merged) {
            tracing::debug!(step = index, errors = errors.len(), "step validation failed");
            return Err(WizardError::Invalid(errors));
        }

        if !self.is_final_step() {
            self.state.field_values = merged;
            self.state.current_step_index = index + 1;
            tracing::debug!(step = index + 1, "wizard advanced");
            return Ok(Advance::Moved(index + 1));
        }

        let gated = self
            .gate
            .submit(self.registry, &merged, chrono::Utc::now());
        // Typed answers survive a spam rejection so the user can retry.
        self.state.field_values = merged;
        let outcome = gated?;
        self.state.submitted = true;
        Ok(Advance::Submitted(outcome))
    }

    /// Step back one step, keeping every answer. Returns false when there is
    /// nowhere to go.
    pub fn retreat(&mut self) -> bool {
        match self.phase() {
            WizardPhase::Editing(index) if index > 0 => {
                self.state.current_step_index = index - 1;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests;
