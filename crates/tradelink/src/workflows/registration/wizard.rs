use tracing::debug;

use super::domain::{RegistrationForm, TradespersonRegistration, WizardStep};
use super::validation::{assemble, validate_step, RegistrationError};

/// Step cursor over a [`RegistrationForm`] with the last gate failure kept
/// for display.
#[derive(Debug, Clone, Default)]
pub struct RegistrationWizard {
    step: WizardStep,
    form: RegistrationForm,
    error: Option<RegistrationError>,
}

impl RegistrationWizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_form(form: RegistrationForm) -> Self {
        Self {
            form,
            ..Self::default()
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn form(&self) -> &RegistrationForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut RegistrationForm {
        &mut self.form
    }

    pub fn error(&self) -> Option<&RegistrationError> {
        self.error.as_ref()
    }

    /// Advance when the current step's gate passes. The review step is the
    /// last one, so advancing from it does nothing.
    pub fn next_step(&mut self) -> Result<WizardStep, RegistrationError> {
        if let Err(err) = validate_step(self.step, &self.form) {
            debug!(step = self.step.label(), error = %err, "wizard step rejected");
            self.error = Some(err.clone());
            return Err(err);
        }

        self.error = None;
        if let Some(next) = self.step.next() {
            self.step = next;
        }
        Ok(self.step)
    }

    /// Go back one step without validation, clearing any shown error.
    pub fn prev_step(&mut self) -> WizardStep {
        self.error = None;
        if let Some(previous) = self.step.previous() {
            self.step = previous;
        }
        self.step
    }

    pub fn submit(&mut self) -> Result<TradespersonRegistration, RegistrationError> {
        let outcome = if self.step == WizardStep::Review {
            assemble(&self.form)
        } else {
            Err(RegistrationError::NotAtReview(self.step))
        };

        self.error = outcome.as_ref().err().cloned();
        outcome
    }
}
