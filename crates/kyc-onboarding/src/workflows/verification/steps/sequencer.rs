use super::super::domain::VerificationDraft;
use super::super::session::WizardSession;
use super::catalog::{BiometricStep, DocumentUploadStep, PersonalInfoStep, ReviewStep};
use super::{FieldErrors, StepDescriptor, VerificationStep, WizardStep};

/// Navigation failures. None of them touch the draft.
#[derive(Debug, thiserror::Error)]
pub enum SequencerError {
    #[error("step {step:?} is incomplete")]
    Incomplete {
        step: WizardStep,
        errors: FieldErrors,
    },
    #[error("already at the first step")]
    AtInitialStep,
    #[error("review is the final step; submit the verification instead")]
    AtTerminalStep,
}

/// Finite, ordered list of steps; the last one is terminal.
pub struct StepSequencer {
    steps: Vec<Box<dyn VerificationStep>>,
}

impl Default for StepSequencer {
    fn default() -> Self {
        Self::standard()
    }
}

impl StepSequencer {
    /// Personal info, document upload, biometrics, then review.
    pub fn standard() -> Self {
        Self::with_steps(vec![
            Box::new(PersonalInfoStep),
            Box::new(DocumentUploadStep),
            Box::new(BiometricStep),
            Box::new(ReviewStep),
        ])
    }

    pub fn with_steps(steps: Vec<Box<dyn VerificationStep>>) -> Self {
        assert!(!steps.is_empty(), "a wizard needs at least one step");
        Self { steps }
    }

    pub fn descriptors(&self) -> Vec<StepDescriptor> {
        self.steps.iter().map(|step| step.describe()).collect()
    }

    pub fn initial(&self) -> WizardStep {
        self.steps[0].kind()
    }

    pub fn terminal(&self) -> WizardStep {
        self.steps[self.last_index()].kind()
    }

    /// Step the draft currently sits on; out-of-range indices clamp to the terminal step.
    pub fn current(&self, draft: &VerificationDraft) -> WizardStep {
        self.steps[draft.step_index.min(self.last_index())].kind()
    }

    pub fn validate_step(
        &self,
        step: WizardStep,
        draft: &VerificationDraft,
    ) -> Result<(), FieldErrors> {
        match self.index_of(step) {
            Some(index) => self.steps[index].validate(draft),
            None => Ok(()),
        }
    }

    pub fn is_step_complete(&self, step: WizardStep, draft: &VerificationDraft) -> bool {
        self.validate_step(step, draft).is_ok()
    }

    /// Earliest step whose rules fail, or the terminal step when everything validates.
    pub fn first_incomplete(&self, draft: &VerificationDraft) -> WizardStep {
        self.steps
            .iter()
            .find(|step| step.validate(draft).is_err())
            .map(|step| step.kind())
            .unwrap_or_else(|| self.terminal())
    }

    pub fn advance(&self, session: &mut WizardSession) -> Result<WizardStep, SequencerError> {
        let index = session.draft.step_index.min(self.last_index());
        if index == self.last_index() {
            return Err(SequencerError::AtTerminalStep);
        }

        let step = &self.steps[index];
        step.validate(&session.draft)
            .map_err(|errors| SequencerError::Incomplete {
                step: step.kind(),
                errors,
            })?;

        session.draft.step_index = index + 1;
        Ok(self.steps[index + 1].kind())
    }

    pub fn retreat(&self, session: &mut WizardSession) -> Result<WizardStep, SequencerError> {
        let index = session.draft.step_index.min(self.last_index());
        if index == 0 {
            return Err(SequencerError::AtInitialStep);
        }

        session.draft.step_index = index - 1;
        Ok(self.steps[index - 1].kind())
    }

    /// Resolve which step a visitor may land on.
    ///
    /// Without a persisted draft every request lands on the first step. Otherwise the
    /// requested step is capped by the draft's own position and by the first step whose
    /// rules still fail.
    pub fn entry_step(
        &self,
        draft: Option<&VerificationDraft>,
        requested: Option<WizardStep>,
    ) -> WizardStep {
        let Some(draft) = draft else {
            return self.initial();
        };

        let current = draft.step_index.min(self.last_index());
        let gate = self
            .index_of(self.first_incomplete(draft))
            .unwrap_or(self.last_index());
        let wanted = requested
            .and_then(|step| self.index_of(step))
            .unwrap_or(current);

        self.steps[wanted.min(current).min(gate)].kind()
    }

    /// Every step must validate and the draft must sit on the terminal step.
    pub fn ready_to_finalize(&self, draft: &VerificationDraft) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        for step in &self.steps {
            if let Err(step_errors) = step.validate(draft) {
                errors.merge(step_errors);
            }
        }
        if errors.is_empty() && self.current(draft) != self.terminal() {
            errors.insert("step", "Continue to the review step before submitting");
        }
        errors.into_result()
    }

    pub fn index_of(&self, step: WizardStep) -> Option<usize> {
        self.steps.iter().position(|candidate| candidate.kind() == step)
    }

    fn last_index(&self) -> usize {
        self.steps.len() - 1
    }
}
