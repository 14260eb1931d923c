//! Onboarding state machine — which screen the flow is on and what it holds.

use serde::{Deserialize, Serialize};

use super::model::{Company, Question};

/// The phases of the onboarding flow.
///
/// Progresses linearly: Company → Questions (self-loop) → Completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    /// Collecting company data.
    #[default]
    Company,
    /// Awaiting or answering a question.
    Questions,
    /// Profile generated.
    Completed,
}

impl FlowState {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: FlowState) -> bool {
        use FlowState::*;
        matches!(
            (self, target),
            (Company, Questions) | (Questions, Questions) | (Questions, Completed)
        )
    }

    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for FlowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Company => "company",
            Self::Questions => "questions",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// Snapshot of the onboarding flow.
///
/// Values are never mutated in place: each transition consumes the current
/// snapshot and returns the next one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OnboardingState {
    pub flow_state: FlowState,
    pub company: Option<Company>,
    pub current_question: Option<Question>,
    pub is_creating: bool,
    pub is_answering: bool,
    pub last_error: Option<String>,
}

impl OnboardingState {
    /// `start` began: busy, previous error cleared.
    pub fn creating(self) -> Self {
        Self {
            is_creating: true,
            last_error: None,
            ..self
        }
    }

    /// `start` settled, whatever the outcome.
    pub fn creating_done(self) -> Self {
        Self {
            is_creating: false,
            ..self
        }
    }

    /// `answer` began: busy, previous error cleared.
    pub fn answering(self) -> Self {
        Self {
            is_answering: true,
            last_error: None,
            ..self
        }
    }

    /// `answer` settled, whatever the outcome.
    pub fn answering_done(self) -> Self {
        Self {
            is_answering: false,
            ..self
        }
    }

    /// The company record was created remotely.
    pub fn company_created(self, company: Company) -> Self {
        Self {
            company: Some(company),
            ..self
        }
    }

    /// A question was fetched and becomes the current one.
    ///
    /// Ignored once the flow is completed.
    pub fn question_received(self, question: Question) -> Self {
        if !self.flow_state.can_transition_to(FlowState::Questions) {
            return self;
        }
        Self {
            flow_state: FlowState::Questions,
            current_question: Some(question),
            ..self
        }
    }

    /// The service has no pending question. Not an error.
    pub fn questions_exhausted(self) -> Self {
        Self {
            current_question: None,
            ..self
        }
    }

    /// The profile was generated; the flow is over.
    ///
    /// Ignored unless questions are in progress.
    pub fn profile_generated(self, company: Company) -> Self {
        if !self.flow_state.can_transition_to(FlowState::Completed) {
            return self;
        }
        Self {
            flow_state: FlowState::Completed,
            company: Some(company),
            current_question: None,
            ..self
        }
    }

    /// A remote call failed; only the error is recorded.
    pub fn failed(self, message: impl Into<String>) -> Self {
        Self {
            last_error: Some(message.into()),
            ..self
        }
    }

    /// Whether `answer` has what it needs to run.
    pub fn can_answer(&self) -> bool {
        self.company.is_some() && self.current_question.is_some()
    }

    pub fn is_busy(&self) -> bool {
        self.is_creating || self.is_answering
    }
}
