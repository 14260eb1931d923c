//! Onboarding — drives a new company through question rounds with the
//! onboarding service until a content-curation profile is generated.
//!
//! The controller owns the flow state; question generation, sufficiency
//! evaluation and profile synthesis are delegated to the service through the
//! [`OnboardingApi`] trait.

pub mod api;
pub mod controller;
pub mod http;
pub mod model;
pub mod state;

pub use api::OnboardingApi;
pub use controller::{AnswerOutcome, OnboardingController, StartOutcome};
pub use http::HttpOnboardingApi;
pub use model::{Company, CompanyInput, Evaluation, NextQuestion, Question, QuestionOrigin, Verdict};
pub use state::{FlowState, OnboardingState};
