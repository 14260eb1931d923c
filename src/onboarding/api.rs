//! The onboarding service as seen by the controller.

use async_trait::async_trait;

use crate::error::ApiError;

use super::model::{Company, CompanyInput, Evaluation, NextQuestion};

/// Remote operations the onboarding controller depends on.
///
/// Question generation, sufficiency evaluation and profile synthesis all
/// happen behind this trait.
#[async_trait]
pub trait OnboardingApi: Send + Sync {
    /// Create the company record.
    async fn create_company(&self, input: &CompanyInput) -> Result<Company, ApiError>;

    /// Seed the mandatory questions for a company.
    async fn start_onboarding(&self, company_id: &str) -> Result<(), ApiError>;

    /// Next unanswered question, or `NextQuestion::Empty` when there is none.
    async fn fetch_next_question(&self, company_id: &str) -> Result<NextQuestion, ApiError>;

    /// Record an answer to a question.
    async fn submit_answer(
        &self,
        company_id: &str,
        question_id: &str,
        content: &str,
    ) -> Result<(), ApiError>;

    /// Ask whether the collected answers are sufficient.
    async fn evaluate(&self, company_id: &str) -> Result<Evaluation, ApiError>;

    /// Synthesize the profile. Returns the company carrying `profile_json`.
    async fn generate_profile(&self, company_id: &str) -> Result<Company, ApiError>;
}
