//! OnboardingController — drives a company from creation to a generated
//! profile.
//!
//! The flow state lives in a single [`OnboardingState`] snapshot published
//! through a `watch` channel. Every mutation replaces the snapshot via one of
//! its transition methods, so observers (a UI, the CLI, tests) always see a
//! consistent record, including the busy flags while a remote call is in
//! flight.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::ApiError;

use super::api::OnboardingApi;
use super::model::{Company, CompanyInput, NO_PENDING_QUESTION, NextQuestion, Question, Verdict};
use super::state::{FlowState, OnboardingState};

/// Result of [`OnboardingController::start`].
#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    /// Company created and the first question is current.
    Started(Question),
    /// A step failed; the message is also stored as `last_error`.
    Failed(String),
    /// The flow is past the company screen: nothing was sent.
    Skipped,
}

/// Result of [`OnboardingController::answer`].
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerOutcome {
    /// No company or no current question: nothing was sent.
    Skipped,
    /// Another question is now current.
    NextQuestion(Question),
    /// The service has no pending question; still in `questions`.
    AwaitingQuestions,
    /// Profile generated; the flow is complete.
    Completed(Company),
    /// A step failed; the message is also stored as `last_error`.
    Failed(String),
}

/// Releases a busy flag when dropped, on every exit path.
struct BusyGuard<'a> {
    state: &'a watch::Sender<OnboardingState>,
    release: fn(OnboardingState) -> OnboardingState,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let release = self.release;
        self.state
            .send_modify(|s| *s = release(std::mem::take(s)));
    }
}

/// Client-side onboarding state machine.
pub struct OnboardingController {
    api: Arc<dyn OnboardingApi>,
    state: watch::Sender<OnboardingState>,
}

impl OnboardingController {
    pub fn new(api: Arc<dyn OnboardingApi>) -> Self {
        let (state, _rx) = watch::channel(OnboardingState::default());
        Self { api, state }
    }

    /// Current snapshot.
    pub fn state(&self) -> OnboardingState {
        self.state.borrow().clone()
    }

    /// Receive every new snapshot as it is published.
    pub fn subscribe(&self) -> watch::Receiver<OnboardingState> {
        self.state.subscribe()
    }

    fn transition(&self, f: impl FnOnce(OnboardingState) -> OnboardingState) {
        self.state.send_modify(|s| *s = f(std::mem::take(s)));
    }

    fn busy(&self, release: fn(OnboardingState) -> OnboardingState) -> BusyGuard<'_> {
        BusyGuard {
            state: &self.state,
            release,
        }
    }

    /// Create the company, start onboarding and fetch the first question.
    ///
    /// The caller validates `input` (non-blank name). On failure the flow
    /// stays in `company` and `company` is restored to its previous value.
    /// Outside the `company` state this is a no-op.
    pub async fn start(&self, input: CompanyInput) -> StartOutcome {
        let previous_company = {
            let state = self.state.borrow();
            if state.flow_state != FlowState::Company {
                debug!(flow_state = %state.flow_state, "start() past the company screen; skipping");
                return StartOutcome::Skipped;
            }
            state.company.clone()
        };

        self.transition(OnboardingState::creating);
        let _busy = self.busy(OnboardingState::creating_done);

        match self.run_start(&input).await {
            Ok(question) => {
                info!(
                    company = %input.name,
                    question_id = %question.id,
                    "Onboarding started"
                );
                StartOutcome::Started(question)
            }
            Err(e) => {
                let message = e.to_string();
                warn!(company = %input.name, error = %message, "Failed to start onboarding");
                self.transition(|s| OnboardingState {
                    company: previous_company,
                    ..s.failed(message.clone())
                });
                StartOutcome::Failed(message)
            }
        }
    }

    async fn run_start(&self, input: &CompanyInput) -> Result<Question, ApiError> {
        let company = self.api.create_company(input).await?;
        let company_id = company.id.clone();
        debug!(company_id = %company_id, "Company created");
        self.transition(|s| s.company_created(company));

        self.api.start_onboarding(&company_id).await?;

        match self.api.fetch_next_question(&company_id).await? {
            NextQuestion::Question(question) => {
                self.transition(|s| s.question_received(question.clone()));
                Ok(question)
            }
            // Starting seeds the mandatory questions, so nothing pending here
            // means the flow cannot begin.
            NextQuestion::Empty => Err(ApiError::flow(NO_PENDING_QUESTION)),
        }
    }

    /// Answer the current question and act on the service's verdict.
    ///
    /// Without a company or a current question this is a no-op. Callers must
    /// not invoke it again while `is_answering` is set.
    pub async fn answer(&self, answer_text: &str) -> AnswerOutcome {
        let (company_id, question_id) = {
            let state = self.state.borrow();
            match (&state.company, &state.current_question) {
                (Some(company), Some(question)) => (company.id.clone(), question.id.clone()),
                _ => {
                    debug!("answer() without company or current question; skipping");
                    return AnswerOutcome::Skipped;
                }
            }
        };

        self.transition(OnboardingState::answering);
        let _busy = self.busy(OnboardingState::answering_done);

        match self.run_answer(&company_id, &question_id, answer_text).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let message = e.to_string();
                warn!(
                    company_id = %company_id,
                    question_id = %question_id,
                    error = %message,
                    "Failed to process onboarding answer"
                );
                self.transition(|s| s.failed(message.clone()));
                AnswerOutcome::Failed(message)
            }
        }
    }

    async fn run_answer(
        &self,
        company_id: &str,
        question_id: &str,
        answer_text: &str,
    ) -> Result<AnswerOutcome, ApiError> {
        self.api
            .submit_answer(company_id, question_id, answer_text)
            .await?;

        let evaluation = self.api.evaluate(company_id).await?;
        let verdict = evaluation.verdict();
        info!(
            company_id,
            verdict = %verdict,
            new_questions = evaluation.novas_perguntas.len(),
            "Onboarding answer evaluated"
        );

        match verdict {
            Verdict::Sufficient => {
                let company = self.api.generate_profile(company_id).await?;
                info!(company_id, "Company profile generated");
                self.transition(|s| s.profile_generated(company.clone()));
                Ok(AnswerOutcome::Completed(company))
            }
            Verdict::NewQuestionsCreated | Verdict::Other(_) => {
                if let Verdict::Other(status) = &verdict {
                    warn!(company_id, status = %status, "Unknown verdict; fetching next question");
                }
                self.next_question(company_id).await
            }
        }
    }

    async fn next_question(&self, company_id: &str) -> Result<AnswerOutcome, ApiError> {
        match self.api.fetch_next_question(company_id).await? {
            NextQuestion::Question(question) => {
                self.transition(|s| s.question_received(question.clone()));
                Ok(AnswerOutcome::NextQuestion(question))
            }
            NextQuestion::Empty => {
                self.transition(OnboardingState::questions_exhausted);
                Ok(AnswerOutcome::AwaitingQuestions)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::onboarding::model::{Evaluation, QuestionOrigin};

    /// Scripted API: each call pops the next queued response and records
    /// the call plus the busy flags visible at that moment.
    #[derive(Default)]
    struct ScriptedApi {
        companies: Mutex<VecDeque<Result<Company, ApiError>>>,
        starts: Mutex<VecDeque<Result<(), ApiError>>>,
        questions: Mutex<VecDeque<Result<NextQuestion, ApiError>>>,
        answers: Mutex<VecDeque<Result<(), ApiError>>>,
        evaluations: Mutex<VecDeque<Result<Evaluation, ApiError>>>,
        profiles: Mutex<VecDeque<Result<Company, ApiError>>>,
        calls: Mutex<Vec<String>>,
        observer: Mutex<Option<watch::Receiver<OnboardingState>>>,
        busy_seen: Mutex<Vec<(bool, bool)>>,
    }

    impl ScriptedApi {
        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
            if let Some(rx) = self.observer.lock().unwrap().as_ref() {
                let state = rx.borrow();
                self.busy_seen
                    .lock()
                    .unwrap()
                    .push((state.is_creating, state.is_answering));
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn pop<T>(queue: &Mutex<VecDeque<Result<T, ApiError>>>, call: &str) -> Result<T, ApiError> {
            queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| panic!("unexpected call to {call}"))
        }
    }

    #[async_trait]
    impl OnboardingApi for ScriptedApi {
        async fn create_company(&self, _input: &CompanyInput) -> Result<Company, ApiError> {
            self.record("create_company");
            Self::pop(&self.companies, "create_company")
        }

        async fn start_onboarding(&self, company_id: &str) -> Result<(), ApiError> {
            self.record(&format!("start_onboarding:{company_id}"));
            Self::pop(&self.starts, "start_onboarding")
        }

        async fn fetch_next_question(&self, company_id: &str) -> Result<NextQuestion, ApiError> {
            self.record(&format!("fetch_next_question:{company_id}"));
            Self::pop(&self.questions, "fetch_next_question")
        }

        async fn submit_answer(
            &self,
            company_id: &str,
            question_id: &str,
            content: &str,
        ) -> Result<(), ApiError> {
            self.record(&format!("submit_answer:{company_id}:{question_id}:{content}"));
            Self::pop(&self.answers, "submit_answer")
        }

        async fn evaluate(&self, company_id: &str) -> Result<Evaluation, ApiError> {
            self.record(&format!("evaluate:{company_id}"));
            Self::pop(&self.evaluations, "evaluate")
        }

        async fn generate_profile(&self, company_id: &str) -> Result<Company, ApiError> {
            self.record(&format!("generate_profile:{company_id}"));
            Self::pop(&self.profiles, "generate_profile")
        }
    }

    fn company(profile: Option<serde_json::Value>) -> Company {
        Company {
            id: "c1".into(),
            name: "Acme".into(),
            website: None,
            sector: None,
            onboarding_status: "started".into(),
            profile_json: profile,
            created_at: None,
        }
    }

    fn question(id: &str, content: &str) -> Question {
        Question {
            id: id.into(),
            company_id: "c1".into(),
            content: content.into(),
            order_index: 1,
            origin: QuestionOrigin::System,
            created_at: Utc::now(),
        }
    }

    fn evaluation(status: &str) -> Evaluation {
        Evaluation {
            status: status.into(),
            precisa_mais: None,
            novas_perguntas: Vec::new(),
        }
    }

    fn err(message: &str) -> ApiError {
        ApiError::Status {
            status: 500,
            detail: message.into(),
        }
    }

    fn setup(api: ScriptedApi) -> (Arc<ScriptedApi>, OnboardingController) {
        let api = Arc::new(api);
        let controller = OnboardingController::new(api.clone());
        *api.observer.lock().unwrap() = Some(controller.subscribe());
        (api, controller)
    }

    /// Scripted so that `start` succeeds with question q1.
    fn started_api() -> ScriptedApi {
        let api = ScriptedApi::default();
        api.companies.lock().unwrap().push_back(Ok(company(None)));
        api.starts.lock().unwrap().push_back(Ok(()));
        api.questions
            .lock()
            .unwrap()
            .push_back(Ok(NextQuestion::Question(question("q1", "What sector?"))));
        api
    }

    async fn started() -> (Arc<ScriptedApi>, OnboardingController) {
        let (api, controller) = setup(started_api());
        let outcome = controller.start(CompanyInput::new("Acme")).await;
        assert!(matches!(outcome, StartOutcome::Started(_)));
        api.busy_seen.lock().unwrap().clear();
        (api, controller)
    }

    #[tokio::test]
    async fn start_success_enters_questions() {
        let (api, controller) = setup(started_api());

        let outcome = controller.start(CompanyInput::new("Acme")).await;

        assert!(matches!(outcome, StartOutcome::Started(ref q) if q.id == "q1"));
        let state = controller.state();
        assert_eq!(state.flow_state, FlowState::Questions);
        assert_eq!(state.company.unwrap().id, "c1");
        assert_eq!(state.current_question.unwrap().id, "q1");
        assert!(state.last_error.is_none());
        assert!(!state.is_creating);
        assert_eq!(
            api.calls(),
            vec!["create_company", "start_onboarding:c1", "fetch_next_question:c1"]
        );
    }

    #[tokio::test]
    async fn start_create_failure_runs_nothing_else() {
        let api = ScriptedApi::default();
        api.companies.lock().unwrap().push_back(Err(err("db down")));
        let (api, controller) = setup(api);

        let outcome = controller.start(CompanyInput::new("Acme")).await;

        assert_eq!(outcome, StartOutcome::Failed("Erro 500: db down".into()));
        let state = controller.state();
        assert_eq!(state.flow_state, FlowState::Company);
        assert!(state.company.is_none());
        assert_eq!(state.last_error.as_deref(), Some("Erro 500: db down"));
        assert!(!state.is_creating);
        assert_eq!(api.calls(), vec!["create_company"]);
    }

    #[tokio::test]
    async fn start_later_failure_keeps_company_state() {
        let api = ScriptedApi::default();
        api.companies.lock().unwrap().push_back(Ok(company(None)));
        api.starts.lock().unwrap().push_back(Ok(()));
        api.questions.lock().unwrap().push_back(Err(err("timeout")));
        let (api, controller) = setup(api);

        let outcome = controller.start(CompanyInput::new("Acme")).await;

        assert!(matches!(outcome, StartOutcome::Failed(_)));
        let state = controller.state();
        assert_eq!(state.flow_state, FlowState::Company);
        assert!(state.company.is_none());
        assert!(state.current_question.is_none());
        // The question fetch happened after the company was stored.
        assert_eq!(api.calls().len(), 3);
    }

    #[tokio::test]
    async fn start_with_no_pending_question_fails() {
        let api = ScriptedApi::default();
        api.companies.lock().unwrap().push_back(Ok(company(None)));
        api.starts.lock().unwrap().push_back(Ok(()));
        api.questions.lock().unwrap().push_back(Ok(NextQuestion::Empty));
        let (_api, controller) = setup(api);

        let outcome = controller.start(CompanyInput::new("Acme")).await;

        assert_eq!(outcome, StartOutcome::Failed(NO_PENDING_QUESTION.into()));
        assert_eq!(controller.state().flow_state, FlowState::Company);
    }

    #[tokio::test]
    async fn start_retry_after_failure_clears_error() {
        let api = started_api();
        api.companies.lock().unwrap().push_front(Err(err("boom")));
        let (_api, controller) = setup(api);

        controller.start(CompanyInput::new("Acme")).await;
        assert!(controller.state().last_error.is_some());

        let outcome = controller.start(CompanyInput::new("Acme")).await;
        assert!(matches!(outcome, StartOutcome::Started(_)));
        assert!(controller.state().last_error.is_none());
    }

    #[tokio::test]
    async fn is_creating_only_during_start() {
        let (api, controller) = setup(started_api());
        assert!(!controller.state().is_creating);

        controller.start(CompanyInput::new("Acme")).await;

        let seen = api.busy_seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|(creating, answering)| *creating && !*answering));
        assert!(!controller.state().is_creating);
    }

    #[tokio::test]
    async fn start_after_completed_is_noop() {
        let (api, controller) = started().await;
        api.answers.lock().unwrap().push_back(Ok(()));
        api.evaluations.lock().unwrap().push_back(Ok(evaluation("sufficient")));
        api.profiles
            .lock()
            .unwrap()
            .push_back(Ok(company(Some(serde_json::json!({"tone": "formal"})))));
        controller.answer("Wealth management").await;
        let before = controller.state();
        assert_eq!(before.flow_state, FlowState::Completed);
        let calls_before = api.calls().len();

        let outcome = controller.start(CompanyInput::new("Acme")).await;

        assert_eq!(outcome, StartOutcome::Skipped);
        assert_eq!(api.calls().len(), calls_before);
        assert_eq!(controller.state(), before);
    }

    #[tokio::test]
    async fn start_during_questions_is_noop() {
        let (api, controller) = started().await;
        let before = controller.state();

        let outcome = controller.start(CompanyInput::new("Other")).await;

        assert_eq!(outcome, StartOutcome::Skipped);
        assert_eq!(api.calls().len(), 3);
        assert_eq!(controller.state(), before);
    }

    #[tokio::test]
    async fn answer_without_company_is_noop() {
        let (api, controller) = setup(ScriptedApi::default());

        let outcome = controller.answer("anything").await;

        assert_eq!(outcome, AnswerOutcome::Skipped);
        assert!(api.calls().is_empty());
        assert_eq!(controller.state(), OnboardingState::default());
    }

    #[tokio::test]
    async fn answer_without_current_question_is_noop() {
        let (api, controller) = started().await;
        controller.transition(OnboardingState::questions_exhausted);
        let before = controller.state();
        let calls_before = api.calls().len();

        let outcome = controller.answer("anything").await;

        assert_eq!(outcome, AnswerOutcome::Skipped);
        assert_eq!(api.calls().len(), calls_before);
        assert_eq!(controller.state(), before);
    }

    #[tokio::test]
    async fn sufficient_verdict_completes() {
        let (api, controller) = started().await;
        api.answers.lock().unwrap().push_back(Ok(()));
        api.evaluations.lock().unwrap().push_back(Ok(evaluation("sufficient")));
        api.profiles
            .lock()
            .unwrap()
            .push_back(Ok(company(Some(serde_json::json!({"tone": "formal"})))));

        let outcome = controller.answer("Wealth management").await;

        assert!(matches!(outcome, AnswerOutcome::Completed(_)));
        let state = controller.state();
        assert_eq!(state.flow_state, FlowState::Completed);
        assert!(state.current_question.is_none());
        assert_eq!(state.company.unwrap().profile_field("tone"), Some("formal"));
        assert!(!state.is_answering);
        assert!(
            api.calls()
                .contains(&"submit_answer:c1:q1:Wealth management".to_string())
        );
    }

    #[tokio::test]
    async fn new_questions_verdict_fetches_next() {
        let (api, controller) = started().await;
        api.answers.lock().unwrap().push_back(Ok(()));
        api.evaluations
            .lock()
            .unwrap()
            .push_back(Ok(evaluation("new_questions_created")));
        api.questions
            .lock()
            .unwrap()
            .push_back(Ok(NextQuestion::Question(question("q2", "Who is the audience?"))));

        let outcome = controller.answer("Finance").await;

        assert!(matches!(outcome, AnswerOutcome::NextQuestion(ref q) if q.id == "q2"));
        let state = controller.state();
        assert_eq!(state.flow_state, FlowState::Questions);
        assert_eq!(state.current_question.unwrap().id, "q2");
    }

    #[tokio::test]
    async fn unknown_verdict_behaves_like_new_questions() {
        let (api, controller) = started().await;
        api.answers.lock().unwrap().push_back(Ok(()));
        api.evaluations.lock().unwrap().push_back(Ok(evaluation("thinking")));
        api.questions
            .lock()
            .unwrap()
            .push_back(Ok(NextQuestion::Question(question("q2", "Channels?"))));

        let outcome = controller.answer("Finance").await;

        assert!(matches!(outcome, AnswerOutcome::NextQuestion(_)));
        assert!(api.calls().contains(&"fetch_next_question:c1".to_string()));
        assert!(!api.calls().iter().any(|c| c.starts_with("generate_profile")));
    }

    #[tokio::test]
    async fn empty_next_question_is_benign() {
        let (api, controller) = started().await;
        api.answers.lock().unwrap().push_back(Ok(()));
        api.evaluations
            .lock()
            .unwrap()
            .push_back(Ok(evaluation("new_questions_created")));
        api.questions.lock().unwrap().push_back(Ok(NextQuestion::Empty));

        let outcome = controller.answer("Finance").await;

        assert_eq!(outcome, AnswerOutcome::AwaitingQuestions);
        let state = controller.state();
        assert_eq!(state.flow_state, FlowState::Questions);
        assert!(state.current_question.is_none());
        assert!(state.last_error.is_none());
    }

    #[tokio::test]
    async fn next_question_failure_is_surfaced() {
        let (api, controller) = started().await;
        api.answers.lock().unwrap().push_back(Ok(()));
        api.evaluations
            .lock()
            .unwrap()
            .push_back(Ok(evaluation("new_questions_created")));
        api.questions.lock().unwrap().push_back(Err(err("bad gateway")));

        let outcome = controller.answer("Finance").await;

        assert!(matches!(outcome, AnswerOutcome::Failed(_)));
        let state = controller.state();
        assert_eq!(state.last_error.as_deref(), Some("Erro 500: bad gateway"));
        assert_eq!(state.current_question.unwrap().id, "q1");
    }

    #[tokio::test]
    async fn submit_failure_aborts_and_keeps_question() {
        let (api, controller) = started().await;
        api.answers.lock().unwrap().push_back(Err(err("nope")));

        let outcome = controller.answer("Finance").await;

        assert_eq!(outcome, AnswerOutcome::Failed("Erro 500: nope".into()));
        let state = controller.state();
        assert_eq!(state.flow_state, FlowState::Questions);
        assert_eq!(state.current_question.unwrap().id, "q1");
        assert!(!state.is_answering);
        assert!(!api.calls().iter().any(|c| c.starts_with("evaluate")));
    }

    #[tokio::test]
    async fn evaluate_failure_aborts() {
        let (api, controller) = started().await;
        api.answers.lock().unwrap().push_back(Ok(()));
        api.evaluations.lock().unwrap().push_back(Err(err("llm offline")));

        let outcome = controller.answer("Finance").await;

        assert!(matches!(outcome, AnswerOutcome::Failed(_)));
        let state = controller.state();
        assert_eq!(state.flow_state, FlowState::Questions);
        assert_eq!(state.current_question.unwrap().id, "q1");
        // start() made three calls; only submit and evaluate followed.
        assert_eq!(api.calls().len(), 5);
    }

    #[tokio::test]
    async fn is_answering_only_during_answer() {
        let (api, controller) = started().await;
        api.answers.lock().unwrap().push_back(Ok(()));
        api.evaluations.lock().unwrap().push_back(Err(err("llm offline")));

        controller.answer("Finance").await;

        let seen = api.busy_seen.lock().unwrap().clone();
        assert_eq!(seen, vec![(false, true), (false, true)]);
        assert!(!controller.state().is_answering);
    }
}
