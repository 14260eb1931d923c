//! HTTP client for the onboarding service.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::{ApiError, ConfigError};

use super::api::OnboardingApi;
use super::model::{
    AnswerSubmission, Company, CompanyInput, Evaluation, NO_PENDING_QUESTION, NextQuestion, Question,
};

/// `OnboardingApi` over the service's JSON/HTTP interface.
pub struct HttpOnboardingApi {
    base_url: String,
    api_token: Option<SecretString>,
    client: reqwest::Client,
}

impl HttpOnboardingApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.api_token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let resp = builder
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let detail = error_detail(status, resp.text().await.unwrap_or_default());
        tracing::warn!(status = status.as_u16(), detail = %detail, "Onboarding service returned an error");
        Err(ApiError::Status {
            status: status.as_u16(),
            detail,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let resp = self.send(builder).await?;
        resp.json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Acknowledgement calls: any success body (including 204) is accepted.
    async fn send_ack(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        let resp = self.send(builder).await?;
        // Drain the body so the connection can be reused.
        let _ = resp.bytes().await;
        Ok(())
    }

    /// `GET /companies` — newest first.
    pub async fn list_companies(&self) -> Result<Vec<Company>, ApiError> {
        self.send_json(self.request(Method::GET, "/companies")).await
    }

    /// `GET /companies/{id}`
    pub async fn get_company(&self, company_id: &str) -> Result<Company, ApiError> {
        self.send_json(self.request(Method::GET, &format!("/companies/{company_id}")))
            .await
    }

    /// `GET /companies/{id}/profile` — 404 until a profile was generated.
    pub async fn get_profile(&self, company_id: &str) -> Result<serde_json::Value, ApiError> {
        self.send_json(self.request(Method::GET, &format!("/companies/{company_id}/profile")))
            .await
    }
}

#[async_trait]
impl OnboardingApi for HttpOnboardingApi {
    async fn create_company(&self, input: &CompanyInput) -> Result<Company, ApiError> {
        self.send_json(self.request(Method::POST, "/companies").json(input))
            .await
    }

    async fn start_onboarding(&self, company_id: &str) -> Result<(), ApiError> {
        self.send_ack(self.request(Method::POST, &format!("/onboarding/{company_id}/start")))
            .await
    }

    async fn fetch_next_question(&self, company_id: &str) -> Result<NextQuestion, ApiError> {
        let builder = self.request(Method::GET, &format!("/onboarding/{company_id}/next"));
        match self.send_json::<Question>(builder).await {
            Ok(question) => Ok(NextQuestion::Question(question)),
            Err(ApiError::Status { status: 404, detail }) if detail.contains(NO_PENDING_QUESTION) => {
                tracing::debug!(company_id, "No pending onboarding question");
                Ok(NextQuestion::Empty)
            }
            Err(e) => Err(e),
        }
    }

    async fn submit_answer(
        &self,
        company_id: &str,
        question_id: &str,
        content: &str,
    ) -> Result<(), ApiError> {
        let body = AnswerSubmission {
            company_id: company_id.to_string(),
            question_id: question_id.to_string(),
            content: content.to_string(),
        };
        self.send_ack(
            self.request(Method::POST, &format!("/onboarding/{company_id}/answer"))
                .json(&body),
        )
        .await
    }

    async fn evaluate(&self, company_id: &str) -> Result<Evaluation, ApiError> {
        self.send_json(self.request(Method::POST, &format!("/onboarding/{company_id}/ai/evaluate")))
            .await
    }

    async fn generate_profile(&self, company_id: &str) -> Result<Company, ApiError> {
        self.send_json(self.request(
            Method::POST,
            &format!("/companies/{company_id}/profile/generate"),
        ))
        .await
    }
}

/// Human-readable detail of an error response: the JSON `detail` string,
/// else the JSON body itself, else the status reason.
fn error_detail(status: StatusCode, body: String) -> String {
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => match json.get("detail") {
            Some(serde_json::Value::String(detail)) => detail.clone(),
            Some(detail) if !detail.is_null() => detail.to_string(),
            _ => json.to_string(),
        },
        Err(_) => status.canonical_reason().unwrap_or("").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_string_extracted() {
        let detail = error_detail(
            StatusCode::NOT_FOUND,
            r#"{"detail": "Empresa não encontrada"}"#.into(),
        );
        assert_eq!(detail, "Empresa não encontrada");
    }

    #[test]
    fn structured_detail_serialized() {
        let detail = error_detail(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail": [{"loc": ["body", "name"]}]}"#.into(),
        );
        assert_eq!(detail, r#"[{"loc":["body","name"]}]"#);
    }

    #[test]
    fn json_without_detail_serialized() {
        let detail = error_detail(StatusCode::BAD_REQUEST, r#"{"error":"bad"}"#.into());
        assert_eq!(detail, r#"{"error":"bad"}"#);
    }

    #[test]
    fn non_json_body_falls_back_to_reason() {
        let detail = error_detail(StatusCode::BAD_GATEWAY, "<html>".into());
        assert_eq!(detail, "Bad Gateway");
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let config = ClientConfig {
            api_url: "http://localhost:1/api/".into(),
            ..ClientConfig::default()
        };
        let api = HttpOnboardingApi::new(&config).unwrap();
        assert_eq!(api.base_url(), "http://localhost:1/api");
        assert_eq!(api.url("/companies"), "http://localhost:1/api/companies");
    }
}
