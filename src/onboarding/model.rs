//! Company, question and evaluation data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Server-known onboarding status values.
pub mod onboarding_status {
    pub const INCOMPLETE: &str = "incomplete";
    pub const IN_PROGRESS: &str = "in_progress";
    pub const COMPLETED: &str = "completed";
}

/// A company going through onboarding.
///
/// `onboarding_status` is owned by the service and kept as an opaque string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    pub onboarding_status: String,
    /// Generated profile, present once profile generation succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_json: Option<serde_json::Value>,
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl Company {
    pub fn has_profile(&self) -> bool {
        self.profile_json.as_ref().is_some_and(|p| !p.is_null())
    }

    /// Look up a top-level string field of the generated profile.
    pub fn profile_field(&self, key: &str) -> Option<&str> {
        self.profile_json.as_ref()?.get(key)?.as_str()
    }
}

/// Service timestamps: RFC 3339, or naive ISO 8601 read as UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, de::Error};

    pub(super) fn parse(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| s.parse::<NaiveDateTime>().map(|naive| naive.and_utc()))
            .ok()
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {s}")))
    }

    pub(super) fn deserialize_opt<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) => parse(&s)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {s}"))),
            None => Ok(None),
        }
    }
}

/// Data collected on the first onboarding screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyInput {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
}

impl CompanyInput {
    /// Create an input with a trimmed name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            website: None,
            sector: None,
        }
    }

    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = non_blank(website.into());
        self
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = non_blank(sector.into());
        self
    }

    /// Whether the name is usable. Callers check this before starting.
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Who produced a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionOrigin {
    /// One of the fixed mandatory questions.
    System,
    /// Follow-up generated from the AI evaluation.
    Ai,
    Other(String),
}

impl QuestionOrigin {
    pub fn as_str(&self) -> &str {
        match self {
            Self::System => "system",
            Self::Ai => "ai",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for QuestionOrigin {
    fn from(s: &str) -> Self {
        match s {
            "system" => Self::System,
            "ai" => Self::Ai,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for QuestionOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for QuestionOrigin {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for QuestionOrigin {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}

/// An onboarding question produced by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub company_id: String,
    pub content: String,
    /// Display ordering; not necessarily contiguous.
    pub order_index: i64,
    pub origin: QuestionOrigin,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
}

/// Detail text the service reports when every question is answered.
pub const NO_PENDING_QUESTION: &str = "Nenhuma pergunta pendente";

/// Result of asking the service for the next unanswered question.
#[derive(Debug, Clone, PartialEq)]
pub enum NextQuestion {
    Question(Question),
    /// The service has no pending question for this company.
    Empty,
}

/// Body of the submit-answer call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSubmission {
    pub company_id: String,
    pub question_id: String,
    pub content: String,
}

/// The service's judgment after an answer was recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    NewQuestionsCreated,
    Sufficient,
    /// Any other status string. Handled like `NewQuestionsCreated`.
    Other(String),
}

impl Verdict {
    pub fn as_str(&self) -> &str {
        match self {
            Self::NewQuestionsCreated => "new_questions_created",
            Self::Sufficient => "sufficient",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for Verdict {
    fn from(s: &str) -> Self {
        match s {
            "new_questions_created" => Self::NewQuestionsCreated,
            "sufficient" => Self::Sufficient,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw evaluation response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precisa_mais: Option<bool>,
    /// Texts of the follow-up questions the service just created.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub novas_perguntas: Vec<String>,
}

impl Evaluation {
    pub fn verdict(&self) -> Verdict {
        Verdict::from(self.status.as_str())
    }
}
