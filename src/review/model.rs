//! Draft card data model — pipeline steps, decisions, and broadcast events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Score at or above which a draft is recommended for posting.
pub const POST_THRESHOLD: u8 = 70;
/// Score at or above which a draft is kept under monitoring.
pub const MONITOR_THRESHOLD: u8 = 50;

/// Stages a news item goes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    Fetch,
    Classify,
    Score,
    Draft,
    Review,
    Schedule,
    Publish,
}

impl PipelineStep {
    pub const ALL: [PipelineStep; 7] = [
        Self::Fetch,
        Self::Classify,
        Self::Score,
        Self::Draft,
        Self::Review,
        Self::Schedule,
        Self::Publish,
    ];

    /// Position in the pipeline, starting at 0.
    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0)
    }

    /// Next step, or `None` at `Publish`.
    pub fn next(&self) -> Option<PipelineStep> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// Completion percentage shown in progress bars.
    pub fn progress_percent(&self) -> u8 {
        (((self.index() + 1) * 100) / Self::ALL.len()) as u8
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Fetch => "Collection",
            Self::Classify => "Classification",
            Self::Score => "Scoring",
            Self::Draft => "Drafting",
            Self::Review => "Review",
            Self::Schedule => "Scheduling",
            Self::Publish => "Publication",
        }
    }
}

impl std::fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Fetch => "fetch",
            Self::Classify => "classify",
            Self::Score => "score",
            Self::Draft => "draft",
            Self::Review => "review",
            Self::Schedule => "schedule",
            Self::Publish => "publish",
        };
        write!(f, "{s}")
    }
}

/// What the scoring recommends doing with an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Post,
    Monitor,
    Discard,
}

impl Decision {
    pub fn from_score(score: u8) -> Self {
        if score >= POST_THRESHOLD {
            Self::Post
        } else if score >= MONITOR_THRESHOLD {
            Self::Monitor
        } else {
            Self::Discard
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Post => write!(f, "post"),
            Self::Monitor => write!(f, "monitor"),
            Self::Discard => write!(f, "discard"),
        }
    }
}

/// Human review status of a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    /// Waiting for a reviewer.
    Pending,
    /// Approved for publication.
    Approved,
    /// Rejected or sent back for adjustment.
    Rejected,
}

impl std::fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// One entry of a draft's activity log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub at: DateTime<Utc>,
    pub message: String,
    pub step: PipelineStep,
}

/// A curated news item with its generated social-media draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftCard {
    pub id: Uuid,
    /// Company the draft is produced for.
    pub tenant: String,
    pub title: String,
    pub url: String,
    pub source: String,
    pub theme: String,
    /// Relevance score, 0–100.
    pub score: u8,
    pub step: PipelineStep,
    pub decision: Decision,
    pub caption: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hashtags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    pub status: DraftStatus,
    #[serde(default)]
    pub activity: Vec<ActivityEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DraftCard {
    /// Create a pending draft at the `Draft` step. The score is clamped to 100.
    pub fn new(
        tenant: impl Into<String>,
        title: impl Into<String>,
        source: impl Into<String>,
        theme: impl Into<String>,
        score: u8,
        caption: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        let score = score.min(100);
        Self {
            id: Uuid::new_v4(),
            tenant: tenant.into(),
            title: title.into(),
            url: String::new(),
            source: source.into(),
            theme: theme.into(),
            score,
            step: PipelineStep::Draft,
            decision: Decision::from_score(score),
            caption: caption.into(),
            hashtags: Vec::new(),
            tone: None,
            status: DraftStatus::Pending,
            activity: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_step(mut self, step: PipelineStep) -> Self {
        self.step = step;
        self
    }

    pub fn with_hashtags(mut self, hashtags: Vec<String>) -> Self {
        self.hashtags = hashtags;
        self
    }

    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = Some(tone.into());
        self
    }

    /// Append to the activity log and bump `updated_at`.
    pub fn log(&mut self, message: impl Into<String>) {
        let now = Utc::now();
        self.activity.push(ActivityEntry {
            at: now,
            message: message.into(),
            step: self.step,
        });
        self.updated_at = now;
    }

    /// Whether the card matches a free-text search on title, source or theme.
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        [&self.title, &self.source, &self.theme]
            .iter()
            .any(|field| field.to_lowercase().contains(&query))
    }
}

/// Events broadcast to queue subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReviewEvent {
    /// A new draft is available.
    NewDraft { card: DraftCard },
    /// A draft changed (status, step or score).
    DraftUpdate {
        id: Uuid,
        status: DraftStatus,
        step: PipelineStep,
        decision: Decision,
    },
}
