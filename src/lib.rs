//! newsdesk — onboarding and review client for AI-curated news content.

pub mod config;
pub mod error;
pub mod onboarding;
pub mod review;
