//! Draft review — news items with generated captions waiting for a human
//! to approve or reject them before scheduling.

pub mod model;
pub mod queue;

pub use model::{Decision, DraftCard, DraftStatus, PipelineStep, ReviewEvent};
pub use queue::{DraftFilter, ReviewQueue};
