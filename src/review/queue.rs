//! Review queue — in-memory draft queue with broadcast to subscribers.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::model::{Decision, DraftCard, DraftStatus, ReviewEvent};
use crate::error::ReviewError;

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// Criteria for listing drafts.
#[derive(Debug, Clone, Default)]
pub struct DraftFilter {
    pub tenant: Option<String>,
    pub decision: Option<Decision>,
    pub query: Option<String>,
}

impl DraftFilter {
    fn matches(&self, card: &DraftCard) -> bool {
        self.tenant.as_ref().is_none_or(|t| &card.tenant == t)
            && self.decision.is_none_or(|d| card.decision == d)
            && self.query.as_deref().is_none_or(|q| card.matches_query(q))
    }
}

/// In-memory draft queue backed by a broadcast channel for fan-out.
pub struct ReviewQueue {
    cards: RwLock<VecDeque<DraftCard>>,
    tx: broadcast::Sender<ReviewEvent>,
}

impl ReviewQueue {
    pub fn new() -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Arc::new(Self {
            cards: RwLock::new(VecDeque::new()),
            tx,
        })
    }

    /// Subscribe to real-time draft events.
    pub fn subscribe(&self) -> broadcast::Receiver<ReviewEvent> {
        self.tx.subscribe()
    }

    /// Push a new draft and broadcast it.
    pub async fn push(&self, card: DraftCard) {
        info!(
            card_id = %card.id,
            tenant = %card.tenant,
            score = card.score,
            decision = %card.decision,
            "New draft queued for review"
        );

        let event = ReviewEvent::NewDraft { card: card.clone() };
        self.cards.write().await.push_back(card);

        // Ok if nobody is listening yet
        let _ = self.tx.send(event);
    }

    fn notify(&self, card: &DraftCard) {
        let _ = self.tx.send(ReviewEvent::DraftUpdate {
            id: card.id,
            status: card.status,
            step: card.step,
            decision: card.decision,
        });
    }

    /// Apply `f` to a pending card, broadcast the change and return the card.
    async fn update_pending<F>(&self, id: Uuid, f: F) -> Result<DraftCard, ReviewError>
    where
        F: FnOnce(&mut DraftCard),
    {
        let mut cards = self.cards.write().await;
        let card = cards
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(ReviewError::NotFound { id })?;

        if card.status != DraftStatus::Pending {
            warn!(card_id = %id, status = %card.status, "Draft is no longer pending");
            return Err(ReviewError::NotPending {
                id,
                status: card.status.to_string(),
            });
        }

        f(card);
        self.notify(card);
        Ok(card.clone())
    }

    /// Approve a pending draft for publication.
    pub async fn approve(&self, id: Uuid) -> Result<DraftCard, ReviewError> {
        let card = self
            .update_pending(id, |card| {
                card.status = DraftStatus::Approved;
                card.log("Approved for publication");
            })
            .await?;
        info!(card_id = %id, "Draft approved");
        Ok(card)
    }

    /// Reject a pending draft, optionally saying what to adjust.
    pub async fn reject(&self, id: Uuid, reason: Option<&str>) -> Result<DraftCard, ReviewError> {
        let card = self
            .update_pending(id, |card| {
                card.status = DraftStatus::Rejected;
                match reason.map(str::trim).filter(|r| !r.is_empty()) {
                    Some(reason) => card.log(format!("Rejected: {reason}")),
                    None => card.log("Rejected"),
                }
            })
            .await?;
        info!(card_id = %id, "Draft rejected");
        Ok(card)
    }

    /// Move a pending draft one step forward.
    ///
    /// Only `post` drafts advance, and they stop at `publish` to wait for
    /// approval. Returns whether the step changed.
    pub async fn advance(&self, id: Uuid) -> Result<bool, ReviewError> {
        let mut moved = false;
        self.update_pending(id, |card| {
            if card.decision != Decision::Post {
                return;
            }
            if let Some(next) = card.step.next() {
                card.step = next;
                card.log(format!("{} done", next.label()));
                moved = true;
            }
        })
        .await?;
        debug!(card_id = %id, moved, "Draft advance");
        Ok(moved)
    }

    /// Replace a pending draft's score and re-derive its decision.
    pub async fn rescore(&self, id: Uuid, score: u8) -> Result<DraftCard, ReviewError> {
        self.update_pending(id, |card| {
            card.score = score.min(100);
            card.decision = Decision::from_score(card.score);
            card.log(format!("Score recalculated ({})", card.score));
        })
        .await
    }

    /// Pending drafts matching the filter, highest score first.
    pub async fn pending(&self, filter: &DraftFilter) -> Vec<DraftCard> {
        let cards = self.cards.read().await;
        let mut pending: Vec<DraftCard> = cards
            .iter()
            .filter(|c| c.status == DraftStatus::Pending && filter.matches(c))
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.score.cmp(&a.score));
        pending
    }

    pub async fn get(&self, id: Uuid) -> Option<DraftCard> {
        self.cards.read().await.iter().find(|c| c.id == id).cloned()
    }

    /// Total number of drafts (all statuses).
    pub async fn len(&self) -> usize {
        self.cards.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cards.read().await.is_empty()
    }
}
