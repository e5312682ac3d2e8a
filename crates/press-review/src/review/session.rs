//! Review sessions and the coordinator that owns the live one.

use chrono::{DateTime, Utc};
use notify::{DeliveryId, DeliveryReceipt, ACTION_APPROVE, ACTION_REGENERATE};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info};
use uuid::Uuid;

/// State of a review session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Pending,
    Approved,
    Regenerated,
    TimedOut,
}

impl Decision {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// One candidate awaiting a human decision.
#[derive(Debug, Clone)]
pub struct ReviewSession {
    pub id: Uuid,
    /// The review message carrying the actions.
    pub receipt: DeliveryReceipt,
    /// Annotated, normalized digest text.
    pub candidate: String,
    pub decision: Decision,
    /// Slack user id of whoever decided.
    pub decided_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
}

/// Which button was pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Approve,
    Regenerate,
}

impl ActionKind {
    /// Map a Block Kit `action_id`.
    #[must_use]
    pub fn from_action_id(action_id: &str) -> Option<Self> {
        match action_id {
            ACTION_APPROVE => Some(Self::Approve),
            ACTION_REGENERATE => Some(Self::Regenerate),
            _ => None,
        }
    }

    const fn decision(self) -> Decision {
        match self {
            Self::Approve => Decision::Approved,
            Self::Regenerate => Decision::Regenerated,
        }
    }
}

/// A decision signal received from the review destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewAction {
    pub kind: ActionKind,
    /// Message whose button was pressed.
    pub message: DeliveryId,
    pub user: Option<String>,
}

/// Result of applying an action to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The live session took this decision.
    Accepted(Decision),
    /// The live session had already reached this decision; nothing changed.
    AlreadyDecided(Decision),
    /// The action targets a message that is not the live review message.
    Stale,
    /// No session is awaiting review.
    NoLiveSession,
}

/// Single owner of the live review session.
///
/// The interaction listener applies actions, the workflow reads decisions
/// and expires the deadline. Every transition happens under one lock, so the
/// first terminal decision wins and later ones are no-ops.
#[derive(Debug, Default)]
pub struct ReviewCoordinator {
    session: Mutex<Option<ReviewSession>>,
    changed: Notify,
}

impl ReviewCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<ReviewSession>> {
        // Sessions are plain data; a panicked holder cannot leave them half-written.
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `candidate` the live session, replacing any previous one.
    pub fn open(&self, receipt: DeliveryReceipt, candidate: String, timeout: Duration) -> Uuid {
        let created_at = Utc::now();
        let deadline = chrono::Duration::from_std(timeout)
            .ok()
            .and_then(|d| created_at.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let session = ReviewSession {
            id: Uuid::new_v4(),
            receipt,
            candidate,
            decision: Decision::Pending,
            decided_by: None,
            created_at,
            deadline,
        };
        let id = session.id;

        info!(
            session = %id,
            message = %session.receipt.id,
            deadline = %deadline.to_rfc3339(),
            "Review session opened"
        );

        *self.lock() = Some(session);
        self.changed.notify_one();
        id
    }

    /// Apply an action. Only a pending live session whose review message
    /// matches `action.message` can change.
    pub fn apply(&self, action: &ReviewAction) -> ActionOutcome {
        let outcome = {
            let mut guard = self.lock();
            match guard.as_mut() {
                None => ActionOutcome::NoLiveSession,
                Some(session) if session.receipt.id != action.message => ActionOutcome::Stale,
                Some(session) if session.decision.is_terminal() => {
                    ActionOutcome::AlreadyDecided(session.decision)
                }
                Some(session) => {
                    session.decision = action.kind.decision();
                    session.decided_by.clone_from(&action.user);
                    ActionOutcome::Accepted(session.decision)
                }
            }
        };

        match outcome {
            ActionOutcome::Accepted(decision) => {
                info!(?decision, message = %action.message, user = ?action.user, "Review decision recorded");
                self.changed.notify_one();
            }
            ActionOutcome::AlreadyDecided(decision) => {
                debug!(?decision, message = %action.message, "Ignoring repeated action");
            }
            ActionOutcome::Stale | ActionOutcome::NoLiveSession => {
                info!(
                    kind = ?action.kind,
                    message = %action.message,
                    "Ignoring action for a message that is not under review"
                );
            }
        }
        outcome
    }

    /// Decision of the live session, if any.
    pub fn decision(&self) -> Option<Decision> {
        self.lock().as_ref().map(|s| s.decision)
    }

    /// Copy of the live session.
    pub fn snapshot(&self) -> Option<ReviewSession> {
        self.lock().clone()
    }

    /// Review message of the live session.
    pub fn live_message(&self) -> Option<DeliveryId> {
        self.lock().as_ref().map(|s| s.receipt.id.clone())
    }

    /// Time the live session out. Returns false if it was already decided.
    pub fn expire(&self) -> bool {
        let expired = {
            let mut guard = self.lock();
            match guard.as_mut() {
                Some(session) if session.decision == Decision::Pending => {
                    session.decision = Decision::TimedOut;
                    true
                }
                _ => false,
            }
        };
        if expired {
            self.changed.notify_one();
        }
        expired
    }

    /// Put a decided session back to pending, keeping its deadline.
    pub fn reopen(&self) {
        if let Some(session) = self.lock().as_mut() {
            session.decision = Decision::Pending;
            session.decided_by = None;
        }
    }

    /// End the live session. Actions for it are stale from now on.
    pub fn close(&self) -> Option<ReviewSession> {
        self.lock().take()
    }

    /// Resolves after the next state change. A change that happened while
    /// nobody was waiting is not lost.
    pub async fn changed(&self) {
        self.changed.notified().await;
    }
}
