//! Decoupled event bus for board activity.
//!
//! The lifecycle layer emits a [`BoardEvent`] after each successful
//! transition via [`EventBus::emit`]; listeners subscribe via
//! [`EventBus::subscribe`]. Built on [`tokio::sync::broadcast`] so several
//! listeners (the activity log, a future feed) can react independently.

use tokio::sync::broadcast;
use tracing::info;

use crate::domain::{MembershipStatus, QuestId, QuestStatus, UserId};

/// Events that flow through the board.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    QuestCreated { quest: QuestId, by: UserId, title: String },
    QuestAccepted { quest: QuestId, by: UserId },
    QuestUnaccepted { quest: QuestId, by: UserId, reopened_lane: bool },
    QuestCompleted { quest: QuestId, by: UserId, xp: i64 },
    QuestReopened { quest: QuestId, by: UserId, xp: i64 },
    LaneReordered { status: QuestStatus, count: usize },
    MembershipDecided { member: UserId, status: MembershipStatus, by: UserId },
}

/// A broadcast channel that any component can emit to or subscribe from.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<BoardEvent>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all current subscribers.
    /// Returns the number of receivers that will see it.
    pub fn emit(&self, event: BoardEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to events. Returns a receiver that yields all
    /// future events (does not replay past ones).
    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Log every board event until the bus closes.
pub async fn log_activity(mut rx: broadcast::Receiver<BoardEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => log_event(&event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "activity log fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn log_event(event: &BoardEvent) {
    match event {
        BoardEvent::QuestCreated { quest, by, title } => {
            info!(%quest, %by, title = %title, "quest posted");
        }
        BoardEvent::QuestAccepted { quest, by } => info!(%quest, %by, "quest accepted"),
        BoardEvent::QuestUnaccepted { quest, by, reopened_lane } => {
            info!(%quest, %by, reopened_lane, "quest unaccepted");
        }
        BoardEvent::QuestCompleted { quest, by, xp } => info!(%quest, %by, xp, "quest completed"),
        BoardEvent::QuestReopened { quest, by, xp } => info!(%quest, %by, xp, "quest reopened"),
        BoardEvent::LaneReordered { status, count } => {
            info!(%status, count, "lane reordered");
        }
        BoardEvent::MembershipDecided { member, status, by } => {
            info!(%member, %status, %by, "membership decided");
        }
    }
}
