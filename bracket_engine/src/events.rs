//! Best-effort bracket event notifications.
//!
//! The engine publishes an event after every state change it applies.
//! Delivery is fire-and-forget: a broadcaster must never fail the operation
//! that produced the event.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::bracket::{BracketView, MatchId, MatchStatus, ParticipantId, ParticipantStatus};
use crate::tournament::{TournamentId, TournamentStatus};

/// Default capacity of the broadcast channel
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Bracket event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BracketEvent {
    BracketCreated {
        tournament_id: TournamentId,
        view: BracketView,
    },
    /// A slot was filled or the status changed
    MatchUpdated {
        tournament_id: TournamentId,
        match_id: MatchId,
        slot_a: Option<ParticipantId>,
        slot_b: Option<ParticipantId>,
        status: MatchStatus,
    },
    MatchCompleted {
        tournament_id: TournamentId,
        match_id: MatchId,
        winner_id: ParticipantId,
        /// Both `None` for a bye or walkover
        score_a: Option<i32>,
        score_b: Option<i32>,
    },
    PlacementAssigned {
        tournament_id: TournamentId,
        participant_id: ParticipantId,
        status: ParticipantStatus,
        placement: Option<u32>,
    },
    TournamentStatusChanged {
        tournament_id: TournamentId,
        status: TournamentStatus,
    },
}

impl BracketEvent {
    pub fn tournament_id(&self) -> TournamentId {
        match self {
            BracketEvent::BracketCreated { tournament_id, .. }
            | BracketEvent::MatchUpdated { tournament_id, .. }
            | BracketEvent::MatchCompleted { tournament_id, .. }
            | BracketEvent::PlacementAssigned { tournament_id, .. }
            | BracketEvent::TournamentStatusChanged { tournament_id, .. } => *tournament_id,
        }
    }
}

/// Sink for bracket events
pub trait EventBroadcaster: Send + Sync {
    /// Publish an event. Must not block and must not fail the caller.
    fn publish(&self, event: BracketEvent);
}

/// Broadcaster fanning events out over a tokio broadcast channel
#[derive(Clone)]
pub struct ChannelBroadcaster {
    sender: broadcast::Sender<BracketEvent>,
}

impl ChannelBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BracketEvent> {
        self.sender.subscribe()
    }
}

impl Default for ChannelBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventBroadcaster for ChannelBroadcaster {
    fn publish(&self, event: BracketEvent) {
        // No subscribers is not an error
        if self.sender.send(event).is_err() {
            log::trace!("Bracket event dropped, no subscribers");
        }
    }
}
