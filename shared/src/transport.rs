//! The seam between the game and whatever relay carries its messages.
//!
//! The transport gives no delivery or ordering guarantees. Inbound events
//! are pulled with [`Transport::next_event`] by the coordinator's run loop
//! rather than pushed into a callback, which keeps every mutation of game
//! state on that one loop.

use crate::error::TransportError;
use crate::protocol::{ParticipantId, SessionCode};
use async_trait::async_trait;
use serde_json::Value;

/// What an inbound event means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A new participant attached to the session; payload is empty
    Joined,
    /// Application payload, see [`crate::protocol`]
    Game,
    /// A participant (or the host) explicitly left
    Left,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportEvent {
    pub kind: EventKind,
    pub message_id: u64,
    pub origin: ParticipantId,
    pub payload: Value,
}

#[async_trait]
pub trait Transport: Send {
    /// Opens a new session and returns its code plus the host's own id
    async fn host(&mut self) -> Result<(SessionCode, ParticipantId), TransportError>;

    /// Attaches to an existing session and returns the caller's id
    async fn join(&mut self, code: &SessionCode) -> Result<ParticipantId, TransportError>;

    /// Waits for the next inbound event. `None` once detached.
    async fn next_event(&mut self) -> Option<TransportEvent>;

    /// Returns an already-queued event without waiting
    fn try_next_event(&mut self) -> Option<TransportEvent>;

    /// Host: broadcast to every participant. Client: send to the host only.
    fn transmit(&mut self, payload: Value) -> Result<(), TransportError>;

    /// Detaches from the session. Messages already in flight may still be
    /// delivered to others.
    async fn leave(&mut self);
}
