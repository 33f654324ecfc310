//! Participant bookkeeping on the host
//!
//! This module tracks who is in the session and what they last asked for:
//! - Participant lifecycle (join, leave, idle eviction)
//! - Pending directional intents, last write wins per participant
//! - Activity timestamps for connection health
//! - Capacity enforcement
//!
//! Intents are not queued. A participant that sends three turns between two
//! ticks gets the last one applied; the snake simply keeps its heading when
//! nothing new arrives.

use log::{debug, info};
use shared::{Direction, ParticipantId};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// A participant known to the host
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: ParticipantId,
    /// Last time anything was heard from this participant
    pub last_seen: Instant,
    /// Most recent intent not yet consumed by a tick
    pub pending_intent: Option<Direction>,
    /// The host's own participant; never evicted for inactivity
    pub is_local: bool,
}

impl Participant {
    pub fn new(id: ParticipantId, is_local: bool, now: Instant) -> Self {
        Self {
            id,
            last_seen: now,
            pending_intent: None,
            is_local,
        }
    }

    /// Overwrites the pending intent and refreshes activity
    pub fn record_intent(&mut self, direction: Direction, now: Instant) {
        self.last_seen = now;
        self.pending_intent = Some(direction);
    }

    /// Returns true if nothing has been heard for longer than `timeout`
    pub fn is_timed_out(&self, timeout: Duration, now: Instant) -> bool {
        !self.is_local && now.saturating_duration_since(self.last_seen) > timeout
    }
}

/// All participants of a hosted session, ordered by id
pub struct ParticipantRegistry {
    participants: BTreeMap<ParticipantId, Participant>,
    max_participants: usize,
}

impl ParticipantRegistry {
    pub fn new(max_participants: usize) -> Self {
        Self {
            participants: BTreeMap::new(),
            max_participants,
        }
    }

    /// Registers a participant.
    ///
    /// Returns false when the session is full or the id is already present.
    pub fn add(&mut self, id: ParticipantId, is_local: bool, now: Instant) -> bool {
        if self.participants.len() >= self.max_participants || self.participants.contains_key(&id) {
            return false;
        }
        info!("Participant {} registered{}", id, if is_local { " (local)" } else { "" });
        self.participants
            .insert(id.clone(), Participant::new(id, is_local, now));
        true
    }

    pub fn remove(&mut self, id: &ParticipantId) -> bool {
        if self.participants.remove(id).is_some() {
            info!("Participant {} removed", id);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.participants.contains_key(id)
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.get(id)
    }

    /// Stores `direction` as the participant's pending intent. Returns false
    /// for unknown ids.
    pub fn record_intent(&mut self, id: &ParticipantId, direction: Direction, now: Instant) -> bool {
        match self.participants.get_mut(id) {
            Some(participant) => {
                participant.record_intent(direction, now);
                true
            }
            None => false,
        }
    }

    /// Refreshes activity without touching the pending intent
    pub fn touch(&mut self, id: &ParticipantId, now: Instant) {
        if let Some(participant) = self.participants.get_mut(id) {
            participant.last_seen = now;
        }
    }

    /// Drains every pending intent for the upcoming tick
    pub fn take_intents(&mut self) -> BTreeMap<ParticipantId, Direction> {
        self.participants
            .values_mut()
            .filter_map(|participant| {
                participant
                    .pending_intent
                    .take()
                    .map(|direction| (participant.id.clone(), direction))
            })
            .collect()
    }

    /// Removes remote participants silent for longer than `timeout` and
    /// returns their ids so the game can drop their snakes too
    pub fn check_timeouts(&mut self, timeout: Duration, now: Instant) -> Vec<ParticipantId> {
        let timed_out: Vec<ParticipantId> = self
            .participants
            .values()
            .filter(|participant| participant.is_timed_out(timeout, now))
            .map(|participant| participant.id.clone())
            .collect();

        for id in &timed_out {
            debug!("Participant {} idle for more than {:?}", id, timeout);
            self.remove(id);
        }

        timed_out
    }

    pub fn ids(&self) -> impl Iterator<Item = &ParticipantId> {
        self.participants.keys()
    }

    pub fn max_participants(&self) -> usize {
        self.max_participants
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}
