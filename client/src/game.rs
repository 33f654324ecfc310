//! Client-side mirror of the host's game state
//!
//! Nothing is simulated here. Each snapshot replaces the mirrored snakes,
//! food and scores wholesale, so one received snapshot is enough to fully
//! resynchronize a client that missed any number of earlier ones.

use log::debug;
use shared::{Bounds, FoodItem, GridSnake, ParticipantId, Scoreboard, Snapshot};
use std::collections::BTreeMap;

/// What [`MirrorState::apply_snapshot`] did with a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The mirror now equals the snapshot
    Replaced,
    /// Older than the last applied snapshot; discarded
    Stale,
}

#[derive(Debug, Clone)]
pub struct MirrorState {
    bounds: Bounds,
    snakes: BTreeMap<ParticipantId, GridSnake>,
    food: Option<FoodItem>,
    scoreboard: Scoreboard,
    last_tick: Option<u64>,
}

impl MirrorState {
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            snakes: BTreeMap::new(),
            food: None,
            scoreboard: Scoreboard::new(),
            last_tick: None,
        }
    }

    /// Rebuilds the mirror from `snapshot`.
    ///
    /// Snakes are recreated verbatim, including ids never seen before. Food
    /// is created on first sight. A snapshot with a tick lower than the last
    /// applied one arrived out of order and is dropped.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) -> Applied {
        if let Some(last) = self.last_tick {
            if snapshot.tick < last {
                debug!("Dropping stale snapshot {} (have {})", snapshot.tick, last);
                return Applied::Stale;
            }
        }

        self.snakes = snapshot
            .snakes
            .into_iter()
            .map(|(id, state)| {
                let snake =
                    GridSnake::from_state(state.body, state.direction, state.alive, self.bounds);
                (id, snake)
            })
            .collect();

        match self.food.as_mut() {
            Some(food) => *food = snapshot.food,
            None => self.food = Some(snapshot.food),
        }

        self.scoreboard.replace_scores(snapshot.scores);
        self.last_tick = Some(snapshot.tick);
        Applied::Replaced
    }

    pub fn snakes(&self) -> &BTreeMap<ParticipantId, GridSnake> {
        &self.snakes
    }

    pub fn snake(&self, id: &ParticipantId) -> Option<&GridSnake> {
        self.snakes.get(id)
    }

    pub fn food(&self) -> Option<&FoodItem> {
        self.food.as_ref()
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    /// Hue for drawing `id`'s snake
    pub fn hue_of(&mut self, id: &ParticipantId) -> shared::Hue {
        self.scoreboard.hue_of(id)
    }

    pub fn last_tick(&self) -> Option<u64> {
        self.last_tick
    }

    pub fn has_state(&self) -> bool {
        self.last_tick.is_some()
    }
}
