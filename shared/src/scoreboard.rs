//! Per-participant scores and stable display hues

use crate::protocol::ParticipantId;
use crate::HUE_PALETTE;
use std::collections::{BTreeMap, HashMap};

/// Hue rotation in degrees applied to a participant's snake
pub type Hue = u16;

/// Folds a participant id into one of the [`HUE_PALETTE`] buckets.
///
/// Uses the classic `hash * 31 + unit` string hash over UTF-16 code units,
/// so the result depends on nothing but the id.
pub fn hue_bucket(id: &str) -> Hue {
    let hash = id.encode_utf16().fold(0i32, |hash, unit| {
        i32::from(unit).wrapping_add(hash.wrapping_shl(5).wrapping_sub(hash))
    });
    HUE_PALETTE[hash.unsigned_abs() as usize % HUE_PALETTE.len()]
}

/// Scores and hue assignments for one session
#[derive(Debug, Clone, Default)]
pub struct Scoreboard {
    scores: BTreeMap<ParticipantId, u32>,
    hues: HashMap<ParticipantId, Hue>,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a zero entry for `id` if none exists
    pub fn ensure(&mut self, id: &ParticipantId) {
        self.scores.entry(id.clone()).or_insert(0);
    }

    /// Adds one point and returns the new score
    pub fn add_point(&mut self, id: &ParticipantId) -> u32 {
        let score = self.scores.entry(id.clone()).or_insert(0);
        *score += 1;
        *score
    }

    pub fn score(&self, id: &ParticipantId) -> u32 {
        self.scores.get(id).copied().unwrap_or(0)
    }

    pub fn scores(&self) -> &BTreeMap<ParticipantId, u32> {
        &self.scores
    }

    /// Memoized hue for `id`, stable for the lifetime of the session
    pub fn hue_of(&mut self, id: &ParticipantId) -> Hue {
        *self
            .hues
            .entry(id.clone())
            .or_insert_with(|| hue_bucket(id.as_str()))
    }

    pub fn remove(&mut self, id: &ParticipantId) {
        self.scores.remove(id);
        self.hues.remove(id);
    }

    /// Replaces every score with `scores`, as received from the host.
    /// Hue memoization is kept.
    pub fn replace_scores(&mut self, scores: BTreeMap<ParticipantId, u32>) {
        self.scores = scores;
    }

    /// Clears scores and hues. Only used between sessions.
    pub fn reset(&mut self) {
        self.scores.clear();
        self.hues.clear();
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}
