//! Session configuration

use crate::error::ConfigError;
use crate::grid::Bounds;
use crate::{
    DEFAULT_COLS, DEFAULT_MAX_PARTICIPANTS, DEFAULT_MIN_PARTICIPANTS, DEFAULT_ROWS,
    DEFAULT_TICK_MS, MAX_PLACEMENT_ATTEMPTS, MIN_GRID_SIDE, RARE_FOOD_PROBABILITY,
    RARE_FOOD_SCORE_THRESHOLD,
};
use std::time::Duration;

/// Tunables for one game session. Host and clients should agree on
/// `bounds`; everything else only matters on the host.
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub bounds: Bounds,
    pub tick_interval: Duration,
    /// Participants required before the host starts ticking
    pub min_participants: usize,
    /// Joins beyond this are ignored
    pub max_participants: usize,
    /// Score at which rare food starts to appear
    pub rare_food_threshold: u32,
    pub rare_food_probability: f64,
    pub max_placement_attempts: u32,
    /// Evict remote participants that have been silent this long
    pub idle_timeout: Option<Duration>,
    /// End the session once every snake is dead
    pub end_when_all_dead: bool,
    /// Seed for food placement; entropy when `None`
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            bounds: Bounds::new(DEFAULT_COLS, DEFAULT_ROWS),
            tick_interval: Duration::from_millis(DEFAULT_TICK_MS),
            min_participants: DEFAULT_MIN_PARTICIPANTS,
            max_participants: DEFAULT_MAX_PARTICIPANTS,
            rare_food_threshold: RARE_FOOD_SCORE_THRESHOLD,
            rare_food_probability: RARE_FOOD_PROBABILITY,
            max_placement_attempts: MAX_PLACEMENT_ATTEMPTS,
            idle_timeout: None,
            end_when_all_dead: true,
            seed: None,
        }
    }
}

impl GameConfig {
    /// Single-player preset: the host starts ticking immediately
    pub fn solo() -> Self {
        Self {
            min_participants: 1,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bounds.cols < MIN_GRID_SIDE || self.bounds.rows < MIN_GRID_SIDE {
            return Err(ConfigError::GridTooSmall {
                cols: self.bounds.cols,
                rows: self.bounds.rows,
                min: MIN_GRID_SIDE,
            });
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::ZeroTickInterval);
        }
        if self.min_participants == 0 || self.min_participants > self.max_participants {
            return Err(ConfigError::ParticipantLimits {
                min: self.min_participants,
                max: self.max_participants,
            });
        }
        if !(0.0..=1.0).contains(&self.rare_food_probability) {
            return Err(ConfigError::Probability(self.rare_food_probability));
        }
        if self.max_placement_attempts == 0 {
            return Err(ConfigError::ZeroPlacementAttempts);
        }
        Ok(())
    }
}
