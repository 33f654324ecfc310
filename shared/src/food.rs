//! Food placement and respawn rules

use crate::config::GameConfig;
use crate::error::GridExhausted;
use crate::grid::{Bounds, Cell};
use crate::{MAX_PLACEMENT_ATTEMPTS, RARE_FOOD_PROBABILITY, RARE_FOOD_SCORE_THRESHOLD};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Food flavour. Purely a visual/difficulty signal; both kinds are eaten
/// the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoodKind {
    #[default]
    #[serde(alias = "apple")]
    Normal,
    #[serde(alias = "spider")]
    Rare,
}

/// The single food item of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodItem {
    pub position: Cell,
    #[serde(rename = "type", default)]
    pub kind: FoodKind,
}

impl FoodItem {
    pub fn new(position: Cell, kind: FoodKind) -> Self {
        Self { position, kind }
    }
}

/// Places food on free cells by rejection sampling
#[derive(Debug, Clone)]
pub struct FoodSpawner {
    bounds: Bounds,
    rng: StdRng,
    max_attempts: u32,
    rare_threshold: u32,
    rare_probability: f64,
}

impl FoodSpawner {
    pub fn new(bounds: Bounds) -> Self {
        Self::with_rng(bounds, StdRng::from_entropy())
    }

    pub fn seeded(bounds: Bounds, seed: u64) -> Self {
        Self::with_rng(bounds, StdRng::seed_from_u64(seed))
    }

    fn with_rng(bounds: Bounds, rng: StdRng) -> Self {
        Self {
            bounds,
            rng,
            max_attempts: MAX_PLACEMENT_ATTEMPTS,
            rare_threshold: RARE_FOOD_SCORE_THRESHOLD,
            rare_probability: RARE_FOOD_PROBABILITY,
        }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        let spawner = match config.seed {
            Some(seed) => Self::seeded(config.bounds, seed),
            None => Self::new(config.bounds),
        };
        spawner
            .with_max_attempts(config.max_placement_attempts)
            .with_rare_rule(config.rare_food_threshold, config.rare_food_probability)
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Sets the rare-food rule. The probability is clamped to `0.0..=1.0`
    /// and NaN disables rare food.
    pub fn with_rare_rule(mut self, threshold: u32, probability: f64) -> Self {
        self.rare_threshold = threshold;
        self.rare_probability = if probability.is_nan() {
            0.0
        } else {
            probability.clamp(0.0, 1.0)
        };
        self
    }

    /// Draws a uniformly random cell that is not in `occupied`.
    ///
    /// Gives up with [`GridExhausted`] after the configured number of draws,
    /// or straight away when every cell is taken.
    pub fn place(&mut self, occupied: &HashSet<Cell>) -> Result<Cell, GridExhausted> {
        let capacity = self.bounds.cell_count();
        let taken = occupied
            .iter()
            .filter(|cell| self.bounds.contains(**cell))
            .count();
        if taken >= capacity {
            return Err(self.exhausted(0, occupied.len()));
        }

        for attempt in 1..=self.max_attempts {
            let cell = Cell::new(
                self.rng.gen_range(0..self.bounds.cols),
                self.rng.gen_range(0..self.bounds.rows),
            );
            if !occupied.contains(&cell) {
                if attempt > 1 {
                    debug!("Placed food at {} after {} draws", cell, attempt);
                }
                return Ok(cell);
            }
        }

        Err(self.exhausted(self.max_attempts, occupied.len()))
    }

    /// Creates the opening food item of a session
    pub fn spawn(&mut self, occupied: &HashSet<Cell>) -> Result<FoodItem, GridExhausted> {
        let position = self.place(occupied)?;
        Ok(FoodItem::new(position, FoodKind::Normal))
    }

    /// Moves `food` to a new free cell and re-rolls its kind based on the
    /// score of the participant who just ate it
    pub fn respawn(
        &mut self,
        food: &mut FoodItem,
        occupied: &HashSet<Cell>,
        score: u32,
    ) -> Result<(), GridExhausted> {
        food.position = self.place(occupied)?;
        food.kind = self.roll_kind(score);
        Ok(())
    }

    fn roll_kind(&mut self, score: u32) -> FoodKind {
        if score < self.rare_threshold {
            return FoodKind::Normal;
        }
        if self.rng.gen_bool(self.rare_probability) {
            FoodKind::Rare
        } else {
            FoodKind::Normal
        }
    }

    fn exhausted(&self, attempts: u32, occupied: usize) -> GridExhausted {
        GridExhausted {
            attempts,
            occupied,
            capacity: self.bounds.cell_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Direction;
    use crate::snake::GridSnake;
    use assert_approx_eq::assert_approx_eq;

    const BOUNDS: Bounds = Bounds::new(12, 10);

    /// Grows a snake along a random walk so every trial sees a different shape
    fn random_snake_cells(rng: &mut StdRng) -> HashSet<Cell> {
        let head = Cell::new(rng.gen_range(2..10), rng.gen_range(2..8));
        let mut snake = GridSnake::spawn(head, Direction::Right, BOUNDS);
        let steps = rng.gen_range(0..40);
        for _ in 0..steps {
            let direction = Direction::ALL[rng.gen_range(0..4)];
            snake.set_direction(direction);
            snake.grow();
            let before: Vec<Cell> = snake.body().collect();
            snake.advance();
            if !snake.is_alive() {
                return before.into_iter().collect();
            }
        }
        snake.body().collect()
    }

    #[test]
    fn test_place_never_hits_occupied_cells() {
        let mut shapes = StdRng::seed_from_u64(7);
        let mut spawner = FoodSpawner::seeded(BOUNDS, 11);

        for _ in 0..1_000 {
            let mut occupied = random_snake_cells(&mut shapes);
            occupied.extend(random_snake_cells(&mut shapes));
            let cell = spawner.place(&occupied).unwrap();
            assert!(BOUNDS.contains(cell));
            assert!(!occupied.contains(&cell), "food placed on snake at {}", cell);
        }
    }

    #[test]
    fn test_place_finds_last_free_cell() {
        let mut occupied: HashSet<Cell> = HashSet::new();
        for x in 0..BOUNDS.cols {
            for y in 0..BOUNDS.rows {
                occupied.insert(Cell::new(x, y));
            }
        }
        occupied.remove(&Cell::new(3, 4));

        let mut spawner = FoodSpawner::seeded(BOUNDS, 3);
        assert_eq!(spawner.place(&occupied), Ok(Cell::new(3, 4)));
    }

    #[test]
    fn test_place_on_full_grid_fails_without_looping() {
        let mut occupied: HashSet<Cell> = HashSet::new();
        for x in 0..BOUNDS.cols {
            for y in 0..BOUNDS.rows {
                occupied.insert(Cell::new(x, y));
            }
        }
        let mut spawner = FoodSpawner::seeded(BOUNDS, 3);
        let err = spawner.place(&occupied).unwrap_err();
        assert_eq!(err.capacity, 120);
        assert_eq!(err.occupied, 120);
    }

    #[test]
    fn test_place_gives_up_after_max_attempts() {
        let mut occupied: HashSet<Cell> = HashSet::new();
        for x in 0..BOUNDS.cols {
            for y in 0..BOUNDS.rows {
                occupied.insert(Cell::new(x, y));
            }
        }
        occupied.remove(&Cell::new(0, 0));

        let mut spawner = FoodSpawner::seeded(BOUNDS, 5).with_max_attempts(1);
        let mut failures = 0;
        for _ in 0..50 {
            if let Err(err) = spawner.place(&occupied) {
                assert_eq!(err.attempts, 1);
                failures += 1;
            }
        }
        assert!(failures > 0);
    }

    #[test]
    fn test_respawn_below_threshold_is_always_normal() {
        let mut spawner = FoodSpawner::seeded(BOUNDS, 1);
        let mut food = FoodItem::new(Cell::new(0, 0), FoodKind::Rare);
        let occupied = HashSet::new();
        for score in 0..20 {
            for _ in 0..100 {
                spawner.respawn(&mut food, &occupied, score).unwrap();
                assert_eq!(food.kind, FoodKind::Normal);
            }
        }
    }

    #[test]
    fn test_respawn_at_threshold_mixes_kinds() {
        let mut spawner = FoodSpawner::seeded(BOUNDS, 2024);
        let mut food = FoodItem::new(Cell::new(0, 0), FoodKind::Normal);
        let occupied = HashSet::new();

        let trials = 4_000;
        let mut rare = 0;
        for trial in 0..trials {
            spawner.respawn(&mut food, &occupied, 20 + trial % 7).unwrap();
            if food.kind == FoodKind::Rare {
                rare += 1;
            }
        }

        let rare_ratio = rare as f64 / trials as f64;
        assert_approx_eq!(rare_ratio, 0.30, 0.05);
        assert_approx_eq!(1.0 - rare_ratio, 0.70, 0.05);
    }

    #[test]
    fn test_unvalidated_probability_never_panics() {
        let mut occupied = HashSet::new();
        occupied.insert(Cell::new(0, 0));
        for probability in [f64::NAN, -2.0, 7.0] {
            let mut spawner = FoodSpawner::seeded(Bounds::new(10, 10), 8)
                .with_rare_rule(20, probability);
            let mut food = spawner.spawn(&occupied).unwrap();
            for _ in 0..50 {
                spawner.respawn(&mut food, &occupied, 40).unwrap();
                if probability.is_nan() || probability < 0.0 {
                    assert_eq!(food.kind, FoodKind::Normal);
                } else {
                    assert_eq!(food.kind, FoodKind::Rare);
                }
            }
        }
    }

    #[test]
    fn test_food_item_wire_shape() {
        let food = FoodItem::new(Cell::new(6, 5), FoodKind::Rare);
        let json = serde_json::to_value(food).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"position": {"x": 6, "y": 5}, "type": "rare"})
        );
        let legacy: FoodItem =
            serde_json::from_value(serde_json::json!({"position": {"x": 1, "y": 2}, "type": "spider"}))
                .unwrap();
        assert_eq!(legacy.kind, FoodKind::Rare);
    }
}
