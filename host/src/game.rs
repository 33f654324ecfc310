//! Authoritative game state and the per-tick simulation step

use log::{debug, info};
use shared::snake::START_DIRECTION;
use shared::{
    Advance, Cell, DeathCause, Direction, FoodItem, FoodSpawner, GameConfig, GridExhausted,
    GridSnake, ParticipantId, Scoreboard, Snapshot,
};
use std::collections::{BTreeMap, HashSet};

/// Rows between the heads of consecutive spawn slots
const SPAWN_ROW_STRIDE: i32 = 4;

/// What happened during one [`GameSession::step`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TickReport {
    pub tick: u64,
    /// Participant that ate the food this tick, if any
    pub consumed_by: Option<ParticipantId>,
    /// Snakes that died this tick
    pub deaths: Vec<(ParticipantId, DeathCause)>,
}

/// The host's authoritative copy of the game.
///
/// Snakes are kept in a `BTreeMap`, so every iteration, including the food
/// check, visits participants in ascending id order.
#[derive(Debug, Clone)]
pub struct GameSession {
    config: GameConfig,
    snakes: BTreeMap<ParticipantId, GridSnake>,
    food: FoodItem,
    spawner: FoodSpawner,
    scoreboard: Scoreboard,
    tick: u64,
    next_slot: i32,
}

impl GameSession {
    /// Creates a session with the host's snake at the default start and an
    /// initial food item
    pub fn new(config: &GameConfig, host: ParticipantId) -> Result<Self, GridExhausted> {
        let mut spawner = FoodSpawner::from_config(config);
        let host_snake = GridSnake::new(config.bounds);
        let occupied: HashSet<Cell> = host_snake.body().collect();
        let food = spawner.spawn(&occupied)?;

        let mut scoreboard = Scoreboard::new();
        scoreboard.ensure(&host);
        let mut snakes = BTreeMap::new();
        snakes.insert(host, host_snake);

        Ok(Self {
            config: config.clone(),
            snakes,
            food,
            spawner,
            scoreboard,
            tick: 0,
            next_slot: 1,
        })
    }

    /// Head cell of spawn slot `slot`
    pub fn spawn_head(&self, slot: i32) -> Cell {
        let rows = self.config.bounds.rows.max(1);
        Cell::new(5, (5 + SPAWN_ROW_STRIDE * slot).rem_euclid(rows))
    }

    /// Adds a snake for `id` at the next free spawn slot with a zero score.
    ///
    /// Slots whose head or tail cell is taken are skipped. When every slot
    /// row is blocked the first free head and tail pair on the grid is used,
    /// and with none left the join fails with [`GridExhausted`].
    ///
    /// Returns `Ok(false)` if the participant already has a snake. The food
    /// is moved if the new snake landed on it.
    pub fn add_participant(&mut self, id: &ParticipantId) -> Result<bool, GridExhausted> {
        if self.snakes.contains_key(id) {
            return Ok(false);
        }

        let occupied = self.occupied_cells();
        let head = self.claim_spawn_head(&occupied).ok_or(GridExhausted {
            attempts: 0,
            occupied: occupied.len(),
            capacity: self.config.bounds.cell_count(),
        })?;
        let snake = GridSnake::spawn(head, START_DIRECTION, self.config.bounds);
        info!("Spawned snake for {} at {}", id, head);

        self.snakes.insert(id.clone(), snake);
        self.scoreboard.ensure(id);

        if self.is_occupied(self.food.position) {
            let occupied = self.occupied_cells();
            self.food.position = self.spawner.place(&occupied)?;
            debug!("Food covered by new snake, moved to {}", self.food.position);
        }
        Ok(true)
    }

    fn claim_spawn_head(&mut self, occupied: &HashSet<Cell>) -> Option<Cell> {
        let rows = self.config.bounds.rows.max(1);
        for slot in self.next_slot..self.next_slot + rows {
            let head = self.spawn_head(slot);
            if self.spawn_fits(head, occupied) {
                self.next_slot = slot + 1;
                return Some(head);
            }
        }

        let bounds = self.config.bounds;
        let head = (0..bounds.rows)
            .flat_map(|y| (0..bounds.cols).map(move |x| Cell::new(x, y)))
            .find(|head| self.spawn_fits(*head, occupied))?;
        debug!("Every spawn slot is blocked, using {}", head);
        Some(head)
    }

    /// True when a fresh snake with its head at `head` covers no taken cell
    fn spawn_fits(&self, head: Cell, occupied: &HashSet<Cell>) -> bool {
        let tail = head.step(START_DIRECTION.reverse());
        self.config.bounds.contains(head)
            && self.config.bounds.contains(tail)
            && !occupied.contains(&head)
            && !occupied.contains(&tail)
    }

    /// Drops the participant's snake and score
    pub fn remove_participant(&mut self, id: &ParticipantId) -> bool {
        self.scoreboard.remove(id);
        self.snakes.remove(id).is_some()
    }

    /// Advances the simulation by one tick.
    ///
    /// Inputs are applied first, then every snake advances, then at most one
    /// alive snake (lowest id) whose head sits on the food eats it. The new
    /// food avoids every cell covered by a snake before or after the move.
    pub fn step(
        &mut self,
        inputs: &BTreeMap<ParticipantId, Direction>,
    ) -> Result<TickReport, GridExhausted> {
        self.tick += 1;
        let mut report = TickReport {
            tick: self.tick,
            ..TickReport::default()
        };

        for (id, direction) in inputs {
            if let Some(snake) = self.snakes.get_mut(id) {
                if !snake.set_direction(*direction) {
                    debug!("Ignored reversing intent {} from {}", direction, id);
                }
            }
        }

        // cells vacated by this move stay off-limits for the respawn
        let mut occupied = self.occupied_cells();

        for (id, snake) in self.snakes.iter_mut() {
            if let Advance::Died(cause) = snake.advance() {
                info!("Snake {} died ({:?}) on tick {}", id, cause, self.tick);
                report.deaths.push((id.clone(), cause));
            }
        }

        let food_cell = self.food.position;
        let eater = self
            .snakes
            .iter()
            .find(|(_, snake)| snake.is_alive() && snake.head() == Some(food_cell))
            .map(|(id, _)| id.clone());

        if let Some(id) = eater {
            if let Some(snake) = self.snakes.get_mut(&id) {
                snake.grow();
            }
            let score = self.scoreboard.add_point(&id);
            occupied.extend(self.occupied_cells());
            self.spawner.respawn(&mut self.food, &occupied, score)?;
            debug!(
                "{} ate food at {} (score {}), respawned at {}",
                id, food_cell, score, self.food.position
            );
            report.consumed_by = Some(id);
        }

        Ok(report)
    }

    /// Full replicated state for broadcasting
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.tick,
            snakes: self
                .snakes
                .iter()
                .map(|(id, snake)| (id.clone(), snake.to_state()))
                .collect(),
            food: self.food,
            scores: self.scoreboard.scores().clone(),
        }
    }

    /// Every cell covered by a snake, dead snakes included
    pub fn occupied_cells(&self) -> HashSet<Cell> {
        self.snakes.values().flat_map(|snake| snake.body()).collect()
    }

    fn is_occupied(&self, cell: Cell) -> bool {
        self.snakes.values().any(|snake| snake.occupies(cell))
    }

    /// True once at least one snake exists and none is alive
    pub fn all_dead(&self) -> bool {
        !self.snakes.is_empty() && self.snakes.values().all(|snake| !snake.is_alive())
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn food(&self) -> &FoodItem {
        &self.food
    }

    pub fn snakes(&self) -> &BTreeMap<ParticipantId, GridSnake> {
        &self.snakes
    }

    pub fn snake(&self, id: &ParticipantId) -> Option<&GridSnake> {
        self.snakes.get(id)
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Places `snake` under `id`, replacing any existing one. Used to stage
    /// scenarios.
    pub fn insert_snake(&mut self, id: ParticipantId, snake: GridSnake) {
        self.scoreboard.ensure(&id);
        self.snakes.insert(id, snake);
    }

    /// Puts the food at a fixed item. Used to stage scenarios.
    pub fn set_food(&mut self, food: FoodItem) {
        self.food = food;
    }
}
