//! Grid snake movement, growth and collision

use crate::grid::{Bounds, Cell, Direction};
use crate::protocol::SnakeState;
use std::collections::VecDeque;

/// Head of a freshly initialised snake
pub const START_HEAD: Cell = Cell::new(5, 5);
/// Direction every freshly initialised snake faces
pub const START_DIRECTION: Direction = Direction::Right;

/// Why a snake stopped moving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCause {
    /// The next head would have left the grid
    Wall,
    /// The next head would have landed on the snake's own body
    SelfCollision,
}

/// Result of a single `advance()` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Moved one cell, length unchanged
    Moved,
    /// Moved one cell and kept the tail, length + 1
    Grew,
    /// Died on this call
    Died(DeathCause),
    /// Already dead, nothing happened
    Inert,
}

/// A snake living on a bounded integer grid.
///
/// The body is stored head first. Direction changes are buffered in
/// `pending_direction` and committed at the start of the next `advance()`,
/// and growth is buffered the same way, so everything a tick does to a snake
/// happens inside `advance()`.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSnake {
    body: VecDeque<Cell>,
    direction: Direction,
    pending_direction: Direction,
    alive: bool,
    pending_growth: bool,
    bounds: Bounds,
}

impl GridSnake {
    /// Creates the default two-cell snake at `(5,5),(4,5)` heading right
    pub fn new(bounds: Bounds) -> Self {
        Self::spawn(START_HEAD, START_DIRECTION, bounds)
    }

    /// Creates a two-cell snake whose tail trails one cell behind `head`
    pub fn spawn(head: Cell, direction: Direction, bounds: Bounds) -> Self {
        let tail = head.step(direction.reverse());
        Self {
            body: VecDeque::from(vec![head, tail]),
            direction,
            pending_direction: direction,
            alive: true,
            pending_growth: false,
            bounds,
        }
    }

    /// Rebuilds a snake verbatim from replicated state.
    ///
    /// No invariant checks are made: a mirror shows whatever the host sent.
    pub fn from_state(body: Vec<Cell>, direction: Direction, alive: bool, bounds: Bounds) -> Self {
        Self {
            body: body.into(),
            direction,
            pending_direction: direction,
            alive,
            pending_growth: false,
            bounds,
        }
    }

    /// Requests a new heading for the next `advance()`.
    ///
    /// Returns `false` and leaves the pending direction untouched when the
    /// intent is the exact reverse of the current direction and the snake is
    /// longer than one cell.
    pub fn set_direction(&mut self, intent: Direction) -> bool {
        if intent == self.direction.reverse() && self.body.len() > 1 {
            return false;
        }
        self.pending_direction = intent;
        true
    }

    /// Moves the snake one cell
    pub fn advance(&mut self) -> Advance {
        if !self.alive {
            return Advance::Inert;
        }

        self.direction = self.pending_direction;
        let Some(&head) = self.body.front() else {
            self.alive = false;
            return Advance::Died(DeathCause::SelfCollision);
        };
        let new_head = head.step(self.direction);

        if !self.bounds.contains(new_head) {
            self.alive = false;
            return Advance::Died(DeathCause::Wall);
        }
        if self.body.contains(&new_head) {
            self.alive = false;
            return Advance::Died(DeathCause::SelfCollision);
        }

        self.body.push_front(new_head);
        if self.pending_growth {
            self.pending_growth = false;
            Advance::Grew
        } else {
            self.body.pop_back();
            Advance::Moved
        }
    }

    /// Schedules one cell of growth for the next `advance()`
    pub fn grow(&mut self) {
        self.pending_growth = true;
    }

    pub fn head(&self) -> Option<Cell> {
        self.body.front().copied()
    }

    pub fn body(&self) -> impl Iterator<Item = Cell> + '_ {
        self.body.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn pending_direction(&self) -> Direction {
        self.pending_direction
    }

    pub fn has_pending_growth(&self) -> bool {
        self.pending_growth
    }

    pub fn occupies(&self, cell: Cell) -> bool {
        self.body.contains(&cell)
    }

    /// Replicated view of the snake as carried in snapshots
    pub fn to_state(&self) -> SnakeState {
        SnakeState {
            body: self.body.iter().copied().collect(),
            direction: self.direction,
            alive: self.alive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: Bounds = Bounds::new(20, 20);

    fn body_of(snake: &GridSnake) -> Vec<Cell> {
        snake.body().collect()
    }

    #[test]
    fn test_initial_snake() {
        let snake = GridSnake::new(BOUNDS);
        assert_eq!(body_of(&snake), vec![Cell::new(5, 5), Cell::new(4, 5)]);
        assert_eq!(snake.direction(), Direction::Right);
        assert!(snake.is_alive());
        assert!(!snake.has_pending_growth());
    }

    #[test]
    fn test_reverse_intent_is_rejected() {
        for direction in Direction::ALL {
            let head = Cell::new(10, 10);
            let mut snake = GridSnake::spawn(head, direction, BOUNDS);
            assert!(!snake.set_direction(direction.reverse()));
            assert_eq!(snake.pending_direction(), direction);

            for other in Direction::ALL {
                if other == direction.reverse() {
                    continue;
                }
                let mut snake = GridSnake::spawn(head, direction, BOUNDS);
                assert!(snake.set_direction(other));
                assert_eq!(snake.pending_direction(), other);
                // committed only on advance
                assert_eq!(snake.direction(), direction);
            }
        }
    }

    #[test]
    fn test_reverse_allowed_for_single_cell() {
        let mut snake =
            GridSnake::from_state(vec![Cell::new(3, 3)], Direction::Right, true, BOUNDS);
        assert!(snake.set_direction(Direction::Left));
        assert_eq!(snake.advance(), Advance::Moved);
        assert_eq!(snake.head(), Some(Cell::new(2, 3)));
    }

    #[test]
    fn test_reverse_checked_against_committed_direction() {
        let mut snake = GridSnake::new(BOUNDS);
        assert!(snake.set_direction(Direction::Up));
        // still heading right until the next advance
        assert!(!snake.set_direction(Direction::Left));
        assert_eq!(snake.pending_direction(), Direction::Up);
    }

    #[test]
    fn test_advance_preserves_length() {
        let mut snake = GridSnake::new(BOUNDS);
        for step in 1..=5 {
            assert_eq!(snake.advance(), Advance::Moved);
            assert_eq!(snake.len(), 2);
            assert_eq!(snake.head(), Some(Cell::new(5 + step, 5)));
        }
    }

    #[test]
    fn test_growth_applies_on_next_advance_only() {
        let mut snake = GridSnake::new(BOUNDS);
        snake.grow();
        assert_eq!(snake.len(), 2);
        assert_eq!(snake.advance(), Advance::Grew);
        assert_eq!(snake.len(), 3);
        assert_eq!(
            body_of(&snake),
            vec![Cell::new(6, 5), Cell::new(5, 5), Cell::new(4, 5)]
        );
        for _ in 0..3 {
            assert_eq!(snake.advance(), Advance::Moved);
            assert_eq!(snake.len(), 3);
        }
    }

    #[test]
    fn test_wall_collision_is_terminal() {
        let mut snake = GridSnake::spawn(Cell::new(19, 0), Direction::Right, BOUNDS);
        assert_eq!(snake.advance(), Advance::Died(DeathCause::Wall));
        assert!(!snake.is_alive());
        let frozen = body_of(&snake);
        for _ in 0..3 {
            assert_eq!(snake.advance(), Advance::Inert);
        }
        assert_eq!(body_of(&snake), frozen);
    }

    #[test]
    fn test_wall_collision_every_edge() {
        let cases = [
            (Cell::new(0, 5), Direction::Left),
            (Cell::new(5, 0), Direction::Up),
            (Cell::new(19, 5), Direction::Right),
            (Cell::new(5, 19), Direction::Down),
        ];
        for (head, direction) in cases {
            let mut snake = GridSnake::spawn(head, direction, BOUNDS);
            assert_eq!(snake.advance(), Advance::Died(DeathCause::Wall));
        }
    }

    #[test]
    fn test_self_collision() {
        // head at (5,5) heading up into its own body at (5,4)
        let body = vec![
            Cell::new(5, 5),
            Cell::new(6, 5),
            Cell::new(6, 4),
            Cell::new(5, 4),
            Cell::new(4, 4),
        ];
        let mut snake = GridSnake::from_state(body, Direction::Left, true, BOUNDS);
        assert!(snake.set_direction(Direction::Up));
        assert_eq!(snake.advance(), Advance::Died(DeathCause::SelfCollision));
        assert!(!snake.is_alive());
    }

    #[test]
    fn test_moving_onto_tail_is_fatal() {
        // the tail at (5,4) would move away this tick, it still counts
        let body = vec![
            Cell::new(5, 5),
            Cell::new(6, 5),
            Cell::new(6, 4),
            Cell::new(5, 4),
        ];
        let mut snake = GridSnake::from_state(body.clone(), Direction::Left, true, BOUNDS);
        assert!(snake.set_direction(Direction::Up));
        assert_eq!(snake.advance(), Advance::Died(DeathCause::SelfCollision));
        assert_eq!(snake.body().collect::<Vec<_>>(), body);
    }

    #[test]
    fn test_dead_snake_ignores_growth() {
        let mut snake = GridSnake::spawn(Cell::new(0, 0), Direction::Left, BOUNDS);
        snake.advance();
        snake.grow();
        assert_eq!(snake.advance(), Advance::Inert);
        assert_eq!(snake.len(), 2);
    }

    #[test]
    fn test_to_state_matches_body() {
        let snake = GridSnake::new(BOUNDS);
        let state = snake.to_state();
        assert_eq!(state.body, vec![Cell::new(5, 5), Cell::new(4, 5)]);
        assert_eq!(state.direction, Direction::Right);
        assert!(state.alive);
    }
}
