//! # Shared Game Library
//!
//! Types and rules used by both the authoritative host and the mirroring
//! clients of the grid snake game.
//!
//! ## Contents
//!
//! ### Simulation primitives
//! - [`grid`]: cells, directions and playfield bounds
//! - [`snake`]: the `GridSnake` movement/growth/collision engine
//! - [`food`]: food items and the rejection-sampling `FoodSpawner`
//! - [`scoreboard`]: per-participant scores and stable display hues
//!
//! ### Session plumbing
//! - [`protocol`]: participant ids, session codes, snapshots and the payload
//!   codec that normalizes legacy encodings at the boundary
//! - [`transport`]: the async `Transport` trait the coordinators talk to
//! - [`relay`]: an in-process `Transport` used by tests and the headless host
//! - [`render`]: the `Renderer` seam
//!
//! ### Ambient
//! - [`config`]: `GameConfig` with validation
//! - [`error`]: the error taxonomy, built on `thiserror`
//!
//! Only the host runs [`snake::GridSnake::advance`] and the food spawner;
//! clients rebuild snakes verbatim from each snapshot with
//! [`snake::GridSnake::from_state`].

pub mod config;
pub mod error;
pub mod food;
pub mod grid;
pub mod protocol;
pub mod relay;
pub mod render;
pub mod scoreboard;
pub mod snake;
pub mod transport;

pub use config::GameConfig;
pub use error::{ConfigError, GridExhausted, ProtocolError, SessionError, TransportError};
pub use food::{FoodItem, FoodKind, FoodSpawner};
pub use grid::{Bounds, Cell, Direction};
pub use protocol::{GameMessage, ParticipantId, SessionCode, SnakeState, Snapshot};
pub use relay::{LocalRelay, LocalTransport};
pub use render::{NullRenderer, Renderer};
pub use scoreboard::{Hue, Scoreboard};
pub use snake::{Advance, DeathCause, GridSnake};
pub use transport::{EventKind, Transport, TransportEvent};

pub const DEFAULT_COLS: i32 = 40;
pub const DEFAULT_ROWS: i32 = 25;
pub const DEFAULT_TICK_MS: u64 = 120;
pub const DEFAULT_MIN_PARTICIPANTS: usize = 2;
pub const DEFAULT_MAX_PARTICIPANTS: usize = 8;
/// Smallest accepted grid side
pub const MIN_GRID_SIDE: i32 = 8;

pub const RARE_FOOD_SCORE_THRESHOLD: u32 = 20;
pub const RARE_FOOD_PROBABILITY: f64 = 0.3;
pub const MAX_PLACEMENT_ATTEMPTS: u32 = 10_000;

/// Hue rotations (degrees) a participant can be assigned
pub const HUE_PALETTE: [u16; 6] = [0, 90, 180, 270, 45, 315];
