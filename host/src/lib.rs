//! # Snake Host Library
//!
//! The authoritative side of a multiplayer grid snake session. One
//! participant's instance hosts: it owns the only simulation, consumes every
//! participant's intents and broadcasts the full game state after each tick.
//! Everyone else mirrors what it sends.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Snakes move one cell per tick. Intents are applied first, then every snake
//! advances, then at most one snake eats the food. Participants are visited
//! in ascending id order, so when two heads reach the food on the same tick
//! the lowest id wins.
//!
//! ### Participant Management
//! Joins, explicit leaves, capacity limits and optional eviction of silent
//! participants. Intents are coalesced per participant; only the most recent
//! one before a tick counts.
//!
//! ### State Broadcasting
//! A complete snapshot goes out after every tick and whenever someone joins.
//! There are no deltas, so a client that misses a snapshot is fully
//! corrected by the next one.
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Event Loop
//! [`network::HostSession::run`] multiplexes transport events, the host
//! player's own intents and frame ticks with `tokio::select!`. All game state
//! is mutated on that one task, so nothing is locked.
//!
//! ### Frame-Gated Ticks
//! The loop is woken every frame; [`scheduler::TickScheduler`] decides
//! whether enough time has passed for a simulation tick. At most one tick
//! runs per frame.
//!
//! ## Module Organization
//!
//! ### Participants Module (`participants`)
//! - Registry of who is in the session
//! - Pending intents, last write wins
//! - Activity tracking and idle eviction
//!
//! ### Game Module (`game`)
//! - Snake map, food item, spawner and scoreboard
//! - The per-tick step and snapshot generation
//!
//! ### Scheduler Module (`scheduler`)
//! - Frame-gated tick timing driven by caller-supplied instants
//!
//! ### Network Module (`network`)
//! - The `Idle → Hosting → Running → Ended` state machine
//! - Transport event handling and snapshot broadcast
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use host::network::HostSession;
//! use shared::{GameConfig, LocalRelay, NullRenderer};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let relay = LocalRelay::new();
//!     let mut session = HostSession::new(
//!         relay.connect(),
//!         Box::new(NullRenderer),
//!         GameConfig::default(),
//!     );
//!
//!     let code = session.host().await?;
//!     println!("Share this code: {}", code);
//!
//!     // Keyboard handling would feed this channel
//!     let (_intents_tx, intents_rx) = mpsc::unbounded_channel();
//!     session.run(intents_rx).await?;
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod network;
pub mod participants;
pub mod scheduler;
