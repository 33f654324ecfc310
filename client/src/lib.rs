//! # Snake Client Library
//!
//! The passive side of a multiplayer grid snake session. A client never
//! simulates: it forwards its player's intents to the host and shows exactly
//! what the latest host snapshot says.
//!
//! ## Architecture Overview
//!
//! ### Full-State Mirroring
//! Every snapshot carries the complete game, so applying one replaces the
//! mirrored snakes, food and scores wholesale. Participants the client has
//! never heard of simply appear; a missed snapshot is corrected by the next.
//!
//! ### Unordered Delivery
//! The transport makes no ordering promises. Snapshots carry the host tick
//! and the mirror drops any snapshot older than the one it already shows.
//!
//! ### No Prediction
//! Intents go out immediately and uncoalesced, and the local snake only
//! turns once the host's snapshot says so.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! - `MirrorState`, rebuilt from each snapshot
//! - Stale snapshot rejection
//!
//! ### Input Module (`input`)
//! - Key names and swipe vectors to directional intents
//!
//! ### Network Module (`network`)
//! - The `Idle → Joining → Mirroring → Running → Ended` state machine
//! - Session code validation before any network call
//! - The `tokio::select!` run loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::ClientSession;
//! use shared::{Bounds, LocalRelay, NullRenderer};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let relay = LocalRelay::new();
//!     let mut session = ClientSession::new(
//!         relay.connect(),
//!         Box::new(NullRenderer),
//!         Bounds::new(40, 25),
//!     );
//!
//!     session.join("AB12CD").await?;
//!
//!     let (intents_tx, intents_rx) = mpsc::unbounded_channel();
//!     if let Some(direction) = client::input::intent_from_key("ArrowUp") {
//!         intents_tx.send(direction)?;
//!     }
//!     session.run(intents_rx).await?;
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod input;
pub mod network;
