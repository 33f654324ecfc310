//! Application payloads carried inside transport "game" events.
//!
//! Every payload is normalized here, at the boundary, into [`GameMessage`].
//! Two historical encodings exist alongside the canonical tagged one: bare
//! direction vectors / `{"input": ..}` objects for inputs, and `type`-tagged
//! or untagged state objects with vector directions and bare food
//! positions. [`decode`] accepts all of them; [`encode`] only ever emits the
//! canonical form.

use crate::error::{ProtocolError, SessionError};
use crate::food::{FoodItem, FoodKind};
use crate::grid::{Cell, Direction};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

/// Longest session code accepted by [`SessionCode::parse`]
pub const MAX_SESSION_CODE_LEN: usize = 64;

/// Opaque participant identifier assigned by the transport
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ParticipantId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for ParticipantId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl Borrow<str> for ParticipantId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Host-assigned code shared out of band so others can join
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCode(String);

impl SessionCode {
    /// Validates user-supplied input before it reaches the network.
    ///
    /// Surrounding whitespace is trimmed; the rest must be 1 to
    /// [`MAX_SESSION_CODE_LEN`] ASCII alphanumerics, `-` or `_`.
    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        let code = raw.trim();
        let well_formed = !code.is_empty()
            && code.len() <= MAX_SESSION_CODE_LEN
            && code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !well_formed {
            return Err(SessionError::InvalidSessionCode(raw.to_string()));
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Replicated state of one snake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnakeState {
    pub body: Vec<Cell>,
    pub direction: Direction,
    #[serde(default = "default_alive")]
    pub alive: bool,
}

fn default_alive() -> bool {
    true
}

/// Complete authoritative game state, sent by the host every tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub tick: u64,
    pub snakes: BTreeMap<ParticipantId, SnakeState>,
    pub food: FoodItem,
    #[serde(default)]
    pub scores: BTreeMap<ParticipantId, u32>,
}

/// Canonical application message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameMessage {
    /// Client → host directional intent
    Input { direction: Direction },
    /// Host → clients full snapshot
    State(Snapshot),
}

/// Serializes a message in the canonical tagged form
pub fn encode(message: &GameMessage) -> Result<Value, ProtocolError> {
    Ok(serde_json::to_value(message)?)
}

/// Normalizes any known payload encoding into a [`GameMessage`]
pub fn decode(payload: &Value) -> Result<GameMessage, ProtocolError> {
    if let Some(kind) = payload.get("kind").and_then(Value::as_str) {
        return match kind {
            "input" => {
                let direction = payload.get("direction").ok_or(ProtocolError::Unrecognized)?;
                Ok(GameMessage::Input {
                    direction: decode_direction(direction)?,
                })
            }
            "state" => decode_state(payload),
            other => Err(ProtocolError::UnknownKind(other.to_string())),
        };
    }

    if let Some(kind) = payload.get("type").and_then(Value::as_str) {
        return match kind {
            "state" => decode_state(payload),
            other => Err(ProtocolError::UnknownKind(other.to_string())),
        };
    }

    if let Some(input) = payload.get("input") {
        return Ok(GameMessage::Input {
            direction: decode_direction(input)?,
        });
    }

    if payload.get("snakes").is_some() {
        return decode_state(payload);
    }

    if payload.is_string() || (payload.get("x").is_some() && payload.get("y").is_some()) {
        return Ok(GameMessage::Input {
            direction: decode_direction(payload)?,
        });
    }

    Err(ProtocolError::Unrecognized)
}

/// Direction as a name or as a unit vector
#[derive(Deserialize)]
#[serde(untagged)]
enum WireDirection {
    Named(String),
    Vector { x: i32, y: i32 },
}

impl TryFrom<WireDirection> for Direction {
    type Error = ProtocolError;

    fn try_from(wire: WireDirection) -> Result<Self, Self::Error> {
        match wire {
            WireDirection::Named(name) => Direction::parse(&name.to_ascii_lowercase())
                .ok_or(ProtocolError::InvalidDirection(name)),
            WireDirection::Vector { x, y } => Direction::from_vector(x, y)
                .ok_or_else(|| ProtocolError::InvalidDirection(format!("({x}, {y})"))),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireFood {
    Item {
        position: Cell,
        #[serde(rename = "type", alias = "kind", default)]
        kind: FoodKind,
    },
    Bare(Cell),
}

#[derive(Deserialize)]
struct WireSnake {
    body: Vec<Cell>,
    direction: WireDirection,
    #[serde(default = "default_alive")]
    alive: bool,
}

#[derive(Deserialize)]
struct WireState {
    #[serde(default)]
    tick: u64,
    snakes: BTreeMap<ParticipantId, WireSnake>,
    food: WireFood,
    #[serde(default)]
    scores: Option<BTreeMap<ParticipantId, u32>>,
}

fn decode_direction(value: &Value) -> Result<Direction, ProtocolError> {
    let wire: WireDirection = serde_json::from_value(value.clone())
        .map_err(|_| ProtocolError::InvalidDirection(value.to_string()))?;
    Direction::try_from(wire)
}

fn decode_state(payload: &Value) -> Result<GameMessage, ProtocolError> {
    let wire: WireState = serde_json::from_value(payload.clone())?;

    let mut snakes = BTreeMap::new();
    for (id, snake) in wire.snakes {
        snakes.insert(
            id,
            SnakeState {
                body: snake.body,
                direction: Direction::try_from(snake.direction)?,
                alive: snake.alive,
            },
        );
    }

    let food = match wire.food {
        WireFood::Item { position, kind } => FoodItem::new(position, kind),
        WireFood::Bare(position) => FoodItem::new(position, FoodKind::Normal),
    };

    Ok(GameMessage::State(Snapshot {
        tick: wire.tick,
        snakes,
        food,
        scores: wire.scores.unwrap_or_default(),
    }))
}
