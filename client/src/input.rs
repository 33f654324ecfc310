//! Mapping raw device input to directional intents

use shared::Direction;

/// Shortest swipe, in pixels along the dominant axis, that counts as a turn
pub const MIN_SWIPE_DISTANCE: f32 = 20.0;

/// Arrow keys and WASD, case-insensitive. Anything else is not an intent.
pub fn intent_from_key(key: &str) -> Option<Direction> {
    match key.to_ascii_lowercase().as_str() {
        "arrowup" | "up" | "w" => Some(Direction::Up),
        "arrowdown" | "down" | "s" => Some(Direction::Down),
        "arrowleft" | "left" | "a" => Some(Direction::Left),
        "arrowright" | "right" | "d" => Some(Direction::Right),
        _ => None,
    }
}

/// Turns a touch swipe vector into an intent along its dominant axis.
///
/// Screen coordinates: positive `dy` is downward. Swipes shorter than
/// [`MIN_SWIPE_DISTANCE`] are ignored.
pub fn intent_from_swipe(dx: f32, dy: f32) -> Option<Direction> {
    if dx.abs().max(dy.abs()) < MIN_SWIPE_DISTANCE {
        return None;
    }
    if dx.abs() > dy.abs() {
        Some(if dx > 0.0 {
            Direction::Right
        } else {
            Direction::Left
        })
    } else {
        Some(if dy > 0.0 {
            Direction::Down
        } else {
            Direction::Up
        })
    }
}
