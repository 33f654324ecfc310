//! Drawing seam. Coordinators hand the renderer read-only views of the game
//! state once per frame; what happens on screen is up to the implementor.

use crate::food::FoodItem;
use crate::protocol::ParticipantId;
use crate::snake::GridSnake;
use std::collections::BTreeMap;

pub trait Renderer: Send {
    /// Draws one frame. `food` is `None` until the first food item exists
    /// (a client that has not yet applied a snapshot).
    fn draw(
        &mut self,
        snakes: &BTreeMap<ParticipantId, GridSnake>,
        food: Option<&FoodItem>,
        local: &ParticipantId,
    );
}

/// Renderer that draws nothing, for headless hosts and tests
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn draw(
        &mut self,
        _snakes: &BTreeMap<ParticipantId, GridSnake>,
        _food: Option<&FoodItem>,
        _local: &ParticipantId,
    ) {
    }
}
