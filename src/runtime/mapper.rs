//! World-to-screen target mapping
//!
//! Converts entities and inventory slots into flat [`TargetPoint`] records.
//! Screen geometry is best-effort: without an outline the point has no
//! clickable fields, and without the canvas origin it has no absolute screen
//! fields. Neither case is an error.

use serde::{Deserialize, Serialize};

use super::catalog::Role;
use super::entity::{CanvasPoint, CanvasRect, Entity, WorldPoint};

/// Reportable representation of an entity or item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetPoint {
    /// Object, NPC, or item id
    pub id: u32,
    /// Display name
    pub name: String,
    /// Stack size, for items
    pub quantity: Option<u32>,
    /// World tile x
    pub world_x: i32,
    /// World tile y
    pub world_y: i32,
    /// World plane
    pub plane: i32,
    /// Clickable point relative to the canvas
    pub canvas_x: Option<i32>,
    /// Clickable point relative to the canvas
    pub canvas_y: Option<i32>,
    /// Clickable point in absolute screen pixels
    pub screen_x: Option<i32>,
    /// Clickable point in absolute screen pixels
    pub screen_y: Option<i32>,
    /// Outline width
    pub width: Option<u32>,
    /// Outline height
    pub height: Option<u32>,
    /// Tile distance from the player
    pub distance_to_player: Option<u32>,
}

impl TargetPoint {
    /// Whether the point currently has a clickable location
    pub fn is_clickable(&self) -> bool {
        self.canvas_x.is_some() && self.canvas_y.is_some()
    }
}

/// Inventory slot with its clickable location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotPoint {
    /// Item id
    pub item_id: u32,
    /// Item name
    pub name: String,
    /// Stack size
    pub quantity: u32,
    /// Slot center relative to the canvas
    pub canvas_x: i32,
    /// Slot center relative to the canvas
    pub canvas_y: i32,
    /// Slot center in absolute screen pixels
    pub screen_x: Option<i32>,
    /// Slot center in absolute screen pixels
    pub screen_y: Option<i32>,
    /// Slot width
    pub width: u32,
    /// Slot height
    pub height: u32,
}

/// Per-step inputs shared by every mapping
#[derive(Debug, Clone, Copy, Default)]
pub struct MapContext {
    /// Player tile, if known
    pub player: Option<WorldPoint>,
    /// Screen position of the canvas's top-left corner, if the surface is realized
    pub canvas_origin: Option<CanvasPoint>,
}

impl MapContext {
    fn to_screen(&self, point: CanvasPoint) -> (Option<i32>, Option<i32>) {
        match self.canvas_origin {
            Some(origin) => (
                Some(origin.x.saturating_add(point.x)),
                Some(origin.y.saturating_add(point.y)),
            ),
            None => (None, None),
        }
    }
}

/// Map an entity held in `role`
pub fn map_entity(entity: &Entity, role: Role, ctx: &MapContext) -> TargetPoint {
    let name = entity
        .name
        .clone()
        .unwrap_or_else(|| role.label().to_string());

    let clickable = entity
        .shape
        .as_ref()
        .and_then(|shape| Some((shape.centroid()?, shape.bounds()?)));

    let (canvas_x, canvas_y, screen_x, screen_y, width, height) = match clickable {
        Some((center, bounds)) => {
            let (sx, sy) = ctx.to_screen(center);
            (
                Some(center.x),
                Some(center.y),
                sx,
                sy,
                Some(bounds.width),
                Some(bounds.height),
            )
        }
        None => (None, None, None, None, None, None),
    };

    TargetPoint {
        id: entity.id,
        name,
        quantity: None,
        world_x: entity.position.x,
        world_y: entity.position.y,
        plane: entity.position.plane,
        canvas_x,
        canvas_y,
        screen_x,
        screen_y,
        width,
        height,
        distance_to_player: ctx
            .player
            .and_then(|player| player.distance_to(&entity.position)),
    }
}

/// Map an optional slot holder
pub fn map_slot(entity: Option<&Entity>, role: Role, ctx: &MapContext) -> Option<TargetPoint> {
    entity.map(|e| map_entity(e, role, ctx))
}

/// Map an inventory slot widget; `None` when it has no usable bounds
pub fn map_inventory_slot(
    item_id: u32,
    name: &str,
    quantity: u32,
    bounds: Option<CanvasRect>,
    ctx: &MapContext,
) -> Option<SlotPoint> {
    let bounds = bounds.filter(|b| !b.is_empty())?;
    let center = bounds.center();
    let (screen_x, screen_y) = ctx.to_screen(center);
    Some(SlotPoint {
        item_id,
        name: name.to_string(),
        quantity,
        canvas_x: center.x,
        canvas_y: center.y,
        screen_x,
        screen_y,
        width: bounds.width,
        height: bounds.height,
    })
}
