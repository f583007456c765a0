//! Entity handles, world coordinates, and screen geometry
//!
//! An [`Entity`] is an opaque handle to a world object or NPC as delivered by
//! spawn notifications. Identity is the pair of instance handle and concrete
//! kind: the same numeric object id can be delivered under several concrete
//! representations, and each representation despawns on its own schedule.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Instance handle assigned by the event source to one live object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityHandle(pub u64);

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Concrete client representation of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// Regular scene object
    GameObject,
    /// Flat object lying on a tile
    GroundObject,
    /// Object attached to a tile edge
    WallObject,
    /// Decoration attached to a wall
    DecorativeObject,
    /// Non-player character
    Npc,
}

/// Id namespace an entity's numeric id belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Scene object ids (every tile-object kind)
    Object,
    /// NPC ids
    Npc,
}

impl ObjectKind {
    /// Namespace used to resolve this kind's numeric ids
    pub fn namespace(self) -> Namespace {
        match self {
            ObjectKind::Npc => Namespace::Npc,
            _ => Namespace::Object,
        }
    }

    /// Whether this kind is one of the tile-bound object kinds
    pub fn is_tile_object(self) -> bool {
        !matches!(self, ObjectKind::Npc)
    }
}

/// Tile coordinate in world space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldPoint {
    /// West-east coordinate
    pub x: i32,
    /// South-north coordinate
    pub y: i32,
    /// Height level
    pub plane: i32,
}

impl WorldPoint {
    /// Create a new world point
    pub fn new(x: i32, y: i32, plane: i32) -> Self {
        Self { x, y, plane }
    }

    /// Chebyshev tile distance, or `None` when the points are on different planes
    pub fn distance_to(&self, other: &WorldPoint) -> Option<u32> {
        if self.plane != other.plane {
            return None;
        }
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        Some(dx.max(dy))
    }

    /// Whether both points denote the same tile
    pub fn same_tile(&self, other: &WorldPoint) -> bool {
        self.distance_to(other) == Some(0)
    }
}

/// Pixel coordinate relative to the game canvas (or to the screen, for origins)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanvasPoint {
    /// Horizontal pixel
    pub x: i32,
    /// Vertical pixel
    pub y: i32,
}

impl CanvasPoint {
    /// Create a new canvas point
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned pixel rectangle on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasRect {
    /// Left edge
    pub x: i32,
    /// Top edge
    pub y: i32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Pixel extent as a signed offset, clamped to `i32::MAX`
fn span(len: u32) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

impl CanvasRect {
    /// Integer center of the rectangle
    pub fn center(&self) -> CanvasPoint {
        CanvasPoint::new(
            self.x.saturating_add(span(self.width / 2)),
            self.y.saturating_add(span(self.height / 2)),
        )
    }

    /// Whether the rectangle covers no pixels
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// On-screen clickable outline of an entity, as a polygon in canvas space
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScreenShape {
    /// Polygon vertices in order
    pub points: Vec<CanvasPoint>,
}

impl ScreenShape {
    /// Create a shape from its vertices
    pub fn new(points: Vec<CanvasPoint>) -> Self {
        Self { points }
    }

    /// Shape covering an axis-aligned rectangle
    pub fn from_rect(rect: CanvasRect) -> Self {
        let right = rect.x.saturating_add(span(rect.width));
        let bottom = rect.y.saturating_add(span(rect.height));
        Self::new(vec![
            CanvasPoint::new(rect.x, rect.y),
            CanvasPoint::new(right, rect.y),
            CanvasPoint::new(right, bottom),
            CanvasPoint::new(rect.x, bottom),
        ])
    }

    /// Bounding box of all vertices
    pub fn bounds(&self) -> Option<CanvasRect> {
        let first = self.points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &self.points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(CanvasRect {
            x: min_x,
            y: min_y,
            width: min_x.abs_diff(max_x),
            height: min_y.abs_diff(max_y),
        })
    }

    /// Area centroid of the polygon
    ///
    /// Falls back to the bounding-box center for degenerate outlines (fewer
    /// than three vertices or zero area).
    pub fn centroid(&self) -> Option<CanvasPoint> {
        let bounds = self.bounds()?;
        if self.points.len() < 3 {
            return Some(bounds.center());
        }

        let mut twice_area = 0.0f64;
        let mut cx = 0.0f64;
        let mut cy = 0.0f64;
        let n = self.points.len();
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            let cross = f64::from(a.x) * f64::from(b.y) - f64::from(b.x) * f64::from(a.y);
            twice_area += cross;
            cx += (f64::from(a.x) + f64::from(b.x)) * cross;
            cy += (f64::from(a.y) + f64::from(b.y)) * cross;
        }

        if twice_area.abs() < f64::EPSILON {
            return Some(bounds.center());
        }

        let factor = 1.0 / (3.0 * twice_area);
        Some(CanvasPoint::new(
            (cx * factor).round() as i32,
            (cy * factor).round() as i32,
        ))
    }
}

/// A live world object or NPC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Instance handle
    pub handle: EntityHandle,
    /// Numeric object or NPC id (selects the role)
    pub id: u32,
    /// Concrete representation
    pub kind: ObjectKind,
    /// Display name, when the source resolved one
    #[serde(default)]
    pub name: Option<String>,
    /// World tile
    pub position: WorldPoint,
    /// Current on-screen outline, if rendered
    #[serde(default)]
    pub shape: Option<ScreenShape>,
    /// Current animation id, if animating
    #[serde(default)]
    pub animation: Option<u32>,
}

impl Entity {
    /// Create an entity with no name, geometry, or animation
    pub fn new(handle: EntityHandle, id: u32, kind: ObjectKind, position: WorldPoint) -> Self {
        Self {
            handle,
            id,
            kind,
            name: None,
            position,
            shape: None,
            animation: None,
        }
    }

    /// Attach a display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach an on-screen outline
    pub fn with_shape(mut self, shape: ScreenShape) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Whether `other` denotes the same live instance (handle and representation)
    pub fn same_instance(&self, other: &Entity) -> bool {
        self.handle == other.handle && self.kind == other.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_is_chebyshev_and_plane_aware() {
        let a = WorldPoint::new(3600, 9500, 0);
        assert_eq!(a.distance_to(&WorldPoint::new(3603, 9501, 0)), Some(3));
        assert_eq!(a.distance_to(&WorldPoint::new(3589, 9500, 0)), Some(11));
        assert_eq!(a.distance_to(&WorldPoint::new(3600, 9500, 1)), None);
        assert!(a.same_tile(&WorldPoint::new(3600, 9500, 0)));
    }

    #[test]
    fn test_rect_centroid_matches_center() {
        let shape = ScreenShape::from_rect(CanvasRect {
            x: 10,
            y: 20,
            width: 40,
            height: 30,
        });
        assert_eq!(shape.centroid(), Some(CanvasPoint::new(30, 35)));
        let bounds = shape.bounds().unwrap();
        assert_eq!((bounds.width, bounds.height), (40, 30));
    }

    #[test]
    fn test_extreme_rect_saturates() {
        let rect = CanvasRect {
            x: i32::MAX - 10,
            y: 0,
            width: u32::MAX,
            height: 40,
        };
        assert_eq!(rect.center(), CanvasPoint::new(i32::MAX, 20));

        let shape = ScreenShape::from_rect(rect);
        let bounds = shape.bounds().unwrap();
        assert_eq!(bounds.width, 10);
        assert_eq!(bounds.height, 40);
    }

    #[test]
    fn test_degenerate_shape_uses_bounds_center() {
        let line = ScreenShape::new(vec![CanvasPoint::new(0, 0), CanvasPoint::new(10, 0)]);
        assert_eq!(line.centroid(), Some(CanvasPoint::new(5, 0)));
        assert_eq!(ScreenShape::default().centroid(), None);
    }

    #[test]
    fn test_identity_includes_kind() {
        let pos = WorldPoint::new(1, 1, 0);
        let wall = Entity::new(EntityHandle(7), 43724, ObjectKind::WallObject, pos);
        let deco = Entity::new(EntityHandle(7), 43724, ObjectKind::DecorativeObject, pos);
        assert!(wall.same_instance(&wall.clone()));
        assert!(!wall.same_instance(&deco));
    }
}
