//! Inbound event stream
//!
//! Everything the runtime learns arrives as a [`WorldEvent`], delivered in
//! order on one sequencing thread. Events are plain serde data so a recorded
//! stream can be replayed as newline-delimited JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::{CanvasPoint, CanvasRect, Entity, WorldPoint};
use super::error::{EventError, EventResult};
use super::tracker::EntityFrame;

/// Client connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    /// At the login screen
    LoginScreen,
    /// Loading a new region
    Loading,
    /// In game
    #[default]
    LoggedIn,
    /// Any other client state
    Other,
}

/// Item container an inventory notification refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerId {
    /// The player's inventory
    #[default]
    Inventory,
    /// Worn equipment
    Equipment,
    /// Bank
    Bank,
}

/// One item stack in a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Item id (non-positive ids denote empty slots)
    pub id: i32,
    /// Stack size
    pub quantity: u32,
}

impl Item {
    /// Item id if the slot is occupied
    pub fn occupied_id(&self) -> Option<u32> {
        u32::try_from(self.id).ok().filter(|id| *id > 0)
    }
}

/// Chat channel of a game message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    /// Game message
    GameMessage,
    /// Filterable spam message
    Spam,
    /// Anything else (public chat, clan chat, ...)
    Other,
}

impl ChatKind {
    /// Whether the game itself produced the message
    pub fn is_game(self) -> bool {
        matches!(self, ChatKind::GameMessage | ChatKind::Spam)
    }
}

/// State of one HUD widget
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Widget {
    /// Whether the widget is hidden
    #[serde(default)]
    pub hidden: bool,
    /// Displayed text
    #[serde(default)]
    pub text: Option<String>,
    /// Displayed sprite
    #[serde(default)]
    pub sprite_id: Option<u32>,
}

impl Widget {
    /// Visible widget showing `text`
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Visible widget showing `sprite_id`
    pub fn sprite(sprite_id: u32) -> Self {
        Self {
            sprite_id: Some(sprite_id),
            ..Self::default()
        }
    }
}

/// Minigame HUD widgets; `None` means the widget does not exist this step
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HudWidgets {
    /// Parent HUD container (present only inside the minigame)
    pub hud: Option<Widget>,
    /// Elemental rune indicator
    pub elemental_rune: Option<Widget>,
    /// Catalytic rune indicator
    pub catalytic_rune: Option<Widget>,
    /// Guardian count ("n/10")
    pub guardian_count: Option<Widget>,
    /// Portal location text ("S 20s" ...)
    pub portal_text: Option<Widget>,
    /// Guardian energy ("Guardian's power: 42%")
    pub guardian_energy: Option<Widget>,
    /// Open NPC/object dialog message
    pub dialog: Option<Widget>,
}

/// Inventory slot widget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySlot {
    /// Item id
    pub item_id: u32,
    /// Item name as displayed
    #[serde(default)]
    pub name: String,
    /// Stack size
    pub quantity: u32,
    /// Slot bounds on the canvas
    #[serde(default)]
    pub bounds: Option<CanvasRect>,
    /// Whether the slot is hidden
    #[serde(default)]
    pub hidden: bool,
}

/// Player facts produced by the player collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Current tile
    pub position: WorldPoint,
    /// Current animation
    #[serde(default)]
    pub animation: Option<u32>,
    /// Hitpoints
    #[serde(default)]
    pub health: Option<u32>,
    /// Run energy in percent
    #[serde(default)]
    pub run_energy: Option<u32>,
}

/// Everything sampled once per simulation step
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StepInput {
    /// Client state
    pub game_state: GameState,
    /// Loaded map regions
    pub map_regions: Vec<u32>,
    /// Local player, if present
    pub player: Option<PlayerSnapshot>,
    /// Screen position of the canvas, if the surface is realized
    pub canvas_origin: Option<CanvasPoint>,
    /// Rendering data for live entities
    pub frames: Vec<EntityFrame>,
    /// HUD widget states
    pub widgets: HudWidgets,
    /// Inventory slot widgets
    pub inventory_slots: Vec<InventorySlot>,
}

/// One inbound notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorldEvent {
    /// An entity appeared
    Spawned {
        /// The entity
        entity: Entity,
    },
    /// An entity disappeared
    Despawned {
        /// The entity
        entity: Entity,
    },
    /// A container's contents changed
    InventoryChanged {
        /// Container
        #[serde(default)]
        container: ContainerId,
        /// Full slot list
        items: Vec<Item>,
    },
    /// A chat line was received
    ChatMessage {
        /// Channel
        kind: ChatKind,
        /// Raw text
        message: String,
    },
    /// A menu option was clicked
    MenuOptionClicked {
        /// Item the option acted on
        #[serde(default)]
        item_id: Option<u32>,
        /// Option text
        option: String,
    },
    /// The client changed state
    GameStateChanged {
        /// New state
        state: GameState,
    },
    /// A varbit changed
    VarbitChanged {
        /// Varbit id
        varbit: u32,
        /// New value
        value: i32,
    },
    /// One simulation step elapsed
    Step(StepInput),
}

/// A recorded event with an optional timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// When the event happened; the replay time is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<DateTime<Utc>>,
    /// The event
    #[serde(flatten)]
    pub event: WorldEvent,
}

impl EventEnvelope {
    /// Decode one NDJSON line
    pub fn parse(line: &str) -> EventResult<Self> {
        serde_json::from_str(line).map_err(|source| EventError::Decode {
            line: truncate(line, 80),
            source,
        })
    }
}

fn truncate(line: &str, max: usize) -> String {
    match line.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &line[..idx]),
        None => line.to_string(),
    }
}
