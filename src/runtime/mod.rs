//! Runtime orchestrator and public API
//!
//! The [`Runtime`] owns every piece of tracked state and is driven from a
//! single sequencing thread: one [`WorldEvent`] at a time, with a snapshot
//! built and published at the end of every step. Only the
//! [`SnapshotPublisher`] it hands out is shared with other threads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub mod catalog;
pub mod entity;
pub mod error;
pub mod event;
pub mod inventory;
pub mod mapper;
pub mod phase;
pub mod pouch;
pub mod publisher;
pub mod snapshot;
pub mod tracker;

use catalog::{GUARDIAN_ACTIVE_ANIMATION, MINIGAME_MAIN_REGION};
use entity::{Entity, WorldPoint};
use error::{ConfigError, ConfigResult};
use event::{ChatKind, ContainerId, GameState, Item, StepInput, WorldEvent};
use inventory::InventoryState;
use phase::PhaseTracker;
use pouch::{DEFAULT_POUCH_CAPACITY, EssencePouch, PouchAction};
use publisher::SnapshotPublisher;
use snapshot::{BuildContext, DEFAULT_RETURN_PORTAL_MAX_DISTANCE, Snapshot, SnapshotBuilder};
use tracker::EntityTracker;

/// Chat line sent when an empty pouch is emptied
const POUCH_EMPTY_MESSAGE: &str = "There is no essence in this pouch";

/// Configuration for the riftwatch runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Address the snapshot listener binds to
    pub bind_address: String,

    /// Port the snapshot listener binds to
    pub port: u16,

    /// Distance beyond which a return portal is reported absent
    pub return_portal_max_distance: u32,

    /// Colossal pouch capacity in essence
    pub pouch_capacity: u32,

    /// Animation id marking a guardian as active
    pub active_guardian_animation: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8765,
            return_portal_max_distance: DEFAULT_RETURN_PORTAL_MAX_DISTANCE,
            pouch_capacity: DEFAULT_POUCH_CAPACITY,
            active_guardian_animation: GUARDIAN_ACTIVE_ANIMATION,
        }
    }
}

impl RuntimeConfig {
    /// Load a configuration file; missing fields take their defaults
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> ConfigResult<()> {
        if self.pouch_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "pouch_capacity",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.bind_address.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "bind_address",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// The main runtime orchestrator
///
/// Not safe for concurrent mutation; share [`Runtime::publisher`] instead.
#[derive(Debug)]
pub struct Runtime {
    config: RuntimeConfig,
    tracker: EntityTracker,
    pouch: EssencePouch,
    phase: PhaseTracker,
    inventory: InventoryState,
    contents: InventoryState,
    builder: SnapshotBuilder,
    publisher: SnapshotPublisher,
    seq: u64,
    in_minigame: bool,
    in_main_region: bool,
    last_player_position: Option<WorldPoint>,
}

impl Runtime {
    /// Create a runtime with a fresh publisher
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_publisher(config, SnapshotPublisher::new())
    }

    /// Create a runtime publishing into `publisher`
    pub fn with_publisher(config: RuntimeConfig, publisher: SnapshotPublisher) -> Self {
        Self {
            tracker: EntityTracker::new(),
            pouch: EssencePouch::new(config.pouch_capacity),
            phase: PhaseTracker::new(),
            inventory: InventoryState::default(),
            contents: InventoryState::default(),
            builder: SnapshotBuilder::new(config.return_portal_max_distance),
            publisher,
            seq: 0,
            in_minigame: false,
            in_main_region: false,
            last_player_position: None,
            config,
        }
    }

    /// Get the current configuration
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Handle on the latest-snapshot channel
    pub fn publisher(&self) -> &SnapshotPublisher {
        &self.publisher
    }

    /// Entity slots
    pub fn tracker(&self) -> &EntityTracker {
        &self.tracker
    }

    /// Pouch inference state
    pub fn pouch(&self) -> &EssencePouch {
        &self.pouch
    }

    /// Phase state
    pub fn phase(&self) -> &PhaseTracker {
        &self.phase
    }

    /// Inventory facts accepted while minigame signals are enabled
    pub fn inventory(&self) -> &InventoryState {
        &self.inventory
    }

    /// Latest inventory listing, regardless of gating
    pub fn contents(&self) -> &InventoryState {
        &self.contents
    }

    /// Whether minigame signals are currently accepted
    fn signals_enabled(&self) -> bool {
        self.in_minigame || self.in_main_region
    }

    /// Process one event; a step returns the snapshot it published
    pub fn handle(&mut self, event: WorldEvent, now: DateTime<Utc>) -> Option<Arc<Snapshot>> {
        match event {
            WorldEvent::Spawned { entity } => {
                self.on_spawn(entity);
            }
            WorldEvent::Despawned { entity } => {
                self.on_despawn(&entity);
            }
            WorldEvent::InventoryChanged { container, items } => {
                self.on_inventory_changed(container, &items);
            }
            WorldEvent::ChatMessage { kind, message } => self.on_chat(kind, &message, now),
            WorldEvent::MenuOptionClicked { item_id, option } => {
                self.on_menu_option(item_id, &option);
            }
            WorldEvent::GameStateChanged { state } => self.on_game_state(state),
            WorldEvent::VarbitChanged { varbit, value } => {
                if self.signals_enabled() {
                    self.phase.observe_varbit(varbit, value);
                }
            }
            WorldEvent::Step(input) => return Some(self.step(&input, now)),
        }
        None
    }

    /// Record a spawn; returns whether the entity was tracked
    pub fn on_spawn(&mut self, entity: Entity) -> bool {
        self.tracker.on_spawn(entity).is_some()
    }

    /// Record a despawn; returns whether a tracked entity was removed
    pub fn on_despawn(&mut self, entity: &Entity) -> bool {
        self.tracker.on_despawn(entity)
    }

    /// Apply an inventory listing
    ///
    /// The reported counts always follow the container; carry flags and
    /// pouch inference only move while minigame signals are enabled.
    pub fn on_inventory_changed(&mut self, container: ContainerId, items: &[Item]) {
        if container != ContainerId::Inventory {
            return;
        }
        self.contents = InventoryState::from_items(items);
        if !self.signals_enabled() {
            return;
        }
        self.inventory = self.contents.clone();
        self.pouch.observe_quantity(self.inventory.essence);
    }

    /// Apply a chat line
    pub fn on_chat(&mut self, kind: ChatKind, message: &str, now: DateTime<Utc>) {
        if !kind.is_game() || !self.signals_enabled() {
            return;
        }
        if message.contains(POUCH_EMPTY_MESSAGE) {
            self.pouch.mark_emptied();
        }
        self.phase.observe_chat(message, now);
    }

    /// Apply a menu click; only pouch fill/empty options matter
    pub fn on_menu_option(&mut self, item_id: Option<u32>, option: &str) {
        if !item_id.is_some_and(catalog::is_colossal_pouch) {
            return;
        }
        let option = option.to_lowercase();
        let action = if option.contains("fill") {
            PouchAction::Fill
        } else if option.contains("empty") {
            PouchAction::Empty
        } else {
            return;
        };
        self.pouch.request(action, self.contents.essence);
    }

    /// Apply a client state change
    pub fn on_game_state(&mut self, state: GameState) {
        match state {
            GameState::Loading => {
                self.tracker.clear_region();
                self.pouch.reset();
            }
            GameState::LoginScreen => {
                self.in_minigame = false;
                info!("logged out");
            }
            GameState::LoggedIn | GameState::Other => {}
        }
    }

    /// Close one simulation step: refresh per-step state, then build and publish
    pub fn step(&mut self, input: &StepInput, now: DateTime<Utc>) -> Arc<Snapshot> {
        self.in_minigame = matches!(input.game_state, GameState::LoggedIn | GameState::Loading)
            && input.widgets.hud.is_some();
        self.in_main_region = input.map_regions.contains(&MINIGAME_MAIN_REGION);

        self.tracker.observe_frames(&input.frames);
        self.tracker
            .refresh_active_guardians(self.config.active_guardian_animation);
        self.phase.observe_widgets(&input.widgets, now);

        self.seq += 1;
        let snapshot = Arc::new(self.builder.build(&BuildContext {
            seq: self.seq,
            now,
            in_minigame: self.in_minigame,
            in_main_region: self.in_main_region,
            tracker: &self.tracker,
            inventory: &self.inventory,
            contents: &self.contents,
            inventory_slots: &input.inventory_slots,
            pouch_level: self.pouch.level(),
            phase: &self.phase,
            player: input.player.as_ref(),
            previous_position: self.last_player_position,
            canvas_origin: input.canvas_origin,
        }));
        self.last_player_position = input.player.as_ref().map(|p| p.position);

        debug!(seq = self.seq, tracked = self.tracker.len(), "snapshot published");
        self.publisher.publish(snapshot.clone());
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::catalog::{GUARDIANS, ids, items};
    use crate::runtime::entity::{EntityHandle, ObjectKind};
    use crate::runtime::event::{HudWidgets, Widget};

    fn essence(count: usize) -> Vec<Item> {
        vec![
            Item {
                id: items::GUARDIAN_ESSENCE as i32,
                quantity: 1,
            };
            count
        ]
    }

    fn in_arena() -> StepInput {
        StepInput {
            map_regions: vec![MINIGAME_MAIN_REGION],
            widgets: HudWidgets {
                hud: Some(Widget::default()),
                ..HudWidgets::default()
            },
            ..StepInput::default()
        }
    }

    #[test]
    fn test_pouch_driven_by_menu_and_inventory() {
        let mut runtime = Runtime::new(RuntimeConfig::default());
        let now = Utc::now();
        runtime.step(&in_arena(), now);
        runtime.handle(
            WorldEvent::InventoryChanged {
                container: ContainerId::Inventory,
                items: essence(20),
            },
            now,
        );
        runtime.handle(
            WorldEvent::MenuOptionClicked {
                item_id: Some(items::COLOSSAL_POUCH),
                option: "Fill".into(),
            },
            now,
        );
        runtime.handle(
            WorldEvent::InventoryChanged {
                container: ContainerId::Inventory,
                items: essence(15),
            },
            now,
        );
        assert_eq!(runtime.pouch().level(), 5);

        let snapshot = runtime.step(&in_arena(), now);
        assert_eq!(snapshot.inventory.pouch_essence, 5);
        assert_eq!(snapshot.inventory.essence, 15);

        runtime.on_chat(ChatKind::GameMessage, "There is no essence in this pouch.", now);
        assert_eq!(runtime.pouch().level(), 0);
    }

    #[test]
    fn test_signals_gated_outside_minigame() {
        let mut runtime = Runtime::new(RuntimeConfig::default());
        let now = Utc::now();
        runtime.step(&StepInput::default(), now);

        runtime.on_inventory_changed(ContainerId::Inventory, &essence(3));
        assert_eq!(runtime.inventory().essence, 0);

        runtime.step(&in_arena(), now);
        runtime.on_inventory_changed(ContainerId::Bank, &essence(3));
        assert_eq!(runtime.inventory().essence, 0);
        runtime.on_inventory_changed(ContainerId::Inventory, &essence(3));
        assert_eq!(runtime.inventory().essence, 3);
    }

    #[test]
    fn test_region_load_clears_transient_roles() {
        let mut runtime = Runtime::new(RuntimeConfig::default());
        let pool = Entity::new(
            EntityHandle(1),
            ids::DEPOSIT_POOL,
            ObjectKind::GameObject,
            WorldPoint::new(3616, 9500, 0),
        );
        let portal = Entity::new(
            EntityHandle(2),
            ids::PORTAL,
            ObjectKind::GameObject,
            WorldPoint::new(3600, 9490, 0),
        );
        assert!(runtime.on_spawn(pool));
        assert!(runtime.on_spawn(portal));

        runtime.handle(
            WorldEvent::GameStateChanged {
                state: GameState::Loading,
            },
            Utc::now(),
        );
        let snapshot = runtime.step(&in_arena(), Utc::now());
        assert!(snapshot.targets.deposit_pool.is_none());
        assert!(snapshot.targets.portal.is_some());
    }

    #[test]
    fn test_signals_ignored_before_first_step() {
        let mut runtime = Runtime::new(RuntimeConfig::default());
        let now = Utc::now();
        runtime.on_inventory_changed(ContainerId::Inventory, &essence(4));
        runtime.on_chat(
            ChatKind::GameMessage,
            "The rift will become active in 30 seconds.",
            now,
        );

        assert_eq!(runtime.inventory().essence, 0);
        assert_eq!(runtime.contents().essence, 4);
        assert!(runtime.phase().facts(now).next_game_start.is_none());
    }

    #[test]
    fn test_counts_follow_inventory_outside_minigame() {
        let mut runtime = Runtime::new(RuntimeConfig::default());
        let now = Utc::now();
        runtime.step(&in_arena(), now);
        runtime.on_inventory_changed(ContainerId::Inventory, &essence(20));
        assert!(runtime.step(&in_arena(), now).carrying.has_any_guardian_essence);

        runtime.step(&StepInput::default(), now);
        runtime.on_inventory_changed(ContainerId::Inventory, &[]);
        let snapshot = runtime.step(&StepInput::default(), now);
        assert_eq!(snapshot.inventory.essence, 0);
        assert_eq!(snapshot.inventory.empty_slots, inventory::INVENTORY_SIZE);
        // Carry flags keep the last in-minigame facts
        assert!(snapshot.carrying.has_any_guardian_essence);
    }

    #[test]
    fn test_region_load_resets_pouch() {
        let mut runtime = Runtime::new(RuntimeConfig::default());
        let now = Utc::now();
        runtime.step(&in_arena(), now);
        runtime.on_inventory_changed(ContainerId::Inventory, &essence(20));
        runtime.on_menu_option(Some(items::COLOSSAL_POUCH), "Fill");
        runtime.on_inventory_changed(ContainerId::Inventory, &essence(15));
        assert_eq!(runtime.pouch().level(), 5);

        runtime.handle(
            WorldEvent::GameStateChanged {
                state: GameState::Loading,
            },
            now,
        );
        assert_eq!(runtime.pouch().pending(), None);
        let snapshot = runtime.step(&in_arena(), now);
        assert_eq!(snapshot.inventory.pouch_essence, 0);
    }

    #[test]
    fn test_sequence_increases_and_publishes() {
        let mut runtime = Runtime::new(RuntimeConfig::default());
        let reader = runtime.publisher().clone();
        assert!(reader.fetch_latest().is_none());

        let first = runtime.step(&in_arena(), Utc::now());
        let second = runtime
            .handle(WorldEvent::Step(in_arena()), Utc::now())
            .unwrap();
        assert!(second.seq > first.seq);
        assert_eq!(reader.latest_seq(), Some(second.seq));
    }

    #[test]
    fn test_active_guardians_in_snapshot() {
        let mut runtime = Runtime::new(RuntimeConfig::default());
        let guardian = |handle: u64, id: u32| {
            Entity::new(
                EntityHandle(handle),
                id,
                ObjectKind::GameObject,
                WorldPoint::new(3600 + handle as i32, 9500, 0),
            )
        };
        runtime.on_spawn(guardian(1, GUARDIANS[0].game_object_id));
        runtime.on_spawn(guardian(2, GUARDIANS[5].game_object_id));

        let mut input = in_arena();
        input.frames = vec![tracker::EntityFrame {
            handle: EntityHandle(2),
            kind: ObjectKind::GameObject,
            shape: None,
            animation: Some(GUARDIAN_ACTIVE_ANIMATION),
        }];
        let snapshot = runtime.step(&input, Utc::now());
        let ids: Vec<_> = snapshot.targets.active_guardians.iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![GUARDIANS[5].game_object_id]);
    }

    #[test]
    fn test_config_validation() {
        let config = RuntimeConfig {
            pouch_capacity: 0,
            ..RuntimeConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "pouch_capacity",
                ..
            })
        ));
        assert!(RuntimeConfig::default().validate().is_ok());
    }
}
