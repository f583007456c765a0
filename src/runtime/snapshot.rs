//! Snapshot assembly
//!
//! A [`Snapshot`] is built once per simulation step from borrowed views of
//! the tracker, pouch, phase, and inventory state. Building never mutates
//! that state and never carries a value over from an earlier step: a field
//! whose input is missing this step is reported absent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::{CellType, Role};
use super::entity::{CanvasPoint, Entity, WorldPoint};
use super::event::{InventorySlot, PlayerSnapshot};
use super::inventory::{self, InventoryState, InventorySummary};
use super::mapper::{self, MapContext, TargetPoint};
use super::phase::{PhaseFacts, PhaseTracker};
use super::tracker::EntityTracker;

/// Default distance beyond which a return portal is considered stale
pub const DEFAULT_RETURN_PORTAL_MAX_DISTANCE: u32 = 5;

/// Huge remains area, exclusive bounds
const HUGE_REMAINS_X: (i32, i32) = (3587, 3594);
const HUGE_REMAINS_Y: (i32, i32) = (9496, 9516);

/// Player facts as reported in a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerFacts {
    /// Display name
    pub name: Option<String>,
    /// Current tile
    pub position: WorldPoint,
    /// Current animation
    pub animation: Option<u32>,
    /// Hitpoints
    pub health: Option<u32>,
    /// Run energy in percent
    pub run_energy: Option<u32>,
    /// Whether the tile changed since the previous step
    pub moving: bool,
    /// Whether the player is inside the huge guardian remains area
    pub in_huge_remains_area: bool,
}

/// Inventory-derived flags
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CarryFlags {
    /// Any of the twelve runes
    pub has_any_runes: bool,
    /// Any guardian essence
    pub has_any_guardian_essence: bool,
    /// Any charged cell
    pub has_any_charged_cells: bool,
    /// Tier of the first charged cell carried
    pub charged_cell_type: Option<CellType>,
    /// Any guardian stone
    pub has_any_stones: bool,
    /// Every slot occupied
    pub has_full_inventory: bool,
    /// No uncharged cell carried
    pub needs_uncharged_cells: bool,
    /// Chisel, overcharged cell, and guardians still needed
    pub should_make_guardian: bool,
    /// Talisman item ids
    pub talismans: Vec<u32>,
}

/// Every mapped role slot
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Targets {
    /// Guardians whose altar is currently open
    pub active_guardians: Vec<TargetPoint>,
    /// Cell tiles next to the barriers
    pub cell_tiles: Vec<TargetPoint>,
    /// Nearest huge guardian remains
    pub huge_guardian: Option<TargetPoint>,
    /// Nearest large guardian remains
    pub large_guardian: Option<TargetPoint>,
    /// The Great Guardian
    pub great_guardian: Option<TargetPoint>,
    /// The apprentice
    pub apprentice: Option<TargetPoint>,
    /// Uncharged cell table
    pub uncharged_cell_table: Option<TargetPoint>,
    /// Deposit pool
    pub deposit_pool: Option<TargetPoint>,
    /// Catalytic essence pile
    pub catalytic_essence_pile: Option<TargetPoint>,
    /// Elemental essence pile
    pub elemental_essence_pile: Option<TargetPoint>,
    /// Portal to the huge remains
    pub portal: Option<TargetPoint>,
    /// Portal back from the huge remains
    pub return_portal: Option<TargetPoint>,
    /// Workbench
    pub workbench: Option<TargetPoint>,
    /// Entry barrier
    pub barrier: Option<TargetPoint>,
    /// Upper rubble
    pub rubble_top: Option<TargetPoint>,
    /// Lower rubble
    pub rubble_bottom: Option<TargetPoint>,
    /// Altar of the entered rift
    pub current_altar: Option<TargetPoint>,
    /// Exit portal of the entered rift
    pub altar_portal: Option<TargetPoint>,
    /// Lobby bank chest
    pub bank_chest: Option<TargetPoint>,
}

/// Immutable capture of the tracked world at one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Monotonic sequence number
    pub seq: u64,
    /// Capture time
    pub ts: DateTime<Utc>,
    /// Whether a local player exists
    pub logged_in: bool,
    /// Whether the minigame HUD is present
    pub in_minigame: bool,
    /// Whether the player is in the main arena region
    pub in_main_region: bool,
    /// Player facts
    pub player: Option<PlayerFacts>,
    /// Inventory summary
    pub inventory: InventorySummary,
    /// Inventory-derived flags
    pub carrying: CarryFlags,
    /// Mapped role slots
    pub targets: Targets,
    /// Phase facts
    pub phase: PhaseFacts,
}

/// Borrowed inputs for one build
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    /// Sequence number to stamp
    pub seq: u64,
    /// Capture time
    pub now: DateTime<Utc>,
    /// Whether the minigame HUD is present
    pub in_minigame: bool,
    /// Whether the player is in the main arena region
    pub in_main_region: bool,
    /// Entity slots
    pub tracker: &'a EntityTracker,
    /// Inventory facts accepted while minigame signals are enabled
    pub inventory: &'a InventoryState,
    /// Latest inventory listing, ungated
    pub contents: &'a InventoryState,
    /// Inventory slot widgets
    pub inventory_slots: &'a [InventorySlot],
    /// Inferred pouch level
    pub pouch_level: u32,
    /// Phase state
    pub phase: &'a PhaseTracker,
    /// Local player, if present
    pub player: Option<&'a PlayerSnapshot>,
    /// Player tile at the previous step
    pub previous_position: Option<WorldPoint>,
    /// Canvas screen origin, if known
    pub canvas_origin: Option<CanvasPoint>,
}

/// Assembles snapshots
#[derive(Debug, Clone, Copy)]
pub struct SnapshotBuilder {
    return_portal_max_distance: u32,
}

impl SnapshotBuilder {
    /// Builder dropping return portals farther than `return_portal_max_distance`
    pub fn new(return_portal_max_distance: u32) -> Self {
        Self {
            return_portal_max_distance,
        }
    }

    /// Build one snapshot
    pub fn build(&self, input: &BuildContext<'_>) -> Snapshot {
        let map = MapContext {
            player: input.player.map(|p| p.position),
            canvas_origin: input.canvas_origin,
        };

        Snapshot {
            seq: input.seq,
            ts: input.now,
            logged_in: input.player.is_some(),
            in_minigame: input.in_minigame,
            in_main_region: input.in_main_region,
            player: input
                .player
                .map(|p| player_facts(p, input.previous_position)),
            inventory: inventory::summarize(
                input.contents,
                input.inventory_slots,
                input.pouch_level,
                &map,
            ),
            carrying: carry_flags(input.inventory, input.phase.guardians_needed()),
            targets: self.targets(input.tracker, &map),
            phase: input.phase.facts(input.now),
        }
    }

    fn targets(&self, tracker: &EntityTracker, map: &MapContext) -> Targets {
        let slot = |role: Role| mapper::map_slot(tracker.single(role), role, map);
        let nearest = |role: Role| {
            mapper::map_slot(nearest_member(tracker.members(role), map.player), role, map)
        };

        let mut return_portal = slot(Role::ReturnPortal);
        let mut huge_guardian = nearest(Role::HugeGuardian);
        let stale = return_portal.as_ref().is_some_and(|p| {
            p.distance_to_player
                .is_none_or(|d| d > self.return_portal_max_distance)
        });
        if stale {
            return_portal = None;
            huge_guardian = None;
        }

        Targets {
            active_guardians: tracker
                .active_guardians()
                .map(|g| mapper::map_entity(g, Role::Guardian, map))
                .collect(),
            cell_tiles: tracker
                .members(Role::CellTile)
                .iter()
                .map(|t| mapper::map_entity(t, Role::CellTile, map))
                .collect(),
            huge_guardian,
            large_guardian: nearest(Role::LargeGuardian),
            great_guardian: slot(Role::GreatGuardian),
            apprentice: slot(Role::Apprentice),
            uncharged_cell_table: slot(Role::UnchargedCellTable),
            deposit_pool: slot(Role::DepositPool),
            catalytic_essence_pile: slot(Role::CatalyticEssencePile),
            elemental_essence_pile: slot(Role::ElementalEssencePile),
            portal: slot(Role::Portal),
            return_portal,
            workbench: slot(Role::Workbench),
            barrier: slot(Role::Barrier),
            rubble_top: slot(Role::RubbleTop),
            rubble_bottom: slot(Role::RubbleBottom),
            current_altar: slot(Role::Altar),
            altar_portal: slot(Role::AltarPortal),
            bank_chest: slot(Role::BankChest),
        }
    }
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_RETURN_PORTAL_MAX_DISTANCE)
    }
}

/// Member closest to `player`; the earliest member when no distance is known
fn nearest_member(members: &[Entity], player: Option<WorldPoint>) -> Option<&Entity> {
    let distance = |e: &Entity| {
        player
            .and_then(|p| p.distance_to(&e.position))
            .unwrap_or(u32::MAX)
    };
    members.iter().min_by_key(|e| distance(e))
}

fn player_facts(player: &PlayerSnapshot, previous: Option<WorldPoint>) -> PlayerFacts {
    let position = player.position;
    PlayerFacts {
        name: player.name.clone(),
        position,
        animation: player.animation,
        health: player.health,
        run_energy: player.run_energy,
        moving: previous.is_some_and(|p| p != position),
        in_huge_remains_area: position.x > HUGE_REMAINS_X.0
            && position.x < HUGE_REMAINS_X.1
            && position.y > HUGE_REMAINS_Y.0
            && position.y < HUGE_REMAINS_Y.1,
    }
}

fn carry_flags(state: &InventoryState, guardians_needed: bool) -> CarryFlags {
    CarryFlags {
        has_any_runes: state.has_any_runes,
        has_any_guardian_essence: state.has_any_guardian_essence,
        has_any_charged_cells: state.has_any_charged_cells,
        charged_cell_type: state.charged_cell_type,
        has_any_stones: state.has_any_stones,
        has_full_inventory: state.has_full_inventory,
        needs_uncharged_cells: state.needs_uncharged_cells,
        should_make_guardian: state.should_make_guardian(guardians_needed),
        talismans: state.talismans.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::catalog::ids;
    use crate::runtime::entity::{EntityHandle, ObjectKind};

    fn object(handle: u64, id: u32, x: i32, y: i32) -> Entity {
        Entity::new(
            EntityHandle(handle),
            id,
            ObjectKind::GameObject,
            WorldPoint::new(x, y, 0),
        )
    }

    fn player_at(x: i32, y: i32) -> PlayerSnapshot {
        PlayerSnapshot {
            name: Some("tester".into()),
            position: WorldPoint::new(x, y, 0),
            animation: None,
            health: Some(99),
            run_energy: Some(100),
        }
    }

    fn build(tracker: &EntityTracker, player: Option<&PlayerSnapshot>) -> Snapshot {
        let inventory = InventoryState::default();
        let phase = PhaseTracker::new();
        let ctx = BuildContext {
            seq: 1,
            now: Utc::now(),
            in_minigame: true,
            in_main_region: true,
            tracker,
            inventory: &inventory,
            contents: &inventory,
            inventory_slots: &[],
            pouch_level: 0,
            phase: &phase,
            player,
            previous_position: None,
            canvas_origin: None,
        };
        SnapshotBuilder::default().build(&ctx)
    }

    #[test]
    fn test_nearest_remains_reported() {
        let mut tracker = EntityTracker::new();
        tracker.on_spawn(object(1, ids::LARGE_GUARDIAN_REMAINS, 3620, 9500));
        tracker.on_spawn(object(2, ids::LARGE_GUARDIAN_REMAINS, 3600, 9500));
        let player = player_at(3598, 9500);

        let snapshot = build(&tracker, Some(&player));
        let large = snapshot.targets.large_guardian.unwrap();
        assert_eq!(large.world_x, 3600);
        assert_eq!(large.distance_to_player, Some(2));
    }

    #[test]
    fn test_return_portal_without_player_is_dropped() {
        let mut tracker = EntityTracker::new();
        tracker.on_spawn(object(1, ids::RETURN_PORTAL, 3592, 9500));
        tracker.on_spawn(object(2, ids::HUGE_GUARDIAN_REMAINS, 3590, 9505));

        let snapshot = build(&tracker, None);
        assert!(!snapshot.logged_in);
        assert_eq!(snapshot.targets.return_portal, None);
        assert_eq!(snapshot.targets.huge_guardian, None);
    }

    #[test]
    fn test_huge_remains_kept_without_return_portal() {
        let mut tracker = EntityTracker::new();
        tracker.on_spawn(object(2, ids::HUGE_GUARDIAN_REMAINS, 3590, 9505));
        let player = player_at(3570, 9505);
        let snapshot = build(&tracker, Some(&player));
        assert!(snapshot.targets.huge_guardian.is_some());
    }

    #[test]
    fn test_player_facts() {
        let player = player_at(3590, 9500);
        let facts = player_facts(&player, Some(WorldPoint::new(3589, 9500, 0)));
        assert!(facts.moving);
        assert!(facts.in_huge_remains_area);

        let facts = player_facts(&player_at(3587, 9500), Some(WorldPoint::new(3587, 9500, 0)));
        assert!(!facts.moving);
        assert!(!facts.in_huge_remains_area);
    }

    #[test]
    fn test_build_does_not_touch_tracker() {
        let mut tracker = EntityTracker::new();
        tracker.on_spawn(object(1, ids::WORKBENCH, 3612, 9487));
        let before = tracker.len();
        let a = build(&tracker, None);
        let b = build(&tracker, None);
        assert_eq!(tracker.len(), before);
        assert_eq!(a.targets, b.targets);
    }
}
