//! Static id tables for the minigame
//!
//! Every numeric id the tracker cares about is resolved here, once, into a
//! tagged [`Role`]. Callers match on the role instead of testing id sets.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::entity::{Namespace, ObjectKind};

/// Map region containing the main minigame arena
pub const MINIGAME_MAIN_REGION: u32 = 14484;

/// Animation played by a guardian whose altar is currently open
pub const GUARDIAN_ACTIVE_ANIMATION: u32 = 9363;

/// Varbit holding this round's elemental energy
pub const VARBIT_CURRENT_ELEMENTAL_POINTS: u32 = 13686;
/// Varbit holding this round's catalytic energy
pub const VARBIT_CURRENT_CATALYTIC_POINTS: u32 = 13685;

/// Object and NPC ids
pub mod ids {
    /// The Great Guardian NPC
    pub const GREAT_GUARDIAN: u32 = 11403;
    /// Apprentice Cordelia (the apprentice with the talisman shop)
    pub const APPRENTICE: u32 = 11405;

    /// Pool for depositing runes
    pub const DEPOSIT_POOL: u32 = 43696;
    /// Bank chest in the lobby
    pub const BANK_CHEST: u32 = 43697;
    /// Entry barrier (open)
    pub const BARRIER: u32 = 43700;
    /// Entry barrier (no entry)
    pub const BARRIER_NO_ENTRY: u32 = 43849;
    /// Entry barrier (closed)
    pub const BARRIER_CLOSED: u32 = 43850;
    /// Large guardian remains
    pub const LARGE_GUARDIAN_REMAINS: u32 = 43720;
    /// Huge guardian remains
    pub const HUGE_GUARDIAN_REMAINS: u32 = 43719;
    /// Elemental essence pile
    pub const ELEMENTAL_ESSENCE_PILE: u32 = 43722;
    /// Catalytic essence pile
    pub const CATALYTIC_ESSENCE_PILE: u32 = 43723;
    /// Upper agility shortcut rubble
    pub const RUBBLE_TOP: u32 = 43724;
    /// Upper rubble while not climbable
    pub const RUBBLE_TOP_NOOP: u32 = 43725;
    /// Lower agility shortcut rubble
    pub const RUBBLE_BOTTOM: u32 = 43726;
    /// Lower rubble while not climbable
    pub const RUBBLE_BOTTOM_NOOP: u32 = 43727;
    /// Portal to the huge guardian remains
    pub const PORTAL: u32 = 43729;
    /// Portal back from the huge guardian remains
    pub const RETURN_PORTAL: u32 = 43730;
    /// Table of uncharged cells
    pub const UNCHARGED_CELL_TABLE: u32 = 43732;
    /// Workbench for crafting essence
    pub const WORKBENCH: u32 = 43754;
}

/// Item ids
pub mod items {
    /// Colossal pouch (intact)
    pub const COLOSSAL_POUCH: u32 = 26784;
    /// Colossal pouch (degraded)
    pub const COLOSSAL_POUCH_DEGRADED: u32 = 26786;
    /// Guardian fragments
    pub const GUARDIAN_FRAGMENTS: u32 = 26878;
    /// Guardian essence
    pub const GUARDIAN_ESSENCE: u32 = 26879;
    /// Catalytic guardian stone
    pub const CATALYTIC_GUARDIAN_STONE: u32 = 26880;
    /// Elemental guardian stone
    pub const ELEMENTAL_GUARDIAN_STONE: u32 = 26881;
    /// Polyelemental guardian stone
    pub const POLYELEMENTAL_GUARDIAN_STONE: u32 = 26941;
    /// Uncharged cell
    pub const UNCHARGED_CELL: u32 = 26882;
    /// Overcharged cell
    pub const OVERCHARGED_CELL: u32 = 26886;
    /// Chisel
    pub const CHISEL: u32 = 1755;
    /// Abyssal pearls
    pub const ABYSSAL_PEARLS: u32 = 26792;
}

/// Semantic role of a tracked entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Altar inside the currently entered rift
    Altar,
    /// Exit portal inside an altar
    AltarPortal,
    /// Portal to the huge guardian remains
    Portal,
    /// Portal back from the huge guardian remains
    ReturnPortal,
    /// Rune deposit pool
    DepositPool,
    /// Catalytic essence pile
    CatalyticEssencePile,
    /// Elemental essence pile
    ElementalEssencePile,
    /// Essence workbench
    Workbench,
    /// Uncharged cell table
    UnchargedCellTable,
    /// Entry barrier
    Barrier,
    /// Upper shortcut rubble
    RubbleTop,
    /// Lower shortcut rubble
    RubbleBottom,
    /// Lobby bank chest
    BankChest,
    /// One of the twelve rune guardians
    Guardian,
    /// Huge guardian remains
    HugeGuardian,
    /// Large guardian remains
    LargeGuardian,
    /// Cell tile next to a barrier
    CellTile,
    /// Apprentice NPC
    Apprentice,
    /// Great Guardian NPC
    GreatGuardian,
}

/// Whether a role holds one entity or many
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// At most one live holder, last spawn wins
    Single,
    /// Any number of concurrently live members
    Set,
}

/// How a set-valued role drops an older member when a new one spawns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupRule {
    /// Only a re-spawn of the same instance is replaced
    InstanceOnly,
    /// A member with the same object id is replaced
    SameObjectId,
    /// A member on the same tile is replaced, whatever its id
    SameTile,
}

impl Role {
    /// Slot cardinality
    pub fn cardinality(self) -> Cardinality {
        match self {
            Role::Guardian | Role::HugeGuardian | Role::LargeGuardian | Role::CellTile => {
                Cardinality::Set
            }
            _ => Cardinality::Single,
        }
    }

    /// Replacement rule for set-valued roles
    pub fn dedup_rule(self) -> DedupRule {
        match self {
            Role::Guardian => DedupRule::SameObjectId,
            Role::CellTile => DedupRule::SameTile,
            _ => DedupRule::InstanceOnly,
        }
    }

    /// Whether a concrete representation may hold this role
    pub fn admits(self, kind: ObjectKind) -> bool {
        match self {
            Role::Apprentice | Role::GreatGuardian => kind == ObjectKind::Npc,
            Role::CellTile => kind == ObjectKind::GroundObject,
            Role::RubbleTop | Role::RubbleBottom => kind.is_tile_object(),
            _ => kind == ObjectKind::GameObject,
        }
    }

    /// Whether a region load clears this role
    pub fn cleared_on_region_load(self) -> bool {
        matches!(
            self,
            Role::Guardian
                | Role::CellTile
                | Role::UnchargedCellTable
                | Role::DepositPool
                | Role::GreatGuardian
                | Role::Apprentice
                | Role::CatalyticEssencePile
                | Role::ElementalEssencePile
                | Role::Altar
                | Role::AltarPortal
        )
    }

    /// Fallback display name
    pub fn label(self) -> &'static str {
        match self {
            Role::Altar => "Altar",
            Role::AltarPortal => "Portal",
            Role::Portal => "Portal",
            Role::ReturnPortal => "Portal",
            Role::DepositPool => "Deposit Pool",
            Role::CatalyticEssencePile => "Catalytic guardian parts",
            Role::ElementalEssencePile => "Elemental guardian parts",
            Role::Workbench => "Workbench",
            Role::UnchargedCellTable => "Uncharged cells",
            Role::Barrier => "Barrier",
            Role::RubbleTop | Role::RubbleBottom => "Rubble",
            Role::BankChest => "Bank chest",
            Role::Guardian => "Guardian",
            Role::HugeGuardian => "Huge guardian remains",
            Role::LargeGuardian => "Large guardian remains",
            Role::CellTile => "Cell tile",
            Role::Apprentice => "Apprentice Cordelia",
            Role::GreatGuardian => "The Great Guardian",
        }
    }
}

/// Guardian alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardianKind {
    /// Air, water, earth, fire
    Elemental,
    /// Every other rune
    Catalytic,
}

/// Static description of one rune guardian
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardianInfo {
    /// Rune name
    pub name: &'static str,
    /// Alignment
    pub kind: GuardianKind,
    /// Rune item id
    pub rune_id: u32,
    /// Talisman item id
    pub talisman_id: u32,
    /// HUD sprite shown while this guardian's rift is open
    pub sprite_id: u32,
    /// Guardian object id in the arena
    pub game_object_id: u32,
    /// Altar object id inside the rift
    pub altar_id: u32,
    /// Exit portal object id inside the rift
    pub altar_portal_id: u32,
}

const fn guardian(
    name: &'static str,
    kind: GuardianKind,
    rune_id: u32,
    talisman_id: u32,
    sprite_id: u32,
    game_object_id: u32,
    altar_id: u32,
    altar_portal_id: u32,
) -> GuardianInfo {
    GuardianInfo {
        name,
        kind,
        rune_id,
        talisman_id,
        sprite_id,
        game_object_id,
        altar_id,
        altar_portal_id,
    }
}

use GuardianKind::{Catalytic, Elemental};

/// All twelve guardians
pub const GUARDIANS: [GuardianInfo; 12] = [
    guardian("Air", Elemental, 556, 1438, 4353, 43701, 34760, 34748),
    guardian("Mind", Catalytic, 558, 1448, 4354, 43705, 34761, 34749),
    guardian("Water", Elemental, 555, 1444, 4355, 43702, 34762, 34750),
    guardian("Earth", Elemental, 557, 1440, 4356, 43703, 34763, 34751),
    guardian("Fire", Elemental, 554, 1442, 4357, 43704, 34764, 34752),
    guardian("Body", Catalytic, 559, 1446, 4358, 43709, 34765, 34753),
    guardian("Cosmic", Catalytic, 564, 1454, 4359, 43710, 34766, 34754),
    guardian("Chaos", Catalytic, 562, 1452, 4360, 43706, 34769, 34757),
    guardian("Nature", Catalytic, 561, 1462, 4361, 43711, 34768, 34756),
    guardian("Law", Catalytic, 563, 1458, 4362, 43712, 34767, 34755),
    guardian("Death", Catalytic, 560, 1456, 4363, 43707, 34770, 34758),
    guardian("Blood", Catalytic, 565, 5516, 4364, 43708, 43479, 43478),
];

/// Charge level of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellType {
    /// Weak cell
    Weak,
    /// Medium cell
    Medium,
    /// Strong cell
    Strong,
    /// Overcharged cell
    Overcharged,
}

/// Static description of one cell tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellTileInfo {
    /// Tier
    pub cell_type: CellType,
    /// Charged cell item id
    pub item_id: u32,
    /// Ground object placed on a cell tile
    pub ground_object_id: u32,
}

/// All cell tiers
pub const CELL_TILES: [CellTileInfo; 4] = [
    CellTileInfo {
        cell_type: CellType::Weak,
        item_id: 26883,
        ground_object_id: 43740,
    },
    CellTileInfo {
        cell_type: CellType::Medium,
        item_id: 26884,
        ground_object_id: 43741,
    },
    CellTileInfo {
        cell_type: CellType::Strong,
        item_id: 26885,
        ground_object_id: 43742,
    },
    CellTileInfo {
        cell_type: CellType::Overcharged,
        item_id: items::OVERCHARGED_CELL,
        ground_object_id: 43743,
    },
];

static ROLES: Lazy<HashMap<(Namespace, u32), Role>> = Lazy::new(|| {
    let mut table = HashMap::new();
    let mut object = |id: u32, role: Role| {
        table.insert((Namespace::Object, id), role);
    };

    for g in &GUARDIANS {
        object(g.game_object_id, Role::Guardian);
        object(g.altar_id, Role::Altar);
        object(g.altar_portal_id, Role::AltarPortal);
    }
    for c in &CELL_TILES {
        object(c.ground_object_id, Role::CellTile);
    }

    object(ids::DEPOSIT_POOL, Role::DepositPool);
    object(ids::BANK_CHEST, Role::BankChest);
    object(ids::BARRIER, Role::Barrier);
    object(ids::BARRIER_NO_ENTRY, Role::Barrier);
    object(ids::BARRIER_CLOSED, Role::Barrier);
    object(ids::HUGE_GUARDIAN_REMAINS, Role::HugeGuardian);
    object(ids::LARGE_GUARDIAN_REMAINS, Role::LargeGuardian);
    object(ids::ELEMENTAL_ESSENCE_PILE, Role::ElementalEssencePile);
    object(ids::CATALYTIC_ESSENCE_PILE, Role::CatalyticEssencePile);
    object(ids::RUBBLE_TOP, Role::RubbleTop);
    object(ids::RUBBLE_TOP_NOOP, Role::RubbleTop);
    object(ids::RUBBLE_BOTTOM, Role::RubbleBottom);
    object(ids::RUBBLE_BOTTOM_NOOP, Role::RubbleBottom);
    object(ids::PORTAL, Role::Portal);
    object(ids::RETURN_PORTAL, Role::ReturnPortal);
    object(ids::UNCHARGED_CELL_TABLE, Role::UnchargedCellTable);
    object(ids::WORKBENCH, Role::Workbench);

    table.insert((Namespace::Npc, ids::GREAT_GUARDIAN), Role::GreatGuardian);
    table.insert((Namespace::Npc, ids::APPRENTICE), Role::Apprentice);
    table
});

static RUNE_IDS: Lazy<HashSet<u32>> = Lazy::new(|| GUARDIANS.iter().map(|g| g.rune_id).collect());

static TALISMAN_IDS: Lazy<HashSet<u32>> =
    Lazy::new(|| GUARDIANS.iter().map(|g| g.talisman_id).collect());

/// Resolve the role of an entity id delivered as `kind`
pub fn role_for(kind: ObjectKind, id: u32) -> Option<Role> {
    ROLES
        .get(&(kind.namespace(), id))
        .copied()
        .filter(|role| role.admits(kind))
}

/// Guardian whose HUD sprite is `sprite_id`
pub fn guardian_by_sprite(sprite_id: u32) -> Option<&'static GuardianInfo> {
    GUARDIANS.iter().find(|g| g.sprite_id == sprite_id)
}

/// Whether `item_id` is one of the twelve runes
pub fn is_rune(item_id: u32) -> bool {
    RUNE_IDS.contains(&item_id)
}

/// Whether `item_id` is one of the twelve talismans
pub fn is_talisman(item_id: u32) -> bool {
    TALISMAN_IDS.contains(&item_id)
}

/// Cell tier of a charged cell item
pub fn charged_cell_type(item_id: u32) -> Option<CellType> {
    CELL_TILES
        .iter()
        .find(|c| c.item_id == item_id)
        .map(|c| c.cell_type)
}

/// Whether `item_id` is a guardian stone of any alignment
pub fn is_guardian_stone(item_id: u32) -> bool {
    matches!(
        item_id,
        items::CATALYTIC_GUARDIAN_STONE
            | items::ELEMENTAL_GUARDIAN_STONE
            | items::POLYELEMENTAL_GUARDIAN_STONE
    )
}

/// Whether `item_id` is the colossal pouch in either condition
pub fn is_colossal_pouch(item_id: u32) -> bool {
    item_id == items::COLOSSAL_POUCH || item_id == items::COLOSSAL_POUCH_DEGRADED
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_guardian_resolves_three_roles() {
        for g in &GUARDIANS {
            assert_eq!(role_for(ObjectKind::GameObject, g.game_object_id), Some(Role::Guardian));
            assert_eq!(role_for(ObjectKind::GameObject, g.altar_id), Some(Role::Altar));
            assert_eq!(
                role_for(ObjectKind::GameObject, g.altar_portal_id),
                Some(Role::AltarPortal)
            );
        }
    }

    #[test]
    fn test_namespaces_do_not_collide() {
        assert_eq!(role_for(ObjectKind::Npc, ids::GREAT_GUARDIAN), Some(Role::GreatGuardian));
        assert_eq!(role_for(ObjectKind::GameObject, ids::GREAT_GUARDIAN), None);
        assert_eq!(role_for(ObjectKind::Npc, ids::DEPOSIT_POOL), None);
    }

    #[test]
    fn test_kind_admission() {
        assert_eq!(role_for(ObjectKind::GroundObject, 43740), Some(Role::CellTile));
        assert_eq!(role_for(ObjectKind::GameObject, 43740), None);
        for kind in [
            ObjectKind::GameObject,
            ObjectKind::GroundObject,
            ObjectKind::WallObject,
            ObjectKind::DecorativeObject,
        ] {
            assert_eq!(role_for(kind, ids::RUBBLE_TOP_NOOP), Some(Role::RubbleTop));
        }
        assert_eq!(role_for(ObjectKind::WallObject, ids::PORTAL), None);
    }

    #[test]
    fn test_item_tables() {
        assert!(is_rune(565));
        assert!(is_talisman(5516));
        assert!(!is_talisman(565));
        assert_eq!(charged_cell_type(26885), Some(CellType::Strong));
        assert_eq!(charged_cell_type(items::UNCHARGED_CELL), None);
        assert_eq!(guardian_by_sprite(4364).map(|g| g.name), Some("Blood"));
        assert!(is_colossal_pouch(items::COLOSSAL_POUCH_DEGRADED));
    }
}
