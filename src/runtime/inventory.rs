//! Inventory facts and the per-step inventory summary

use serde::{Deserialize, Serialize};

use super::catalog::{self, CellType, items};
use super::event::{InventorySlot, Item};
use super::mapper::{self, MapContext, SlotPoint};

/// Number of inventory slots
pub const INVENTORY_SIZE: u32 = 28;

/// Facts derived from the last inventory-change notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryState {
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
    /// Talisman item ids, in slot order
    pub talismans: Vec<u32>,
    /// Free slots
    pub empty_slots: u32,
    /// Guardian fragments
    pub fragments: u32,
    /// Uncharged cells
    pub uncharged_cells: u32,
    /// Guardian essence
    pub essence: u32,
    /// Abyssal pearls
    pub pearls: u32,
    /// Whether the carried colossal pouch is degraded
    pub pouch_degraded: bool,
    carries_chisel: bool,
    carries_overcharged_cell: bool,
}

impl InventoryState {
    /// Derive facts from a full container listing
    pub fn from_items(listing: &[Item]) -> Self {
        let mut state = Self {
            has_any_runes: false,
            has_any_guardian_essence: false,
            has_any_charged_cells: false,
            charged_cell_type: None,
            has_any_stones: false,
            has_full_inventory: false,
            needs_uncharged_cells: true,
            talismans: Vec::new(),
            empty_slots: INVENTORY_SIZE,
            fragments: 0,
            uncharged_cells: 0,
            essence: 0,
            pearls: 0,
            pouch_degraded: false,
            carries_chisel: false,
            carries_overcharged_cell: false,
        };

        let mut occupied = 0u32;
        for item in listing {
            let Some(id) = item.occupied_id() else {
                continue;
            };
            occupied += 1;

            match id {
                items::GUARDIAN_FRAGMENTS => {
                    state.fragments = state.fragments.saturating_add(item.quantity)
                }
                items::UNCHARGED_CELL => {
                    state.uncharged_cells = state.uncharged_cells.saturating_add(item.quantity)
                }
                items::GUARDIAN_ESSENCE => {
                    state.essence = state.essence.saturating_add(item.quantity)
                }
                items::ABYSSAL_PEARLS => state.pearls = state.pearls.saturating_add(item.quantity),
                items::CHISEL => state.carries_chisel = true,
                _ => {}
            }

            if let Some(cell) = catalog::charged_cell_type(id) {
                state.has_any_charged_cells = true;
                state.charged_cell_type.get_or_insert(cell);
                state.carries_overcharged_cell |= cell == CellType::Overcharged;
            }
            if catalog::is_colossal_pouch(id) {
                state.pouch_degraded = id == items::COLOSSAL_POUCH_DEGRADED;
            }
            if catalog::is_talisman(id) {
                state.talismans.push(id);
            }
            state.has_any_runes |= catalog::is_rune(id);
            state.has_any_stones |= catalog::is_guardian_stone(id);
        }

        state.has_any_guardian_essence = state.essence > 0;
        state.needs_uncharged_cells = state.uncharged_cells == 0;
        state.has_full_inventory = occupied >= INVENTORY_SIZE;
        state.empty_slots = INVENTORY_SIZE.saturating_sub(occupied);
        state
    }

    /// Whether the player can and should build a guardian
    pub fn should_make_guardian(&self, guardians_needed: bool) -> bool {
        self.carries_chisel && self.carries_overcharged_cell && guardians_needed
    }
}

impl Default for InventoryState {
    fn default() -> Self {
        Self::from_items(&[])
    }
}

/// Inventory section of a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InventorySummary {
    /// Free slots
    pub empty_slots: u32,
    /// Guardian fragments
    pub fragments: u32,
    /// Uncharged cells
    pub uncharged_cells: u32,
    /// Guardian essence
    pub essence: u32,
    /// Abyssal pearls
    pub pearls: u32,
    /// Whether the colossal pouch is degraded
    pub pouch_degraded: bool,
    /// Inferred essence inside the colossal pouch
    pub pouch_essence: u32,
    /// Colossal pouch slot
    pub colossal_pouch: Option<SlotPoint>,
    /// First guardian essence slot
    pub essence_slots: Vec<SlotPoint>,
    /// Every talisman slot
    pub talismans: Vec<SlotPoint>,
}

/// Combine inventory facts, slot widgets, and the pouch level
pub fn summarize(
    state: &InventoryState,
    slots: &[InventorySlot],
    pouch_essence: u32,
    ctx: &MapContext,
) -> InventorySummary {
    let mut summary = InventorySummary {
        empty_slots: state.empty_slots,
        fragments: state.fragments,
        uncharged_cells: state.uncharged_cells,
        essence: state.essence,
        pearls: state.pearls,
        pouch_degraded: state.pouch_degraded,
        pouch_essence,
        ..InventorySummary::default()
    };

    let visible = slots.iter().filter(|s| s.item_id > 0 && !s.hidden);
    for slot in visible {
        let Some(point) =
            mapper::map_inventory_slot(slot.item_id, &slot.name, slot.quantity, slot.bounds, ctx)
        else {
            continue;
        };

        if slot.item_id == items::GUARDIAN_ESSENCE && summary.essence_slots.is_empty() {
            summary.essence_slots.push(point);
        } else if catalog::is_colossal_pouch(slot.item_id) {
            summary.colossal_pouch.get_or_insert(point);
        } else if catalog::is_talisman(slot.item_id) {
            summary.talismans.push(point);
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::entity::{CanvasPoint, CanvasRect};

    fn item(id: i32, quantity: u32) -> Item {
        Item { id, quantity }
    }

    fn slot(index: i32, item_id: u32, quantity: u32) -> InventorySlot {
        InventorySlot {
            item_id,
            name: String::new(),
            quantity,
            bounds: Some(CanvasRect {
                x: 560 + 42 * (index % 4),
                y: 210 + 36 * (index / 4),
                width: 36,
                height: 32,
            }),
            hidden: false,
        }
    }

    #[test]
    fn test_empty_listing() {
        let state = InventoryState::default();
        assert_eq!(state.empty_slots, 28);
        assert!(state.needs_uncharged_cells);
        assert!(!state.has_full_inventory);
        assert!(!state.should_make_guardian(true));
    }

    #[test]
    fn test_facts_from_listing() {
        let mut listing = vec![
            item(items::GUARDIAN_FRAGMENTS as i32, 150),
            item(items::GUARDIAN_ESSENCE as i32, 1),
            item(items::GUARDIAN_ESSENCE as i32, 1),
            item(26884, 1),
            item(items::OVERCHARGED_CELL as i32, 1),
            item(items::CHISEL as i32, 1),
            item(items::COLOSSAL_POUCH_DEGRADED as i32, 1),
            item(1438, 1),
            item(565, 12),
            item(items::ELEMENTAL_GUARDIAN_STONE as i32, 1),
        ];
        listing.resize(28, item(-1, 0));

        let state = InventoryState::from_items(&listing);
        assert_eq!(state.fragments, 150);
        assert_eq!(state.essence, 2);
        assert_eq!(state.empty_slots, 18);
        assert_eq!(state.charged_cell_type, Some(CellType::Medium));
        assert_eq!(state.talismans, vec![1438]);
        assert!(state.has_any_runes);
        assert!(state.has_any_stones);
        assert!(state.pouch_degraded);
        assert!(state.needs_uncharged_cells);
        assert!(state.should_make_guardian(true));
        assert!(!state.should_make_guardian(false));
    }

    #[test]
    fn test_quantity_sums_saturate() {
        let listing = vec![
            item(items::ABYSSAL_PEARLS as i32, u32::MAX),
            item(items::ABYSSAL_PEARLS as i32, 7),
        ];
        let state = InventoryState::from_items(&listing);
        assert_eq!(state.pearls, u32::MAX);
        assert_eq!(state.empty_slots, 26);
    }

    #[test]
    fn test_full_inventory() {
        let listing = vec![item(items::GUARDIAN_ESSENCE as i32, 1); 28];
        let state = InventoryState::from_items(&listing);
        assert!(state.has_full_inventory);
        assert_eq!(state.empty_slots, 0);
    }

    #[test]
    fn test_summary_slots() {
        let slots = vec![
            slot(0, items::COLOSSAL_POUCH, 1),
            slot(1, items::GUARDIAN_ESSENCE, 1),
            slot(2, items::GUARDIAN_ESSENCE, 1),
            slot(3, 1444, 1),
            slot(4, 1458, 1),
            InventorySlot {
                hidden: true,
                ..slot(5, 1440, 1)
            },
        ];
        let ctx = MapContext {
            player: None,
            canvas_origin: Some(CanvasPoint::new(10, 20)),
        };
        let summary = summarize(&InventoryState::default(), &slots, 17, &ctx);

        assert_eq!(summary.pouch_essence, 17);
        let pouch = summary.colossal_pouch.unwrap();
        assert_eq!((pouch.canvas_x, pouch.canvas_y), (578, 226));
        assert_eq!((pouch.screen_x, pouch.screen_y), (Some(588), Some(246)));
        assert_eq!(summary.essence_slots.len(), 1);
        assert_eq!(summary.essence_slots[0].canvas_x, 620);
        let talismans: Vec<_> = summary.talismans.iter().map(|t| t.item_id).collect();
        assert_eq!(talismans, vec![1444, 1458]);
    }
}
