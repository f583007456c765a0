//! Essence pouch fill-level inference
//!
//! The colossal pouch's content is never reported by the client. It is
//! reconstructed from the guardian-essence count in the inventory: after a
//! fill or empty request, the next inventory change is attributed to the
//! pouch if it moves in the expected direction.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default pouch capacity in essence
pub const DEFAULT_POUCH_CAPACITY: u32 = 40;

/// Action requested on the pouch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PouchAction {
    /// Move essence from the inventory into the pouch
    Fill,
    /// Move essence from the pouch into the inventory
    Empty,
}

/// Inference state for one pouch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EssencePouch {
    capacity: u32,
    pending: Option<PouchAction>,
    baseline: u32,
    level: u32,
}

impl EssencePouch {
    /// Create an empty pouch with the given capacity
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            pending: None,
            baseline: 0,
            level: 0,
        }
    }

    /// Inferred essence count, always within `[0, capacity]`
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Pouch capacity
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Action awaiting its inventory change, if any
    pub fn pending(&self) -> Option<PouchAction> {
        self.pending
    }

    /// Record a fill/empty request with the current essence count as baseline
    ///
    /// A request made while another is pending replaces it.
    pub fn request(&mut self, action: PouchAction, current_quantity: u32) {
        if let Some(previous) = self.pending {
            debug!(?previous, ?action, "pouch request superseded");
        }
        self.pending = Some(action);
        self.baseline = current_quantity;
    }

    /// Attribute an inventory essence count to the pending action
    ///
    /// No-op when nothing is pending. Otherwise the pending action is
    /// consumed whether or not the count moved the expected way. Returns
    /// whether the inferred level changed.
    pub fn observe_quantity(&mut self, quantity: u32) -> bool {
        let Some(action) = self.pending.take() else {
            return false;
        };

        let before = self.level;
        match action {
            PouchAction::Fill if quantity < self.baseline => {
                let moved = (self.baseline - quantity).min(self.capacity - self.level);
                self.level = (self.level + moved).min(self.capacity);
            }
            PouchAction::Empty if quantity > self.baseline => {
                let moved = (quantity - self.baseline).min(self.level);
                self.level -= moved;
            }
            _ => {}
        }
        self.baseline = quantity;

        debug!(?action, before, after = self.level, "pouch inference");
        before != self.level
    }

    /// The pouch was reported empty by the game
    pub fn mark_emptied(&mut self) {
        self.level = 0;
    }

    /// Forget the inferred level and any pending request
    pub fn reset(&mut self) {
        self.pending = None;
        self.baseline = 0;
        self.level = 0;
    }
}

impl Default for EssencePouch {
    fn default() -> Self {
        Self::new(DEFAULT_POUCH_CAPACITY)
    }
}
