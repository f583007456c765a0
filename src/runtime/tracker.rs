//! Entity lifecycle tracking
//!
//! The [`EntityTracker`] is the only owner of entity presence. Spawn and
//! despawn notifications are reconciled into role slots:
//!
//! - single-valued roles hold the most recently spawned instance, and are
//!   cleared only by a despawn of that same instance;
//! - set-valued roles hold every live member, removed by exact identity.
//!
//! The tracker is not safe for concurrent mutation. It must be driven from a
//! single sequencing thread, one notification at a time.

use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

use super::catalog::{self, Cardinality, DedupRule, Role};
use super::entity::{Entity, EntityHandle, ObjectKind, ScreenShape};
use serde::{Deserialize, Serialize};

/// Per-step rendering data for one live entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityFrame {
    /// Instance handle
    pub handle: EntityHandle,
    /// Concrete representation
    pub kind: ObjectKind,
    /// Current on-screen outline
    #[serde(default)]
    pub shape: Option<ScreenShape>,
    /// Current animation id
    #[serde(default)]
    pub animation: Option<u32>,
}

/// Role slots for every tracked entity
#[derive(Debug, Default)]
pub struct EntityTracker {
    singles: BTreeMap<Role, Entity>,
    sets: BTreeMap<Role, Vec<Entity>>,
    active_guardians: Vec<EntityHandle>,
}

impl EntityTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a spawn notification
    ///
    /// Returns the role the entity was classified into, or `None` when its id
    /// is not one the tracker follows.
    pub fn on_spawn(&mut self, entity: Entity) -> Option<Role> {
        let role = catalog::role_for(entity.kind, entity.id)?;
        debug!(handle = %entity.handle, id = entity.id, ?role, "entity spawned");

        match role.cardinality() {
            Cardinality::Single => {
                self.singles.insert(role, entity);
            }
            Cardinality::Set => {
                let members = self.sets.entry(role).or_default();
                members.retain(|m| !m.same_instance(&entity) && !duplicates(role, m, &entity));
                members.push(entity);
            }
        }

        Some(role)
    }

    /// Record a despawn notification
    ///
    /// Removes `entity` from whichever slot holds that exact instance. A
    /// despawn for an instance that is not tracked is a no-op; returns whether
    /// anything was removed.
    pub fn on_despawn(&mut self, entity: &Entity) -> bool {
        let mut removed = false;

        self.singles.retain(|role, held| {
            let matches = held.same_instance(entity);
            if matches {
                debug!(handle = %entity.handle, ?role, "slot cleared");
            }
            removed |= matches;
            !matches
        });

        for members in self.sets.values_mut() {
            let before = members.len();
            members.retain(|m| !m.same_instance(entity));
            removed |= members.len() != before;
        }

        if removed {
            self.active_guardians.retain(|h| *h != entity.handle);
        }
        removed
    }

    /// Apply this step's rendering data
    ///
    /// Every tracked entity takes its shape and animation from its frame; an
    /// entity without a frame this step has neither.
    pub fn observe_frames(&mut self, frames: &[EntityFrame]) {
        let by_instance: HashMap<(EntityHandle, ObjectKind), &EntityFrame> =
            frames.iter().map(|f| ((f.handle, f.kind), f)).collect();

        let tracked = self
            .singles
            .values_mut()
            .chain(self.sets.values_mut().flatten());
        for entity in tracked {
            let frame = by_instance.get(&(entity.handle, entity.kind));
            entity.shape = frame.and_then(|f| f.shape.clone());
            entity.animation = frame.and_then(|f| f.animation);
        }
    }

    /// Recompute the active-guardian subset
    ///
    /// A guardian is active exactly when its current animation is
    /// `active_animation`. This is a level-triggered check, run once per step.
    pub fn refresh_active_guardians(&mut self, active_animation: u32) {
        self.active_guardians = self
            .members(Role::Guardian)
            .iter()
            .filter(|g| g.animation == Some(active_animation))
            .map(|g| g.handle)
            .collect();
    }

    /// Holder of a single-valued role
    pub fn single(&self, role: Role) -> Option<&Entity> {
        self.singles.get(&role)
    }

    /// Members of a set-valued role
    pub fn members(&self, role: Role) -> &[Entity] {
        self.sets.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Guardians found active by the last [`refresh_active_guardians`](Self::refresh_active_guardians)
    pub fn active_guardians(&self) -> impl Iterator<Item = &Entity> + '_ {
        let active: HashSet<EntityHandle> = self.active_guardians.iter().copied().collect();
        self.members(Role::Guardian)
            .iter()
            .filter(move |g| active.contains(&g.handle))
    }

    /// Total number of live tracked entities
    pub fn len(&self) -> usize {
        self.singles.len() + self.sets.values().map(Vec::len).sum::<usize>()
    }

    /// Whether nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the roles a region load invalidates
    pub fn clear_region(&mut self) {
        self.singles.retain(|role, _| !role.cleared_on_region_load());
        self.sets.retain(|role, _| !role.cleared_on_region_load());
        self.active_guardians.clear();
        debug!(remaining = self.len(), "region load cleared transient roles");
    }
}

// Ground features can respawn under a new id on the same tile.
// TODO: confirm whether same-tile replacement of cell tiles hides missed despawns.
fn duplicates(role: Role, existing: &Entity, incoming: &Entity) -> bool {
    match role.dedup_rule() {
        DedupRule::InstanceOnly => false,
        DedupRule::SameObjectId => existing.id == incoming.id,
        DedupRule::SameTile => existing.position.same_tile(&incoming.position),
    }
}
