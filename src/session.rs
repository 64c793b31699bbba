//! Session-scoped coordinator for the loading simulator.
//!
//! Owns the container, the placed cargo collection, the pending batch queue
//! and the pallet layout for one simulator session. All scene state lives in
//! this one object, passed explicitly into each operation; the usage pattern
//! is single-session, single-writer.
//!
//! Every mutation of the cargo collection (load, add, move, delete) returns
//! the freshly recomputed collision set so the caller can restore-then-apply
//! its highlighting in the same turn.

use std::collections::BTreeSet;

use crate::auditor::audit_collisions;
use crate::model::{
    Batch, CargoItem, Container, PALLET_DIMENSIONS, Pallet, Shape, ValidationError, pallet_grid,
};
use crate::planner::{Overflow, PlannerConfig, plan_placements};
use crate::types::Vec3;

/// Errors surfaced by session operations.
///
/// All of them are recoverable: the session state is unchanged when an
/// operation fails.
#[derive(Debug, Clone)]
pub enum SessionError {
    Validation(ValidationError),
    UnknownItem(u64),
    UnknownBatch(u64),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Validation(err) => write!(f, "{}", err),
            SessionError::UnknownItem(id) => write!(f, "No cargo item with id {}", id),
            SessionError::UnknownBatch(id) => write!(f, "No batch with id {}", id),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<ValidationError> for SessionError {
    fn from(err: ValidationError) -> Self {
        SessionError::Validation(err)
    }
}

/// Result of a consume-all load run.
#[derive(Clone, Debug)]
pub struct LoadReport {
    /// Items materialized by this run, in placement order.
    pub created: Vec<CargoItem>,
    /// Capacity-exceeded report, if the container ran out of space.
    pub overflow: Option<Overflow>,
    /// Collision set after the run (normally empty for planned placements).
    pub collisions: BTreeSet<u64>,
}

/// Volume accounting for the current scene.
#[derive(Clone, Copy, Debug)]
pub struct SessionStats {
    pub container_volume: f64,
    pub cargo_volume: f64,
    pub pallet_volume: f64,
    /// Cargo volume as a percentage of container volume.
    pub occupancy_pct: f64,
    pub item_count: usize,
    pub pallet_count: usize,
}

/// One simulator session: container, cargo, batch queue, pallets.
#[derive(Clone, Debug)]
pub struct Session {
    container: Container,
    items: Vec<CargoItem>,
    batches: Vec<Batch>,
    pallets: Vec<Pallet>,
    pallet_qty: u32,
    next_item_id: u64,
    next_batch_id: u64,
    planner_config: PlannerConfig,
}

impl Session {
    /// Creates a session with the default 20 ft container and empty scene.
    pub fn new(planner_config: PlannerConfig) -> Self {
        Self {
            container: Container::default(),
            items: Vec::new(),
            batches: Vec::new(),
            pallets: Vec::new(),
            pallet_qty: 0,
            next_item_id: 0,
            next_batch_id: 0,
            planner_config,
        }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn items(&self) -> &[CargoItem] {
        &self.items
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn pallets(&self) -> &[Pallet] {
        &self.pallets
    }

    /// Replaces the container wholesale.
    ///
    /// Cargo positions are container-relative and become meaningless under
    /// new bounds, so all placed cargo is discarded. The pallet grid is
    /// re-laid for the new floor with the previously requested quantity.
    pub fn resize_container(&mut self, l: f64, w: f64, h: f64) -> Result<(), SessionError> {
        let container = Container::new(l, w, h)?;
        self.container = container;
        self.items.clear();
        self.pallets = pallet_grid(&self.container, self.pallet_qty);
        Ok(())
    }

    /// Appends a batch to the pending queue. Insertion order is placement
    /// priority.
    pub fn add_batch(
        &mut self,
        shape: Shape,
        qty: u32,
        color: String,
    ) -> Result<u64, SessionError> {
        let id = self.next_batch_id;
        let batch = Batch::new(id, shape, qty, color)?;
        self.next_batch_id += 1;
        self.batches.push(batch);
        Ok(id)
    }

    /// Removes a pending batch by id.
    pub fn remove_batch(&mut self, id: u64) -> Result<(), SessionError> {
        let before = self.batches.len();
        self.batches.retain(|b| b.id != id);
        if self.batches.len() == before {
            return Err(SessionError::UnknownBatch(id));
        }
        Ok(())
    }

    /// Consume-all: plans every pending batch, materializes the resulting
    /// cargo items and clears the queue.
    ///
    /// An empty queue is a no-op, not an error. On capacity-exceeded the
    /// partial placements up to the failure point are kept and the queue is
    /// still cleared; the report names the overflowing batch.
    pub fn load_all(&mut self) -> LoadReport {
        if self.batches.is_empty() {
            return LoadReport {
                created: Vec::new(),
                overflow: None,
                collisions: self.collisions(),
            };
        }

        let outcome = plan_placements(
            &self.container,
            &self.batches,
            self.pallet_offset(),
            &self.planner_config,
        );
        self.batches.clear();

        let mut created = Vec::with_capacity(outcome.placements.len());
        for placement in outcome.placements {
            let item = CargoItem {
                id: self.alloc_item_id(),
                shape: placement.shape,
                position: placement.position,
                color: placement.color,
            };
            created.push(item.clone());
            self.items.push(item);
        }

        LoadReport {
            created,
            overflow: outcome.overflow,
            collisions: self.collisions(),
        }
    }

    /// Manually places a single cargo item at an explicit position.
    pub fn add_item(
        &mut self,
        shape: Shape,
        position: Vec3,
        color: String,
    ) -> Result<(u64, BTreeSet<u64>), SessionError> {
        shape.validate()?;
        let id = self.alloc_item_id();
        self.items.push(CargoItem {
            id,
            shape,
            position,
            color,
        });
        Ok((id, self.collisions()))
    }

    /// Moves an item to a new position (manual drag). Dimensions stay
    /// immutable.
    pub fn move_item(&mut self, id: u64, position: Vec3) -> Result<BTreeSet<u64>, SessionError> {
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(SessionError::UnknownItem(id))?;
        item.position = position;
        Ok(self.collisions())
    }

    /// Deletes a single item by id.
    pub fn delete_item(&mut self, id: u64) -> Result<BTreeSet<u64>, SessionError> {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        if self.items.len() == before {
            return Err(SessionError::UnknownItem(id));
        }
        Ok(self.collisions())
    }

    /// Removes all placed cargo. Item ids are never reused afterwards.
    pub fn clear_items(&mut self) {
        self.items.clear();
    }

    /// Lays out `qty` pallets across the container floor.
    pub fn set_pallets(&mut self, qty: u32) {
        self.pallet_qty = qty;
        self.pallets = pallet_grid(&self.container, qty);
    }

    /// Deck height the planner must lift cargo by.
    pub fn pallet_offset(&self) -> f64 {
        if self.pallets.is_empty() {
            0.0
        } else {
            PALLET_DIMENSIONS.y
        }
    }

    /// Recomputes the pairwise collision set over all placed cargo.
    pub fn collisions(&self) -> BTreeSet<u64> {
        audit_collisions(&self.items)
    }

    /// Volume accounting for the stats panel.
    pub fn stats(&self) -> SessionStats {
        let container_volume = self.container.volume();
        let cargo_volume: f64 = self.items.iter().map(|item| item.shape.volume()).sum();
        let pallet_volume = self.pallets.len() as f64 * PALLET_DIMENSIONS.volume();
        let occupancy_pct = if container_volume > 0.0 {
            (cargo_volume / container_volume) * 100.0
        } else {
            0.0
        };

        SessionStats {
            container_volume,
            cargo_volume,
            pallet_volume,
            occupancy_pct,
            item_count: self.items.len(),
            pallet_count: self.pallets.len(),
        }
    }

    fn alloc_item_id(&mut self) -> u64 {
        let id = self.next_item_id;
        self.next_item_id += 1;
        id
    }
}
