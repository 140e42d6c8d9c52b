//! Per-building resource behaviours.
//!
//! A [`ResourceBehavior`] is the strategy a building kind uses to put
//! resource into, or take it out of, its pins between balance steps. The
//! [`Behaviors`] registry owns one boxed behaviour per entity and runs them
//! in entity order against any [`PinBuffers`] implementation.

use std::collections::BTreeMap;

use gridflow_core::fixed::Ticks;
use gridflow_core::id::EntityId;
use log::warn;

use crate::buffers::PinBuffers;
use crate::error::NetError;
use crate::node::NodeRef;

pub trait ResourceBehavior: std::fmt::Debug {
    /// Human-readable name, used in logs.
    fn name(&self) -> &str;

    /// Called once per tick, before the network balances.
    fn update(
        &mut self,
        entity: EntityId,
        buffers: &mut dyn PinBuffers,
        tick: Ticks,
    ) -> Result<(), NetError>;
}

/// Adds a fixed amount to one pin every tick (a generator, a pump).
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantSource {
    pub slot: usize,
    pub rate: f64,
}

impl ResourceBehavior for ConstantSource {
    fn name(&self) -> &str {
        "constant_source"
    }

    fn update(
        &mut self,
        entity: EntityId,
        buffers: &mut dyn PinBuffers,
        _tick: Ticks,
    ) -> Result<(), NetError> {
        buffers.adjust_buffer(NodeRef::slot(entity, self.slot), self.rate)?;
        Ok(())
    }
}

/// Drains up to a fixed amount from one pin every tick and keeps a running
/// total of what it received.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantSink {
    pub slot: usize,
    pub rate: f64,
    pub consumed: f64,
}

impl ConstantSink {
    pub fn new(slot: usize, rate: f64) -> Self {
        Self {
            slot,
            rate,
            consumed: 0.0,
        }
    }
}

impl ResourceBehavior for ConstantSink {
    fn name(&self) -> &str {
        "constant_sink"
    }

    fn update(
        &mut self,
        entity: EntityId,
        buffers: &mut dyn PinBuffers,
        _tick: Ticks,
    ) -> Result<(), NetError> {
        let taken = buffers.adjust_buffer(NodeRef::slot(entity, self.slot), -self.rate)?;
        self.consumed += -taken;
        Ok(())
    }
}

/// Behaviours keyed by the entity they drive.
#[derive(Debug, Default)]
pub struct Behaviors {
    entries: BTreeMap<EntityId, Box<dyn ResourceBehavior>>,
}

impl Behaviors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `behavior` to `entity`, replacing any previous one.
    pub fn insert(&mut self, entity: EntityId, behavior: Box<dyn ResourceBehavior>) {
        self.entries.insert(entity, behavior);
    }

    pub fn remove(&mut self, entity: EntityId) -> Option<Box<dyn ResourceBehavior>> {
        self.entries.remove(&entity)
    }

    pub fn get(&self, entity: EntityId) -> Option<&dyn ResourceBehavior> {
        self.entries.get(&entity).map(|b| b.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run every behaviour once. Behaviours whose entity or slot no longer
    /// exists are dropped; the count of dropped entries is returned.
    pub fn run(&mut self, buffers: &mut dyn PinBuffers, tick: Ticks) -> usize {
        let mut dead = Vec::new();
        for (&entity, behavior) in &mut self.entries {
            if let Err(err) = behavior.update(entity, buffers, tick) {
                warn!("dropping {} behaviour on {entity:?}: {err}", behavior.name());
                dead.push(entity);
            }
        }
        for entity in &dead {
            self.entries.remove(entity);
        }
        dead.len()
    }
}
