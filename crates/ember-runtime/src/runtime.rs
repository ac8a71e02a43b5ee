use std::collections::{BTreeMap, HashMap};

use tracing::debug;
use uuid::Uuid;

use ember_ecs::{PhaseGroup, SortPolicy, SystemCell, TickContext};

use crate::catalog::CatalogEntry;
use crate::error::ComposeError;
use crate::phase::Phase;

/// The composed, ready-to-drive product of one build.
///
/// Owns up to three phase groups plus the instance table every group's
/// members are shared from. Get-or-create materialization means requesting
/// the same identity twice always yields the same instance, which is what
/// makes appends idempotent. Tearing down a group drops its ordering only;
/// instance teardown is the runtime's own lifetime.
#[derive(Debug)]
pub struct RuntimeInstance {
    id: Uuid,
    groups: BTreeMap<Phase, PhaseGroup>,
    instances: HashMap<String, SystemCell>,
}

impl RuntimeInstance {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            groups: BTreeMap::new(),
            instances: HashMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn has_phase(&self, phase: Phase) -> bool {
        self.groups.contains_key(&phase)
    }

    /// Phases with a live group, in execution order.
    pub fn phases(&self) -> impl Iterator<Item = Phase> + '_ {
        self.groups.keys().copied()
    }

    pub fn group(&self, phase: Phase) -> Option<&PhaseGroup> {
        self.groups.get(&phase)
    }

    pub fn group_mut(&mut self, phase: Phase) -> Option<&mut PhaseGroup> {
        self.groups.get_mut(&phase)
    }

    pub(crate) fn ensure_phase(&mut self, phase: Phase) {
        self.groups.entry(phase).or_insert_with(|| {
            debug!(%phase, "creating phase group");
            PhaseGroup::new(phase.to_string(), SortPolicy::Insertion)
        });
    }

    pub(crate) fn drop_phase(&mut self, phase: Phase) {
        if self.groups.remove(&phase).is_some() {
            debug!(%phase, "tearing down phase group");
        }
    }

    /// Get or create the shared instance for a catalog entry.
    pub fn materialize(&mut self, entry: &CatalogEntry) -> SystemCell {
        self.instances
            .entry(entry.name().to_string())
            .or_insert_with(|| entry.instantiate())
            .clone()
    }

    /// Append a catalog entry to a phase group.
    ///
    /// Fails with [`ComposeError::PhaseNotRequested`] if the phase has no
    /// group. Returns `false` when the identity was already present in the
    /// group (the append is a no-op).
    pub fn append(&mut self, phase: Phase, entry: &CatalogEntry) -> Result<bool, ComposeError> {
        if !self.groups.contains_key(&phase) {
            return Err(ComposeError::PhaseNotRequested(phase));
        }
        let cell = self.materialize(entry);
        let mut appended = false;
        if let Some(group) = self.groups.get_mut(&phase) {
            appended = group.append(entry.name(), cell);
        }
        Ok(appended)
    }

    /// Look up a materialized instance by identity.
    pub fn system(&self, name: &str) -> Option<&SystemCell> {
        self.instances.get(name)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Run one phase's group in order. A phase without a group is skipped.
    ///
    /// This is the surface the per-frame driver calls; groups are stable
    /// once composed and safe to iterate every frame.
    pub fn run_phase(&self, phase: Phase, ctx: &mut TickContext) {
        if let Some(group) = self.groups.get(&phase) {
            group.run_all(ctx);
        }
    }
}

impl Default for RuntimeInstance {
    fn default() -> Self {
        Self::new()
    }
}

/// External per-frame driver that takes ownership of a composed runtime.
pub trait FrameDriver {
    fn attach(&mut self, runtime: RuntimeInstance);
}
