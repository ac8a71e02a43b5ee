use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::system::{System, SystemFn, TickContext};

/// How a [`PhaseGroup`] orders its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortPolicy {
    /// First-successful-append order. Never re-sorted for the lifetime of
    /// the group, even when members carry ordering constraints.
    Insertion,
    /// Stable topological order over the `after` constraints declared at
    /// append time. Unconstrained members keep their append order.
    Declared,
}

/// A long-lived stateful system instance, shared between a runtime's lookup
/// table and the phase groups that reference it.
pub type SharedSystem = Arc<Mutex<Box<dyn System>>>;

/// A runnable slot in a phase group.
#[derive(Clone)]
pub enum SystemCell {
    /// Created once per identity, holds internal state across every tick.
    Stateful(SharedSystem),
    /// Cheap value-like handle with no state of its own.
    Stateless(SystemFn),
}

impl SystemCell {
    pub fn stateful(system: Box<dyn System>) -> Self {
        Self::Stateful(Arc::new(Mutex::new(system)))
    }

    /// Run the underlying system once.
    pub fn run(&self, ctx: &mut TickContext) {
        match self {
            SystemCell::Stateful(cell) => cell.lock().run(ctx),
            SystemCell::Stateless(f) => f(ctx),
        }
    }

    pub fn is_stateful(&self) -> bool {
        matches!(self, SystemCell::Stateful(_))
    }

    /// Whether two cells refer to the same underlying instance.
    pub fn shares_instance(&self, other: &SystemCell) -> bool {
        match (self, other) {
            (SystemCell::Stateful(a), SystemCell::Stateful(b)) => Arc::ptr_eq(a, b),
            (SystemCell::Stateless(a), SystemCell::Stateless(b)) => a == b,
            _ => false,
        }
    }
}

impl std::fmt::Debug for SystemCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SystemCell::Stateful(_) => f.write_str("SystemCell::Stateful"),
            SystemCell::Stateless(_) => f.write_str("SystemCell::Stateless"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("ordering constraints in group '{group}' form a cycle involving '{system}'")]
    OrderingCycle { group: String, system: String },
}

#[derive(Debug)]
struct Slot {
    name: String,
    after: Vec<String>,
    cell: SystemCell,
}

/// An ordered container of systems executed together within one phase.
///
/// Appends are idempotent per identity: re-adding a name already present is
/// a no-op and the first position is kept. Iteration order depends on the
/// group's [`SortPolicy`]; constraints named in `after` that are absent from
/// the group match nothing.
#[derive(Debug)]
pub struct PhaseGroup {
    label: String,
    policy: SortPolicy,
    slots: Vec<Slot>,
}

impl PhaseGroup {
    pub fn new(label: impl Into<String>, policy: SortPolicy) -> Self {
        Self {
            label: label.into(),
            policy,
            slots: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn policy(&self) -> SortPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.iter().any(|s| s.name == name)
    }

    /// Member names in execution order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|s| s.name.as_str())
    }

    /// Append a system with no ordering constraints.
    ///
    /// Returns `false` if the name is already present.
    pub fn append(&mut self, name: impl Into<String>, cell: SystemCell) -> bool {
        let name = name.into();
        if self.contains(&name) {
            debug!(system = name, group = self.label, "already scheduled, skipping");
            return false;
        }
        self.slots.push(Slot {
            name,
            after: Vec::new(),
            cell,
        });
        if self.policy == SortPolicy::Declared {
            // A constraint-free append only adds outgoing edges and cannot
            // introduce a cycle.
            self.reorder();
        }
        true
    }

    /// Append a system that must run after the named members.
    ///
    /// Under [`SortPolicy::Insertion`] the constraints are recorded but
    /// never applied. Under [`SortPolicy::Declared`] an append whose
    /// constraints would close a cycle is rejected and the group is left
    /// unchanged.
    pub fn append_after(
        &mut self,
        name: impl Into<String>,
        after: Vec<String>,
        cell: SystemCell,
    ) -> Result<bool, ScheduleError> {
        let name = name.into();
        if self.contains(&name) {
            debug!(system = name, group = self.label, "already scheduled, skipping");
            return Ok(false);
        }
        self.slots.push(Slot {
            name: name.clone(),
            after,
            cell,
        });
        if self.policy == SortPolicy::Declared && !self.reorder() {
            self.slots.pop();
            return Err(ScheduleError::OrderingCycle {
                group: self.label.clone(),
                system: name,
            });
        }
        Ok(true)
    }

    /// Run all members in order on the given context.
    pub fn run_all(&self, ctx: &mut TickContext) {
        for slot in &self.slots {
            slot.cell.run(ctx);
        }
    }

    /// Stable topological sort over `after` edges. Among ready members the
    /// lowest current position goes first, so unconstrained members keep
    /// their relative order. Returns `false` without reordering if the
    /// constraints form a cycle.
    fn reorder(&mut self) -> bool {
        let n = self.slots.len();
        if n <= 1 {
            return true;
        }
        let index: HashMap<&str, usize> = self
            .slots
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.as_str(), i))
            .collect();
        let mut successors = vec![Vec::new(); n];
        let mut indegree = vec![0usize; n];
        for (i, slot) in self.slots.iter().enumerate() {
            for dep in &slot.after {
                if let Some(&p) = index.get(dep.as_str()) {
                    successors[p].push(i);
                    indegree[i] += 1;
                }
            }
        }
        let mut ready: BTreeSet<usize> = indegree
            .iter()
            .enumerate()
            .filter(|(_, &d)| d == 0)
            .map(|(i, _)| i)
            .collect();
        let mut order = Vec::with_capacity(n);
        while let Some(i) = ready.pop_first() {
            order.push(i);
            for &s in &successors[i] {
                indegree[s] -= 1;
                if indegree[s] == 0 {
                    ready.insert(s);
                }
            }
        }
        if order.len() != n {
            return false;
        }
        let mut taken: Vec<Option<Slot>> = self.slots.drain(..).map(Some).collect();
        self.slots = order.into_iter().filter_map(|i| taken[i].take()).collect();
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use super::*;

    fn tracer(log: &Arc<StdMutex<Vec<&'static str>>>, tag: &'static str) -> SystemCell {
        let log = log.clone();
        SystemCell::stateful(Box::new(move |_: &mut TickContext| {
            log.lock().unwrap().push(tag);
        }))
    }

    #[test]
    fn insertion_order_is_execution_order() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let mut group = PhaseGroup::new("simulate", SortPolicy::Insertion);
        assert!(group.append("a", tracer(&log, "a")));
        assert!(group.append("b", tracer(&log, "b")));
        assert!(group.append("c", tracer(&log, "c")));

        let mut ctx = TickContext::new();
        group.run_all(&mut ctx);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn duplicate_append_is_a_noop() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let mut group = PhaseGroup::new("simulate", SortPolicy::Insertion);
        assert!(group.append("x", tracer(&log, "x1")));
        assert!(group.append("y", tracer(&log, "y")));
        assert!(!group.append("x", tracer(&log, "x2")));

        assert_eq!(group.len(), 2);
        assert_eq!(group.names().collect::<Vec<_>>(), vec!["x", "y"]);

        let mut ctx = TickContext::new();
        group.run_all(&mut ctx);
        // The first instance keeps its slot.
        assert_eq!(*log.lock().unwrap(), vec!["x1", "y"]);
    }

    #[test]
    fn insertion_policy_ignores_constraints() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let mut group = PhaseGroup::new("simulate", SortPolicy::Insertion);
        group
            .append_after("late", vec!["early".to_string()], tracer(&log, "late"))
            .unwrap();
        assert!(group.append("early", tracer(&log, "early")));
        assert_eq!(group.names().collect::<Vec<_>>(), vec!["late", "early"]);
    }

    #[test]
    fn declared_policy_orders_by_constraints() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let mut group = PhaseGroup::new("simulate", SortPolicy::Declared);
        group
            .append_after("integrate", vec!["gather".to_string()], tracer(&log, "integrate"))
            .unwrap();
        assert!(group.append("gather", tracer(&log, "gather")));

        assert_eq!(
            group.names().collect::<Vec<_>>(),
            vec!["gather", "integrate"]
        );
        let mut ctx = TickContext::new();
        group.run_all(&mut ctx);
        assert_eq!(*log.lock().unwrap(), vec!["gather", "integrate"]);
    }

    #[test]
    fn declared_policy_rejects_cycles() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let mut group = PhaseGroup::new("simulate", SortPolicy::Declared);
        group
            .append_after("a", vec!["b".to_string()], tracer(&log, "a"))
            .unwrap();
        let err = group
            .append_after("b", vec!["a".to_string()], tracer(&log, "b"))
            .unwrap_err();
        assert!(matches!(err, ScheduleError::OrderingCycle { .. }));
        // The rejected member is not left behind.
        assert_eq!(group.names().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn stateful_cell_keeps_state_across_runs() {
        struct Counter {
            hits: u32,
        }
        impl System for Counter {
            fn run(&mut self, ctx: &mut TickContext) {
                self.hits += 1;
                ctx.store_mut().insert(self.hits);
            }
        }

        let mut group = PhaseGroup::new("simulate", SortPolicy::Insertion);
        group.append("counter", SystemCell::stateful(Box::new(Counter { hits: 0 })));

        let mut ctx = TickContext::new();
        group.run_all(&mut ctx);
        group.run_all(&mut ctx);
        assert_eq!(ctx.store().get::<u32>(), Some(&2));
    }

    #[test]
    fn shared_instance_identity() {
        let cell = SystemCell::stateful(Box::new(|_: &mut TickContext| {}));
        let clone = cell.clone();
        assert!(cell.shares_instance(&clone));

        let other = SystemCell::stateful(Box::new(|_: &mut TickContext| {}));
        assert!(!cell.shares_instance(&other));
    }
}
