use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use ember_ecs::{System, SystemCell, SystemFn};

use crate::phase::Phase;

/// State classification of a system, fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateKind {
    /// Carries internal mutable state; instantiated once and reused for the
    /// life of the runtime.
    Managed,
    /// Value-like; a stateless handle whose persistent state, if any, lives
    /// in the shared store.
    Unmanaged,
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateKind::Managed => write!(f, "managed"),
            StateKind::Unmanaged => write!(f, "unmanaged"),
        }
    }
}

/// Identifies one unit of per-frame logic. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SystemDescriptor {
    /// Fully-qualified name, e.g. `physics::integrate_bodies`.
    pub name: String,
    /// Namespace-like tag the catalog filter matches against.
    pub category: String,
    /// State classification.
    pub kind: StateKind,
    /// Phase the system declares for root-level auto placement, if any.
    pub affinity: Option<Phase>,
}

type ManagedCtor = Box<dyn Fn() -> Box<dyn System> + Send + Sync>;

enum Ctor {
    Managed(ManagedCtor),
    Unmanaged(SystemFn),
}

/// A catalog entry: a descriptor plus the constructor that materializes it.
///
/// The constructor variant stamps the matching [`StateKind`] on the
/// descriptor, so the classification and the instantiation path cannot
/// disagree at registration.
pub struct CatalogEntry {
    descriptor: SystemDescriptor,
    ctor: Ctor,
}

impl CatalogEntry {
    /// Register a stateful system with its factory.
    pub fn managed(
        name: impl Into<String>,
        category: impl Into<String>,
        ctor: impl Fn() -> Box<dyn System> + Send + Sync + 'static,
    ) -> Self {
        Self {
            descriptor: SystemDescriptor {
                name: name.into(),
                category: category.into(),
                kind: StateKind::Managed,
                affinity: None,
            },
            ctor: Ctor::Managed(Box::new(ctor)),
        }
    }

    /// Register a value-like system by its run function.
    pub fn unmanaged(
        name: impl Into<String>,
        category: impl Into<String>,
        run: SystemFn,
    ) -> Self {
        Self {
            descriptor: SystemDescriptor {
                name: name.into(),
                category: category.into(),
                kind: StateKind::Unmanaged,
                affinity: None,
            },
            ctor: Ctor::Unmanaged(run),
        }
    }

    /// Declare the phase this system wants during auto placement.
    pub fn in_phase(mut self, phase: Phase) -> Self {
        self.descriptor.affinity = Some(phase);
        self
    }

    pub fn descriptor(&self) -> &SystemDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub(crate) fn instantiate(&self) -> SystemCell {
        match &self.ctor {
            Ctor::Managed(ctor) => SystemCell::stateful(ctor()),
            Ctor::Unmanaged(run) => SystemCell::Stateless(*run),
        }
    }
}

/// The full set of discoverable systems available to a build.
///
/// Supplied by the host and expected to outlive every build that reads it.
/// Registration order is preserved and is the order automatic placement
/// sees. Registering a name twice keeps the first entry.
#[derive(Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: CatalogEntry) -> &mut Self {
        if self.get(entry.name()).is_some() {
            warn!(system = entry.name(), "already registered, keeping first entry");
            return self;
        }
        self.entries.push(entry);
        self
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &SystemDescriptor> {
        self.entries.iter().map(|e| e.descriptor())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use ember_ecs::TickContext;

    use super::*;

    fn noop(_: &mut TickContext) {}

    #[test]
    fn register_and_lookup() {
        let mut catalog = Catalog::new();
        catalog
            .register(CatalogEntry::managed("a::one", "cat.a", || {
                Box::new(|_: &mut TickContext| {})
            }))
            .register(CatalogEntry::unmanaged("b::two", "cat.b", noop));

        assert_eq!(catalog.len(), 2);
        let entry = catalog.get("a::one").unwrap();
        assert_eq!(entry.descriptor().kind, StateKind::Managed);
        assert_eq!(entry.descriptor().category, "cat.a");
        assert!(catalog.get("missing").is_none());
    }

    #[test]
    fn duplicate_registration_keeps_first() {
        let mut catalog = Catalog::new();
        catalog
            .register(CatalogEntry::unmanaged("a::one", "cat.a", noop))
            .register(CatalogEntry::managed("a::one", "cat.b", || {
                Box::new(|_: &mut TickContext| {})
            }));

        assert_eq!(catalog.len(), 1);
        let entry = catalog.get("a::one").unwrap();
        assert_eq!(entry.descriptor().kind, StateKind::Unmanaged);
        assert_eq!(entry.descriptor().category, "cat.a");
    }

    #[test]
    fn constructor_stamps_classification() {
        let managed = CatalogEntry::managed("m", "c", || Box::new(|_: &mut TickContext| {}));
        let unmanaged = CatalogEntry::unmanaged("u", "c", noop);
        assert_eq!(managed.descriptor().kind, StateKind::Managed);
        assert_eq!(unmanaged.descriptor().kind, StateKind::Unmanaged);
        assert!(managed.instantiate().is_stateful());
        assert!(!unmanaged.instantiate().is_stateful());
    }

    #[test]
    fn declared_affinity() {
        let entry =
            CatalogEntry::unmanaged("u", "c", noop).in_phase(Phase::Present);
        assert_eq!(entry.descriptor().affinity, Some(Phase::Present));
    }
}
