//! Ember Runtime - system registration and phase composition
//!
//! Given a catalog of discovered systems, decides which of them participate
//! in a runtime instance, which of the three phases (initialize, simulate,
//! present) they fall into, and in what fixed order they run. Composition
//! happens once at startup; the product is an immutable execution plan the
//! per-frame driver iterates thereafter.

mod builder;
mod catalog;
mod error;
mod filter;
mod phase;
mod placer;
mod profile;
mod runtime;

pub use builder::RuntimeBuilder;
pub use catalog::{Catalog, CatalogEntry, StateKind, SystemDescriptor};
pub use error::ComposeError;
pub use filter::FilterRules;
pub use phase::{Phase, PhaseSelector};
pub use placer::{DeclaredPhasePlacer, RootPlacer};
pub use profile::CompositionProfile;
pub use runtime::{FrameDriver, RuntimeInstance};
