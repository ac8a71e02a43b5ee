//! Ember ECS - scheduling substrate
//!
//! The pieces every runtime shares: the [`System`] trait, the per-tick
//! context with its shared [`Store`], and the [`PhaseGroup`] container that
//! executes systems in a fixed order.

mod schedule;
mod store;
mod system;

pub use schedule::{PhaseGroup, ScheduleError, SharedSystem, SortPolicy, SystemCell};
pub use store::Store;
pub use system::{System, SystemFn, TickContext};
