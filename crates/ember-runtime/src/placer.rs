use tracing::debug;

use crate::catalog::CatalogEntry;
use crate::runtime::RuntimeInstance;

/// Routes filtered candidates from root level into phase groups.
///
/// The builder delegates to this exactly once per build, after the groups
/// exist and before any manual append. The engine itself never decides
/// which phase an auto-included system belongs to.
pub trait RootPlacer {
    fn place(&self, candidates: &[&CatalogEntry], runtime: &mut RuntimeInstance);
}

/// Stock placer: follow each candidate's declared phase affinity.
///
/// Candidates without an affinity, or whose declared phase was not
/// requested, stay at root level (instantiated but in no group).
pub struct DeclaredPhasePlacer;

impl RootPlacer for DeclaredPhasePlacer {
    fn place(&self, candidates: &[&CatalogEntry], runtime: &mut RuntimeInstance) {
        for entry in candidates {
            let Some(phase) = entry.descriptor().affinity else {
                continue;
            };
            if runtime.has_phase(phase) {
                runtime.append(phase, entry).ok();
            } else {
                debug!(
                    system = entry.name(),
                    %phase,
                    "declared phase not requested, leaving at root level"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use ember_ecs::TickContext;

    use crate::phase::Phase;

    use super::*;

    fn noop(_: &mut TickContext) {}

    fn simulate_only_runtime() -> RuntimeInstance {
        let mut rt = RuntimeInstance::new();
        rt.ensure_phase(Phase::Simulate);
        rt
    }

    #[test]
    fn routes_by_declared_affinity() {
        let mut rt = simulate_only_runtime();
        let simulate = CatalogEntry::unmanaged("sys::sim", "cat", noop).in_phase(Phase::Simulate);
        let rootless = CatalogEntry::unmanaged("sys::root", "cat", noop);
        rt.materialize(&simulate);
        rt.materialize(&rootless);

        DeclaredPhasePlacer.place(&[&simulate, &rootless], &mut rt);

        assert_eq!(
            rt.group(Phase::Simulate).unwrap().names().collect::<Vec<_>>(),
            vec!["sys::sim"]
        );
        // Still materialized, just not in any group.
        assert!(rt.system("sys::root").is_some());
    }

    #[test]
    fn unrequested_phase_is_skipped() {
        let mut rt = simulate_only_runtime();
        let present = CatalogEntry::unmanaged("sys::draw", "cat", noop).in_phase(Phase::Present);
        rt.materialize(&present);

        DeclaredPhasePlacer.place(&[&present], &mut rt);
        assert!(rt.group(Phase::Simulate).unwrap().is_empty());
        assert!(!rt.has_phase(Phase::Present));
    }
}
