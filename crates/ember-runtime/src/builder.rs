use tracing::{debug, info};

use crate::catalog::{Catalog, StateKind, SystemDescriptor};
use crate::error::ComposeError;
use crate::filter::FilterRules;
use crate::phase::{Phase, PhaseSelector};
use crate::placer::{DeclaredPhasePlacer, RootPlacer};
use crate::runtime::{FrameDriver, RuntimeInstance};

struct ManualAppend {
    phase: Phase,
    name: String,
    declared: StateKind,
}

/// The composition engine.
///
/// A single-use configuration object: chain calls to select phases, opt
/// categories in, exclude systems, and append systems manually, then finish
/// with one of the `build` variants. Configuration calls commute except
/// that the manual append order within one phase is the execution order of
/// those appends.
///
/// Automatic inclusion always lands before manual appends in every phase,
/// and manual appends against a phase that ends up unselected fail the
/// whole build without touching the target runtime.
pub struct RuntimeBuilder<'a> {
    catalog: &'a Catalog,
    phases: PhaseSelector,
    rules: FilterRules,
    manual: Vec<ManualAppend>,
    placer: Box<dyn RootPlacer>,
}

impl<'a> RuntimeBuilder<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            phases: PhaseSelector::none(),
            rules: FilterRules::new(),
            manual: Vec::new(),
            placer: Box::new(DeclaredPhasePlacer),
        }
    }

    /// Request one phase. Idempotent.
    pub fn select_phase(mut self, phase: Phase) -> Self {
        self.phases.select(phase);
        self
    }

    /// Request all three phases and opt in each phase's built-in category.
    pub fn select_all_defaults(mut self) -> Self {
        for phase in Phase::ALL {
            self.phases.select(phase);
            self.rules.include_category(phase.default_category());
        }
        self
    }

    /// Opt a category in for automatic inclusion.
    pub fn include_category(mut self, category: impl Into<String>) -> Self {
        self.rules.include_category(category);
        self
    }

    /// Exclude a system from automatic inclusion by exact name.
    pub fn exclude_name(mut self, name: impl Into<String>) -> Self {
        self.rules.exclude_name(name);
        self
    }

    /// Exclude a system from automatic inclusion by descriptor reference.
    pub fn exclude_descriptor(mut self, descriptor: &SystemDescriptor) -> Self {
        self.rules.exclude_descriptor(descriptor);
        self
    }

    pub fn exclude_descriptors<'d>(
        mut self,
        descriptors: impl IntoIterator<Item = &'d SystemDescriptor>,
    ) -> Self {
        for descriptor in descriptors {
            self.rules.exclude_descriptor(descriptor);
        }
        self
    }

    /// Append a stateful system to a phase, after automatic inclusion.
    ///
    /// The named system must be registered as managed; the mismatch is
    /// caught at build time.
    pub fn append_managed(mut self, phase: Phase, name: impl Into<String>) -> Self {
        self.manual.push(ManualAppend {
            phase,
            name: name.into(),
            declared: StateKind::Managed,
        });
        self
    }

    /// Append a value-like system to a phase, after automatic inclusion.
    pub fn append_unmanaged(mut self, phase: Phase, name: impl Into<String>) -> Self {
        self.manual.push(ManualAppend {
            phase,
            name: name.into(),
            declared: StateKind::Unmanaged,
        });
        self
    }

    /// Replace the root-placement collaborator.
    pub fn with_placer(mut self, placer: impl RootPlacer + 'static) -> Self {
        self.placer = Box::new(placer);
        self
    }

    /// Compose a fresh runtime.
    pub fn build(self) -> Result<RuntimeInstance, ComposeError> {
        let mut runtime = RuntimeInstance::new();
        self.apply(&mut runtime)?;
        Ok(runtime)
    }

    /// Compose into an existing runtime, tearing down any group whose phase
    /// is not requested by this configuration.
    pub fn build_into(self, runtime: &mut RuntimeInstance) -> Result<(), ComposeError> {
        self.apply(runtime)
    }

    /// Compose a fresh runtime and hand it to the external driver.
    pub fn build_attached(self, driver: &mut dyn FrameDriver) -> Result<(), ComposeError> {
        let runtime = self.build()?;
        driver.attach(runtime);
        Ok(())
    }

    fn apply(self, runtime: &mut RuntimeInstance) -> Result<(), ComposeError> {
        // Validate the manual lists against the final configuration before
        // touching the runtime, so a failed build leaves it untouched.
        for append in &self.manual {
            if !self.phases.is_selected(append.phase) {
                return Err(ComposeError::PhaseNotRequested(append.phase));
            }
            let entry = self
                .catalog
                .get(&append.name)
                .ok_or_else(|| ComposeError::UnknownSystem(append.name.clone()))?;
            let actual = entry.descriptor().kind;
            if actual != append.declared {
                return Err(ComposeError::StateClassificationMismatch {
                    name: append.name.clone(),
                    declared: append.declared,
                    actual,
                });
            }
        }

        // The full catalog is filtered exactly once per build.
        let candidates = self.rules.select(self.catalog);
        debug!(
            candidates = candidates.len(),
            catalog = self.catalog.len(),
            "catalog filtered"
        );

        // Root-level placement: candidates enter the shared instance table
        // without touching any phase group.
        for entry in &candidates {
            runtime.materialize(entry);
        }

        // Create or tear down each phase group, unconditionally per phase.
        for phase in Phase::ALL {
            if self.phases.is_selected(phase) {
                runtime.ensure_phase(phase);
            } else {
                runtime.drop_phase(phase);
            }
        }

        // Phase routing of the candidates belongs to the placer.
        self.placer.place(&candidates, runtime);

        // Manual appends last, in declaration order.
        for append in &self.manual {
            let entry = self
                .catalog
                .get(&append.name)
                .ok_or_else(|| ComposeError::UnknownSystem(append.name.clone()))?;
            runtime.append(append.phase, entry)?;
        }

        info!(
            runtime = %runtime.id(),
            phases = runtime.phases().count(),
            systems = runtime.instance_count(),
            "runtime composed"
        );
        Ok(())
    }
}
