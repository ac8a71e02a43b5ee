use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the three fixed top-level execution stages of a frame.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Initialize,
    Simulate,
    Present,
}

impl Phase {
    /// All phases in execution order.
    pub const ALL: [Phase; 3] = [Phase::Initialize, Phase::Simulate, Phase::Present];

    /// Built-in category tag of the engine's own systems for this phase.
    pub fn default_category(self) -> &'static str {
        match self {
            Phase::Initialize => "core.initialize",
            Phase::Simulate => "core.simulate",
            Phase::Present => "core.present",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Initialize => "initialize",
            Phase::Simulate => "simulate",
            Phase::Present => "present",
        };
        write!(f, "{name}")
    }
}

/// Which phases a build requests. All off by default; a phase that is never
/// selected gets no group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseSelector {
    initialize: bool,
    simulate: bool,
    present: bool,
}

impl PhaseSelector {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            initialize: true,
            simulate: true,
            present: true,
        }
    }

    /// Mark a phase as requested. Idempotent.
    pub fn select(&mut self, phase: Phase) {
        match phase {
            Phase::Initialize => self.initialize = true,
            Phase::Simulate => self.simulate = true,
            Phase::Present => self.present = true,
        }
    }

    pub fn is_selected(&self, phase: Phase) -> bool {
        match phase {
            Phase::Initialize => self.initialize,
            Phase::Simulate => self.simulate,
            Phase::Present => self.present,
        }
    }

    /// Requested phases in execution order.
    pub fn selected(&self) -> impl Iterator<Item = Phase> + '_ {
        Phase::ALL.into_iter().filter(|&p| self.is_selected(p))
    }
}
