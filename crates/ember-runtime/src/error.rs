use crate::catalog::StateKind;
use crate::phase::Phase;

/// Errors surfaced while composing a runtime.
///
/// All of these are configuration mistakes; a build that returns one has
/// not mutated its target runtime.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("phase '{0}' was not requested; select it before appending systems")]
    PhaseNotRequested(Phase),

    #[error("system '{name}' is {actual} but was appended through the {declared} path")]
    StateClassificationMismatch {
        name: String,
        declared: StateKind,
        actual: StateKind,
    },

    #[error("system '{0}' is not present in the catalog")]
    UnknownSystem(String),
}
