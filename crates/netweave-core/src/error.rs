use thiserror::Error;

use crate::model::Topology;

/// Top-level error type for the reconciliation engine.
///
/// Configuration-shaped problems (validation, resolution, mismatches) are
/// recoverable per network: an interactive caller can report them and move on
/// to the next document. Control-plane failures always abort the enclosing
/// operation.
#[derive(Debug, Error)]
pub enum ConfigureError {
    /// The declarative document is malformed or violates a constraint.
    #[error("invalid configuration: {0}")]
    Validation(String),

    /// A symbolic reference could not be resolved to concrete endpoints.
    #[error("{0}")]
    Resolution(String),

    /// The remote network's topology disagrees with the configured one.
    #[error(
        "network topology mismatch: remote is {existing}, configured is {configured} \
         (set ignore_configured_topology to override)"
    )]
    TopologyMismatch {
        existing: Topology,
        configured: Topology,
    },

    /// A network name matched more than one remote network.
    #[error("network name {name:?} matches {count} remote networks")]
    AmbiguousNetwork { name: String, count: usize },

    /// Opaque failure bubbled up from the control-plane client.
    #[error("control plane request failed: {0}")]
    ControlPlane(#[from] netweave_api::Error),
}

impl ConfigureError {
    /// Returns `true` for problems scoped to one network document.
    ///
    /// Interactive callers report these and continue with the next document;
    /// control-plane failures are never recoverable and must propagate.
    pub fn is_config_problem(&self) -> bool {
        !matches!(self, Self::ControlPlane(_))
    }
}
