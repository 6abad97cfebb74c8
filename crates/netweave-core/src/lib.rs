// netweave-core: Topology resolution and reconciliation engine.
//
// Data flow for apply: declarative spec -> resolve (names, tags) ->
// expand (topology -> edge sets) -> diff against observed state ->
// create/delete/subnet-update calls through the ControlPlane trait.
// Export runs the inverse: observed connections -> declarative spec.

pub mod configure;
pub mod diff;
pub mod error;
pub mod export;
pub mod model;
pub mod plane;
pub mod resolve;
pub mod transform;

// ── Primary re-exports ──────────────────────────────────────────────
pub use configure::{ApplyAction, ApplyOutcome, configure_network};
pub use error::ConfigureError;
pub use export::export_network;
pub use model::{
    ConnectionMap, EndpointExport, NetworkSpec, Peer, PeerKind, PeerState, ServiceList, Topology,
};
pub use plane::ControlPlane;
pub use resolve::{ConnectionServices, Edge, Expansion, Resolver};
