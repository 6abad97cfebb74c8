// netweave-api: Async Rust client for the network-overlay control-plane API.

pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use client::PlaneClient;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
