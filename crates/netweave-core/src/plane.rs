// Control-plane seam.
//
// The engine talks to the remote overlay exclusively through this trait so
// tests can drive reconciliation against an in-memory fixture. `PlaneClient`
// is the production implementation.

use netweave_api::types::{
    Agent, Connection, ConnectionDetail, NetworkCreate, RemoteNetwork, SubnetChange,
};
use netweave_api::{Error, PlaneClient};

/// Operations the reconciliation engine needs from the overlay control plane.
///
/// Batch operations either return the complete result set or fail; the engine
/// never sees partial chunks. Failures surface as one opaque error type --
/// the engine does not interpret HTTP-level detail.
pub trait ControlPlane {
    /// All agents with their services and tags.
    async fn list_agents(&self) -> Result<Vec<Agent>, Error>;

    /// Agents whose name (or id rendered as text) matches exactly.
    async fn find_agents_by_name(&self, name: &str) -> Result<Vec<Agent>, Error>;

    /// All agents carrying the given tag.
    async fn find_agents_by_tag(&self, tag: &str) -> Result<Vec<Agent>, Error>;

    /// Live connections, optionally scoped to one network.
    async fn list_connections(&self, network_id: Option<i64>) -> Result<Vec<Connection>, Error>;

    /// Service/subnet detail for the given connection ids.
    async fn connection_services(&self, ids: &[i64]) -> Result<Vec<ConnectionDetail>, Error>;

    /// Create connections for the given agent-id pairs inside a network.
    async fn create_connections(
        &self,
        network_id: i64,
        pairs: &[(i64, i64)],
    ) -> Result<Vec<Connection>, Error>;

    /// Delete the connections identified by the given agent-id pairs.
    async fn delete_connections(&self, pairs: &[(i64, i64)]) -> Result<(), Error>;

    /// Apply subnet enable/disable changes to one connection.
    async fn update_connection_subnets(
        &self,
        connection_id: i64,
        changes: &[SubnetChange],
    ) -> Result<(), Error>;

    /// Networks matching the given name or numeric id.
    async fn find_networks(&self, key: &str) -> Result<Vec<RemoteNetwork>, Error>;

    /// Create a network, returning its id.
    async fn create_network(&self, descriptor: &NetworkCreate) -> Result<i64, Error>;

    /// Delete a network entity.
    async fn delete_network(&self, id: i64) -> Result<(), Error>;
}

impl ControlPlane for PlaneClient {
    async fn list_agents(&self) -> Result<Vec<Agent>, Error> {
        PlaneClient::list_agents(self).await
    }

    async fn find_agents_by_name(&self, name: &str) -> Result<Vec<Agent>, Error> {
        PlaneClient::find_agents_by_name(self, name).await
    }

    async fn find_agents_by_tag(&self, tag: &str) -> Result<Vec<Agent>, Error> {
        PlaneClient::find_agents_by_tag(self, tag).await
    }

    async fn list_connections(&self, network_id: Option<i64>) -> Result<Vec<Connection>, Error> {
        PlaneClient::list_connections(self, network_id).await
    }

    async fn connection_services(&self, ids: &[i64]) -> Result<Vec<ConnectionDetail>, Error> {
        PlaneClient::connection_services(self, ids).await
    }

    async fn create_connections(
        &self,
        network_id: i64,
        pairs: &[(i64, i64)],
    ) -> Result<Vec<Connection>, Error> {
        PlaneClient::create_connections(self, network_id, pairs).await
    }

    async fn delete_connections(&self, pairs: &[(i64, i64)]) -> Result<(), Error> {
        PlaneClient::delete_connections(self, pairs).await
    }

    async fn update_connection_subnets(
        &self,
        connection_id: i64,
        changes: &[SubnetChange],
    ) -> Result<(), Error> {
        PlaneClient::update_connection_subnets(self, connection_id, changes).await
    }

    async fn find_networks(&self, key: &str) -> Result<Vec<RemoteNetwork>, Error> {
        PlaneClient::find_networks(self, key).await
    }

    async fn create_network(&self, descriptor: &NetworkCreate) -> Result<i64, Error> {
        PlaneClient::create_network(self, descriptor).await
    }

    async fn delete_network(&self, id: i64) -> Result<(), Error> {
        PlaneClient::delete_network(self, id).await
    }
}
