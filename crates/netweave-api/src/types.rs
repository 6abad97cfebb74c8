// ── Control-plane wire types ──
//
// Response and request bodies for the overlay control-plane API. Every list
// response arrives wrapped in a `{ "data": [...] }` envelope; `PlaneClient`
// strips it before callers see the payload.

use serde::{Deserialize, Serialize};

/// Generic `{ data: T }` response envelope.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

// ── Agents (endpoint directory) ─────────────────────────────────────

/// A tag attached to an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTag {
    pub id: i64,
    pub name: String,
}

/// A subnet exposed by one agent service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSubnet {
    pub id: i64,
    #[serde(default)]
    pub is_active: bool,
}

/// A named application exposed by an agent, with its subnets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentService {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub subnets: Vec<ServiceSubnet>,
}

/// A full agent record from the directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<AgentTag>,
    #[serde(default)]
    pub services: Vec<AgentService>,
    /// Networks this agent participates in.
    #[serde(default)]
    pub network_ids: Vec<i64>,
}

// ── Connections ─────────────────────────────────────────────────────

/// One side of a connection (abbreviated agent reference).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionAgent {
    pub id: i64,
    pub name: String,
}

/// A live connection between two agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: i64,
    pub agent_1: ConnectionAgent,
    pub agent_2: ConnectionAgent,
}

/// Per-connection subnet enablement entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConnectionSubnet {
    pub subnet_id: i64,
    pub is_enabled: bool,
}

/// One side of a connection with its full service definitions attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionAgentServices {
    pub id: i64,
    #[serde(default)]
    pub services: Vec<AgentService>,
}

/// Service/subnet detail for one connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionDetail {
    pub connection_id: i64,
    pub agent_1: ConnectionAgentServices,
    pub agent_2: ConnectionAgentServices,
    #[serde(default)]
    pub subnets: Vec<ConnectionSubnet>,
}

/// A subnet enable/disable flip sent to the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetChange {
    pub subnet_id: i64,
    pub is_enabled: bool,
}

/// An agent-id pair in a create/delete request body.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AgentPair {
    pub agent_1_id: i64,
    pub agent_2_id: i64,
}

// ── Networks ────────────────────────────────────────────────────────

/// A remote network entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteNetwork {
    pub id: i64,
    pub name: String,
    /// Topology kind as stored remotely: `P2P`, `P2M`, or `MESH`.
    pub topology: String,
    #[serde(default)]
    pub use_sdn: bool,
}

/// Request body for network creation.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkCreate {
    pub name: String,
    pub topology: String,
    pub use_sdn: bool,
}
