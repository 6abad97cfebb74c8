// Declarative topology model.
//
// These types are the parsed form of the YAML/JSON documents users feed to
// `apply`, and the structure `export` writes back out. Unknown keys are
// tolerated on input so documents can carry operator annotations.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A connection map: endpoint name (or numeric id rendered as text) to its
/// declared peer configuration.
pub type ConnectionMap = IndexMap<String, Peer>;

/// Network topology kind.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(try_from = "String", into = "String")]
pub enum Topology {
    /// Each entry connects to exactly one target.
    P2p,
    /// Star shape: each entry connects to all of its targets.
    P2m,
    /// Every declared endpoint pairs with every other.
    Mesh,
}

impl TryFrom<String> for Topology {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Topology> for String {
    fn from(value: Topology) -> Self {
        value.to_string()
    }
}

/// Declared lifecycle intent for an endpoint, edge, or network.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PeerState {
    #[default]
    Present,
    Absent,
}

/// How a connection-map key is interpreted.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PeerKind {
    /// The key is an endpoint name, looked up in the directory.
    #[default]
    Endpoint,
    /// The key is a numeric endpoint id.
    Id,
    /// The key is a tag; it expands to every endpoint carrying it.
    Tag,
}

/// Service names enabled for one side of a link.
///
/// Accepts a bare string, a list of strings, or nothing (no filter).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceList {
    #[default]
    Unset,
    One(String),
    Many(Vec<String>),
}

impl ServiceList {
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// The declared service names, empty when unset.
    pub fn names(&self) -> Vec<String> {
        match self {
            Self::Unset => Vec::new(),
            Self::One(name) => vec![name.clone()],
            Self::Many(names) => names.clone(),
        }
    }
}

impl From<Vec<String>> for ServiceList {
    fn from(names: Vec<String>) -> Self {
        Self::Many(names)
    }
}

/// One entry of a connection map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Peer {
    #[serde(rename = "type", default)]
    pub kind: PeerKind,
    /// Explicit endpoint id, set in config or injected during resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub state: PeerState,
    #[serde(default, skip_serializing_if = "ServiceList::is_unset")]
    pub services: ServiceList,
    /// Nested targets; meaningful for P2P (one entry) and P2M (many).
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub connect_to: ConnectionMap,
}

/// An endpoint in scope of an exported network but touched by zero
/// connections, listed so the export is a complete superset of remote state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointExport {
    pub id: i64,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One declarative network document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub name: String,
    /// Forbidden when creating a network.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub state: PeerState,
    pub topology: Topology,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_sdn: Option<bool>,
    /// Downgrade a topology mismatch from an error to a warning.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ignore_configured_topology: bool,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub connections: ConnectionMap,
    /// Endpoints without connections, emitted on export only.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub endpoints: IndexMap<String, EndpointExport>,
}
