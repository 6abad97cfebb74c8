// Symbolic reference resolution and topology expansion.
//
// Turns a declarative connection map into concrete edge sets: tag entries
// expand to endpoint entries, names resolve to ids, and the topology kind
// decides which pairs the map implies. The final present/absent split obeys
// two rules regardless of topology: an edge declared absent is never created
// even if also derived as present, and self-loops never survive.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;
use tracing::debug;

use crate::error::ConfigureError;
use crate::model::{ConnectionMap, Peer, PeerKind, PeerState, Topology};
use crate::plane::ControlPlane;

/// An unordered pair of endpoint ids.
///
/// The original orientation is preserved for control-plane calls, but
/// equality and hashing use the canonical `(min, max)` key, so `(a, b)` and
/// `(b, a)` are the same edge everywhere it matters.
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub a: i64,
    pub b: i64,
}

impl Edge {
    pub fn new(a: i64, b: i64) -> Self {
        Self { a, b }
    }

    /// Canonical ordered key for set membership.
    pub fn key(self) -> (i64, i64) {
        if self.a <= self.b {
            (self.a, self.b)
        } else {
            (self.b, self.a)
        }
    }

    /// The pair in its declared orientation.
    pub fn pair(self) -> (i64, i64) {
        (self.a, self.b)
    }

    pub fn is_loop(self) -> bool {
        self.a == self.b
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Edge {}

impl Hash for Edge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

/// Declared service names for both sides of a present edge.
///
/// Consumed once per reconciliation to compute subnet-enablement deltas
/// against the observed connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionServices {
    pub agent_1: i64,
    pub agent_2: i64,
    pub agent_1_service_names: Vec<String>,
    pub agent_2_service_names: Vec<String>,
}

impl ConnectionServices {
    fn from_pair(edge: Edge, src: &Peer, dst: &Peer) -> Self {
        Self {
            agent_1: edge.a,
            agent_2: edge.b,
            agent_1_service_names: src.services.names(),
            agent_2_service_names: dst.services.names(),
        }
    }

    pub fn edge(&self) -> Edge {
        Edge::new(self.agent_1, self.agent_2)
    }

    /// Service names declared for the given side, `None` if the id is not
    /// part of this spec.
    pub fn service_names_for(&self, agent_id: i64) -> Option<&[String]> {
        if agent_id == self.agent_1 {
            Some(&self.agent_1_service_names)
        } else if agent_id == self.agent_2 {
            Some(&self.agent_2_service_names)
        } else {
            None
        }
    }
}

/// The edge sets implied by one connection map under one topology kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    pub present: Vec<Edge>,
    pub absent: Vec<Edge>,
    pub services: Vec<ConnectionServices>,
}

/// Per-session name-to-id resolution with a private memo.
///
/// A name resolves at most once per resolver lifetime; renames on the remote
/// side during a long-lived session would return stale ids, which callers
/// accept as a documented staleness caveat.
#[derive(Debug, Default)]
pub struct Resolver {
    cache: IndexMap<String, i64>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every name without a known id via the endpoint directory.
    ///
    /// Anything but exactly one match is a resolution failure, which fails
    /// the whole map: a single broken reference voids every edge derived in
    /// this pass rather than partially applying.
    async fn resolve_names<P: ControlPlane>(
        &mut self,
        plane: &P,
        names: IndexMap<String, Option<i64>>,
    ) -> Result<IndexMap<String, i64>, ConfigureError> {
        let mut resolved = IndexMap::with_capacity(names.len());
        for (name, known) in names {
            if let Some(id) = known {
                resolved.insert(name, id);
                continue;
            }
            if let Some(&id) = self.cache.get(&name) {
                resolved.insert(name, id);
                continue;
            }
            let matches = plane.find_agents_by_name(&name).await?;
            if matches.len() != 1 {
                return Err(ConfigureError::Resolution(format!(
                    "could not resolve endpoint name {name:?}: found {} matches",
                    matches.len()
                )));
            }
            debug!(name = %name, id = matches[0].id, "resolved endpoint");
            self.cache.insert(name.clone(), matches[0].id);
            resolved.insert(name, matches[0].id);
        }
        Ok(resolved)
    }
}

/// The id a connection-map entry carries on its own, without a lookup.
///
/// Endpoint entries may carry an explicit id; id entries parse their key;
/// tag entries never resolve directly and must be expanded first.
pub fn peer_id(name: &str, peer: &Peer) -> Option<i64> {
    match peer.kind {
        PeerKind::Endpoint => peer.id,
        PeerKind::Id => name.parse().ok(),
        PeerKind::Tag => None,
    }
}

/// Expand tag entries of a connection map into endpoint entries.
///
/// Two-pass merge: first every tag expands into a staging map where an
/// absent entry overrides a present one for the same endpoint (but never the
/// reverse), then literal entries overlay the staging map so an explicit
/// entry always wins over a tag-derived one.
pub async fn expand_tags<P: ControlPlane>(
    plane: &P,
    entries: &ConnectionMap,
) -> Result<ConnectionMap, ConfigureError> {
    let mut items = ConnectionMap::new();

    for (name, peer) in entries {
        if peer.kind != PeerKind::Tag {
            continue;
        }
        let agents = plane.find_agents_by_tag(name).await?;
        if agents.is_empty() {
            return Err(ConfigureError::Resolution(format!(
                "could not find endpoints by the tag {name:?}"
            )));
        }
        for agent in agents {
            let replace = match items.get(&agent.name) {
                None => true,
                Some(existing) => {
                    peer.state == PeerState::Absent && existing.state == PeerState::Present
                }
            };
            if replace {
                items.insert(
                    agent.name.clone(),
                    Peer {
                        kind: PeerKind::Endpoint,
                        id: Some(agent.id),
                        state: peer.state,
                        services: peer.services.clone(),
                        connect_to: ConnectionMap::new(),
                    },
                );
            }
        }
    }

    for (name, peer) in entries {
        if peer.kind != PeerKind::Tag {
            items.insert(name.clone(), peer.clone());
        }
    }

    Ok(items)
}

/// Derive the edge sets implied by a connection map under a topology kind.
pub async fn expand<P: ControlPlane>(
    plane: &P,
    resolver: &mut Resolver,
    topology: Topology,
    connections: &ConnectionMap,
) -> Result<Expansion, ConfigureError> {
    match topology {
        Topology::P2p => expand_p2p(plane, resolver, connections).await,
        Topology::P2m => expand_p2m(plane, resolver, connections).await,
        Topology::Mesh => expand_mesh(plane, resolver, connections).await,
    }
}

type SymbolicPair = ((String, Peer), (String, Peer));

fn is_absent_pair(src: &Peer, dst: &Peer) -> bool {
    src.state == PeerState::Absent || dst.state == PeerState::Absent
}

async fn expand_p2p<P: ControlPlane>(
    plane: &P,
    resolver: &mut Resolver,
    connections: &ConnectionMap,
) -> Result<Expansion, ConfigureError> {
    let mut names: IndexMap<String, Option<i64>> = IndexMap::new();
    let mut present: Vec<SymbolicPair> = Vec::new();
    let mut absent: Vec<SymbolicPair> = Vec::new();

    for (src_name, src) in connections {
        // Only the first target counts for point-to-point.
        let Some((dst_name, dst)) = src.connect_to.first() else {
            continue;
        };
        names.insert(src_name.clone(), peer_id(src_name, src));
        names.insert(dst_name.clone(), peer_id(dst_name, dst));

        let pair = ((src_name.clone(), src.clone()), (dst_name.clone(), dst.clone()));
        if is_absent_pair(src, dst) {
            absent.push(pair);
        } else {
            present.push(pair);
        }
    }

    let agents = resolver.resolve_names(plane, names).await?;
    resolve_present_absent(&agents, &present, &absent)
}

async fn expand_p2m<P: ControlPlane>(
    plane: &P,
    resolver: &mut Resolver,
    connections: &ConnectionMap,
) -> Result<Expansion, ConfigureError> {
    let mut names: IndexMap<String, Option<i64>> = IndexMap::new();
    let mut present: Vec<SymbolicPair> = Vec::new();
    let mut absent: Vec<SymbolicPair> = Vec::new();

    for (src_name, src) in connections {
        if src.connect_to.is_empty() {
            continue;
        }
        let targets = expand_tags(plane, &src.connect_to).await?;
        names.insert(src_name.clone(), peer_id(src_name, src));

        for (dst_name, dst) in &targets {
            names.insert(dst_name.clone(), peer_id(dst_name, dst));
            let pair = ((src_name.clone(), src.clone()), (dst_name.clone(), dst.clone()));
            if is_absent_pair(src, dst) {
                absent.push(pair);
            } else {
                present.push(pair);
            }
        }
    }

    let agents = resolver.resolve_names(plane, names).await?;
    resolve_present_absent(&agents, &present, &absent)
}

async fn expand_mesh<P: ControlPlane>(
    plane: &P,
    resolver: &mut Resolver,
    connections: &ConnectionMap,
) -> Result<Expansion, ConfigureError> {
    let entries = expand_tags(plane, connections).await?;

    let names: IndexMap<String, Option<i64>> = entries
        .iter()
        .map(|(name, peer)| (name.clone(), peer_id(name, peer)))
        .collect();

    let mut present: Vec<SymbolicPair> = Vec::new();
    let mut absent: Vec<SymbolicPair> = Vec::new();

    // Connections are bidirectional, so every unordered 2-combination.
    let items: Vec<(&String, &Peer)> = entries.iter().collect();
    for (i, (src_name, src)) in items.iter().enumerate() {
        for (dst_name, dst) in &items[i + 1..] {
            let pair = (
                ((*src_name).clone(), (*src).clone()),
                ((*dst_name).clone(), (*dst).clone()),
            );
            if is_absent_pair(src, dst) {
                absent.push(pair);
            } else {
                present.push(pair);
            }
        }
    }

    let agents = resolver.resolve_names(plane, names).await?;
    resolve_present_absent(&agents, &present, &absent)
}

/// Map symbolic pairs to id edges and apply the absent-wins and no-self-loop
/// rules. Service specs are built only for surviving present edges.
fn resolve_present_absent(
    agents: &IndexMap<String, i64>,
    present: &[SymbolicPair],
    absent: &[SymbolicPair],
) -> Result<Expansion, ConfigureError> {
    let lookup = |name: &str| -> Result<i64, ConfigureError> {
        agents.get(name).copied().ok_or_else(|| {
            ConfigureError::Resolution(format!("endpoint {name:?} was not resolved"))
        })
    };

    let mut absent_edges = Vec::with_capacity(absent.len());
    for ((src_name, _), (dst_name, _)) in absent {
        absent_edges.push(Edge::new(lookup(src_name)?, lookup(dst_name)?));
    }
    let absent_keys: HashSet<(i64, i64)> = absent_edges.iter().map(|e| e.key()).collect();

    let mut present_edges = Vec::with_capacity(present.len());
    let mut services = Vec::with_capacity(present.len());
    for ((src_name, src), (dst_name, dst)) in present {
        let edge = Edge::new(lookup(src_name)?, lookup(dst_name)?);
        if edge.is_loop() || absent_keys.contains(&edge.key()) {
            continue;
        }
        present_edges.push(edge);
        services.push(ConnectionServices::from_pair(edge, src, dst));
    }

    Ok(Expansion {
        present: present_edges,
        absent: absent_edges,
        services,
    })
}
