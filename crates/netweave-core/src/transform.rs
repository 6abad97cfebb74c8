// Inverse transform: observed connections back into declarative form.
//
// Used by export, and by the update flow (with tag grouping disabled) to
// reduce live remote state to the same shape the configured document has so
// both sides can be expanded and diffed identically.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use indexmap::{IndexMap, IndexSet};
use netweave_api::types::{Agent, Connection, ConnectionAgent, ConnectionDetail, RemoteNetwork};
use tracing::warn;

use crate::error::ConfigureError;
use crate::model::{ConnectionMap, NetworkSpec, Peer, PeerKind, PeerState, ServiceList, Topology};
use crate::resolve::Edge;

/// A live connection, optionally annotated with its service/subnet detail.
///
/// The update flow works from bare connections (no detail, so no enabled
/// services); export attaches details first so service names survive the
/// round trip.
#[derive(Debug, Clone)]
pub struct ObservedConnection {
    pub id: i64,
    pub agent_1: ConnectionAgent,
    pub agent_2: ConnectionAgent,
    pub detail: Option<ConnectionDetail>,
}

impl ObservedConnection {
    pub fn bare(connection: &Connection) -> Self {
        Self {
            id: connection.id,
            agent_1: connection.agent_1.clone(),
            agent_2: connection.agent_2.clone(),
            detail: None,
        }
    }

    pub fn with_detail(connection: &Connection, detail: ConnectionDetail) -> Self {
        Self {
            detail: Some(detail),
            ..Self::bare(connection)
        }
    }

    pub fn edge(&self) -> Edge {
        Edge::new(self.agent_1.id, self.agent_2.id)
    }
}

/// Enabled service names for each side of an observed connection.
///
/// A service counts as enabled when any of its subnets is enabled on the
/// connection. Without detail both sides are empty.
pub fn transform_connection_services(
    connection: &ObservedConnection,
) -> (IndexSet<String>, IndexSet<String>) {
    let Some(detail) = &connection.detail else {
        return (IndexSet::new(), IndexSet::new());
    };
    let enabled: BTreeSet<i64> = detail
        .subnets
        .iter()
        .filter(|subnet| subnet.is_enabled)
        .map(|subnet| subnet.subnet_id)
        .collect();

    let side = |agent_id: i64| -> IndexSet<String> {
        let services = if detail.agent_1.id == agent_id {
            &detail.agent_1.services
        } else if detail.agent_2.id == agent_id {
            &detail.agent_2.services
        } else {
            return IndexSet::new();
        };
        services
            .iter()
            .filter(|service| service.subnets.iter().any(|s| enabled.contains(&s.id)))
            .map(|service| service.name.clone())
            .collect()
    };

    (side(connection.agent_1.id), side(connection.agent_2.id))
}

fn endpoint_peer(id: i64, services: IndexSet<String>) -> Peer {
    Peer {
        kind: PeerKind::Endpoint,
        id: Some(id),
        state: PeerState::Present,
        services: ServiceList::Many(services.into_iter().collect()),
        connect_to: ConnectionMap::new(),
    }
}

/// Reconstruct a point-to-point connection map.
///
/// Each edge needs a unique source key. Four attempts per edge: source by
/// name, swap sides, source by id, swap and source by id. An edge that
/// collides on all four is dropped with a warning since P2P cannot
/// represent it.
pub fn transform_p2p_connections(connections: &[ObservedConnection]) -> ConnectionMap {
    let mut transformed = ConnectionMap::new();

    for connection in connections {
        let (services_1, services_2) = transform_connection_services(connection);
        let mut src = &connection.agent_1;
        let mut dst = &connection.agent_2;
        let mut src_services = services_1;
        let mut dst_services = services_2;
        let mut src_key = src.name.clone();
        let mut src_kind = PeerKind::Endpoint;

        if transformed.contains_key(&src_key) {
            std::mem::swap(&mut src, &mut dst);
            std::mem::swap(&mut src_services, &mut dst_services);
            src_key = src.name.clone();
        }
        if transformed.contains_key(&src_key) {
            src_key = src.id.to_string();
            src_kind = PeerKind::Id;
        }
        if transformed.contains_key(&src_key) {
            std::mem::swap(&mut src, &mut dst);
            std::mem::swap(&mut src_services, &mut dst_services);
            src_key = src.id.to_string();
        }
        if transformed.contains_key(&src_key) {
            warn!(
                "could not represent connection from {} to {} as P2P; \
                 consider exporting as P2M or MESH",
                src.name, dst.name
            );
            continue;
        }

        let mut connect_to = ConnectionMap::new();
        connect_to.insert(dst.name.clone(), endpoint_peer(dst.id, dst_services));
        transformed.insert(
            src_key,
            Peer {
                kind: src_kind,
                id: Some(src.id),
                state: PeerState::Present,
                services: ServiceList::Many(src_services.into_iter().collect()),
                connect_to,
            },
        );
    }

    transformed
}

/// Group agent ids by tag name; untagged agents land in the `None` bucket.
fn tag_membership<'a, I>(agents: I) -> BTreeMap<Option<String>, BTreeSet<i64>>
where
    I: IntoIterator<Item = &'a Agent>,
{
    let mut tags: BTreeMap<Option<String>, BTreeSet<i64>> = BTreeMap::new();
    for agent in agents {
        if agent.tags.is_empty() {
            tags.entry(None).or_default().insert(agent.id);
        } else {
            for tag in &agent.tags {
                tags.entry(Some(tag.name.clone()))
                    .or_default()
                    .insert(agent.id);
            }
        }
    }
    tags
}

/// Compact endpoint entries into tag references.
///
/// An endpoint group folds into a tag only when it exactly equals that tag's
/// complete membership; a partial match keeps individual entries so a
/// reapplied export cannot silently widen the set. Endpoints captured by a
/// qualifying tag are removed from the flat listing.
pub fn group_agents_by_tags(
    all_agents: &HashMap<i64, Agent>,
    endpoints: &ConnectionMap,
) -> ConnectionMap {
    let full_membership = tag_membership(all_agents.values());

    let mut subset: Vec<&Agent> = Vec::new();
    let mut services: HashMap<i64, Vec<String>> = HashMap::new();
    for (name, peer) in endpoints {
        let Some(id) = peer.id else {
            warn!("endpoint {name:?} has no id; skipping tag grouping for it");
            continue;
        };
        let Some(agent) = all_agents.get(&id) else {
            warn!("endpoint {name:?} (id {id}) is not in the agent directory");
            continue;
        };
        subset.push(agent);
        services.insert(id, peer.services.names());
    }
    let subset_membership = tag_membership(subset.iter().copied());

    let mut grouped = ConnectionMap::new();
    let mut captured: BTreeSet<i64> = BTreeSet::new();
    for (tag, members) in &subset_membership {
        let qualifies = match tag {
            None => false,
            Some(name) => full_membership.get(&Some(name.clone())) == Some(members),
        };
        if qualifies {
            let mut union: IndexSet<String> = IndexSet::new();
            for id in members {
                if let Some(names) = services.get(id) {
                    union.extend(names.iter().cloned());
                }
            }
            if let Some(name) = tag {
                grouped.insert(
                    name.clone(),
                    Peer {
                        kind: PeerKind::Tag,
                        id: None,
                        state: PeerState::Present,
                        services: ServiceList::Many(union.into_iter().collect()),
                        connect_to: ConnectionMap::new(),
                    },
                );
                captured.extend(members.iter().copied());
            }
        } else {
            for id in members {
                if let Some(agent) = all_agents.get(id) {
                    grouped.insert(
                        agent.name.clone(),
                        endpoint_peer(
                            *id,
                            services.get(id).cloned().unwrap_or_default().into_iter().collect(),
                        ),
                    );
                }
            }
        }
    }

    grouped
        .into_iter()
        .filter(|(_, peer)| {
            peer.kind == PeerKind::Tag || peer.id.is_none_or(|id| !captured.contains(&id))
        })
        .collect()
}

/// Reconstruct a point-to-multipoint (star) connection map.
///
/// An endpoint with exactly one neighbor is treated as a spoke (and skipped
/// as a source) only when that neighbor itself has more than one neighbor;
/// a stray 1-to-1 edge stays a source of its own.
pub fn transform_p2m_connections(
    all_agents: &HashMap<i64, Agent>,
    connections: &[ObservedConnection],
    group_tags: bool,
) -> ConnectionMap {
    let mut names: HashMap<i64, String> = HashMap::new();
    let mut links: IndexMap<i64, IndexSet<i64>> = IndexMap::new();
    let mut services: HashMap<(i64, i64), (IndexSet<String>, IndexSet<String>)> = HashMap::new();

    for connection in connections {
        let (a, b) = (connection.agent_1.id, connection.agent_2.id);
        names.insert(a, connection.agent_1.name.clone());
        names.insert(b, connection.agent_2.name.clone());
        // Map both directions; the API may report hub and spokes either way.
        links.entry(a).or_default().insert(b);
        links.entry(b).or_default().insert(a);
        let (services_a, services_b) = transform_connection_services(connection);
        services.insert((a, b), (services_a.clone(), services_b.clone()));
        services.insert((b, a), (services_b, services_a));
    }

    let mut transformed = ConnectionMap::new();
    for (src, dsts) in &links {
        if dsts.len() == 1 {
            let neighbor = dsts[0];
            if links.get(&neighbor).is_some_and(|n| n.len() > 1) {
                continue;
            }
        }
        let Some(src_name) = names.get(src) else {
            continue;
        };

        let mut connect_to = ConnectionMap::new();
        let mut src_services: IndexSet<String> = IndexSet::new();
        for dst in dsts {
            let Some(dst_name) = names.get(dst) else {
                continue;
            };
            let (forward, reverse) = services.get(&(*src, *dst)).cloned().unwrap_or_default();
            src_services.extend(forward);
            connect_to.insert(dst_name.clone(), endpoint_peer(*dst, reverse));
        }

        transformed.insert(
            src_name.clone(),
            Peer {
                kind: PeerKind::Endpoint,
                id: Some(*src),
                state: PeerState::Present,
                services: ServiceList::Many(src_services.into_iter().collect()),
                connect_to: if group_tags {
                    group_agents_by_tags(all_agents, &connect_to)
                } else {
                    connect_to
                },
            },
        );
    }

    transformed
}

/// Reconstruct a mesh connection map.
///
/// Assumes full interconnection: one entry per endpoint, with the union of
/// its enabled services across all observed edges. Reapplying the export
/// therefore produces a complete mesh even if the observed state had gaps.
pub fn transform_mesh_connections(
    all_agents: &HashMap<i64, Agent>,
    connections: &[ObservedConnection],
    group_tags: bool,
) -> ConnectionMap {
    let mut names: IndexMap<i64, String> = IndexMap::new();
    let mut services: HashMap<i64, IndexSet<String>> = HashMap::new();

    for connection in connections {
        let (a, b) = (connection.agent_1.id, connection.agent_2.id);
        names.insert(a, connection.agent_1.name.clone());
        names.insert(b, connection.agent_2.name.clone());
        let (services_a, services_b) = transform_connection_services(connection);
        services.entry(a).or_default().extend(services_a);
        services.entry(b).or_default().extend(services_b);
    }

    let mut transformed = ConnectionMap::new();
    for (id, name) in &names {
        transformed.insert(
            name.clone(),
            endpoint_peer(*id, services.remove(id).unwrap_or_default()),
        );
    }

    if group_tags {
        group_agents_by_tags(all_agents, &transformed)
    } else {
        transformed
    }
}

/// Dispatch on topology kind.
pub fn transform_connections(
    all_agents: &HashMap<i64, Agent>,
    connections: &[ObservedConnection],
    topology: Topology,
    group_tags: bool,
) -> ConnectionMap {
    match topology {
        Topology::P2p => transform_p2p_connections(connections),
        Topology::P2m => transform_p2m_connections(all_agents, connections, group_tags),
        Topology::Mesh => transform_mesh_connections(all_agents, connections, group_tags),
    }
}

/// A remote network entity as a declarative document skeleton.
pub fn transform_network(network: &RemoteNetwork) -> Result<NetworkSpec, ConfigureError> {
    let topology: Topology = network.topology.parse().map_err(|_| {
        ConfigureError::Validation(format!(
            "network {:?} has unsupported topology {:?}",
            network.name, network.topology
        ))
    })?;
    Ok(NetworkSpec {
        name: network.name.clone(),
        id: Some(network.id),
        state: PeerState::Present,
        topology,
        use_sdn: Some(network.use_sdn),
        ignore_configured_topology: false,
        connections: ConnectionMap::new(),
        endpoints: IndexMap::new(),
    })
}
