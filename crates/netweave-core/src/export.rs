// Export: remote network state back into a declarative document.

use std::collections::{HashMap, HashSet};

use netweave_api::types::{Agent, ConnectionDetail, RemoteNetwork};

use crate::error::ConfigureError;
use crate::model::{EndpointExport, NetworkSpec, Topology};
use crate::plane::ControlPlane;
use crate::transform::{self, ObservedConnection};

/// Export one remote network as a declarative document.
///
/// Connections are annotated with their service detail so enabled service
/// names survive the round trip. Endpoints in the network's scope with zero
/// connections are listed separately under `endpoints` so the export is a
/// complete superset of remote state. When exporting under an overriding
/// topology that disagrees with the stored one, the document gets
/// `ignore_configured_topology` so it can be reapplied as-is.
pub async fn export_network<P: ControlPlane>(
    plane: &P,
    all_agents: &HashMap<i64, Agent>,
    network: &RemoteNetwork,
    topology_override: Option<Topology>,
) -> Result<NetworkSpec, ConfigureError> {
    let mut net = transform::transform_network(network)?;

    let connections = plane.list_connections(Some(network.id)).await?;
    let ids: Vec<i64> = connections.iter().map(|connection| connection.id).collect();
    let mut details: HashMap<i64, ConnectionDetail> = if ids.is_empty() {
        HashMap::new()
    } else {
        plane
            .connection_services(&ids)
            .await?
            .into_iter()
            .map(|detail| (detail.connection_id, detail))
            .collect()
    };
    let observed: Vec<ObservedConnection> = connections
        .iter()
        .map(|connection| match details.remove(&connection.id) {
            Some(detail) => ObservedConnection::with_detail(connection, detail),
            None => ObservedConnection::bare(connection),
        })
        .collect();

    let topology = topology_override.unwrap_or(net.topology);
    let transformed = transform::transform_connections(all_agents, &observed, topology, true);
    if !transformed.is_empty() {
        net.connections = transformed;
    }
    if let Some(override_kind) = topology_override {
        if net.topology != override_kind {
            net.ignore_configured_topology = true;
        }
        net.topology = override_kind;
    }
    // Transport tuning is not part of an exported topology.
    net.use_sdn = None;

    let used: HashSet<i64> = observed
        .iter()
        .flat_map(|connection| [connection.agent_1.id, connection.agent_2.id])
        .collect();
    let mut members: Vec<&Agent> = all_agents
        .values()
        .filter(|agent| agent.network_ids.contains(&network.id))
        .collect();
    members.sort_by_key(|agent| agent.id);
    for agent in members {
        if used.contains(&agent.id) {
            continue;
        }
        net.endpoints.insert(
            agent.name.clone(),
            EndpointExport {
                id: agent.id,
                services: agent
                    .services
                    .iter()
                    .map(|service| service.name.clone())
                    .collect(),
                tags: agent.tags.iter().map(|tag| tag.name.clone()).collect(),
            },
        );
    }

    Ok(net)
}
