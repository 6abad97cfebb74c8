// Edge-set and subnet-enablement diffing.
//
// Pure set algebra over canonical edge keys; the orchestrator decides what
// to do with the results. Edges compare as unordered pairs throughout.

use std::collections::HashSet;

use indexmap::IndexSet;
use netweave_api::types::{Connection, ConnectionAgentServices, ConnectionDetail, SubnetChange};

use crate::resolve::{ConnectionServices, Edge};

/// The edge an observed connection occupies.
pub fn connection_edge(connection: &Connection) -> Edge {
    Edge::new(connection.agent_1.id, connection.agent_2.id)
}

/// Desired-present edges that are not live yet.
pub fn connections_to_create(desired_present: &[Edge], current: &[Edge]) -> Vec<Edge> {
    let current_keys: HashSet<(i64, i64)> = current.iter().map(|e| e.key()).collect();
    desired_present
        .iter()
        .copied()
        .filter(|edge| !current_keys.contains(&edge.key()))
        .collect()
}

/// Desired-absent edges that are actually live and must be torn down.
pub fn connections_to_delete(desired_absent: &[Edge], current: &[Edge]) -> Vec<Edge> {
    let current_keys: HashSet<(i64, i64)> = current.iter().map(|e| e.key()).collect();
    desired_absent
        .iter()
        .copied()
        .filter(|edge| current_keys.contains(&edge.key()))
        .collect()
}

fn side_of(detail: &ConnectionDetail, agent_id: i64) -> Option<&ConnectionAgentServices> {
    if detail.agent_1.id == agent_id {
        Some(&detail.agent_1)
    } else if detail.agent_2.id == agent_id {
        Some(&detail.agent_2)
    } else {
        None
    }
}

/// Subnet ids implied by the service names one spec side declares, read from
/// the service definitions embedded in the observed connection.
fn declared_subnets(spec: &ConnectionServices, detail: &ConnectionDetail, agent_id: i64) -> Vec<i64> {
    let Some(side) = side_of(detail, agent_id) else {
        return Vec::new();
    };
    let Some(names) = spec.service_names_for(agent_id) else {
        return Vec::new();
    };
    side.services
        .iter()
        .filter(|service| names.contains(&service.name))
        .flat_map(|service| service.subnets.iter().map(|subnet| subnet.id))
        .collect()
}

/// Enable/disable deltas converging one connection to its declared services.
///
/// Flips for known subnets whose enabled flag disagrees with the target set
/// come first, followed by explicit enables for target subnets the
/// connection does not know about yet. An empty result means no remote call.
pub fn subnet_changes(spec: &ConnectionServices, detail: &ConnectionDetail) -> Vec<SubnetChange> {
    let mut target: IndexSet<i64> = IndexSet::new();
    target.extend(declared_subnets(spec, detail, spec.agent_1));
    target.extend(declared_subnets(spec, detail, spec.agent_2));

    let mut changes: Vec<SubnetChange> = detail
        .subnets
        .iter()
        .filter(|subnet| target.contains(&subnet.subnet_id) != subnet.is_enabled)
        .map(|subnet| SubnetChange {
            subnet_id: subnet.subnet_id,
            is_enabled: target.contains(&subnet.subnet_id),
        })
        .collect();

    let known: HashSet<i64> = detail.subnets.iter().map(|s| s.subnet_id).collect();
    changes.extend(
        target
            .iter()
            .filter(|id| !known.contains(id))
            .map(|&subnet_id| SubnetChange {
                subnet_id,
                is_enabled: true,
            }),
    );

    changes
}
