// Reconciliation orchestrator.
//
// Per network document: validate, look up the remote network, then branch
// into create / update / delete. Update deletes before creating so a pair
// moving between states never coexists with itself. No rollback: a
// control-plane failure mid-update leaves remote state where it stopped.

use std::collections::{HashMap, HashSet};

use netweave_api::types::{Agent, Connection, ConnectionDetail, NetworkCreate, RemoteNetwork};
use tracing::{info, warn};

use crate::diff;
use crate::error::ConfigureError;
use crate::model::{ConnectionMap, NetworkSpec, Peer, PeerKind, PeerState, Topology};
use crate::plane::ControlPlane;
use crate::resolve::{self, ConnectionServices, Edge, Resolver};
use crate::transform::{self, ObservedConnection};

/// What the orchestrator did with one network document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApplyAction {
    #[default]
    Unchanged,
    Created,
    Updated,
    Deleted,
}

/// Operation counts for one reconciled network document.
///
/// Under dry-run the counts describe what would have happened; no mutating
/// call was made and `changed()` reports false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub action: ApplyAction,
    pub connections_created: usize,
    pub connections_deleted: usize,
    pub connections_updated: usize,
    pub subnets_updated: usize,
    pub dry_run: bool,
}

impl ApplyOutcome {
    fn unchanged(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    /// Whether any operation was actually performed.
    pub fn changed(&self) -> bool {
        if self.dry_run {
            return false;
        }
        match self.action {
            ApplyAction::Unchanged => false,
            ApplyAction::Created | ApplyAction::Deleted => true,
            ApplyAction::Updated => {
                self.connections_created + self.connections_deleted + self.subnets_updated > 0
            }
        }
    }
}

fn numeric(name: &str) -> bool {
    name.parse::<i64>().is_ok()
}

fn validate_peer(name: &str, peer: &Peer, nested: bool) -> Result<(), ConfigureError> {
    match peer.kind {
        PeerKind::Id => {
            let Ok(parsed) = name.parse::<i64>() else {
                return Err(ConfigureError::Validation(format!(
                    "connection entry {name:?} has type \"id\" but is not numeric"
                )));
            };
            if peer.id.is_some_and(|id| id != parsed) {
                return Err(ConfigureError::Validation(format!(
                    "connection entry {name:?} declares id {:?} which contradicts its key",
                    peer.id
                )));
            }
        }
        PeerKind::Endpoint => {
            if numeric(name) {
                warn!(
                    "connection entry {name:?} looks numeric but has type \"endpoint\"; \
                     use type \"id\" to reference endpoints by id"
                );
            }
        }
        PeerKind::Tag => {}
    }

    if nested {
        if !peer.connect_to.is_empty() {
            warn!("connect_to nested under {name:?} is deeper than one level and is ignored");
        }
        return Ok(());
    }
    for (target_name, target) in &peer.connect_to {
        validate_peer(target_name, target, true)?;
    }
    Ok(())
}

/// Structural validation of a connection map, one `connect_to` level deep.
pub fn validate_connections(connections: &ConnectionMap) -> Result<(), ConfigureError> {
    for (name, peer) in connections {
        validate_peer(name, peer, false)?;
    }
    Ok(())
}

fn validate_spec(spec: &NetworkSpec) -> Result<(), ConfigureError> {
    if spec.name.trim().is_empty() {
        return Err(ConfigureError::Validation(
            "network name must not be empty".into(),
        ));
    }
    if spec.id.is_some_and(|id| id <= 0) {
        return Err(ConfigureError::Validation(format!(
            "network id must be positive, got {:?}",
            spec.id
        )));
    }
    validate_connections(&spec.connections)
}

fn pairs(edges: &[Edge]) -> Vec<(i64, i64)> {
    edges.iter().map(|edge| edge.pair()).collect()
}

/// Reconcile one network document against remote state.
pub async fn configure_network<P: ControlPlane>(
    plane: &P,
    resolver: &mut Resolver,
    spec: &NetworkSpec,
    dry_run: bool,
) -> Result<ApplyOutcome, ConfigureError> {
    validate_spec(spec)?;

    let key = spec
        .id
        .map_or_else(|| spec.name.clone(), |id| id.to_string());
    let mut matches = plane.find_networks(&key).await?;

    match (matches.len(), spec.state) {
        (0, PeerState::Present) => create_network(plane, resolver, spec, dry_run).await,
        (1, PeerState::Present) => {
            let network = matches.remove(0);
            update_network(plane, resolver, spec, &network, dry_run).await
        }
        (1, PeerState::Absent) => {
            let network = matches.remove(0);
            remove_network(plane, resolver, spec, &network, dry_run).await
        }
        (0, PeerState::Absent) => Ok(ApplyOutcome::unchanged(dry_run)),
        (count, _) => Err(ConfigureError::AmbiguousNetwork {
            name: spec.name.clone(),
            count,
        }),
    }
}

async fn create_network<P: ControlPlane>(
    plane: &P,
    resolver: &mut Resolver,
    spec: &NetworkSpec,
    dry_run: bool,
) -> Result<ApplyOutcome, ConfigureError> {
    if spec.id.is_some() {
        return Err(ConfigureError::Validation(format!(
            "network {:?} does not exist; an explicit id cannot be used when creating",
            spec.name
        )));
    }
    if matches!(spec.topology, Topology::P2p | Topology::P2m) {
        for (name, peer) in &spec.connections {
            if peer.connect_to.is_empty() {
                return Err(ConfigureError::Validation(format!(
                    "{} topology requires a connect_to on every entry, missing on {name:?}",
                    spec.topology
                )));
            }
        }
    }

    let expansion = resolve::expand(plane, resolver, spec.topology, &spec.connections).await?;
    if expansion.present.is_empty() {
        return Err(ConfigureError::Validation(format!(
            "network {:?} has no valid peers",
            spec.name
        )));
    }

    if dry_run {
        info!(
            network = %spec.name,
            connections = expansion.present.len(),
            "would create network"
        );
        return Ok(ApplyOutcome {
            action: ApplyAction::Created,
            connections_created: expansion.present.len(),
            dry_run: true,
            ..ApplyOutcome::default()
        });
    }

    let network_id = plane
        .create_network(&NetworkCreate {
            name: spec.name.clone(),
            topology: spec.topology.to_string(),
            use_sdn: spec.use_sdn.unwrap_or(false),
        })
        .await?;
    let created = plane
        .create_connections(network_id, &pairs(&expansion.present))
        .await?;
    info!(network = %spec.name, created = created.len(), "created connections");

    let (connections_updated, subnets_updated) =
        configure_connections(plane, &expansion.services, &created).await?;

    Ok(ApplyOutcome {
        action: ApplyAction::Created,
        connections_created: created.len(),
        connections_deleted: 0,
        connections_updated,
        subnets_updated,
        dry_run: false,
    })
}

async fn update_network<P: ControlPlane>(
    plane: &P,
    resolver: &mut Resolver,
    spec: &NetworkSpec,
    network: &RemoteNetwork,
    dry_run: bool,
) -> Result<ApplyOutcome, ConfigureError> {
    let existing: Topology = network.topology.parse().map_err(|_| {
        ConfigureError::Validation(format!(
            "network {:?} has unsupported topology {:?}",
            network.name, network.topology
        ))
    })?;
    if existing != spec.topology {
        if !spec.ignore_configured_topology {
            return Err(ConfigureError::TopologyMismatch {
                existing,
                configured: spec.topology,
            });
        }
        warn!(
            network = %spec.name,
            %existing,
            configured = %spec.topology,
            "overriding remote topology"
        );
        if existing == Topology::P2p {
            warn!(
                "overriding away from P2P changes how existing connections \
                 are interpreted; review the result carefully"
            );
        }
    }

    let connections = plane.list_connections(Some(network.id)).await?;
    let observed: Vec<ObservedConnection> =
        connections.iter().map(ObservedConnection::bare).collect();
    let all_agents: HashMap<i64, Agent> = plane
        .list_agents()
        .await?
        .into_iter()
        .map(|agent| (agent.id, agent))
        .collect();

    // Reduce live state to declarative form, then expand both sides the
    // same way so the diff compares like with like.
    let current_map =
        transform::transform_connections(&all_agents, &observed, spec.topology, false);
    let desired = resolve::expand(plane, resolver, spec.topology, &spec.connections).await?;
    let current = resolve::expand(plane, resolver, spec.topology, &current_map).await?;

    let to_create = diff::connections_to_create(&desired.present, &current.present);
    let to_delete = diff::connections_to_delete(&desired.absent, &current.present);

    if dry_run {
        // The transform assumes full interconnection for mesh and P2M, so
        // `to_delete` can exceed the live connection count. Count survivors
        // the same way the live path does instead of subtracting.
        let deleted_keys: HashSet<(i64, i64)> =
            to_delete.iter().map(|edge| edge.key()).collect();
        let surviving = connections
            .iter()
            .filter(|connection| !deleted_keys.contains(&diff::connection_edge(connection).key()))
            .count();
        info!(
            network = %spec.name,
            create = to_create.len(),
            delete = to_delete.len(),
            "dry run, no changes applied"
        );
        return Ok(ApplyOutcome {
            action: ApplyAction::Updated,
            connections_created: to_create.len(),
            connections_deleted: to_delete.len(),
            connections_updated: surviving + to_create.len(),
            subnets_updated: 0,
            dry_run: true,
        });
    }

    if !to_delete.is_empty() {
        plane.delete_connections(&pairs(&to_delete)).await?;
        info!(network = %spec.name, deleted = to_delete.len(), "removed connections");
    }
    let created = if to_create.is_empty() {
        Vec::new()
    } else {
        let created = plane
            .create_connections(network.id, &pairs(&to_create))
            .await?;
        info!(network = %spec.name, created = created.len(), "created connections");
        created
    };

    // Survivors are tracked by connection id, not by pair value, so
    // renumbering across calls cannot break the subtraction.
    let deleted_keys: HashSet<(i64, i64)> = to_delete.iter().map(|edge| edge.key()).collect();
    let deleted_ids: HashSet<i64> = connections
        .iter()
        .filter(|connection| deleted_keys.contains(&diff::connection_edge(connection).key()))
        .map(|connection| connection.id)
        .collect();
    let survivors: Vec<Connection> = connections
        .into_iter()
        .chain(created.iter().cloned())
        .filter(|connection| !deleted_ids.contains(&connection.id))
        .collect();

    let (connections_updated, subnets_updated) =
        configure_connections(plane, &desired.services, &survivors).await?;
    info!(
        network = %spec.name,
        connections = connections_updated,
        subnets = subnets_updated,
        "configured services"
    );

    Ok(ApplyOutcome {
        action: ApplyAction::Updated,
        connections_created: created.len(),
        connections_deleted: to_delete.len(),
        connections_updated,
        subnets_updated,
        dry_run: false,
    })
}

async fn remove_network<P: ControlPlane>(
    plane: &P,
    resolver: &mut Resolver,
    spec: &NetworkSpec,
    network: &RemoteNetwork,
    dry_run: bool,
) -> Result<ApplyOutcome, ConfigureError> {
    // Everything here is being torn down, so only the absent set matters.
    let expansion = resolve::expand(plane, resolver, spec.topology, &spec.connections).await?;

    if dry_run {
        info!(
            network = %spec.name,
            connections = expansion.absent.len(),
            "would delete network"
        );
        return Ok(ApplyOutcome {
            action: ApplyAction::Deleted,
            connections_deleted: expansion.absent.len(),
            dry_run: true,
            ..ApplyOutcome::default()
        });
    }

    if !expansion.absent.is_empty() {
        plane.delete_connections(&pairs(&expansion.absent)).await?;
    }
    plane.delete_network(network.id).await?;
    info!(network = %spec.name, deleted = expansion.absent.len(), "deleted network");

    Ok(ApplyOutcome {
        action: ApplyAction::Deleted,
        connections_deleted: expansion.absent.len(),
        dry_run: false,
        ..ApplyOutcome::default()
    })
}

/// Reconcile declared services onto live connections.
///
/// Specs whose pair has no matching live connection are reported and
/// skipped; a connection already in the target state costs no remote call.
pub async fn configure_connections<P: ControlPlane>(
    plane: &P,
    services: &[ConnectionServices],
    connections: &[Connection],
) -> Result<(usize, usize), ConfigureError> {
    let ids: Vec<i64> = connections.iter().map(|connection| connection.id).collect();
    if ids.is_empty() {
        return Ok((0, 0));
    }
    let details = plane.connection_services(&ids).await?;
    let by_edge: HashMap<(i64, i64), &ConnectionDetail> = details
        .iter()
        .map(|detail| (Edge::new(detail.agent_1.id, detail.agent_2.id).key(), detail))
        .collect();

    let mut connections_updated = 0;
    let mut subnets_updated = 0;
    for spec in services {
        let Some(detail) = by_edge.get(&spec.edge().key()) else {
            warn!(
                "connection from {} to {} was not created",
                spec.agent_1, spec.agent_2
            );
            continue;
        };
        connections_updated += 1;
        let changes = diff::subnet_changes(spec, detail);
        if changes.is_empty() {
            continue;
        }
        plane
            .update_connection_subnets(detail.connection_id, &changes)
            .await?;
        subnets_updated += changes.len();
    }

    Ok((connections_updated, subnets_updated))
}
