//! `netweave export`: render remote networks as declarative documents.

use std::collections::HashMap;

use netweave_api::PlaneClient;
use netweave_api::types::{Agent, RemoteNetwork};
use netweave_core::{Topology, export_network};

use crate::cli::{ExportArgs, TopologyArg};
use crate::error::CliError;

pub async fn handle(plane: &PlaneClient, args: &ExportArgs) -> Result<(), CliError> {
    let all_agents: HashMap<i64, Agent> = plane
        .list_agents()
        .await?
        .into_iter()
        .map(|agent| (agent.id, agent))
        .collect();

    let networks = select_networks(plane, &args.networks).await?;
    let topology = args.topology.map(|t| match t {
        TopologyArg::P2p => Topology::P2p,
        TopologyArg::P2m => Topology::P2m,
        TopologyArg::Mesh => Topology::Mesh,
    });

    let mut specs = Vec::with_capacity(networks.len());
    for network in &networks {
        specs.push(
            export_network(plane, &all_agents, network, topology)
                .await
                .map_err(CliError::from)?,
        );
    }

    let rendered = if args.json {
        let mut text = serde_json::to_string_pretty(&specs)?;
        text.push('\n');
        text
    } else {
        let mut text = String::new();
        for spec in &specs {
            text.push_str("---\n");
            text.push_str(&serde_yaml::to_string(spec)?);
        }
        text
    };

    match &args.output {
        Some(path) => std::fs::write(path, rendered)?,
        None => print!("{rendered}"),
    }
    Ok(())
}

/// All networks, or each named one resolved by name or id.
async fn select_networks(
    plane: &PlaneClient,
    keys: &[String],
) -> Result<Vec<RemoteNetwork>, CliError> {
    if keys.is_empty() {
        return Ok(plane.list_networks().await?);
    }
    let mut selected = Vec::with_capacity(keys.len());
    for key in keys {
        let mut matches = plane.find_networks(key).await?;
        match matches.len() {
            0 => {
                return Err(CliError::NetworkNotFound {
                    identifier: key.clone(),
                });
            }
            1 => selected.push(matches.remove(0)),
            count => {
                return Err(CliError::Validation {
                    field: "network".into(),
                    reason: format!("{count} networks match {key:?}; address it by id"),
                });
            }
        }
    }
    Ok(selected)
}
