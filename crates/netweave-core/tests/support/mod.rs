// In-memory control plane for integration tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Mutex;

use netweave_api::Error;
use netweave_api::types::{
    Agent, AgentService, AgentTag, Connection, ConnectionAgent, ConnectionDetail, NetworkCreate,
    RemoteNetwork, ServiceSubnet, SubnetChange,
};
use netweave_core::ControlPlane;

/// A mutating call recorded by the mock, in invocation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateNetwork(String),
    DeleteNetwork(i64),
    CreateConnections {
        network_id: i64,
        pairs: Vec<(i64, i64)>,
    },
    DeleteConnections(Vec<(i64, i64)>),
    UpdateSubnets {
        connection_id: i64,
        changes: Vec<SubnetChange>,
    },
}

#[derive(Debug, Default)]
struct State {
    connections: Vec<Connection>,
    details_by_pair: HashMap<(i64, i64), ConnectionDetail>,
    next_connection_id: i64,
    calls: Vec<Call>,
}

/// Fixture-backed `ControlPlane`. Mutations are recorded, and created
/// connections get fresh ids so survivor tracking by id is exercised.
#[derive(Debug, Default)]
pub struct MockPlane {
    pub agents: Vec<Agent>,
    pub networks: Vec<RemoteNetwork>,
    state: Mutex<State>,
}

pub fn agent(id: i64, name: &str) -> Agent {
    Agent {
        id,
        name: name.to_string(),
        tags: Vec::new(),
        services: Vec::new(),
        network_ids: Vec::new(),
    }
}

pub fn tagged_agent(id: i64, name: &str, tags: &[&str]) -> Agent {
    Agent {
        tags: tags
            .iter()
            .enumerate()
            .map(|(i, tag)| AgentTag {
                id: id * 10 + i64::try_from(i).unwrap(),
                name: (*tag).to_string(),
            })
            .collect(),
        ..agent(id, name)
    }
}

pub fn service(id: i64, name: &str, subnets: &[i64]) -> AgentService {
    AgentService {
        id,
        name: name.to_string(),
        subnets: subnets
            .iter()
            .map(|&id| ServiceSubnet {
                id,
                is_active: true,
            })
            .collect(),
    }
}

fn canonical(a: i64, b: i64) -> (i64, i64) {
    if a <= b { (a, b) } else { (b, a) }
}

impl MockPlane {
    pub fn new(agents: Vec<Agent>, networks: Vec<RemoteNetwork>) -> Self {
        Self {
            agents,
            networks,
            state: Mutex::new(State {
                next_connection_id: 100,
                ..State::default()
            }),
        }
    }

    /// Seed a live connection between two agents.
    pub fn seed_connection(&self, id: i64, a: i64, b: i64) {
        let connection = Connection {
            id,
            agent_1: self.agent_ref(a),
            agent_2: self.agent_ref(b),
        };
        self.state.lock().unwrap().connections.push(connection);
    }

    /// Attach service/subnet detail to the connection covering a pair.
    pub fn seed_detail(&self, a: i64, b: i64, detail: ConnectionDetail) {
        self.state
            .lock()
            .unwrap()
            .details_by_pair
            .insert(canonical(a, b), detail);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.calls().len()
    }

    fn agent_ref(&self, id: i64) -> ConnectionAgent {
        let name = self
            .agents
            .iter()
            .find(|agent| agent.id == id)
            .map_or_else(|| format!("agent{id}"), |agent| agent.name.clone());
        ConnectionAgent { id, name }
    }
}

impl ControlPlane for MockPlane {
    async fn list_agents(&self) -> Result<Vec<Agent>, Error> {
        Ok(self.agents.clone())
    }

    async fn find_agents_by_name(&self, name: &str) -> Result<Vec<Agent>, Error> {
        Ok(self
            .agents
            .iter()
            .filter(|agent| agent.name == name || agent.id.to_string() == name)
            .cloned()
            .collect())
    }

    async fn find_agents_by_tag(&self, tag: &str) -> Result<Vec<Agent>, Error> {
        Ok(self
            .agents
            .iter()
            .filter(|agent| agent.tags.iter().any(|t| t.name == tag))
            .cloned()
            .collect())
    }

    async fn list_connections(&self, _network_id: Option<i64>) -> Result<Vec<Connection>, Error> {
        Ok(self.state.lock().unwrap().connections.clone())
    }

    async fn connection_services(&self, ids: &[i64]) -> Result<Vec<ConnectionDetail>, Error> {
        let state = self.state.lock().unwrap();
        let mut details = Vec::new();
        for &id in ids {
            let Some(connection) = state.connections.iter().find(|c| c.id == id) else {
                continue;
            };
            let key = canonical(connection.agent_1.id, connection.agent_2.id);
            let detail = state.details_by_pair.get(&key).cloned().unwrap_or_else(|| {
                ConnectionDetail {
                    connection_id: id,
                    agent_1: netweave_api::types::ConnectionAgentServices {
                        id: connection.agent_1.id,
                        services: Vec::new(),
                    },
                    agent_2: netweave_api::types::ConnectionAgentServices {
                        id: connection.agent_2.id,
                        services: Vec::new(),
                    },
                    subnets: Vec::new(),
                }
            });
            details.push(ConnectionDetail {
                connection_id: id,
                ..detail
            });
        }
        Ok(details)
    }

    async fn create_connections(
        &self,
        network_id: i64,
        pairs: &[(i64, i64)],
    ) -> Result<Vec<Connection>, Error> {
        let created: Vec<Connection> = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::CreateConnections {
                network_id,
                pairs: pairs.to_vec(),
            });
            pairs
                .iter()
                .map(|&(a, b)| {
                    state.next_connection_id += 1;
                    Connection {
                        id: state.next_connection_id,
                        agent_1: self.agent_ref(a),
                        agent_2: self.agent_ref(b),
                    }
                })
                .collect()
        };
        self.state
            .lock()
            .unwrap()
            .connections
            .extend(created.iter().cloned());
        Ok(created)
    }

    async fn delete_connections(&self, pairs: &[(i64, i64)]) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::DeleteConnections(pairs.to_vec()));
        let keys: Vec<(i64, i64)> = pairs.iter().map(|&(a, b)| canonical(a, b)).collect();
        state
            .connections
            .retain(|c| !keys.contains(&canonical(c.agent_1.id, c.agent_2.id)));
        Ok(())
    }

    async fn update_connection_subnets(
        &self,
        connection_id: i64,
        changes: &[SubnetChange],
    ) -> Result<(), Error> {
        self.state.lock().unwrap().calls.push(Call::UpdateSubnets {
            connection_id,
            changes: changes.to_vec(),
        });
        Ok(())
    }

    async fn find_networks(&self, key: &str) -> Result<Vec<RemoteNetwork>, Error> {
        Ok(self
            .networks
            .iter()
            .filter(|network| network.name == key || network.id.to_string() == key)
            .cloned()
            .collect())
    }

    async fn create_network(&self, descriptor: &NetworkCreate) -> Result<i64, Error> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(Call::CreateNetwork(descriptor.name.clone()));
        Ok(1000)
    }

    async fn delete_network(&self, id: i64) -> Result<(), Error> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(Call::DeleteNetwork(id));
        Ok(())
    }
}
