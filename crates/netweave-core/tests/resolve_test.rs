// Topology expansion against a fixture control plane.
#![allow(clippy::unwrap_used)]

mod support;

use netweave_core::resolve::{expand, expand_tags};
use netweave_core::{ConfigureError, ConnectionMap, Edge, PeerKind, PeerState, Resolver, Topology};
use pretty_assertions::assert_eq;
use support::{MockPlane, agent, tagged_agent};

fn plane_with_agents() -> MockPlane {
    MockPlane::new(
        (1..=6).map(|i| agent(i, &format!("agent{i}"))).collect(),
        Vec::new(),
    )
}

fn parse(yaml: &str) -> ConnectionMap {
    serde_yaml::from_str(yaml).unwrap()
}

fn pairs(edges: &[Edge]) -> Vec<(i64, i64)> {
    edges.iter().map(|edge| edge.pair()).collect()
}

#[tokio::test]
async fn p2p_expansion() {
    let plane = plane_with_agents();
    let connections = parse(
        r#"
agent1:
  services: [a, b]
  connect_to:
    agent2: {}
agent3:
  connect_to:
    "4": { type: id, services: nginx }
agent4:
  state: absent
  connect_to:
    agent1: {}
"2":
  type: id
  connect_to:
    agent4: { state: absent }
"#,
    );

    let expansion = expand(&plane, &mut Resolver::new(), Topology::P2p, &connections)
        .await
        .unwrap();

    assert_eq!(pairs(&expansion.present), vec![(1, 2), (3, 4)]);
    assert_eq!(pairs(&expansion.absent), vec![(4, 1), (2, 4)]);
    assert_eq!(expansion.services.len(), 2);
    assert_eq!(
        expansion.services[0].agent_1_service_names,
        vec!["a".to_string(), "b".to_string()]
    );
    assert!(expansion.services[0].agent_2_service_names.is_empty());
    assert!(expansion.services[1].agent_1_service_names.is_empty());
    assert_eq!(
        expansion.services[1].agent_2_service_names,
        vec!["nginx".to_string()]
    );
}

#[tokio::test]
async fn p2p_ignores_entries_without_targets() {
    let plane = plane_with_agents();
    let connections = parse(
        r"
agent1: { services: [a] }
agent2:
  connect_to:
    agent3: {}
",
    );

    let expansion = expand(&plane, &mut Resolver::new(), Topology::P2p, &connections)
        .await
        .unwrap();

    assert_eq!(pairs(&expansion.present), vec![(2, 3)]);
    assert!(expansion.absent.is_empty());
}

#[tokio::test]
async fn p2m_expansion() {
    let plane = plane_with_agents();
    let connections = parse(
        r#"
agent1:
  services: nginx
  connect_to:
    agent2: { services: postgre }
    agent3: {}
    agent4: { state: absent }
"2":
  state: absent
  type: id
  connect_to:
    agent5: {}
    "6": { type: id }
"#,
    );

    let expansion = expand(&plane, &mut Resolver::new(), Topology::P2m, &connections)
        .await
        .unwrap();

    assert_eq!(pairs(&expansion.present), vec![(1, 2), (1, 3)]);
    assert_eq!(pairs(&expansion.absent), vec![(1, 4), (2, 5), (2, 6)]);
    assert_eq!(
        expansion.services[0].agent_1_service_names,
        vec!["nginx".to_string()]
    );
    assert_eq!(
        expansion.services[0].agent_2_service_names,
        vec!["postgre".to_string()]
    );
    assert_eq!(
        expansion.services[1].agent_1_service_names,
        vec!["nginx".to_string()]
    );
    assert!(expansion.services[1].agent_2_service_names.is_empty());
}

#[tokio::test]
async fn p2m_expands_tags() {
    let mut agents = vec![agent(1, "agent1"), agent(2, "agent2")];
    agents.extend((160..=162).map(|i| tagged_agent(i, &format!("thing{i}"), &["things"])));
    agents.extend((170..=172).map(|i| tagged_agent(i, &format!("sensor{i}"), &["sensors"])));
    let plane = MockPlane::new(agents, Vec::new());

    let connections = parse(
        r"
agent1:
  services: nginx
  connect_to:
    things: { type: tag, services: [a, b] }
agent2:
  connect_to:
    sensors: { type: tag, state: absent }
",
    );

    let expansion = expand(&plane, &mut Resolver::new(), Topology::P2m, &connections)
        .await
        .unwrap();

    assert_eq!(
        pairs(&expansion.present),
        vec![(1, 160), (1, 161), (1, 162)]
    );
    assert_eq!(pairs(&expansion.absent), vec![(2, 170), (2, 171), (2, 172)]);
    for spec in &expansion.services {
        assert_eq!(spec.agent_1_service_names, vec!["nginx".to_string()]);
        assert_eq!(
            spec.agent_2_service_names,
            vec!["a".to_string(), "b".to_string()]
        );
    }
}

#[tokio::test]
async fn mesh_expansion() {
    let plane = plane_with_agents();
    let connections = parse(
        r#"
agent1: { services: a }
agent2: { services: b }
"3": { type: id, services: c }
agent4: { state: absent }
"#,
    );

    let expansion = expand(&plane, &mut Resolver::new(), Topology::Mesh, &connections)
        .await
        .unwrap();

    assert_eq!(pairs(&expansion.present), vec![(1, 2), (1, 3), (2, 3)]);
    assert_eq!(pairs(&expansion.absent), vec![(1, 4), (2, 4), (3, 4)]);
    assert_eq!(
        expansion.services[2].agent_1_service_names,
        vec!["b".to_string()]
    );
    assert_eq!(
        expansion.services[2].agent_2_service_names,
        vec!["c".to_string()]
    );
}

#[tokio::test]
async fn mesh_expands_two_tags_to_full_interconnect() {
    let mut agents: Vec<_> = (160..=162)
        .map(|i| tagged_agent(i, &format!("thing{i}"), &["things"]))
        .collect();
    agents.extend((170..=172).map(|i| tagged_agent(i, &format!("sensor{i}"), &["sensors"])));
    let plane = MockPlane::new(agents, Vec::new());

    let connections = parse(
        r"
sensors: { type: tag }
things: { type: tag }
",
    );

    let expansion = expand(&plane, &mut Resolver::new(), Topology::Mesh, &connections)
        .await
        .unwrap();

    // C(6, 2) edges, nothing absent.
    assert_eq!(expansion.present.len(), 15);
    assert!(expansion.absent.is_empty());
}

#[tokio::test]
async fn tag_expansion_absent_wins_across_overlapping_tags() {
    // "red" covers 1-3 as absent, "blue" covers 3-5 as present; endpoint 3
    // must come out absent regardless of declaration order.
    let agents = vec![
        tagged_agent(1, "node1", &["red"]),
        tagged_agent(2, "node2", &["red"]),
        tagged_agent(3, "node3", &["red", "blue"]),
        tagged_agent(4, "node4", &["blue"]),
        tagged_agent(5, "node5", &["blue"]),
    ];
    let plane = MockPlane::new(agents, Vec::new());

    let entries = parse(
        r"
blue: { type: tag, services: [a] }
red: { type: tag, state: absent, services: [c] }
",
    );

    let expanded = expand_tags(&plane, &entries).await.unwrap();

    assert_eq!(expanded.len(), 5);
    for name in ["node1", "node2", "node3"] {
        assert_eq!(expanded[name].state, PeerState::Absent, "{name}");
        assert_eq!(expanded[name].services.names(), vec!["c".to_string()]);
    }
    for name in ["node4", "node5"] {
        assert_eq!(expanded[name].state, PeerState::Present, "{name}");
        assert_eq!(expanded[name].services.names(), vec!["a".to_string()]);
    }
}

#[tokio::test]
async fn explicit_entry_overrides_tag_expansion() {
    let agents = vec![
        tagged_agent(1, "node1", &["red"]),
        tagged_agent(2, "node2", &["red"]),
        tagged_agent(3, "node3", &["red"]),
    ];
    let plane = MockPlane::new(agents, Vec::new());

    let entries = parse(
        r"
red: { type: tag, services: [a, b] }
node2: { state: absent, services: [c, d] }
",
    );

    let expanded = expand_tags(&plane, &entries).await.unwrap();

    assert_eq!(expanded.len(), 3);
    assert_eq!(expanded["node1"].state, PeerState::Present);
    assert_eq!(expanded["node2"].state, PeerState::Absent);
    assert_eq!(
        expanded["node2"].services.names(),
        vec!["c".to_string(), "d".to_string()]
    );
    assert_eq!(expanded["node2"].kind, PeerKind::Endpoint);
    assert_eq!(expanded["node3"].state, PeerState::Present);
}

#[tokio::test]
async fn unknown_tag_fails_resolution() {
    let plane = plane_with_agents();
    let entries = parse("ghost-tag: { type: tag }");
    let result = expand_tags(&plane, &entries).await;
    assert!(matches!(result, Err(ConfigureError::Resolution(_))));
}

#[tokio::test]
async fn unresolvable_name_fails_the_whole_expansion() {
    let plane = plane_with_agents();
    let connections = parse(
        r"
agent1:
  connect_to:
    agent2: {}
no-such-agent:
  connect_to:
    agent3: {}
",
    );

    let result = expand(&plane, &mut Resolver::new(), Topology::P2p, &connections).await;
    assert!(matches!(result, Err(ConfigureError::Resolution(_))));
}

#[tokio::test]
async fn resolver_caches_lookups_across_expansions() {
    let plane = plane_with_agents();
    let mut resolver = Resolver::new();
    let connections = parse("agent1:\n  connect_to:\n    agent2: {}\n");

    let first = expand(&plane, &mut resolver, Topology::P2p, &connections)
        .await
        .unwrap();
    let second = expand(&plane, &mut resolver, Topology::P2p, &connections)
        .await
        .unwrap();

    assert_eq!(pairs(&first.present), pairs(&second.present));
}
