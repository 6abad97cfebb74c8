// Integration tests for `PlaneClient` using wiremock.
#![allow(clippy::unwrap_used)]

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use netweave_api::types::{NetworkCreate, SubnetChange};
use netweave_api::{Error, PlaneClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, PlaneClient) {
    let server = MockServer::start().await;
    let base = Url::parse(&server.uri()).unwrap();
    let client = PlaneClient::with_client(reqwest::Client::new(), base);
    (server, client)
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_list_agents() {
    let (server, client) = setup().await;

    let body = json!({
        "data": [
            {
                "id": 9,
                "name": "agent9",
                "tags": [{ "id": 170, "name": "dns-servers" }],
                "services": [
                    {
                        "id": 1,
                        "name": "nats-streaming",
                        "subnets": [
                            { "id": 21, "is_active": true },
                            { "id": 22, "is_active": true },
                        ]
                    }
                ],
                "network_ids": [1, 3]
            },
            { "id": 22, "name": "agent22" },
        ]
    });

    Mock::given(method("GET"))
        .and(path("/v1/agents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let agents = client.list_agents().await.unwrap();

    assert_eq!(agents.len(), 2);
    assert_eq!(agents[0].id, 9);
    assert_eq!(agents[0].tags[0].name, "dns-servers");
    assert_eq!(agents[0].services[0].subnets.len(), 2);
    assert_eq!(agents[0].network_ids, vec![1, 3]);
    // Defaults kick in for the sparse record.
    assert!(agents[1].tags.is_empty());
    assert!(agents[1].services.is_empty());
}

#[tokio::test]
async fn test_find_agents_by_tag() {
    let (server, client) = setup().await;

    let body = json!({
        "data": [
            { "id": 170, "name": "agent170" },
            { "id": 171, "name": "agent171" },
        ]
    });

    Mock::given(method("GET"))
        .and(path("/v1/agents"))
        .and(query_param("tag", "iot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let agents = client.find_agents_by_tag("iot").await.unwrap();

    assert_eq!(agents.len(), 2);
    assert_eq!(agents[0].id, 170);
    assert_eq!(agents[1].name, "agent171");
}

#[tokio::test]
async fn test_list_connections_scoped_to_network() {
    let (server, client) = setup().await;

    let body = json!({
        "data": [
            {
                "id": 4,
                "agent_1": { "id": 1, "name": "agent1" },
                "agent_2": { "id": 2, "name": "agent2" },
            }
        ]
    });

    Mock::given(method("GET"))
        .and(path("/v1/connections"))
        .and(query_param("network_id", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let connections = client.list_connections(Some(3)).await.unwrap();

    assert_eq!(connections.len(), 1);
    assert_eq!(connections[0].id, 4);
    assert_eq!(connections[0].agent_1.id, 1);
    assert_eq!(connections[0].agent_2.name, "agent2");
}

#[tokio::test]
async fn test_connection_services() {
    let (server, client) = setup().await;

    let body = json!({
        "data": [
            {
                "connection_id": 7,
                "agent_1": {
                    "id": 9,
                    "services": [
                        {
                            "id": 1,
                            "name": "nats-streaming",
                            "subnets": [
                                { "id": 21, "is_active": true },
                                { "id": 22, "is_active": true },
                            ]
                        }
                    ]
                },
                "agent_2": { "id": 22, "services": [] },
                "subnets": [
                    { "subnet_id": 21, "is_enabled": true },
                    { "subnet_id": 22, "is_enabled": false },
                ]
            }
        ]
    });

    Mock::given(method("GET"))
        .and(path("/v1/connections/services"))
        .and(query_param("ids", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let details = client.connection_services(&[7]).await.unwrap();

    assert_eq!(details.len(), 1);
    assert_eq!(details[0].connection_id, 7);
    assert_eq!(details[0].agent_1.services[0].name, "nats-streaming");
    assert_eq!(details[0].subnets.len(), 2);
    assert!(details[0].subnets[0].is_enabled);
    assert!(!details[0].subnets[1].is_enabled);
}

#[tokio::test]
async fn test_create_connections() {
    let (server, client) = setup().await;

    let expected_body = json!({
        "network_id": 1,
        "pairs": [
            { "agent_1_id": 1, "agent_2_id": 2 },
            { "agent_1_id": 1, "agent_2_id": 3 },
        ]
    });
    let response = json!({
        "data": [
            { "id": 10, "agent_1": { "id": 1, "name": "agent1" }, "agent_2": { "id": 2, "name": "agent2" } },
            { "id": 11, "agent_1": { "id": 1, "name": "agent1" }, "agent_2": { "id": 3, "name": "agent3" } },
        ]
    });

    Mock::given(method("POST"))
        .and(path("/v1/connections"))
        .and(body_json(&expected_body))
        .respond_with(ResponseTemplate::new(200).set_body_json(&response))
        .mount(&server)
        .await;

    let created = client.create_connections(1, &[(1, 2), (1, 3)]).await.unwrap();

    assert_eq!(created.len(), 2);
    assert_eq!(created[0].id, 10);
    assert_eq!(created[1].agent_2.id, 3);
}

#[tokio::test]
async fn test_delete_connections() {
    let (server, client) = setup().await;

    let expected_body = json!({
        "pairs": [{ "agent_1_id": 2, "agent_2_id": 5 }]
    });

    Mock::given(method("DELETE"))
        .and(path("/v1/connections"))
        .and(body_json(&expected_body))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.delete_connections(&[(2, 5)]).await.unwrap();
}

#[tokio::test]
async fn test_update_connection_subnets() {
    let (server, client) = setup().await;

    let expected_body = json!({
        "changes": [
            { "subnet_id": 22, "is_enabled": false },
            { "subnet_id": 23, "is_enabled": true },
        ]
    });

    Mock::given(method("PATCH"))
        .and(path("/v1/connections/7/subnets"))
        .and(body_json(&expected_body))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let changes = [
        SubnetChange { subnet_id: 22, is_enabled: false },
        SubnetChange { subnet_id: 23, is_enabled: true },
    ];
    client.update_connection_subnets(7, &changes).await.unwrap();
}

#[tokio::test]
async fn test_find_and_create_network() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1/networks"))
        .and(query_param("key", "edge"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": 3, "name": "edge", "topology": "MESH", "use_sdn": true }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/networks"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": { "id": 4, "name": "core", "topology": "P2P", "use_sdn": false }
        })))
        .mount(&server)
        .await;

    let found = client.find_networks("edge").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].topology, "MESH");

    let id = client
        .create_network(&NetworkCreate {
            name: "core".into(),
            topology: "P2P".into(),
            use_sdn: false,
        })
        .await
        .unwrap();
    assert_eq!(id, 4);
}

#[tokio::test]
async fn test_delete_network() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/v1/networks/3"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.delete_network(3).await.unwrap();
}

// ── Error-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_unauthorized_maps_to_authentication_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1/agents"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "invalid API token" }
        })))
        .mount(&server)
        .await;

    let err = client.list_agents().await.unwrap_err();
    match err {
        Error::Authentication { message } => assert_eq!(message, "invalid API token"),
        other => panic!("expected Authentication error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_carries_status_and_message() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1/networks"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "message": "database unavailable"
        })))
        .mount(&server)
        .await;

    let err = client.list_networks().await.unwrap_err();
    match &err {
        Error::Api { message, status } => {
            assert_eq!(*status, 500);
            assert_eq!(message, "database unavailable");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_malformed_body_keeps_raw_text() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1/agents"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
        .mount(&server)
        .await;

    let err = client.list_agents().await.unwrap_err();
    match err {
        Error::Deserialization { body, .. } => assert_eq!(body, "not json at all"),
        other => panic!("expected Deserialization error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_not_found_helper() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/v1/networks/99"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "message": "no such network" }
        })))
        .mount(&server)
        .await;

    let err = client.delete_network(99).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(!err.is_transient());
}
