// Control-plane HTTP client
//
// Wraps `reqwest::Client` with envelope unwrapping and chunked batch
// mutations. Batch calls are split by a payload ceiling; each chunk either
// succeeds completely or fails the call -- callers never see partial chunks.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::{
    Agent, AgentPair, Connection, ConnectionDetail, Envelope, NetworkCreate, RemoteNetwork,
    SubnetChange,
};

/// Maximum agent pairs per connection create/delete request.
pub const MAX_BATCH_PAIRS: usize = 100;
/// Maximum connection ids per service-detail query.
pub const MAX_QUERY_IDS: usize = 200;
/// Maximum subnet changes per update request.
pub const MAX_BATCH_CHANGES: usize = 100;

/// HTTP client for the overlay control plane.
///
/// All list responses arrive in a `{ data: [...] }` envelope which is
/// stripped before the caller sees the payload. Mutating batch endpoints are
/// chunked transparently.
pub struct PlaneClient {
    http: reqwest::Client,
    base_url: Url,
}

impl PlaneClient {
    /// Create a new client from a base URL and transport settings.
    pub fn new(
        base_url: Url,
        token: &secrecy::SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client(token)?;
        Ok(Self { http, base_url })
    }

    /// Create a client around a pre-built `reqwest::Client` (used by tests).
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The control-plane base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Build `{base}/v1/{path}`.
    fn api_url(&self, path: &str) -> Result<Url, Error> {
        let full = format!(
            "{}/v1/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path
        );
        Url::parse(&full).map_err(Error::InvalidUrl)
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn parse_envelope<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::Authentication {
                message: extract_message(&body).unwrap_or_else(|| status.to_string()),
            });
        }
        if !status.is_success() {
            return Err(Error::Api {
                message: extract_message(&body).unwrap_or_else(|| status.to_string()),
                status: status.as_u16(),
            });
        }

        serde_json::from_str::<Envelope<T>>(&body)
            .map(|e| e.data)
            .map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body,
            })
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);
        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        Self::parse_envelope(resp).await
    }

    async fn post<T: DeserializeOwned>(&self, url: Url, body: &impl Serialize) -> Result<T, Error> {
        debug!("POST {}", url);
        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;
        Self::parse_envelope(resp).await
    }

    /// Send a request that carries no useful response body.
    async fn send_no_content(&self, req: reqwest::RequestBuilder) -> Result<(), Error> {
        let resp = req.send().await.map_err(Error::Transport)?;
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: extract_message(&body).unwrap_or_else(|| status.to_string()),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                message: extract_message(&body).unwrap_or_else(|| status.to_string()),
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    // ── Agent directory ──────────────────────────────────────────────

    /// List every agent visible to the token, with services and tags.
    ///
    /// `GET /v1/agents`
    pub async fn list_agents(&self) -> Result<Vec<Agent>, Error> {
        let url = self.api_url("agents")?;
        self.get(url).await
    }

    /// Find agents whose name (or id rendered as text) matches exactly.
    ///
    /// `GET /v1/agents?name={name}`
    pub async fn find_agents_by_name(&self, name: &str) -> Result<Vec<Agent>, Error> {
        let mut url = self.api_url("agents")?;
        url.query_pairs_mut().append_pair("name", name);
        self.get(url).await
    }

    /// Find all agents carrying the given tag.
    ///
    /// `GET /v1/agents?tag={tag}`
    pub async fn find_agents_by_tag(&self, tag: &str) -> Result<Vec<Agent>, Error> {
        let mut url = self.api_url("agents")?;
        url.query_pairs_mut().append_pair("tag", tag);
        self.get(url).await
    }

    // ── Connections ──────────────────────────────────────────────────

    /// List connections, optionally scoped to one network.
    ///
    /// `GET /v1/connections[?network_id={id}]`
    pub async fn list_connections(&self, network_id: Option<i64>) -> Result<Vec<Connection>, Error> {
        let mut url = self.api_url("connections")?;
        if let Some(id) = network_id {
            url.query_pairs_mut()
                .append_pair("network_id", &id.to_string());
        }
        self.get(url).await
    }

    /// Fetch service/subnet detail for the given connection ids, chunked
    /// by the query-size ceiling.
    ///
    /// `GET /v1/connections/services?ids=1,2,3`
    pub async fn connection_services(&self, ids: &[i64]) -> Result<Vec<ConnectionDetail>, Error> {
        let mut out = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_QUERY_IDS) {
            let mut url = self.api_url("connections/services")?;
            let joined = chunk
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            url.query_pairs_mut().append_pair("ids", &joined);
            let mut page: Vec<ConnectionDetail> = self.get(url).await?;
            out.append(&mut page);
        }
        Ok(out)
    }

    /// Create connections for the given agent-id pairs inside a network.
    /// Pairs are chunked by the payload ceiling; each chunk is atomic.
    ///
    /// `POST /v1/connections`
    pub async fn create_connections(
        &self,
        network_id: i64,
        pairs: &[(i64, i64)],
    ) -> Result<Vec<Connection>, Error> {
        let mut created = Vec::with_capacity(pairs.len());
        for chunk in pairs.chunks(MAX_BATCH_PAIRS) {
            let url = self.api_url("connections")?;
            let body = json!({
                "network_id": network_id,
                "pairs": to_pairs(chunk),
            });
            let mut page: Vec<Connection> = self.post(url, &body).await?;
            created.append(&mut page);
        }
        Ok(created)
    }

    /// Delete the connections identified by the given agent-id pairs.
    ///
    /// `DELETE /v1/connections`
    pub async fn delete_connections(&self, pairs: &[(i64, i64)]) -> Result<(), Error> {
        for chunk in pairs.chunks(MAX_BATCH_PAIRS) {
            let url = self.api_url("connections")?;
            debug!("DELETE {}", url);
            let body = json!({ "pairs": to_pairs(chunk) });
            self.send_no_content(self.http.delete(url).json(&body)).await?;
        }
        Ok(())
    }

    /// Apply subnet enable/disable changes to one connection.
    ///
    /// `PATCH /v1/connections/{id}/subnets`
    pub async fn update_connection_subnets(
        &self,
        connection_id: i64,
        changes: &[SubnetChange],
    ) -> Result<(), Error> {
        for chunk in changes.chunks(MAX_BATCH_CHANGES) {
            let url = self.api_url(&format!("connections/{connection_id}/subnets"))?;
            debug!("PATCH {}", url);
            let body = json!({ "changes": chunk });
            self.send_no_content(self.http.patch(url).json(&body)).await?;
        }
        Ok(())
    }

    // ── Networks ─────────────────────────────────────────────────────

    /// Find networks matching the given name or numeric id.
    ///
    /// `GET /v1/networks?key={name-or-id}`
    pub async fn find_networks(&self, key: &str) -> Result<Vec<RemoteNetwork>, Error> {
        let mut url = self.api_url("networks")?;
        url.query_pairs_mut().append_pair("key", key);
        self.get(url).await
    }

    /// List every network.
    ///
    /// `GET /v1/networks`
    pub async fn list_networks(&self) -> Result<Vec<RemoteNetwork>, Error> {
        let url = self.api_url("networks")?;
        self.get(url).await
    }

    /// Create a network, returning its id.
    ///
    /// `POST /v1/networks`
    pub async fn create_network(&self, descriptor: &NetworkCreate) -> Result<i64, Error> {
        let url = self.api_url("networks")?;
        let net: RemoteNetwork = self.post(url, descriptor).await?;
        Ok(net.id)
    }

    /// Delete a network entity.
    ///
    /// `DELETE /v1/networks/{id}`
    pub async fn delete_network(&self, id: i64) -> Result<(), Error> {
        let url = self.api_url(&format!("networks/{id}"))?;
        debug!("DELETE {}", url);
        self.send_no_content(self.http.delete(url)).await
    }
}

fn to_pairs(chunk: &[(i64, i64)]) -> Vec<AgentPair> {
    chunk
        .iter()
        .map(|&(a, b)| AgentPair {
            agent_1_id: a,
            agent_2_id: b,
        })
        .collect()
}

/// Pull a human-readable message out of an error body, if it has one.
fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .and_then(|e| e.get("message"))
        .or_else(|| value.get("message"))
        .and_then(|m| m.as_str())
        .map(String::from)
}
