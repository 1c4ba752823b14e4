// ABOUTME: HTTP client for the provisioning API built on reqwest.
// ABOUTME: Authenticates every request and hides response-shape variance.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::api::ProviderApi;
use super::envelope::{self, Body, OrderAck};
use super::error::{Error, Result};
use super::types::{Image, OrderRequest, PowerAction, Product, Resource, ResourceState, Snapshot};
use super::wait::{PollPolicy, poll_for_new};

/// Header carrying the API key on every request.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Connection settings for [`ProvisioningClient`].
#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Budget for discovering a freshly ordered server.
    pub order_poll: PollPolicy,
    /// Budget for discovering a freshly requested snapshot.
    pub snapshot_poll: PollPolicy,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            request_timeout: Duration::from_secs(30),
            order_poll: PollPolicy::new(Duration::from_secs(5), 24),
            snapshot_poll: PollPolicy::new(Duration::from_secs(5), 12),
        }
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn order_poll(mut self, policy: PollPolicy) -> Self {
        self.order_poll = policy;
        self
    }

    pub fn snapshot_poll(mut self, policy: PollPolicy) -> Self {
        self.snapshot_poll = policy;
        self
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .field("order_poll", &self.order_poll)
            .field("snapshot_poll", &self.snapshot_poll)
            .finish()
    }
}

/// Typed client for the provisioning API.
pub struct ProvisioningClient {
    http: Client,
    config: ClientConfig,
}

impl fmt::Debug for ProvisioningClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisioningClient")
            .field("config", &self.config)
            .finish()
    }
}

impl ProvisioningClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get(&self, path: &str) -> Result<Value> {
        debug!("GET {}", path);
        self.send(self.http.get(self.url(path))).await
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value> {
        debug!("POST {}", path);
        self.send(self.http.post(self.url(path)).json(body)).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value> {
        let response = request
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = envelope::error_message(&text).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
            warn!(status = status.as_u16(), %message, "provider request failed");
            return Err(Error::Http {
                status: status.as_u16(),
                message,
                body: (!text.is_empty()).then_some(text),
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Accept a reply to a command whose only interesting outcome is failure.
    fn acknowledge(reply: Value) -> Result<()> {
        Body::classify(reply).into_payload().map(|_| ())
    }
}

#[async_trait]
impl ProviderApi for ProvisioningClient {
    async fn get_balance(&self) -> Result<f64> {
        envelope::parse_balance(self.get("/account/balance").await?)
    }

    async fn get_products(&self) -> Result<Vec<Product>> {
        envelope::parse_products(self.get("/products").await?)
    }

    async fn get_images(&self) -> Result<Vec<Image>> {
        envelope::parse_images(self.get("/images").await?)
    }

    /// The provider may accept an order without saying what it created. In
    /// that case the new server is found by comparing the server listing with
    /// the one taken before the order, which is only reliable when nobody else
    /// creates servers on the account meanwhile. The credential of a server
    /// discovered this way is empty.
    async fn order_resource(&self, request: &OrderRequest) -> Result<Resource> {
        let known: HashSet<String> = self
            .list_resources()
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();

        info!(
            product = %request.product_id,
            image = %request.image_id,
            "ordering server"
        );
        let reply = self.post("/servers", request).await?;

        match envelope::parse_order(reply)? {
            OrderAck::Detailed(resource) => Ok(resource),
            OrderAck::Acknowledged => {
                info!("order acknowledged without server details, polling server list");
                let found = poll_for_new(
                    &known,
                    self.config.order_poll,
                    || self.list_resources(),
                    |r: &Resource| r.id.as_str(),
                )
                .await?;

                match found {
                    Some(mut resource) => {
                        resource.credential.clear();
                        Ok(resource)
                    }
                    None => Err(Error::ResourceNotFound(format!(
                        "no new server appeared after {} checks",
                        self.config.order_poll.attempts
                    ))),
                }
            }
        }
    }

    async fn list_resources(&self) -> Result<Vec<Resource>> {
        envelope::parse_resources(self.get("/servers").await?)
    }

    async fn get_resource(&self, id: &str) -> Result<Resource> {
        envelope::parse_resource(self.get(&format!("/servers/{id}")).await?)?
            .ok_or_else(|| Error::ResourceNotFound(id.to_string()))
    }

    async fn get_status(&self, id: &str) -> Result<ResourceState> {
        envelope::parse_status(self.get(&format!("/servers/{id}/status")).await?)
    }

    async fn power_action(&self, id: &str, action: PowerAction) -> Result<()> {
        info!(server = id, action = action.verb(), "sending power action");
        let reply = self
            .post(
                &format!("/servers/{id}/power"),
                &json!({ "action": action.verb() }),
            )
            .await?;
        Self::acknowledge(reply)
    }

    async fn list_snapshots(&self, id: &str) -> Result<Vec<Snapshot>> {
        envelope::parse_snapshots(self.get(&format!("/servers/{id}/snapshots")).await?, id)
    }

    /// Like ordering, snapshot creation may be acknowledged without an id.
    /// When the id cannot be discovered in time, a placeholder marked
    /// `pending` is returned instead of an error.
    async fn create_snapshot(&self, id: &str, name: &str) -> Result<Snapshot> {
        let known: HashSet<String> = self
            .list_snapshots(id)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();

        info!(server = id, name, "creating snapshot");
        let reply = self
            .post(&format!("/servers/{id}/snapshots"), &json!({ "name": name }))
            .await?;

        if let Some(snapshot) = envelope::parse_created_snapshot(reply, id)? {
            return Ok(snapshot);
        }

        let found = poll_for_new(
            &known,
            self.config.snapshot_poll,
            || self.list_snapshots(id),
            |s: &Snapshot| s.id.as_str(),
        )
        .await?;

        Ok(found.unwrap_or_else(|| {
            warn!(server = id, name, "snapshot id not visible yet, returning pending placeholder");
            Snapshot::pending(id, name)
        }))
    }

    async fn restore_snapshot(
        &self,
        id: &str,
        snapshot_id: &str,
        target_id: Option<&str>,
    ) -> Result<()> {
        info!(server = id, snapshot = snapshot_id, "restoring snapshot");
        let body = match target_id {
            Some(target) => json!({ "target_id": target }),
            None => json!({}),
        };
        let reply = self
            .post(
                &format!("/servers/{id}/snapshots/{snapshot_id}/restore"),
                &body,
            )
            .await?;
        Self::acknowledge(reply)
    }
}
