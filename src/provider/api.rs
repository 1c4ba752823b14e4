// ABOUTME: Provisioning operations trait consumed by the deployment pipeline.
// ABOUTME: Implemented by the HTTP client; test doubles implement it in memory.

use async_trait::async_trait;

use super::error::Result;
use super::types::{Image, OrderRequest, PowerAction, Product, Resource, ResourceState, Snapshot};
use super::wait::{self, WaitOptions};

/// Operations against the provisioning API.
#[async_trait]
pub trait ProviderApi: Send + Sync {
    /// Current account balance.
    async fn get_balance(&self) -> Result<f64>;

    /// Server configurations that can be ordered.
    async fn get_products(&self) -> Result<Vec<Product>>;

    /// Images a server can boot.
    async fn get_images(&self) -> Result<Vec<Image>>;

    /// Order a new server and return it once its id is known.
    async fn order_resource(&self, request: &OrderRequest) -> Result<Resource>;

    /// All servers on the account.
    async fn list_resources(&self) -> Result<Vec<Resource>>;

    /// One server's details.
    async fn get_resource(&self, id: &str) -> Result<Resource>;

    /// A server's lifecycle state.
    async fn get_status(&self, id: &str) -> Result<ResourceState>;

    /// Send a power action. Does not wait for it to take effect.
    async fn power_action(&self, id: &str, action: PowerAction) -> Result<()>;

    /// Snapshots belonging to a server.
    async fn list_snapshots(&self, id: &str) -> Result<Vec<Snapshot>>;

    /// Request a snapshot of a server.
    async fn create_snapshot(&self, id: &str, name: &str) -> Result<Snapshot>;

    /// Restore a snapshot onto `target_id`, or onto the server itself.
    async fn restore_snapshot(
        &self,
        id: &str,
        snapshot_id: &str,
        target_id: Option<&str>,
    ) -> Result<()>;

    /// Poll [`get_status`](Self::get_status) until the server reaches `target`.
    async fn wait_for_status(
        &self,
        id: &str,
        target: ResourceState,
        options: WaitOptions<'_>,
    ) -> Result<()> {
        wait::wait_for_status(id, &target, &options, || self.get_status(id)).await
    }
}
