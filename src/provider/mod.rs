// ABOUTME: Provisioning API module: typed client, response normalization, polling.
// ABOUTME: The pipeline talks to the provider only through the ProviderApi trait.

mod api;
mod client;
mod envelope;
mod error;
mod types;
mod wait;

pub use api::ProviderApi;
pub use client::{API_KEY_HEADER, ClientConfig, ProvisioningClient};
pub use error::{Error, Result};
pub use types::{Image, OrderRequest, PowerAction, Product, Resource, ResourceState, Snapshot};
pub use wait::{PollPolicy, WaitOptions, poll_for_new, wait_for_status};
