// ABOUTME: Domain types returned by the provisioning API client.
// ABOUTME: Resources, lifecycle states, orders, snapshots, products and images.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a provisioned resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceState {
    Provisioning,
    Running,
    Stopped,
    Error,
    Disabled,
    /// A state string the provider reported that has no mapping.
    Unknown(String),
}

impl ResourceState {
    /// Whether this state ends any wait: nothing transitions out of it on its own.
    pub fn is_terminal_error(&self) -> bool {
        matches!(self, ResourceState::Error)
    }
}

impl FromStr for ResourceState {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let state = match s.trim().to_ascii_lowercase().as_str() {
            "running" | "active" | "online" => ResourceState::Running,
            "provisioning" | "pending" | "installing" | "creating" | "building" | "new" => {
                ResourceState::Provisioning
            }
            "stopped" | "off" | "poweroff" | "shutoff" | "offline" => ResourceState::Stopped,
            "error" | "failed" => ResourceState::Error,
            "disabled" | "suspended" | "locked" => ResourceState::Disabled,
            other => ResourceState::Unknown(other.to_string()),
        };
        Ok(state)
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceState::Provisioning => write!(f, "provisioning"),
            ResourceState::Running => write!(f, "running"),
            ResourceState::Stopped => write!(f, "stopped"),
            ResourceState::Error => write!(f, "error"),
            ResourceState::Disabled => write!(f, "disabled"),
            ResourceState::Unknown(s) => write!(f, "unknown ({s})"),
        }
    }
}

/// A virtual server known to the provider.
#[derive(Clone, PartialEq, Eq)]
pub struct Resource {
    pub id: String,
    /// Public address; empty until the provider assigns one.
    pub address: String,
    /// Initial root credential. Empty when the provider does not return it.
    pub credential: String,
    pub state: ResourceState,
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("id", &self.id)
            .field("address", &self.address)
            .field(
                "credential",
                &if self.credential.is_empty() { "" } else { "<redacted>" },
            )
            .field("state", &self.state)
            .finish()
    }
}

/// Parameters for ordering a new resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub product_id: String,
    pub image_id: String,
    pub billing_term: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

/// A point-in-time copy of a resource's disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub id: String,
    pub name: String,
    pub resource_id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    /// Set on the placeholder returned when the new snapshot's id could not
    /// be discovered before the polling budget ran out.
    pub pending: bool,
}

impl Snapshot {
    pub(crate) fn pending(resource_id: &str, name: &str) -> Self {
        Snapshot {
            id: String::new(),
            name: name.to_string(),
            resource_id: resource_id.to_string(),
            created_at: None,
            active: false,
            expires_at: None,
            pending: true,
        }
    }
}

/// An offerable server configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: Option<f64>,
    pub description: Option<String>,
}

/// A bootable operating system image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    pub id: String,
    pub name: Option<String>,
}

/// Power operations the provider accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    Start,
    Stop,
    Reboot,
}

impl PowerAction {
    /// The verb the provider expects for this action.
    pub fn verb(self) -> &'static str {
        match self {
            PowerAction::Start => "poweron",
            PowerAction::Stop => "poweroff",
            PowerAction::Reboot => "reboot",
        }
    }
}
