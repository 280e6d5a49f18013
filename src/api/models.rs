//! OVH API request and response models.
//!
//! Field names follow the API's camelCase wire format.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Server types
// ============================================================================

/// Dedicated server information.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DedicatedServer {
    /// Server name (identifier).
    pub name: String,
    /// Server IP address.
    pub ip: Option<String>,
    /// Data center location.
    pub datacenter: Option<String>,
    /// Commercial range.
    pub commercial_range: Option<String>,
    /// Operating system.
    pub os: Option<String>,
    /// Server state.
    #[serde(default)]
    pub state: String,
    /// Reverse DNS.
    pub reverse: Option<String>,
    /// Monitoring enabled.
    #[serde(default)]
    pub monitoring: bool,
    /// Root device.
    pub root_device: Option<String>,
    /// Rack location.
    pub rack: Option<String>,
    /// Identifier of the boot target used on next reboot.
    pub boot_id: Option<i64>,
    /// Link speed in Mbps.
    pub link_speed: Option<i64>,
}

// ============================================================================
// Boot types
// ============================================================================

/// Kind of a boot target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BootType {
    /// Boot from the local disk.
    Harddisk,
    /// Boot a user-uploaded iPXE script over the network.
    IpxeCustomerScript,
    /// Stock network boot.
    Network,
    /// Rescue environment.
    Rescue,
    /// Internal netboot.
    Internal,
    #[serde(other)]
    Unknown,
}

impl BootType {
    /// Wire name, used as the `bootType` query parameter.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Harddisk => "harddisk",
            Self::IpxeCustomerScript => "ipxeCustomerScript",
            Self::Network => "network",
            Self::Rescue => "rescue",
            Self::Internal => "internal",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BootType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boot target detail.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootConfig {
    /// Boot target identifier.
    pub boot_id: i64,
    /// Boot type.
    pub boot_type: BootType,
    /// Description.
    pub description: Option<String>,
    /// Script name for `ipxeCustomerScript` targets.
    pub kernel: Option<String>,
}

/// Body of the server mutation that selects the next boot target.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBootRequest {
    /// Boot target identifier to use on next reboot.
    pub boot_id: i64,
}

// ============================================================================
// Task types
// ============================================================================

/// Status of a server task.
///
/// The API owns this vocabulary; anything it grows later lands on `Unknown`,
/// which the poll loop treats as terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    Init,
    Todo,
    Doing,
    Done,
    Cancelled,
    OvhError,
    CustomerError,
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    /// The task has not reached a terminal state yet.
    #[must_use]
    pub fn is_in_progress(self) -> bool {
        matches!(self, Self::Init | Self::Todo | Self::Doing)
    }

    /// The task finished in an error state.
    #[must_use]
    pub fn is_error(self) -> bool {
        matches!(self, Self::OvhError | Self::CustomerError)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Todo => "todo",
            Self::Doing => "doing",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
            Self::OvhError => "ovhError",
            Self::CustomerError => "customerError",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Server task (async operation).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerTask {
    /// Task ID.
    pub task_id: i64,
    /// Function name.
    #[serde(default)]
    pub function: String,
    /// Start date.
    pub start_date: Option<String>,
    /// Done date.
    pub done_date: Option<String>,
    /// Status.
    pub status: TaskStatus,
    /// Comment.
    pub comment: Option<String>,
}

// ============================================================================
// Credential / account types (provisioning flow)
// ============================================================================

/// One access rule of a credential request.
#[derive(Debug, Clone, Serialize)]
pub struct AccessRule {
    /// HTTP method the rule grants (GET/POST/PUT/DELETE).
    pub method: String,
    /// Path pattern the rule grants, e.g. `/dedicated/server/*`.
    pub path: String,
}

impl AccessRule {
    /// Read/write rules (all four methods) for one path pattern.
    #[must_use]
    pub fn read_write(path: &str) -> Vec<Self> {
        ["GET", "POST", "PUT", "DELETE"]
            .into_iter()
            .map(|method| Self {
                method: method.to_string(),
                path: path.to_string(),
            })
            .collect()
    }
}

/// Credential request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRequest {
    /// Requested access rules.
    pub access_rules: Vec<AccessRule>,
    /// URL the user is sent back to after validation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirection: Option<String>,
}

/// Credential request response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialValidation {
    /// Consumer key to use once validated.
    pub consumer_key: String,
    /// URL the user must visit to validate the key.
    pub validation_url: String,
    /// Validation state.
    #[serde(default)]
    pub state: Option<String>,
}

/// Account information.
#[derive(Debug, Clone, Deserialize)]
pub struct Me {
    /// Customer handle.
    pub nichandle: String,
    /// First name.
    #[serde(default)]
    pub firstname: Option<String>,
    /// Last name.
    #[serde(default)]
    pub name: Option<String>,
}

// ============================================================================
// iPXE script types
// ============================================================================

/// A stored iPXE script.
#[derive(Debug, Clone, Deserialize)]
pub struct IpxeScript {
    /// Script name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Script content.
    #[serde(default)]
    pub script: Option<String>,
}

/// iPXE script creation request.
#[derive(Debug, Serialize)]
pub struct CreateIpxeScriptRequest {
    /// Script name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Script content.
    pub script: String,
}
