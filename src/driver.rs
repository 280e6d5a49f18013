//! Capability surfaces consumed by the host orchestration framework.
//!
//! Two explicit capability traits replace interface subclassing: the host
//! composes `PowerInterface` and `ManagementInterface` from configuration,
//! both implemented by [`OvhDriver`]. Mutual exclusion per server for the
//! mutating operations is the host's responsibility, not enforced here.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::{Api, DediClient};
use crate::boot::BootTargetResolver;
use crate::config::DriverConfig;
use crate::error::{Error, Result};
use crate::power::{PowerController, PowerState};

/// Boot devices the management surface understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootDevice {
    /// Boot from local disk.
    Disk,
    /// Network boot via the configured iPXE script.
    Network,
}

impl fmt::Display for BootDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disk => write!(f, "disk"),
            Self::Network => write!(f, "network"),
        }
    }
}

impl FromStr for BootDevice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "disk" => Ok(Self::Disk),
            "network" => Ok(Self::Network),
            other => Err(Error::InvalidParameter(format!(
                "invalid boot device {other}, supported are disk, network"
            ))),
        }
    }
}

/// The slice of a bare-metal inventory record this driver reads and writes:
/// the remote server handle, and the reported power state.
#[derive(Debug, Clone)]
pub struct Node {
    /// Remote server name, used in every API path.
    pub server_name: String,
    /// Last power state reported by a transition. `None` until one ran.
    pub power_state: Option<PowerState>,
}

impl Node {
    #[must_use]
    pub fn new(server_name: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            power_state: None,
        }
    }
}

/// Power capability: get/set the power state of a managed server.
#[async_trait]
pub trait PowerInterface: Send + Sync {
    /// Check configuration and node parameters before any power operation.
    async fn validate(&self, node: &Node) -> Result<()>;

    /// Power state last reported for the node.
    async fn get_power_state(&self, node: &Node) -> Result<Option<PowerState>>;

    /// Drive the server to the requested power state.
    async fn set_power_state(
        &self,
        node: &mut Node,
        state: PowerState,
        timeout: Option<Duration>,
    ) -> Result<()>;

    /// Reboot the server.
    async fn reboot(&self, node: &mut Node, timeout: Option<Duration>) -> Result<()>;
}

/// Management capability: get/set the boot device of a managed server.
#[async_trait]
pub trait ManagementInterface: Send + Sync {
    /// Check configuration and node parameters before any boot-device change.
    async fn validate(&self, node: &Node) -> Result<()>;

    /// Boot devices this driver can select.
    fn supported_boot_devices(&self) -> &'static [BootDevice];

    /// Device the server currently boots from.
    async fn get_boot_device(&self, node: &Node) -> Result<BootDevice>;

    /// Device the server boots from on next reboot.
    async fn set_boot_device(&self, node: &Node, device: BootDevice) -> Result<()>;
}

/// Driver for dedicated servers managed through the OVH API.
pub struct OvhDriver {
    client: Arc<DediClient>,
    config: DriverConfig,
    power: PowerController,
}

impl OvhDriver {
    /// Build a driver from configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: DriverConfig) -> Result<Self> {
        Self::with_debug(config, false)
    }

    /// Build a driver, optionally logging every API request (credential
    /// headers obfuscated).
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_debug(config: DriverConfig, debug: bool) -> Result<Self> {
        let api = Api::new(
            config.endpoint.base_url(),
            config.application_key.as_str(),
            config.application_secret.as_str(),
            config.consumer_key.as_str(),
        )?
        .with_debug(debug);
        Ok(Self::with_client(config, DediClient::new(api)))
    }

    /// Build a driver around an existing client. The endpoint inside the
    /// client wins over the configured alias.
    #[must_use]
    pub fn with_client(config: DriverConfig, client: DediClient) -> Self {
        let client = Arc::new(client);
        let power = PowerController::new(
            Arc::clone(&client),
            config.poweroff_script.clone(),
            config.boot_script.clone(),
        );
        Self {
            client,
            config,
            power,
        }
    }

    /// Override the task poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.power = self.power.with_poll_interval(interval);
        self
    }

    /// Override the default poll deadline.
    #[must_use]
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.power = self.power.with_poll_timeout(timeout);
        self
    }

    /// The underlying typed client.
    #[must_use]
    pub fn client(&self) -> &DediClient {
        &self.client
    }

    /// Fail fast if either configured iPXE script is not uploaded.
    ///
    /// # Errors
    /// `Error::NotFound` naming the missing script.
    pub async fn verify_scripts(&self) -> Result<()> {
        for script in [&self.config.poweroff_script, &self.config.boot_script] {
            match self.client.get_ipxe_script(script).await {
                Ok(_) => {}
                Err(Error::Api { status: 404, .. }) => {
                    return Err(Error::NotFound(format!(
                        "iPXE script {script} is not uploaded"
                    )));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    async fn validate_node(&self, node: &Node) -> Result<()> {
        self.config.check_required()?;
        if node.server_name.is_empty() {
            return Err(Error::MissingParameter("server_name".to_string()));
        }

        let servers = self.client.list_servers().await?;
        if !servers.iter().any(|name| name == &node.server_name) {
            return Err(Error::InvalidParameter(format!(
                "server {} is not attached to these credentials",
                node.server_name
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl PowerInterface for OvhDriver {
    async fn validate(&self, node: &Node) -> Result<()> {
        self.validate_node(node).await
    }

    async fn get_power_state(&self, node: &Node) -> Result<Option<PowerState>> {
        Ok(node.power_state)
    }

    async fn set_power_state(
        &self,
        node: &mut Node,
        state: PowerState,
        timeout: Option<Duration>,
    ) -> Result<()> {
        self.power.set_power_state(node, state, timeout).await
    }

    async fn reboot(&self, node: &mut Node, timeout: Option<Duration>) -> Result<()> {
        self.power
            .set_power_state(node, PowerState::Reboot, timeout)
            .await
    }
}

#[async_trait]
impl ManagementInterface for OvhDriver {
    async fn validate(&self, node: &Node) -> Result<()> {
        self.validate_node(node).await
    }

    fn supported_boot_devices(&self) -> &'static [BootDevice] {
        &[BootDevice::Disk, BootDevice::Network]
    }

    async fn get_boot_device(&self, node: &Node) -> Result<BootDevice> {
        let resolver = BootTargetResolver::new(&self.client);
        if resolver.is_boot_on_disk(&node.server_name).await? {
            Ok(BootDevice::Disk)
        } else {
            Ok(BootDevice::Network)
        }
    }

    async fn set_boot_device(&self, node: &Node, device: BootDevice) -> Result<()> {
        let server = node.server_name.as_str();
        debug!(server = %server, device = %device, "setting boot device");

        let resolver = BootTargetResolver::new(&self.client);
        let boot_id = match device {
            BootDevice::Disk => resolver.resolve_disk(server).await?,
            BootDevice::Network => {
                resolver
                    .resolve_network_script(server, &self.config.boot_script)
                    .await?
            }
        };
        self.client.set_boot_id(server, boot_id).await
    }
}
