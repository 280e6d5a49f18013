//! Power-state transitions for dedicated servers.
//!
//! The API has no direct power switch: a transition swaps the server's
//! next-boot target to an iPXE script (a poweroff script, or the normal boot
//! script), hard-reboots, and polls the resulting task until it is terminal.
//! A boot target captured before a poweroff is restored on every exit path.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::api::DediClient;
use crate::boot::BootTargetResolver;
use crate::driver::Node;
use crate::error::{Error, Result};

/// Polling interval while waiting for the reboot task.
const POLL_INTERVAL_SECS: u64 = 3;

/// Default bound on the poll loop.
const POLL_TIMEOUT_SECS: u64 = 900;

/// Power states the driver reports and accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    /// Server is powered on.
    On,
    /// Server is powered off.
    Off,
    /// Server is rebooting.
    Reboot,
    /// Last transition ended in error.
    Error,
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On => write!(f, "on"),
            Self::Off => write!(f, "off"),
            Self::Reboot => write!(f, "reboot"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Drives one power transition end-to-end.
pub struct PowerController {
    client: Arc<DediClient>,
    poweroff_script: String,
    boot_script: String,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl PowerController {
    /// Create a controller using the two configured iPXE script names.
    #[must_use]
    pub fn new(
        client: Arc<DediClient>,
        poweroff_script: impl Into<String>,
        boot_script: impl Into<String>,
    ) -> Self {
        Self {
            client,
            poweroff_script: poweroff_script.into(),
            boot_script: boot_script.into(),
            poll_interval: Duration::from_secs(POLL_INTERVAL_SECS),
            poll_timeout: Duration::from_secs(POLL_TIMEOUT_SECS),
        }
    }

    /// Override the task poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Override the default poll deadline.
    #[must_use]
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Move the server to the requested power state and update the state
    /// reported on the node.
    ///
    /// A poweroff first captures the active boot target; that target is
    /// restored before this method returns, whatever the outcome of the
    /// transition.
    ///
    /// # Errors
    /// `Error::InvalidParameter` for a non-settable target state;
    /// `Error::Timeout` when the task does not reach a terminal status within
    /// `timeout` (or the controller default); any API failure from the
    /// resolve / mutate / reboot / poll steps, surfaced after the restoration
    /// attempt.
    pub async fn set_power_state(
        &self,
        node: &mut Node,
        target: PowerState,
        timeout: Option<Duration>,
    ) -> Result<()> {
        if target == PowerState::Error {
            return Err(Error::InvalidParameter(format!(
                "set_power_state called with an invalid power state: {target}"
            )));
        }

        let server = node.server_name.clone();
        debug!(server = %server, state = %target, "setting power state");

        // Only a poweroff needs rollback: for power-on and reboot the script
        // we select is exactly what the server should keep booting.
        let previous_boot_id = if target == PowerState::Off {
            let boot_id = self
                .client
                .get_server(&server)
                .await?
                .boot_id
                .ok_or_else(|| {
                    Error::UnexpectedResponse(format!("server {server} has no bootId"))
                })?;
            debug!(server = %server, boot_id, "saving boot target before poweroff");
            Some(boot_id)
        } else {
            None
        };

        let result = self.transition(node, &server, target, timeout).await;

        // Scoped restore: runs once after the mutate/reboot/poll sequence,
        // on the success path, the error-terminal path and every Err path.
        if let Some(boot_id) = previous_boot_id {
            debug!(server = %server, boot_id, "restoring boot target to previous value");
            if let Err(restore_err) = self.client.set_boot_id(&server, boot_id).await {
                error!(server = %server, boot_id, error = %restore_err, "failed to restore boot target");
                // The transition error, if any, stays the surfaced one; a
                // restore failure alone must still be reported.
                if result.is_ok() {
                    return Err(restore_err);
                }
            }
        }

        result
    }

    async fn transition(
        &self,
        node: &mut Node,
        server: &str,
        target: PowerState,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let resolver = BootTargetResolver::new(&self.client);
        let script = if target == PowerState::Off {
            &self.poweroff_script
        } else {
            &self.boot_script
        };
        let script_boot_id = resolver.resolve_network_script(server, script).await?;
        self.client.set_boot_id(server, script_boot_id).await?;

        let task = self.client.reboot_server(server).await?;
        info!(server = %server, task_id = task.task_id, "reboot task started");
        node.power_state = Some(PowerState::Reboot);

        let timeout = timeout.unwrap_or(self.poll_timeout);
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            tokio::time::sleep(self.poll_interval).await;

            if tokio::time::Instant::now() >= deadline {
                error!(server = %server, task_id = task.task_id, "reboot task did not finish in time");
                node.power_state = Some(PowerState::Error);
                return Err(Error::Timeout(timeout.as_secs()));
            }

            let current = self.client.get_task(server, task.task_id).await?;
            debug!(
                server = %server,
                task_id = task.task_id,
                status = %current.status,
                "reboot task polled"
            );

            if current.status.is_error() {
                error!(
                    server = %server,
                    task_id = task.task_id,
                    status = %current.status,
                    "reboot task ended in error"
                );
                node.power_state = Some(PowerState::Error);
                break;
            }

            if !current.status.is_in_progress() {
                info!(server = %server, task_id = task.task_id, "reboot task done");
                node.power_state = Some(target);
                break;
            }
        }

        Ok(())
    }
}
