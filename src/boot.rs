//! Resolution of boot intents to concrete boot target ids.
//!
//! Targets are enumerated fresh on every resolution: the remote inventory can
//! change between calls, so nothing here is cached.

use tracing::warn;

use crate::api::models::BootType;
use crate::api::DediClient;
use crate::error::{Error, Result};

/// Maps a boot intent (disk, or a named network-boot script) to the opaque
/// boot target id the API expects.
pub struct BootTargetResolver<'a> {
    client: &'a DediClient,
}

impl<'a> BootTargetResolver<'a> {
    #[must_use]
    pub fn new(client: &'a DediClient) -> Self {
        Self { client }
    }

    /// First disk boot target of the server.
    ///
    /// First-match policy: the API is expected to expose at most one
    /// meaningful disk target; with several, the result follows remote list
    /// order.
    ///
    /// # Errors
    /// `Error::NotFound` when the server has no disk boot target.
    pub async fn resolve_disk(&self, server: &str) -> Result<i64> {
        let ids = self.client.list_boot_ids(server, BootType::Harddisk).await?;
        ids.first().copied().ok_or_else(|| {
            Error::NotFound(format!("no harddisk boot target on server {server}"))
        })
    }

    /// Network-boot target whose script name equals `script`.
    ///
    /// Scans every `ipxeCustomerScript` target of the server and compares the
    /// detail's `kernel` field. A target whose detail cannot be fetched is
    /// logged and skipped so one bad entry does not abort the scan.
    ///
    /// # Errors
    /// `Error::NotFound` when no target matches after exhausting the list.
    pub async fn resolve_network_script(&self, server: &str, script: &str) -> Result<i64> {
        let ids = self
            .client
            .list_boot_ids(server, BootType::IpxeCustomerScript)
            .await?;

        for boot_id in ids {
            let boot = match self.client.get_boot(server, boot_id).await {
                Ok(boot) => boot,
                Err(e) => {
                    warn!(server = %server, boot_id, error = %e, "skipping boot target, detail fetch failed");
                    continue;
                }
            };
            if boot.kernel.as_deref() == Some(script) {
                return Ok(boot_id);
            }
        }

        Err(Error::NotFound(format!(
            "no netboot found for script {script} on server {server}"
        )))
    }

    /// Whether the server's active boot target is its disk.
    ///
    /// # Errors
    /// `Error::UnexpectedResponse` when the server record carries no boot id.
    pub async fn is_boot_on_disk(&self, server: &str) -> Result<bool> {
        let detail = self.client.get_server(server).await?;
        let boot_id = detail.boot_id.ok_or_else(|| {
            Error::UnexpectedResponse(format!("server {server} has no bootId"))
        })?;
        let boot = self.client.get_boot(server, boot_id).await?;
        Ok(boot.boot_type == BootType::Harddisk)
    }
}
