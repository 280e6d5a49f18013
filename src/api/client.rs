//! Typed operations on the dedicated-server API.
//!
//! Path templates and JSON decoding live here; errors surface unchanged from
//! the transport, no operation retries.

use crate::api::models::{
    BootConfig, BootType, CreateIpxeScriptRequest, CredentialRequest, CredentialValidation,
    DedicatedServer, IpxeScript, Me, ServerTask, SetBootRequest,
};
use crate::api::transport::Api;
use crate::error::Result;

/// Client for the dedicated-server operations the driver needs.
pub struct DediClient {
    api: Api,
}

impl DediClient {
    /// Wrap a transport.
    #[must_use]
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    /// Access the underlying transport.
    #[must_use]
    pub fn api(&self) -> &Api {
        &self.api
    }

    /// Names of all dedicated servers the credentials can see.
    pub async fn list_servers(&self) -> Result<Vec<String>> {
        self.api.get("/dedicated/server").await
    }

    /// Server detail, including the active boot target id.
    pub async fn get_server(&self, server: &str) -> Result<DedicatedServer> {
        self.api.get(&format!("/dedicated/server/{server}")).await
    }

    /// Trigger a hard reboot; returns the asynchronous task tracking it.
    pub async fn reboot_server(&self, server: &str) -> Result<ServerTask> {
        self.api
            .post(
                &format!("/dedicated/server/{server}/reboot"),
                &serde_json::json!({}),
            )
            .await
    }

    /// Select the boot target used on next reboot.
    pub async fn set_boot_id(&self, server: &str, boot_id: i64) -> Result<()> {
        self.api
            .put_empty(
                &format!("/dedicated/server/{server}"),
                &SetBootRequest { boot_id },
            )
            .await
    }

    /// Current status of a server task.
    pub async fn get_task(&self, server: &str, task_id: i64) -> Result<ServerTask> {
        self.api
            .get(&format!("/dedicated/server/{server}/task/{task_id}"))
            .await
    }

    /// Boot target ids of one kind, in remote order.
    pub async fn list_boot_ids(&self, server: &str, boot_type: BootType) -> Result<Vec<i64>> {
        self.api
            .get(&format!(
                "/dedicated/server/{server}/boot?bootType={}",
                boot_type.as_str()
            ))
            .await
    }

    /// Detail of one boot target.
    pub async fn get_boot(&self, server: &str, boot_id: i64) -> Result<BootConfig> {
        self.api
            .get(&format!("/dedicated/server/{server}/boot/{boot_id}"))
            .await
    }

    /// Request a consumer key (unauthenticated call, part of the one-time
    /// provisioning flow).
    pub async fn request_credential(
        &self,
        request: &CredentialRequest,
    ) -> Result<CredentialValidation> {
        self.api.post("/auth/credential", request).await
    }

    /// Account information, used to verify a freshly validated consumer key.
    pub async fn me(&self) -> Result<Me> {
        self.api.get("/me").await
    }

    /// Names of all stored iPXE scripts.
    pub async fn list_ipxe_scripts(&self) -> Result<Vec<String>> {
        self.api.get("/me/ipxeScript").await
    }

    /// One stored iPXE script by name.
    pub async fn get_ipxe_script(&self, name: &str) -> Result<IpxeScript> {
        self.api.get(&format!("/me/ipxeScript/{name}")).await
    }

    /// Upload an iPXE script.
    pub async fn create_ipxe_script(&self, request: &CreateIpxeScriptRequest) -> Result<()> {
        self.api.post_empty("/me/ipxeScript", request).await
    }
}
