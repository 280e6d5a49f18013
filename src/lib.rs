//! Power and boot management for OVH dedicated servers.
//!
//! Dedicated servers have no remotely switchable power feed; what the API
//! does offer is control of the next-boot target plus a hard reboot, both
//! behind signed requests. This crate drives power transitions through that
//! surface: swap the boot target to an iPXE script, reboot, poll the
//! asynchronous task, and restore the previous boot target when one was
//! saved.
//!
//! # Example
//!
//! ```rust,ignore
//! use ovhpower::{DriverConfig, Node, OvhDriver, PowerInterface, PowerState};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = DriverConfig::from_file("/etc/ovhpower.toml")?;
//!     let driver = OvhDriver::new(config)?;
//!
//!     let mut node = Node::new("ns1234567.ip-1-2-3.eu");
//!     driver.validate(&node).await?;
//!     driver.set_power_state(&mut node, PowerState::Off, None).await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod boot;
pub mod config;
pub mod driver;
pub mod error;
pub mod power;

pub use api::{Api, DediClient};
pub use config::{DriverConfig, Endpoint};
pub use driver::{BootDevice, ManagementInterface, Node, OvhDriver, PowerInterface};
pub use error::{Error, Result};
pub use power::{PowerController, PowerState};
