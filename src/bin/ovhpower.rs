//! ovhpower CLI - power and boot management for OVH dedicated servers.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ovhpower::{
    BootDevice, DriverConfig, ManagementInterface, Node, OvhDriver, PowerInterface, PowerState,
};

/// ovhpower CLI - drive power and boot state of OVH dedicated servers.
#[derive(Parser)]
#[command(name = "ovhpower")]
#[command(about = "Power and boot management for OVH dedicated servers")]
struct Cli {
    /// Path to the TOML configuration file (or set `OVHPOWER_CONFIG` env var).
    #[arg(long, env = "OVHPOWER_CONFIG", default_value = "/etc/ovhpower.toml")]
    config: PathBuf,

    /// Enable verbose logging, including per-request lines with obfuscated
    /// credentials.
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all dedicated servers visible to the credentials.
    List,

    /// Show details of one server.
    Show {
        /// Server name.
        #[arg(long)]
        server: String,
    },

    /// Validate configuration and check the server belongs to the account.
    Validate {
        /// Server name.
        #[arg(long)]
        server: String,
    },

    /// Check that both configured iPXE scripts are uploaded.
    VerifyScripts,

    /// Power a server on.
    PowerOn {
        /// Server name.
        #[arg(long)]
        server: String,

        /// Maximum seconds to wait for the reboot task.
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Power a server off by booting the poweroff script; the previous boot
    /// target is restored afterwards.
    PowerOff {
        /// Server name.
        #[arg(long)]
        server: String,

        /// Maximum seconds to wait for the reboot task.
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Reboot a server onto the configured boot script.
    Reboot {
        /// Server name.
        #[arg(long)]
        server: String,

        /// Maximum seconds to wait for the reboot task.
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Show the device the server currently boots from.
    GetBoot {
        /// Server name.
        #[arg(long)]
        server: String,
    },

    /// Select the device the server boots from on next reboot.
    SetBoot {
        /// Server name.
        #[arg(long)]
        server: String,

        /// Boot device: disk or network.
        #[arg(long)]
        device: BootDevice,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = DriverConfig::from_file(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    let driver =
        OvhDriver::with_debug(config, cli.verbose).context("failed to create OVH driver")?;

    match cli.command {
        Commands::List => {
            let servers = driver.client().list_servers().await?;
            for server in servers {
                println!("{server}");
            }
        }

        Commands::Show { server } => {
            let detail = driver.client().get_server(&server).await?;
            println!("\nServer Details:");
            println!("  Name:       {}", detail.name);
            println!("  IP:         {}", detail.ip.unwrap_or_default());
            println!("  Datacenter: {}", detail.datacenter.unwrap_or_default());
            println!("  State:      {}", detail.state);
            println!("  Reverse:    {}", detail.reverse.unwrap_or_default());
            println!(
                "  Boot ID:    {}",
                detail.boot_id.map_or_else(|| "-".to_string(), |id| id.to_string())
            );
        }

        Commands::Validate { server } => {
            let node = Node::new(server);
            PowerInterface::validate(&driver, &node).await?;
            println!("OK");
        }

        Commands::VerifyScripts => {
            driver.verify_scripts().await?;
            println!("OK");
        }

        Commands::PowerOn { server, timeout } => {
            set_power(&driver, &server, PowerState::On, timeout).await?;
        }

        Commands::PowerOff { server, timeout } => {
            set_power(&driver, &server, PowerState::Off, timeout).await?;
        }

        Commands::Reboot { server, timeout } => {
            set_power(&driver, &server, PowerState::Reboot, timeout).await?;
        }

        Commands::GetBoot { server } => {
            let node = Node::new(server);
            let device = driver.get_boot_device(&node).await?;
            println!("{device}");
        }

        Commands::SetBoot { server, device } => {
            let node = Node::new(server);
            ManagementInterface::validate(&driver, &node).await?;
            driver.set_boot_device(&node, device).await?;
            info!(server = %node.server_name, device = %device, "boot device set");
        }
    }

    Ok(())
}

async fn set_power(
    driver: &OvhDriver,
    server: &str,
    state: PowerState,
    timeout: Option<u64>,
) -> Result<()> {
    let mut node = Node::new(server);
    PowerInterface::validate(driver, &node).await?;

    driver
        .set_power_state(&mut node, state, timeout.map(Duration::from_secs))
        .await
        .with_context(|| format!("failed to set power state of {server} to {state}"))?;

    match node.power_state {
        Some(reported) => println!("{server}: {reported}"),
        None => println!("{server}: unknown"),
    }
    Ok(())
}
