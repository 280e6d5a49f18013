//! One-time provisioning tool for the ovhpower driver.
//!
//! Runs the interactive credential-consent flow, uploads the two iPXE
//! scripts the driver boots through, and prints the resulting configuration
//! block. The driver itself assumes this flow already completed.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use dialoguer::{theme::ColorfulTheme, Confirm};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use ovhpower::api::models::{AccessRule, CreateIpxeScriptRequest, CredentialRequest};
use ovhpower::{Api, DediClient, Endpoint, Error};

/// ovhpower-setup - obtain a consumer key and upload the iPXE scripts.
#[derive(Parser)]
#[command(name = "ovhpower-setup")]
#[command(about = "One-time credential and iPXE script provisioning for ovhpower")]
struct Cli {
    /// Setup configuration file to process.
    file: PathBuf,

    /// Enable verbose logging.
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

/// Input for the provisioning run.
#[derive(Debug, Deserialize)]
struct SetupConfig {
    api: ApiSection,
    poweroff: ScriptSection,
    boot: ScriptSection,
}

#[derive(Debug, Deserialize)]
struct ApiSection {
    #[serde(default)]
    endpoint: Endpoint,
    application_key: String,
    application_secret: String,
}

#[derive(Debug, Deserialize)]
struct ScriptSection {
    /// Name the script is stored under.
    name: String,
    /// Local file holding the script content.
    file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let raw = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("cannot read {}", cli.file.display()))?;
    let config: SetupConfig =
        toml::from_str(&raw).with_context(|| format!("cannot parse {}", cli.file.display()))?;

    // Script files resolve relative to the config file, like the config
    // itself is written.
    let base_dir = cli.file.parent().unwrap_or_else(|| Path::new("."));
    let poweroff_content = load_script(base_dir, &config.poweroff.file)?;
    let boot_content = load_script(base_dir, &config.boot.file)?;

    let consumer_key = authenticate(&config.api).await?;

    let api = Api::new(
        config.api.endpoint.base_url(),
        config.api.application_key.as_str(),
        config.api.application_secret.as_str(),
        consumer_key.as_str(),
    )?
    .with_debug(cli.verbose);
    let client = DediClient::new(api);

    let me = client
        .me()
        .await
        .context("authentication check against /me failed")?;
    println!(
        "Successfully authenticated as {} ({} {})",
        me.nichandle,
        me.firstname.unwrap_or_default(),
        me.name.unwrap_or_default()
    );

    upload_ipxe_script(&client, &config.poweroff.name, &poweroff_content).await?;
    upload_ipxe_script(&client, &config.boot.name, &boot_content).await?;

    println!(
        "\nInsert the following block in the ovhpower configuration file:\n\n\
         [ovhapi]\n\
         endpoint = \"{}\"\n\
         application_key = \"{}\"\n\
         application_secret = \"{}\"\n\
         consumer_key = \"{}\"\n\
         poweroff_script = \"{}\"\n\
         boot_script = \"{}\"",
        config.api.endpoint,
        config.api.application_key,
        config.api.application_secret,
        consumer_key,
        config.poweroff.name,
        config.boot.name
    );

    Ok(())
}

fn load_script(base_dir: &Path, file: &Path) -> Result<String> {
    let path = if file.is_absolute() {
        file.to_path_buf()
    } else {
        base_dir.join(file)
    };
    std::fs::read_to_string(&path)
        .with_context(|| format!("cannot load iPXE script file {}", path.display()))
}

/// Request a consumer key with read/write access to the server and account
/// paths the driver uses, and wait for the user to validate it.
async fn authenticate(api_config: &ApiSection) -> Result<String> {
    let api = Api::new(
        api_config.endpoint.base_url(),
        api_config.application_key.as_str(),
        api_config.application_secret.as_str(),
        // No consumer key yet: the credential request is unauthenticated.
        "",
    )?;
    let client = DediClient::new(api);

    let mut access_rules = Vec::new();
    for path in ["/dedicated/server", "/dedicated/server/*", "/me", "/me/*"] {
        access_rules.extend(AccessRule::read_write(path));
    }

    let validation = client
        .request_credential(&CredentialRequest {
            access_rules,
            redirection: None,
        })
        .await
        .context("credential request failed")?;

    println!("Please visit {} to authenticate", validation.validation_url);
    let confirmed = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Consumer key validated in the browser?")
        .interact()?;
    if !confirmed {
        bail!("consumer key was not validated");
    }

    Ok(validation.consumer_key)
}

/// Upload a script unless one with the same name already exists.
async fn upload_ipxe_script(client: &DediClient, name: &str, content: &str) -> Result<()> {
    match client.get_ipxe_script(name).await {
        Ok(_) => {
            println!("iPXE script {name} already exists, keeping it");
            return Ok(());
        }
        Err(Error::Api { status: 404, .. }) => {}
        Err(e) => return Err(e).with_context(|| format!("cannot check iPXE script {name}")),
    }

    client
        .create_ipxe_script(&CreateIpxeScriptRequest {
            name: name.to_string(),
            description: format!("{name} iPXE script"),
            script: content.to_string(),
        })
        .await
        .with_context(|| format!("cannot upload iPXE script {name}"))?;

    println!("iPXE script {name} successfully created");
    Ok(())
}
