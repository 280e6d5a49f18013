//! Driver configuration: API endpoint aliases, credentials and the names of
//! the two iPXE scripts used to drive power transitions.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{Error, Result};

/// OVH API regional endpoints.
///
/// Aliases and base URLs mirror the fixed set the API documents; there is no
/// free-form endpoint, the driver always talks to one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum Endpoint {
    #[default]
    #[serde(rename = "ovh-eu")]
    OvhEu,
    #[serde(rename = "ovh-us")]
    OvhUs,
    #[serde(rename = "ovh-ca")]
    OvhCa,
    #[serde(rename = "kimsufi-eu")]
    KimsufiEu,
    #[serde(rename = "kimsufi-ca")]
    KimsufiCa,
    #[serde(rename = "soyoustart-eu")]
    SoyoustartEu,
    #[serde(rename = "soyoustart-ca")]
    SoyoustartCa,
}

impl Endpoint {
    /// Base URL of the endpoint, without a trailing slash.
    #[must_use]
    pub fn base_url(self) -> &'static str {
        match self {
            Self::OvhEu => "https://eu.api.ovh.com/1.0",
            Self::OvhUs => "https://api.us.ovhcloud.com/1.0",
            Self::OvhCa => "https://ca.api.ovh.com/1.0",
            Self::KimsufiEu => "https://eu.api.kimsufi.com/1.0",
            Self::KimsufiCa => "https://ca.api.kimsufi.com/1.0",
            Self::SoyoustartEu => "https://eu.api.soyoustart.com/1.0",
            Self::SoyoustartCa => "https://ca.api.soyoustart.com/1.0",
        }
    }

    /// Alias as it appears in configuration files.
    #[must_use]
    pub fn alias(self) -> &'static str {
        match self {
            Self::OvhEu => "ovh-eu",
            Self::OvhUs => "ovh-us",
            Self::OvhCa => "ovh-ca",
            Self::KimsufiEu => "kimsufi-eu",
            Self::KimsufiCa => "kimsufi-ca",
            Self::SoyoustartEu => "soyoustart-eu",
            Self::SoyoustartCa => "soyoustart-ca",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.alias())
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ovh-eu" => Ok(Self::OvhEu),
            "ovh-us" => Ok(Self::OvhUs),
            "ovh-ca" => Ok(Self::OvhCa),
            "kimsufi-eu" => Ok(Self::KimsufiEu),
            "kimsufi-ca" => Ok(Self::KimsufiCa),
            "soyoustart-eu" => Ok(Self::SoyoustartEu),
            "soyoustart-ca" => Ok(Self::SoyoustartCa),
            other => Err(Error::InvalidParameter(format!(
                "unknown endpoint alias: {other}"
            ))),
        }
    }
}

/// Driver configuration, the `[ovhapi]` table of the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct DriverConfig {
    /// API endpoint alias.
    #[serde(default)]
    pub endpoint: Endpoint,
    /// Application key, given on application registration.
    #[serde(default)]
    pub application_key: String,
    /// Application secret, given on application registration.
    #[serde(default)]
    pub application_secret: String,
    /// Consumer key obtained from the credential-consent flow. Empty means
    /// unauthenticated calls only.
    #[serde(default)]
    pub consumer_key: String,
    /// Name of the iPXE script that powers the server off.
    #[serde(default)]
    pub poweroff_script: String,
    /// Name of the iPXE script used for normal network boot.
    #[serde(default)]
    pub boot_script: String,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    ovhapi: DriverConfig,
}

impl DriverConfig {
    /// Load the `[ovhapi]` table from a TOML file.
    ///
    /// # Errors
    /// Returns `Error::InvalidParameter` if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidParameter(format!("cannot read {}: {e}", path.display()))
        })?;
        let file: ConfigFile = toml::from_str(&raw).map_err(|e| {
            Error::InvalidParameter(format!("cannot parse {}: {e}", path.display()))
        })?;
        Ok(file.ovhapi)
    }

    /// Check that every field the driver needs is present.
    ///
    /// # Errors
    /// Returns `Error::MissingParameter` naming the first absent field.
    pub fn check_required(&self) -> Result<()> {
        let required = [
            ("ovhapi.application_key", &self.application_key),
            ("ovhapi.application_secret", &self.application_secret),
            ("ovhapi.consumer_key", &self.consumer_key),
            ("ovhapi.poweroff_script", &self.poweroff_script),
            ("ovhapi.boot_script", &self.boot_script),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(Error::MissingParameter(name.to_string()));
            }
        }
        Ok(())
    }
}
