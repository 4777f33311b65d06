use crate::connection::{ConnectionParams, Protocol};
use anyhow::{anyhow, bail, Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Connection details and directories for one vendor server.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct VendorConfig {
    pub name: String,
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub protocol: Option<Protocol>,
    /// Remote directory scanned for new files.
    #[serde(default = "default_src")]
    pub src: String,
    /// Where fetched files are written.
    #[serde(default)]
    pub dst: Option<String>,
}

fn default_src() -> String {
    ".".to_string()
}

/// The vendor list plus the optional shared drop server fetched files are
/// written to. Without a destination, files are written to each vendor's
/// `dst` on the local filesystem.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub vendors: Vec<VendorConfig>,
    #[serde(default)]
    pub destination: Option<VendorConfig>,
}

impl VendorConfig {
    /// An explicit protocol wins; otherwise it follows from the port.
    pub fn protocol(&self) -> Result<Protocol> {
        match (self.protocol, self.port) {
            (Some(protocol), _) => Ok(protocol),
            (None, Some(port)) => Protocol::from_port(port).ok_or_else(|| {
                anyhow!(
                    "{}: port {port} does not identify a protocol, set \"protocol\" to \"ftp\" or \"sftp\"",
                    self.name
                )
            }),
            (None, None) => bail!("{}: neither port nor protocol configured", self.name),
        }
    }

    pub fn port(&self) -> Result<u16> {
        match self.port {
            Some(port) => Ok(port),
            None => Ok(self.protocol()?.default_port()),
        }
    }

    pub fn connection_params(&self) -> Result<ConnectionParams> {
        let password = self
            .password
            .clone()
            .ok_or_else(|| anyhow!("{}: password not configured", self.name))?;
        Ok(ConnectionParams {
            name: self.name.clone(),
            username: self.username.clone(),
            password,
            host: self.host.clone(),
            port: self.port()?,
            protocol: self.protocol()?,
        })
    }
}

impl Config {
    /// Read from `path`, or from the default location when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()
                .ok_or_else(|| anyhow!("unable to determine a configuration directory"))?,
        };
        let content = fs::read_to_string(&path)
            .with_context(|| format!("unable to read vendor configuration {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("invalid vendor configuration {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let mut config: Config = serde_json::from_str(content)?;
        for vendor in config.vendors.iter_mut().chain(config.destination.as_mut()) {
            vendor.name = vendor.name.to_uppercase();
        }
        config.validate()?;
        Ok(config)
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "file-retriever", "file-retriever")
            .map(|dirs| dirs.config_dir().join("vendors.json"))
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for vendor in &self.vendors {
            if !seen.insert(vendor.name.as_str()) {
                bail!("vendor {} configured more than once", vendor.name);
            }
            vendor.protocol()?;
        }
        if let Some(destination) = &self.destination {
            destination.protocol()?;
        }
        Ok(())
    }

    pub fn vendor_names(&self) -> Vec<&str> {
        self.vendors.iter().map(|v| v.name.as_str()).collect()
    }

    /// Resolve vendor selectors case-insensitively. `all` selects every
    /// configured vendor.
    pub fn select(&self, selectors: &[String]) -> Result<Vec<VendorConfig>> {
        if selectors.iter().any(|s| s.eq_ignore_ascii_case("all")) {
            return Ok(self.vendors.clone());
        }

        let mut selected: Vec<VendorConfig> = Vec::new();
        for selector in selectors {
            let vendor = self
                .vendors
                .iter()
                .find(|v| v.name.eq_ignore_ascii_case(selector))
                .ok_or_else(|| {
                    anyhow!(
                        "unknown vendor {selector}; available: {}",
                        self.vendor_names().join(", ")
                    )
                })?;
            if !selected.iter().any(|v| v.name == vendor.name) {
                selected.push(vendor.clone());
            }
        }
        Ok(selected)
    }
}
