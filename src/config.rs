use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cli::Cli;
use crate::error::{Error, Result};
use crate::vcs::VcsKind;

pub const CONFIG_FILE_NAME: &str = "platform.toml";

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServiceSection {
    pub address: Option<String>,
    pub token: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RemoteSection {
    pub server_addr: Option<String>,
    pub remote_name: Option<String>,
    /// Perforce only.
    pub depot: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub service: ServiceSection,
    #[serde(default)]
    pub git: RemoteSection,
    #[serde(default)]
    pub perforce: RemoteSection,
}

/// Resolved per-VCS endpoint settings fed into the request builder.
#[derive(Debug, Clone, PartialEq)]
pub struct VcsPlatform {
    pub host: String,
    pub host_name: String,
    pub depot: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlatformConfig {
    pub service_address: String,
    pub token: Option<String>,
    pub timeout: Option<Duration>,
    pub git: RemoteSection,
    pub perforce: RemoteSection,
}

impl PlatformConfig {
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = match cli.config.as_deref() {
            Some(path) => PathBuf::from(path),
            None => default_path()?,
        };
        if !config_path.exists() {
            return Err(Error::ConfigNotFound(config_path));
        }
        let content = std::fs::read_to_string(&config_path)?;
        let file_config = parse_config(&content)?;
        merge(file_config, cli, std::env::var("LINGO_TOKEN").ok())
    }

    fn section(&self, kind: VcsKind) -> &RemoteSection {
        match kind {
            VcsKind::Git => &self.git,
            VcsKind::Perforce => &self.perforce,
        }
    }

    pub fn server_addr(&self, kind: VcsKind) -> Result<String> {
        required(
            self.section(kind).server_addr.as_deref(),
            &format!("{}.server_addr", kind.as_str()),
        )
    }

    pub fn remote_name(&self, kind: VcsKind) -> Result<String> {
        required(
            self.section(kind).remote_name.as_deref(),
            &format!("{}.remote_name", kind.as_str()),
        )
    }

    /// Configured perforce depot, if any. Emptiness is enforced by the
    /// request builder.
    pub fn depot_name(&self) -> Option<String> {
        self.perforce.depot.clone()
    }

    pub fn vcs_platform(&self, kind: VcsKind) -> Result<VcsPlatform> {
        Ok(VcsPlatform {
            host: self.server_addr(kind)?,
            host_name: self.remote_name(kind)?,
            depot: match kind {
                VcsKind::Git => None,
                VcsKind::Perforce => self.depot_name(),
            },
        })
    }
}

fn required(value: Option<&str>, key: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.to_string()),
        _ => Err(Error::ConfigValidation(format!("{key} is not set"))),
    }
}

/// Directory holding lingo's user config: `$LINGO_HOME`, else `~/.lingo`.
pub fn config_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("LINGO_HOME") {
        return Ok(PathBuf::from(dir));
    }
    std::env::var_os("HOME")
        .map(|home| Path::new(&home).join(".lingo"))
        .ok_or_else(|| {
            Error::ConfigValidation("cannot locate home directory (HOME is unset)".to_string())
        })
}

pub fn default_path() -> Result<PathBuf> {
    Ok(config_home()?.join(CONFIG_FILE_NAME))
}

pub fn parse_config(content: &str) -> Result<ConfigFile> {
    let config: ConfigFile = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &ConfigFile) -> Result<()> {
    if let Some(ref address) = config.service.address
        && !(address.starts_with("http://") || address.starts_with("https://"))
    {
        return Err(Error::ConfigValidation(format!(
            "service.address must be an http(s) url: {address}"
        )));
    }
    if let Some(timeout) = config.service.timeout_secs
        && timeout == 0
    {
        return Err(Error::ConfigValidation(
            "service.timeout_secs must be > 0".to_string(),
        ));
    }
    Ok(())
}

pub fn merge(file: ConfigFile, cli: &Cli, env_token: Option<String>) -> Result<PlatformConfig> {
    let service_address = required(file.service.address.as_deref(), "service.address")?;
    let timeout_secs = cli.timeout.or(file.service.timeout_secs);
    if timeout_secs == Some(0) {
        return Err(Error::ConfigValidation("timeout must be > 0".to_string()));
    }

    Ok(PlatformConfig {
        service_address: service_address.trim_end_matches('/').to_string(),
        token: env_token.or(file.service.token),
        timeout: timeout_secs.map(Duration::from_secs),
        git: file.git,
        perforce: file.perforce,
    })
}
