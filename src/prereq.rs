use std::fmt;
use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::cli::Cli;
use crate::config::{PlatformConfig, config_home};
use crate::error::{Error, Result, ResultExt};
use crate::vcs::{VcsKind, detect_kind};

/// Environment a review needs, checked in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Vcs,
    Home,
    Config,
    Auth,
    Version,
}

pub const REVIEW_REQUIREMENTS: [Requirement; 5] = [
    Requirement::Vcs,
    Requirement::Home,
    Requirement::Config,
    Requirement::Auth,
    Requirement::Version,
];

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Requirement::Vcs => "vcs",
            Requirement::Home => "home",
            Requirement::Config => "config",
            Requirement::Auth => "auth",
            Requirement::Version => "version",
        };
        f.write_str(name)
    }
}

/// Check every requirement for a review of `dir`, stopping at the first
/// failure. Returns the loaded platform config.
pub fn verify(cli: &Cli, dir: &Path) -> Result<PlatformConfig> {
    let kind = check(Requirement::Vcs, || detect_kind(dir))?;
    check(Requirement::Home, config_home)?;
    let config = check(Requirement::Config, || PlatformConfig::load(cli))?;
    check(Requirement::Auth, || check_auth(&config))?;
    check(Requirement::Version, || check_version(kind))?;
    Ok(config)
}

fn check<T>(requirement: Requirement, f: impl FnOnce() -> Result<T>) -> Result<T> {
    debug!(%requirement, "checking prerequisite");
    f().context(format!("prerequisite {requirement} not met"))
}

pub fn check_auth(config: &PlatformConfig) -> Result<()> {
    match config.token.as_deref() {
        Some(token) if !token.trim().is_empty() => Ok(()),
        _ => Err(Error::Prerequisite(
            "no service token configured (set service.token or LINGO_TOKEN)".to_string(),
        )),
    }
}

/// Confirm the VCS tool runs, returning its version line.
pub fn check_version(kind: VcsKind) -> Result<String> {
    let binary = kind.binary();
    let flag = match kind {
        VcsKind::Git => "--version",
        VcsKind::Perforce => "-V",
    };
    let output = Command::new(binary).arg(flag).output().map_err(|e| {
        Error::Prerequisite(format!("failed to run {binary} (is it installed?): {e}"))
    })?;
    if !output.status.success() {
        return Err(Error::Prerequisite(format!(
            "{binary} {flag} exited with {}",
            output.status
        )));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let version = stdout
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or_default()
        .trim()
        .to_string();
    debug!(%binary, %version, "vcs tool found");
    Ok(version)
}
