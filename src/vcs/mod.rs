pub mod git;
pub mod perforce;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;

use crate::config::PlatformConfig;
use crate::error::{Error, Result};

pub use git::GitRepo;
pub use perforce::PerforceClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VcsKind {
    Git,
    Perforce,
}

impl VcsKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VcsKind::Git => "git",
            VcsKind::Perforce => "perforce",
        }
    }

    /// Name of the tool binary driven by the adapter for this kind.
    pub fn binary(&self) -> &'static str {
        match self {
            VcsKind::Git => "git",
            VcsKind::Perforce => "p4",
        }
    }
}

impl fmt::Display for VcsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VcsKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "git" => Ok(VcsKind::Git),
            "perforce" | "p4" => Ok(VcsKind::Perforce),
            other => Err(Error::UnsupportedVcsKind(other.to_string())),
        }
    }
}

/// What the review flow needs from a working copy.
pub trait VcsAdapter {
    fn kind(&self) -> VcsKind;

    /// Make the local state visible to the review service.
    fn sync(&self) -> Result<()>;

    fn owner_and_name_from_remote(&self) -> Result<(String, String)>;

    /// Fails with [`Error::NoCommit`] when the repository has no commits.
    fn current_commit_id(&self) -> Result<String>;

    /// Uncommitted changes as unified diff text. May be empty.
    fn patches(&self) -> Result<Vec<String>>;

    /// Current directory relative to the repository root.
    fn working_dir(&self) -> Result<String>;
}

/// Walk up from `dir` and report the nearest working-copy marker.
pub fn detect_kind(dir: &Path) -> Result<VcsKind> {
    let p4config = std::env::var("P4CONFIG").unwrap_or_else(|_| ".p4config".to_string());

    for ancestor in dir.ancestors() {
        if ancestor.join(".git").exists() {
            return Ok(VcsKind::Git);
        }
        if ancestor.join(&p4config).is_file() {
            return Ok(VcsKind::Perforce);
        }
        if ancestor.join(".hg").exists() {
            return Err(Error::UnsupportedVcsKind("mercurial".to_string()));
        }
        if ancestor.join(".svn").exists() {
            return Err(Error::UnsupportedVcsKind("subversion".to_string()));
        }
    }

    if std::env::var_os("P4CLIENT").is_some() {
        return Ok(VcsKind::Perforce);
    }

    Err(Error::Vcs(format!(
        "{} is not inside a git or perforce working copy",
        dir.display()
    )))
}

/// Enum dispatching to the adapter for the detected VCS.
pub enum AnyVcs {
    Git(GitRepo),
    Perforce(PerforceClient),
}

impl AnyVcs {
    /// Detect the working copy around `dir` and open the matching adapter.
    pub fn open(dir: &Path, config: &PlatformConfig) -> Result<Self> {
        match detect_kind(dir)? {
            VcsKind::Git => {
                let remote = config.remote_name(VcsKind::Git)?;
                Ok(AnyVcs::Git(GitRepo::new(dir.to_path_buf(), remote)))
            }
            VcsKind::Perforce => Ok(AnyVcs::Perforce(PerforceClient::new(dir.to_path_buf()))),
        }
    }
}

impl VcsAdapter for AnyVcs {
    fn kind(&self) -> VcsKind {
        match self {
            AnyVcs::Git(r) => r.kind(),
            AnyVcs::Perforce(r) => r.kind(),
        }
    }

    fn sync(&self) -> Result<()> {
        match self {
            AnyVcs::Git(r) => r.sync(),
            AnyVcs::Perforce(r) => r.sync(),
        }
    }

    fn owner_and_name_from_remote(&self) -> Result<(String, String)> {
        match self {
            AnyVcs::Git(r) => r.owner_and_name_from_remote(),
            AnyVcs::Perforce(r) => r.owner_and_name_from_remote(),
        }
    }

    fn current_commit_id(&self) -> Result<String> {
        match self {
            AnyVcs::Git(r) => r.current_commit_id(),
            AnyVcs::Perforce(r) => r.current_commit_id(),
        }
    }

    fn patches(&self) -> Result<Vec<String>> {
        match self {
            AnyVcs::Git(r) => r.patches(),
            AnyVcs::Perforce(r) => r.patches(),
        }
    }

    fn working_dir(&self) -> Result<String> {
        match self {
            AnyVcs::Git(r) => r.working_dir(),
            AnyVcs::Perforce(r) => r.working_dir(),
        }
    }
}
