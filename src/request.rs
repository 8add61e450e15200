use serde::Serialize;

use crate::config::VcsPlatform;
use crate::error::{Error, Result};
use crate::vcs::VcsKind;

/// Combined patch size at which the operator is warned. The service's
/// message limit is well above this, so the request is still sent.
pub const PATCH_WARNING_BYTES: usize = 1024 * 1024;

pub const LARGE_PATCH_WARNING: &str =
    "Warning: large diffs can be error prone. You may need to commit your changes.";

/// Identity of the reviewed repository's namespace. Which variant is set
/// follows from the VCS kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerOrDepot {
    Owner(String),
    Depot(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewRequest {
    pub repo: String,
    pub commit_id: String,
    pub patches: Vec<String>,
    pub vcs: VcsKind,
    pub working_dir: String,
    /// Policy override; empty means "use the repository's own policies".
    pub policy: String,
    pub host: String,
    pub host_name: String,
    #[serde(flatten)]
    pub owner_or_depot: OwnerOrDepot,
    pub diff_only: bool,
}

impl ReviewRequest {
    /// Reject requests that must not be sent.
    pub fn validate(&self) -> Result<()> {
        match (&self.vcs, &self.owner_or_depot) {
            (VcsKind::Git, OwnerOrDepot::Owner(_)) | (VcsKind::Perforce, OwnerOrDepot::Depot(_)) => {}
            (vcs, other) => {
                return Err(Error::MalformedRequest(format!(
                    "{vcs} request carries {other:?}"
                )));
            }
        }
        if self.commit_id.trim().is_empty() {
            return Err(Error::MalformedRequest("commit id is empty".to_string()));
        }
        if self.repo.trim().is_empty() {
            return Err(Error::MalformedRequest("repository name is empty".to_string()));
        }
        Ok(())
    }
}

/// Everything the builder needs, already resolved from the VCS adapter,
/// the policy loader and the platform config.
#[derive(Debug, Clone)]
pub struct RequestInputs {
    pub vcs: VcsKind,
    pub owner: String,
    pub name: String,
    pub commit_id: String,
    pub patches: Vec<String>,
    pub working_dir: String,
    pub policy: String,
    pub platform: VcsPlatform,
    pub diff_only: bool,
}

pub fn build_request(inputs: RequestInputs) -> Result<ReviewRequest> {
    if inputs.commit_id.trim().is_empty() {
        return Err(Error::NoCommit);
    }

    let (repo, owner_or_depot) = match inputs.vcs {
        VcsKind::Git => (inputs.name, OwnerOrDepot::Owner(inputs.owner)),
        VcsKind::Perforce => {
            let depot = inputs
                .platform
                .depot
                .filter(|d| !d.trim().is_empty())
                .ok_or(Error::MissingDepotConfig)?;
            (
                format!("{}/{}", inputs.owner, inputs.name),
                OwnerOrDepot::Depot(depot),
            )
        }
    };

    Ok(ReviewRequest {
        repo,
        commit_id: inputs.commit_id,
        patches: inputs.patches,
        vcs: inputs.vcs,
        working_dir: inputs.working_dir,
        policy: inputs.policy,
        host: inputs.platform.host,
        host_name: inputs.platform.host_name,
        owner_or_depot,
        diff_only: inputs.diff_only,
    })
}

pub fn patches_size(patches: &[String]) -> usize {
    patches.iter().map(String::len).sum()
}

/// The large-diff warning, if the combined patches reach the threshold.
pub fn patch_size_warning(patches: &[String]) -> Option<&'static str> {
    (patches_size(patches) >= PATCH_WARNING_BYTES).then_some(LARGE_PATCH_WARNING)
}
