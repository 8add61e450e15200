use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::vcs::{VcsAdapter, VcsKind};

/// `scheme://[user@]host/` or scp-style `user@host:` prefix before the repo path.
static REMOTE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-zA-Z][a-zA-Z0-9+.-]*://(?:[^@/]+@)?[^/]+/|[^@/:\s]+@[^:/\s]+:)")
        .expect("valid regex")
});

/// Parse `(owner, name)` from a git remote URL.
///
/// Accepts https/ssh URLs, scp-style `git@host:owner/name.git`, and plain
/// filesystem paths. The owner is the path segment directly above the name.
pub fn parse_remote_url(url: &str) -> Result<(String, String)> {
    let trimmed = url.trim();
    let path = REMOTE_PREFIX.replace(trimmed, "");
    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);

    let mut segments = path.rsplit('/').filter(|s| !s.is_empty());
    match (segments.next(), segments.next()) {
        (Some(name), Some(owner)) => Ok((owner.to_string(), name.to_string())),
        _ => Err(Error::Vcs(format!(
            "cannot determine owner and name from remote url: {trimmed}"
        ))),
    }
}

/// Split `git ls-files -z` output into paths. Names that are not valid
/// UTF-8 cannot be carried in a review request and are an error.
fn split_nul_paths(stdout: &[u8]) -> Result<Vec<String>> {
    stdout
        .split(|b| *b == 0)
        .filter(|p| !p.is_empty())
        .map(|p| {
            String::from_utf8(p.to_vec()).map_err(|_| {
                Error::Vcs(format!(
                    "untracked file name is not valid UTF-8: {}",
                    String::from_utf8_lossy(p)
                ))
            })
        })
        .collect()
}

fn is_unborn_head(stderr: &str) -> bool {
    stderr.contains("Needed a single revision")
        || stderr.contains("unknown revision")
        || stderr.contains("ambiguous argument 'HEAD'")
}

fn git_in(dir: &Path, args: &[&str]) -> Result<Output> {
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| Error::Vcs(format!("failed to run git: {e}")))
}

/// Git working copy, driven through the `git` CLI.
pub struct GitRepo {
    dir: PathBuf,
    remote: String,
}

impl GitRepo {
    pub fn new(dir: PathBuf, remote: String) -> Self {
        Self { dir, remote }
    }

    fn git(&self, args: &[&str]) -> Result<Output> {
        git_in(&self.dir, args)
    }

    /// Run git and return trimmed stdout, failing on non-zero exit.
    fn git_stdout(&self, args: &[&str]) -> Result<String> {
        let output = self.git(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Vcs(format!(
                "git {} failed: {}",
                args.join(" "),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn head(&self) -> Result<Option<String>> {
        let output = self.git(&["rev-parse", "--verify", "HEAD"])?;
        if output.status.success() {
            return Ok(Some(
                String::from_utf8_lossy(&output.stdout).trim().to_string(),
            ));
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if is_unborn_head(&stderr) {
            return Ok(None);
        }
        Err(Error::Vcs(format!(
            "git rev-parse HEAD failed: {}",
            stderr.trim()
        )))
    }

    fn toplevel(&self) -> Result<PathBuf> {
        Ok(PathBuf::from(
            self.git_stdout(&["rev-parse", "--show-toplevel"])?,
        ))
    }

    /// Untracked, non-ignored files across the whole working tree, relative
    /// to `toplevel`.
    fn untracked_files(&self, toplevel: &Path) -> Result<Vec<String>> {
        let args = ["ls-files", "-z", "--others", "--exclude-standard"];
        let output = git_in(toplevel, &args)?;
        if !output.status.success() {
            return Err(Error::Vcs(format!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        split_nul_paths(&output.stdout)
    }

    fn new_file_patch(&self, toplevel: &Path, file: &str) -> Result<String> {
        let output = git_in(toplevel, &["diff", "--no-index", "--", "/dev/null", file])?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        // --no-index exits 1 when the files differ, which they always do here.
        match output.status.code() {
            Some(0) => Ok(stdout),
            Some(1) if !stdout.is_empty() || stderr.trim().is_empty() => Ok(stdout),
            _ => Err(Error::Vcs(format!(
                "git diff for untracked file {file} failed: {}",
                stderr.trim()
            ))),
        }
    }
}

impl VcsAdapter for GitRepo {
    fn kind(&self) -> VcsKind {
        VcsKind::Git
    }

    fn sync(&self) -> Result<()> {
        let Some(sha) = self.head()? else {
            debug!("HEAD is unborn, nothing to sync");
            return Ok(());
        };
        let refspec = format!("HEAD:refs/lingo/review/{sha}");
        info!(remote = %self.remote, sha = %sha, "pushing HEAD to review remote");
        self.git_stdout(&["push", "--quiet", "--force", &self.remote, &refspec])?;
        Ok(())
    }

    fn owner_and_name_from_remote(&self) -> Result<(String, String)> {
        let url = self.git_stdout(&["remote", "get-url", &self.remote])?;
        parse_remote_url(&url)
    }

    fn current_commit_id(&self) -> Result<String> {
        self.head()?.ok_or(Error::NoCommit)
    }

    fn patches(&self) -> Result<Vec<String>> {
        let mut patches = Vec::new();

        if self.head()?.is_some() {
            let output = self.git(&["diff", "HEAD"])?;
            if !output.status.success() {
                return Err(Error::Vcs(format!(
                    "git diff HEAD failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                )));
            }
            let diff = String::from_utf8_lossy(&output.stdout).into_owned();
            if !diff.is_empty() {
                patches.push(diff);
            }
        }

        let toplevel = self.toplevel()?;
        for file in self.untracked_files(&toplevel)? {
            let patch = self.new_file_patch(&toplevel, &file)?;
            if !patch.is_empty() {
                patches.push(patch);
            }
        }

        debug!(count = patches.len(), "collected patches");
        Ok(patches)
    }

    fn working_dir(&self) -> Result<String> {
        let prefix = self.git_stdout(&["rev-parse", "--show-prefix"])?;
        Ok(prefix.trim_end_matches('/').to_string())
    }
}
