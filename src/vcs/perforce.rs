use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::debug;

use crate::error::{Error, Result};
use crate::vcs::{VcsAdapter, VcsKind};

/// Split a stream or depot path `//owner/name[/...]` into `(owner, name)`.
pub fn parse_stream_path(stream: &str) -> Result<(String, String)> {
    let rest = stream.trim().strip_prefix("//").ok_or_else(|| {
        Error::Vcs(format!("not a perforce depot path: {}", stream.trim()))
    })?;
    let mut segments = rest.split('/').filter(|s| !s.is_empty());
    match (segments.next(), segments.next()) {
        (Some(owner), Some(name)) => Ok((owner.to_string(), name.to_string())),
        _ => Err(Error::Vcs(format!(
            "cannot determine depot and name from stream: {}",
            stream.trim()
        ))),
    }
}

/// `dir` relative to the client root, with `/` separators.
pub fn relative_to_root(root: &Path, dir: &Path) -> Result<String> {
    let rel = dir.strip_prefix(root).map_err(|_| {
        Error::Vcs(format!(
            "{} is outside the perforce client root {}",
            dir.display(),
            root.display()
        ))
    })?;
    Ok(rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/"))
}

/// The `p4 diff -du` output as a single patch, byte for byte. A diff with
/// nothing but whitespace means no opened files changed.
pub fn diff_patches(diff: String) -> Vec<String> {
    if diff.trim().is_empty() {
        Vec::new()
    } else {
        vec![diff]
    }
}

/// Perforce client workspace, driven through the `p4` CLI.
pub struct PerforceClient {
    dir: PathBuf,
}

impl PerforceClient {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn p4(&self, args: &[&str]) -> Result<Output> {
        Command::new("p4")
            .args(args)
            .current_dir(&self.dir)
            .output()
            .map_err(|e| Error::Vcs(format!("failed to run p4: {e}")))
    }

    /// Run p4 and return trimmed stdout, failing on non-zero exit.
    fn p4_stdout(&self, args: &[&str]) -> Result<String> {
        Ok(self.p4_raw(args)?.trim().to_string())
    }

    /// Run p4 and return stdout untouched, failing on non-zero exit.
    fn p4_raw(&self, args: &[&str]) -> Result<String> {
        let output = self.p4(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Vcs(format!(
                "p4 {} failed: {}",
                args.join(" "),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl VcsAdapter for PerforceClient {
    fn kind(&self) -> VcsKind {
        VcsKind::Perforce
    }

    fn sync(&self) -> Result<()> {
        // The service reads submitted changelists straight from the server;
        // only the login session needs to be live.
        self.p4_stdout(&["login", "-s"])?;
        Ok(())
    }

    fn owner_and_name_from_remote(&self) -> Result<(String, String)> {
        let stream = self.p4_stdout(&["-ztag", "-F", "%Stream%", "client", "-o"])?;
        parse_stream_path(&stream)
    }

    fn current_commit_id(&self) -> Result<String> {
        let change = self.p4_stdout(&["-F", "%change%", "changes", "-m1", "-s", "submitted", "...#have"])?;
        let change = change.lines().next().unwrap_or_default().trim().to_string();
        if change.is_empty() {
            return Err(Error::NoCommit);
        }
        Ok(change)
    }

    fn patches(&self) -> Result<Vec<String>> {
        let diff = self.p4_raw(&["diff", "-du"])?;
        debug!(bytes = diff.len(), "collected perforce diff");
        Ok(diff_patches(diff))
    }

    fn working_dir(&self) -> Result<String> {
        let root = self.p4_stdout(&["-F", "%clientRoot%", "info"])?;
        relative_to_root(Path::new(&root), &self.dir)
    }
}
