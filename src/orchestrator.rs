use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::cancel::CancelHandle;
use crate::cli::Cli;
use crate::config::PlatformConfig;
use crate::confirm::{ConfirmOptions, Outcome, Prompter, confirm_issues};
use crate::error::{Error, Result, ResultExt};
use crate::policy::load_policy;
use crate::remote::ReviewService;
use crate::report::{FileWriter, OutputFormat, ReportWriter, make_report};
use crate::request::{RequestInputs, build_request, patch_size_warning};
use crate::session::Session;
use crate::vcs::VcsAdapter;

pub const NO_ISSUES_MSG: &str = "Done! No issues found.";
pub const ABORTED_MSG: &str = "Review aborted. No issues were kept.";

/// Observer for operator-facing progress of a review.
pub trait ReviewReporter: Send + Sync {
    fn status(&self, message: &str);
    fn warning(&self, message: &str);
    /// Running count of issues kept without prompting.
    fn issues_kept(&self, count: usize);
}

/// Default reporter that prints to stderr, leaving stdout for the report.
pub struct StderrReporter;

impl ReviewReporter for StderrReporter {
    fn status(&self, message: &str) {
        eprintln!("{message}");
    }

    fn warning(&self, message: &str) {
        eprintln!("{message}");
    }

    fn issues_kept(&self, count: usize) {
        let noun = if count == 1 { "issue" } else { "issues" };
        eprintln!("{count} {noun} kept");
    }
}

#[derive(Debug, Clone)]
pub struct ReviewOptions {
    pub diff_only: bool,
    pub keep_all: bool,
    pub format: String,
    pub output: Option<PathBuf>,
    pub policy_file: Option<PathBuf>,
}

impl Default for ReviewOptions {
    fn default() -> Self {
        Self {
            diff_only: false,
            keep_all: false,
            format: "json-pretty".to_string(),
            output: None,
            policy_file: None,
        }
    }
}

impl ReviewOptions {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            diff_only: cli.diff,
            keep_all: cli.keep_all,
            format: cli.format.clone(),
            output: cli.output.as_ref().map(PathBuf::from),
            policy_file: cli.lingo_file.as_ref().map(PathBuf::from),
        }
    }
}

/// Drives one `review`: build the request, stream it, confirm each issue
/// with the operator and reduce the result to a report.
pub struct Orchestrator<V, S, Q, W = FileWriter, P = StderrReporter> {
    vcs: V,
    service: S,
    prompter: Q,
    config: PlatformConfig,
    writer: W,
    reporter: P,
}

impl<V: VcsAdapter, S: ReviewService, Q: Prompter> Orchestrator<V, S, Q> {
    pub fn new(vcs: V, service: S, prompter: Q, config: PlatformConfig) -> Self {
        Self {
            vcs,
            service,
            prompter,
            config,
            writer: FileWriter,
            reporter: StderrReporter,
        }
    }
}

impl<V: VcsAdapter, S: ReviewService, Q: Prompter, W: ReportWriter, P: ReviewReporter>
    Orchestrator<V, S, Q, W, P>
{
    pub fn with_parts(
        vcs: V,
        service: S,
        prompter: Q,
        config: PlatformConfig,
        writer: W,
        reporter: P,
    ) -> Self {
        Self {
            vcs,
            service,
            prompter,
            config,
            writer,
            reporter,
        }
    }

    pub fn reporter(&self) -> &P {
        &self.reporter
    }

    /// Run the review and return the message to print on success.
    ///
    /// An operator abort is a success with [`ABORTED_MSG`]. Cancellation
    /// from outside (Ctrl-C) yields [`Error::Interrupted`].
    pub async fn run(&mut self, opts: &ReviewOptions, cancel: CancelHandle) -> Result<String> {
        // Fail on a bad format before touching the network.
        let _: OutputFormat = opts.format.parse()?;
        let policy = load_policy(opts.policy_file.as_deref()).context("loading review policy")?;

        let kind = self.vcs.kind();
        self.reporter.status("Syncing your repo...");
        self.vcs.sync().context(format!("syncing {kind} working copy"))?;

        let (owner, name) = self
            .vcs
            .owner_and_name_from_remote()
            .context("reading repository owner and name")?;
        let commit_id = match self.vcs.current_commit_id() {
            Err(Error::NoCommit) => return Err(Error::NoCommit),
            other => other.context("reading current commit")?,
        };

        let patches = self.vcs.patches().context("collecting patches")?;
        if let Some(warning) = patch_size_warning(&patches) {
            warn!(patches = patches.len(), "large patch set");
            self.reporter.warning(warning);
        }
        let working_dir = self.vcs.working_dir().context("locating working directory")?;
        let platform = self.config.vcs_platform(kind)?;

        let request = build_request(RequestInputs {
            vcs: kind,
            owner,
            name,
            commit_id,
            patches,
            working_dir,
            policy,
            platform,
            diff_only: opts.diff_only,
        })
        .context("building review request")?;
        info!(repo = %request.repo, commit = %request.commit_id, vcs = %kind, "review request ready");

        if cancel.is_cancelled() {
            return Err(Error::Interrupted);
        }

        self.reporter.status("Running review flow...");
        let mut session = Session::start(&self.service, &request, cancel, self.config.timeout)
            .await
            .context("starting review session")?;

        let confirm_opts = ConfirmOptions {
            keep_all: opts.keep_all,
            output: opts.output.clone(),
        };
        let confirmation =
            confirm_issues(&mut session, &mut self.prompter, &self.reporter, &confirm_opts).await;
        session.close().await;
        let confirmation = confirmation.context("reviewing issues")?;

        match confirmation.outcome {
            Outcome::Completed => {}
            Outcome::Aborted => return Ok(ABORTED_MSG.to_string()),
            Outcome::Interrupted => {
                debug!(confirmed = confirmation.issues.len(), "review interrupted");
                return Err(Error::Interrupted);
            }
        }

        if confirmation.issues.is_empty() {
            return Ok(NO_ISSUES_MSG.to_string());
        }

        make_report(
            &confirmation.issues,
            &opts.format,
            opts.output.as_deref(),
            &self.writer,
        )
        .context("making report")
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn test_options_from_cli() {
        let cli = Cli::parse_from([
            "lingo-review",
            "--diff",
            "--keep-all",
            "--format",
            "json",
            "-o",
            "issues.json",
            "--lingo-file",
            "codelingo.yaml",
        ]);
        let opts = ReviewOptions::from_cli(&cli);
        assert!(opts.diff_only);
        assert!(opts.keep_all);
        assert_eq!(opts.format, "json");
        assert_eq!(opts.output, Some(PathBuf::from("issues.json")));
        assert_eq!(opts.policy_file, Some(PathBuf::from("codelingo.yaml")));
    }

    #[test]
    fn test_default_options_match_cli_defaults() {
        let opts = ReviewOptions::from_cli(&Cli::parse_from(["lingo-review"]));
        let defaults = ReviewOptions::default();
        assert_eq!(opts.format, defaults.format);
        assert_eq!(opts.output, defaults.output);
        assert!(!opts.keep_all && !opts.diff_only);
    }
}
