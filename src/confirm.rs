use std::io::{BufRead, Stderr, StdinLock, Write};
use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::issue::Issue;
use crate::orchestrator::ReviewReporter;
use crate::remote::ReviewEvent;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Keep,
    Discard,
    /// Stop the whole review and drop every issue.
    Abort,
}

/// Map an operator's answer to a decision. Empty input keeps the issue.
pub fn parse_decision(input: &str) -> Option<Decision> {
    match input.trim().to_lowercase().as_str() {
        "" | "k" | "keep" | "y" | "yes" => Some(Decision::Keep),
        "d" | "discard" | "n" | "no" => Some(Decision::Discard),
        "a" | "abort" | "q" | "quit" => Some(Decision::Abort),
        _ => None,
    }
}

pub trait Prompter {
    /// Ask the operator what to do with `issue`. Blocks until answered.
    fn confirm(&mut self, issue: &Issue) -> Result<Decision>;
}

/// Prompts on a terminal-like reader/writer pair.
pub struct TerminalPrompter<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompter<StdinLock<'static>, Stderr> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stderr())
    }
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn show(&mut self, issue: &Issue) {
        writeln!(self.output).ok();
        writeln!(self.output, "{}", issue.location()).ok();
        writeln!(self.output, "  [{}] {}", issue.name, issue.comment).ok();
        for line in &issue.ctx_before {
            writeln!(self.output, "    {line}").ok();
        }
        if !issue.line_text.is_empty() {
            writeln!(self.output, "  > {}", issue.line_text).ok();
        }
        for line in &issue.ctx_after {
            writeln!(self.output, "    {line}").ok();
        }
        if let Some(ref link) = issue.link {
            writeln!(self.output, "  {link}").ok();
        }
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn confirm(&mut self, issue: &Issue) -> Result<Decision> {
        self.show(issue);
        loop {
            write!(self.output, "[k]eep, [d]iscard or [a]bort review? [k]: ").ok();
            self.output.flush().ok();

            let mut line = String::new();
            let read = self.input.read_line(&mut line)?;
            if read == 0 {
                debug!("stdin closed while confirming, aborting");
                return Ok(Decision::Abort);
            }
            match parse_decision(&line) {
                Some(decision) => return Ok(decision),
                None => {
                    writeln!(self.output, "invalid choice: {}", line.trim()).ok();
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfirmOptions {
    pub keep_all: bool,
    /// Where the report will be written, if not stdout.
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The service finished and every issue was decided.
    Completed,
    /// The operator aborted from the prompt.
    Aborted,
    /// The cancel handle fired from outside the loop.
    Interrupted,
}

#[derive(Debug)]
pub struct Confirmation {
    /// Issues in arrival order with `discard` set. Empty when aborted; the
    /// confirmed prefix when interrupted.
    pub issues: Vec<Issue>,
    pub outcome: Outcome,
}

/// Drain `session`, deciding each issue as it arrives.
///
/// A terminal error from the service fails the whole confirmation and
/// drops any issues already decided.
pub async fn confirm_issues<P: Prompter, R: ReviewReporter>(
    session: &mut Session,
    prompter: &mut P,
    reporter: &R,
    opts: &ConfirmOptions,
) -> Result<Confirmation> {
    let cancel = session.cancel_handle().clone();
    let mut issues: Vec<Issue> = Vec::new();

    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(confirmed = issues.len(), "confirmation interrupted");
                return Ok(Confirmation { issues, outcome: Outcome::Interrupted });
            }
            event = session.next_event() => event,
        };

        let mut issue = match event {
            Some(ReviewEvent::Issue(issue)) => issue,
            Some(ReviewEvent::Done) => {
                info!(count = issues.len(), "review stream complete");
                return Ok(Confirmation {
                    issues,
                    outcome: Outcome::Completed,
                });
            }
            Some(ReviewEvent::Failed(e)) => {
                debug!(discarded = issues.len(), "review failed, dropping confirmed issues");
                return Err(e);
            }
            None if cancel.is_cancelled() => {
                return Ok(Confirmation {
                    issues,
                    outcome: Outcome::Interrupted,
                });
            }
            None => {
                return Err(Error::Session(
                    "review stream closed unexpectedly".to_string(),
                ));
            }
        };

        if opts.keep_all {
            issue.discard = false;
            issues.push(issue);
            if opts.output.is_some() {
                reporter.issues_kept(issues.len());
            }
            continue;
        }

        match prompter.confirm(&issue)? {
            Decision::Keep => {
                issue.discard = false;
                issues.push(issue);
            }
            Decision::Discard => {
                debug!(issue = %issue, "issue discarded");
                issue.discard = true;
                issues.push(issue);
            }
            Decision::Abort => {
                info!("review aborted by operator");
                cancel.cancel();
                return Ok(Confirmation {
                    issues: Vec::new(),
                    outcome: Outcome::Aborted,
                });
            }
        }
    }
}
