use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tracing::info;

use crate::error::{Error, Result, ResultExt};
use crate::issue::Issue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    JsonPretty,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(OutputFormat::Json),
            "json-pretty" => Ok(OutputFormat::JsonPretty),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::JsonPretty => write!(f, "json-pretty"),
        }
    }
}

impl OutputFormat {
    pub fn render(&self, issues: &[Issue]) -> Result<String> {
        let rendered = match self {
            OutputFormat::Json => serde_json::to_string(issues),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(issues),
        };
        rendered.map_err(|e| Error::Report(format!("failed to serialize issues: {e}")))
    }
}

/// Persists a rendered report.
pub trait ReportWriter {
    fn write(&self, report: &str, path: &Path) -> Result<()>;
}

#[derive(Default)]
pub struct FileWriter;

impl ReportWriter for FileWriter {
    fn write(&self, report: &str, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, report)?;
        Ok(())
    }
}

/// Copies of the issues the operator did not discard, in order.
pub fn kept_issues(issues: &[Issue]) -> Vec<Issue> {
    issues.iter().filter(|i| !i.discard).cloned().collect()
}

/// Render the kept issues and either write them to `output` or return the
/// report itself as the message to print.
pub fn make_report<W: ReportWriter>(
    issues: &[Issue],
    format: &str,
    output: Option<&Path>,
    writer: &W,
) -> Result<String> {
    let format: OutputFormat = format.parse()?;
    let kept = kept_issues(issues);
    let report = format.render(&kept)?;

    let Some(path) = output else {
        return Ok(report);
    };

    writer
        .write(&report, path)
        .context(format!("writing report to {}", path.display()))?;
    info!(path = %path.display(), count = kept.len(), %format, "report written");

    let noun = if kept.len() == 1 { "issue" } else { "issues" };
    Ok(format!(
        "Done! Found {} {noun} and saved them to {}.",
        kept.len(),
        path.display()
    ))
}
