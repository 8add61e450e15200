use std::path::PathBuf;
use std::time::Duration;

pub const NO_COMMIT_MSG: &str =
    "This repository has no commits yet. Please commit your changes before running a review.";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    ConfigValidation(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("prerequisite failed: {0}")]
    Prerequisite(String),

    #[error("policy error: {0}")]
    Policy(String),

    #[error("vcs error: {0}")]
    Vcs(String),

    #[error("unsupported vcs kind: {0}")]
    UnsupportedVcsKind(String),

    #[error("perforce depot name is not configured (set perforce.depot in the platform config)")]
    MissingDepotConfig,

    #[error("{}", NO_COMMIT_MSG)]
    NoCommit,

    #[error("malformed review request: {0}")]
    MalformedRequest(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("review session error: {0}")]
    Session(String),

    #[error("review timed out after {0:?}")]
    Timeout(Duration),

    #[error("interrupted")]
    Interrupted,

    #[error("unsupported format: {0} (expected: json, json-pretty)")]
    UnsupportedFormat(String),

    #[error("report error: {0}")]
    Report(String),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// The innermost error, skipping any context frames.
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Render the full context chain, outermost frame first, one per line.
    pub fn trace(&self) -> String {
        let mut lines = Vec::new();
        let mut current = self;
        while let Error::Context { context, source } = current {
            lines.push(context.clone());
            current = source;
        }
        lines.push(current.to_string());
        lines
            .iter()
            .enumerate()
            .map(|(depth, line)| format!("{}{line}", "  ".repeat(depth)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Attach a context frame to an error as it propagates.
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|source| Error::Context {
            context: context.into(),
            source: Box::new(source),
        })
    }
}
