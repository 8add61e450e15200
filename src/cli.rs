use clap::Parser;

/// lingo-review — policy-driven code review of your working copy
#[derive(Parser, Debug, Clone)]
#[command(name = "lingo-review", version, about)]
pub struct Cli {
    /// A codelingo.yaml file to perform the review with. Without it, the
    /// policy files on the branch being reviewed are used.
    #[arg(long = "lingo-file", value_name = "PATH")]
    pub lingo_file: Option<String>,

    /// Review only the uncommitted changes in the working tree
    #[arg(long)]
    pub diff: bool,

    /// File to save found issues to
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<String>,

    /// How to format the found issues (json, json-pretty)
    #[arg(long, default_value = "json-pretty")]
    pub format: String,

    /// Keep all issues and don't be prompted to confirm each one
    #[arg(long = "keep-all")]
    pub keep_all: bool,

    /// Review the given directory instead of the current one
    #[arg(long, short = 'd', value_name = "DIR")]
    pub directory: Option<String>,

    /// Path to the platform config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Give up on the review service after this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Display debug messages and full error traces
    #[arg(long)]
    pub debug: bool,
}
