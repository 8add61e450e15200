pub mod cancel;
pub mod cli;
pub mod config;
pub mod confirm;
pub mod error;
pub mod issue;
pub mod orchestrator;
pub mod policy;
pub mod prereq;
pub mod remote;
pub mod report;
pub mod request;
pub mod session;
pub mod vcs;
