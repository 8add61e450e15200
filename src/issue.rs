use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub filename: String,
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub start: Point,
    pub end: Point,
}

/// A single finding streamed back by the review service.
///
/// `discard` is the only field mutated locally, and only by the
/// confirmation loop. It is never serialized when false, so a report of
/// kept issues carries no `discard` key at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Name of the policy rule that produced the issue.
    pub name: String,
    pub comment: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub line_text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ctx_before: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ctx_after: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub discard: bool,
}

impl Issue {
    /// `file:line` of the issue's start, for prompts and logs.
    pub fn location(&self) -> String {
        format!(
            "{}:{}",
            self.position.start.filename, self.position.start.line
        )
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.location(), self.name, self.comment)
    }
}
