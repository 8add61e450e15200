use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};

/// Load the review policy ("dotlingo") to send with the request.
///
/// With no override file the result is empty, which tells the service to
/// use the policy files committed on the branch being reviewed.
pub fn load_policy(path: Option<&Path>) -> Result<String> {
    let Some(path) = path else {
        debug!("no policy override, using repository policies");
        return Ok(String::new());
    };

    if !path.is_file() {
        return Err(Error::Policy(format!(
            "policy file not found: {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Policy(format!("failed to read policy file {}: {e}", path.display()))
    })?;

    if content.trim().is_empty() {
        return Err(Error::Policy(format!(
            "policy file is empty: {}",
            path.display()
        )));
    }

    debug!(path = %path.display(), bytes = content.len(), "loaded policy override");
    Ok(content)
}
