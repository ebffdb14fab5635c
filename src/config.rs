//! Batch execution options.
//!
//! Options can be loaded from a JSON file; missing fields take their
//! defaults:
//!
//! ```json
//! { "strategy": "bulk", "fallback": true, "persist": true }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ReplaceError, ReplaceResult};
use crate::exec::Strategy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchOptions {
    /// Strategy tried first.
    pub strategy: Strategy,
    /// Re-run with Precise when Bulk fails or replaces nothing.
    pub fallback: bool,
    /// Write changed buffers back to storage.
    pub persist: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            strategy: Strategy::Bulk,
            fallback: true,
            persist: true,
        }
    }
}

impl BatchOptions {
    pub fn from_json_file(path: &Path) -> ReplaceResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ReplaceError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| ReplaceError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}
