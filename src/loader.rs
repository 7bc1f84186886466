//! File loading for data and schema documents.
//!
//! Format is sniffed from the file extension: `.json` parses with
//! serde_json, `.yaml`/`.yml` with serde_yaml. Either way the result is
//! a [`serde_json::Value`] tree; the validation core never touches text
//! itself.

use std::fs;
use std::path::Path;

use log::debug;
use serde_json::Value;

use crate::error::{CoreError, CoreResult};

/// Load and parse a data or schema file by extension sniffing.
pub fn load_file(path: &Path) -> CoreResult<Value> {
    debug!("loading file {}", path.display());
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let content = fs::read_to_string(path)?;
    match extension.as_deref() {
        Some("json") => Ok(serde_json::from_str(&content)?),
        Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
        _ => Err(CoreError::UnknownFileFormat {
            path: path.display().to_string(),
        }),
    }
}
