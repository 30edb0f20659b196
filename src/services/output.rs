//! Output file writing with the timestamped-rename policy.

use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;

/// Write generated output text to `path`.
///
/// When the target already exists and `overwrite` is disabled, the old
/// file is renamed with a `_<YYYYmmddHHMMSS>` suffix first so no prior
/// output is ever lost. A failed rename is logged and the write
/// proceeds over the old file.
pub fn save_with_timestamp(path: &Utf8Path, data: &str, overwrite: bool) -> Result<()> {
    if path.exists() {
        if overwrite {
            tracing::info!("Overwriting existing output: {}", path);
        } else {
            let timestamp = chrono::Local::now().format("%Y%m%d%H%M%S");
            let stem = path.file_stem().unwrap_or("");
            let renamed = match path.extension() {
                Some(ext) => path.with_file_name(format!("{}_{}.{}", stem, timestamp, ext)),
                None => path.with_file_name(format!("{}_{}", stem, timestamp)),
            };
            match fs::rename(path, &renamed) {
                Ok(()) => tracing::info!("Renamed existing output to {}", renamed),
                Err(e) => tracing::error!("Failed to rename existing output {}: {}", path, e),
            }
        }
    }

    fs::write(path, data).with_context(|| format!("Failed to save output: {}", path))?;
    tracing::info!("Saved output: {}", path);
    Ok(())
}
