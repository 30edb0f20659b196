//! Archive unpacking via the external FarcPack utility.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;

/// Maximum time the unpacker may run before the pipeline gives up.
pub const UNPACK_TIMEOUT: Duration = Duration::from_secs(300);

/// Errors that can occur while unpacking an archive
#[derive(Error, Debug)]
pub enum UnpackError {
    #[error("FarcPack executable not configured")]
    NotConfigured,

    #[error("FarcPack executable not found: {0}")]
    NotFound(String),

    #[error("Configured path is not farcpack.exe: {0}")]
    WrongExecutable(String),

    #[error("Archive not found: {0}")]
    ArchiveNotFound(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("FarcPack exited with code {code}: {stderr}")]
    UnpackFailed { code: i32, stderr: String },

    #[error("Process error: {0}")]
    ProcessError(#[from] std::io::Error),
}

/// Validate the configured FarcPack path: non-empty, existing, and
/// actually named `farcpack.exe`. The pipeline refuses to run arbitrary
/// executables from the config file.
pub fn validate_farc_pack_path(path: &str) -> Result<Utf8PathBuf, UnpackError> {
    if path.is_empty() {
        return Err(UnpackError::NotConfigured);
    }
    let path = Utf8PathBuf::from(path);
    if !path.exists() {
        return Err(UnpackError::NotFound(path.to_string()));
    }
    let basename_ok = path
        .file_name()
        .is_some_and(|n| n.eq_ignore_ascii_case("farcpack.exe"));
    if !basename_ok {
        return Err(UnpackError::WrongExecutable(path.to_string()));
    }
    Ok(path)
}

/// Copy the archive into the temp directory and unpack it there.
///
/// The unpacker extracts next to its working file, so the copy keeps
/// extraction out of the user's directory. Returns the temp copy path.
pub async fn unpack_archive(
    archive: &Utf8Path,
    farc_pack: &Utf8Path,
    temp_dir: &Utf8Path,
) -> Result<Utf8PathBuf> {
    if !archive.exists() {
        return Err(UnpackError::ArchiveNotFound(archive.to_string()).into());
    }

    fs::create_dir_all(temp_dir)
        .with_context(|| format!("Failed to create temp directory: {}", temp_dir))?;

    let file_name = archive
        .file_name()
        .with_context(|| format!("Archive path has no file name: {}", archive))?;
    let temp_copy = temp_dir.join(file_name);
    fs::copy(archive, &temp_copy)
        .with_context(|| format!("Failed to copy archive to temp: {}", temp_copy))?;
    tracing::info!("Copied archive to {}", temp_copy);

    run_farc_pack(farc_pack, &temp_copy, temp_dir).await?;
    Ok(temp_copy)
}

async fn run_farc_pack(
    farc_pack: &Utf8Path,
    file: &Utf8Path,
    temp_dir: &Utf8Path,
) -> Result<(), UnpackError> {
    tracing::info!("Executing: \"{}\" \"{}\"", farc_pack, file);
    let start = Instant::now();

    let child = Command::new(farc_pack.as_std_path())
        .arg(file.as_std_path())
        .current_dir(temp_dir.as_std_path())
        .output();

    let output = timeout(UNPACK_TIMEOUT, child).await.map_err(|_| {
        tracing::warn!("FarcPack timed out after {:?}", UNPACK_TIMEOUT);
        UnpackError::Timeout(UNPACK_TIMEOUT)
    })??;

    let duration = start.elapsed();
    let exit_code = output.status.code().unwrap_or(-1);
    tracing::info!(
        "FarcPack completed in {:.2}s with exit code {}",
        duration.as_secs_f32(),
        exit_code
    );

    if !output.status.success() {
        return Err(UnpackError::UnpackFailed {
            code: exit_code,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(())
}

/// Remove the temp directory. Failures are logged and swallowed.
pub fn clean_temp_dir(temp_dir: &Utf8Path) {
    if !temp_dir.exists() {
        return;
    }
    match fs::remove_dir_all(temp_dir) {
        Ok(()) => tracing::info!("Removed temp directory: {}", temp_dir),
        Err(e) => tracing::warn!("Failed to remove temp directory {} (ignored): {}", temp_dir, e),
    }
}
