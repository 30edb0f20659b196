//! PoseScale editor entry point.
//!
//! Boots the editor coordinator: logging, the config store rooted in
//! the working directory (creating `Settings/`, `PoseScaleData/` and
//! `PoseImages/` with defaults on first run), the loaded documents and
//! the per-tab history stacks. The UI frontend drives [`EditorApp`]
//! from here; without one attached this verifies the environment,
//! reports what was loaded and shuts down cleanly.

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use posescale::config::{AppSettings, ConfigStore};
use posescale::{APP_NAME, EditorApp, VERSION};

fn main() -> Result<()> {
    let app_dir = Utf8PathBuf::try_from(std::env::current_dir()?)
        .context("Working directory is not valid UTF-8")?;

    let store = ConfigStore::new(&app_dir)?;
    let main_config = store.load(&store.main_config_path())?;
    let settings = AppSettings::from_document(&main_config);

    let _guard = posescale::logging::setup_logging("logs", "posescale", settings.effective_output_log())?;
    tracing::info!("Starting {} v{}", APP_NAME, VERSION);
    tracing::info!("Application directory: {}", app_dir);

    let mut app = EditorApp::new(store)?;

    tracing::info!(
        "Loaded {} profiles, {} rule files, {} pose map entries",
        app.profile_sections().len(),
        app.store.list_pose_files().len(),
        app.map_entries().len()
    );
    tracing::info!("Current rule file: {}", app.state.current_pose_file);

    app.shutdown();
    tracing::info!("Editor shutdown complete");
    Ok(())
}
