//! PoseScale batch generator entry point.
//!
//! Takes one module archive path, unpacks it with the configured
//! FarcPack executable and writes the generated pose and scale tables
//! next to the archive. Settings come from the editor's config store in
//! the working directory.

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use posescale::config::{AppSettings, ConfigStore};
use posescale::{APP_NAME, VERSION, pipeline};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(archive) = args.next() else {
        eprintln!("Usage: psc-generator <module archive>");
        std::process::exit(2);
    };
    let archive = Utf8PathBuf::from(archive);

    let app_dir = Utf8PathBuf::try_from(std::env::current_dir()?)
        .context("Working directory is not valid UTF-8")?;
    let store = ConfigStore::new(&app_dir)?;

    let main_config = store.load(&store.main_config_path())?;
    let settings = AppSettings::from_document(&main_config);
    let _guard = posescale::logging::setup_logging("logs", "posescale", settings.effective_output_log())?;

    tracing::info!("Starting {} v{} (generator)", APP_NAME, VERSION);
    tracing::info!("Archive: {}", archive);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    let result = runtime.block_on(pipeline::run(&archive, &store));
    runtime.shutdown_timeout(std::time::Duration::from_secs(5));

    if let Err(e) = &result {
        tracing::error!("Generation failed: {:#}", e);
    }
    result
}
