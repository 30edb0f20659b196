// PoseScale - pose/scale configuration editor and TOML generator for
// game module archives.
//
// This is the library crate containing the core business logic and data
// structures. The binary crates (main.rs, bin/generator.rs) provide the
// editor and batch-generator entry points.

pub mod config;
pub mod document;
pub mod editor;
pub mod history;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod services;

// Re-export commonly used types for convenience
pub use config::{AppSettings, ConfigStore};
pub use document::Document;
pub use editor::EditorApp;
pub use history::{EditContext, HistoryManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
