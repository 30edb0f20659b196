//! General tab: main config settings.

use super::{EditorApp, ValidationError};
use crate::history::EditContext;
use anyhow::Result;

/// Values collected from the general tab for one save.
#[derive(Debug, Clone)]
pub struct GeneralSettingsUpdate {
    pub farc_pack_path: String,
    pub save_in_parent_directory: bool,
    pub default_pose_file_name: String,
    pub use_module_name_contains: bool,
    pub overwrite_existing_files: bool,
    pub language: String,
    pub show_debug_settings: bool,
    pub output_log: bool,
    pub delete_temp: bool,
    pub history_limit: i64,
}

/// HistoryLimit is clamped to this range on save.
pub const HISTORY_LIMIT_RANGE: std::ops::RangeInclusive<i64> = 50..=150;

impl EditorApp {
    /// Apply and persist the general settings.
    ///
    /// Debug settings only persist while the debug panel is shown;
    /// hidden, they are forced back to their defaults. A history-limit
    /// change re-bounds the manager immediately.
    pub fn save_general_settings(&mut self, update: &GeneralSettingsUpdate) -> Result<()> {
        let name_ok = update
            .default_pose_file_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !name_ok || update.default_pose_file_name.is_empty() {
            return Err(ValidationError::InvalidFileName.into());
        }

        self.take_snapshot(EditContext::General);

        let doc = &mut self.state.main_config;
        doc.set("FarcPack", "FarcPackPath", &update.farc_pack_path);
        doc.set(
            "GeneralSettings",
            "SaveInParentDirectory",
            bool_str(update.save_in_parent_directory),
        );
        doc.set("GeneralSettings", "DefaultPoseFileName", &update.default_pose_file_name);
        doc.set(
            "GeneralSettings",
            "UseModuleNameContains",
            bool_str(update.use_module_name_contains),
        );
        doc.set(
            "GeneralSettings",
            "OverwriteExistingFiles",
            bool_str(update.overwrite_existing_files),
        );
        doc.set("GeneralSettings", "Language", &update.language);
        doc.set(
            "DebugSettings",
            "ShowDebugSettings",
            bool_str(update.show_debug_settings),
        );

        let limit = if update.show_debug_settings {
            doc.set("DebugSettings", "OutputLog", bool_str(update.output_log));
            doc.set("DebugSettings", "DeleteTemp", bool_str(update.delete_temp));
            update
                .history_limit
                .clamp(*HISTORY_LIMIT_RANGE.start(), *HISTORY_LIMIT_RANGE.end())
        } else {
            doc.set("DebugSettings", "OutputLog", "False");
            doc.set("DebugSettings", "DeleteTemp", "True");
            *HISTORY_LIMIT_RANGE.start()
        };
        doc.set("DebugSettings", "HistoryLimit", &limit.to_string());
        self.history.set_max_history(limit as usize);

        self.store
            .save(&self.state.main_config, &self.store.main_config_path())?;
        tracing::info!("General settings saved (history limit {})", limit);
        Ok(())
    }
}

fn bool_str(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigStore;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn create_test_app() -> (EditorApp, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let app_dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let store = ConfigStore::new(&app_dir).unwrap();
        (EditorApp::new(store).unwrap(), temp_dir)
    }

    fn update() -> GeneralSettingsUpdate {
        GeneralSettingsUpdate {
            farc_pack_path: "C:/tools/farcpack.exe".to_string(),
            save_in_parent_directory: true,
            default_pose_file_name: "gm_module_pose_tbl".to_string(),
            use_module_name_contains: true,
            overwrite_existing_files: false,
            language: "ja".to_string(),
            show_debug_settings: true,
            output_log: true,
            delete_temp: false,
            history_limit: 200,
        }
    }

    #[test]
    fn test_save_persists_and_clamps_history_limit() {
        let (mut app, _temp_dir) = create_test_app();

        app.save_general_settings(&update()).unwrap();

        let doc = app.store.load(&app.store.main_config_path()).unwrap();
        assert_eq!(doc.get("FarcPack", "FarcPackPath"), Some("C:/tools/farcpack.exe"));
        assert_eq!(doc.get("GeneralSettings", "UseModuleNameContains"), Some("True"));
        assert_eq!(doc.get("DebugSettings", "HistoryLimit"), Some("150"));
        assert_eq!(app.history.max_history(), 150);
    }

    #[test]
    fn test_hidden_debug_settings_are_forced_to_defaults() {
        let (mut app, _temp_dir) = create_test_app();

        let mut u = update();
        u.show_debug_settings = false;
        app.save_general_settings(&u).unwrap();

        let doc = &app.state.main_config;
        assert_eq!(doc.get("DebugSettings", "OutputLog"), Some("False"));
        assert_eq!(doc.get("DebugSettings", "DeleteTemp"), Some("True"));
        assert_eq!(doc.get("DebugSettings", "HistoryLimit"), Some("50"));
    }

    #[test]
    fn test_invalid_pose_file_name_rejected_without_mutation() {
        let (mut app, _temp_dir) = create_test_app();

        let mut u = update();
        u.default_pose_file_name = "ポーズ".to_string();
        let err = app.save_general_settings(&u).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::InvalidFileName)
        );
        assert!(!app.history.can_undo(EditContext::General));
    }

    #[test]
    fn test_undo_restores_previous_settings() {
        let (mut app, _temp_dir) = create_test_app();
        let before = app.state.main_config.clone();

        app.save_general_settings(&update()).unwrap();
        assert_ne!(app.state.main_config, before);

        assert!(app.undo(EditContext::General));
        assert_eq!(app.state.main_config, before);

        assert!(app.redo(EditContext::General));
        assert_eq!(
            app.state.main_config.get("GeneralSettings", "Language"),
            Some("ja")
        );
    }
}
