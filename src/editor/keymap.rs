//! Key tab: editable shortcut bindings in `KeyMap.ini`.

use super::EditorApp;
use crate::config::ConfigStore;
use crate::document::Document;
use crate::history::EditContext;
use anyhow::Result;

const SHORTCUT_SECTION: &str = "Shortcuts";

/// Action names and their default bindings, in display order.
pub const DEFAULT_SHORTCUTS: [(&str, &str); 8] = [
    ("SaveCurrentTab", "<Control-s>"),
    ("SaveAndExit", "<Control-q>"),
    ("ExitNoSave", "<Escape>"),
    ("RestartNoSave", "<Control-r>"),
    ("SaveAndRestart", "<Control-Shift-R>"),
    ("Undo", "<Control-Shift-Z>"),
    ("Redo", "<Control-Shift-Y>"),
    ("ToggleDebugSettings", "<Shift-F12>"),
];

/// Load the key map, creating it with defaults on first run and
/// migrating older files in place.
///
/// The `SaveGeneralSettings` action was renamed to `SaveCurrentTab`
/// when saving became per-tab; an old binding is carried over. Actions
/// added since the file was written are backfilled with their defaults.
pub fn load_key_map(store: &ConfigStore) -> Result<Document> {
    let path = store.key_map_path();
    if !path.exists() {
        let mut doc = Document::new();
        for (action, binding) in DEFAULT_SHORTCUTS {
            doc.set(SHORTCUT_SECTION, action, binding);
        }
        store.save(&doc, &path)?;
        tracing::info!("Created default key map: {}", path);
        return Ok(doc);
    }

    let mut doc = store.load(&path)?;
    let mut changed = false;

    if let Some(old) = doc.get(SHORTCUT_SECTION, "SaveGeneralSettings").map(String::from) {
        if doc.get(SHORTCUT_SECTION, "SaveCurrentTab").is_none() {
            doc.set(SHORTCUT_SECTION, "SaveCurrentTab", &old);
        }
        doc.remove_key(SHORTCUT_SECTION, "SaveGeneralSettings");
        tracing::info!("Migrated key map action SaveGeneralSettings -> SaveCurrentTab");
        changed = true;
    }

    for (action, binding) in DEFAULT_SHORTCUTS {
        if doc.get(SHORTCUT_SECTION, action).is_none() {
            doc.set(SHORTCUT_SECTION, action, binding);
            changed = true;
        }
    }

    if changed {
        store.save(&doc, &path)?;
    }
    Ok(doc)
}

impl EditorApp {
    /// Bindings in display order.
    pub fn shortcuts(&self) -> Vec<(String, String)> {
        self.state
            .key_map
            .section(SHORTCUT_SECTION)
            .map(|s| s.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    /// Save edited bindings. Unknown action names are ignored.
    pub fn save_key_map(&mut self, bindings: &[(String, String)]) -> Result<()> {
        self.take_snapshot(EditContext::Key);

        for (action, binding) in bindings {
            if DEFAULT_SHORTCUTS.iter().any(|(name, _)| name == action) {
                self.state.key_map.set(SHORTCUT_SECTION, action, binding.trim());
            } else {
                tracing::warn!("Ignoring unknown shortcut action: {}", action);
            }
        }

        self.store.save(&self.state.key_map, &self.store.key_map_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn create_test_store() -> (ConfigStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let app_dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        (ConfigStore::new(&app_dir).unwrap(), temp_dir)
    }

    #[test]
    fn test_missing_file_gets_defaults() {
        let (store, _temp_dir) = create_test_store();

        let doc = load_key_map(&store).unwrap();
        assert_eq!(doc.get("Shortcuts", "Undo"), Some("<Control-Shift-Z>"));
        assert!(store.key_map_path().exists());
    }

    #[test]
    fn test_legacy_action_is_migrated() {
        let (store, _temp_dir) = create_test_store();
        let mut old = Document::new();
        old.set("Shortcuts", "SaveGeneralSettings", "<F2>");
        store.save(&old, &store.key_map_path()).unwrap();

        let doc = load_key_map(&store).unwrap();
        assert_eq!(doc.get("Shortcuts", "SaveCurrentTab"), Some("<F2>"));
        assert_eq!(doc.get("Shortcuts", "SaveGeneralSettings"), None);

        // The migration is persisted, not just in memory.
        let on_disk = store.load(&store.key_map_path()).unwrap();
        assert_eq!(on_disk.get("Shortcuts", "SaveCurrentTab"), Some("<F2>"));
    }

    #[test]
    fn test_missing_actions_are_backfilled() {
        let (store, _temp_dir) = create_test_store();
        let mut partial = Document::new();
        partial.set("Shortcuts", "Undo", "<Control-z>");
        store.save(&partial, &store.key_map_path()).unwrap();

        let doc = load_key_map(&store).unwrap();
        assert_eq!(doc.get("Shortcuts", "Undo"), Some("<Control-z>"));
        assert_eq!(doc.get("Shortcuts", "Redo"), Some("<Control-Shift-Y>"));
        assert_eq!(
            doc.section("Shortcuts").unwrap().len(),
            DEFAULT_SHORTCUTS.len()
        );
    }

    #[test]
    fn test_save_key_map_undo_round_trip() {
        let (store, _temp_dir) = create_test_store();
        let mut app = EditorApp::new(store).unwrap();

        app.save_key_map(&[
            ("Undo".to_string(), "<Control-z>".to_string()),
            ("NotAnAction".to_string(), "<F9>".to_string()),
        ])
        .unwrap();
        assert_eq!(app.state.key_map.get("Shortcuts", "Undo"), Some("<Control-z>"));
        assert_eq!(app.state.key_map.get("Shortcuts", "NotAnAction"), None);

        assert!(app.undo(EditContext::Key));
        assert_eq!(
            app.state.key_map.get("Shortcuts", "Undo"),
            Some("<Control-Shift-Z>")
        );
    }
}
