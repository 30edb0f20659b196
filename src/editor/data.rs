//! Data tab: rule files in `PoseScaleData/` and their
//! `PoseScaleSetting_*` sections.

use super::normalize::{normalize_comma_separated, to_half_width};
use super::{EditorApp, ValidationError};
use crate::document::Document;
use crate::history::EditContext;
use crate::models::RULE_SECTION_PREFIX;
use anyhow::Result;
use camino::Utf8PathBuf;
use std::fs;

/// Values collected from the data tab's edit pane for one save.
#[derive(Debug, Clone, Default)]
pub struct RuleUpdate {
    pub suffix: String,
    /// 3-letter character code (`MIK`, `RIN`, ...).
    pub chara: String,
    pub name_contains: String,
    pub exclude: String,
    /// Raw field text; the `Name (id)` display form is accepted.
    pub pose_id: String,
    pub scale: String,
}

/// Outcome of [`EditorApp::save_rule_section`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(String),
    NoChanges,
}

impl EditorApp {
    /// Open a rule file by name into the data tab.
    pub fn open_pose_file(&mut self, name: &str) -> Result<()> {
        let path = self.store.pose_data_dir().join(name);
        self.state.current_pose_config = self.store.load(&path)?;
        self.state.current_pose_file = name.to_string();
        self.state.selected_pose_data_section = None;
        Ok(())
    }

    /// Create a new empty rule file and open it. A missing `.ini`
    /// extension is appended.
    pub fn create_pose_file(&mut self, name: &str) -> Result<String> {
        let name = ensure_ini_extension(name);
        let path = self.store.pose_data_dir().join(&name);
        if path.exists() {
            return Err(ValidationError::FileExists(name).into());
        }

        // Snapshot first: the restore path reconciles the directory
        // listing, which is how file creation is undone.
        self.take_snapshot(EditContext::Data);
        fs::write(&path, [0xEF, 0xBB, 0xBF])?;
        tracing::info!("Created rule file: {}", path);

        self.open_pose_file(&name)?;
        Ok(name)
    }

    /// Copy the open rule file under a new name and open the copy.
    pub fn duplicate_pose_file(&mut self, new_name: &str) -> Result<String> {
        let current = self.current_pose_path()?;
        let new_name = ensure_ini_extension(new_name);
        let new_path = self.store.pose_data_dir().join(&new_name);
        if new_path.exists() {
            return Err(ValidationError::FileExists(new_name).into());
        }

        self.take_snapshot(EditContext::Data);
        fs::copy(&current, &new_path)?;
        tracing::info!("Duplicated rule file {} -> {}", current, new_path);

        self.open_pose_file(&new_name)?;
        Ok(new_name)
    }

    /// Rename the open rule file.
    pub fn rename_pose_file(&mut self, new_name: &str) -> Result<String> {
        let current = self.current_pose_path()?;
        let new_name = ensure_ini_extension(new_name);
        let new_path = self.store.pose_data_dir().join(&new_name);
        if new_path.exists() {
            return Err(ValidationError::FileExists(new_name).into());
        }

        self.take_snapshot(EditContext::Data);
        fs::rename(&current, &new_path)?;
        tracing::info!("Renamed rule file {} -> {}", current, new_path);

        self.state.current_pose_file = new_name.clone();
        Ok(new_name)
    }

    /// Delete the open rule file. The history entry stores the full
    /// content so undo can bring the file back verbatim.
    pub fn delete_pose_file(&mut self) -> Result<()> {
        let path = self.current_pose_path()?;
        let content = self.state.current_pose_config.to_ini_string();
        self.history
            .push_file_delete(EditContext::Data, path.clone(), content);

        fs::remove_file(&path)?;
        tracing::info!("Deleted rule file: {}", path);

        self.state.current_pose_file = String::new();
        self.state.current_pose_config = Document::new();
        self.state.selected_pose_data_section = None;

        // Fall back to the next remaining file, like the tab does.
        if let Some(next) = self.store.list_pose_files().into_iter().next() {
            self.open_pose_file(&next)?;
        }
        Ok(())
    }

    /// Add an empty rule section named `PoseScaleSetting_New` (with a
    /// numeric suffix when taken).
    pub fn add_rule_section(&mut self) -> Result<String> {
        if self.state.current_pose_file.is_empty() {
            return Err(ValidationError::NoFileSelected.into());
        }

        self.take_snapshot(EditContext::Data);

        let section = next_free_rule_section(&self.state.current_pose_config, "New");
        for key in ["Chara", "ModuleNameContains", "ModuleExclude", "PoseID", "Scale"] {
            self.state.current_pose_config.set(&section, key, "");
        }

        self.save_current_pose_file()?;
        self.state.selected_pose_data_section = Some(section.clone());
        Ok(section)
    }

    /// Duplicate the selected rule section as `<suffix>_Copy`.
    pub fn duplicate_rule_section(&mut self) -> Result<String> {
        let old_section = self
            .state
            .selected_pose_data_section
            .clone()
            .ok_or(ValidationError::NoSelection)?;

        self.take_snapshot(EditContext::Data);

        let base = format!("{}_Copy", old_section.trim_start_matches(RULE_SECTION_PREFIX));
        let new_section = next_free_rule_section(&self.state.current_pose_config, &base);

        let entries: Vec<(String, String)> = self
            .state
            .current_pose_config
            .section(&old_section)
            .map(|s| s.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        for (key, value) in entries {
            self.state.current_pose_config.set(&new_section, &key, &value);
        }

        self.save_current_pose_file()?;
        self.state.selected_pose_data_section = Some(new_section.clone());
        Ok(new_section)
    }

    /// Move the selected rule section up or down.
    pub fn move_rule_section(&mut self, delta: isize) -> Result<bool> {
        let section = self
            .state
            .selected_pose_data_section
            .clone()
            .ok_or(ValidationError::NoSelection)?;

        let names = self.state.current_pose_config.section_names();
        let movable = names.iter().position(|n| *n == section).is_some_and(|idx| {
            let target = idx as isize + delta;
            target >= 0 && (target as usize) < names.len()
        });
        if !movable {
            return Ok(false);
        }

        self.take_snapshot(EditContext::Data);
        self.state.current_pose_config.move_section(&section, delta);
        self.save_current_pose_file()?;
        Ok(true)
    }

    /// Delete the selected rule section.
    pub fn delete_rule_section(&mut self) -> Result<()> {
        let section = self
            .state
            .selected_pose_data_section
            .clone()
            .ok_or(ValidationError::NoSelection)?;

        self.take_snapshot(EditContext::Data);
        self.state.current_pose_config.remove_section(&section);
        self.save_current_pose_file()?;
        self.state.selected_pose_data_section = None;
        Ok(())
    }

    /// Validate and save the edited rule fields into the selected
    /// section, renaming it when the suffix changed.
    ///
    /// Numeric fields get full-width conversion, keyword fields comma
    /// normalization; all checks run before the snapshot so a rejected
    /// save leaves neither state nor history touched.
    pub fn save_rule_section(&mut self, update: &RuleUpdate) -> Result<SaveOutcome> {
        if self.state.current_pose_file.is_empty() {
            return Err(ValidationError::NoFileSelected.into());
        }

        let suffix = update.suffix.trim();
        if suffix.is_empty() {
            return Err(ValidationError::EmptySuffix.into());
        }
        let new_section = format!("{}{}", RULE_SECTION_PREFIX, suffix);

        let renaming = self
            .state
            .selected_pose_data_section
            .as_deref()
            .is_some_and(|old| old != new_section);
        if renaming && self.state.current_pose_config.has_section(&new_section) {
            return Err(ValidationError::DuplicateSection(new_section).into());
        }

        let match_val = normalize_comma_separated(&update.name_contains);
        let exclude_val = normalize_comma_separated(&update.exclude);
        let pose_id = to_half_width(&strip_display_form(&update.pose_id));
        let scale = validate_scale(&to_half_width(&update.scale))?;

        if pose_id.is_empty() && scale.is_empty() {
            return Err(ValidationError::MissingAssignment.into());
        }
        if !pose_id.is_empty() && !pose_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidPoseId.into());
        }

        if !renaming && !self.rule_fields_changed(&new_section, update, &match_val, &exclude_val, &pose_id, &scale)
        {
            return Ok(SaveOutcome::NoChanges);
        }

        self.take_snapshot(EditContext::Data);

        if renaming {
            let old = self.state.selected_pose_data_section.clone().unwrap_or_default();
            if self.state.current_pose_config.has_section(&old) {
                self.state
                    .current_pose_config
                    .rename_section(&old, &new_section)
                    .map_err(|e| ValidationError::DuplicateSection(e.to_string()))?;
            }
        }

        let doc = &mut self.state.current_pose_config;
        doc.set(&new_section, "Chara", &update.chara);
        doc.set(&new_section, "ModuleNameContains", &match_val);
        doc.set(&new_section, "ModuleExclude", &exclude_val);
        doc.set(&new_section, "PoseID", &pose_id);
        doc.set(&new_section, "Scale", &scale);

        self.save_current_pose_file()?;
        self.state.selected_pose_data_section = Some(new_section.clone());
        Ok(SaveOutcome::Saved(new_section))
    }

    /// Rule section names of the open file, in document order.
    pub fn rule_sections(&self) -> Vec<String> {
        self.state
            .current_pose_config
            .section_names()
            .into_iter()
            .filter(|s| s.starts_with(RULE_SECTION_PREFIX))
            .collect()
    }

    fn rule_fields_changed(
        &self,
        section: &str,
        update: &RuleUpdate,
        match_val: &str,
        exclude_val: &str,
        pose_id: &str,
        scale: &str,
    ) -> bool {
        let doc = &self.state.current_pose_config;
        doc.get_str(section, "Chara", "") != update.chara
            || normalize_comma_separated(&doc.get_str(section, "ModuleNameContains", ""))
                != match_val
            || normalize_comma_separated(&doc.get_str(section, "ModuleExclude", "")) != exclude_val
            || doc.get_str(section, "PoseID", "") != pose_id
            || doc.get_str(section, "Scale", "") != scale
    }

    fn current_pose_path(&self) -> Result<Utf8PathBuf, ValidationError> {
        if self.state.current_pose_file.is_empty() {
            return Err(ValidationError::NoFileSelected);
        }
        Ok(self.store.pose_data_dir().join(&self.state.current_pose_file))
    }

    fn save_current_pose_file(&self) -> Result<()> {
        let path = self.store.pose_data_dir().join(&self.state.current_pose_file);
        self.store.save(&self.state.current_pose_config, &path)
    }
}

/// First free `PoseScaleSetting_<base>[_n]` name.
fn next_free_rule_section(doc: &Document, base: &str) -> String {
    let mut suffix = base.to_string();
    let mut counter = 1;
    while doc.has_section(&format!("{}{}", RULE_SECTION_PREFIX, suffix)) {
        suffix = format!("{}_{}", base, counter);
        counter += 1;
    }
    format!("{}{}", RULE_SECTION_PREFIX, suffix)
}

fn ensure_ini_extension(name: &str) -> String {
    let name = name.trim();
    if name.ends_with(".ini") {
        name.to_string()
    } else {
        format!("{}.ini", name)
    }
}

/// `Standing (12)` → `12`; anything else passes through.
fn strip_display_form(value: &str) -> String {
    let value = value.trim();
    if let Some(open) = value.rfind('(') {
        if let Some(inner) = value[open + 1..].strip_suffix(')') {
            return inner.trim().to_string();
        }
    }
    value.to_string()
}

/// Check the scale charset and normalize `1` to `1.0`.
fn validate_scale(scale: &str) -> Result<String, ValidationError> {
    if scale.is_empty() {
        return Ok(String::new());
    }
    if !scale.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(ValidationError::InvalidScale);
    }
    let scale = if scale.contains('.') {
        scale.to_string()
    } else {
        format!("{}.0", scale)
    };
    if scale.parse::<f64>().is_err() {
        return Err(ValidationError::InvalidScale);
    }
    Ok(scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigStore;
    use tempfile::TempDir;

    fn create_test_app() -> (EditorApp, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let app_dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let store = ConfigStore::new(&app_dir).unwrap();
        (EditorApp::new(store).unwrap(), temp_dir)
    }

    fn valid_update(suffix: &str) -> RuleUpdate {
        RuleUpdate {
            suffix: suffix.to_string(),
            chara: "MIK".to_string(),
            name_contains: "Miku".to_string(),
            exclude: String::new(),
            pose_id: "12".to_string(),
            scale: "1.0".to_string(),
        }
    }

    #[test]
    fn test_new_app_opens_starter_file() {
        let (app, _temp_dir) = create_test_app();
        assert_eq!(app.state.current_pose_file, "PoseScaleData.ini");
        assert_eq!(app.rule_sections(), vec!["PoseScaleSetting_Default"]);
    }

    #[test]
    fn test_create_duplicate_rename_pose_file() {
        let (mut app, _temp_dir) = create_test_app();

        let name = app.create_pose_file("extra").unwrap();
        assert_eq!(name, "extra.ini");
        assert_eq!(app.state.current_pose_file, "extra.ini");
        assert!(app.rule_sections().is_empty());

        let err = app.create_pose_file("extra.ini").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ValidationError>(),
            Some(ValidationError::FileExists(_))
        ));

        let copy = app.duplicate_pose_file("extra_Copy").unwrap();
        assert_eq!(copy, "extra_Copy.ini");

        let renamed = app.rename_pose_file("renamed").unwrap();
        assert_eq!(renamed, "renamed.ini");
        assert!(app.store.pose_data_dir().join("renamed.ini").exists());
        assert!(!app.store.pose_data_dir().join("extra_Copy.ini").exists());
    }

    #[test]
    fn test_create_pose_file_undo_removes_it() {
        let (mut app, _temp_dir) = create_test_app();
        app.create_pose_file("extra").unwrap();
        assert!(app.store.pose_data_dir().join("extra.ini").exists());

        assert!(app.undo(EditContext::Data));
        assert!(!app.store.pose_data_dir().join("extra.ini").exists());
        assert_eq!(app.state.current_pose_file, "PoseScaleData.ini");

        assert!(app.redo(EditContext::Data));
        assert!(app.store.pose_data_dir().join("extra.ini").exists());
    }

    #[test]
    fn test_delete_pose_file_undo_restores_content() {
        let (mut app, _temp_dir) = create_test_app();
        let path = app.store.pose_data_dir().join("PoseScaleData.ini");
        let before = app.state.current_pose_config.clone();

        app.delete_pose_file().unwrap();
        assert!(!path.exists());
        assert!(app.state.current_pose_file.is_empty());

        assert!(app.undo(EditContext::Data));
        assert!(path.exists());
        assert_eq!(app.state.current_pose_file, "PoseScaleData.ini");
        assert_eq!(app.state.current_pose_config, before);
    }

    #[test]
    fn test_add_rule_section_picks_free_name() {
        let (mut app, _temp_dir) = create_test_app();

        assert_eq!(app.add_rule_section().unwrap(), "PoseScaleSetting_New");
        assert_eq!(app.add_rule_section().unwrap(), "PoseScaleSetting_New_1");
        assert_eq!(app.add_rule_section().unwrap(), "PoseScaleSetting_New_2");
        assert_eq!(
            app.state.current_pose_config.get("PoseScaleSetting_New_1", "PoseID"),
            Some("")
        );
    }

    #[test]
    fn test_rule_section_lifecycle() {
        let (mut app, _temp_dir) = create_test_app();

        let section = app.add_rule_section().unwrap();
        assert_eq!(section, "PoseScaleSetting_New");

        let copy = app.duplicate_rule_section().unwrap();
        assert_eq!(copy, "PoseScaleSetting_New_Copy");

        assert!(app.move_rule_section(-1).unwrap());
        assert_eq!(
            app.rule_sections(),
            vec![
                "PoseScaleSetting_Default",
                "PoseScaleSetting_New_Copy",
                "PoseScaleSetting_New"
            ]
        );

        app.delete_rule_section().unwrap();
        assert_eq!(
            app.rule_sections(),
            vec!["PoseScaleSetting_Default", "PoseScaleSetting_New"]
        );
    }

    #[test]
    fn test_save_rule_section_validation() {
        let (mut app, _temp_dir) = create_test_app();
        app.add_rule_section().unwrap();

        let err = app
            .save_rule_section(&RuleUpdate {
                suffix: String::new(),
                ..valid_update("")
            })
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::EmptySuffix)
        );

        let mut bad_id = valid_update("X");
        bad_id.pose_id = "12a".to_string();
        let err = app.save_rule_section(&bad_id).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::InvalidPoseId)
        );

        let mut bad_scale = valid_update("X");
        bad_scale.scale = "1.0x".to_string();
        let err = app.save_rule_section(&bad_scale).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::InvalidScale)
        );

        let mut neither = valid_update("X");
        neither.pose_id = String::new();
        neither.scale = String::new();
        let err = app.save_rule_section(&neither).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::MissingAssignment)
        );

        // Nothing was snapshotted by the rejected saves.
        assert_eq!(app.history.undo_depth(EditContext::Data), 1);
    }

    #[test]
    fn test_save_rule_section_normalizes_input() {
        let (mut app, _temp_dir) = create_test_app();
        app.add_rule_section().unwrap();

        let outcome = app
            .save_rule_section(&RuleUpdate {
                suffix: "Miku".to_string(),
                chara: "MIK".to_string(),
                name_contains: "ミク、Miku".to_string(),
                exclude: String::new(),
                pose_id: "Standing (１２)".to_string(),
                scale: "１".to_string(),
            })
            .unwrap();
        assert_eq!(outcome, SaveOutcome::Saved("PoseScaleSetting_Miku".to_string()));

        let doc = &app.state.current_pose_config;
        assert_eq!(doc.get("PoseScaleSetting_Miku", "ModuleNameContains"), Some("ミク, Miku"));
        assert_eq!(doc.get("PoseScaleSetting_Miku", "PoseID"), Some("12"));
        assert_eq!(doc.get("PoseScaleSetting_Miku", "Scale"), Some("1.0"));
    }

    #[test]
    fn test_save_rule_section_detects_no_changes() {
        let (mut app, _temp_dir) = create_test_app();
        app.add_rule_section().unwrap();
        app.save_rule_section(&valid_update("X")).unwrap();
        let depth = app.history.undo_depth(EditContext::Data);

        let outcome = app.save_rule_section(&valid_update("X")).unwrap();
        assert_eq!(outcome, SaveOutcome::NoChanges);
        assert_eq!(app.history.undo_depth(EditContext::Data), depth);
    }

    #[test]
    fn test_rule_edit_undo_redo_round_trip() {
        let (mut app, _temp_dir) = create_test_app();
        app.add_rule_section().unwrap();
        app.save_rule_section(&valid_update("X")).unwrap();

        let after = app.state.current_pose_config.clone();
        assert!(app.undo(EditContext::Data));
        assert!(app.undo(EditContext::Data));
        assert_eq!(app.rule_sections(), vec!["PoseScaleSetting_Default"]);

        assert!(app.redo(EditContext::Data));
        assert!(app.redo(EditContext::Data));
        assert_eq!(app.state.current_pose_config, after);
    }
}
