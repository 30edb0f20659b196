//! Profile tab: `TomlProfile_*` sections in `TomlProfile.ini`.

use super::normalize::normalize_comma_separated;
use super::{EditorApp, ValidationError};
use crate::history::EditContext;
use crate::models::PROFILE_SECTION_PREFIX;
use anyhow::Result;

/// Values collected from the profile tab for one save.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub suffix: String,
    pub module_match: String,
    pub module_exclude: String,
    pub config_file: String,
    pub pose_file_name: String,
}

impl EditorApp {
    /// Add a new profile with defaults, named `TomlProfile_New` (with a
    /// numeric suffix when taken). Returns the new section name.
    pub fn add_profile(&mut self) -> Result<String> {
        self.take_snapshot(EditContext::Profile);

        let section = next_free_section(&self.state.profile_config, "New");
        self.state.profile_config.set(&section, "ModuleMatch", "");
        self.state.profile_config.set(&section, "ModuleExclude", "");
        self.state.profile_config.set(&section, "ConfigFile", "PoseScaleData");
        self.state
            .profile_config
            .set(&section, "PoseFileName", "gm_module_pose_tbl");

        self.save_profiles()?;
        self.state.selected_profile_section = Some(section.clone());
        Ok(section)
    }

    /// Duplicate the selected profile as `<suffix>_Copy`.
    pub fn duplicate_profile(&mut self) -> Result<String> {
        let old_section = self
            .state
            .selected_profile_section
            .clone()
            .ok_or(ValidationError::NoSelection)?;

        self.take_snapshot(EditContext::Profile);

        let base = format!(
            "{}_Copy",
            old_section.trim_start_matches(PROFILE_SECTION_PREFIX)
        );
        let new_section = next_free_section(&self.state.profile_config, &base);

        let entries: Vec<(String, String)> = self
            .state
            .profile_config
            .section(&old_section)
            .map(|s| s.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        for (key, value) in entries {
            self.state.profile_config.set(&new_section, &key, &value);
        }

        self.save_profiles()?;
        self.state.selected_profile_section = Some(new_section.clone());
        Ok(new_section)
    }

    /// Move the selected profile up or down among its siblings.
    pub fn move_profile(&mut self, delta: isize) -> Result<bool> {
        let section = self
            .state
            .selected_profile_section
            .clone()
            .ok_or(ValidationError::NoSelection)?;

        let names = self.state.profile_config.section_names();
        let movable = names.iter().position(|n| *n == section).is_some_and(|idx| {
            let target = idx as isize + delta;
            target >= 0 && (target as usize) < names.len()
        });
        if !movable {
            return Ok(false);
        }

        self.take_snapshot(EditContext::Profile);
        self.state.profile_config.move_section(&section, delta);
        self.save_profiles()?;
        Ok(true)
    }

    /// Delete the selected profile.
    pub fn delete_profile(&mut self) -> Result<()> {
        let section = self
            .state
            .selected_profile_section
            .clone()
            .ok_or(ValidationError::NoSelection)?;

        self.take_snapshot(EditContext::Profile);
        self.state.profile_config.remove_section(&section);
        self.save_profiles()?;
        self.state.selected_profile_section = None;
        Ok(())
    }

    /// Save the edited fields into the selected profile, renaming the
    /// section when the suffix changed. Keyword fields are
    /// comma-normalized before persisting.
    pub fn save_profile(&mut self, update: &ProfileUpdate) -> Result<String> {
        let suffix = update.suffix.trim();
        if suffix.is_empty() {
            return Err(ValidationError::EmptySuffix.into());
        }
        let new_section = format!("{}{}", PROFILE_SECTION_PREFIX, suffix);

        let renaming = self
            .state
            .selected_profile_section
            .as_deref()
            .is_some_and(|old| old != new_section);
        if renaming && self.state.profile_config.has_section(&new_section) {
            return Err(ValidationError::DuplicateSection(new_section).into());
        }

        self.take_snapshot(EditContext::Profile);

        if renaming {
            let old = self.state.selected_profile_section.clone().unwrap_or_default();
            if self.state.profile_config.has_section(&old) {
                self.state
                    .profile_config
                    .rename_section(&old, &new_section)
                    .map_err(|e| ValidationError::DuplicateSection(e.to_string()))?;
            }
        }

        let doc = &mut self.state.profile_config;
        doc.set(&new_section, "ModuleMatch", &normalize_comma_separated(&update.module_match));
        doc.set(
            &new_section,
            "ModuleExclude",
            &normalize_comma_separated(&update.module_exclude),
        );
        doc.set(&new_section, "ConfigFile", update.config_file.trim());
        doc.set(&new_section, "PoseFileName", update.pose_file_name.trim());

        self.save_profiles()?;
        self.state.selected_profile_section = Some(new_section.clone());
        Ok(new_section)
    }

    /// Profile section names in document order.
    pub fn profile_sections(&self) -> Vec<String> {
        self.state
            .profile_config
            .section_names()
            .into_iter()
            .filter(|s| s.starts_with(PROFILE_SECTION_PREFIX))
            .collect()
    }

    fn save_profiles(&self) -> Result<()> {
        self.store
            .save(&self.state.profile_config, &self.store.profile_config_path())
    }
}

/// First free `TomlProfile_<base>[_n]` name.
fn next_free_section(doc: &crate::document::Document, base: &str) -> String {
    let mut suffix = base.to_string();
    let mut counter = 1;
    while doc.has_section(&format!("{}{}", PROFILE_SECTION_PREFIX, suffix)) {
        suffix = format!("{}_{}", base, counter);
        counter += 1;
    }
    format!("{}{}", PROFILE_SECTION_PREFIX, suffix)
}
