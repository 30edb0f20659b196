//! Map tab: the pose id/name table in `PoseIDMap.ini` and the preview
//! images under `PoseImages/`.
//!
//! Images are never deleted outright while editing. A removal stages
//! the file, a save moves it into `_trash` and records the move so undo
//! can bring it back; the trash itself is emptied on shutdown.

use super::normalize::{sanitize_image_name, to_half_width};
use super::{EditorApp, ValidationError};
use crate::history::EditContext;
use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

const MAP_SECTION: &str = "PoseIDs";

impl EditorApp {
    /// Pose ids and names in document order.
    pub fn map_entries(&self) -> Vec<(String, String)> {
        self.state
            .pose_id_map
            .section(MAP_SECTION)
            .map(|s| s.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    /// Add a new entry named `New Pose` under the next free numeric id.
    pub fn add_map_entry(&mut self) -> Result<String> {
        self.take_snapshot(EditContext::Map);

        let id = self.next_free_pose_id();
        self.state.pose_id_map.set(MAP_SECTION, &id, "New Pose");
        self.save_map()?;
        self.state.selected_map_key = Some(id.clone());
        Ok(id)
    }

    /// Duplicate the selected entry as `<name>_Copy` under a fresh id.
    pub fn duplicate_map_entry(&mut self) -> Result<String> {
        let old_id = self
            .state
            .selected_map_key
            .clone()
            .ok_or(ValidationError::NoSelection)?;
        let name = self
            .state
            .pose_id_map
            .get(MAP_SECTION, &old_id)
            .unwrap_or("")
            .to_string();

        self.take_snapshot(EditContext::Map);

        let id = self.next_free_pose_id();
        self.state
            .pose_id_map
            .set(MAP_SECTION, &id, &format!("{}_Copy", name));
        self.save_map()?;
        self.state.selected_map_key = Some(id.clone());
        Ok(id)
    }

    /// Move the selected entry up or down in the table.
    pub fn move_map_entry(&mut self, delta: isize) -> Result<bool> {
        let id = self
            .state
            .selected_map_key
            .clone()
            .ok_or(ValidationError::NoSelection)?;

        let movable = self
            .state
            .pose_id_map
            .section(MAP_SECTION)
            .and_then(|s| s.get_index_of(id.as_str()))
            .is_some_and(|idx| {
                let len = self
                    .state
                    .pose_id_map
                    .section(MAP_SECTION)
                    .map(|s| s.len())
                    .unwrap_or(0);
                let target = idx as isize + delta;
                target >= 0 && (target as usize) < len
            });
        if !movable {
            return Ok(false);
        }

        self.take_snapshot(EditContext::Map);
        if let Some(section) = self.state.pose_id_map.section_mut(MAP_SECTION) {
            if let Some(idx) = section.get_index_of(id.as_str()) {
                let target = (idx as isize + delta) as usize;
                section.move_index(idx, target);
            }
        }
        self.save_map()?;
        Ok(true)
    }

    /// Delete the selected entry. Its image, if any, moves to the trash
    /// folder immediately and the move is recorded for undo.
    pub fn delete_map_entry(&mut self) -> Result<()> {
        let id = self
            .state
            .selected_map_key
            .clone()
            .ok_or(ValidationError::NoSelection)?;

        self.take_snapshot(EditContext::Map);
        self.state.pose_id_map.remove_key(MAP_SECTION, &id);

        if let Some(image) = self.store.find_image_for_pose(&id) {
            self.trash_image(&image)?;
            self.state.pending_delete_images.push(image);
        }

        self.save_map()?;
        self.state.selected_map_key = None;
        Ok(())
    }

    /// Validate and save the edited id/name pair into the selected
    /// entry, carrying the image along: a staged removal is executed and
    /// a surviving image is renamed to match the new id and name.
    pub fn save_map_entry(&mut self, pose_id: &str, name: &str) -> Result<bool> {
        let old_id = self
            .state
            .selected_map_key
            .clone()
            .ok_or(ValidationError::NoSelection)?;

        let pose_id = to_half_width(pose_id);
        if pose_id.is_empty() || !pose_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidPoseId.into());
        }
        let name = name.trim().to_string();

        let renaming = pose_id != old_id;
        if renaming && self.state.pose_id_map.get(MAP_SECTION, &pose_id).is_some() {
            return Err(ValidationError::DuplicatePoseId(pose_id).into());
        }

        let unchanged = !renaming
            && self.state.pose_id_map.get(MAP_SECTION, &old_id) == Some(name.as_str())
            && self.state.pending_trash_image.is_none();
        if unchanged {
            return Ok(false);
        }

        self.take_snapshot(EditContext::Map);

        if renaming {
            self.state.pose_id_map.remove_key(MAP_SECTION, &old_id);
        }
        self.state.pose_id_map.set(MAP_SECTION, &pose_id, &name);

        self.execute_pending_trash()?;

        // Keep the image file name in sync with the entry.
        if let Some(image) = self.store.find_image_for_pose(&old_id) {
            let ext = image.extension().unwrap_or("png").to_string();
            let new_path = self
                .store
                .pose_images_dir()
                .join(format!("{}_{}.{}", pose_id, sanitize_image_name(&name), ext));
            if new_path != image {
                fs::rename(&image, &new_path)?;
                self.history
                    .register_file_move(EditContext::Map, image, new_path);
            }
        }

        self.save_map()?;
        self.state.selected_map_key = Some(pose_id);
        Ok(true)
    }

    /// Assign an image file to the selected entry. Any previous image is
    /// trashed first; the source is copied in under the canonical
    /// `<id>_<name>.<ext>` name.
    pub fn select_map_image(&mut self, source: &Utf8Path) -> Result<Utf8PathBuf> {
        let id = self
            .state
            .selected_map_key
            .clone()
            .ok_or(ValidationError::NoSelection)?;
        let name = self
            .state
            .pose_id_map
            .get(MAP_SECTION, &id)
            .unwrap_or("")
            .to_string();

        self.take_snapshot(EditContext::Map);
        self.execute_pending_trash()?;

        if let Some(existing) = self.store.find_image_for_pose(&id) {
            self.trash_image(&existing)?;
        }

        let ext = source.extension().unwrap_or("png").to_string();
        let dest = self
            .store
            .pose_images_dir()
            .join(format!("{}_{}.{}", id, sanitize_image_name(&name), ext));
        fs::copy(source, &dest)?;
        tracing::info!("Assigned image {} -> {}", source, dest);

        // If the entry is later undone away, shutdown can purge the copy.
        self.state.pending_delete_images.push(dest.clone());
        Ok(dest)
    }

    /// Stage the selected entry's image for removal. Nothing touches the
    /// filesystem until the next save executes the staging.
    pub fn delete_map_image(&mut self) -> Result<()> {
        let id = self
            .state
            .selected_map_key
            .clone()
            .ok_or(ValidationError::NoSelection)?;

        if let Some(image) = self.store.find_image_for_pose(&id) {
            self.state.pending_delete_images.push(image.clone());
            self.state.pending_trash_image = Some(image);
        }
        Ok(())
    }

    fn execute_pending_trash(&mut self) -> Result<()> {
        if let Some(image) = self.state.pending_trash_image.take() {
            if image.exists() {
                self.trash_image(&image)?;
            }
        }
        Ok(())
    }

    fn trash_image(&mut self, image: &Utf8Path) -> Result<()> {
        let trash = self.store.trash_dir();
        fs::create_dir_all(&trash)?;
        let trash_path = trash.join(image.file_name().unwrap_or("image"));
        fs::rename(image, &trash_path)?;
        tracing::info!("Moved image to trash: {} -> {}", image, trash_path);
        self.history
            .register_file_move(EditContext::Map, image.to_path_buf(), trash_path);
        Ok(())
    }

    fn next_free_pose_id(&self) -> String {
        let max = self
            .state
            .pose_id_map
            .section(MAP_SECTION)
            .map(|s| {
                s.keys()
                    .filter_map(|k| k.parse::<u64>().ok())
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0);
        (max + 1).to_string()
    }

    fn save_map(&self) -> Result<()> {
        self.store
            .save(&self.state.pose_id_map, &self.store.pose_id_map_path())
    }
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

    fn write_image(app: &EditorApp, name: &str) -> Utf8PathBuf {
        let path = app.store.pose_images_dir().join(name);
        fs::write(&path, b"png").unwrap();
        path
    }

    #[test]
    fn test_add_entry_picks_next_numeric_id() {
        let (mut app, _temp_dir) = create_test_app();

        assert_eq!(app.add_map_entry().unwrap(), "1");
        assert_eq!(app.add_map_entry().unwrap(), "2");
        app.state.pose_id_map.set("PoseIDs", "40", "Far Ahead");
        assert_eq!(app.add_map_entry().unwrap(), "41");

        assert_eq!(app.map_entries()[0], ("1".to_string(), "New Pose".to_string()));
    }

    #[test]
    fn test_duplicate_and_move_entry() {
        let (mut app, _temp_dir) = create_test_app();
        app.add_map_entry().unwrap();
        app.save_map_entry("1", "Standing").unwrap();

        let copy_id = app.duplicate_map_entry().unwrap();
        assert_eq!(copy_id, "2");
        assert_eq!(
            app.state.pose_id_map.get("PoseIDs", "2"),
            Some("Standing_Copy")
        );

        assert!(app.move_map_entry(-1).unwrap());
        let ids: Vec<String> = app.map_entries().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["2", "1"]);
        assert!(!app.move_map_entry(-1).unwrap());
    }

    #[test]
    fn test_save_rejects_bad_and_duplicate_ids() {
        let (mut app, _temp_dir) = create_test_app();
        app.add_map_entry().unwrap();
        app.add_map_entry().unwrap();

        let err = app.save_map_entry("2a", "X").unwrap_err();
        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::InvalidPoseId)
        );

        app.state.selected_map_key = Some("1".to_string());
        let err = app.save_map_entry("2", "X").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ValidationError>(),
            Some(ValidationError::DuplicatePoseId(_))
        ));

        // Full-width ids are accepted after conversion.
        assert!(app.save_map_entry("３", "X").unwrap());
        assert_eq!(app.state.pose_id_map.get("PoseIDs", "3"), Some("X"));
    }

    #[test]
    fn test_save_renames_image_with_entry() {
        let (mut app, _temp_dir) = create_test_app();
        app.add_map_entry().unwrap();
        write_image(&app, "1_New Pose.png");

        app.save_map_entry("7", "Side Step!").unwrap();

        let images = app.store.pose_images_dir();
        assert!(!images.join("1_New Pose.png").exists());
        assert!(images.join("7_Side Step.png").exists());
    }

    #[test]
    fn test_delete_entry_trashes_image_and_undo_restores_it() {
        let (mut app, _temp_dir) = create_test_app();
        app.add_map_entry().unwrap();
        let image = write_image(&app, "1_New Pose.png");

        app.delete_map_entry().unwrap();
        assert!(!image.exists());
        assert!(app.store.trash_dir().join("1_New Pose.png").exists());
        assert!(app.map_entries().is_empty());

        assert!(app.undo(EditContext::Map));
        assert!(image.exists());
        assert_eq!(app.map_entries().len(), 1);

        assert!(app.redo(EditContext::Map));
        assert!(!image.exists());
    }

    #[test]
    fn test_image_removal_is_staged_until_save() {
        let (mut app, _temp_dir) = create_test_app();
        app.add_map_entry().unwrap();
        let image = write_image(&app, "1_New Pose.png");

        app.delete_map_image().unwrap();
        assert!(image.exists());
        assert_eq!(app.state.pending_trash_image.as_ref(), Some(&image));

        app.save_map_entry("1", "New Pose").unwrap();
        assert!(!image.exists());
        assert!(app.store.trash_dir().join("1_New Pose.png").exists());
        assert!(app.state.pending_trash_image.is_none());
    }

    #[test]
    fn test_select_image_copies_under_canonical_name() {
        let (mut app, temp_dir) = create_test_app();
        app.add_map_entry().unwrap();
        app.save_map_entry("1", "Standing").unwrap();
        let old = write_image(&app, "1_Standing.png");

        let source = Utf8PathBuf::try_from(temp_dir.path().join("shot.jpg")).unwrap();
        fs::write(&source, b"jpg").unwrap();

        let dest = app.select_map_image(&source).unwrap();
        assert_eq!(dest, app.store.pose_images_dir().join("1_Standing.jpg"));
        assert!(dest.exists());
        assert!(source.exists());
        assert!(!old.exists());
        assert!(app.store.trash_dir().join("1_Standing.png").exists());
    }
}
