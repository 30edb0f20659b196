//! Editor coordinator.
//!
//! `EditorApp` owns the config store, every in-memory document, the
//! selection state and the history manager. The per-tab operations in
//! the submodules mutate this state, snapshotting the relevant context
//! first and saving to disk after; rendering and shortcut capture live
//! in a UI layer outside this crate.

pub mod data;
pub mod general;
pub mod keymap;
pub mod map;
pub mod normalize;
pub mod profile;

use crate::config::{AppSettings, ConfigStore};
use crate::document::Document;
use crate::history::{ContextState, EditContext, HistoryHost, HistoryManager};
use crate::models::EditorState;
use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use thiserror::Error;

/// User-input rejections surfaced before any mutation happens.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("A section suffix is required")]
    EmptySuffix,

    #[error("Section [{0}] already exists")]
    DuplicateSection(String),

    #[error("Pose id {0} already exists")]
    DuplicatePoseId(String),

    #[error("File '{0}' already exists")]
    FileExists(String),

    #[error("No file is selected")]
    NoFileSelected,

    #[error("No entry is selected")]
    NoSelection,

    #[error("Pose ID must be half-width digits only")]
    InvalidPoseId,

    #[error("Scale must be half-width digits and a period only")]
    InvalidScale,

    #[error("Either Pose ID or Scale must be set")]
    MissingAssignment,

    #[error("File name may only contain ASCII letters, digits, '_', '-' and '.'")]
    InvalidFileName,
}

/// The editor application state: store, documents, selections, history.
pub struct EditorApp {
    pub store: ConfigStore,
    pub state: EditorState,
    pub history: HistoryManager,
}

/// Borrowed view handed to the history manager during undo/redo.
///
/// Splitting the host off the app lets the manager borrow the state
/// mutably while it is itself borrowed mutably from the same app.
struct EditorHost<'a> {
    store: &'a ConfigStore,
    state: &'a mut EditorState,
}

impl EditorApp {
    /// Load all documents and build the coordinator.
    ///
    /// A present-but-unreadable main config is an error, not an empty
    /// document: proceeding would overwrite the user's settings on the
    /// first save.
    pub fn new(store: ConfigStore) -> Result<Self> {
        let main_config = store
            .load(&store.main_config_path())
            .context("Main config exists but could not be loaded")?;
        let profile_config = store.load(&store.profile_config_path())?;
        let pose_id_map = store.load(&store.pose_id_map_path())?;
        let key_map = keymap::load_key_map(&store)?;

        let settings = AppSettings::from_document(&main_config);
        let history = HistoryManager::new(settings.history_limit);

        let mut state = EditorState {
            window_geometry: main_config.get_str("GeneralSettings", "WindowGeometry", "1100x800"),
            main_config,
            profile_config,
            pose_id_map,
            key_map,
            ..EditorState::default()
        };

        // Open the first rule file, as the data tab would.
        if let Some(first) = store.list_pose_files().into_iter().next() {
            let doc = store.load(&store.pose_data_dir().join(&first))?;
            state.current_pose_file = first;
            state.current_pose_config = doc;
        }

        tracing::info!("Editor state loaded ({} rule files)", store.list_pose_files().len());
        Ok(Self { store, state, history })
    }

    fn take_snapshot(&mut self, context: EditContext) {
        let host = EditorHost {
            store: &self.store,
            state: &mut self.state,
        };
        self.history.snapshot(context, &host);
    }

    pub fn can_undo(&self, context: EditContext) -> bool {
        self.history.can_undo(context)
    }

    pub fn can_redo(&self, context: EditContext) -> bool {
        self.history.can_redo(context)
    }

    pub fn undo(&mut self, context: EditContext) -> bool {
        let mut host = EditorHost {
            store: &self.store,
            state: &mut self.state,
        };
        self.history.undo(context, &mut host)
    }

    pub fn redo(&mut self, context: EditContext) -> bool {
        let mut host = EditorHost {
            store: &self.store,
            state: &mut self.state,
        };
        self.history.redo(context, &mut host)
    }

    /// Clean shutdown: persist geometry against a fresh on-disk config,
    /// purge soft-deleted images the current map no longer references,
    /// and empty the trash folder. Everything here is best-effort.
    pub fn shutdown(&mut self) {
        if let Err(e) = self.save_geometry() {
            tracing::warn!("Failed to persist window geometry: {:#}", e);
        }
        self.purge_pending_images();
        self.empty_trash();
    }

    /// Write the geometry into a freshly loaded config so settings saved
    /// by another path since startup are not clobbered.
    fn save_geometry(&self) -> Result<()> {
        let path = self.store.main_config_path();
        let mut doc = self.store.load(&path)?;
        doc.set("GeneralSettings", "WindowGeometry", &self.state.window_geometry);
        self.store.save(&doc, &path)
    }

    fn purge_pending_images(&mut self) {
        if self.state.pending_delete_images.is_empty() {
            return;
        }

        // Undo may have restored entries since the delete; decide
        // against the on-disk map, not the in-memory one.
        let current_map = self
            .store
            .load(&self.store.pose_id_map_path())
            .unwrap_or_default();
        let live_ids: Vec<String> = current_map
            .section("PoseIDs")
            .map(|s| s.keys().cloned().collect())
            .unwrap_or_default();

        for image_path in std::mem::take(&mut self.state.pending_delete_images) {
            let referenced = image_path.file_name().is_some_and(|name| {
                live_ids.iter().any(|id| name.starts_with(&format!("{}_", id)))
            });
            if referenced {
                tracing::info!("Skipping purge of restored image: {}", image_path);
                continue;
            }
            if image_path.exists() {
                match fs::remove_file(&image_path) {
                    Ok(()) => tracing::info!("Deleted unused image: {}", image_path),
                    Err(e) => tracing::warn!("Failed to delete image {}: {}", image_path, e),
                }
            }
        }
    }

    fn empty_trash(&self) {
        let trash = self.store.trash_dir();
        if !trash.exists() {
            return;
        }
        match fs::remove_dir_all(&trash) {
            Ok(()) => tracing::info!("Emptied trash directory: {}", trash),
            Err(e) => tracing::warn!("Failed to empty trash {} (ignored): {}", trash, e),
        }
    }
}

impl EditorHost<'_> {
    fn serialize(doc: &Document) -> String {
        doc.to_ini_string()
    }

    fn parse_or_warn(text: &str) -> Document {
        match Document::parse(text) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!("Failed to parse history snapshot: {}", e);
                Document::new()
            }
        }
    }

    fn list_rule_files(&self) -> Vec<String> {
        self.store.list_pose_files()
    }
}

impl HistoryHost for EditorHost<'_> {
    fn capture_state(&self, context: EditContext) -> ContextState {
        match context {
            EditContext::General => ContextState::General {
                main_config: Self::serialize(&self.state.main_config),
            },
            EditContext::Profile => ContextState::Profile {
                profile_config: Self::serialize(&self.state.profile_config),
                selected_section: self.state.selected_profile_section.clone(),
            },
            EditContext::Data => ContextState::Data {
                pose_file: self.state.current_pose_file.clone(),
                pose_config: if self.state.current_pose_file.is_empty() {
                    None
                } else {
                    Some(Self::serialize(&self.state.current_pose_config))
                },
                selected_section: self.state.selected_pose_data_section.clone(),
                file_list: self.list_rule_files(),
            },
            EditContext::Map => ContextState::Map {
                pose_id_map: Self::serialize(&self.state.pose_id_map),
                selected_key: self.state.selected_map_key.clone(),
            },
            EditContext::Key => ContextState::Key {
                key_map: Self::serialize(&self.state.key_map),
            },
        }
    }

    fn restore_state(&mut self, _context: EditContext, state: &ContextState) -> Result<()> {
        match state {
            ContextState::General { main_config } => {
                self.state.main_config = Self::parse_or_warn(main_config);
                self.store
                    .save(&self.state.main_config, &self.store.main_config_path())?;
            }
            ContextState::Profile {
                profile_config,
                selected_section,
            } => {
                self.state.profile_config = Self::parse_or_warn(profile_config);
                self.store
                    .save(&self.state.profile_config, &self.store.profile_config_path())?;
                self.state.selected_profile_section = selected_section.clone();
            }
            ContextState::Data {
                pose_file,
                pose_config,
                selected_section,
                file_list,
            } => {
                self.reconcile_rule_files(file_list);

                self.state.current_pose_file = pose_file.clone();
                self.state.current_pose_config = match pose_config {
                    Some(text) => Self::parse_or_warn(text),
                    None => Document::new(),
                };
                if !pose_file.is_empty() {
                    let path = self.store.pose_data_dir().join(pose_file);
                    self.store.save(&self.state.current_pose_config, &path)?;
                }
                self.state.selected_pose_data_section = selected_section.clone();
            }
            ContextState::Map {
                pose_id_map,
                selected_key,
            } => {
                self.state.pose_id_map = Self::parse_or_warn(pose_id_map);
                self.store
                    .save(&self.state.pose_id_map, &self.store.pose_id_map_path())?;
                self.state.selected_map_key = selected_key.clone();
            }
            ContextState::Key { key_map } => {
                self.state.key_map = Self::parse_or_warn(key_map);
                self.store.save(&self.state.key_map, &self.store.key_map_path())?;
            }
        }
        Ok(())
    }

    fn refresh(&mut self, context: EditContext) {
        if context != EditContext::Data {
            return;
        }
        // A rule file was restored or re-deleted outside the document
        // snapshots; make the open file consistent with the directory.
        let current_path = if self.state.current_pose_file.is_empty() {
            None
        } else {
            Some(self.store.pose_data_dir().join(&self.state.current_pose_file))
        };
        let current_exists = current_path.as_deref().is_some_and(Utf8Path::exists);

        if !current_exists {
            match self.list_rule_files().into_iter().next() {
                Some(first) => {
                    let path = self.store.pose_data_dir().join(&first);
                    self.state.current_pose_config =
                        self.store.load(&path).unwrap_or_default();
                    self.state.current_pose_file = first;
                }
                None => {
                    self.state.current_pose_file = String::new();
                    self.state.current_pose_config = Document::new();
                }
            }
            self.state.selected_pose_data_section = None;
        } else if let Some(path) = current_path {
            if let Ok(doc) = self.store.load(&path) {
                self.state.current_pose_config = doc;
            }
        }
    }
}

impl EditorHost<'_> {
    /// Bring the rule-file directory in line with a snapshot's listing:
    /// files created since the snapshot are removed, files deleted since
    /// are recreated empty (their content, if tracked, is restored by
    /// the document part of the snapshot).
    fn reconcile_rule_files(&self, target_list: &[String]) {
        let current_list = self.list_rule_files();

        for name in current_list.iter().filter(|n| !target_list.contains(n)) {
            let path = self.store.pose_data_dir().join(name);
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!("Failed to remove file during restore {}: {}", path, e);
            }
        }

        for name in target_list.iter().filter(|n| !current_list.contains(n)) {
            let path = self.store.pose_data_dir().join(name);
            if let Err(e) = fs::write(&path, [0xEF, 0xBB, 0xBF]) {
                tracing::warn!("Failed to recreate file during restore {}: {}", path, e);
            }
        }
    }
}
