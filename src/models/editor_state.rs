use crate::document::Document;
use camino::Utf8PathBuf;

/// All mutable editor state, owned by the coordinator.
///
/// One explicit struct instead of ambient globals: every tab operation
/// receives the coordinator and works on these fields, and the history
/// manager captures/restores them per context.
#[derive(Debug, Clone, Default)]
pub struct EditorState {
    /// `Settings/Config.ini` contents.
    pub main_config: Document,
    /// `Settings/TomlProfile.ini` contents.
    pub profile_config: Document,
    /// `Settings/PoseIDMap.ini` contents.
    pub pose_id_map: Document,
    /// `Settings/KeyMap.ini` contents.
    pub key_map: Document,

    /// File name of the rule file open in the data tab.
    pub current_pose_file: String,
    /// Contents of the rule file open in the data tab.
    pub current_pose_config: Document,

    /// Selected `TomlProfile_*` section in the profile tab.
    pub selected_profile_section: Option<String>,
    /// Selected `PoseScaleSetting_*` section in the data tab.
    pub selected_pose_data_section: Option<String>,
    /// Selected pose id in the map tab.
    pub selected_map_key: Option<String>,

    /// Window geometry string, persisted on shutdown.
    pub window_geometry: String,

    /// Images soft-deleted this session, purged on shutdown if the
    /// reloaded PoseIDs map no longer references their pose ids.
    pub pending_delete_images: Vec<Utf8PathBuf>,
    /// Image staged for trash by the map tab, executed on next save.
    pub pending_trash_image: Option<Utf8PathBuf>,
}
