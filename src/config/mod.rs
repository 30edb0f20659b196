use crate::document::Document;
use anyhow::{Context, Result, anyhow, bail};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::thread;
use std::time::Duration;

/// UTF-8 byte-order mark written at the start of every saved config file.
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Write retry policy for files held open by another process
/// (antivirus scanners are the usual culprit).
const SAVE_MAX_RETRIES: usize = 3;
const SAVE_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Load a config document from disk.
///
/// An absent file yields an empty [`Document`] (the caller creates
/// defaults). A file that exists but cannot be read or decoded is an
/// error, never an empty document, since the next save would overwrite
/// whatever the file actually held.
///
/// Decoding tries UTF-8-with-BOM, then plain UTF-8, then Shift_JIS
/// (cp932, for rule files written by older tools); the first decoding
/// that succeeds wins.
pub fn load_document(path: &Utf8Path) -> Result<Document> {
    if !path.exists() {
        return Ok(Document::new());
    }

    let bytes = fs::read(path).with_context(|| format!("Failed to read config: {}", path))?;
    let text = decode_config_bytes(&bytes)
        .with_context(|| format!("Failed to decode config: {}", path))?;

    let doc =
        Document::parse(&text).with_context(|| format!("Failed to parse config: {}", path))?;
    tracing::debug!("Loaded config from {} ({} sections)", path, doc.len());
    Ok(doc)
}

/// Save a config document as UTF-8-with-BOM.
///
/// Writes directly to the target path with no rename-swap: rename
/// pattern writes trip ransomware heuristics in some antivirus
/// products.
/// Transient write errors are retried up to [`SAVE_MAX_RETRIES`] times
/// before propagating.
pub fn save_document(doc: &Document, path: &Utf8Path) -> Result<()> {
    let mut bytes = Vec::from(UTF8_BOM);
    bytes.extend_from_slice(doc.to_ini_string().as_bytes());

    let mut last_err = None;
    for attempt in 0..SAVE_MAX_RETRIES {
        match fs::write(path, &bytes) {
            Ok(()) => {
                tracing::debug!("Saved config to {}", path);
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(
                    "Write attempt {}/{} failed for {}: {}",
                    attempt + 1,
                    SAVE_MAX_RETRIES,
                    path,
                    e
                );
                last_err = Some(e);
                if attempt + 1 < SAVE_MAX_RETRIES {
                    thread::sleep(SAVE_RETRY_DELAY);
                }
            }
        }
    }

    Err(anyhow!(last_err.expect("retry loop records an error"))
        .context(format!("Failed to save config: {}", path)))
}

/// Decode raw config bytes: UTF-8-with-BOM, then UTF-8, then Shift_JIS.
fn decode_config_bytes(bytes: &[u8]) -> Result<String> {
    let body = bytes.strip_prefix(&UTF8_BOM as &[u8]).unwrap_or(bytes);

    if let Ok(text) = std::str::from_utf8(body) {
        return Ok(text.to_string());
    }

    let (text, _, had_errors) = encoding_rs::SHIFT_JIS.decode(body);
    if had_errors {
        bail!("not valid UTF-8 or Shift_JIS");
    }
    tracing::warn!("Config is not UTF-8; decoded as Shift_JIS");
    Ok(text.into_owned())
}

/// Owns the on-disk layout of the settings directory and the load/save
/// entry points for every config document.
///
/// Layout under the application directory:
/// - `Settings/Config.ini`: main settings
/// - `Settings/TomlProfile.ini`: output profiles
/// - `Settings/PoseIDMap.ini`: pose id to display name map
/// - `Settings/KeyMap.ini`: editor shortcut table
/// - `Settings/PoseScaleData/*.ini`: pose/scale rule files
/// - `Settings/PoseImages/`: pose preview images, with a `_trash/`
///   subfolder used as soft-delete staging
#[derive(Debug, Clone)]
pub struct ConfigStore {
    app_dir: Utf8PathBuf,
    settings_dir: Utf8PathBuf,
    pose_data_dir: Utf8PathBuf,
    pose_images_dir: Utf8PathBuf,
}

impl ConfigStore {
    /// Create a store rooted at the application directory, ensuring the
    /// directory tree and the default config files exist.
    pub fn new<P: AsRef<Utf8Path>>(app_dir: P) -> Result<Self> {
        let app_dir = app_dir.as_ref().to_path_buf();
        let settings_dir = app_dir.join("Settings");
        let store = Self {
            pose_data_dir: settings_dir.join("PoseScaleData"),
            pose_images_dir: settings_dir.join("PoseImages"),
            settings_dir,
            app_dir,
        };
        store.ensure_directories()?;
        store.ensure_default_files()?;
        Ok(store)
    }

    fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.settings_dir, &self.pose_data_dir, &self.pose_images_dir] {
            if !dir.exists() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create directory: {}", dir))?;
            }
        }
        Ok(())
    }

    fn ensure_default_files(&self) -> Result<()> {
        let main_path = self.main_config_path();
        if !main_path.exists() {
            save_document(&default_main_config(), &main_path)?;
            tracing::info!("Created default main config at {}", main_path);
        }

        let profile_path = self.profile_config_path();
        if !profile_path.exists() {
            save_document(&Document::new(), &profile_path)?;
        }

        let map_path = self.pose_id_map_path();
        if !map_path.exists() {
            let mut doc = Document::new();
            doc.ensure_section("PoseIDs");
            save_document(&doc, &map_path)?;
        }

        let default_rules = self.pose_data_dir.join("PoseScaleData.ini");
        if !default_rules.exists() {
            save_document(&default_rule_file(), &default_rules)?;
            tracing::info!("Created starter rule file at {}", default_rules);
        }

        Ok(())
    }

    /// Load a document through the store (see [`load_document`]).
    pub fn load(&self, path: &Utf8Path) -> Result<Document> {
        load_document(path)
    }

    /// Save a document through the store (see [`save_document`]).
    pub fn save(&self, doc: &Document, path: &Utf8Path) -> Result<()> {
        save_document(doc, path)
    }

    pub fn app_dir(&self) -> &Utf8Path {
        &self.app_dir
    }

    pub fn settings_dir(&self) -> &Utf8Path {
        &self.settings_dir
    }

    pub fn pose_data_dir(&self) -> &Utf8Path {
        &self.pose_data_dir
    }

    pub fn pose_images_dir(&self) -> &Utf8Path {
        &self.pose_images_dir
    }

    /// Trash staging folder for soft-deleted images.
    pub fn trash_dir(&self) -> Utf8PathBuf {
        self.pose_images_dir.join("_trash")
    }

    pub fn main_config_path(&self) -> Utf8PathBuf {
        self.settings_dir.join("Config.ini")
    }

    pub fn profile_config_path(&self) -> Utf8PathBuf {
        self.settings_dir.join("TomlProfile.ini")
    }

    pub fn pose_id_map_path(&self) -> Utf8PathBuf {
        self.settings_dir.join("PoseIDMap.ini")
    }

    pub fn key_map_path(&self) -> Utf8PathBuf {
        self.settings_dir.join("KeyMap.ini")
    }

    pub fn temp_dir(&self) -> Utf8PathBuf {
        self.app_dir.join("Temp")
    }

    /// Sorted file names of the rule files in PoseScaleData.
    pub fn list_pose_files(&self) -> Vec<String> {
        let mut names = Vec::new();
        let Ok(entries) = self.pose_data_dir.read_dir_utf8() else {
            return names;
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            if name.ends_with(".ini") {
                names.push(name.to_string());
            }
        }
        names.sort();
        names
    }

    /// Find the preview image for a pose id, matching the
    /// `<PoseID>_<name>.<ext>` naming convention.
    pub fn find_image_for_pose(&self, pose_id: &str) -> Option<Utf8PathBuf> {
        if pose_id.is_empty() {
            return None;
        }
        let prefix = format!("{}_", pose_id);
        let entries = self.pose_images_dir.read_dir_utf8().ok()?;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let lower = name.to_ascii_lowercase();
            if name.starts_with(&prefix)
                && (lower.ends_with(".png")
                    || lower.ends_with(".jpg")
                    || lower.ends_with(".jpeg")
                    || lower.ends_with(".bmp"))
            {
                return Some(self.pose_images_dir.join(name));
            }
        }
        None
    }
}

/// Default `Config.ini` contents for a fresh install.
fn default_main_config() -> Document {
    let mut doc = Document::new();
    doc.set("FarcPack", "FarcPackPath", "");
    doc.set("GeneralSettings", "SaveInParentDirectory", "False");
    doc.set("GeneralSettings", "DefaultPoseFileName", "gm_module_pose_tbl");
    doc.set("GeneralSettings", "UseModuleNameContains", "False");
    doc.set("GeneralSettings", "OverwriteExistingFiles", "False");
    doc.set("GeneralSettings", "Language", "en");
    doc.set("DebugSettings", "ShowDebugSettings", "False");
    doc.set("DebugSettings", "OutputLog", "False");
    doc.set("DebugSettings", "DeleteTemp", "True");
    doc.set("DebugSettings", "HistoryLimit", "50");
    doc
}

/// Starter `PoseScaleData.ini` with one example rule.
fn default_rule_file() -> Document {
    let mut doc = Document::new();
    doc.set("PoseScaleSetting_Default", "Chara", "MIKU");
    doc.set("PoseScaleSetting_Default", "ModuleNameContains", "ミク, Miku");
    doc.set("PoseScaleSetting_Default", "PoseID", "");
    doc.set("PoseScaleSetting_Default", "Scale", "1.0");
    doc
}

/// Typed view over the main config used by the batch generator; every
/// field has the same fallback as the editor.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub farc_pack_path: String,
    pub save_in_parent_directory: bool,
    pub default_pose_file_name: String,
    pub use_module_name_contains: bool,
    pub overwrite_existing_files: bool,
    pub language: String,
    pub show_debug_settings: bool,
    pub output_log: bool,
    pub delete_temp: bool,
    pub history_limit: usize,
}

impl AppSettings {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            farc_pack_path: doc
                .get_str("FarcPack", "FarcPackPath", "")
                .trim_matches('"')
                .to_string(),
            save_in_parent_directory: doc.get_bool("GeneralSettings", "SaveInParentDirectory", false),
            default_pose_file_name: doc.get_str("GeneralSettings", "DefaultPoseFileName", "pose_data"),
            use_module_name_contains: doc.get_bool("GeneralSettings", "UseModuleNameContains", false),
            overwrite_existing_files: doc.get_bool("GeneralSettings", "OverwriteExistingFiles", false),
            language: doc.get_str("GeneralSettings", "Language", "en"),
            show_debug_settings: doc.get_bool("DebugSettings", "ShowDebugSettings", false),
            output_log: doc.get_bool("DebugSettings", "OutputLog", false),
            delete_temp: doc.get_bool("DebugSettings", "DeleteTemp", true),
            history_limit: doc.get_int("DebugSettings", "HistoryLimit", 50).max(0) as usize,
        }
    }

    /// Debug settings only take effect while the debug panel is shown;
    /// otherwise the defaults are forced, matching the editor's gating.
    pub fn effective_output_log(&self) -> bool {
        self.show_debug_settings && self.output_log
    }

    pub fn effective_delete_temp(&self) -> bool {
        if self.show_debug_settings { self.delete_temp } else { true }
    }
}
