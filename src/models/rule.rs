use crate::document::Section;

/// Section name prefix for pose/scale rules in a rule file.
pub const RULE_SECTION_PREFIX: &str = "PoseScaleSetting_";

/// Section name prefix for output profiles in `TomlProfile.ini`.
pub const PROFILE_SECTION_PREFIX: &str = "TomlProfile_";

/// One user-authored matching rule.
///
/// A rule either targets modules whose name contains a keyword
/// (`name_contains` non-empty) or acts as a per-character fallback
/// (`name_contains` empty). `pose_id` and `scale` are `None` when the
/// key is absent or blank; the generators skip whichever payload a
/// rule does not carry.
///
/// # Related Types
///
/// - [`crate::services::matcher`]: include/exclude evaluation
/// - [`crate::services::generate`]: two-pass rule application
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoseScaleRule {
    pub chara: String,
    pub name_contains: String,
    pub exclude: String,
    pub pose_id: Option<String>,
    pub scale: Option<String>,
}

impl PoseScaleRule {
    /// Build a rule from a `PoseScaleSetting_*` section; missing keys
    /// default to empty, blank PoseID/Scale become `None`.
    pub fn from_section(section: &Section) -> Self {
        Self {
            chara: get_trimmed(section, "Chara"),
            name_contains: get_trimmed(section, "ModuleNameContains"),
            exclude: get_trimmed(section, "ModuleExclude"),
            pose_id: get_optional(section, "PoseID"),
            scale: get_optional(section, "Scale"),
        }
    }
}

/// One output profile from `TomlProfile.ini`: which modules it applies
/// to and where its pose entries are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TomlProfile {
    pub module_match: String,
    pub module_exclude: String,
    pub config_file: String,
    pub pose_file_name: String,
}

impl TomlProfile {
    pub fn from_section(section: &Section) -> Self {
        Self {
            module_match: get_trimmed(section, "ModuleMatch"),
            module_exclude: get_trimmed(section, "ModuleExclude"),
            config_file: get_trimmed(section, "ConfigFile"),
            pose_file_name: get_trimmed(section, "PoseFileName"),
        }
    }
}

fn get_trimmed(section: &Section, key: &str) -> String {
    section.get(key).map(|v| v.trim().to_string()).unwrap_or_default()
}

fn get_optional(section: &Section, key: &str) -> Option<String> {
    section
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
