//! Rule file selection and loading for the batch pipeline.

use crate::config;
use crate::document::Document;
use crate::models::{ModuleRecord, PoseScaleRule, PROFILE_SECTION_PREFIX, RULE_SECTION_PREFIX};
use crate::services::matcher::split_keywords;
use anyhow::Result;
use camino::Utf8Path;

/// Default rule file, always consulted as the fallback.
pub const DEFAULT_RULE_FILE: &str = "PoseScaleData.ini";

/// Select which rule files apply to this archive.
///
/// Each `TomlProfile_*` section is kept when any extracted module name
/// contains one of its ModuleMatch keywords and none of its
/// ModuleExclude keywords; a kept profile contributes
/// `<ConfigFile>.ini`. The default rule file is always appended so
/// modules outside every profile still get the default rules.
pub fn select_profile_files(profile_doc: &Document, records: &[ModuleRecord]) -> Vec<String> {
    let mut files = Vec::new();

    for (section_name, section) in profile_doc.sections() {
        if !section_name.starts_with(PROFILE_SECTION_PREFIX) {
            continue;
        }
        let match_str = section.get("ModuleMatch").map(String::as_str).unwrap_or("");
        let exclude_str = section.get("ModuleExclude").map(String::as_str).unwrap_or("");
        let match_keywords = split_keywords(match_str);
        let exclude_keywords = split_keywords(exclude_str);

        let profile_matches = records.iter().any(|record| {
            !exclude_keywords.iter().any(|exc| record.name.contains(exc))
                && match_keywords.iter().any(|k| record.name.contains(k))
        });

        if profile_matches {
            let config_file = section.get("ConfigFile").map(String::as_str).unwrap_or("");
            if !config_file.is_empty() {
                tracing::info!("Profile matched: {} -> {}.ini", section_name, config_file);
                files.push(format!("{}.ini", config_file));
            }
        } else {
            tracing::info!("Profile skipped (no match in module data): {}", section_name);
        }
    }

    if !files.iter().any(|f| f == DEFAULT_RULE_FILE) {
        files.push(DEFAULT_RULE_FILE.to_string());
    }
    files
}

/// Load `PoseScaleSetting_*` rules from the given files under the rule
/// directory, in file order then section order. Missing files are
/// skipped.
pub fn load_rules(pose_data_dir: &Utf8Path, files: &[String]) -> Result<Vec<PoseScaleRule>> {
    let mut rules = Vec::new();

    for file in files {
        let path = pose_data_dir.join(file);
        if !path.exists() {
            tracing::warn!("Rule file not found, skipping: {}", path);
            continue;
        }
        let doc = config::load_document(&path)?;
        for (section_name, section) in doc.sections() {
            if section_name.starts_with(RULE_SECTION_PREFIX) {
                rules.push(PoseScaleRule::from_section(section));
            }
        }
        tracing::info!("Loaded rules from {}", path);
    }

    tracing::info!("Loaded {} rules", rules.len());
    Ok(rules)
}
