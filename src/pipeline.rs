//! Batch pipeline: archive in, pose/scale tables out.
//!
//! One run unpacks the module archive with FarcPack, extracts the
//! module table, selects the applicable rule files and writes the
//! generated tables next to the archive. The editor never calls into
//! this; it shares only the config store and the rule services.

use crate::config::{self, AppSettings, ConfigStore};
use crate::models::{ModuleRecord, TomlProfile, PROFILE_SECTION_PREFIX};
use crate::services::{extract, generate, matcher, output, rules, unpack};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};

/// Run the full generation pipeline for one archive.
pub async fn run(archive: &Utf8Path, store: &ConfigStore) -> Result<()> {
    let main_config = config::load_document(&store.main_config_path())
        .context("Failed to load main config")?;
    let settings = AppSettings::from_document(&main_config);

    let profile_doc = config::load_document(&store.profile_config_path())
        .context("Failed to load profile config")?;

    let farc_pack = unpack::validate_farc_pack_path(&settings.farc_pack_path)?;
    let temp_dir = store.temp_dir();

    let result = generate_tables(archive, &farc_pack, &temp_dir, store, &settings, &profile_doc)
        .await;

    if settings.effective_delete_temp() {
        unpack::clean_temp_dir(&temp_dir);
    }
    result
}

async fn generate_tables(
    archive: &Utf8Path,
    farc_pack: &Utf8Path,
    temp_dir: &Utf8Path,
    store: &ConfigStore,
    settings: &AppSettings,
    profile_doc: &crate::document::Document,
) -> Result<()> {
    unpack::unpack_archive(archive, farc_pack, temp_dir).await?;
    let records = extract::extract_module_records(temp_dir)?;
    tracing::info!("Extracted {} module records from {}", records.len(), archive);

    let rule_files = if settings.use_module_name_contains {
        rules::select_profile_files(profile_doc, &records)
    } else {
        vec![rules::DEFAULT_RULE_FILE.to_string()]
    };
    let all_rules = rules::load_rules(store.pose_data_dir(), &rule_files)?;

    let save_dir = save_directory(archive, settings.save_in_parent_directory)?;

    let pose_entries = generate::generate_pose_entries(&records, &all_rules);
    if settings.use_module_name_contains {
        save_per_profile_tables(&pose_entries, &records, settings, profile_doc, &save_dir)?;
    } else {
        save_entries(
            &save_dir.join(format!("{}.toml", settings.default_pose_file_name)),
            &pose_entries,
            settings.overwrite_existing_files,
        )?;
    }

    let scale_entries = generate::generate_scale_entries(&records, &all_rules);
    save_entries(
        &save_dir.join("scale_db.toml"),
        &scale_entries,
        settings.overwrite_existing_files,
    )?;

    tracing::info!("Generation finished for {}", archive);
    Ok(())
}

/// Write the full pose entry list to each matched profile's file.
///
/// The entries are generated once from the rules of every selected
/// file, so a module outside a profile's ModuleMatch still lands in
/// the output through the always-appended default rule file. A profile
/// only decides whether its file is written and what it is called.
fn save_per_profile_tables(
    pose_entries: &[String],
    records: &[ModuleRecord],
    settings: &AppSettings,
    profile_doc: &crate::document::Document,
    save_dir: &Utf8Path,
) -> Result<()> {
    for (section_name, section) in profile_doc.sections() {
        if !section_name.starts_with(PROFILE_SECTION_PREFIX) {
            continue;
        }
        let profile = TomlProfile::from_section(section);

        let matched = records.iter().any(|r| {
            matcher::is_match(&r.name, &profile.module_match, Some(&profile.module_exclude))
        });
        if !matched {
            tracing::info!("No modules matched profile {}, skipping", section_name);
            continue;
        }

        let file_name = if profile.pose_file_name.is_empty() {
            settings.default_pose_file_name.clone()
        } else {
            profile.pose_file_name.clone()
        };
        save_entries(
            &save_dir.join(format!("{}.toml", file_name)),
            pose_entries,
            settings.overwrite_existing_files,
        )?;
    }
    Ok(())
}

fn save_entries(path: &Utf8Path, entries: &[String], overwrite: bool) -> Result<()> {
    if entries.is_empty() {
        tracing::info!("No entries generated, skipping {}", path);
        return Ok(());
    }
    let mut data = entries.join("\n");
    if !data.ends_with('\n') {
        data.push('\n');
    }
    output::save_with_timestamp(path, &data, overwrite)
}

fn save_directory(archive: &Utf8Path, in_parent: bool) -> Result<Utf8PathBuf> {
    let dir = archive
        .parent()
        .with_context(|| format!("Archive path has no parent directory: {}", archive))?;
    if in_parent {
        Ok(dir.parent().unwrap_or(dir).to_path_buf())
    } else {
        Ok(dir.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_directory_options() {
        let archive = Utf8Path::new("/mods/miku_pack/rom/module.farc");
        assert_eq!(save_directory(archive, false).unwrap(), "/mods/miku_pack/rom");
        assert_eq!(save_directory(archive, true).unwrap(), "/mods/miku_pack");
    }

    #[test]
    fn test_profile_tables_carry_the_full_entry_list() {
        let temp = tempfile::TempDir::new().unwrap();
        let save_dir = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();

        let profiles = crate::document::Document::parse(concat!(
            "[TomlProfile_Miku]\nModuleMatch = Miku\nConfigFile = MikuRules\nPoseFileName = miku_pose\n\n",
            "[TomlProfile_Kaito]\nModuleMatch = Kaito\nConfigFile = KaitoRules\nPoseFileName = kaito_pose\n",
        ))
        .unwrap();

        let records = vec![
            ModuleRecord {
                module_num: "0".to_string(),
                id: "10".to_string(),
                chara: "MIKU".to_string(),
                cos: "COS_001".to_string(),
                name: "Miku Default".to_string(),
            },
            // Matches no profile; covered by the default rule file.
            ModuleRecord {
                module_num: "1".to_string(),
                id: "11".to_string(),
                chara: "RIN".to_string(),
                cos: "COS_001".to_string(),
                name: "Rin Future".to_string(),
            },
        ];

        let entries = vec!["10 = 5".to_string(), "11 = 1".to_string()];
        let settings = AppSettings {
            overwrite_existing_files: true,
            ..AppSettings::from_document(&crate::document::Document::new())
        };

        save_per_profile_tables(&entries, &records, &settings, &profiles, &save_dir).unwrap();

        // The matched profile gets every generated entry, including the
        // one for the module outside its own ModuleMatch.
        assert_eq!(
            std::fs::read_to_string(save_dir.join("miku_pose.toml")).unwrap(),
            "10 = 5\n11 = 1\n"
        );
        // The unmatched profile writes nothing.
        assert!(!save_dir.join("kaito_pose.toml").exists());
    }

    #[test]
    fn test_empty_entries_write_nothing() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(temp.path().join("out.toml")).unwrap();

        save_entries(&path, &[], true).unwrap();
        assert!(!path.exists());

        save_entries(&path, &["1 = 2".to_string()], true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1 = 2\n");
    }
}
