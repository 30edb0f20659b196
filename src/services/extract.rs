//! Module table extraction from unpacked archive contents.
//!
//! The unpacker leaves one or more `*gm_module_tbl*` directories in the
//! temp directory; their `.bin` files are plain text of
//! `module.<num>.<key> = <value>` lines.

use crate::models::ModuleRecord;
use anyhow::{Context, Result, bail};
use camino::Utf8Path;
use indexmap::IndexMap;
use serde::Serialize;
use std::fs;

#[derive(Serialize)]
struct ModuleDump<'a> {
    modules: &'a [ModuleRecord],
}

/// Concatenate the text of every `.bin` file under the
/// `*gm_module_tbl*` directories in `temp_dir`.
fn combine_table_text(temp_dir: &Utf8Path) -> Result<String> {
    let mut table_dirs = Vec::new();
    for entry in temp_dir
        .read_dir_utf8()
        .with_context(|| format!("Failed to list temp directory: {}", temp_dir))?
        .flatten()
    {
        let path = entry.path();
        if path.is_dir() && path.file_name().is_some_and(|n| n.contains("gm_module_tbl")) {
            table_dirs.push(path.to_path_buf());
        }
    }

    if table_dirs.is_empty() {
        bail!("no gm_module_tbl directory found under {}", temp_dir);
    }

    let mut text = String::new();
    for dir in table_dirs {
        for entry in dir
            .read_dir_utf8()
            .with_context(|| format!("Failed to list table directory: {}", dir))?
            .flatten()
        {
            let path = entry.path();
            if path.extension() != Some("bin") {
                continue;
            }
            match fs::read_to_string(path) {
                Ok(content) if content.is_empty() => {
                    tracing::warn!("Skipping empty table file: {}", path);
                }
                Ok(content) => {
                    tracing::info!("Read table file: {}", path);
                    text.push_str(&content);
                }
                Err(e) => {
                    tracing::error!("Failed to read table file {}: {}", path, e);
                }
            }
        }
    }

    if text.is_empty() {
        bail!("no module table data could be read under {}", temp_dir);
    }
    Ok(text)
}

/// Parse the combined table text into module records, grouped by module
/// number in first-seen order, and dump `module_data.json` next to the
/// unpacked data for inspection.
pub fn extract_module_records(temp_dir: &Utf8Path) -> Result<Vec<ModuleRecord>> {
    let text = combine_table_text(temp_dir)?;

    let mut modules: IndexMap<String, ModuleRecord> = IndexMap::new();
    for line in text.lines() {
        let line = line.trim();
        if !line.starts_with("module.") {
            continue;
        }
        let Some((key_part, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();

        let mut parts = key_part.trim().split('.');
        let _ = parts.next(); // "module"
        let (Some(module_num), Some(key)) = (parts.next(), parts.next()) else {
            continue;
        };

        if !matches!(key, "chara" | "cos" | "id" | "name") {
            continue;
        }

        let record = modules.entry(module_num.to_string()).or_insert_with(|| ModuleRecord {
            module_num: module_num.to_string(),
            ..ModuleRecord::default()
        });
        match key {
            "chara" => record.chara = value.to_string(),
            "cos" => record.cos = value.to_string(),
            "id" => record.id = value.to_string(),
            "name" => record.name = value.to_string(),
            _ => unreachable!(),
        }
    }

    let records: Vec<ModuleRecord> = modules.into_values().collect();

    let dump_path = temp_dir.join("module_data.json");
    let json = serde_json::to_string_pretty(&ModuleDump { modules: &records })
        .context("Failed to serialize module data")?;
    fs::write(&dump_path, json)
        .with_context(|| format!("Failed to write module dump: {}", dump_path))?;
    tracing::info!("Extracted {} module records ({})", records.len(), dump_path);

    Ok(records)
}
