//! Pose id and scale assignment.
//!
//! Both generators share the same two-pass policy per record:
//!
//! 1. Specific pass: rules with a non-empty ModuleNameContains, whose
//!    Chara equals the record's mapped character code and whose
//!    include/exclude spec matches the record name.
//! 2. Fallback pass (only when pass 1 found nothing): rules with an
//!    empty ModuleNameContains and a matching Chara, with the exclude
//!    list applied directly (the matcher never matches on an empty
//!    include set, so fallback rules bypass it).
//!
//! Rules are scanned strictly in document order; the first qualifying
//! rule in each pass wins. A record matched by a rule with a blank
//! payload emits nothing but still stops the scan.

use crate::models::{ModuleRecord, PoseScaleRule};
use crate::services::chara;
use crate::services::matcher::{is_match, split_keywords};

/// Find the rule that applies to a record, two-pass.
fn match_rule<'a>(record: &ModuleRecord, rules: &'a [PoseScaleRule]) -> Option<&'a PoseScaleRule> {
    let record_chara = chara::to_rule_code(&record.chara);

    // Pass 1: specific matches.
    for rule in rules {
        if rule.name_contains.is_empty() || rule.chara != record_chara {
            continue;
        }
        if is_match(&record.name, &rule.name_contains, Some(&rule.exclude)) {
            return Some(rule);
        }
    }

    // Pass 2: fallback by exclusion only.
    for rule in rules {
        if !rule.name_contains.is_empty() || rule.chara != record_chara {
            continue;
        }
        let excluded = split_keywords(&rule.exclude)
            .iter()
            .any(|exc| record.name.contains(exc));
        if !excluded {
            return Some(rule);
        }
    }

    None
}

/// Generate `<id> = <PoseID>` lines for every record with a matching
/// rule that carries a pose id.
pub fn generate_pose_entries(records: &[ModuleRecord], rules: &[PoseScaleRule]) -> Vec<String> {
    tracing::info!("Generating pose entries for {} records", records.len());
    let mut entries = Vec::new();

    for record in records {
        match match_rule(record, rules) {
            Some(rule) => {
                if let Some(pose_id) = &rule.pose_id {
                    entries.push(format!("{} = {}", record.id, pose_id));
                    tracing::debug!(
                        "Assigned pose id: module={}, id={}, pose_id={}",
                        record.name,
                        record.id,
                        pose_id
                    );
                }
            }
            None => {
                tracing::debug!("No pose rule matched: {}", record.name);
            }
        }
    }

    entries
}

/// Generate `[[cos_scale]]` blocks for every record with a matching
/// rule that carries a scale. The costume slot is 1-based in the module
/// table and 0-based in the output.
pub fn generate_scale_entries(records: &[ModuleRecord], rules: &[PoseScaleRule]) -> Vec<String> {
    tracing::info!("Generating scale entries for {} records", records.len());
    let mut entries = Vec::new();

    for record in records {
        match match_rule(record, rules) {
            Some(rule) => {
                if let Some(scale) = &rule.scale {
                    match parse_cos_slot(&record.cos) {
                        Some(slot) => {
                            let chara_index = chara::to_scale_index(&record.chara);
                            entries.push(format!(
                                "[[cos_scale]]\nchara = {}\ncos = {}\nscale = {}\n",
                                chara_index,
                                slot - 1,
                                scale
                            ));
                            tracing::debug!(
                                "Assigned scale: module={}, scale={}",
                                record.name,
                                scale
                            );
                        }
                        None => {
                            tracing::warn!(
                                "Malformed costume code '{}' on module {}, no scale emitted",
                                record.cos,
                                record.name
                            );
                        }
                    }
                }
            }
            None => {
                tracing::debug!("No scale rule matched: {}", record.name);
            }
        }
    }

    entries
}

fn parse_cos_slot(cos: &str) -> Option<i64> {
    cos.replace("COS_", "").parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, chara: &str, cos: &str, name: &str) -> ModuleRecord {
        ModuleRecord {
            module_num: id.to_string(),
            id: id.to_string(),
            chara: chara.to_string(),
            cos: cos.to_string(),
            name: name.to_string(),
        }
    }

    fn rule(chara: &str, contains: &str, pose_id: Option<&str>, scale: Option<&str>) -> PoseScaleRule {
        PoseScaleRule {
            chara: chara.to_string(),
            name_contains: contains.to_string(),
            exclude: String::new(),
            pose_id: pose_id.map(str::to_string),
            scale: scale.map(str::to_string),
        }
    }

    #[test]
    fn test_specific_rule_beats_fallback() {
        let rules = vec![
            rule("MIK", "Sweet", Some("5"), None),
            rule("MIK", "", Some("1"), None),
        ];
        let records = vec![record("3", "MIKU", "COS_001", "Miku Sweet Ann")];

        assert_eq!(generate_pose_entries(&records, &rules), vec!["3 = 5"]);
    }

    #[test]
    fn test_specific_and_fallback_assignment() {
        let rules = vec![
            rule("MIK", "Append", Some("10"), None),
            rule("MIK", "", Some("1"), None),
        ];
        let records = vec![
            record("1", "MIKU", "COS_001", "Miku Append"),
            record("2", "MIKU", "COS_001", "Miku Default"),
        ];

        assert_eq!(generate_pose_entries(&records, &rules), vec!["1 = 10", "2 = 1"]);
    }

    #[test]
    fn test_chara_mismatch_contributes_nothing() {
        let rules = vec![rule("RIN", "", Some("1"), None)];
        let records = vec![record("1", "MIKU", "COS_001", "Miku")];
        assert!(generate_pose_entries(&records, &rules).is_empty());
    }

    #[test]
    fn test_fallback_respects_exclude_list() {
        let mut excluded = rule("MIK", "", Some("1"), None);
        excluded.exclude = "Default".to_string();
        let rules = vec![excluded, rule("MIK", "", Some("2"), None)];
        let records = vec![record("1", "MIKU", "COS_001", "Miku Default")];

        assert_eq!(generate_pose_entries(&records, &rules), vec!["1 = 2"]);
    }

    #[test]
    fn test_matched_rule_without_pose_id_stops_scan() {
        let rules = vec![
            rule("MIK", "Miku", None, Some("1.0")),
            rule("MIK", "", Some("1"), None),
        ];
        let records = vec![record("1", "MIKU", "COS_001", "Miku")];

        // Matched in pass 1 with no pose id: no line, no fallback.
        assert!(generate_pose_entries(&records, &rules).is_empty());
    }

    #[test]
    fn test_scale_block_format_and_cos_index() {
        let rules = vec![rule("MIK", "Miku", None, Some("1.05"))];
        let records = vec![record("1", "MIKU", "COS_003", "Miku")];

        let entries = generate_scale_entries(&records, &rules);
        assert_eq!(
            entries,
            vec!["[[cos_scale]]\nchara = 0\ncos = 2\nscale = 1.05\n"]
        );
    }

    #[test]
    fn test_malformed_cos_emits_no_block() {
        let rules = vec![rule("MIK", "Miku", None, Some("1.0"))];
        let records = vec![record("1", "MIKU", "COS_X", "Miku")];
        assert!(generate_scale_entries(&records, &rules).is_empty());
    }

    #[test]
    fn test_first_specific_rule_wins_in_document_order() {
        let rules = vec![
            rule("MIK", "Miku", Some("7"), None),
            rule("MIK", "Miku", Some("8"), None),
        ];
        let records = vec![record("1", "MIKU", "COS_001", "Miku")];
        assert_eq!(generate_pose_entries(&records, &rules), vec!["1 = 7"]);
    }
}
