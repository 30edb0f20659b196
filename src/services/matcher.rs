//! Keyword matching for module names.
//!
//! A rule's `ModuleNameContains` value is a comma-separated include
//! list; entries prefixed with `|` are a legacy syntax for excludes and
//! are merged into the exclude set. `ModuleExclude` is a plain
//! comma-separated exclude list.

/// Split a comma-separated keyword string into trimmed non-empty parts.
pub fn split_keywords(spec: &str) -> Vec<&str> {
    spec.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Decide whether a module name matches an include/exclude keyword spec.
///
/// Excludes win: if the name contains any exclude keyword as a
/// substring the result is false. Otherwise the name matches when it
/// contains any include keyword. Containment is case-sensitive with no
/// normalization.
///
/// An empty include set never matches, even when excludes are present.
/// The fallback pass of the generators relies on this: a rule with an
/// empty `ModuleNameContains` bypasses this function entirely and is
/// applied by exclusion only.
pub fn is_match(name: &str, contains_spec: &str, exclude_spec: Option<&str>) -> bool {
    if contains_spec.is_empty() {
        return false;
    }

    let parts = split_keywords(contains_spec);
    let mut includes: Vec<&str> = Vec::new();
    let mut excludes: Vec<&str> = Vec::new();

    for part in parts {
        if let Some(legacy) = part.strip_prefix('|') {
            excludes.push(legacy);
        } else {
            includes.push(part);
        }
    }

    if let Some(spec) = exclude_spec {
        excludes.extend(split_keywords(spec));
    }

    // Mojibake guard: a bare replacement character among the includes
    // is corrupted input, not a keyword.
    if includes.contains(&"\u{fffd}") {
        tracing::warn!(
            "Dropping invalid replacement-character keyword from '{}'",
            contains_spec
        );
        includes.retain(|inc| *inc != "\u{fffd}");
    }

    tracing::debug!(
        "Checking module '{}' against includes {:?}, excludes {:?}",
        name,
        includes,
        excludes
    );

    if excludes.iter().any(|exc| name.contains(exc)) {
        return false;
    }

    includes.iter().any(|inc| name.contains(inc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_include_substring_matches() {
        assert!(is_match("Miku_Costume_01", "Miku", None));
    }

    #[test]
    fn test_exclude_wins_over_include() {
        assert!(!is_match("Miku_Costume_01", "Miku", Some("Costume_01")));
    }

    #[test]
    fn test_empty_include_never_matches() {
        assert!(!is_match("Rin", "", Some("x")));
        assert!(!is_match("Rin", "", None));
    }

    #[test]
    fn test_legacy_pipe_exclude_leaves_empty_include_set() {
        // "|A" contributes only an exclude; with no includes left the
        // result is false for any name.
        assert!(!is_match("AB", "|A", None));
        assert!(!is_match("ZZ", "|A", None));
    }

    #[test]
    fn test_legacy_pipe_exclude_merged_with_includes() {
        assert!(is_match("Miku Append", "Miku, |Natural", None));
        assert!(!is_match("Miku Natural", "Miku, |Natural", None));
    }

    #[test]
    fn test_or_over_includes() {
        assert!(is_match("Ann Sweet", "Miku, Sweet", None));
        assert!(!is_match("Ann Plain", "Miku, Sweet", None));
    }

    #[test]
    fn test_match_is_case_sensitive() {
        assert!(!is_match("miku", "Miku", None));
    }

    #[test]
    fn test_replacement_character_keyword_is_dropped() {
        assert!(!is_match("abc\u{fffd}def", "\u{fffd}", None));
        assert!(is_match("abc\u{fffd}def", "\u{fffd}, abc", None));
    }

    #[test]
    fn test_split_keywords_trims_and_drops_empties() {
        assert_eq!(split_keywords(" a , , b ,"), vec!["a", "b"]);
        assert!(split_keywords("  ").is_empty());
    }
}
