//! Character code mapping tables.
//!
//! Module tables use full character names (`MIKU`, `SAKINE`, ...);
//! rules use 3-letter codes and the scale output uses numeric indices.
//! Unknown codes pass through unchanged so unmapped characters still
//! flow into the output rather than being dropped.

/// Map a module-table character name to the 3-letter rule code.
pub fn to_rule_code(chara: &str) -> &str {
    match chara {
        "MIKU" => "MIK",
        "RIN" => "RIN",
        "LEN" => "LEN",
        "LUKA" => "LUK",
        "NERU" => "NER",
        "HAKU" => "HAK",
        "KAITO" => "KAI",
        "MEIKO" => "MEI",
        "SAKINE" => "SAK",
        "TETO" => "TET",
        other => other,
    }
}

/// Map a module-table character name to the numeric index used in
/// `[[cos_scale]]` blocks.
pub fn to_scale_index(chara: &str) -> &str {
    match chara {
        "MIKU" => "0",
        "RIN" => "1",
        "LEN" => "2",
        "LUKA" => "3",
        "NERU" => "4",
        "HAKU" => "5",
        "KAITO" => "6",
        "MEIKO" => "7",
        "SAKINE" => "8",
        "TETO" => "9",
        other => other,
    }
}
