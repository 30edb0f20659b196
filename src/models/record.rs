use serde::{Deserialize, Serialize};

/// One module entry extracted from a game module table.
///
/// All fields keep their raw string form from the binary table; the
/// matcher and generators interpret them as needed. `cos` carries the
/// `COS_NNN` prefix as extracted.
///
/// # Related Types
///
/// - [`crate::services::extract`]: produces records from unpacked tables
/// - [`crate::services::matcher`]: matches records against rules
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord {
    /// Table index the record was read from.
    pub module_num: String,
    /// Module id used in generated pose entries.
    pub id: String,
    /// Character code, e.g. `MIK`, `RIN`.
    pub chara: String,
    /// Costume slot, e.g. `COS_001`.
    pub cos: String,
    /// Display name, may contain Japanese text.
    pub name: String,
}
