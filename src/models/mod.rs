//! Data models shared across the editor and the batch generator.

pub mod editor_state;
pub mod record;
pub mod rule;

pub use editor_state::EditorState;
pub use record::ModuleRecord;
pub use rule::{PoseScaleRule, TomlProfile, PROFILE_SECTION_PREFIX, RULE_SECTION_PREFIX};
