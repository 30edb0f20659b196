use indexmap::IndexMap;
use thiserror::Error;

/// One named section: an ordered, case-sensitive key/value mapping.
pub type Section = IndexMap<String, String>;

/// Errors raised while parsing a document from INI text.
///
/// Parsing is strict: a malformed file is rejected rather than silently
/// read as a partial document, because callers overwrite the file on the
/// next save.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DocumentError {
    #[error("line {0}: key/value pair before any [section] header")]
    MissingSectionHeader(usize),

    #[error("duplicate section [{0}]")]
    DuplicateSection(String),

    #[error("duplicate key '{key}' in section [{section}]")]
    DuplicateKey { section: String, key: String },

    #[error("line {0}: expected 'key = value' or '[section]'")]
    InvalidLine(usize),
}

/// An ordered configuration document: named sections of key/value pairs.
///
/// This is the in-memory unit behind every persisted config file
/// (`Config.ini`, `TomlProfile.ini`, `PoseIDMap.ini`, `KeyMap.ini` and
/// the PoseScaleData rule files). Section order and key order are both
/// insertion order and survive a parse/serialize round-trip; keys are
/// case-sensitive.
///
/// # Related Types
///
/// - [`crate::config::ConfigStore`]: loads/saves documents with
///   encoding fallbacks and write retries
/// - [`crate::history::ContextState`]: holds serialized document text
///   as undo/redo snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    sections: IndexMap<String, Section>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse INI text into a document.
    ///
    /// Accepts `[section]` headers and `key = value` pairs (split on the
    /// first `=`, key and value trimmed). Blank lines and lines starting
    /// with `#` or `;` are ignored. A leading BOM is tolerated.
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut doc = Document::new();
        let mut current: Option<String> = None;

        for (idx, raw_line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw_line.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                let name = line[1..line.len() - 1].trim().to_string();
                if doc.sections.contains_key(&name) {
                    return Err(DocumentError::DuplicateSection(name));
                }
                doc.sections.insert(name.clone(), Section::new());
                current = Some(name);
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(DocumentError::InvalidLine(line_no));
            };

            let Some(section_name) = current.as_ref() else {
                return Err(DocumentError::MissingSectionHeader(line_no));
            };

            let key = key.trim().to_string();
            let value = value.trim().to_string();

            let section = doc
                .sections
                .get_mut(section_name)
                .expect("current section must exist");
            if section.contains_key(&key) {
                return Err(DocumentError::DuplicateKey {
                    section: section_name.clone(),
                    key,
                });
            }
            section.insert(key, value);
        }

        Ok(doc)
    }

    /// Serialize to INI text: `key = value` pairs under each `[section]`
    /// header, one blank line after every section. The output parses back
    /// into an equal document, preserving section and key order.
    pub fn to_ini_string(&self) -> String {
        let mut out = String::new();
        for (name, section) in &self.sections {
            out.push('[');
            out.push_str(name);
            out.push_str("]\n");
            for (key, value) in section {
                out.push_str(key);
                out.push_str(" = ");
                out.push_str(value);
                out.push('\n');
            }
            out.push('\n');
        }
        out
    }

    /// Number of sections.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// True when the document has no sections.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Iterate sections in insertion order.
    pub fn sections(&self) -> impl Iterator<Item = (&str, &Section)> {
        self.sections.iter().map(|(name, s)| (name.as_str(), s))
    }

    /// Section names in insertion order.
    pub fn section_names(&self) -> Vec<String> {
        self.sections.keys().cloned().collect()
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    pub fn section_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.sections.get_mut(name)
    }

    /// Add a new empty section; errors if the name is already taken.
    pub fn add_section(&mut self, name: &str) -> Result<(), DocumentError> {
        if self.sections.contains_key(name) {
            return Err(DocumentError::DuplicateSection(name.to_string()));
        }
        self.sections.insert(name.to_string(), Section::new());
        Ok(())
    }

    /// Get an existing section or create it at the end of the document.
    pub fn ensure_section(&mut self, name: &str) -> &mut Section {
        self.sections.entry(name.to_string()).or_default()
    }

    /// Remove a section, returning its contents if it existed.
    pub fn remove_section(&mut self, name: &str) -> Option<Section> {
        self.sections.shift_remove(name)
    }

    /// Rename a section in place, keeping its position and contents.
    pub fn rename_section(&mut self, old: &str, new: &str) -> Result<(), DocumentError> {
        if old == new {
            return Ok(());
        }
        if self.sections.contains_key(new) {
            return Err(DocumentError::DuplicateSection(new.to_string()));
        }
        if !self.sections.contains_key(old) {
            return Err(DocumentError::MissingSectionHeader(0));
        }
        let rebuilt: IndexMap<String, Section> = self
            .sections
            .drain(..)
            .map(|(name, section)| {
                if name == old {
                    (new.to_string(), section)
                } else {
                    (name, section)
                }
            })
            .collect();
        self.sections = rebuilt;
        Ok(())
    }

    /// Move a section up (`delta < 0`) or down (`delta > 0`) in the
    /// document order. Returns false when the section is missing or the
    /// move would fall off either end.
    pub fn move_section(&mut self, name: &str, delta: isize) -> bool {
        let Some(from) = self.sections.get_index_of(name) else {
            return false;
        };
        let to = from as isize + delta;
        if to < 0 || to as usize >= self.sections.len() {
            return false;
        }
        self.sections.move_index(from, to as usize);
        true
    }

    /// Look up a value.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)?.get(key).map(String::as_str)
    }

    /// Look up a string value with a fallback.
    pub fn get_str(&self, section: &str, key: &str, default: &str) -> String {
        self.get(section, key).unwrap_or(default).to_string()
    }

    /// Look up a boolean value (`true/false`, `yes/no`, `on/off`, `1/0`,
    /// case-insensitive), falling back on missing or unparseable values.
    pub fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        match self.get(section, key) {
            Some(v) => match v.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => true,
                "false" | "no" | "off" | "0" => false,
                _ => default,
            },
            None => default,
        }
    }

    /// Look up an integer value, falling back on missing or unparseable
    /// values.
    pub fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.get(section, key)
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(default)
    }

    /// Set a value, creating the section if needed.
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.ensure_section(section)
            .insert(key.to_string(), value.to_string());
    }

    /// Remove a key from a section, returning the old value.
    pub fn remove_key(&mut self, section: &str, key: &str) -> Option<String> {
        self.sections.get_mut(section)?.shift_remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sections_and_keys_in_order() {
        let text = "[B]\nx = 1\n\n[A]\nz = 3\ny = 2\n";
        let doc = Document::parse(text).unwrap();

        assert_eq!(doc.section_names(), vec!["B", "A"]);
        let a = doc.section("A").unwrap();
        let keys: Vec<&String> = a.keys().collect();
        assert_eq!(keys, vec!["z", "y"]);
        assert_eq!(doc.get("B", "x"), Some("1"));
    }

    #[test]
    fn test_round_trip_preserves_order_and_values() {
        let text = "[PoseScaleSetting_A]\nChara = MIKU\nPoseID = 12\n\n[PoseIDs]\n1 = Standing\n2 = Sitting\n\n";
        let doc = Document::parse(text).unwrap();
        assert_eq!(doc.to_ini_string(), text);
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        let doc = Document::parse("[S]\nKey = a\nkey = b\n").unwrap();
        assert_eq!(doc.get("S", "Key"), Some("a"));
        assert_eq!(doc.get("S", "key"), Some("b"));
    }

    #[test]
    fn test_parse_rejects_orphan_key() {
        let err = Document::parse("x = 1\n").unwrap_err();
        assert_eq!(err, DocumentError::MissingSectionHeader(1));
    }

    #[test]
    fn test_parse_rejects_duplicate_section() {
        let err = Document::parse("[S]\n[S]\n").unwrap_err();
        assert_eq!(err, DocumentError::DuplicateSection("S".to_string()));
    }

    #[test]
    fn test_parse_rejects_duplicate_key() {
        let err = Document::parse("[S]\na = 1\na = 2\n").unwrap_err();
        assert!(matches!(err, DocumentError::DuplicateKey { .. }));
    }

    #[test]
    fn test_parse_ignores_comments_and_bom() {
        let doc = Document::parse("\u{feff}# comment\n; other\n[S]\na = 1\n").unwrap();
        assert_eq!(doc.get("S", "a"), Some("1"));
    }

    #[test]
    fn test_value_may_contain_equals() {
        let doc = Document::parse("[S]\nkey = a=b=c\n").unwrap();
        assert_eq!(doc.get("S", "key"), Some("a=b=c"));
    }

    #[test]
    fn test_rename_section_keeps_position() {
        let mut doc = Document::parse("[A]\n[B]\nk = v\n[C]\n").unwrap();
        doc.rename_section("B", "B2").unwrap();
        assert_eq!(doc.section_names(), vec!["A", "B2", "C"]);
        assert_eq!(doc.get("B2", "k"), Some("v"));
    }

    #[test]
    fn test_rename_section_rejects_existing_target() {
        let mut doc = Document::parse("[A]\n[B]\n").unwrap();
        assert!(doc.rename_section("A", "B").is_err());
    }

    #[test]
    fn test_move_section() {
        let mut doc = Document::parse("[A]\n[B]\n[C]\n").unwrap();
        assert!(doc.move_section("C", -1));
        assert_eq!(doc.section_names(), vec!["A", "C", "B"]);
        assert!(!doc.move_section("A", -1));
    }

    #[test]
    fn test_typed_getters() {
        let doc = Document::parse("[S]\nflag = True\nnum = 42\nbad = maybe\n").unwrap();
        assert!(doc.get_bool("S", "flag", false));
        assert!(!doc.get_bool("S", "missing", false));
        assert!(doc.get_bool("S", "bad", true));
        assert_eq!(doc.get_int("S", "num", 0), 42);
        assert_eq!(doc.get_int("S", "missing", 7), 7);
        assert_eq!(doc.get_str("S", "missing", "d"), "d");
    }
}
