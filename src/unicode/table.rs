//! In-memory [`UnicodeDatabase`] backed by static tables and `fancy_regex`.

use std::collections::HashMap;
use std::sync::Arc;

use super::{CompiledPattern, PointSet, UnicodeDatabase, UnicodeError};

/// Block-level script assignments. Sorted and non-overlapping.
static BUILTIN_SCRIPTS: &[(u32, u32, &str)] = &[
    (0x0000, 0x0040, "Zyyy"),
    (0x0041, 0x005A, "Latn"),
    (0x005B, 0x0060, "Zyyy"),
    (0x0061, 0x007A, "Latn"),
    (0x007B, 0x00BF, "Zyyy"),
    (0x00C0, 0x024F, "Latn"),
    (0x0300, 0x036F, "Zinh"),
    (0x0370, 0x03FF, "Grek"),
    (0x0400, 0x052F, "Cyrl"),
    (0x0530, 0x058F, "Armn"),
    (0x0590, 0x05FF, "Hebr"),
    (0x0600, 0x06FF, "Arab"),
    (0x0900, 0x097F, "Deva"),
    (0x0E00, 0x0E7F, "Thai"),
    (0x10A0, 0x10FF, "Geor"),
    (0x1100, 0x11FF, "Hang"),
    (0x1E00, 0x1EFF, "Latn"),
    (0x1F00, 0x1FFF, "Grek"),
    (0x3005, 0x3007, "Hani"),
    (0x3040, 0x309F, "Hira"),
    (0x30A0, 0x30FF, "Kana"),
    (0x3130, 0x318F, "Hang"),
    (0x3400, 0x4DBF, "Hani"),
    (0x4E00, 0x9FFF, "Hani"),
    (0xAC00, 0xD7AF, "Hang"),
    (0xF900, 0xFAFF, "Hani"),
    (0x20000, 0x2A6DF, "Hani"),
];

const DEFAULT_VERSION: &str = "15.1.0";

/// Table driven database.
///
/// Script overrides registered with [`TableDatabase::with_script`] take
/// precedence over the builtin table.
pub struct TableDatabase {
    version: String,
    overrides: Vec<(u32, u32, String)>,
    properties: HashMap<String, PointSet>,
    idna_invalid: PointSet,
}

impl Default for TableDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl TableDatabase {
    pub fn new() -> Self {
        // Upper case and non-LDH ASCII, surrogates, the BMP noncharacters.
        let mut idna_invalid = PointSet::from_ranges([
            (0x0000, 0x002C),
            (0x002E, 0x002F),
            (0x003A, 0x0060),
            (0x007B, 0x007F),
            (0xD800, 0xDFFF),
            (0xFFFE, 0xFFFF),
        ]);
        idna_invalid.insert_range(0x0080, 0x00A0);
        Self {
            version: DEFAULT_VERSION.to_string(),
            overrides: Vec::new(),
            properties: HashMap::new(),
            idna_invalid,
        }
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn with_script(mut self, first: u32, last: u32, script: &str) -> Self {
        self.overrides.push((first, last, script.to_string()));
        self
    }

    /// Register a named property set, e.g. `gc:Mn`.
    pub fn with_property(mut self, name: &str, set: PointSet) -> Self {
        self.properties.insert(name.to_string(), set);
        self
    }

    pub fn with_idna_invalid(mut self, set: PointSet) -> Self {
        self.idna_invalid = self.idna_invalid.union(&set);
        self
    }

    fn script_set(&self, script: &str) -> PointSet {
        let builtin = PointSet::from_ranges(
            BUILTIN_SCRIPTS
                .iter()
                .filter(|(_, _, s)| *s == script)
                .map(|&(lo, hi, _)| (lo, hi)),
        );
        let mut taken = PointSet::new();
        let mut own = PointSet::new();
        for (lo, hi, s) in &self.overrides {
            taken.insert_range(*lo, *hi);
            if s == script {
                own.insert_range(*lo, *hi);
            }
        }
        builtin.difference(&taken).union(&own)
    }
}

impl UnicodeDatabase for TableDatabase {
    fn script(&self, cp: u32) -> Option<String> {
        // Later overrides win.
        if let Some((_, _, script)) = self
            .overrides
            .iter()
            .rev()
            .find(|(lo, hi, _)| *lo <= cp && cp <= *hi)
        {
            return Some(script.clone());
        }
        let idx = BUILTIN_SCRIPTS.partition_point(|&(_, hi, _)| hi < cp);
        BUILTIN_SCRIPTS
            .get(idx)
            .filter(|(lo, _, _)| *lo <= cp)
            .map(|(_, _, script)| script.to_string())
    }

    fn is_idna_valid(&self, cp: u32) -> bool {
        !self.idna_invalid.contains(cp) && char::from_u32(cp).is_some()
    }

    fn property_set(&self, name: &str) -> Result<PointSet, UnicodeError> {
        if let Some(set) = self.properties.get(name) {
            return Ok(set.clone());
        }
        let script = name
            .strip_prefix("sc:")
            .or_else(|| name.strip_prefix("script:"));
        match script {
            Some(script) if script.len() == 4 => Ok(self.script_set(script)),
            _ => Err(UnicodeError::UnknownProperty(name.to_string())),
        }
    }

    fn compile_regex(&self, pattern: &str) -> Result<Arc<dyn CompiledPattern>, UnicodeError> {
        let regex = fancy_regex::Regex::new(pattern).map_err(|e| UnicodeError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Arc::new(FancyPattern { regex }))
    }

    fn unicode_version(&self) -> &str {
        &self.version
    }
}

struct FancyPattern {
    regex: fancy_regex::Regex,
}

impl CompiledPattern for FancyPattern {
    fn search(&self, text: &str, start: usize) -> Result<Option<usize>, UnicodeError> {
        let byte_start = text
            .char_indices()
            .nth(start)
            .map(|(offset, _)| offset)
            .unwrap_or(text.len());
        let found = self
            .regex
            .find_from_pos(text, byte_start)
            .map_err(|e| UnicodeError::Match(e.to_string()))?;
        Ok(found.map(|m| text[..m.start()].chars().count()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_scripts() {
        let db = TableDatabase::new();
        assert_eq!(db.script(0x61).as_deref(), Some("Latn"));
        assert_eq!(db.script(0x30).as_deref(), Some("Zyyy"));
        assert_eq!(db.script(0x4E00).as_deref(), Some("Hani"));
        assert_eq!(db.script(0x30A2).as_deref(), Some("Kana"));
        assert_eq!(db.script(0x0250), None);
        assert_eq!(db.script_or_unknown(0x0250), "Zzzz");
    }

    #[test]
    fn overrides_take_precedence() {
        let db = TableDatabase::new().with_script(0x61, 0x62, "Grek");
        assert_eq!(db.script(0x61).as_deref(), Some("Grek"));
        let latin = db.property_set("sc:Latn").unwrap();
        assert!(!latin.contains(0x61));
        assert!(latin.contains(0x63));
        assert!(db.property_set("sc:Grek").unwrap().contains(0x62));
    }

    #[test]
    fn idna_validity() {
        let db = TableDatabase::new();
        assert!(db.is_idna_valid(0x61));
        assert!(db.is_idna_valid(0x2D));
        assert!(db.is_idna_valid(0x30));
        assert!(!db.is_idna_valid(0x41));
        assert!(!db.is_idna_valid(0x20));
        assert!(!db.is_idna_valid(0xD800));
    }

    #[test]
    fn properties() {
        let marks = PointSet::from_range(0x300, 0x36F);
        let db = TableDatabase::new().with_property("gc:Mn", marks.clone());
        assert_eq!(db.property_set("gc:Mn").unwrap(), marks);
        assert!(matches!(
            db.property_set("gc:Lu"),
            Err(UnicodeError::UnknownProperty(_))
        ));
    }

    #[test]
    fn search_uses_char_indices_and_lookbehind() {
        let db = TableDatabase::new();
        let pattern = db.compile_regex(r"(?<=\x{E9})\x{62}").unwrap();
        assert_eq!(pattern.search("a\u{e9}b", 0).unwrap(), Some(2));
        assert_eq!(pattern.search("a\u{e9}b", 2).unwrap(), Some(2));
        assert_eq!(pattern.search("abb", 0).unwrap(), None);
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let db = TableDatabase::new();
        assert!(matches!(
            db.compile_regex("(?:"),
            Err(UnicodeError::InvalidPattern { .. })
        ));
    }
}
