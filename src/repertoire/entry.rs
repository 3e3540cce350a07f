use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::error::{LgrError, Result};

/// Context-rule condition attached to an entry or a variant.
///
/// `when` and `not-when` are mutually exclusive, which the enum encodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Context {
    #[default]
    Always,
    When(String),
    NotWhen(String),
}

impl Context {
    /// Combine loader attributes, rejecting the case where both are set.
    pub fn from_parts(
        cp: &[u32],
        when: Option<String>,
        not_when: Option<String>,
    ) -> Result<Context> {
        match (when, not_when) {
            (Some(_), Some(_)) => Err(LgrError::ConflictingContext(cp.to_vec())),
            (Some(rule), None) => Ok(Context::When(rule)),
            (None, Some(rule)) => Ok(Context::NotWhen(rule)),
            (None, None) => Ok(Context::Always),
        }
    }

    pub fn when(&self) -> Option<&str> {
        match self {
            Context::When(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn not_when(&self) -> Option<&str> {
        match self {
            Context::NotWhen(rule) => Some(rule),
            _ => None,
        }
    }

    /// Name of the rule involved, whichever polarity.
    pub fn rule(&self) -> Option<&str> {
        match self {
            Context::When(rule) | Context::NotWhen(rule) => Some(rule),
            Context::Always => None,
        }
    }

    pub fn is_always(&self) -> bool {
        matches!(self, Context::Always)
    }
}

/// Directed variant edge owned by its source entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variant {
    pub cp: Vec<u32>,
    #[serde(rename = "type")]
    pub var_type: Option<String>,
    pub context: Context,
    pub comment: Option<String>,
    pub references: Vec<String>,
}

impl Variant {
    pub fn new(cp: Vec<u32>, var_type: Option<&str>) -> Self {
        Self {
            cp,
            var_type: var_type.map(String::from),
            context: Context::Always,
            comment: None,
            references: Vec::new(),
        }
    }
}

/// A code point, a sequence, or the member of a declared range.
///
/// Entries compare and hash by their code points only.
#[derive(Debug, Clone, Serialize)]
pub struct CodePointEntry {
    pub cp: Vec<u32>,
    pub comment: Option<String>,
    pub tags: Vec<String>,
    pub references: Vec<String>,
    pub context: Context,
    /// Bounds of the declared range this entry belongs to.
    pub range: Option<(u32, u32)>,
    pub(crate) variants: Vec<Variant>,
}

impl CodePointEntry {
    pub fn new(cp: Vec<u32>) -> Self {
        Self {
            cp,
            comment: None,
            tags: Vec::new(),
            references: Vec::new(),
            context: Context::Always,
            range: None,
            variants: Vec::new(),
        }
    }

    pub fn first_cp(&self) -> u32 {
        self.cp[0]
    }

    pub fn is_sequence(&self) -> bool {
        self.cp.len() > 1
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    pub fn has_variants(&self) -> bool {
        !self.variants.is_empty()
    }

    /// Variants mapping the entry onto itself.
    pub fn reflexive_variants(&self) -> impl Iterator<Item = &Variant> {
        self.variants.iter().filter(|v| v.cp == self.cp)
    }

    pub fn has_reflexive(&self) -> bool {
        self.reflexive_variants().next().is_some()
    }

    pub fn non_reflexive_count(&self) -> usize {
        self.variants.iter().filter(|v| v.cp != self.cp).count()
    }

    pub fn find_variant(&self, cp: &[u32], context: &Context) -> Option<&Variant> {
        self.variants
            .iter()
            .find(|v| v.cp.as_slice() == cp && &v.context == context)
    }

    /// Whether any variant, whatever its context rule, targets `cp`.
    pub fn has_variant_to(&self, cp: &[u32]) -> bool {
        self.variants.iter().any(|v| v.cp.as_slice() == cp)
    }
}

impl PartialEq for CodePointEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cp == other.cp
    }
}

impl Eq for CodePointEntry {}

impl Hash for CodePointEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cp.hash(state);
    }
}

/// A declared range, expanded into one entry per code point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeDecl {
    pub first: u32,
    pub last: u32,
    pub comment: Option<String>,
    pub tags: Vec<String>,
    pub references: Vec<String>,
    pub context: Context,
}

impl RangeDecl {
    pub fn new(first: u32, last: u32) -> Self {
        Self {
            first,
            last,
            comment: None,
            tags: Vec::new(),
            references: Vec::new(),
            context: Context::Always,
        }
    }

    pub fn contains(&self, cp: u32) -> bool {
        self.first <= cp && cp <= self.last
    }

    pub fn overlaps(&self, first: u32, last: u32) -> bool {
        self.first <= last && first <= self.last
    }

    /// The entry every member of the range shares.
    pub(crate) fn member(&self, cp: u32) -> CodePointEntry {
        CodePointEntry {
            cp: vec![cp],
            comment: self.comment.clone(),
            tags: self.tags.clone(),
            references: self.references.clone(),
            context: self.context.clone(),
            range: Some((self.first, self.last)),
            variants: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_exclusivity() {
        assert_eq!(
            Context::from_parts(&[0x61], Some("a".into()), Some("b".into())),
            Err(LgrError::ConflictingContext(vec![0x61]))
        );
        assert_eq!(
            Context::from_parts(&[0x61], None, Some("b".into())).unwrap(),
            Context::NotWhen("b".into())
        );
        assert_eq!(Context::When("r".into()).rule(), Some("r"));
        assert!(Context::from_parts(&[0x61], None, None).unwrap().is_always());
    }

    #[test]
    fn entries_compare_by_code_points() {
        let mut a = CodePointEntry::new(vec![0x61]);
        let b = CodePointEntry::new(vec![0x61]);
        a.comment = Some("different".into());
        assert_eq!(a, b);
    }

    #[test]
    fn reflexive_detection() {
        let mut e = CodePointEntry::new(vec![0x61]);
        e.variants.push(Variant::new(vec![0x61], Some("allocatable")));
        e.variants.push(Variant::new(vec![0x62], Some("blocked")));
        assert!(e.has_reflexive());
        assert_eq!(e.non_reflexive_count(), 1);
        assert!(e.has_variant_to(&[0x62]));
        assert!(e.find_variant(&[0x62], &Context::When("x".into())).is_none());
    }

    #[test]
    fn range_bounds() {
        let r = RangeDecl::new(0x41, 0x45);
        assert!(r.contains(0x43));
        assert!(r.overlaps(0x45, 0x50));
        assert!(!r.overlaps(0x46, 0x50));
        let m = r.member(0x42);
        assert_eq!(m.range, Some((0x41, 0x45)));
    }
}
