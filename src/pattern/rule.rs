//! Named rules: validation, pattern text and evaluation against a label.

use super::matcher::{Matcher, sequence};
use super::{ANCHOR_PLACEHOLDER, CompileContext, Expansion, PatternCache, PatternError, literal};
use crate::cp::cps_to_string;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub name: String,
    pub comment: Option<String>,
    pub references: Vec<String>,
    pub matchers: Vec<Matcher>,
}

impl Rule {
    pub fn new(name: &str, matchers: Vec<Matcher>) -> Self {
        Self {
            name: name.to_string(),
            comment: None,
            references: Vec::new(),
            matchers,
        }
    }

    /// Structural checks: names present, look-behind only first, look-ahead
    /// only last, at most one anchor outside look-arounds.
    pub fn validate(&self) -> Result<(), PatternError> {
        if self.name.trim().is_empty() {
            return Err(PatternError::Validation(
                "rule declaration without a name".to_string(),
            ));
        }
        let last = self.matchers.len().saturating_sub(1);
        for (idx, m) in self.matchers.iter().enumerate() {
            match m {
                Matcher::LookBehind(_) if idx != 0 => {
                    return Err(PatternError::Validation(format!(
                        "rule {:?}: look-behind must be the first matcher",
                        self.name
                    )));
                }
                Matcher::LookAhead(_) if idx != last => {
                    return Err(PatternError::Validation(format!(
                        "rule {:?}: look-ahead must be the last matcher",
                        self.name
                    )));
                }
                _ => {}
            }
        }
        let mut anchors = 0;
        for m in &self.matchers {
            m.validate(&mut anchors, false)?;
        }
        if anchors > 1 {
            return Err(PatternError::Validation(format!(
                "rule {:?} has {anchors} anchors",
                self.name
            )));
        }
        Ok(())
    }

    /// Pattern text with the anchor placeholder left in place.
    pub fn pattern(&self, ctx: &CompileContext<'_>) -> Result<String, PatternError> {
        let mut exp = Expansion::default();
        exp.enter(&self.name)?;
        let text = sequence(&self.matchers, ctx, &mut exp)?;
        if text.is_empty() {
            return Err(PatternError::EmptyPattern(self.name.clone()));
        }
        Ok(text)
    }

    /// Evaluate the rule against `label`.
    ///
    /// With `anchor = Some((index, cps))` the rule is a context rule for the
    /// code points `cps` found at `index`: an anchored pattern must match
    /// starting exactly at `index`, an unanchored one anywhere in the label.
    /// Without an anchor the pattern must not contain one.
    pub fn matches(
        &self,
        label: &[u32],
        anchor: Option<(usize, &[u32])>,
        ctx: &CompileContext<'_>,
        cache: &PatternCache,
    ) -> Result<bool, PatternError> {
        let text = self.pattern(ctx)?;
        let anchored = text.contains(ANCHOR_PLACEHOLDER);
        let haystack = cps_to_string(label);
        match anchor {
            Some((index, cps)) if anchored => {
                let text = text.replace(ANCHOR_PLACEHOLDER, &literal(cps));
                let compiled = cache.get_or_compile(ctx.db, &text)?;
                Ok(compiled.search(&haystack, index)? == Some(index))
            }
            None if anchored => Err(PatternError::AnchorOutsideContext(self.name.clone())),
            _ => {
                let compiled = cache.get_or_compile(ctx.db, &text)?;
                Ok(compiled.search(&haystack, 0)?.is_some())
            }
        }
    }
}
