//! Class and rule compilation.
//!
//! Classes compile to [`PointSet`]s, rules compile to pattern text in the
//! regex dialect understood by the [`UnicodeDatabase`] collaborator. Both
//! trees are closed enums; `validate` is a separate pass run at registration
//! time and `compile`/`pattern` resolve named references through a borrowed
//! [`CompileContext`].

pub mod class;
pub mod matcher;
pub mod rule;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use thiserror::Error;

use crate::cp::is_invalid_scalar;
use crate::unicode::{CompiledPattern, PointSet, UnicodeDatabase, UnicodeError};

pub use class::{Class, ClassExpr, SetOp};
pub use matcher::{Count, Matcher, RuleRef};
pub use rule::Rule;

/// Stand-in for the code points under test, replaced before compiling.
pub const ANCHOR_PLACEHOLDER: &str = "{ANCHOR}";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("rule {0:?} is not defined")]
    UndefinedRule(String),

    #[error("class {0:?} is not defined")]
    UndefinedClass(String),

    #[error("cyclic reference through {0:?}")]
    CyclicReference(String),

    #[error("invalid definition: {0}")]
    Validation(String),

    #[error("rule {0:?} compiles to an empty pattern")]
    EmptyPattern(String),

    #[error("rule {0:?} contains an anchor but is not used as a context rule")]
    AnchorOutsideContext(String),

    #[error(transparent)]
    Unicode(#[from] UnicodeError),
}

/// Lookup tables for compilation. Borrowed, never mutated.
#[derive(Clone, Copy)]
pub struct CompileContext<'a> {
    pub rules: &'a BTreeMap<String, Rule>,
    pub classes: &'a BTreeMap<String, Class>,
    /// Tag name to the code points carrying it.
    pub tags: &'a BTreeMap<String, PointSet>,
    pub db: &'a dyn UnicodeDatabase,
}

/// Names currently being expanded, to reject reference cycles.
#[derive(Default)]
pub(crate) struct Expansion {
    stack: Vec<String>,
}

impl Expansion {
    pub(crate) fn enter(&mut self, name: &str) -> Result<(), PatternError> {
        if self.stack.iter().any(|n| n == name) {
            return Err(PatternError::CyclicReference(name.to_string()));
        }
        self.stack.push(name.to_string());
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.stack.pop();
    }
}

/// Compiled patterns keyed by their final text.
///
/// Anchor substitution yields a distinct text per anchor, so one rule can
/// occupy several slots. The owner clears the cache whenever rules, classes
/// or tags change.
#[derive(Default)]
pub struct PatternCache {
    compiled: RwLock<HashMap<String, Arc<dyn CompiledPattern>>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compile(
        &self,
        db: &dyn UnicodeDatabase,
        text: &str,
    ) -> Result<Arc<dyn CompiledPattern>, PatternError> {
        if let Ok(map) = self.compiled.read() {
            if let Some(pattern) = map.get(text) {
                return Ok(Arc::clone(pattern));
            }
        }
        let pattern = db.compile_regex(text)?;
        if let Ok(mut map) = self.compiled.write() {
            map.insert(text.to_string(), Arc::clone(&pattern));
        }
        Ok(pattern)
    }

    pub fn clear(&self) {
        if let Ok(mut map) = self.compiled.write() {
            map.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.compiled.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pattern text for a literal code point sequence.
///
/// Values that are not scalars render as U+FFFD, the same way labels are
/// rendered for matching.
pub fn literal(cps: &[u32]) -> String {
    let replacement = u32::from(char::REPLACEMENT_CHARACTER);
    cps.iter()
        .map(|&cp| if is_invalid_scalar(cp) { replacement } else { cp })
        .map(|cp| format!("\\x{{{cp:X}}}"))
        .collect()
}
