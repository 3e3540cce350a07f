//! Boundary to the Unicode character database and pattern engine.
//!
//! The LGR core never looks at UCD data itself. Scripts, IDNA validity,
//! property sets and regex compilation all go through [`UnicodeDatabase`],
//! so embedders can plug a full database in. [`TableDatabase`] is a small
//! in-memory implementation good enough for tests and simple LGRs.

pub mod set;
pub mod table;

use std::sync::Arc;

use thiserror::Error;

pub use set::PointSet;
pub use table::TableDatabase;

/// Scripts that never restrict mixing: Common, Inherited, Unknown.
pub const NEUTRAL_SCRIPTS: [&str; 3] = ["Zyyy", "Zinh", "Zzzz"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnicodeError {
    #[error("invalid pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("unknown property {0:?}")]
    UnknownProperty(String),

    #[error("pattern evaluation failed: {0}")]
    Match(String),
}

/// A compiled pattern, safe to share across evaluation threads.
pub trait CompiledPattern: Send + Sync {
    /// Search `text` starting at char index `start`.
    ///
    /// Returns the char index where the leftmost match begins. Look-behind
    /// assertions may inspect text before `start`.
    fn search(&self, text: &str, start: usize) -> Result<Option<usize>, UnicodeError>;
}

/// Character database queried by the LGR engine.
pub trait UnicodeDatabase: Send + Sync {
    /// ISO 15924 alpha-4 script code of `cp`, `None` when unknown.
    fn script(&self, cp: u32) -> Option<String>;

    /// Whether `cp` may appear in an IDNA2008 label (PVALID or CONTEXT).
    fn is_idna_valid(&self, cp: u32) -> bool;

    /// Resolve a property expression such as `sc:Latn` or `gc:Mn`.
    fn property_set(&self, name: &str) -> Result<PointSet, UnicodeError>;

    fn compile_regex(&self, pattern: &str) -> Result<Arc<dyn CompiledPattern>, UnicodeError>;

    fn unicode_version(&self) -> &str;

    /// Script of `cp`, falling back to `Zzzz` (Unknown).
    fn script_or_unknown(&self, cp: u32) -> String {
        self.script(cp).unwrap_or_else(|| "Zzzz".to_string())
    }
}
