//! Error types for LGR construction and evaluation.

use thiserror::Error;

use crate::cp::format_cps;
use crate::pattern::PatternError;
use crate::unicode::UnicodeError;

pub type Result<T> = std::result::Result<T, LgrError>;

/// Core LGR errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LgrError {
    // Structural conflicts
    #[error("code point {} already exists", format_cps(.0))]
    AlreadyExists(Vec<u32>),

    #[error("variant {} already exists on {}", format_cps(.variant), format_cps(.cp))]
    VariantAlreadyExists { cp: Vec<u32>, variant: Vec<u32> },

    #[error("range {first:04X}..{last:04X} overlaps an existing range")]
    RangeOverlap { first: u32, last: u32 },

    #[error("code point {} not found", format_cps(.0))]
    NotFound(Vec<u32>),

    #[error("variant {} not found on {}", format_cps(.variant), format_cps(.cp))]
    VariantNotFound { cp: Vec<u32>, variant: Vec<u32> },

    #[error("code point {} belongs to range {first:04X}..{last:04X}", format_cps(.cp))]
    RangeMember { cp: Vec<u32>, first: u32, last: u32 },

    // Invalid construction input
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("both when and not-when set on {}", format_cps(.0))]
    ConflictingContext(Vec<u32>),

    #[error("sequence {} cannot carry tags", format_cps(.0))]
    TagOnSequence(Vec<u32>),

    #[error("duplicate tag {tag:?} on {}", format_cps(.cp))]
    DuplicateTag { cp: Vec<u32>, tag: String },

    #[error("duplicate reference {id:?} on {}", format_cps(.cp))]
    DuplicateReference { cp: Vec<u32>, id: String },

    #[error("empty code point sequence")]
    EmptyCodePoints,

    #[error("malformed code point {0:?}")]
    MalformedCodePoint(String),

    // Reference integrity
    #[error("reference {0:?} is not declared")]
    UnknownReference(String),

    #[error("reference {0:?} already exists")]
    ReferenceAlreadyExists(String),

    #[error("rule {0:?} already exists")]
    RuleAlreadyExists(String),

    #[error("class {0:?} already exists")]
    ClassAlreadyExists(String),

    #[error("invalid action: {0}")]
    InvalidAction(String),

    // Unicode validity
    #[error("code point {} is not IDNA valid", format_cps(.0))]
    IdnaInvalid(Vec<u32>),

    #[error("code point {} (script {script}) is outside the LGR scripts", format_cps(.cp))]
    OutOfScript { cp: Vec<u32>, script: String },

    #[error("code point {} is not in the validating repertoire", format_cps(.0))]
    NotInRepertoire(Vec<u32>),

    // Label processing
    #[error("label {} is not eligible", format_cps(.0))]
    NotInLgr(Vec<u32>),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Unicode(#[from] UnicodeError),
}
