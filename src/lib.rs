//! Label Generation Rules (RFC 7940) engine.
//!
//! An [`Lgr`] holds a repertoire of code points and sequences, their
//! variants, context rules and disposition actions. Given a label it
//! decides eligibility, enumerates variant labels lazily, assigns each a
//! disposition and computes the index label shared by a variant set.

pub mod action;
pub mod closure;
pub mod config;
pub mod cp;
pub mod diagnostic;
pub mod error;
pub mod lgr;
pub mod pattern;
pub mod repertoire;
pub mod unicode;

#[cfg(test)]
pub mod testutil;

pub use action::{Action, ActionIndex, RuleCondition, VariantCondition};
pub use closure::PopulateReport;
pub use config::{LgrConfig, Policy, load_config};
pub use diagnostic::{Check, Diagnostic, Severity};
pub use error::{LgrError, Result};
pub use lgr::{
    AddOptions, Decomposition, DispositionSummary, EligibilityReport, EntryInput, GeneratedVariant,
    LabelDisposition, Lgr, Metadata, RangeInput, Reference, VariantInput,
};
pub use repertoire::{CodePointEntry, Context, RangeDecl, Repertoire, Variant};
pub use unicode::{PointSet, TableDatabase, UnicodeDatabase};
