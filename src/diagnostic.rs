use std::fmt;

use serde::Serialize;

use crate::cp::format_cps;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn letter(&self) -> char {
        match self {
            Severity::Warning => 'W',
            Severity::Error => 'E',
        }
    }

    pub fn from_str(s: &str) -> Option<Severity> {
        match s.to_lowercase().as_str() {
            "warning" => Some(Severity::Warning),
            "error" => Some(Severity::Error),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Kind of consistency finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Check {
    /// `target` is not declared in the repertoire.
    MissingTarget,
    /// No reverse edge `target -> source`.
    Symmetry,
    /// The reverse edge exists but under another context rule.
    ContextMismatch,
    /// `source -> x -> target` without `source -> target`.
    Transitivity,
    /// A context or action rule name is not declared.
    UndefinedRule,
    /// A class name used by a rule or another class is not declared.
    UndefinedClass,
}

impl Check {
    pub fn name(&self) -> &'static str {
        match self {
            Check::MissingTarget => "missing-target",
            Check::Symmetry => "symmetry",
            Check::ContextMismatch => "context-mismatch",
            Check::Transitivity => "transitivity",
            Check::UndefinedRule => "undefined-rule",
            Check::UndefinedClass => "undefined-class",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub check: Check,
    pub source: Vec<u32>,
    /// Empty when the finding is about `source` alone.
    pub target: Vec<u32>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        check: Check,
        source: &[u32],
        target: &[u32],
        message: String,
    ) -> Self {
        Self {
            severity,
            check,
            source: source.to_vec(),
            target: target.to_vec(),
            message,
        }
    }

    pub fn sort_key(&self) -> (&[u32], &[u32], Check) {
        (&self.source, &self.target, self.check)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.target.is_empty() {
            write!(
                f,
                "{}: {}: {}: {}",
                format_cps(&self.source),
                self.severity,
                self.check.name(),
                self.message,
            )
        } else {
            write!(
                f,
                "{} -> {}: {}: {}: {}",
                format_cps(&self.source),
                format_cps(&self.target),
                self.severity,
                self.check.name(),
                self.message,
            )
        }
    }
}
