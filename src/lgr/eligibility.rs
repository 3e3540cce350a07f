//! Label decomposition and the reflexive disposition of a label.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

use super::Lgr;
use crate::action::{self, ActionIndex};
use crate::error::Result;

/// A repertoire entry matched at `index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Part {
    pub index: usize,
    pub cp: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    /// No entry starts with the code point.
    NotInRepertoire,
    /// Entries matched but their context rules rejected them.
    ContextRule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidPart {
    pub index: usize,
    pub cp: u32,
    pub reason: InvalidReason,
}

/// Greedy longest-first split of a label into repertoire entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Decomposition {
    pub parts: Vec<Part>,
    pub invalid: Vec<InvalidPart>,
}

impl Decomposition {
    pub fn is_eligible(&self) -> bool {
        self.invalid.is_empty() && !self.parts.is_empty()
    }
}

/// Everything known about one label, for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EligibilityReport {
    pub label: Vec<u32>,
    pub eligible: bool,
    pub parts: Vec<Part>,
    pub invalid: Vec<InvalidPart>,
    pub types: BTreeSet<String>,
    pub only_variants: bool,
    pub disposition: String,
    /// Action that decided the disposition; `None` for ineligible labels.
    pub action: Option<ActionIndex>,
}

impl Lgr {
    /// Decompose `label` left to right.
    ///
    /// At each position the entries starting with the code point are tried
    /// longest first; the first one that is a prefix of the rest of the
    /// label and whose context rule holds is taken. Positions without such
    /// an entry are recorded and skipped so every problem is reported.
    pub fn preliminary_eligibility(&self, label: &[u32]) -> Result<Decomposition> {
        let mut decomposition = Decomposition::default();
        let mut index = 0;
        while index < label.len() {
            let rest = &label[index..];
            let mut context_failed = false;
            let mut matched = None;
            for entry in self.repertoire.entries_with_prefix(label[index], false) {
                if !rest.starts_with(&entry.cp) {
                    continue;
                }
                if self.context_holds(&entry.context, label, index, &entry.cp)? {
                    matched = Some(entry);
                    break;
                }
                context_failed = true;
            }
            match matched {
                Some(entry) => {
                    decomposition.parts.push(Part {
                        index,
                        cp: entry.cp.clone(),
                    });
                    index += entry.cp.len();
                }
                None => {
                    let reason = if context_failed {
                        InvalidReason::ContextRule
                    } else {
                        InvalidReason::NotInRepertoire
                    };
                    decomposition.invalid.push(InvalidPart {
                        index,
                        cp: label[index],
                        reason,
                    });
                    index += 1;
                }
            }
        }
        debug!(
            parts = decomposition.parts.len(),
            invalid = decomposition.invalid.len(),
            "decomposed label"
        );
        Ok(decomposition)
    }

    /// Types of the reflexive variants in effect for each part, and whether
    /// every part contributed one.
    pub(crate) fn reflexive_types(
        &self,
        label: &[u32],
        decomposition: &Decomposition,
    ) -> Result<(BTreeSet<String>, bool)> {
        let mut types = BTreeSet::new();
        let mut only_variants = true;
        for part in &decomposition.parts {
            let Some(entry) = self.repertoire.get(&part.cp) else {
                only_variants = false;
                continue;
            };
            let mut contributed = false;
            for variant in entry.reflexive_variants() {
                if self.context_holds(&variant.context, label, part.index, &variant.cp)? {
                    contributed = true;
                    if let Some(ty) = &variant.var_type {
                        types.insert(ty.clone());
                    }
                }
            }
            only_variants &= contributed;
        }
        Ok((types, only_variants))
    }

    /// Disposition of an already decomposed, eligible label from its
    /// reflexive variant types.
    pub fn label_disposition(
        &self,
        label: &[u32],
        decomposition: &Decomposition,
    ) -> Result<(String, ActionIndex)> {
        let (types, only_variants) = self.reflexive_types(label, decomposition)?;
        self.apply_actions(label, &types, only_variants)
    }

    pub(crate) fn apply_actions(
        &self,
        label: &[u32],
        types: &BTreeSet<String>,
        only_variants: bool,
    ) -> Result<(String, ActionIndex)> {
        action::evaluate(&self.actions, label, types, only_variants, |rule, label| {
            self.rule_matches(rule, label)
        })
    }

    /// Decompose `label` and, if it is eligible, compute its disposition.
    pub fn test_label_eligible(&self, label: &[u32]) -> Result<EligibilityReport> {
        let decomposition = self.preliminary_eligibility(label)?;
        let eligible = decomposition.is_eligible();
        let (types, only_variants, disposition, action) = if eligible {
            let (types, only_variants) = self.reflexive_types(label, &decomposition)?;
            let (disposition, action) = self.apply_actions(label, &types, only_variants)?;
            (types, only_variants, disposition, Some(action))
        } else {
            (BTreeSet::new(), false, action::INVALID.to_string(), None)
        };
        Ok(EligibilityReport {
            label: label.to_vec(),
            eligible,
            parts: decomposition.parts,
            invalid: decomposition.invalid,
            types,
            only_variants,
            disposition,
            action,
        })
    }
}
