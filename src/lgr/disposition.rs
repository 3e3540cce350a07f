//! Dispositions of a label and its variants, and the index label.

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use super::Lgr;
use crate::action::{self, ActionIndex};
use crate::error::{LgrError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelDisposition {
    pub label: Vec<u32>,
    pub disposition: String,
    pub types: BTreeSet<String>,
    pub only_variants: bool,
    /// `None` when the label is not eligible.
    pub action: Option<ActionIndex>,
    pub is_original: bool,
    /// Set on the original when variant enumeration stopped at
    /// `max_variants` and more variants exist.
    pub capped: bool,
}

impl LabelDisposition {
    fn ineligible(label: Vec<u32>, types: BTreeSet<String>, is_original: bool) -> Self {
        Self {
            label,
            disposition: action::INVALID.to_string(),
            types,
            only_variants: false,
            action: None,
            is_original,
            capped: false,
        }
    }
}

/// Disposition of a label plus how many of its variants got each
/// disposition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispositionSummary {
    pub label: Vec<u32>,
    pub disposition: String,
    pub variants: usize,
    pub counts: BTreeMap<String, usize>,
    pub capped: bool,
}

impl Lgr {
    /// Disposition of `label` and of every variant it generates.
    ///
    /// The original label always comes last. An ineligible input yields only
    /// itself with disposition `invalid`. Ineligible variants are dropped
    /// unless `include_invalid` is set. At most `max_variants` variants are
    /// enumerated; when more exist the original has `capped` set.
    pub fn compute_label_disposition(
        &self,
        label: &[u32],
        include_invalid: bool,
        with_mixed_script: bool,
    ) -> Result<Vec<LabelDisposition>> {
        let decomposition = self.preliminary_eligibility(label)?;
        if !decomposition.is_eligible() {
            return Ok(vec![LabelDisposition::ineligible(
                label.to_vec(),
                BTreeSet::new(),
                true,
            )]);
        }

        let max = self.config.max_variants;
        let estimate = self.estimate_variant_number(label, with_mixed_script)?;
        if estimate > max {
            warn!(estimate, max, "variant estimate above the limit, enumeration is capped");
        } else {
            debug!(estimate, "computing variant dispositions");
        }

        let mut out = Vec::new();
        let mut produced = 0u64;
        let mut capped = false;
        for variant in self.generate_label_variants(label, with_mixed_script) {
            let variant = variant?;
            if produced == max {
                capped = true;
                break;
            }
            produced += 1;
            if !self.preliminary_eligibility(&variant.cp)?.is_eligible() {
                if include_invalid {
                    out.push(LabelDisposition::ineligible(variant.cp, variant.types, false));
                }
                continue;
            }
            let (disposition, action) =
                self.apply_actions(&variant.cp, &variant.types, variant.only_variants)?;
            out.push(LabelDisposition {
                label: variant.cp,
                disposition,
                types: variant.types,
                only_variants: variant.only_variants,
                action: Some(action),
                is_original: false,
                capped: false,
            });
        }

        let (types, only_variants) = self.reflexive_types(label, &decomposition)?;
        let (disposition, action) = self.apply_actions(label, &types, only_variants)?;
        out.push(LabelDisposition {
            label: label.to_vec(),
            disposition,
            types,
            only_variants,
            action: Some(action),
            is_original: true,
            capped,
        });
        Ok(out)
    }

    pub fn compute_label_disposition_summary(
        &self,
        label: &[u32],
        include_invalid: bool,
        with_mixed_script: bool,
    ) -> Result<DispositionSummary> {
        let mut all = self.compute_label_disposition(label, include_invalid, with_mixed_script)?;
        // The original label is always present, last.
        let original = all
            .pop()
            .ok_or_else(|| LgrError::NotInLgr(label.to_vec()))?;
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for variant in &all {
            *counts.entry(variant.disposition.clone()).or_default() += 1;
        }
        Ok(DispositionSummary {
            label: original.label,
            disposition: original.disposition,
            variants: all.len(),
            counts,
            capped: original.capped,
        })
    }

    /// [`Lgr::compute_label_disposition`] over many labels on the rayon
    /// thread pool. Results are in input order.
    pub fn compute_label_dispositions(
        &self,
        labels: &[Vec<u32>],
        include_invalid: bool,
        with_mixed_script: bool,
    ) -> Vec<Result<Vec<LabelDisposition>>> {
        labels
            .par_iter()
            .map(|label| self.compute_label_disposition(label, include_invalid, with_mixed_script))
            .collect()
    }

    /// Canonical key of a label's variant set: each part is replaced by the
    /// smallest code point sequence among the entry and its variants.
    pub fn generate_index_label(&self, label: &[u32]) -> Result<Vec<u32>> {
        let decomposition = self.preliminary_eligibility(label)?;
        if !decomposition.is_eligible() {
            return Err(LgrError::NotInLgr(label.to_vec()));
        }
        let mut index = Vec::with_capacity(label.len());
        for part in &decomposition.parts {
            let entry = self
                .repertoire
                .get(&part.cp)
                .ok_or_else(|| LgrError::NotFound(part.cp.clone()))?;
            let smallest = entry
                .variants()
                .iter()
                .map(|v| v.cp.as_slice())
                .fold(entry.cp.as_slice(), |min, cp| cp.min(min));
            index.extend_from_slice(smallest);
        }
        Ok(index)
    }
}
