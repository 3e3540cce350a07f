//! Lazy enumeration of the variant labels of a label.
//!
//! The permutation tree is walked depth first with an explicit stack: each
//! frame holds the candidate choices for one position of the label and the
//! index of the next one to try. Frames are built on demand, so a consumer
//! that stops early never pays for the rest of the tree.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;
use tracing::debug;

use super::Lgr;
use crate::error::{LgrError, Result};
use crate::repertoire::CodePointEntry;

/// One generated variant label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedVariant {
    pub cp: Vec<u32>,
    /// Union of the types of the variants substituted into the label.
    pub types: BTreeSet<String>,
    /// Every position was replaced through a variant mapping.
    pub only_variants: bool,
}

struct Choice {
    cps: Vec<u32>,
    /// Position in the input label right after the replaced entry.
    end: usize,
    types: BTreeSet<String>,
    is_variant: bool,
}

struct Frame {
    prefix_len: usize,
    choices: Vec<Choice>,
    next: usize,
}

impl Frame {
    fn chosen(&self) -> Option<&Choice> {
        self.next.checked_sub(1).and_then(|i| self.choices.get(i))
    }
}

/// Scripts allowed in one enumeration pass; `None` lets everything through.
type Pass = Option<BTreeSet<String>>;

pub struct VariantIter<'a> {
    lgr: &'a Lgr,
    label: Vec<u32>,
    passes: Vec<Pass>,
    pass: usize,
    started: bool,
    done: bool,
    stack: Vec<Frame>,
    prefix: Vec<u32>,
    /// Labels already yielded, across passes.
    seen: HashSet<Vec<u32>>,
}

impl<'a> VariantIter<'a> {
    fn new(lgr: &'a Lgr, label: &[u32], passes: Vec<Pass>) -> Self {
        Self {
            lgr,
            label: label.to_vec(),
            passes,
            pass: 0,
            started: false,
            done: label.is_empty(),
            stack: Vec::new(),
            prefix: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn allowed(&self, cps: &[u32]) -> bool {
        match self.passes.get(self.pass) {
            Some(Some(scripts)) => cps
                .iter()
                .all(|&cp| scripts.contains(&self.lgr.db.script_or_unknown(cp))),
            _ => true,
        }
    }

    /// Candidate choices at `pos`, with `self.prefix` holding the label
    /// built so far.
    fn frame_at(&self, pos: usize) -> Result<Frame> {
        let lgr = self.lgr;
        let rest = &self.label[pos..];
        let index = self.prefix.len();
        let mut current = self.prefix.clone();
        current.extend_from_slice(rest);

        let mut anchors: Vec<&CodePointEntry> = Vec::new();
        let mut fallback = None;
        for entry in lgr.repertoire.entries_with_prefix(self.label[pos], false) {
            if !rest.starts_with(&entry.cp) {
                continue;
            }
            if !lgr.context_holds(&entry.context, &current, index, &entry.cp)? {
                continue;
            }
            if entry.has_variants() {
                anchors.push(entry);
            } else if fallback.is_none() {
                fallback = Some(entry);
            }
        }

        let mut choices: Vec<Choice> = Vec::new();
        if anchors.is_empty() {
            // An unknown code point is carried through unchanged.
            let cps = fallback.map_or_else(|| vec![self.label[pos]], |e| e.cp.clone());
            if self.allowed(&cps) {
                choices.push(Choice {
                    end: pos + cps.len(),
                    cps,
                    types: BTreeSet::new(),
                    is_variant: false,
                });
            }
        }
        for entry in anchors {
            let end = pos + entry.cp.len();
            let suffix = &self.label[end..];
            if !entry.has_reflexive() && self.allowed(&entry.cp) {
                push_choice(&mut choices, entry.cp.clone(), end, None, false);
            }
            for variant in entry.variants() {
                if !self.allowed(&variant.cp) {
                    continue;
                }
                let mut candidate = self.prefix.clone();
                candidate.extend_from_slice(&variant.cp);
                candidate.extend_from_slice(suffix);
                if lgr.context_holds(&variant.context, &candidate, index, &variant.cp)? {
                    let var_type = variant.var_type.as_deref();
                    push_choice(&mut choices, variant.cp.clone(), end, var_type, true);
                }
            }
        }
        Ok(Frame {
            prefix_len: index,
            choices,
            next: 0,
        })
    }

    fn leaf(&self) -> GeneratedVariant {
        let mut types = BTreeSet::new();
        let mut only_variants = true;
        for choice in self.stack.iter().filter_map(Frame::chosen) {
            types.extend(choice.types.iter().cloned());
            only_variants &= choice.is_variant;
        }
        GeneratedVariant {
            cp: self.prefix.clone(),
            types,
            only_variants,
        }
    }

    fn fail(&mut self, err: LgrError) -> Option<Result<GeneratedVariant>> {
        self.done = true;
        self.stack.clear();
        Some(Err(err))
    }
}

/// Add a choice, merging with an identical replacement reached through
/// another variant.
fn push_choice(
    choices: &mut Vec<Choice>,
    cps: Vec<u32>,
    end: usize,
    var_type: Option<&str>,
    is_variant: bool,
) {
    let idx = match choices.iter().position(|c| c.cps == cps && c.end == end) {
        Some(idx) => idx,
        None => {
            choices.push(Choice {
                cps,
                end,
                types: BTreeSet::new(),
                is_variant: false,
            });
            choices.len() - 1
        }
    };
    let choice = &mut choices[idx];
    choice.is_variant |= is_variant;
    if let Some(ty) = var_type {
        choice.types.insert(ty.to_string());
    }
}

impl Iterator for VariantIter<'_> {
    type Item = Result<GeneratedVariant>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            let Some(top) = self.stack.last_mut() else {
                if self.started {
                    self.pass += 1;
                }
                self.started = true;
                if self.pass >= self.passes.len() {
                    self.done = true;
                    return None;
                }
                debug!(pass = self.pass, "starting variant pass");
                self.prefix.clear();
                match self.frame_at(0) {
                    Ok(frame) => self.stack.push(frame),
                    Err(err) => return self.fail(err),
                }
                continue;
            };
            let Some(choice) = top.choices.get(top.next) else {
                self.stack.pop();
                continue;
            };
            let end = choice.end;
            self.prefix.truncate(top.prefix_len);
            self.prefix.extend_from_slice(&choice.cps);
            top.next += 1;

            if end == self.label.len() {
                if self.prefix != self.label && self.seen.insert(self.prefix.clone()) {
                    return Some(Ok(self.leaf()));
                }
                continue;
            }
            match self.frame_at(end) {
                Ok(frame) => self.stack.push(frame),
                Err(err) => return self.fail(err),
            }
        }
    }
}

impl Lgr {
    /// Variant labels of `label`, lazily. The label itself is never yielded.
    ///
    /// With `with_mixed_script`, a first pass keeps only variants within the
    /// (enlarged) scripts of the label, then one pass per foreign script met
    /// among the variants surfaces labels written in that script alone.
    pub fn generate_label_variants(
        &self,
        label: &[u32],
        with_mixed_script: bool,
    ) -> VariantIter<'_> {
        let passes = if with_mixed_script {
            self.script_passes(label)
        } else {
            vec![None]
        };
        VariantIter::new(self, label, passes)
    }

    fn script_passes(&self, label: &[u32]) -> Vec<Pass> {
        let neutral: BTreeSet<String> = self.config.neutral_scripts.iter().cloned().collect();
        let label_scripts: BTreeSet<String> = label
            .iter()
            .map(|&cp| self.db.script_or_unknown(cp))
            .filter(|s| !self.config.is_neutral_script(s))
            .collect();
        let base: BTreeSet<String> = self
            .config
            .enlarge_scripts(&label_scripts)
            .union(&neutral)
            .cloned()
            .collect();

        let mut foreign = BTreeSet::new();
        for (pos, &first) in label.iter().enumerate() {
            for entry in self.repertoire.entries_with_prefix(first, true) {
                if !label[pos..].starts_with(&entry.cp) {
                    continue;
                }
                for variant in entry.variants() {
                    for &cp in &variant.cp {
                        let script = self.db.script_or_unknown(cp);
                        if !base.contains(&script) {
                            foreign.insert(script);
                        }
                    }
                }
            }
        }

        let mut passes: Vec<Pass> = vec![Some(base)];
        for script in foreign {
            let single = BTreeSet::from([script]);
            let allowed: BTreeSet<String> = self
                .config
                .enlarge_scripts(&single)
                .union(&neutral)
                .cloned()
                .collect();
            if !passes.iter().any(|p| p.as_ref() == Some(&allowed)) {
                passes.push(Some(allowed));
            }
        }
        passes
    }

    /// Upper bound on the number of labels enumerated for `label`, the
    /// label itself included, summed over the passes when mixed-script
    /// filtering is on.
    ///
    /// Positions branch the way enumeration does: every entry with variants
    /// matching at a position contributes its non-reflexive variant count
    /// plus one, times the bound for the rest of the label. Context rules
    /// are not evaluated.
    pub fn estimate_variant_number(&self, label: &[u32], with_mixed_script: bool) -> Result<u64> {
        let passes = if with_mixed_script {
            self.script_passes(label)
        } else {
            vec![None]
        };
        let mut total: u64 = 0;
        for pass in &passes {
            total = total.saturating_add(self.estimate_pass(label, pass));
        }
        Ok(total)
    }

    fn estimate_pass(&self, label: &[u32], pass: &Pass) -> u64 {
        let allowed = |cps: &[u32]| match pass {
            Some(scripts) => cps
                .iter()
                .all(|&cp| scripts.contains(&self.db.script_or_unknown(cp))),
            None => true,
        };
        // bounds[pos]: labels reachable from `pos` to the end.
        let mut bounds = vec![0u64; label.len() + 1];
        bounds[label.len()] = 1;
        for pos in (0..label.len()).rev() {
            let rest = &label[pos..];
            let mut bound: u64 = 0;
            let mut fallback: Option<u64> = None;
            for entry in self.repertoire.entries_with_prefix(label[pos], false) {
                if !rest.starts_with(&entry.cp) {
                    continue;
                }
                let after = bounds[pos + entry.cp.len()];
                if entry.has_variants() {
                    let count = entry
                        .variants()
                        .iter()
                        .filter(|v| v.cp != entry.cp && allowed(&v.cp))
                        .count() as u64;
                    bound = bound.saturating_add((count + 1).saturating_mul(after));
                } else {
                    fallback = Some(fallback.map_or(after, |f| f.max(after)));
                }
            }
            bounds[pos] = match fallback {
                Some(after) => bound.saturating_add(after),
                None if bound == 0 => bounds[pos + 1],
                None => bound,
            };
        }
        bounds[0]
    }
}
