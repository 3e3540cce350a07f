//! Symmetry and transitivity of the variant relation: checks that report
//! violations, and the fixpoint repair run by `populate_variants`.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::warn;

use crate::cp::format_cps;
use crate::diagnostic::{Check, Diagnostic, Severity};
use crate::repertoire::{CodePointEntry, Context, Repertoire, Variant};

/// What `populate_variants` added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PopulateReport {
    pub added_entries: Vec<Vec<u32>>,
    pub added_variants: Vec<(Vec<u32>, Vec<u32>)>,
    /// Ranges expanded because a member had to receive a variant.
    pub expanded_ranges: Vec<(u32, u32)>,
    /// Edges whose two directions carry different context rules.
    pub context_conflicts: Vec<(Vec<u32>, Vec<u32>)>,
}

impl PopulateReport {
    pub fn is_empty(&self) -> bool {
        self.added_entries.is_empty()
            && self.added_variants.is_empty()
            && self.expanded_ranges.is_empty()
    }
}

/// Non-reflexive edges as owned keys.
fn edges(repertoire: &Repertoire) -> Vec<(Vec<u32>, Variant)> {
    repertoire
        .entries()
        .flat_map(|entry| {
            entry
                .variants()
                .iter()
                .filter(move |v| v.cp != entry.cp)
                .map(move |v| (entry.cp.clone(), v.clone()))
        })
        .collect()
}

/// Add the variant `source -> target`, expanding the range `source` sits in
/// if needed. Returns false if the edge could not be added.
fn add_edge(
    repertoire: &mut Repertoire,
    report: &mut PopulateReport,
    source: &[u32],
    variant: Variant,
) -> bool {
    let target = variant.cp.clone();
    if let Some((first, last)) = repertoire.get(source).and_then(|e| e.range) {
        if repertoire.expand_range(first, last).is_ok() {
            report.expanded_ranges.push((first, last));
        }
    }
    match repertoire.add_variant(source, variant) {
        Ok(()) => {
            report.added_variants.push((source.to_vec(), target));
            true
        }
        Err(err) => {
            warn!(error = %err, "could not add populated variant");
            false
        }
    }
}

/// Make the variant relation symmetric and transitive.
///
/// Missing targets become entries, every edge gets its reverse (same type
/// and context rule), and every chain `a -> b -> c` gets `a -> c`, typed
/// like the chain when both edges agree and `populated_type` otherwise.
/// Repeats until nothing changes, so a second run is a no-op.
pub fn populate_variants(repertoire: &mut Repertoire, populated_type: &str) -> PopulateReport {
    let mut report = PopulateReport::default();
    let mut conflicts: BTreeSet<(Vec<u32>, Vec<u32>)> = BTreeSet::new();
    loop {
        let mut changed = false;

        for (_, variant) in edges(repertoire) {
            if !repertoire.contains(&variant.cp)
                && repertoire
                    .add_entry(CodePointEntry::new(variant.cp.clone()))
                    .is_ok()
            {
                report.added_entries.push(variant.cp.clone());
                changed = true;
            }
        }

        for (source, variant) in edges(repertoire) {
            let Some(target) = repertoire.get(&variant.cp) else {
                continue;
            };
            if target.has_variant_to(&source) {
                if target.find_variant(&source, &variant.context).is_none() {
                    let key = if source <= variant.cp {
                        (source.clone(), variant.cp.clone())
                    } else {
                        (variant.cp.clone(), source.clone())
                    };
                    conflicts.insert(key);
                }
                continue;
            }
            let mut reverse = Variant::new(source.clone(), variant.var_type.as_deref());
            reverse.context = variant.context.clone();
            changed |= add_edge(repertoire, &mut report, &variant.cp, reverse);
        }

        let mut transitive: Vec<(Vec<u32>, Variant)> = Vec::new();
        for entry in repertoire.entries() {
            for first in entry.variants().iter().filter(|v| v.cp != entry.cp) {
                let Some(middle) = repertoire.get(&first.cp) else {
                    continue;
                };
                for second in middle.variants().iter().filter(|v| v.cp != middle.cp) {
                    let target = &second.cp;
                    if *target == entry.cp || entry.has_variant_to(target) {
                        continue;
                    }
                    if transitive.iter().any(|(s, v)| *s == entry.cp && v.cp == *target) {
                        continue;
                    }
                    let var_type = if first.var_type == second.var_type {
                        first.var_type.as_deref()
                    } else {
                        Some(populated_type)
                    };
                    transitive.push((entry.cp.clone(), Variant::new(target.clone(), var_type)));
                }
            }
        }
        for (source, variant) in transitive {
            changed |= add_edge(repertoire, &mut report, &source, variant);
        }

        if !changed {
            break;
        }
    }

    for (a, b) in &conflicts {
        warn!(
            source = %format_cps(a),
            target = %format_cps(b),
            "variant directions disagree on their context rule"
        );
    }
    report.context_conflicts = conflicts.into_iter().collect();
    report
}

/// Every edge must have a reverse edge with the same context rule.
pub fn check_symmetry(repertoire: &Repertoire) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for entry in repertoire.entries() {
        for variant in entry.variants().iter().filter(|v| v.cp != entry.cp) {
            let diag = |severity, check, message: String| {
                Diagnostic::new(severity, check, &entry.cp, &variant.cp, message)
            };
            match repertoire.get(&variant.cp) {
                None => out.push(diag(
                    Severity::Error,
                    Check::MissingTarget,
                    "variant target is not in the repertoire".to_string(),
                )),
                Some(target) if !target.has_variant_to(&entry.cp) => out.push(diag(
                    Severity::Error,
                    Check::Symmetry,
                    "no reverse variant".to_string(),
                )),
                Some(target) if target.find_variant(&entry.cp, &variant.context).is_none() => {
                    out.push(diag(
                        Severity::Warning,
                        Check::ContextMismatch,
                        format!(
                            "reverse variant has a different context rule than {}",
                            describe(&variant.context)
                        ),
                    ))
                }
                Some(_) => {}
            }
        }
    }
    out.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    out
}

/// Every chain `a -> b -> c` must be closed by `a -> c`.
pub fn check_transitivity(repertoire: &Repertoire) -> Vec<Diagnostic> {
    let mut missing: BTreeSet<(Vec<u32>, Vec<u32>, Vec<u32>)> = BTreeSet::new();
    for entry in repertoire.entries() {
        for first in entry.variants().iter().filter(|v| v.cp != entry.cp) {
            let Some(middle) = repertoire.get(&first.cp) else {
                continue;
            };
            for second in middle.variants().iter().filter(|v| v.cp != middle.cp) {
                if second.cp != entry.cp && !entry.has_variant_to(&second.cp) {
                    missing.insert((entry.cp.clone(), second.cp.clone(), middle.cp.clone()));
                }
            }
        }
    }
    let mut out: Vec<Diagnostic> = Vec::new();
    for (source, target, via) in missing {
        // One finding per missing edge, whatever the number of paths.
        if out.last().is_some_and(|d| d.source == source && d.target == target) {
            continue;
        }
        out.push(Diagnostic::new(
            Severity::Error,
            Check::Transitivity,
            &source,
            &target,
            format!("missing variant, reachable through {}", format_cps(&via)),
        ));
    }
    out
}

fn describe(context: &Context) -> String {
    match context {
        Context::Always => "no rule".to_string(),
        Context::When(rule) => format!("when={rule}"),
        Context::NotWhen(rule) => format!("not-when={rule}"),
    }
}
