//! An LGR bound to a Unicode database: construction API and the shared
//! evaluation helpers used by eligibility, variant generation and
//! disposition.

mod disposition;
mod eligibility;
mod metadata;
mod validate;
mod variants;

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::{debug, warn};

use crate::action::Action;
use crate::closure::{self, PopulateReport};
use crate::config::{LgrConfig, Policy};
use crate::cp::check_cps;
use crate::diagnostic::Diagnostic;
use crate::error::{LgrError, Result};
use crate::pattern::{Class, CompileContext, PatternCache, PatternError, Rule};
use crate::repertoire::{CodePointEntry, Context, RangeDecl, Repertoire, Variant};
use crate::unicode::{PointSet, UnicodeDatabase};

pub use disposition::{DispositionSummary, LabelDisposition};
pub use eligibility::{Decomposition, EligibilityReport, InvalidPart, InvalidReason, Part};
pub use metadata::{Metadata, MetadataSummary};
pub use variants::{GeneratedVariant, VariantIter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub id: String,
    pub value: String,
    pub comment: Option<String>,
}

/// How a mutating construction call treats recoverable errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddOptions<'a> {
    /// Log recoverable errors and insert best effort instead of failing.
    pub force: bool,
    /// Code points must also exist in this repertoire.
    pub validating_repertoire: Option<&'a Repertoire>,
    /// Downgrade validating repertoire failures to warnings.
    pub override_repertoire: bool,
}

impl AddOptions<'_> {
    pub fn forced() -> Self {
        Self {
            force: true,
            ..Self::default()
        }
    }
}

/// Attributes of a code point or sequence declaration.
#[derive(Debug, Clone, Default)]
pub struct EntryInput {
    pub cp: Vec<u32>,
    pub comment: Option<String>,
    pub tags: Vec<String>,
    pub references: Vec<String>,
    pub when: Option<String>,
    pub not_when: Option<String>,
}

impl EntryInput {
    pub fn new(cp: &[u32]) -> Self {
        Self {
            cp: cp.to_vec(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RangeInput {
    pub first: u32,
    pub last: u32,
    pub comment: Option<String>,
    pub tags: Vec<String>,
    pub references: Vec<String>,
    pub when: Option<String>,
    pub not_when: Option<String>,
}

impl RangeInput {
    pub fn new(first: u32, last: u32) -> Self {
        Self {
            first,
            last,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VariantInput {
    pub cp: Vec<u32>,
    pub var_type: Option<String>,
    pub comment: Option<String>,
    pub references: Vec<String>,
    pub when: Option<String>,
    pub not_when: Option<String>,
}

impl VariantInput {
    pub fn new(cp: &[u32], var_type: Option<&str>) -> Self {
        Self {
            cp: cp.to_vec(),
            var_type: var_type.map(String::from),
            ..Self::default()
        }
    }
}

/// Label Generation Rules.
///
/// Evaluation borrows the LGR immutably and may run on many threads at once;
/// every mutating call takes `&mut self`.
pub struct Lgr {
    metadata: Metadata,
    repertoire: Repertoire,
    references: BTreeMap<String, Reference>,
    rules: BTreeMap<String, Rule>,
    classes: BTreeMap<String, Class>,
    actions: Vec<Action>,
    config: LgrConfig,
    db: Arc<dyn UnicodeDatabase>,
    patterns: PatternCache,
    tags: RwLock<Option<Arc<BTreeMap<String, PointSet>>>>,
}

impl Lgr {
    pub fn new(db: Arc<dyn UnicodeDatabase>) -> Self {
        Self::with_config(db, LgrConfig::default())
    }

    pub fn with_config(db: Arc<dyn UnicodeDatabase>, config: LgrConfig) -> Self {
        Self {
            metadata: Metadata::new(),
            repertoire: Repertoire::new(),
            references: BTreeMap::new(),
            rules: BTreeMap::new(),
            classes: BTreeMap::new(),
            actions: Vec::new(),
            config,
            db,
            patterns: PatternCache::new(),
            tags: RwLock::new(None),
        }
    }

    pub fn repertoire(&self) -> &Repertoire {
        &self.repertoire
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    pub fn config(&self) -> &LgrConfig {
        &self.config
    }

    pub fn db(&self) -> &dyn UnicodeDatabase {
        self.db.as_ref()
    }

    pub fn rules(&self) -> &BTreeMap<String, Rule> {
        &self.rules
    }

    pub fn classes(&self) -> &BTreeMap<String, Class> {
        &self.classes
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn references(&self) -> &BTreeMap<String, Reference> {
        &self.references
    }

    /// Record the Unicode version the LGR was written against.
    pub fn set_unicode_version(&mut self, version: &str) {
        if version != self.db.unicode_version() {
            warn!(
                lgr = version,
                database = self.db.unicode_version(),
                "unicode version of the LGR differs from the database"
            );
        }
        self.metadata.unicode_version = Some(version.to_string());
    }

    // Error policy

    fn recover(&self, force: bool, err: LgrError) -> Result<()> {
        if force {
            warn!(error = %err, "continuing despite construction error");
            Ok(())
        } else {
            Err(err)
        }
    }

    fn unicode_violation(&self, policy: Policy, force: bool, err: LgrError) -> Result<()> {
        match policy {
            Policy::Warn => {
                warn!(error = %err, "accepting code point");
                Ok(())
            }
            Policy::Reject => self.recover(force, err),
        }
    }

    fn check_validating(&self, cp: &[u32], opts: &AddOptions<'_>) -> Result<()> {
        let Some(validating) = opts.validating_repertoire else {
            return Ok(());
        };
        if validating.contains(cp) {
            return Ok(());
        }
        let err = LgrError::NotInRepertoire(cp.to_vec());
        if opts.override_repertoire {
            warn!(error = %err, "validating repertoire overridden");
            Ok(())
        } else {
            self.recover(opts.force, err)
        }
    }

    fn check_idna(&self, cp: &[u32], force: bool) -> Result<()> {
        if cp.iter().any(|&c| !self.db.is_idna_valid(c)) {
            let err = LgrError::IdnaInvalid(cp.to_vec());
            self.unicode_violation(self.config.idna_policy, force, err)?;
        }
        Ok(())
    }

    fn check_script(&self, cp: &[u32], force: bool) -> Result<()> {
        let scripts = self.metadata.scripts(&self.config);
        if scripts.is_empty() {
            return Ok(());
        }
        for &c in cp {
            let script = self.db.script_or_unknown(c);
            if !scripts.contains(&script) && !self.config.is_neutral_script(&script) {
                let err = LgrError::OutOfScript {
                    cp: cp.to_vec(),
                    script,
                };
                return self.unicode_violation(self.config.script_policy, force, err);
            }
        }
        Ok(())
    }

    fn prepare_context(
        &self,
        cp: &[u32],
        when: Option<String>,
        not_when: Option<String>,
        force: bool,
    ) -> Result<Context> {
        match (when, not_when) {
            (Some(when), Some(_)) => {
                self.recover(force, LgrError::ConflictingContext(cp.to_vec()))?;
                Ok(Context::When(when))
            }
            (when, not_when) => Context::from_parts(cp, when, not_when),
        }
    }

    fn prepare_tags(&self, cp: &[u32], tags: Vec<String>, force: bool) -> Result<Vec<String>> {
        if tags.is_empty() {
            return Ok(tags);
        }
        if cp.len() > 1 {
            self.recover(force, LgrError::TagOnSequence(cp.to_vec()))?;
            return Ok(Vec::new());
        }
        self.dedup(tags, force, |tag| LgrError::DuplicateTag {
            cp: cp.to_vec(),
            tag: tag.to_string(),
        })
    }

    fn prepare_references(
        &self,
        cp: &[u32],
        refs: Vec<String>,
        force: bool,
    ) -> Result<Vec<String>> {
        let refs = self.dedup(refs, force, |id| LgrError::DuplicateReference {
            cp: cp.to_vec(),
            id: id.to_string(),
        })?;
        self.check_known_references(&refs, force)?;
        Ok(refs)
    }

    fn check_known_references(&self, refs: &[String], force: bool) -> Result<()> {
        for id in refs {
            if !self.references.contains_key(id) {
                self.recover(force, LgrError::UnknownReference(id.clone()))?;
            }
        }
        Ok(())
    }

    fn dedup<F>(&self, items: Vec<String>, force: bool, err: F) -> Result<Vec<String>>
    where
        F: Fn(&str) -> LgrError,
    {
        let mut out: Vec<String> = Vec::with_capacity(items.len());
        for item in items {
            if out.contains(&item) {
                self.recover(force, err(&item))?;
            } else {
                out.push(item);
            }
        }
        Ok(out)
    }

    // Repertoire

    pub fn add_cp(&mut self, input: EntryInput, opts: &AddOptions<'_>) -> Result<()> {
        let EntryInput {
            cp,
            comment,
            tags,
            references,
            when,
            not_when,
        } = input;
        check_cps(&cp)?;
        self.check_validating(&cp, opts)?;
        self.check_idna(&cp, opts.force)?;
        self.check_script(&cp, opts.force)?;
        let context = self.prepare_context(&cp, when, not_when, opts.force)?;
        let tags = self.prepare_tags(&cp, tags, opts.force)?;
        let references = self.prepare_references(&cp, references, opts.force)?;

        let tagged = !tags.is_empty();
        let mut entry = CodePointEntry::new(cp);
        entry.comment = comment;
        entry.tags = tags;
        entry.references = references;
        entry.context = context;
        match self.repertoire.add_entry(entry) {
            Ok(()) => {
                if tagged {
                    self.invalidate_tags();
                }
                Ok(())
            }
            Err(err @ LgrError::AlreadyExists(_)) => self.recover(opts.force, err),
            Err(err) => Err(err),
        }
    }

    pub fn add_range(&mut self, input: RangeInput, opts: &AddOptions<'_>) -> Result<()> {
        let RangeInput {
            first,
            last,
            comment,
            tags,
            references,
            when,
            not_when,
        } = input;
        if first > last {
            return Err(LgrError::InvalidParameter(format!(
                "range first {first:04X} is greater than last {last:04X}"
            )));
        }
        check_cps(&[first, last])?;
        for cp in first..=last {
            self.check_validating(&[cp], opts)?;
            self.check_idna(&[cp], opts.force)?;
            self.check_script(&[cp], opts.force)?;
        }
        let context = self.prepare_context(&[first], when, not_when, opts.force)?;
        let tags = self.prepare_tags(&[first], tags, opts.force)?;
        let references = self.prepare_references(&[first], references, opts.force)?;

        let tagged = !tags.is_empty();
        let mut range = RangeDecl::new(first, last);
        range.comment = comment;
        range.tags = tags;
        range.references = references;
        range.context = context;
        match self.repertoire.add_range(range) {
            Ok(()) => {
                if tagged {
                    self.invalidate_tags();
                }
                Ok(())
            }
            Err(err @ (LgrError::RangeOverlap { .. } | LgrError::AlreadyExists(_))) => {
                self.recover(opts.force, err)
            }
            Err(err) => Err(err),
        }
    }

    pub fn add_variant(
        &mut self,
        cp: &[u32],
        input: VariantInput,
        opts: &AddOptions<'_>,
    ) -> Result<()> {
        let VariantInput {
            cp: target,
            var_type,
            comment,
            references,
            when,
            not_when,
        } = input;
        check_cps(cp)?;
        check_cps(&target)?;
        self.check_validating(&target, opts)?;
        self.check_idna(&target, opts.force)?;
        let context = self.prepare_context(cp, when, not_when, opts.force)?;
        let references = self.prepare_references(cp, references, opts.force)?;

        let variant = Variant {
            cp: target,
            var_type,
            context,
            comment,
            references,
        };
        match self.repertoire.add_variant(cp, variant) {
            Err(err @ LgrError::VariantAlreadyExists { .. }) => self.recover(opts.force, err),
            other => other,
        }
    }

    pub fn del_cp(&mut self, cp: &[u32]) -> Result<CodePointEntry> {
        let entry = self.repertoire.delete_entry(cp)?;
        if !entry.tags.is_empty() {
            self.invalidate_tags();
        }
        Ok(entry)
    }

    pub fn del_range(&mut self, first: u32, last: u32) -> Result<RangeDecl> {
        let range = self.repertoire.delete_range(first, last)?;
        if !range.tags.is_empty() {
            self.invalidate_tags();
        }
        Ok(range)
    }

    pub fn del_variant(
        &mut self,
        cp: &[u32],
        variant: &[u32],
        when: Option<String>,
        not_when: Option<String>,
    ) -> Result<Variant> {
        let context = Context::from_parts(cp, when, not_when)?;
        self.repertoire.delete_variant(cp, variant, &context)
    }

    pub fn expand_range(&mut self, first: u32, last: u32) -> Result<()> {
        self.repertoire.expand_range(first, last)
    }

    pub fn expand_ranges(&mut self) {
        self.repertoire.expand_ranges();
    }

    /// Declared tag names.
    pub fn tags(&self) -> Vec<String> {
        self.tag_index().keys().cloned().collect()
    }

    /// Code points carrying `tag`; empty for an undeclared tag.
    pub fn tag_set(&self, tag: &str) -> PointSet {
        self.tag_index().get(tag).cloned().unwrap_or_default()
    }

    // References

    /// Declare a reference. Without an explicit id the lowest free numeric
    /// id is assigned. Returns the id.
    pub fn add_reference(
        &mut self,
        value: &str,
        comment: Option<&str>,
        id: Option<&str>,
    ) -> Result<String> {
        let id = match id {
            Some(id) => {
                if self.references.contains_key(id) {
                    return Err(LgrError::ReferenceAlreadyExists(id.to_string()));
                }
                id.to_string()
            }
            None => (0..)
                .map(|n: usize| n.to_string())
                .find(|candidate| !self.references.contains_key(candidate))
                .unwrap_or_default(),
        };
        self.references.insert(
            id.clone(),
            Reference {
                id: id.clone(),
                value: value.to_string(),
                comment: comment.map(String::from),
            },
        );
        Ok(id)
    }

    /// Remove a reference and every citation of it.
    pub fn del_reference(&mut self, id: &str) -> Result<Reference> {
        let reference = self
            .references
            .remove(id)
            .ok_or_else(|| LgrError::UnknownReference(id.to_string()))?;
        self.repertoire.strip_reference(id);
        for rule in self.rules.values_mut() {
            rule.references.retain(|r| r != id);
        }
        for class in self.classes.values_mut() {
            class.references.retain(|r| r != id);
        }
        for action in &mut self.actions {
            action.references.retain(|r| r != id);
        }
        Ok(reference)
    }

    // Rules, classes, actions

    pub fn add_rule(&mut self, rule: Rule, skip_validation: bool, force: bool) -> Result<()> {
        if self.rules.contains_key(&rule.name) {
            return self.recover(force, LgrError::RuleAlreadyExists(rule.name.clone()));
        }
        if !skip_validation {
            rule.validate()?;
        }
        self.check_known_references(&rule.references, force)?;
        self.rules.insert(rule.name.clone(), rule);
        self.patterns.clear();
        Ok(())
    }

    pub fn add_class(&mut self, class: Class, skip_validation: bool, force: bool) -> Result<()> {
        if self.classes.contains_key(&class.name) {
            return self.recover(force, LgrError::ClassAlreadyExists(class.name.clone()));
        }
        if !skip_validation {
            class.validate()?;
        }
        self.check_known_references(&class.references, force)?;
        self.classes.insert(class.name.clone(), class);
        self.patterns.clear();
        Ok(())
    }

    /// Append an action. Validation requires the rule it names to be
    /// declared already.
    pub fn add_action(&mut self, action: Action, skip_validation: bool, force: bool) -> Result<()> {
        if !skip_validation {
            if action.disposition.trim().is_empty() {
                return Err(LgrError::InvalidAction("empty disposition".to_string()));
            }
            if let Some(rule) = action.rule_name() {
                if !self.rules.contains_key(rule) {
                    self.recover(force, PatternError::UndefinedRule(rule.to_string()).into())?;
                }
            }
        }
        self.check_known_references(&action.references, force)?;
        self.actions.push(action);
        Ok(())
    }

    /// Compile a named class to its code point set.
    pub fn class_set(&self, name: &str) -> Result<PointSet> {
        let class = self
            .classes
            .get(name)
            .ok_or_else(|| PatternError::UndefinedClass(name.to_string()))?;
        let tags = self.tag_index();
        Ok(class.body.compile(&self.compile_context(&tags))?)
    }

    // Closure

    /// Repair symmetry and transitivity in place.
    pub fn populate_variants(&mut self) -> PopulateReport {
        let report =
            closure::populate_variants(&mut self.repertoire, &self.config.populated_variant_type);
        if !report.added_entries.is_empty() {
            self.invalidate_tags();
        }
        debug!(
            entries = report.added_entries.len(),
            variants = report.added_variants.len(),
            "populated variants"
        );
        report
    }

    pub fn check_symmetry(&self) -> Vec<Diagnostic> {
        closure::check_symmetry(&self.repertoire)
    }

    pub fn check_transitivity(&self) -> Vec<Diagnostic> {
        closure::check_transitivity(&self.repertoire)
    }

    // Evaluation helpers

    fn invalidate_tags(&self) {
        if let Ok(mut tags) = self.tags.write() {
            *tags = None;
        }
        self.patterns.clear();
    }

    fn tag_index(&self) -> Arc<BTreeMap<String, PointSet>> {
        if let Ok(tags) = self.tags.read() {
            if let Some(index) = tags.as_ref() {
                return Arc::clone(index);
            }
        }
        let index = Arc::new(self.repertoire.tag_index());
        if let Ok(mut tags) = self.tags.write() {
            *tags = Some(Arc::clone(&index));
        }
        index
    }

    fn compile_context<'a>(&'a self, tags: &'a BTreeMap<String, PointSet>) -> CompileContext<'a> {
        CompileContext {
            rules: &self.rules,
            classes: &self.classes,
            tags,
            db: self.db.as_ref(),
        }
    }

    /// Whether `context` allows `cps` at `index` of `label`.
    pub(crate) fn context_holds(
        &self,
        context: &Context,
        label: &[u32],
        index: usize,
        cps: &[u32],
    ) -> Result<bool> {
        let (name, expected) = match context {
            Context::Always => return Ok(true),
            Context::When(name) => (name, true),
            Context::NotWhen(name) => (name, false),
        };
        let rule = self
            .rules
            .get(name)
            .ok_or_else(|| PatternError::UndefinedRule(name.clone()))?;
        let tags = self.tag_index();
        let ctx = self.compile_context(&tags);
        let matched = rule.matches(label, Some((index, cps)), &ctx, &self.patterns)?;
        Ok(matched == expected)
    }

    /// Evaluate a whole-label rule, as used by action `match`/`not-match`.
    pub fn rule_matches(&self, name: &str, label: &[u32]) -> Result<bool> {
        let rule = self
            .rules
            .get(name)
            .ok_or_else(|| PatternError::UndefinedRule(name.to_string()))?;
        let tags = self.tag_index();
        Ok(rule.matches(label, None, &self.compile_context(&tags), &self.patterns)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{ClassExpr, Matcher};
    use crate::unicode::TableDatabase;

    fn lgr() -> Lgr {
        Lgr::new(Arc::new(TableDatabase::new()))
    }

    fn strict() -> AddOptions<'static> {
        AddOptions::default()
    }

    #[test]
    fn strict_mode_raises_construction_errors() {
        let mut lgr = lgr();
        lgr.add_cp(EntryInput::new(&[0x61]), &strict()).unwrap();
        assert_eq!(
            lgr.add_cp(EntryInput::new(&[0x61]), &strict()),
            Err(LgrError::AlreadyExists(vec![0x61]))
        );
        let mut seq = EntryInput::new(&[0x61, 0x62]);
        seq.tags = vec!["t".into()];
        assert_eq!(
            lgr.add_cp(seq, &strict()),
            Err(LgrError::TagOnSequence(vec![0x61, 0x62]))
        );
        let mut both = EntryInput::new(&[0x63]);
        both.when = Some("a".into());
        both.not_when = Some("b".into());
        assert_eq!(
            lgr.add_cp(both, &strict()),
            Err(LgrError::ConflictingContext(vec![0x63]))
        );
        let mut dup = EntryInput::new(&[0x64]);
        dup.tags = vec!["t".into(), "t".into()];
        assert!(matches!(lgr.add_cp(dup, &strict()), Err(LgrError::DuplicateTag { .. })));
        let mut unknown = EntryInput::new(&[0x65]);
        unknown.references = vec!["9".into()];
        assert_eq!(
            lgr.add_cp(unknown, &strict()),
            Err(LgrError::UnknownReference("9".into()))
        );
        assert_eq!(lgr.repertoire().len(), 1);
    }

    #[test]
    fn force_mode_inserts_best_effort() {
        let mut lgr = lgr();
        let forced = AddOptions::forced();
        let mut seq = EntryInput::new(&[0x61, 0x62]);
        seq.tags = vec!["t".into()];
        seq.when = Some("a".into());
        seq.not_when = Some("b".into());
        lgr.add_cp(seq, &forced).unwrap();
        let entry = lgr.repertoire().get(&[0x61, 0x62]).unwrap();
        assert!(entry.tags.is_empty());
        assert_eq!(entry.context, Context::When("a".into()));

        let mut dup = EntryInput::new(&[0x64]);
        dup.tags = vec!["t".into(), "t".into()];
        dup.references = vec!["0".into(), "0".into()];
        lgr.add_cp(dup, &forced).unwrap();
        let entry = lgr.repertoire().get(&[0x64]).unwrap();
        assert_eq!(entry.tags, vec!["t".to_string()]);
        assert_eq!(entry.references, vec!["0".to_string()]);

        // Duplicates are skipped without error.
        lgr.add_cp(EntryInput::new(&[0x64]), &forced).unwrap();
        assert_eq!(lgr.repertoire().len(), 2);
        assert!(lgr.add_cp(EntryInput::new(&[]), &forced).is_err());
    }

    #[test]
    fn unicode_policies() {
        let mut lgr = lgr();
        // Upper case ASCII is not IDNA valid; rejected by default.
        assert_eq!(
            lgr.add_cp(EntryInput::new(&[0x41]), &strict()),
            Err(LgrError::IdnaInvalid(vec![0x41]))
        );
        lgr.metadata_mut().set_languages(vec!["el".into()]);
        // Script violations only warn by default.
        lgr.add_cp(EntryInput::new(&[0x61]), &strict()).unwrap();
        lgr.add_cp(EntryInput::new(&[0x3B1]), &strict()).unwrap();

        let mut config = LgrConfig::default();
        config.script_policy = Policy::Reject;
        let mut lgr = Lgr::with_config(Arc::new(TableDatabase::new()), config);
        lgr.metadata_mut().set_languages(vec!["el".into()]);
        assert!(matches!(
            lgr.add_cp(EntryInput::new(&[0x61]), &strict()),
            Err(LgrError::OutOfScript { .. })
        ));
        // Digits are Common and always allowed.
        lgr.add_cp(EntryInput::new(&[0x30]), &strict()).unwrap();
    }

    #[test]
    fn validating_repertoire() {
        let mut reference = Repertoire::new();
        reference.add_entry(CodePointEntry::new(vec![0x61])).unwrap();
        let mut lgr = lgr();
        let opts = AddOptions {
            validating_repertoire: Some(&reference),
            ..AddOptions::default()
        };
        lgr.add_cp(EntryInput::new(&[0x61]), &opts).unwrap();
        assert_eq!(
            lgr.add_cp(EntryInput::new(&[0x62]), &opts),
            Err(LgrError::NotInRepertoire(vec![0x62]))
        );
        let overridden = AddOptions {
            override_repertoire: true,
            ..opts
        };
        lgr.add_cp(EntryInput::new(&[0x62]), &overridden).unwrap();
    }

    #[test]
    fn ranges_through_the_lgr() {
        let mut lgr = lgr();
        assert!(matches!(
            lgr.add_range(RangeInput::new(10, 5), &strict()),
            Err(LgrError::InvalidParameter(_))
        ));
        lgr.add_range(RangeInput::new(0x61, 0x65), &strict()).unwrap();
        assert!(lgr.add_range(RangeInput::new(0x65, 0x66), &strict()).is_err());
        lgr.add_range(RangeInput::new(0x65, 0x66), &AddOptions::forced()).unwrap();
        assert_eq!(lgr.repertoire().ranges().len(), 1);
        lgr.del_range(0x61, 0x65).unwrap();
        assert!(lgr.repertoire().is_empty());
    }

    #[test]
    fn variants_force_and_strict() {
        let mut lgr = lgr();
        lgr.add_cp(EntryInput::new(&[0x61]), &strict()).unwrap();
        lgr.add_variant(&[0x61], VariantInput::new(&[0x62], Some("blocked")), &strict())
            .unwrap();
        assert!(matches!(
            lgr.add_variant(&[0x61], VariantInput::new(&[0x62], Some("blocked")), &strict()),
            Err(LgrError::VariantAlreadyExists { .. })
        ));
        lgr.add_variant(&[0x61], VariantInput::new(&[0x62], None), &AddOptions::forced())
            .unwrap();
        assert_eq!(lgr.repertoire().get_variants(&[0x61]).unwrap().len(), 1);
        assert!(matches!(
            lgr.add_variant(&[0x7A], VariantInput::new(&[0x62], None), &AddOptions::forced()),
            Err(LgrError::NotFound(_))
        ));
        lgr.del_variant(&[0x61], &[0x62], None, None).unwrap();
        assert!(lgr.repertoire().get_variants(&[0x61]).unwrap().is_empty());
    }

    #[test]
    fn references_are_numbered_and_stripped() {
        let mut lgr = lgr();
        assert_eq!(lgr.add_reference("RFC 7940", None, None).unwrap(), "0");
        assert_eq!(lgr.add_reference("Unicode", None, None).unwrap(), "1");
        assert_eq!(
            lgr.add_reference("dup", None, Some("1")),
            Err(LgrError::ReferenceAlreadyExists("1".into()))
        );
        let mut input = EntryInput::new(&[0x61]);
        input.references = vec!["0".into(), "1".into()];
        lgr.add_cp(input, &strict()).unwrap();
        let mut variant = VariantInput::new(&[0x62], None);
        variant.references = vec!["0".into()];
        lgr.add_variant(&[0x61], variant, &strict()).unwrap();
        lgr.del_reference("0").unwrap();
        let entry = lgr.repertoire().get(&[0x61]).unwrap();
        assert_eq!(entry.references, vec!["1".to_string()]);
        assert!(entry.variants()[0].references.is_empty());
        assert_eq!(lgr.add_reference("again", None, None).unwrap(), "0");
        assert!(lgr.del_reference("7").is_err());
    }

    #[test]
    fn rules_classes_actions_registration() {
        let mut lgr = lgr();
        lgr.add_rule(Rule::new("r", vec![Matcher::Start]), false, false).unwrap();
        assert_eq!(
            lgr.add_rule(Rule::new("r", vec![Matcher::End]), false, false),
            Err(LgrError::RuleAlreadyExists("r".into()))
        );
        let invalid = Rule::new("bad", vec![Matcher::Anchor, Matcher::Anchor]);
        assert!(lgr.add_rule(invalid.clone(), false, false).is_err());
        lgr.add_rule(invalid, true, false).unwrap();

        lgr.add_class(Class::new("vowels", ClassExpr::code_points([0x61, 0x65])), false, false)
            .unwrap();
        assert_eq!(lgr.class_set("vowels").unwrap().len(), 2);
        assert!(lgr.class_set("missing").is_err());

        assert!(lgr.add_action(Action::new("blocked").matching("nope"), false, false).is_err());
        lgr.add_action(Action::new("blocked").matching("nope"), true, false).unwrap();
        lgr.add_action(Action::new("blocked").matching("r"), false, false).unwrap();
        assert_eq!(lgr.actions().len(), 2);
    }

    #[test]
    fn tag_cache_follows_changes() {
        let mut lgr = lgr();
        let mut input = EntryInput::new(&[0x61]);
        input.tags = vec!["vowel".into()];
        lgr.add_cp(input, &strict()).unwrap();
        assert_eq!(lgr.tags(), vec!["vowel".to_string()]);
        assert!(lgr.tag_set("vowel").contains(0x61));
        let mut input = EntryInput::new(&[0x65]);
        input.tags = vec!["vowel".into()];
        lgr.add_cp(input, &strict()).unwrap();
        assert_eq!(lgr.tag_set("vowel").len(), 2);
        lgr.del_cp(&[0x61]).unwrap();
        assert_eq!(lgr.tag_set("vowel").len(), 1);
        assert!(lgr.tag_set("missing").is_empty());
    }

    #[test]
    fn context_rules_resolve_through_the_table() {
        let mut lgr = lgr();
        let after_a = Rule::new(
            "after-a",
            vec![Matcher::LookBehind(vec![Matcher::char(0x61)]), Matcher::Anchor],
        );
        lgr.add_rule(after_a, false, false).unwrap();
        let label = [0x61, 0x62];
        let when = Context::When("after-a".into());
        let not_when = Context::NotWhen("after-a".into());
        assert!(lgr.context_holds(&when, &label, 1, &[0x62]).unwrap());
        assert!(!lgr.context_holds(&not_when, &label, 1, &[0x62]).unwrap());
        assert!(lgr.context_holds(&Context::Always, &label, 0, &[0x61]).unwrap());
        assert!(matches!(
            lgr.context_holds(&Context::When("missing".into()), &label, 0, &[0x61]),
            Err(LgrError::Pattern(PatternError::UndefinedRule(_)))
        ));
        assert!(lgr.rule_matches("after-a", &label).is_err());
    }
}
