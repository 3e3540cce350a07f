use super::Lgr;
use crate::diagnostic::{Check, Diagnostic, Severity};
use crate::repertoire::Context;

impl Lgr {
    /// Rule and class names that are used but not declared: context rules
    /// of entries and variants, action rules, and the rules and classes
    /// referenced from inside rules and classes. Evaluating such a label
    /// would fail, so each one is an error.
    pub fn validate_references(&self) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for entry in self.repertoire.entries() {
            if let Some(name) = self.undefined_rule(&entry.context) {
                out.push(Diagnostic::new(
                    Severity::Error,
                    Check::UndefinedRule,
                    &entry.cp,
                    &[],
                    format!("context rule {name:?} is not defined"),
                ));
            }
            for variant in entry.variants() {
                if let Some(name) = self.undefined_rule(&variant.context) {
                    out.push(Diagnostic::new(
                        Severity::Error,
                        Check::UndefinedRule,
                        &entry.cp,
                        &variant.cp,
                        format!("variant context rule {name:?} is not defined"),
                    ));
                }
            }
        }
        for (idx, action) in self.actions.iter().enumerate() {
            if let Some(name) = action.rule_name().filter(|name| !self.rules.contains_key(*name)) {
                out.push(Diagnostic::new(
                    Severity::Error,
                    Check::UndefinedRule,
                    &[],
                    &[],
                    format!("action {idx} ({}) uses undefined rule {name:?}", action.disposition),
                ));
            }
        }
        for rule in self.rules.values() {
            let (mut rules, mut classes) = (Vec::new(), Vec::new());
            for m in &rule.matchers {
                m.referenced_names(&mut rules, &mut classes);
            }
            for name in rules.into_iter().filter(|name| !self.rules.contains_key(*name)) {
                out.push(undefined(
                    Check::UndefinedRule,
                    format!("rule {:?} references undefined rule {name:?}", rule.name),
                ));
            }
            for name in classes.into_iter().filter(|name| !self.classes.contains_key(*name)) {
                out.push(undefined(
                    Check::UndefinedClass,
                    format!("rule {:?} references undefined class {name:?}", rule.name),
                ));
            }
        }
        for class in self.classes.values() {
            let mut classes = Vec::new();
            class.body.referenced_classes(&mut classes);
            for name in classes.into_iter().filter(|name| !self.classes.contains_key(*name)) {
                out.push(undefined(
                    Check::UndefinedClass,
                    format!("class {:?} references undefined class {name:?}", class.name),
                ));
            }
        }
        out
    }

    fn undefined_rule<'a>(&self, context: &'a Context) -> Option<&'a str> {
        context.rule().filter(|name| !self.rules.contains_key(*name))
    }
}

fn undefined(check: Check, message: String) -> Diagnostic {
    Diagnostic::new(Severity::Error, check, &[], &[], message)
}
