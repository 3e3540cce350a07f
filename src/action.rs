//! Ordered disposition actions.
//!
//! Explicit actions are tried in declaration order, then the five default
//! actions, and the first one that fires decides the disposition. The
//! catch-all default makes the evaluation total.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use serde::Serialize;

use crate::error::{LgrError, Result};

pub const INVALID: &str = "invalid";
pub const BLOCKED: &str = "blocked";
pub const ALLOCATABLE: &str = "allocatable";
pub const ACTIVATED: &str = "activated";
pub const VALID: &str = "valid";

/// Whole-label rule condition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCondition {
    #[default]
    Always,
    Match(String),
    NotMatch(String),
}

/// Condition on the set of variant types of the label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantCondition {
    #[default]
    Always,
    AnyVariant(BTreeSet<String>),
    AllVariants(BTreeSet<String>),
    OnlyVariants(BTreeSet<String>),
}

impl VariantCondition {
    fn holds(&self, types: &BTreeSet<String>, only_variants: bool) -> bool {
        match self {
            VariantCondition::Always => true,
            VariantCondition::AnyVariant(set) => !types.is_disjoint(set),
            VariantCondition::AllVariants(set) => !types.is_empty() && types.is_subset(set),
            VariantCondition::OnlyVariants(set) => {
                only_variants && !types.is_empty() && types.is_subset(set)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    pub disposition: String,
    pub rule: RuleCondition,
    pub variants: VariantCondition,
    pub comment: Option<String>,
    pub references: Vec<String>,
}

/// Which action decided a disposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionIndex {
    Explicit(usize),
    Default(usize),
}

static DEFAULT_ACTIONS: LazyLock<Vec<Action>> = LazyLock::new(|| {
    vec![
        Action::new(INVALID).any_variant([INVALID]),
        Action::new(BLOCKED).any_variant([BLOCKED]),
        Action::new(ALLOCATABLE).any_variant([ALLOCATABLE]),
        Action::new(ACTIVATED).all_variants([ACTIVATED]),
        Action::new(VALID),
    ]
});

/// The fixed tail appended after the explicit actions.
pub fn default_actions() -> &'static [Action] {
    &DEFAULT_ACTIONS
}

fn type_set<'a, I: IntoIterator<Item = &'a str>>(types: I) -> BTreeSet<String> {
    types.into_iter().map(String::from).collect()
}

impl Action {
    /// Unconditional action.
    pub fn new(disposition: &str) -> Self {
        Self {
            disposition: disposition.to_string(),
            rule: RuleCondition::Always,
            variants: VariantCondition::Always,
            comment: None,
            references: Vec::new(),
        }
    }

    pub fn matching(mut self, rule: &str) -> Self {
        self.rule = RuleCondition::Match(rule.to_string());
        self
    }

    pub fn not_matching(mut self, rule: &str) -> Self {
        self.rule = RuleCondition::NotMatch(rule.to_string());
        self
    }

    pub fn any_variant<'a, I: IntoIterator<Item = &'a str>>(mut self, types: I) -> Self {
        self.variants = VariantCondition::AnyVariant(type_set(types));
        self
    }

    pub fn all_variants<'a, I: IntoIterator<Item = &'a str>>(mut self, types: I) -> Self {
        self.variants = VariantCondition::AllVariants(type_set(types));
        self
    }

    pub fn only_variants<'a, I: IntoIterator<Item = &'a str>>(mut self, types: I) -> Self {
        self.variants = VariantCondition::OnlyVariants(type_set(types));
        self
    }

    /// Build an action from loader attributes, enforcing that `match` and
    /// `not-match` exclude each other and that at most one variant condition
    /// is present.
    pub fn from_parts(
        disposition: &str,
        match_rule: Option<&str>,
        not_match_rule: Option<&str>,
        any_variant: Option<BTreeSet<String>>,
        all_variants: Option<BTreeSet<String>>,
        only_variants: Option<BTreeSet<String>>,
    ) -> Result<Action> {
        if disposition.trim().is_empty() {
            return Err(LgrError::InvalidAction("empty disposition".to_string()));
        }
        let rule = match (match_rule, not_match_rule) {
            (Some(_), Some(_)) => {
                return Err(LgrError::InvalidAction(
                    "match and not-match are mutually exclusive".to_string(),
                ));
            }
            (Some(r), None) => RuleCondition::Match(r.to_string()),
            (None, Some(r)) => RuleCondition::NotMatch(r.to_string()),
            (None, None) => RuleCondition::Always,
        };
        let variants = match (any_variant, all_variants, only_variants) {
            (None, None, None) => VariantCondition::Always,
            (Some(set), None, None) => VariantCondition::AnyVariant(set),
            (None, Some(set), None) => VariantCondition::AllVariants(set),
            (None, None, Some(set)) => VariantCondition::OnlyVariants(set),
            _ => {
                return Err(LgrError::InvalidAction(
                    "at most one of any-variant, all-variants, only-variants".to_string(),
                ));
            }
        };
        Ok(Action {
            disposition: disposition.to_string(),
            rule,
            variants,
            comment: None,
            references: Vec::new(),
        })
    }

    pub fn rule_name(&self) -> Option<&str> {
        match &self.rule {
            RuleCondition::Match(r) | RuleCondition::NotMatch(r) => Some(r),
            RuleCondition::Always => None,
        }
    }

    /// Disposition if the action fires on `label`.
    ///
    /// `eval_rule` runs a named whole-label rule; its errors abort the
    /// evaluation.
    pub fn apply<F>(
        &self,
        label: &[u32],
        types: &BTreeSet<String>,
        only_variants: bool,
        eval_rule: &mut F,
    ) -> Result<Option<&str>>
    where
        F: FnMut(&str, &[u32]) -> Result<bool>,
    {
        let rule_holds = match &self.rule {
            RuleCondition::Always => true,
            RuleCondition::Match(rule) => eval_rule(rule, label)?,
            RuleCondition::NotMatch(rule) => !eval_rule(rule, label)?,
        };
        if rule_holds && self.variants.holds(types, only_variants) {
            Ok(Some(&self.disposition))
        } else {
            Ok(None)
        }
    }
}

/// Run `actions` then the defaults; the first that fires wins.
pub fn evaluate<F>(
    actions: &[Action],
    label: &[u32],
    types: &BTreeSet<String>,
    only_variants: bool,
    mut eval_rule: F,
) -> Result<(String, ActionIndex)>
where
    F: FnMut(&str, &[u32]) -> Result<bool>,
{
    for (idx, action) in actions.iter().enumerate() {
        if let Some(disp) = action.apply(label, types, only_variants, &mut eval_rule)? {
            return Ok((disp.to_string(), ActionIndex::Explicit(idx)));
        }
    }
    for (idx, action) in default_actions().iter().enumerate() {
        if let Some(disp) = action.apply(label, types, only_variants, &mut eval_rule)? {
            return Ok((disp.to_string(), ActionIndex::Default(idx)));
        }
    }
    // The last default action is unconditional.
    Ok((VALID.to_string(), ActionIndex::Default(default_actions().len() - 1)))
}
