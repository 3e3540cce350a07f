//! Matcher nodes of a rule and their pattern text.
//!
//! Look-behind bodies must have a constant width for the regex engine, so
//! they are expanded into one assertion per possible width, capped at the
//! label length ceiling.

use std::collections::BTreeMap;

use super::class::ClassExpr;
use super::{ANCHOR_PLACEHOLDER, CompileContext, Expansion, PatternError, literal};
use crate::cp::MAX_LABEL_LENGTH;

const ANY_PATTERN: &str = "[\\x{0}-\\x{D7FF}\\x{E000}-\\x{10FFFF}]";

/// Upper bound on the text of one expanded look-behind.
const LOOKBEHIND_TEXT_LIMIT: usize = 1 << 16;

/// Fixed-width alternatives of a look-behind body, keyed by width.
type Widths = BTreeMap<usize, Vec<String>>;

/// Repetition of a matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Count {
    /// `n`
    Exact(u32),
    /// `n:m`
    Range(u32, u32),
    /// `n+`
    AtLeast(u32),
}

impl Count {
    /// Parse the RFC 7940 `count` attribute: `3`, `1:4` or `0+`.
    pub fn parse(text: &str) -> Result<Count, PatternError> {
        let bad = || PatternError::Validation(format!("malformed count {text:?}"));
        let text = text.trim();
        if let Some(min) = text.strip_suffix('+') {
            return min.parse().map(Count::AtLeast).map_err(|_| bad());
        }
        if let Some((min, max)) = text.split_once(':') {
            let min = min.parse().map_err(|_| bad())?;
            let max = max.parse().map_err(|_| bad())?;
            return Ok(Count::Range(min, max));
        }
        text.parse().map(Count::Exact).map_err(|_| bad())
    }

    fn quantifier(&self) -> String {
        match *self {
            Count::Exact(n) => format!("{{{n}}}"),
            Count::Range(n, m) => format!("{{{n},{m}}}"),
            Count::AtLeast(n) => format!("{{{n},}}"),
        }
    }

    /// Minimum and maximum repetitions; `None` for open-ended.
    fn bounds(&self) -> (u32, Option<u32>) {
        match *self {
            Count::Exact(n) => (n, Some(n)),
            Count::Range(n, m) => (n, Some(m)),
            Count::AtLeast(n) => (n, None),
        }
    }

    fn validate(&self) -> Result<(), PatternError> {
        match *self {
            Count::Range(n, m) if n > m => Err(PatternError::Validation(format!(
                "count {n}:{m} has min greater than max"
            ))),
            _ => Ok(()),
        }
    }
}

fn alternation(parts: &[String]) -> String {
    match parts {
        [single] => single.clone(),
        _ => format!("(?:{})", parts.join("|")),
    }
}

fn single(width: usize, text: String) -> Widths {
    BTreeMap::from([(width, vec![text])])
}

fn merge(into: &mut Widths, other: Widths) {
    for (width, texts) in other {
        into.entry(width).or_default().extend(texts);
    }
}

fn check_size(widths: Widths) -> Result<Widths, PatternError> {
    let size: usize = widths.values().flatten().map(String::len).sum();
    if size > LOOKBEHIND_TEXT_LIMIT {
        return Err(PatternError::Validation(format!(
            "look-behind expands to more than {LOOKBEHIND_TEXT_LIMIT} bytes of pattern"
        )));
    }
    Ok(widths)
}

/// Every `a` followed by every `b`, dropping widths past the label ceiling.
fn concat(a: &Widths, b: &Widths) -> Result<Widths, PatternError> {
    let mut out = Widths::new();
    for (wa, ta) in a {
        let ta = alternation(ta);
        for (wb, tb) in b {
            let width = wa + wb;
            if width > MAX_LABEL_LENGTH {
                break;
            }
            out.entry(width)
                .or_default()
                .push(format!("{ta}{}", alternation(tb)));
        }
    }
    check_size(out)
}

fn repeat(base: Widths, count: Option<&Count>) -> Result<Widths, PatternError> {
    let Some(count) = count else {
        return Ok(base);
    };
    let (min, max) = count.bounds();
    let cap = MAX_LABEL_LENGTH as u32;
    let max = max.map_or(cap, |m| m.min(cap));
    if min > max {
        return Ok(Widths::new());
    }

    // A single fixed-width body keeps its quantifier.
    if base.len() == 1 {
        if let Some((&width, [text])) = base.iter().next().map(|(w, t)| (w, t.as_slice())) {
            let mut out = Widths::new();
            let top = if width == 0 { max.min(1) } else { max };
            for k in min.min(top)..=top {
                let total = width * k as usize;
                if total > MAX_LABEL_LENGTH {
                    break;
                }
                let repeated = match k {
                    0 => String::new(),
                    1 => text.clone(),
                    _ => format!("(?:{text}){{{k}}}"),
                };
                out.entry(total).or_default().push(repeated);
            }
            return Ok(out);
        }
    }

    let mut out = Widths::new();
    let mut power = single(0, String::new());
    for k in 0..=max {
        if k >= min {
            merge(&mut out, power.clone());
        }
        if k == max {
            break;
        }
        power = concat(&power, &base)?;
        if power.is_empty() {
            break;
        }
    }
    check_size(out)
}

/// Assertion text for a look-behind: one constant-width look-behind per
/// width. A body that may match nothing always holds.
fn lookbehind(widths: &Widths) -> String {
    if widths
        .get(&0)
        .is_some_and(|texts| texts.iter().any(String::is_empty))
    {
        return "(?:)".to_string();
    }
    let parts: Vec<String> = widths
        .values()
        .map(|texts| format!("(?<={})", alternation(texts)))
        .collect();
    match parts.as_slice() {
        [] => "(?!)".to_string(),
        [one] => one.clone(),
        _ => format!("(?:{})", parts.join("|")),
    }
}

/// Target of a rule matcher: a named rule or an inline sub-rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleRef {
    Named(String),
    Inline(Vec<Matcher>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Start of label.
    Start,
    /// End of label.
    End,
    /// The code point(s) under test of a context rule.
    Anchor,
    /// Any single code point.
    Any { count: Option<Count> },
    Char { cps: Vec<u32>, count: Option<Count> },
    Choice { alternatives: Vec<Matcher>, count: Option<Count> },
    LookAhead(Vec<Matcher>),
    LookBehind(Vec<Matcher>),
    Class { class: ClassExpr, count: Option<Count> },
    Rule { rule: RuleRef, count: Option<Count> },
}

impl Matcher {
    pub fn char(cp: u32) -> Matcher {
        Matcher::Char {
            cps: vec![cp],
            count: None,
        }
    }

    pub fn class_ref(name: &str) -> Matcher {
        Matcher::Class {
            class: ClassExpr::Ref(name.to_string()),
            count: None,
        }
    }

    pub fn rule_ref(name: &str) -> Matcher {
        Matcher::Rule {
            rule: RuleRef::Named(name.to_string()),
            count: None,
        }
    }

    fn count(&self) -> Option<&Count> {
        match self {
            Matcher::Any { count }
            | Matcher::Char { count, .. }
            | Matcher::Choice { count, .. }
            | Matcher::Class { count, .. }
            | Matcher::Rule { count, .. } => count.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn validate(
        &self,
        anchors: &mut usize,
        in_lookaround: bool,
    ) -> Result<(), PatternError> {
        if let Some(count) = self.count() {
            count.validate()?;
        }
        match self {
            Matcher::Start | Matcher::End | Matcher::Any { .. } => Ok(()),
            Matcher::Anchor => {
                if in_lookaround {
                    return Err(PatternError::Validation(
                        "anchor inside a look-around".to_string(),
                    ));
                }
                *anchors += 1;
                Ok(())
            }
            Matcher::Char { cps, .. } => {
                if cps.is_empty() {
                    Err(PatternError::Validation("char matcher without code points".to_string()))
                } else {
                    Ok(())
                }
            }
            Matcher::Choice { alternatives, .. } => {
                if alternatives.len() < 2 {
                    return Err(PatternError::Validation(format!(
                        "choice needs at least 2 alternatives, got {}",
                        alternatives.len()
                    )));
                }
                alternatives
                    .iter()
                    .try_for_each(|m| m.validate(anchors, in_lookaround))
            }
            Matcher::LookAhead(body) | Matcher::LookBehind(body) => {
                if body.is_empty() {
                    return Err(PatternError::Validation("empty look-around".to_string()));
                }
                body.iter().try_for_each(|m| m.validate(anchors, true))
            }
            Matcher::Class { class, .. } => class.validate(),
            Matcher::Rule { rule, .. } => match rule {
                RuleRef::Named(name) if name.trim().is_empty() => Err(PatternError::Validation(
                    "rule reference with an empty name".to_string(),
                )),
                RuleRef::Named(_) => Ok(()),
                RuleRef::Inline(body) => body
                    .iter()
                    .try_for_each(|m| m.validate(anchors, in_lookaround)),
            },
        }
    }

    /// Rule and class names referenced anywhere below this matcher.
    pub fn referenced_names<'a>(&'a self, rules: &mut Vec<&'a str>, classes: &mut Vec<&'a str>) {
        match self {
            Matcher::Start
            | Matcher::End
            | Matcher::Anchor
            | Matcher::Any { .. }
            | Matcher::Char { .. } => {}
            Matcher::Choice { alternatives, .. } => {
                for m in alternatives {
                    m.referenced_names(rules, classes);
                }
            }
            Matcher::LookAhead(body)
            | Matcher::LookBehind(body)
            | Matcher::Rule {
                rule: RuleRef::Inline(body),
                ..
            } => {
                for m in body {
                    m.referenced_names(rules, classes);
                }
            }
            Matcher::Rule {
                rule: RuleRef::Named(name),
                ..
            } => rules.push(name),
            Matcher::Class { class, .. } => class.referenced_classes(classes),
        }
    }

    pub(crate) fn pattern(
        &self,
        ctx: &CompileContext<'_>,
        exp: &mut Expansion,
    ) -> Result<String, PatternError> {
        let quantify = |body: String, grouped: bool, count: &Option<Count>| match count {
            Some(count) if grouped => format!("(?:{body}){}", count.quantifier()),
            Some(count) => format!("{body}{}", count.quantifier()),
            None => body,
        };
        Ok(match self {
            Matcher::Start => "^".to_string(),
            Matcher::End => "$".to_string(),
            Matcher::Anchor => ANCHOR_PLACEHOLDER.to_string(),
            Matcher::Any { count } => quantify(ANY_PATTERN.to_string(), false, count),
            Matcher::Char { cps, count } => quantify(literal(cps), cps.len() > 1, count),
            Matcher::Choice {
                alternatives,
                count,
            } => {
                let parts = alternatives
                    .iter()
                    .map(|m| m.pattern(ctx, exp))
                    .collect::<Result<Vec<_>, _>>()?;
                let body = format!("(?:{})", parts.join("|"));
                quantify(body, false, count)
            }
            Matcher::LookAhead(body) => format!("(?={})", sequence(body, ctx, exp)?),
            Matcher::LookBehind(body) => lookbehind(&sequence_widths(body, ctx, exp)?),
            Matcher::Class { class, count } => {
                let set = class.compile_inner(ctx, exp)?;
                quantify(set.to_class_pattern(), false, count)
            }
            Matcher::Rule { rule, count } => {
                let body = expand_rule(rule, ctx, exp, sequence)?;
                quantify(format!("(?:{body})"), false, count)
            }
        })
    }

    /// Fixed-width renderings of this matcher inside a look-behind.
    fn widths(
        &self,
        ctx: &CompileContext<'_>,
        exp: &mut Expansion,
    ) -> Result<Widths, PatternError> {
        match self {
            Matcher::Start => Ok(single(0, "^".to_string())),
            Matcher::End => Ok(single(0, "$".to_string())),
            Matcher::Anchor => Err(PatternError::Validation(
                "anchor inside a look-around".to_string(),
            )),
            Matcher::Any { count } => repeat(single(1, ANY_PATTERN.to_string()), count.as_ref()),
            Matcher::Char { cps, count } => repeat(single(cps.len(), literal(cps)), count.as_ref()),
            Matcher::Choice {
                alternatives,
                count,
            } => {
                let mut all = Widths::new();
                for alternative in alternatives {
                    merge(&mut all, alternative.widths(ctx, exp)?);
                }
                repeat(check_size(all)?, count.as_ref())
            }
            Matcher::LookAhead(_) | Matcher::LookBehind(_) => {
                Ok(single(0, self.pattern(ctx, exp)?))
            }
            Matcher::Class { class, count } => {
                let set = class.compile_inner(ctx, exp)?;
                repeat(single(1, set.to_class_pattern()), count.as_ref())
            }
            Matcher::Rule { rule, count } => {
                let body = expand_rule(rule, ctx, exp, sequence_widths)?;
                repeat(body, count.as_ref())
            }
        }
    }
}

/// Render the body of a rule matcher, following named references.
fn expand_rule<T>(
    rule: &RuleRef,
    ctx: &CompileContext<'_>,
    exp: &mut Expansion,
    render: fn(&[Matcher], &CompileContext<'_>, &mut Expansion) -> Result<T, PatternError>,
) -> Result<T, PatternError> {
    match rule {
        RuleRef::Inline(body) => render(body, ctx, exp),
        RuleRef::Named(name) => {
            let rule = ctx
                .rules
                .get(name)
                .ok_or_else(|| PatternError::UndefinedRule(name.clone()))?;
            exp.enter(name)?;
            let body = render(&rule.matchers, ctx, exp);
            exp.leave();
            body
        }
    }
}

/// Concatenate the patterns of a matcher list.
pub(crate) fn sequence(
    matchers: &[Matcher],
    ctx: &CompileContext<'_>,
    exp: &mut Expansion,
) -> Result<String, PatternError> {
    let mut out = String::new();
    for m in matchers {
        out.push_str(&m.pattern(ctx, exp)?);
    }
    Ok(out)
}

fn sequence_widths(
    matchers: &[Matcher],
    ctx: &CompileContext<'_>,
    exp: &mut Expansion,
) -> Result<Widths, PatternError> {
    let mut out = single(0, String::new());
    for m in matchers {
        out = concat(&out, &m.widths(ctx, exp)?)?;
    }
    Ok(out)
}
