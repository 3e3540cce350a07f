//! Code point classes and their set algebra.

use tracing::warn;

use super::{CompileContext, Expansion, PatternError};
use crate::unicode::PointSet;

/// Set operator of a combinator class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    Complement,
    Union,
    Intersection,
    Difference,
    SymmetricDifference,
}

impl SetOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetOp::Complement => "complement",
            SetOp::Union => "union",
            SetOp::Intersection => "intersection",
            SetOp::Difference => "difference",
            SetOp::SymmetricDifference => "symmetric-difference",
        }
    }
}

/// A class expression: leaf sets and combinators.
///
/// Fixed-arity operators hold their operands directly; only `Union` carries
/// a variable list and is checked by [`ClassExpr::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassExpr {
    /// Explicit code points.
    CodePoints(PointSet),
    /// Every code point whose entry carries the tag.
    Tag(String),
    /// Unicode property such as `sc:Latn`.
    Property(String),
    /// Reference to a named class.
    Ref(String),
    Complement(Box<ClassExpr>),
    Union(Vec<ClassExpr>),
    Intersection(Box<ClassExpr>, Box<ClassExpr>),
    Difference(Box<ClassExpr>, Box<ClassExpr>),
    SymmetricDifference(Box<ClassExpr>, Box<ClassExpr>),
}

/// A named class declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Class {
    pub name: String,
    pub comment: Option<String>,
    pub references: Vec<String>,
    pub body: ClassExpr,
}

impl Class {
    pub fn new(name: &str, body: ClassExpr) -> Self {
        Self {
            name: name.to_string(),
            comment: None,
            references: Vec::new(),
            body,
        }
    }

    pub fn validate(&self) -> Result<(), PatternError> {
        if self.name.trim().is_empty() {
            return Err(PatternError::Validation(
                "class declaration without a name".to_string(),
            ));
        }
        self.body.validate()
    }
}

impl ClassExpr {
    pub fn code_points<I: IntoIterator<Item = u32>>(cps: I) -> Self {
        ClassExpr::CodePoints(cps.into_iter().collect())
    }

    /// Build a combinator from a child list, checking the operator arity:
    /// complement takes one child, union at least two, the rest exactly two.
    pub fn combine(op: SetOp, children: Vec<ClassExpr>) -> Result<ClassExpr, PatternError> {
        let arity_error = |expected: &str, got: usize| {
            PatternError::Validation(format!(
                "{} class needs {expected} children, got {got}",
                op.as_str()
            ))
        };
        let got = children.len();
        match op {
            SetOp::Complement => {
                let mut it = children.into_iter();
                match (it.next(), it.next()) {
                    (Some(child), None) => Ok(ClassExpr::Complement(Box::new(child))),
                    _ => Err(arity_error("exactly 1", got)),
                }
            }
            SetOp::Union => {
                if got < 2 {
                    return Err(arity_error("at least 2", got));
                }
                Ok(ClassExpr::Union(children))
            }
            SetOp::Intersection | SetOp::Difference | SetOp::SymmetricDifference => {
                let mut it = children.into_iter();
                let (Some(a), Some(b), None) = (it.next(), it.next(), it.next()) else {
                    return Err(arity_error("exactly 2", got));
                };
                let (a, b) = (Box::new(a), Box::new(b));
                Ok(match op {
                    SetOp::Intersection => ClassExpr::Intersection(a, b),
                    SetOp::Difference => ClassExpr::Difference(a, b),
                    _ => ClassExpr::SymmetricDifference(a, b),
                })
            }
        }
    }

    /// Structural checks that do not need the lookup tables.
    pub fn validate(&self) -> Result<(), PatternError> {
        match self {
            ClassExpr::CodePoints(_) => Ok(()),
            ClassExpr::Tag(name) | ClassExpr::Property(name) | ClassExpr::Ref(name) => {
                if name.trim().is_empty() {
                    Err(PatternError::Validation(
                        "class reference with an empty name".to_string(),
                    ))
                } else {
                    Ok(())
                }
            }
            ClassExpr::Complement(child) => child.validate(),
            ClassExpr::Union(children) => {
                if children.len() < 2 {
                    return Err(PatternError::Validation(format!(
                        "union class needs at least 2 children, got {}",
                        children.len()
                    )));
                }
                children.iter().try_for_each(ClassExpr::validate)
            }
            ClassExpr::Intersection(a, b)
            | ClassExpr::Difference(a, b)
            | ClassExpr::SymmetricDifference(a, b) => {
                a.validate()?;
                b.validate()
            }
        }
    }

    pub fn compile(&self, ctx: &CompileContext<'_>) -> Result<PointSet, PatternError> {
        self.compile_inner(ctx, &mut Expansion::default())
    }

    pub(crate) fn compile_inner(
        &self,
        ctx: &CompileContext<'_>,
        exp: &mut Expansion,
    ) -> Result<PointSet, PatternError> {
        Ok(match self {
            ClassExpr::CodePoints(set) => set.clone(),
            ClassExpr::Tag(tag) => match ctx.tags.get(tag) {
                Some(set) => set.clone(),
                None => {
                    warn!(
                        tag = %tag,
                        "class refers to an undeclared tag, matching every code point"
                    );
                    PointSet::all()
                }
            },
            ClassExpr::Property(name) => ctx.db.property_set(name)?,
            ClassExpr::Ref(name) => {
                let class = ctx
                    .classes
                    .get(name)
                    .ok_or_else(|| PatternError::UndefinedClass(name.clone()))?;
                exp.enter(name)?;
                let set = class.body.compile_inner(ctx, exp);
                exp.leave();
                set?
            }
            ClassExpr::Complement(child) => child.compile_inner(ctx, exp)?.complement(),
            ClassExpr::Union(children) => {
                let mut set = PointSet::new();
                for child in children {
                    set = set.union(&child.compile_inner(ctx, exp)?);
                }
                set
            }
            ClassExpr::Intersection(a, b) => a
                .compile_inner(ctx, exp)?
                .intersection(&b.compile_inner(ctx, exp)?),
            ClassExpr::Difference(a, b) => a
                .compile_inner(ctx, exp)?
                .difference(&b.compile_inner(ctx, exp)?),
            ClassExpr::SymmetricDifference(a, b) => a
                .compile_inner(ctx, exp)?
                .symmetric_difference(&b.compile_inner(ctx, exp)?),
        })
    }

    /// Names of classes referenced anywhere in the tree.
    pub fn referenced_classes<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            ClassExpr::Ref(name) => out.push(name),
            ClassExpr::Complement(child) => child.referenced_classes(out),
            ClassExpr::Union(children) => {
                for child in children {
                    child.referenced_classes(out);
                }
            }
            ClassExpr::Intersection(a, b)
            | ClassExpr::Difference(a, b)
            | ClassExpr::SymmetricDifference(a, b) => {
                a.referenced_classes(out);
                b.referenced_classes(out);
            }
            ClassExpr::CodePoints(_) | ClassExpr::Tag(_) | ClassExpr::Property(_) => {}
        }
    }
}
