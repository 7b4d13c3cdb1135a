//! Parse tree for the rule language, consumed by the compiler.

use crate::features::FeatureValue;

#[derive(Debug, Clone)]
pub(crate) enum Item {
    Law(LawDecl),
    Group(GroupDecl),
}

#[derive(Debug, Clone)]
pub(crate) struct LawDecl {
    pub meta: MetaBlock,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone)]
pub(crate) struct GroupDecl {
    pub meta: MetaBlock,
    pub laws: Vec<LawDecl>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MetaBlock {
    pub name: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    /// `WITH "<library>" "<version>"` header.
    pub library: Option<(String, String)>,
}

#[derive(Debug, Clone)]
pub(crate) enum Statement {
    /// `domain -> codomain` with an optional `| condition` guard.
    Rewrite {
        domain: RewriteTerm,
        codomain: RewriteTerm,
        condition: Option<ConditionList>,
    },
    /// `domain => c1 | cond1 => c2 | cond2 => default`.
    Conditional {
        domain: RewriteTerm,
        branches: Vec<(RewriteTerm, ConditionList)>,
        default: RewriteTerm,
    },
    Call {
        name: String,
        args: Vec<CallArg>,
    },
}

/// A domain or codomain: a phoneme literal (kept raw until the compiler
/// tokenizes it against the model), a brace set, or a feature bracket.
#[derive(Debug, Clone)]
pub(crate) enum RewriteTerm {
    Phonemes(String),
    Set(Vec<String>),
    Features(Vec<(String, FeatureValue)>),
}

#[derive(Debug, Clone)]
pub(crate) enum CallArg {
    Phonemes(String),
    Set(Vec<String>),
    Features(Vec<(String, FeatureValue)>),
    Number(i64),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct ConditionList {
    pub terms: Vec<ConditionTerm>,
}

#[derive(Debug, Clone)]
pub(crate) struct ConditionTerm {
    /// Joined by `|` rather than `&`. The first term always joins by `&`.
    pub or_joined: bool,
    pub negated: bool,
    pub expr: ConditionExpr,
}

#[derive(Debug, Clone)]
pub(crate) enum ConditionExpr {
    /// A positional template around the current phoneme, e.g. `/s/ _ #`.
    Relative(Vec<RelSlot>),
    /// `in Syllable[1]`, `in Phoneme[@0]`.
    In(IndexExpr),
    /// `<path> is <value>`.
    Is { path: PathExpr, value: IsValue },
    /// `<path> = <path>`.
    Eq { left: PathExpr, right: PathExpr },
}

#[derive(Debug, Clone)]
pub(crate) enum RelSlot {
    Here,
    Boundary,
    Literal(String),
    Features(Vec<(String, FeatureValue)>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Counter {
    Syllable,
    Phoneme,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum IndexKind {
    /// `[i]`; negative indices count from the end.
    Absolute(i64),
    /// `[@n]`, relative to the cursor.
    Offset(i64),
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct IndexExpr {
    pub counter: Counter,
    pub index: IndexKind,
}

#[derive(Debug, Clone)]
pub(crate) struct PathExpr {
    pub base: IndexExpr,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
    Nucleus,
    Onset,
    Coda,
    Quality,
    IsMonosyllable,
    IsStressed,
}

#[derive(Debug, Clone)]
pub(crate) enum IsValue {
    Phonemes(String),
    Features(Vec<(String, FeatureValue)>),
    Bool(bool),
}
