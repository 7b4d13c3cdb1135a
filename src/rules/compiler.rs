use crate::features::{FeatureModel, FeatureValue};
use crate::phoneme::{Phoneme, FT_LONG};
use crate::rules::ast::*;
use crate::rules::library::{self, Arg, Library};
use crate::rules::soundlaw::{LawMeta, Program, ProgramItem, SoundLaw, SoundLawGroup};
use crate::rules::CompileError;
use crate::transducer::{Rule, RuleError, Transducer};
use crate::word::Syllable;
use std::sync::Arc;

/// A condition that can be attached to several rules (the branches of a
/// conditional all share their guard).
type SharedCondition = Arc<dyn Fn(&Transducer) -> bool + Send + Sync>;

pub(crate) fn compile_items(
    items: Vec<Item>,
    model: &Arc<FeatureModel>,
    library: &Library,
) -> Result<Program, CompileError> {
    let compiler = Compiler {
        model: Arc::clone(model),
        library,
    };
    let mut compiled = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Item::Law(law) => compiled.push(ProgramItem::Law(compiler.compile_law(law)?)),
            Item::Group(group) => {
                let meta = meta_of(&group.meta);
                compiler.check_library(&meta)?;
                let mut laws = Vec::with_capacity(group.laws.len());
                for law in group.laws {
                    laws.push(compiler.compile_law(law)?);
                }
                compiled.push(ProgramItem::Group(SoundLawGroup::new(meta, laws)));
            }
        }
    }
    Ok(Program::new(compiled))
}

fn meta_of(block: &MetaBlock) -> LawMeta {
    LawMeta {
        name: block.name.clone(),
        description: block.description.clone(),
        date: block.date.clone(),
        library_name: block.library.as_ref().map(|(n, _)| n.clone()),
        library_version: block.library.as_ref().map(|(_, v)| v.clone()),
    }
}

struct Compiler<'a> {
    model: Arc<FeatureModel>,
    library: &'a Library,
}

impl Compiler<'_> {
    fn check_library(&self, meta: &LawMeta) -> Result<(), CompileError> {
        if let Some(expected) = &meta.library_name {
            if expected != self.library.name() {
                return Err(CompileError::LibraryMismatch {
                    expected: expected.clone(),
                    found: self.library.name().to_string(),
                });
            }
        }
        if let Some(expected) = &meta.library_version {
            let major = |v: &str| v.split('.').next().unwrap_or(v).to_string();
            if major(expected) != major(self.library.version()) {
                return Err(CompileError::LibraryVersion {
                    expected: expected.clone(),
                    found: self.library.version().to_string(),
                });
            }
        }
        Ok(())
    }

    fn compile_law(&self, law: LawDecl) -> Result<SoundLaw, CompileError> {
        let meta = meta_of(&law.meta);
        self.check_library(&meta)?;
        let mut rules = Vec::with_capacity(law.statements.len());
        for statement in law.statements {
            rules.push(self.compile_statement(statement)?);
        }
        Ok(SoundLaw::new(meta, rules))
    }

    fn compile_statement(&self, statement: Statement) -> Result<Rule, CompileError> {
        match statement {
            Statement::Rewrite {
                domain,
                codomain,
                condition,
            } => {
                let mut rules = self.compile_rewrite(&domain, &codomain)?;
                if let Some(list) = condition {
                    let guard = self.compile_condition_list(&list)?;
                    rules = attach_condition(rules, &guard);
                }
                Ok(wrap(rules))
            }
            Statement::Conditional {
                domain,
                branches,
                default,
            } => {
                let mut rules = Vec::new();
                for (codomain, condition) in &branches {
                    let branch_rules = self.compile_rewrite(&domain, codomain)?;
                    let guard = self.compile_condition_list(condition)?;
                    rules.extend(attach_condition(branch_rules, &guard));
                }
                rules.extend(self.compile_rewrite(&domain, &default)?);
                Ok(Rule::group(rules))
            }
            Statement::Call { name, args } => {
                let combinator = match self.library.get(&name) {
                    Some(f) => f,
                    None => {
                        log::warn!(
                            "unknown function '{}' in rule program, compiled to identity",
                            name
                        );
                        return Ok(Rule::identity());
                    }
                };
                let mut compiled = Vec::with_capacity(args.len());
                for arg in args {
                    compiled.push(self.compile_arg(arg)?);
                }
                combinator(&compiled)
            }
        }
    }

    fn compile_arg(&self, arg: CallArg) -> Result<Arg, CompileError> {
        Ok(match arg {
            CallArg::Phonemes(raw) => Arg::Phonemes(self.tokenize_phonemes(&raw)?),
            CallArg::Set(raws) => {
                let mut seqs = Vec::with_capacity(raws.len());
                for raw in raws {
                    seqs.push(self.tokenize_phonemes(&raw)?);
                }
                Arg::List(seqs)
            }
            CallArg::Features(bundle) => Arg::Features(self.check_bundle(bundle)?),
            CallArg::Number(n) => Arg::Number(n),
            CallArg::Text(s) => Arg::Text(s),
        })
    }

    /// Splits a phoneme literal into segments against the model and builds
    /// the phonemes. An empty literal is a deletion codomain.
    fn tokenize_phonemes(&self, raw: &str) -> Result<Vec<Phoneme>, CompileError> {
        let mut tokens: Vec<String> = Vec::new();
        for c in raw.chars() {
            if self.model.is_diacritic(c) {
                match tokens.last_mut() {
                    Some(token) => token.push(c),
                    None => return Err(CompileError::UnknownSymbol(c.to_string())),
                }
            } else {
                tokens.push(c.to_string());
            }
        }
        let mut phonemes = Vec::with_capacity(tokens.len());
        for token in tokens {
            let phoneme = Phoneme::from_ipa(&self.model, &token)
                .map_err(|_| CompileError::UnknownSymbol(token.clone()))?;
            phonemes.push(phoneme);
        }
        Ok(phonemes)
    }

    fn check_bundle(
        &self,
        bundle: Vec<(String, FeatureValue)>,
    ) -> Result<Vec<(String, FeatureValue)>, CompileError> {
        for (name, _) in &bundle {
            if !self.model.has_feature(name) {
                return Err(CompileError::UnknownFeature(name.clone()));
            }
        }
        Ok(bundle)
    }

    fn compile_rewrite(
        &self,
        domain: &RewriteTerm,
        codomain: &RewriteTerm,
    ) -> Result<Vec<Rule>, CompileError> {
        match (domain, codomain) {
            (RewriteTerm::Phonemes(d), RewriteTerm::Phonemes(c)) => {
                let dom = self.tokenize_phonemes(d)?;
                if dom.is_empty() {
                    return Err(CompileError::InvalidRewrite(String::from(
                        "the domain cannot be empty",
                    )));
                }
                let cod = self.tokenize_phonemes(c)?;
                Ok(vec![replace_rule(dom, cod)])
            }
            (RewriteTerm::Set(ds), RewriteTerm::Set(cs)) => {
                if ds.len() != cs.len() {
                    return Err(CompileError::LengthMismatch {
                        domain: ds.len(),
                        codomain: cs.len(),
                    });
                }
                let mut rules = Vec::with_capacity(ds.len());
                for (d, c) in ds.iter().zip(cs.iter()) {
                    let dom = self.tokenize_phonemes(d)?;
                    if dom.is_empty() {
                        return Err(CompileError::InvalidRewrite(String::from(
                            "the domain cannot be empty",
                        )));
                    }
                    let cod = self.tokenize_phonemes(c)?;
                    rules.push(replace_rule(dom, cod));
                }
                Ok(rules)
            }
            (RewriteTerm::Features(db), RewriteTerm::Features(cb)) => {
                let domain = self.check_bundle(db.clone())?;
                let codomain = self.check_bundle(cb.clone())?;
                Ok(vec![Rule::segments(
                    bundle_predicate(domain),
                    Box::new(move |_, seg| {
                        let current = seg.first().ok_or(RuleError::MissingSegment)?;
                        Ok(vec![library::apply_features(current, &codomain)?])
                    }),
                )])
            }
            (RewriteTerm::Features(db), RewriteTerm::Phonemes(c)) => {
                let domain = self.check_bundle(db.clone())?;
                let cod = self.tokenize_phonemes(c)?;
                Ok(vec![Rule::segments(
                    bundle_predicate(domain),
                    Box::new(move |_, _| Ok(cod.clone())),
                )])
            }
            _ => Err(CompileError::InvalidRewrite(String::from(
                "domain and codomain forms are incompatible",
            ))),
        }
    }

    fn compile_condition_list(&self, list: &ConditionList) -> Result<SharedCondition, CompileError> {
        let mut all_of: Vec<SharedCondition> = Vec::new();
        let mut any_of: Vec<SharedCondition> = Vec::new();
        for term in &list.terms {
            let mut compiled = self.compile_condition_expr(&term.expr)?;
            if term.negated {
                let inner = compiled;
                compiled = Arc::new(move |td| !inner(td));
            }
            if term.or_joined {
                any_of.push(compiled);
            } else {
                all_of.push(compiled);
            }
        }
        Ok(Arc::new(move |td| {
            all_of.iter().all(|c| c(td)) && (any_of.is_empty() || any_of.iter().any(|c| c(td)))
        }))
    }

    fn compile_condition_expr(&self, expr: &ConditionExpr) -> Result<SharedCondition, CompileError> {
        match expr {
            ConditionExpr::Relative(slots) => self.compile_relative(slots),
            ConditionExpr::In(index) => Ok(compile_in(*index)),
            ConditionExpr::Is { path, value } => {
                let accessor = self.compile_path(path)?;
                let pattern = self.compile_is_value(value)?;
                Ok(Arc::new(move |td| {
                    accessor(td)
                        .map(|v| pattern_matches(&pattern, &v))
                        .unwrap_or(false)
                }))
            }
            ConditionExpr::Eq { left, right } => {
                let left = self.compile_path(left)?;
                let right = self.compile_path(right)?;
                Ok(Arc::new(move |td| match (left(td), right(td)) {
                    (Some(a), Some(b)) => value_eq(&a, &b),
                    _ => false,
                }))
            }
        }
    }

    fn compile_relative(&self, slots: &[RelSlot]) -> Result<SharedCondition, CompileError> {
        enum Expanded {
            Here,
            Boundary,
            Check(SlotCheck),
        }

        let mut expanded = Vec::new();
        for slot in slots {
            match slot {
                RelSlot::Here => expanded.push(Expanded::Here),
                RelSlot::Boundary => expanded.push(Expanded::Boundary),
                RelSlot::Literal(raw) => {
                    let seq = self.tokenize_phonemes(raw)?;
                    if seq.is_empty() {
                        return Err(CompileError::InvalidCondition(String::from(
                            "empty phoneme literal in a template",
                        )));
                    }
                    for p in seq {
                        expanded
                            .push(Expanded::Check(SlotCheck::Symbol(p.symbol().to_string())));
                    }
                }
                RelSlot::Features(bundle) => {
                    let bundle = self.check_bundle(bundle.clone())?;
                    expanded.push(Expanded::Check(SlotCheck::Features(bundle)));
                }
            }
        }

        // Boundaries assert distance from the word edge; they occupy no slot.
        let left_bound = matches!(expanded.first(), Some(Expanded::Boundary));
        if left_bound {
            expanded.remove(0);
        }
        let right_bound = matches!(expanded.last(), Some(Expanded::Boundary));
        if right_bound {
            expanded.pop();
        }
        if expanded.iter().any(|e| matches!(e, Expanded::Boundary)) {
            return Err(CompileError::InvalidCondition(String::from(
                "'#' must sit at the edge of a template",
            )));
        }

        let here = expanded
            .iter()
            .position(|e| matches!(e, Expanded::Here))
            .ok_or_else(|| {
                CompileError::InvalidCondition(String::from("a template needs a '_'"))
            })?;

        let mut checks: Vec<(i64, SlotCheck)> = Vec::new();
        for (i, e) in expanded.into_iter().enumerate() {
            match e {
                Expanded::Check(check) => checks.push((i as i64 - here as i64, check)),
                Expanded::Here if i != here => {
                    return Err(CompileError::InvalidCondition(String::from(
                        "a template needs exactly one '_'",
                    )))
                }
                _ => {}
            }
        }

        let left_assert = if left_bound { Some(here) } else { None };
        let right_len = checks
            .iter()
            .filter(|(offset, _)| *offset > 0)
            .count();
        let right_assert = if right_bound { Some(right_len) } else { None };

        Ok(Arc::new(move |td| {
            if let Some(k) = left_assert {
                if td.distance_from_start() != k {
                    return false;
                }
            }
            if let Some(k) = right_assert {
                if td.distance_from_end() != k {
                    return false;
                }
            }
            checks.iter().all(|(offset, check)| {
                td.phoneme_at(*offset)
                    .map(|p| check.matches(p))
                    .unwrap_or(false)
            })
        }))
    }

    fn compile_path(&self, path: &PathExpr) -> Result<Accessor, CompileError> {
        let IndexExpr { counter, index } = path.base;
        let mut accessor: Accessor = Arc::new(move |td| match counter {
            Counter::Syllable => {
                let syllable = match index {
                    IndexKind::Absolute(i) => td.syllable_at(i),
                    IndexKind::Offset(o) => td.syllable_offset(o),
                }?;
                Some(Value::Syllable(syllable.clone()))
            }
            Counter::Phoneme => {
                let phoneme = match index {
                    IndexKind::Absolute(i) => td.phoneme_at_index(i),
                    IndexKind::Offset(o) => td.phoneme_at(o),
                }?;
                Some(Value::Phoneme(phoneme.clone()))
            }
        });
        for field in &path.fields {
            let field = *field;
            let prev = accessor;
            accessor = Arc::new(move |td| apply_field(field, prev(td)?));
        }
        Ok(accessor)
    }

    fn compile_is_value(&self, value: &IsValue) -> Result<ValuePattern, CompileError> {
        Ok(match value {
            IsValue::Phonemes(raw) => {
                let seq = self.tokenize_phonemes(raw)?;
                if seq.is_empty() {
                    return Err(CompileError::InvalidCondition(String::from(
                        "empty phoneme literal after 'is'",
                    )));
                }
                ValuePattern::Symbols(seq.iter().map(|p| p.symbol()).collect())
            }
            IsValue::Features(bundle) => ValuePattern::Features(self.check_bundle(bundle.clone())?),
            IsValue::Bool(b) => ValuePattern::Bool(*b),
        })
    }
}

fn wrap(mut rules: Vec<Rule>) -> Rule {
    if rules.len() == 1 {
        match rules.pop() {
            Some(rule) => rule,
            None => Rule::identity(),
        }
    } else {
        Rule::group(rules)
    }
}

fn attach_condition(rules: Vec<Rule>, guard: &SharedCondition) -> Vec<Rule> {
    rules
        .into_iter()
        .map(|rule| {
            let guard = Arc::clone(guard);
            rule.when(Box::new(move |td| guard(td)))
        })
        .collect()
}

/// An unconditional `domain -> codomain` replacement; multi-segment domains
/// consume their whole run.
fn replace_rule(domain: Vec<Phoneme>, codomain: Vec<Phoneme>) -> Rule {
    let symbols: Vec<String> = domain.iter().map(|p| p.symbol().to_string()).collect();
    let window = symbols.len();
    Rule::span(
        window,
        Box::new(move |seg| {
            seg.len() == symbols.len()
                && seg.iter().zip(symbols.iter()).all(|(p, s)| p.is_symbol(s))
        }),
        Box::new(move |_, _| Ok(codomain.clone())),
    )
}

fn bundle_predicate(
    bundle: Vec<(String, FeatureValue)>,
) -> Box<dyn Fn(&[Phoneme]) -> bool + Send + Sync> {
    Box::new(move |seg| match seg.first() {
        Some(p) => bundle.iter().all(|(name, value)| p.feature_is(name, *value)),
        None => false,
    })
}

enum SlotCheck {
    Symbol(String),
    Features(Vec<(String, FeatureValue)>),
}

impl SlotCheck {
    fn matches(&self, p: &Phoneme) -> bool {
        match self {
            SlotCheck::Symbol(s) => p.is_symbol(s),
            SlotCheck::Features(bundle) => bundle
                .iter()
                .all(|(name, value)| p.feature_is(name, *value)),
        }
    }
}

fn compile_in(index: IndexExpr) -> SharedCondition {
    Arc::new(move |td| match (index.counter, index.index) {
        (Counter::Syllable, IndexKind::Absolute(i)) => {
            resolve_index(i, td.word().syllable_count()) == Some(td.syllable_index())
        }
        (Counter::Syllable, IndexKind::Offset(o)) => o == 0,
        (Counter::Phoneme, IndexKind::Absolute(i)) => {
            resolve_index(i, td.word().phoneme_count()) == Some(td.phoneme_index())
        }
        (Counter::Phoneme, IndexKind::Offset(o)) => o == 0,
    })
}

fn resolve_index(index: i64, count: usize) -> Option<usize> {
    let idx = if index < 0 {
        count as i64 + index
    } else {
        index
    };
    if idx < 0 || idx >= count as i64 {
        None
    } else {
        Some(idx as usize)
    }
}

/// A resolved path value during condition evaluation.
enum Value {
    Phoneme(Phoneme),
    Phonemes(Vec<Phoneme>),
    Syllable(Syllable),
    Bool(bool),
}

type Accessor = Arc<dyn Fn(&Transducer) -> Option<Value> + Send + Sync>;

fn apply_field(field: Field, value: Value) -> Option<Value> {
    match (field, value) {
        (Field::Nucleus, Value::Syllable(s)) => {
            s.structure().ok().map(|st| Value::Phonemes(st.nucleus.clone()))
        }
        (Field::Onset, Value::Syllable(s)) => {
            s.structure().ok().map(|st| Value::Phonemes(st.onset.clone()))
        }
        (Field::Coda, Value::Syllable(s)) => {
            s.structure().ok().map(|st| Value::Phonemes(st.coda.clone()))
        }
        (Field::Quality, Value::Phoneme(p)) => quality(&p),
        (Field::Quality, Value::Phonemes(v)) => v.first().and_then(quality),
        (Field::IsMonosyllable, Value::Syllable(s)) => Some(Value::Bool(s.is_monosyllable())),
        (Field::IsStressed, Value::Syllable(s)) => Some(Value::Bool(s.is_stressed())),
        _ => None,
    }
}

/// The vowel stripped of length, for quality comparisons.
fn quality(p: &Phoneme) -> Option<Value> {
    let mut q = p.clone();
    q.set_feature(FT_LONG, FeatureValue::Minus).ok()?;
    q.refresh_symbol().ok()?;
    Some(Value::Phoneme(q))
}

enum ValuePattern {
    Symbols(String),
    Features(Vec<(String, FeatureValue)>),
    Bool(bool),
}

fn pattern_matches(pattern: &ValuePattern, value: &Value) -> bool {
    match (pattern, value) {
        (ValuePattern::Symbols(s), Value::Phoneme(p)) => p.symbol() == s,
        (ValuePattern::Symbols(s), Value::Phonemes(v)) => {
            !v.is_empty() && v.iter().map(|p| p.symbol()).collect::<String>() == *s
        }
        (ValuePattern::Features(bundle), Value::Phoneme(p)) => bundle
            .iter()
            .all(|(name, value)| p.feature_is(name, *value)),
        (ValuePattern::Features(bundle), Value::Phonemes(v)) => {
            !v.is_empty()
                && v.iter().all(|p| {
                    bundle
                        .iter()
                        .all(|(name, value)| p.feature_is(name, *value))
                })
        }
        (ValuePattern::Bool(b), Value::Bool(x)) => b == x,
        _ => false,
    }
}

fn value_eq(a: &Value, b: &Value) -> bool {
    let concat = |v: &[Phoneme]| v.iter().map(|p| p.symbol()).collect::<String>();
    match (a, b) {
        (Value::Phoneme(x), Value::Phoneme(y)) => x.symbol() == y.symbol(),
        (Value::Phonemes(x), Value::Phonemes(y)) => {
            x.len() == y.len()
                && x.iter()
                    .zip(y.iter())
                    .all(|(p, q)| p.symbol() == q.symbol())
        }
        (Value::Phoneme(x), Value::Phonemes(y)) | (Value::Phonemes(y), Value::Phoneme(x)) => {
            concat(y) == x.symbol()
        }
        (Value::Syllable(x), Value::Syllable(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use crate::features::FeatureModel;
    use crate::rules::{compile, standard_library, CompileError, Library};
    use crate::word::{Word, WordFactory};
    use std::sync::Arc;

    fn factory() -> WordFactory {
        WordFactory::new(Arc::new(FeatureModel::monophone().unwrap()))
    }

    fn derive(factory: &WordFactory, source: &str, input: &str) -> Word {
        let program = compile(source, factory.model(), &standard_library()).unwrap();
        program.apply(&factory.make_word(input).unwrap())
    }

    #[test]
    fn simple_unconditional() {
        let wf = factory();
        let out = derive(&wf, "CHANGE BEGIN /p/ -> /b/; END", "'apa");
        assert_eq!(out.to_string(), "/'a.ba/");
    }

    #[test]
    fn multiple_unconditional_is_elementwise() {
        let wf = factory();
        let out = derive(&wf, "CHANGE BEGIN {/i/,/u/} -> {/e/,/o/}; END", "ki.tu");
        assert_eq!(out.to_string(), "/ke.to/");
    }

    #[test]
    fn set_length_mismatch_is_rejected() {
        let wf = factory();
        let err = compile(
            "CHANGE BEGIN {/i/,/u/} -> {/e/}; END",
            wf.model(),
            &standard_library(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CompileError::LengthMismatch {
                domain: 2,
                codomain: 1
            }
        ));
    }

    #[test]
    fn feature_change_rewrites_features() {
        let wf = factory();
        let out = derive(&wf, "CHANGE BEGIN [+sibilant] -> [+voice]; END", "ma'sa.la");
        assert_eq!(out.to_string(), "/ma.'za.la/");
    }

    #[test]
    fn replace_by_feature() {
        let wf = factory();
        let out = derive(&wf, "CHANGE BEGIN [+nasal] -> /n/; END", "ma.ŋa");
        assert_eq!(out.to_string(), "/na.na/");
    }

    #[test]
    fn guarded_rewrite_only_fires_in_context() {
        let wf = factory();
        let source = "CHANGE BEGIN /p/ -> /m/ | _ /s/; END";
        assert_eq!(derive(&wf, source, "a'sap").to_string(), "/a.'sap/");
        assert_eq!(derive(&wf, source, "ap.sa").to_string(), "/am.sa/");
    }

    #[test]
    fn intervocalic_feature_guard() {
        let wf = factory();
        let out = derive(
            &wf,
            "CHANGE BEGIN [-continuant -voice] -> [+voice] | [-consonantal] _ [-consonantal]; END",
            "'apa",
        );
        assert_eq!(out.to_string(), "/'a.ba/");
    }

    #[test]
    fn conditional_falls_back_to_default() {
        let wf = factory();
        let source =
            "CHANGE BEGIN /k/ => /g/ | [-consonantal] _ [-consonantal] => /x/; END";
        assert_eq!(derive(&wf, source, "ta'ke").to_string(), "/ta.'ge/");
        assert_eq!(derive(&wf, source, "ka.ta").to_string(), "/xa.ta/");
    }

    #[test]
    fn word_initial_boundary() {
        let wf = factory();
        let source = "CHANGE BEGIN /h/ -> // | # _; END";
        assert_eq!(derive(&wf, source, "ha.hi").to_string(), "/a.hi/");
    }

    #[test]
    fn word_final_boundary() {
        let wf = factory();
        let source = "CHANGE BEGIN /s/ -> // | _ #; END";
        assert_eq!(derive(&wf, source, "sa.tas").to_string(), "/sa.ta/");
    }

    #[test]
    fn boundary_with_inner_slot() {
        let wf = factory();
        // only a vowel one segment from the word end lengthens
        let source = "CHANGE BEGIN /a/ -> /a\u{02D0}/ | _ [+consonantal] #; END";
        assert_eq!(derive(&wf, source, "ta.tat").to_string(), "/ta.ta\u{02D0}t/");
    }

    #[test]
    fn in_syllable_condition() {
        let wf = factory();
        let source = "CHANGE BEGIN /a/ -> /e/ | in Syllable[0]; END";
        assert_eq!(derive(&wf, source, "ta.ta").to_string(), "/te.ta/");
    }

    #[test]
    fn in_syllable_negative_index() {
        let wf = factory();
        let source = "CHANGE BEGIN /a/ -> /e/ | in Syllable[-1]; END";
        assert_eq!(derive(&wf, source, "ta.ta").to_string(), "/ta.te/");
    }

    #[test]
    fn is_stressed_path_condition() {
        let wf = factory();
        let source = "CHANGE BEGIN /b/ -> /v/ | Syllable[1].is_stressed is true; END";
        assert_eq!(derive(&wf, source, "'be.ko.mu").to_string(), "/'be.ko.mu/");
        assert_eq!(derive(&wf, source, "be.'ko.mu").to_string(), "/ve.'ko.mu/");
    }

    #[test]
    fn nucleus_is_phoneme_value() {
        let wf = factory();
        let source = "CHANGE BEGIN /t/ -> /d/ | Syllable[@0].nucleus is /a/; END";
        assert_eq!(derive(&wf, source, "ta.te").to_string(), "/da.te/");
    }

    #[test]
    fn nucleus_equality_across_syllables() {
        let wf = factory();
        let source =
            "CHANGE BEGIN /t/ -> /d/ | Syllable[@0].nucleus = Syllable[@1].nucleus; END";
        assert_eq!(derive(&wf, source, "ta.ta.te").to_string(), "/da.ta.te/");
    }

    #[test]
    fn quality_strips_length() {
        let wf = factory();
        let source =
            "CHANGE BEGIN /t/ -> /d/ | Syllable[@0].nucleus.quality = Syllable[@1].nucleus.quality; END";
        assert_eq!(derive(&wf, source, "ta\u{02D0}.ta").to_string(), "/da\u{02D0}.ta/");
    }

    #[test]
    fn negated_condition() {
        let wf = factory();
        let source = "CHANGE BEGIN /a/ -> /e/ | ! in Syllable[0]; END";
        assert_eq!(derive(&wf, source, "ta.ta").to_string(), "/ta.te/");
    }

    #[test]
    fn or_joined_conditions() {
        let wf = factory();
        let source = "CHANGE BEGIN /a/ -> /e/ | in Syllable[0] | in Syllable[2]; END";
        assert_eq!(derive(&wf, source, "ta.ta.ta").to_string(), "/te.ta.te/");
    }

    #[test]
    fn multi_phoneme_domain_collapses() {
        let wf = factory();
        let out = derive(&wf, "CHANGE BEGIN /ai/ -> /e/; END", "tai.ta");
        assert_eq!(out.to_string(), "/te.ta/");
    }

    #[test]
    fn deletion_codomain() {
        let wf = factory();
        let out = derive(&wf, "CHANGE BEGIN /h/ -> //; END", "ha.ta");
        assert_eq!(out.to_string(), "/a.ta/");
    }

    #[test]
    fn law_order_within_group_block() {
        let wf = factory();
        let out = derive(&wf, "CHANGE BEGIN /u/ -> /o/; /k/ -> /g/; END", "uk.tu'ku");
        assert_eq!(out.to_string(), "/og.to.'go/");
    }

    #[test]
    fn group_of_laws_applies_in_order() {
        let wf = factory();
        let source = "GROUP \
                      CHANGE BEGIN /u/ -> /o/; END \
                      CHANGE BEGIN /o/ -> /a/; END \
                      END";
        assert_eq!(derive(&wf, source, "tu").to_string(), "/ta/");
    }

    #[test]
    fn unknown_feature_is_a_compile_error() {
        let wf = factory();
        let err = compile(
            "CHANGE BEGIN [+flavour] -> /a/; END",
            wf.model(),
            &standard_library(),
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::UnknownFeature(_)));
    }

    #[test]
    fn unknown_symbol_is_a_compile_error() {
        let wf = factory();
        let err = compile(
            "CHANGE BEGIN /q/ -> /a/; END",
            wf.model(),
            &standard_library(),
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::UnknownSymbol(_)));
    }

    #[test]
    fn unknown_function_compiles_to_identity() {
        let wf = factory();
        let out = derive(&wf, "CHANGE BEGIN Frobnicate(/a/); END", "ta");
        assert_eq!(out.to_string(), "/ta/");
    }

    #[test]
    fn library_call_through_program() {
        let wf = factory();
        let out = derive(&wf, "CHANGE BEGIN IntervocalVoicing(/t/); END", "a.ta");
        assert_eq!(out.to_string(), "/a.da/");
    }

    #[test]
    fn library_name_is_checked() {
        let wf = factory();
        let err = compile(
            "WITH \"exotic\" \"0.1.0\" CHANGE BEGIN /p/ -> /b/; END",
            wf.model(),
            &standard_library(),
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::LibraryMismatch { .. }));
    }

    #[test]
    fn library_major_version_is_checked() {
        let wf = factory();
        let err = compile(
            "WITH \"standard\" \"2.0.0\" CHANGE BEGIN /p/ -> /b/; END",
            wf.model(),
            &standard_library(),
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::LibraryVersion { .. }));
        // same major, different minor is fine
        compile(
            "WITH \"standard\" \"0.9.9\" CHANGE BEGIN /p/ -> /b/; END",
            wf.model(),
            &standard_library(),
        )
        .unwrap();
    }

    #[test]
    fn empty_library_falls_back_to_identity() {
        let wf = factory();
        let library = Library::new("bare", "0.1.0");
        let program = compile(
            "CHANGE BEGIN Metathesis(/r/, /a/); END",
            wf.model(),
            &library,
        )
        .unwrap();
        let word = wf.make_word("ra").unwrap();
        assert_eq!(program.apply(&word), word);
    }

    #[test]
    fn incompatible_forms_are_rejected() {
        let wf = factory();
        let err = compile(
            "CHANGE BEGIN /a/ -> [+long]; END",
            wf.model(),
            &standard_library(),
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::InvalidRewrite(_)));
    }
}
