//! The combinator library the rule language dispatches function calls to.
//!
//! A library maps function names to combinators that build [`Rule`]s from
//! compiled arguments. The [`standard_library`] carries the baseline set;
//! hosts can register their own combinators on top.

use crate::features::FeatureValue;
use crate::phoneme::{Phoneme, FT_LONG, FT_VOICE};
use crate::rules::CompileError;
use crate::transducer::{Rule, RuleError};
use indexmap::IndexMap;
use std::fmt;

/// A compiled argument of a rule-program function call.
#[derive(Debug, Clone)]
pub enum Arg {
    Phonemes(Vec<Phoneme>),
    List(Vec<Vec<Phoneme>>),
    Features(Vec<(String, FeatureValue)>),
    Number(i64),
    Text(String),
}

pub type Combinator = Box<dyn Fn(&[Arg]) -> Result<Rule, CompileError> + Send + Sync>;

/// A named, versioned registry of rule combinators.
pub struct Library {
    name: String,
    version: String,
    funcs: IndexMap<String, Combinator>,
}

impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Library")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("functions", &self.funcs.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Library {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Library {
        Library {
            name: name.into(),
            version: version.into(),
            funcs: IndexMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, combinator: Combinator) {
        self.funcs.insert(name.into(), combinator);
    }

    pub fn get(&self, name: &str) -> Option<&Combinator> {
        self.funcs.get(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.funcs.keys().map(String::as_str)
    }
}

/// The baseline combinator set every conforming host provides.
pub fn standard_library() -> Library {
    let mut library = Library::new("standard", "0.1.0");
    library.register("Metathesis", Box::new(metathesis));
    library.register("Lengthen", Box::new(lengthen));
    library.register("IntervocalVoicing", Box::new(intervocal_voicing));
    library.register("Merge", Box::new(merge));
    library.register("Epenthesis", Box::new(epenthesis));
    library.register("Resyllabify", Box::new(resyllabify));
    library
}

/// Applies a feature bundle to a copy of the phoneme and re-derives its
/// symbol.
pub(crate) fn apply_features(
    phoneme: &Phoneme,
    bundle: &[(String, FeatureValue)],
) -> Result<Phoneme, RuleError> {
    let mut changed = phoneme.clone();
    for (name, value) in bundle {
        changed.set_feature(name, *value)?;
    }
    changed.refresh_symbol()?;
    Ok(changed)
}

fn expect_args(function: &str, args: &[Arg], count: usize) -> Result<(), CompileError> {
    if args.len() != count {
        return Err(CompileError::InvalidArguments {
            function: function.to_string(),
            detail: format!("expected {} arguments, got {}", count, args.len()),
        });
    }
    Ok(())
}

/// Builds the matcher an argument stands for: a phoneme (or contour run) by
/// symbol, a set by membership, a bracket by features. Other argument kinds
/// match everything.
fn segment_predicate(arg: &Arg) -> Box<dyn Fn(&Phoneme) -> bool + Send + Sync> {
    match arg {
        Arg::Phonemes(seq) => {
            let symbol: String = seq.iter().map(|p| p.symbol()).collect();
            Box::new(move |p| p.is_symbol(&symbol))
        }
        Arg::List(seqs) => {
            let symbols: Vec<String> = seqs
                .iter()
                .map(|seq| seq.iter().map(|p| p.symbol()).collect())
                .collect();
            Box::new(move |p| symbols.iter().any(|s| p.is_symbol(s)))
        }
        Arg::Features(bundle) => {
            let bundle = bundle.clone();
            Box::new(move |p| {
                bundle
                    .iter()
                    .all(|(name, value)| p.feature_is(name, *value))
            })
        }
        _ => Box::new(|_| true),
    }
}

fn first_matches(
    pred: Box<dyn Fn(&Phoneme) -> bool + Send + Sync>,
) -> Box<dyn Fn(&[Phoneme]) -> bool + Send + Sync> {
    Box::new(move |seg| seg.first().map(|p| pred(p)).unwrap_or(false))
}

/// `Metathesis(left, right)`: swaps an adjacent pair.
fn metathesis(args: &[Arg]) -> Result<Rule, CompileError> {
    expect_args("Metathesis", args, 2)?;
    let left = segment_predicate(&args[0]);
    let right = segment_predicate(&args[1]);
    Ok(Rule::span(
        2,
        Box::new(move |seg| seg.len() == 2 && left(&seg[0]) && right(&seg[1])),
        Box::new(|_, seg| {
            let first = seg.first().cloned().ok_or(RuleError::MissingSegment)?;
            let second = seg.get(1).cloned().ok_or(RuleError::MissingSegment)?;
            Ok(vec![second, first])
        }),
    ))
}

/// `Lengthen(p)`: marks matching segments long.
fn lengthen(args: &[Arg]) -> Result<Rule, CompileError> {
    expect_args("Lengthen", args, 1)?;
    let pred = segment_predicate(&args[0]);
    Ok(Rule::segments(
        first_matches(pred),
        Box::new(|_, seg| {
            let current = seg.first().ok_or(RuleError::MissingSegment)?;
            Ok(vec![apply_features(
                current,
                &[(FT_LONG.to_string(), FeatureValue::Plus)],
            )?])
        }),
    ))
}

/// `IntervocalVoicing(p)`: voices matching segments between vowels.
fn intervocal_voicing(args: &[Arg]) -> Result<Rule, CompileError> {
    expect_args("IntervocalVoicing", args, 1)?;
    let pred = segment_predicate(&args[0]);
    Ok(Rule::segments(
        first_matches(pred),
        Box::new(|_, seg| {
            let current = seg.first().ok_or(RuleError::MissingSegment)?;
            Ok(vec![apply_features(
                current,
                &[(FT_VOICE.to_string(), FeatureValue::Plus)],
            )?])
        }),
    )
    .when(Box::new(|td| {
        td.phoneme_at(-1).map(|p| p.is_vowel()).unwrap_or(false)
    }))
    .when(Box::new(|td| {
        td.phoneme_at(1).map(|p| p.is_vowel()).unwrap_or(false)
    })))
}

/// `Merge({a, b, …}, target)`: collapses a set of phonemes into one.
fn merge(args: &[Arg]) -> Result<Rule, CompileError> {
    expect_args("Merge", args, 2)?;
    let domain = segment_predicate(&args[0]);
    let target = match &args[1] {
        Arg::Phonemes(seq) if !seq.is_empty() => seq.clone(),
        _ => {
            return Err(CompileError::InvalidArguments {
                function: String::from("Merge"),
                detail: String::from("the target must be a phoneme literal"),
            })
        }
    };
    Ok(Rule::segments(
        first_matches(domain),
        Box::new(move |_, _| Ok(target.clone())),
    ))
}

/// `Epenthesis(p, q)`: inserts `q` after every match of `p`.
fn epenthesis(args: &[Arg]) -> Result<Rule, CompileError> {
    expect_args("Epenthesis", args, 2)?;
    let domain = segment_predicate(&args[0]);
    let insert = match &args[1] {
        Arg::Phonemes(seq) if !seq.is_empty() => seq.clone(),
        _ => {
            return Err(CompileError::InvalidArguments {
                function: String::from("Epenthesis"),
                detail: String::from("the inserted segment must be a phoneme literal"),
            })
        }
    };
    Ok(Rule::segments(
        first_matches(domain),
        Box::new(move |_, seg| {
            let current = seg.first().cloned().ok_or(RuleError::MissingSegment)?;
            let mut out = vec![current];
            out.extend(insert.iter().cloned());
            Ok(out)
        }),
    ))
}

/// `Resyllabify()`: rebuilds syllable boundaries from the flat segments.
fn resyllabify(_args: &[Arg]) -> Result<Rule, CompileError> {
    Ok(Rule::resyllabify())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureModel;
    use crate::word::WordFactory;
    use std::sync::Arc;

    fn factory() -> WordFactory {
        WordFactory::new(Arc::new(FeatureModel::monophone().unwrap()))
    }

    fn phonemes(wf: &WordFactory, symbols: &[&str]) -> Vec<Phoneme> {
        symbols
            .iter()
            .map(|s| Phoneme::from_ipa(wf.model(), s).unwrap())
            .collect()
    }

    #[test]
    fn standard_library_exposes_baseline_names() {
        let lib = standard_library();
        for name in [
            "Metathesis",
            "Lengthen",
            "IntervocalVoicing",
            "Merge",
            "Epenthesis",
            "Resyllabify",
        ] {
            assert!(lib.get(name).is_some(), "missing {}", name);
        }
        assert_eq!(lib.name(), "standard");
    }

    #[test]
    fn metathesis_swaps_adjacent_segments() {
        let wf = factory();
        let word = wf.make_word("ras.ta").unwrap();
        let rule = metathesis(&[
            Arg::Phonemes(phonemes(&wf, &["r"])),
            Arg::Phonemes(phonemes(&wf, &["a"])),
        ])
        .unwrap();
        assert_eq!(rule.apply(&word).to_string(), "/ars.ta/");
    }

    #[test]
    fn lengthen_marks_long() {
        let wf = factory();
        let word = wf.make_word("ta").unwrap();
        let rule = lengthen(&[Arg::Phonemes(phonemes(&wf, &["a"]))]).unwrap();
        assert_eq!(rule.apply(&word).to_string(), "/ta\u{02D0}/");
    }

    #[test]
    fn intervocal_voicing_needs_both_neighbours() {
        let wf = factory();
        let rule = intervocal_voicing(&[Arg::Phonemes(phonemes(&wf, &["p"]))]).unwrap();
        let voiced = rule.apply(&wf.make_word("'apa").unwrap());
        assert_eq!(voiced.to_string(), "/'a.ba/");
        let edge = rule.apply(&wf.make_word("pa").unwrap());
        assert_eq!(edge.to_string(), "/pa/");
    }

    #[test]
    fn merge_collapses_a_set() {
        let wf = factory();
        let word = wf.make_word("te.ti").unwrap();
        let rule = merge(&[
            Arg::List(vec![phonemes(&wf, &["e"]), phonemes(&wf, &["i"])]),
            Arg::Phonemes(phonemes(&wf, &["a"])),
        ])
        .unwrap();
        assert_eq!(rule.apply(&word).to_string(), "/ta.ta/");
    }

    #[test]
    fn epenthesis_inserts_after_match() {
        let wf = factory();
        let word = wf.make_word("as.ka").unwrap();
        let rule = epenthesis(&[
            Arg::Phonemes(phonemes(&wf, &["s"])),
            Arg::Phonemes(phonemes(&wf, &["e"])),
        ])
        .unwrap();
        assert_eq!(rule.apply(&word).to_string(), "/ase.ka/");
    }

    #[test]
    fn resyllabify_rebuilds_boundaries() {
        let wf = factory();
        let word = wf.make_word("am.a.re").unwrap();
        let rule = resyllabify(&[]).unwrap();
        assert_eq!(rule.apply(&word).to_string(), "/a.ma.re/");
    }

    #[test]
    fn wrong_arity_is_rejected() {
        let wf = factory();
        let err = metathesis(&[Arg::Phonemes(phonemes(&wf, &["r"]))]).unwrap_err();
        assert!(matches!(err, CompileError::InvalidArguments { .. }));
    }

    #[test]
    fn merge_requires_a_phoneme_target() {
        let err = merge(&[Arg::Number(1), Arg::Number(2)]).unwrap_err();
        assert!(matches!(err, CompileError::InvalidArguments { .. }));
    }
}
