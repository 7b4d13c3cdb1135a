//! Rule application.
//!
//! A [`Rule`] is a compiled closure bundle: a tagged target (a window over
//! the flat phoneme sequence, or whole syllables), a domain predicate,
//! condition predicates evaluated against the cursor, and an action that
//! produces the replacement. The [`Transducer`] is the ephemeral cursor
//! state for one (word, rule) application; it never mutates the input word.

use crate::features::SymbolError;
use crate::phoneme::{Phoneme, PhonemeError};
use crate::word::{Syllable, Word, WordError, WordFactory};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Runtime hazards during rule evaluation. These are always recovered: the
/// offending position is left unchanged and the word continues.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("segment position {0} is out of range")]
    OutOfRange(usize),
    #[error("no segment available at the cursor")]
    MissingSegment,
    #[error(transparent)]
    Word(#[from] WordError),
    #[error(transparent)]
    Symbol(#[from] SymbolError),
    #[error(transparent)]
    Phoneme(#[from] PhonemeError),
}

pub type Condition = Box<dyn Fn(&Transducer) -> bool + Send + Sync>;
pub type SegmentPredicate = Box<dyn Fn(&[Phoneme]) -> bool + Send + Sync>;
pub type SegmentAction =
    Box<dyn Fn(&Transducer, &[Phoneme]) -> Result<Vec<Phoneme>, RuleError> + Send + Sync>;
pub type SyllablePredicate = Box<dyn Fn(&Syllable) -> bool + Send + Sync>;
pub type SyllableAction =
    Box<dyn Fn(&Transducer, &Syllable) -> Result<Syllable, RuleError> + Send + Sync>;

enum RuleBody {
    /// Rewrites windows of the flat phoneme sequence. `window` is 1 for
    /// ordinary rules and the run length for multi-segment domains.
    Segments {
        window: usize,
        domain: SegmentPredicate,
        action: SegmentAction,
    },
    /// Rewrites whole syllables.
    Syllables {
        domain: SyllablePredicate,
        action: SyllableAction,
    },
    /// Child rules applied in declaration order to the evolving word.
    Group(Vec<Rule>),
    /// Rebuilds the word from its flat segments by scoring splits.
    Resyllabify,
    Identity,
}

/// A compiled sound-change rule. Application is deterministic and total:
/// runtime errors are logged and the affected position is skipped.
pub struct Rule {
    body: RuleBody,
    conditions: Vec<Condition>,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match &self.body {
            RuleBody::Segments { window, .. } => format!("Segments(window={})", window),
            RuleBody::Syllables { .. } => String::from("Syllables"),
            RuleBody::Group(rules) => format!("Group({})", rules.len()),
            RuleBody::Resyllabify => String::from("Resyllabify"),
            RuleBody::Identity => String::from("Identity"),
        };
        f.debug_struct("Rule")
            .field("body", &tag)
            .field("conditions", &self.conditions.len())
            .finish()
    }
}

impl Rule {
    /// A rule that matches nothing and changes nothing.
    pub fn identity() -> Rule {
        Rule {
            body: RuleBody::Identity,
            conditions: Vec::new(),
        }
    }

    /// A per-phoneme rule.
    pub fn segments(domain: SegmentPredicate, action: SegmentAction) -> Rule {
        Rule::span(1, domain, action)
    }

    /// A rule over a contiguous run of `window` phonemes in the flat
    /// sequence.
    pub fn span(window: usize, domain: SegmentPredicate, action: SegmentAction) -> Rule {
        Rule {
            body: RuleBody::Segments {
                window: window.max(1),
                domain,
                action,
            },
            conditions: Vec::new(),
        }
    }

    /// A per-syllable rule.
    pub fn syllables(domain: SyllablePredicate, action: SyllableAction) -> Rule {
        Rule {
            body: RuleBody::Syllables { domain, action },
            conditions: Vec::new(),
        }
    }

    /// Child rules run in order on the evolving word.
    pub fn group(rules: Vec<Rule>) -> Rule {
        Rule {
            body: RuleBody::Group(rules),
            conditions: Vec::new(),
        }
    }

    pub fn resyllabify() -> Rule {
        Rule {
            body: RuleBody::Resyllabify,
            conditions: Vec::new(),
        }
    }

    /// Adds a condition; every condition must hold at the cursor for the
    /// action to fire.
    pub fn when(mut self, condition: Condition) -> Rule {
        self.conditions.push(condition);
        self
    }

    /// Applies the rule everywhere it matches, producing a new word.
    pub fn apply(&self, word: &Word) -> Word {
        match &self.body {
            RuleBody::Identity => word.clone(),
            RuleBody::Group(rules) => {
                let mut current = word.clone();
                for rule in rules {
                    current = rule.apply(&current);
                }
                current
            }
            RuleBody::Resyllabify => resyllabify(word),
            RuleBody::Segments {
                window,
                domain,
                action,
            } => self.run_segments(word, *window, domain, action),
            RuleBody::Syllables { domain, action } => self.run_syllables(word, domain, action),
        }
    }

    fn conditions_hold(&self, cursor: &Transducer) -> bool {
        self.conditions.iter().all(|c| c(cursor))
    }

    fn run_segments(
        &self,
        word: &Word,
        window: usize,
        domain: &SegmentPredicate,
        action: &SegmentAction,
    ) -> Word {
        let flat: Vec<Phoneme> = word.phonemes().into_iter().cloned().collect();
        let owner: Vec<usize> = (0..flat.len())
            .map(|i| word.syllable_of(i).unwrap_or(0))
            .collect();
        let mut out: Vec<Vec<Phoneme>> = vec![Vec::new(); word.syllable_count()];

        let mut i = 0;
        while i < flat.len() {
            let mut consumed = false;
            if i + window <= flat.len() {
                let segment = &flat[i..i + window];
                if domain(segment) {
                    let cursor = Transducer::new(word, owner[i], i, window);
                    if self.conditions_hold(&cursor) {
                        match action(&cursor, segment) {
                            Ok(replacement) => {
                                out[owner[i]].extend(flatten_contours(replacement));
                                i += window;
                                consumed = true;
                            }
                            Err(e) => {
                                log::warn!("sound change skipped at segment {}: {}", i, e);
                            }
                        }
                    }
                }
            }
            if !consumed {
                out[owner[i]].push(flat[i].clone());
                i += 1;
            }
        }

        rebuild(word, out)
    }

    fn run_syllables(
        &self,
        word: &Word,
        domain: &SyllablePredicate,
        action: &SyllableAction,
    ) -> Word {
        let mut syllables = Vec::with_capacity(word.syllable_count());
        let mut flat_start = 0;
        for (si, syl) in word.syllables().iter().enumerate() {
            let cursor = Transducer::new(word, si, flat_start, syl.len().max(1));
            flat_start += syl.len();

            let mut replacement = syl.clone();
            if domain(syl) && self.conditions_hold(&cursor) {
                match action(&cursor, syl) {
                    Ok(new_syl) => replacement = new_syl,
                    Err(e) => {
                        log::warn!("sound change skipped at syllable {}: {}", si, e);
                    }
                }
            }
            replacement.set_stressed(syl.is_stressed());
            if replacement.is_empty() {
                continue;
            }
            syllables.push(replacement);
        }

        match Word::new(syllables) {
            Ok(new_word) => new_word,
            Err(e) => {
                log::warn!("sound change emptied the word, keeping it unchanged: {}", e);
                word.clone()
            }
        }
    }
}

/// Expands any contour segments in a replacement back into their runs.
fn flatten_contours(replacement: Vec<Phoneme>) -> Vec<Phoneme> {
    let mut out = Vec::with_capacity(replacement.len());
    for p in replacement {
        if p.is_contour() {
            out.extend(p.elements().iter().cloned());
        } else {
            out.push(p);
        }
    }
    out
}

fn rebuild(word: &Word, per_syllable: Vec<Vec<Phoneme>>) -> Word {
    let mut syllables = Vec::new();
    for (i, phonemes) in per_syllable.into_iter().enumerate() {
        if phonemes.is_empty() {
            continue;
        }
        syllables.push(Syllable::new(phonemes).with_stress(word.syllables()[i].is_stressed()));
    }
    match Word::new(syllables) {
        Ok(new_word) => new_word,
        Err(e) => {
            log::warn!("sound change emptied the word, keeping it unchanged: {}", e);
            word.clone()
        }
    }
}

fn resyllabify(word: &Word) -> Word {
    let segments: Vec<Phoneme> = word.phonemes().into_iter().cloned().collect();
    let model = match segments.first() {
        Some(p) => Arc::clone(p.model()),
        None => return word.clone(),
    };
    let factory = WordFactory::new(model);
    match factory.syllabify(segments) {
        Ok(new_word) => new_word,
        Err(e) => {
            log::warn!("resyllabification failed, keeping word unchanged: {}", e);
            word.clone()
        }
    }
}

/// Cursor state during one rule application: the word under inspection, the
/// current syllable, and the current window into the flat phoneme sequence.
pub struct Transducer<'w> {
    word: &'w Word,
    syllable_index: usize,
    phoneme_index: usize,
    window: usize,
}

impl<'w> Transducer<'w> {
    pub(crate) fn new(
        word: &'w Word,
        syllable_index: usize,
        phoneme_index: usize,
        window: usize,
    ) -> Transducer<'w> {
        Transducer {
            word,
            syllable_index,
            phoneme_index,
            window,
        }
    }

    pub fn word(&self) -> &'w Word {
        self.word
    }

    pub fn syllable_index(&self) -> usize {
        self.syllable_index
    }

    /// Flat index of the first phoneme under the cursor.
    pub fn phoneme_index(&self) -> usize {
        self.phoneme_index
    }

    pub fn current_syllable(&self) -> &'w Syllable {
        &self.word.syllables()[self.syllable_index]
    }

    pub fn current_phoneme(&self) -> Option<&'w Phoneme> {
        self.word.phoneme_at(self.phoneme_index)
    }

    /// Phoneme at a relative offset. Positive offsets count from the end of
    /// the cursor's window, so `+1` is the first segment after a
    /// multi-phoneme domain.
    pub fn phoneme_at(&self, offset: i64) -> Option<&'w Phoneme> {
        let base = if offset > 0 {
            self.phoneme_index as i64 + self.window as i64 - 1
        } else {
            self.phoneme_index as i64
        };
        let idx = base + offset;
        if idx < 0 {
            return None;
        }
        self.word.phoneme_at(idx as usize)
    }

    /// Syllable by absolute index; negative indices count from the end.
    pub fn syllable_at(&self, index: i64) -> Option<&'w Syllable> {
        let count = self.word.syllable_count() as i64;
        let idx = if index < 0 { count + index } else { index };
        if idx < 0 || idx >= count {
            return None;
        }
        Some(&self.word.syllables()[idx as usize])
    }

    /// Syllable at an offset from the current one.
    pub fn syllable_offset(&self, offset: i64) -> Option<&'w Syllable> {
        let idx = self.syllable_index as i64 + offset;
        if idx < 0 || idx >= self.word.syllable_count() as i64 {
            return None;
        }
        Some(&self.word.syllables()[idx as usize])
    }

    /// Phoneme by absolute index; negative indices count from the end.
    pub fn phoneme_at_index(&self, index: i64) -> Option<&'w Phoneme> {
        let count = self.word.phoneme_count() as i64;
        let idx = if index < 0 { count + index } else { index };
        if idx < 0 || idx >= count {
            return None;
        }
        self.word.phoneme_at(idx as usize)
    }

    /// Number of phonemes before the cursor.
    pub fn distance_from_start(&self) -> usize {
        self.phoneme_index
    }

    /// Number of phonemes after the cursor's window.
    pub fn distance_from_end(&self) -> usize {
        self.word
            .phoneme_count()
            .saturating_sub(self.phoneme_index + self.window)
    }
}
