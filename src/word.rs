//! Words: ordered syllables with stress and position labels.
//!
//! A [`WordFactory`] turns delimited IPA strings into [`Word`]s against a
//! shared feature model, and syllabifies undelimited segment lists by
//! scoring every possible split.

mod syllable;

pub use syllable::{Syllable, SyllableStructure};

use crate::features::{FeatureModel, SymbolError};
use crate::phoneme::Phoneme;
use crate::util::{break_patterns, split_at_breaks};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Where a syllable sits within its word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WordPosition {
    Initial,
    Medial,
    Final,
    Monosyllable,
}

#[derive(Debug, Error)]
pub enum WordError {
    #[error("syllable '{syllable}' is misshapen: {detail}")]
    MisshapenSyllable { syllable: String, detail: String },
    #[error("no syllables in input")]
    EmptyInput,
    #[error(transparent)]
    Symbol(#[from] SymbolError),
}

/// An ordered, immutable sequence of syllables.
///
/// Position labels are recomputed whenever a word is constructed, so they
/// are always consistent with the syllable indices. Words own their
/// syllables; sound changes build fresh words rather than mutating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    syllables: Vec<Syllable>,
}

impl Word {
    /// Builds a word from syllables, assigning position labels. Fails with
    /// `EmptyInput` when there are none.
    pub fn new(syllables: Vec<Syllable>) -> Result<Word, WordError> {
        if syllables.is_empty() {
            return Err(WordError::EmptyInput);
        }
        let mut syllables = syllables;
        let count = syllables.len();
        for (i, syl) in syllables.iter_mut().enumerate() {
            let position = if count == 1 {
                WordPosition::Monosyllable
            } else if i == 0 {
                WordPosition::Initial
            } else if i == count - 1 {
                WordPosition::Final
            } else {
                WordPosition::Medial
            };
            syl.set_position(position);
        }
        Ok(Word { syllables })
    }

    pub fn syllables(&self) -> &[Syllable] {
        &self.syllables
    }

    pub fn syllable_count(&self) -> usize {
        self.syllables.len()
    }

    /// The flat phoneme sequence, syllable by syllable.
    pub fn phonemes(&self) -> Vec<&Phoneme> {
        self.syllables
            .iter()
            .flat_map(|s| s.phonemes().iter())
            .collect()
    }

    pub fn phoneme_count(&self) -> usize {
        self.syllables.iter().map(Syllable::len).sum()
    }

    pub fn phoneme_at(&self, index: usize) -> Option<&Phoneme> {
        let mut remaining = index;
        for syl in &self.syllables {
            if remaining < syl.len() {
                return syl.phonemes().get(remaining);
            }
            remaining -= syl.len();
        }
        None
    }

    /// Index of the syllable containing the flat phoneme index.
    pub fn syllable_of(&self, phoneme_index: usize) -> Option<usize> {
        let mut remaining = phoneme_index;
        for (i, syl) in self.syllables.iter().enumerate() {
            if remaining < syl.len() {
                return Some(i);
            }
            remaining -= syl.len();
        }
        None
    }

    pub fn has_stress(&self) -> bool {
        self.syllables.iter().any(Syllable::is_stressed)
    }

    pub fn stressed_position(&self) -> Option<usize> {
        self.syllables.iter().position(Syllable::is_stressed)
    }

    pub fn stressed_syllable(&self) -> Option<&Syllable> {
        self.stressed_position().map(|i| &self.syllables[i])
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/")?;
        for (i, syl) in self.syllables.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", syl)?;
        }
        write!(f, "/")
    }
}

impl<'a> IntoIterator for &'a Word {
    type Item = &'a Syllable;
    type IntoIter = std::slice::Iter<'a, Syllable>;

    fn into_iter(self) -> Self::IntoIter {
        self.syllables.iter()
    }
}

/// Builds [`Word`]s against a feature model.
#[derive(Debug, Clone)]
pub struct WordFactory {
    model: Arc<FeatureModel>,
}

impl WordFactory {
    pub fn new(model: Arc<FeatureModel>) -> WordFactory {
        WordFactory { model }
    }

    pub fn model(&self) -> &Arc<FeatureModel> {
        &self.model
    }

    /// Parses a delimited IPA string into a word.
    ///
    /// Periods separate syllables and an apostrophe prefixes the stressed
    /// syllable; the IPA primary stress mark is accepted as an alias. The
    /// apostrophe is normalized to `.'` before splitting, so `a'sap` and
    /// `a.'sap` read the same. Empty syllables are discarded.
    pub fn make_word(&self, raw: &str) -> Result<Word, WordError> {
        let normalized = raw.replace('\u{02C8}', "'").replace('\'', ".'");
        let mut syllables = Vec::new();
        for part in normalized.split('.') {
            if part.is_empty() {
                continue;
            }
            let (stressed, body) = match part.strip_prefix('\'') {
                Some(rest) => (true, rest),
                None => (false, part),
            };
            if body.is_empty() {
                continue;
            }
            let tokens = self.tokenize(body)?;
            let mut phonemes = Vec::with_capacity(tokens.len());
            for token in &tokens {
                phonemes.push(Phoneme::from_ipa(&self.model, token)?);
            }
            syllables.push(Syllable::new(phonemes).with_stress(stressed));
        }
        Word::new(syllables)
    }

    /// Splits a syllable body into segment tokens: each base glyph picks up
    /// the diacritic code points that follow it.
    pub fn tokenize(&self, body: &str) -> Result<Vec<String>, WordError> {
        let mut tokens: Vec<String> = Vec::new();
        for c in body.chars() {
            if self.model.is_diacritic(c) {
                match tokens.last_mut() {
                    Some(token) => token.push(c),
                    None => {
                        return Err(WordError::Symbol(SymbolError::UnknownSymbol(
                            c.to_string(),
                        )))
                    }
                }
            } else {
                tokens.push(c.to_string());
            }
        }
        Ok(tokens)
    }

    /// Syllabifies an undelimited segment list by scoring every split.
    ///
    /// Each candidate split is scored per syllable: +0.6 for an onset, +0.1
    /// for being closed as well, +0.1 for closed without an onset, +0.7 for
    /// having no clusters — otherwise +0.3 when the longest cluster is two
    /// segments and +0.2 when open. A syllable whose structure analysis
    /// fails scores −10. The earliest best-scoring split wins.
    pub fn syllabify(&self, segments: Vec<Phoneme>) -> Result<Word, WordError> {
        if segments.is_empty() {
            return Err(WordError::EmptyInput);
        }

        let mut best: Option<(Vec<Syllable>, f64)> = None;
        for breaks in break_patterns(segments.len()) {
            let candidate: Vec<Syllable> = split_at_breaks(&segments, &breaks)
                .into_iter()
                .map(|chunk| Syllable::new(chunk.to_vec()))
                .collect();
            let score: f64 = candidate.iter().map(syllable_weight).sum();
            let better = match &best {
                None => true,
                Some((_, best_score)) => score > *best_score,
            };
            if better {
                best = Some((candidate, score));
            }
        }

        match best {
            Some((syllables, _)) => Word::new(syllables),
            None => Err(WordError::EmptyInput),
        }
    }

    /// Convenience wrapper over [`syllabify`](Self::syllabify) for raw
    /// segment symbols.
    pub fn word_from_segments(&self, segments: &[&str]) -> Result<Word, WordError> {
        let mut phonemes = Vec::with_capacity(segments.len());
        for seg in segments {
            phonemes.push(Phoneme::from_ipa(&self.model, seg)?);
        }
        self.syllabify(phonemes)
    }
}

fn syllable_weight(syl: &Syllable) -> f64 {
    let structure = match syl.structure() {
        Ok(s) => s,
        Err(_) => return -10.0,
    };
    let mut weight = 0.0;
    if structure.has_onset() {
        weight += 0.6;
        if structure.is_closed() {
            weight += 0.1;
        }
    } else if structure.is_closed() {
        weight += 0.1;
    }
    if !structure.has_clusters() {
        weight += 0.7;
    } else {
        if structure.max_cluster_len() == 2 {
            weight += 0.3;
        }
        if structure.is_open() {
            weight += 0.2;
        }
    }
    weight
}
