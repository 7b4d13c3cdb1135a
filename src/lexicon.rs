//! Lexica: lists of transcribed entries that sound changes run across.
//!
//! One entry per line: `<IPA> <orthography> <gloss>`, `#` lines are
//! comments. The IPA field may carry syllable dots and stress apostrophes.

use crate::rules::Program;
use crate::word::{Word, WordError, WordFactory};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("malformed lexicon entry on line {line}: '{text}'")]
    Malformed { line: usize, text: String },
    #[error(transparent)]
    Word(#[from] WordError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A transcribed word with its orthography and gloss. The parsed [`Word`]
/// is kept alongside so that sound changes can run without re-parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexiconEntry {
    pub ipa: String,
    pub orthography: String,
    pub gloss: String,
    #[serde(skip)]
    word: Option<Word>,
}

impl LexiconEntry {
    pub fn new(
        ipa: impl Into<String>,
        orthography: impl Into<String>,
        gloss: impl Into<String>,
    ) -> LexiconEntry {
        LexiconEntry {
            ipa: ipa.into(),
            orthography: orthography.into(),
            gloss: gloss.into(),
            word: None,
        }
    }

    pub fn word(&self) -> Option<&Word> {
        self.word.as_ref()
    }

    pub fn set_word(&mut self, word: Word) {
        self.word = Some(word);
    }

    fn to_line(&self) -> String {
        format!("{} {} {}", self.ipa, self.orthography, self.gloss)
    }
}

/// An ordered list of lexicon entries with optional language metadata.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    pub language: Option<String>,
    pub date: Option<String>,
    entries: Vec<LexiconEntry>,
}

impl Lexicon {
    pub fn new() -> Lexicon {
        Lexicon::default()
    }

    /// Parses lexicon text, building each entry's word with the factory.
    /// A malformed line or an unparseable transcription fails the whole
    /// document.
    pub fn parse(raw: &str, factory: &WordFactory) -> Result<Lexicon, LexiconError> {
        let mut lexicon = Lexicon::new();
        for (lineno, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let (ipa, orthography) = match (parts.next(), parts.next()) {
                (Some(ipa), Some(orthography)) => (ipa, orthography),
                _ => {
                    return Err(LexiconError::Malformed {
                        line: lineno + 1,
                        text: line.to_string(),
                    })
                }
            };
            let gloss: Vec<&str> = parts.collect();
            if gloss.is_empty() {
                return Err(LexiconError::Malformed {
                    line: lineno + 1,
                    text: line.to_string(),
                });
            }
            let mut entry = LexiconEntry::new(ipa, orthography, gloss.join(" "));
            entry.set_word(factory.make_word(ipa)?);
            lexicon.entries.push(entry);
        }
        Ok(lexicon)
    }

    pub fn load<P: AsRef<Path>>(path: P, factory: &WordFactory) -> Result<Lexicon, LexiconError> {
        let raw = fs::read_to_string(path)?;
        Lexicon::parse(&raw, factory)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), LexiconError> {
        fs::write(path, self.to_text())?;
        Ok(())
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        if let Some(language) = &self.language {
            out.push_str(&format!("# {}\n", language));
        }
        out.push_str("# IPA orthography gloss\n");
        for entry in &self.entries {
            out.push_str(&entry.to_line());
            out.push('\n');
        }
        out
    }

    pub fn add_entry(&mut self, entry: LexiconEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LexiconEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn random_entry<R: Rng>(&self, rng: &mut R) -> Option<&LexiconEntry> {
        if self.entries.is_empty() {
            return None;
        }
        self.entries.get(rng.gen_range(0..self.entries.len()))
    }

    /// Entries whose transcription contains the segment.
    pub fn entries_with_segment(&self, segment: &str) -> Vec<&LexiconEntry> {
        self.entries
            .iter()
            .filter(|e| e.ipa.contains(segment))
            .collect()
    }

    /// Runs a compiled program over every entry, producing the derived
    /// lexicon. Entries without a parsed word are carried over unchanged.
    pub fn run_sound_changes(&self, program: &Program) -> Lexicon {
        let mut derived = Lexicon {
            language: self.language.clone(),
            date: self.date.clone(),
            entries: Vec::with_capacity(self.entries.len()),
        };
        for entry in &self.entries {
            let mut new_entry = entry.clone();
            if let Some(word) = &entry.word {
                let new_word = program.apply(word);
                new_entry.ipa = render_ipa(&new_word);
                new_entry.word = Some(new_word);
            }
            derived.entries.push(new_entry);
        }
        derived
    }
}

/// The word's transcription in lexicon spelling: syllable dots and stress
/// apostrophes, without the enclosing slashes.
fn render_ipa(word: &Word) -> String {
    word.to_string().trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureModel;
    use crate::rules::{compile, standard_library};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    const LEXICON: &str = "\
# Old Valyrian fragment
a'sap sap \"to sing\"
'be.ko.mu bekomu \"to become\"
uk.tu'ku uktuku fire
";

    fn factory() -> WordFactory {
        WordFactory::new(Arc::new(FeatureModel::monophone().unwrap()))
    }

    #[test]
    fn parses_entries_and_words() {
        let lexicon = Lexicon::parse(LEXICON, &factory()).unwrap();
        assert_eq!(lexicon.len(), 3);
        assert_eq!(lexicon.entries()[0].orthography, "sap");
        assert_eq!(lexicon.entries()[2].gloss, "fire");
        let word = lexicon.entries()[1].word().unwrap();
        assert_eq!(word.syllable_count(), 3);
    }

    #[test]
    fn malformed_line_fails_the_document() {
        let err = Lexicon::parse("a'sap\n", &factory()).unwrap_err();
        assert!(matches!(err, LexiconError::Malformed { line: 1, .. }));
    }

    #[test]
    fn unknown_transcription_fails_the_document() {
        let err = Lexicon::parse("qqq word gloss\n", &factory()).unwrap_err();
        assert!(matches!(err, LexiconError::Word(_)));
    }

    #[test]
    fn text_round_trip() {
        let wf = factory();
        let lexicon = Lexicon::parse(LEXICON, &wf).unwrap();
        let again = Lexicon::parse(&lexicon.to_text(), &wf).unwrap();
        assert_eq!(lexicon.entries(), again.entries());
    }

    #[test]
    fn random_entry_is_deterministic_per_seed() {
        let lexicon = Lexicon::parse(LEXICON, &factory()).unwrap();
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        assert_eq!(lexicon.random_entry(&mut a), lexicon.random_entry(&mut b));
        assert!(Lexicon::new().random_entry(&mut a).is_none());
    }

    #[test]
    fn entries_with_segment_filters() {
        let lexicon = Lexicon::parse(LEXICON, &factory()).unwrap();
        assert_eq!(lexicon.entries_with_segment("be").len(), 1);
        assert!(lexicon.entries_with_segment("zz").is_empty());
    }

    #[test]
    fn sound_changes_derive_a_new_lexicon() {
        let wf = factory();
        let lexicon = Lexicon::parse(LEXICON, &wf).unwrap();
        let program = compile(
            "CHANGE BEGIN /u/ -> /o/; /k/ -> /g/; END",
            wf.model(),
            &standard_library(),
        )
        .unwrap();
        let derived = lexicon.run_sound_changes(&program);
        assert_eq!(derived.entries()[2].ipa, "og.to.'go");
        // originals untouched
        assert_eq!(lexicon.entries()[2].ipa, "uk.tu'ku");
    }
}
