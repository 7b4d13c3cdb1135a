use crate::phoneme::Phoneme;
use crate::word::{WordError, WordPosition};
use std::cell::OnceCell;
use std::fmt;

/// The onset / nucleus / coda split of a syllable.
#[derive(Debug, Clone, PartialEq)]
pub struct SyllableStructure {
    pub onset: Vec<Phoneme>,
    pub nucleus: Vec<Phoneme>,
    pub coda: Vec<Phoneme>,
}

impl SyllableStructure {
    pub fn has_onset(&self) -> bool {
        !self.onset.is_empty()
    }

    /// Open syllables end in their nucleus.
    pub fn is_open(&self) -> bool {
        self.coda.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        !self.is_open()
    }

    /// True when the onset or the coda holds more than one segment.
    pub fn has_clusters(&self) -> bool {
        self.onset.len() > 1 || self.coda.len() > 1
    }

    /// Length of the longest cluster, 0 when there is none.
    pub fn max_cluster_len(&self) -> usize {
        let mut max = 0;
        if self.onset.len() > 1 {
            max = self.onset.len();
        }
        if self.coda.len() > 1 && self.coda.len() > max {
            max = self.coda.len();
        }
        max
    }

    pub fn has_polyphthong(&self) -> bool {
        self.nucleus.len() > 1
    }
}

/// An ordered run of phonemes with a stress flag and a position label,
/// analysable into onset, nucleus and coda.
#[derive(Debug, Clone)]
pub struct Syllable {
    phonemes: Vec<Phoneme>,
    stressed: bool,
    position: WordPosition,
    structure: OnceCell<SyllableStructure>,
}

impl PartialEq for Syllable {
    fn eq(&self, other: &Syllable) -> bool {
        self.phonemes == other.phonemes
            && self.stressed == other.stressed
            && self.position == other.position
    }
}

impl Eq for Syllable {}

impl Syllable {
    /// A fresh, unstressed syllable. The position label defaults to
    /// `Monosyllable`; [`Word`](crate::word::Word) construction relabels it.
    pub fn new(phonemes: Vec<Phoneme>) -> Syllable {
        Syllable {
            phonemes,
            stressed: false,
            position: WordPosition::Monosyllable,
            structure: OnceCell::new(),
        }
    }

    pub fn with_stress(mut self, stressed: bool) -> Syllable {
        self.stressed = stressed;
        self
    }

    pub fn phonemes(&self) -> &[Phoneme] {
        &self.phonemes
    }

    pub fn len(&self) -> usize {
        self.phonemes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phonemes.is_empty()
    }

    pub fn is_stressed(&self) -> bool {
        self.stressed
    }

    pub fn set_stressed(&mut self, stressed: bool) {
        self.stressed = stressed;
    }

    pub fn position(&self) -> WordPosition {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: WordPosition) {
        self.position = position;
    }

    pub fn is_initial(&self) -> bool {
        self.position == WordPosition::Initial
    }

    pub fn is_medial(&self) -> bool {
        self.position == WordPosition::Medial
    }

    pub fn is_final(&self) -> bool {
        self.position == WordPosition::Final
    }

    pub fn is_monosyllable(&self) -> bool {
        self.position == WordPosition::Monosyllable
    }

    pub fn contains_vowel(&self) -> bool {
        self.phonemes.iter().any(|p| p.is_vowel())
    }

    /// Concatenated symbols, without stress or boundary marks.
    pub fn symbols(&self) -> String {
        self.phonemes.iter().map(|p| p.symbol()).collect()
    }

    /// Indices of the segments that start a candidate nucleus run.
    ///
    /// When any segment reaches vowel sonority (10 or above) all vocalic
    /// sonorities are flattened to 10 and runs at that level are counted;
    /// otherwise, if anything reaches 5, runs at the highest sonority count.
    /// Below that the syllable has no nucleus candidates at all.
    fn nucleus_candidates(&self) -> Vec<usize> {
        let segments: Vec<&Phoneme> = self.phonemes.iter().filter(|p| !p.is_tone()).collect();
        let mut sonorities: Vec<i32> = segments.iter().map(|p| p.sonority()).collect();
        let max = match sonorities.iter().copied().max() {
            Some(m) => m,
            None => return Vec::new(),
        };

        let level = if max >= 10 {
            for s in sonorities.iter_mut() {
                if *s > 10 {
                    *s = 10;
                }
            }
            10
        } else if max >= 5 {
            max
        } else {
            return Vec::new();
        };

        let mut starts = Vec::new();
        for i in 0..sonorities.len() {
            if sonorities[i] == level && (i == 0 || sonorities[i - 1] != sonorities[i]) {
                starts.push(i);
            }
        }
        starts
    }

    /// Estimated number of nuclei. Anything other than 1 means the syllable
    /// is misshapen.
    pub fn count_nuclei(&self) -> usize {
        self.nucleus_candidates().len()
    }

    fn analyze(&self) -> Result<SyllableStructure, WordError> {
        let candidates = self.nucleus_candidates();
        if candidates.len() != 1 {
            return Err(WordError::MisshapenSyllable {
                syllable: self.symbols(),
                detail: format!("{} nuclei", candidates.len()),
            });
        }

        let segments: Vec<&Phoneme> = self.phonemes.iter().filter(|p| !p.is_tone()).collect();
        let mut onset = Vec::new();
        let mut nucleus = Vec::new();
        let mut coda = Vec::new();

        if self.contains_vowel() {
            let mut in_nucleus = false;
            let mut in_coda = false;
            for seg in segments {
                if seg.is_vowel() {
                    if in_coda {
                        return Err(WordError::MisshapenSyllable {
                            syllable: self.symbols(),
                            detail: format!("vowel '{}' after coda", seg.symbol()),
                        });
                    }
                    in_nucleus = true;
                    nucleus.push(seg.clone());
                } else if in_nucleus {
                    in_coda = true;
                    coda.push(seg.clone());
                } else {
                    onset.push(seg.clone());
                }
            }
        } else {
            let idx = candidates[0];
            onset = segments[..idx].iter().map(|p| (*p).clone()).collect();
            nucleus.push(segments[idx].clone());
            coda = segments[idx + 1..].iter().map(|p| (*p).clone()).collect();
        }

        Ok(SyllableStructure {
            onset,
            nucleus,
            coda,
        })
    }

    /// The cached onset / nucleus / coda analysis.
    pub fn structure(&self) -> Result<&SyllableStructure, WordError> {
        if let Some(cached) = self.structure.get() {
            return Ok(cached);
        }
        let computed = self.analyze()?;
        Ok(self.structure.get_or_init(|| computed))
    }

    pub fn onset(&self) -> Result<&[Phoneme], WordError> {
        Ok(&self.structure()?.onset)
    }

    pub fn nucleus(&self) -> Result<&[Phoneme], WordError> {
        Ok(&self.structure()?.nucleus)
    }

    pub fn coda(&self) -> Result<&[Phoneme], WordError> {
        Ok(&self.structure()?.coda)
    }

    /// Nucleus and coda together.
    pub fn rime(&self) -> Result<Vec<Phoneme>, WordError> {
        let structure = self.structure()?;
        let mut rime = structure.nucleus.clone();
        rime.extend(structure.coda.iter().cloned());
        Ok(rime)
    }

    /// CV skeleton of the syllable: `C` for onset and coda segments, `V` for
    /// vocalic nuclei, `N` for nasal nuclei and `R` for other syllabic
    /// consonants.
    pub fn pattern(&self) -> Result<String, WordError> {
        let structure = self.structure()?;
        let mut pattern = String::new();
        for _ in &structure.onset {
            pattern.push('C');
        }
        for seg in &structure.nucleus {
            if seg.is_vowel() {
                pattern.push('V');
            } else if seg.phone().is_nasal_stop() {
                pattern.push('N');
            } else {
                pattern.push('R');
            }
        }
        for _ in &structure.coda {
            pattern.push('C');
        }
        Ok(pattern)
    }
}

impl fmt::Display for Syllable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.stressed {
            write!(f, "'")?;
        }
        write!(f, "{}", self.symbols())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureModel;
    use std::sync::Arc;

    fn phonemes(symbols: &[&str]) -> Vec<Phoneme> {
        let model = Arc::new(FeatureModel::monophone().unwrap());
        symbols
            .iter()
            .map(|s| Phoneme::from_ipa(&model, s).unwrap())
            .collect()
    }

    #[test]
    fn single_vowel_nucleus() {
        let syl = Syllable::new(phonemes(&["t", "a", "p"]));
        assert_eq!(syl.count_nuclei(), 1);
        let st = syl.structure().unwrap();
        assert_eq!(st.onset.len(), 1);
        assert_eq!(st.nucleus.len(), 1);
        assert_eq!(st.coda.len(), 1);
        assert_eq!(syl.pattern().unwrap(), "CVC");
    }

    #[test]
    fn contiguous_vowels_form_one_nucleus() {
        let syl = Syllable::new(phonemes(&["t", "a", "i"]));
        assert_eq!(syl.count_nuclei(), 1);
        let st = syl.structure().unwrap();
        assert_eq!(st.nucleus.len(), 2);
        assert!(st.has_polyphthong());
        assert_eq!(syl.pattern().unwrap(), "CVV");
    }

    #[test]
    fn two_vowel_runs_are_misshapen() {
        let syl = Syllable::new(phonemes(&["a", "p", "a"]));
        assert_eq!(syl.count_nuclei(), 2);
        assert!(matches!(
            syl.structure(),
            Err(WordError::MisshapenSyllable { .. })
        ));
    }

    #[test]
    fn sonorant_nucleus_without_vowel() {
        let syl = Syllable::new(phonemes(&["s", "r", "s"]));
        let st = syl.structure().unwrap();
        assert_eq!(st.onset.len(), 1);
        assert_eq!(st.nucleus[0].symbol(), "r");
        assert_eq!(st.coda.len(), 1);
        assert_eq!(syl.pattern().unwrap(), "CRC");
    }

    #[test]
    fn nasal_nucleus_pattern() {
        let syl = Syllable::new(phonemes(&["s", "m"]));
        assert_eq!(syl.pattern().unwrap(), "CN");
    }

    #[test]
    fn obstruents_alone_have_no_nucleus() {
        let syl = Syllable::new(phonemes(&["s", "t"]));
        assert_eq!(syl.count_nuclei(), 0);
        assert!(syl.structure().is_err());
    }

    #[test]
    fn rime_is_nucleus_plus_coda() {
        let syl = Syllable::new(phonemes(&["t", "a", "p"]));
        let rime: Vec<String> = syl
            .rime()
            .unwrap()
            .iter()
            .map(|p| p.symbol().to_string())
            .collect();
        assert_eq!(rime, vec!["a", "p"]);
    }

    #[test]
    fn structure_helpers() {
        let syl = Syllable::new(phonemes(&["s", "t", "a"]));
        let st = syl.structure().unwrap();
        assert!(st.has_onset());
        assert!(st.is_open());
        assert!(st.has_clusters());
        assert_eq!(st.max_cluster_len(), 2);
    }

    #[test]
    fn onset_nucleus_coda_reassemble() {
        let syl = Syllable::new(phonemes(&["s", "t", "a", "r", "t"]));
        let st = syl.structure().unwrap();
        let mut rebuilt = st.onset.clone();
        rebuilt.extend(st.nucleus.iter().cloned());
        rebuilt.extend(st.coda.iter().cloned());
        assert_eq!(rebuilt, syl.phonemes().to_vec());
    }
}
