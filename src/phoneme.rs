//! Segments: feature-valued phones and the phonemes built on them.
//!
//! A [`Phone`] is the atomic unit of the engine — a dense vector of feature
//! values against a shared [`FeatureModel`], plus its IPA symbol. A
//! [`Phoneme`] wraps a phone with optional subsystem tags and may transiently
//! stand for a contour (an ordered run of component phonemes) while a
//! multi-segment rule is being applied.

use crate::features::{FeatureModel, FeatureValue, SymbolError};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub(crate) const FT_CONSONANTAL: &str = "consonantal";
pub(crate) const FT_SONORANT: &str = "sonorant";
pub(crate) const FT_CONTINUANT: &str = "continuant";
pub(crate) const FT_VOICE: &str = "voice";
pub(crate) const FT_NASAL: &str = "nasal";
pub(crate) const FT_LATERAL: &str = "lateral";
pub(crate) const FT_HIGH: &str = "high";
pub(crate) const FT_LOW: &str = "low";
pub(crate) const FT_FRONT: &str = "front";
pub(crate) const FT_BACK: &str = "back";
pub(crate) const FT_ROUND: &str = "round";
pub(crate) const FT_LONG: &str = "long";

#[derive(Debug, Error)]
pub enum PhonemeError {
    #[error("feature '{feature}' is not part of feature set '{model}'")]
    UnknownFeature { feature: String, model: String },
    #[error(transparent)]
    Symbol(#[from] SymbolError),
}

/// A feature-valued segment.
///
/// The feature mapping is stored as a dense array in the model's canonical
/// order; names resolve to positions through the model. The symbol is either
/// derived from the features or the literal IPA the phone was built from.
#[derive(Debug, Clone)]
pub struct Phone {
    model: Arc<FeatureModel>,
    values: Vec<FeatureValue>,
    symbol: String,
}

impl PartialEq for Phone {
    fn eq(&self, other: &Phone) -> bool {
        self.values == other.values
    }
}

impl Eq for Phone {}

impl Phone {
    /// Builds a phone from an IPA string (base glyph plus diacritics).
    ///
    /// The symbol is re-derived from the resulting features so that
    /// equivalent spellings normalize; if the derivation finds no
    /// representation the literal input is kept.
    pub fn from_ipa(model: &Arc<FeatureModel>, ipa: &str) -> Result<Phone, SymbolError> {
        let values = model.features_from_ipa(ipa)?;
        let symbol = model
            .ipa_from_features(&values)
            .unwrap_or_else(|_| ipa.to_string());
        Ok(Phone {
            model: Arc::clone(model),
            values,
            symbol,
        })
    }

    /// A phone with every feature null.
    pub fn blank(model: &Arc<FeatureModel>) -> Phone {
        Phone {
            model: Arc::clone(model),
            values: vec![FeatureValue::Null; model.feature_count()],
            symbol: String::from("0"),
        }
    }

    pub fn model(&self) -> &Arc<FeatureModel> {
        &self.model
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn is_symbol(&self, ipa: &str) -> bool {
        self.symbol == ipa
    }

    pub fn values(&self) -> &[FeatureValue] {
        &self.values
    }

    pub fn feature(&self, name: &str) -> Result<FeatureValue, PhonemeError> {
        let idx = self
            .model
            .feature_index(name)
            .ok_or_else(|| PhonemeError::UnknownFeature {
                feature: name.to_string(),
                model: self.model.name().to_string(),
            })?;
        Ok(self.values[idx])
    }

    /// True when the named feature holds `value`. Unknown features never
    /// match.
    pub fn feature_is(&self, name: &str, value: FeatureValue) -> bool {
        self.model
            .feature_index(name)
            .map(|idx| self.values[idx] == value)
            .unwrap_or(false)
    }

    pub fn set_feature(&mut self, name: &str, value: FeatureValue) -> Result<(), PhonemeError> {
        let idx = self
            .model
            .feature_index(name)
            .ok_or_else(|| PhonemeError::UnknownFeature {
                feature: name.to_string(),
                model: self.model.name().to_string(),
            })?;
        self.values[idx] = value;
        Ok(())
    }

    pub fn set_plus(&mut self, name: &str) -> Result<(), PhonemeError> {
        self.set_feature(name, FeatureValue::Plus)
    }

    pub fn set_minus(&mut self, name: &str) -> Result<(), PhonemeError> {
        self.set_feature(name, FeatureValue::Minus)
    }

    pub fn set_null(&mut self, name: &str) -> Result<(), PhonemeError> {
        self.set_feature(name, FeatureValue::Null)
    }

    /// Re-derives the symbol from the current feature mapping.
    pub fn refresh_symbol(&mut self) -> Result<(), SymbolError> {
        self.symbol = self.model.ipa_from_features(&self.values)?;
        Ok(())
    }

    pub(crate) fn set_symbol(&mut self, symbol: impl Into<String>) {
        self.symbol = symbol.into();
    }

    // Class predicates over the monophone feature names. On a model that
    // lacks a name the predicate is simply false.

    pub fn is_vowel(&self) -> bool {
        self.feature_is(FT_CONSONANTAL, FeatureValue::Minus)
    }

    pub fn is_consonant(&self) -> bool {
        self.feature_is(FT_CONSONANTAL, FeatureValue::Plus)
    }

    pub fn is_low_vowel(&self) -> bool {
        self.is_vowel() && self.feature_is(FT_LOW, FeatureValue::Plus)
    }

    pub fn is_high_vowel(&self) -> bool {
        self.is_vowel() && self.feature_is(FT_HIGH, FeatureValue::Plus)
    }

    pub fn is_mid_vowel(&self) -> bool {
        self.is_vowel() && !self.is_low_vowel() && !self.is_high_vowel()
    }

    pub fn is_front_vowel(&self) -> bool {
        self.is_vowel() && self.feature_is(FT_FRONT, FeatureValue::Plus)
    }

    pub fn is_back_vowel(&self) -> bool {
        self.is_vowel() && self.feature_is(FT_BACK, FeatureValue::Plus)
    }

    pub fn is_central_vowel(&self) -> bool {
        self.is_vowel() && !self.is_front_vowel() && !self.is_back_vowel()
    }

    pub fn is_rounded_vowel(&self) -> bool {
        self.is_vowel() && self.feature_is(FT_ROUND, FeatureValue::Plus)
    }

    pub fn is_voiced_consonant(&self) -> bool {
        self.is_consonant() && self.feature_is(FT_VOICE, FeatureValue::Plus)
    }

    pub fn is_stop(&self) -> bool {
        self.is_consonant() && self.feature_is(FT_CONTINUANT, FeatureValue::Minus)
    }

    pub fn is_nasal_stop(&self) -> bool {
        self.is_stop() && self.feature_is(FT_NASAL, FeatureValue::Plus)
    }

    pub fn is_approximant(&self) -> bool {
        self.is_consonant()
            && self.feature_is(FT_CONTINUANT, FeatureValue::Plus)
            && self.feature_is(FT_SONORANT, FeatureValue::Plus)
    }

    pub fn is_lateral_approximant(&self) -> bool {
        self.is_approximant() && self.feature_is(FT_LATERAL, FeatureValue::Plus)
    }

    pub fn is_fricative(&self) -> bool {
        self.is_consonant()
            && self.feature_is(FT_CONTINUANT, FeatureValue::Plus)
            && self.feature_is(FT_SONORANT, FeatureValue::Minus)
    }

    /// The monophone model carries no tonal segments.
    pub fn is_tone(&self) -> bool {
        false
    }

    /// Sonority rank used for nucleus detection. Vowels are 10 or higher;
    /// the central-vowel and lateral tests run before their supersets so
    /// every class keeps a distinct rank.
    pub fn sonority(&self) -> i32 {
        if self.is_vowel() {
            if self.is_central_vowel() {
                10
            } else if self.is_low_vowel() {
                13
            } else if self.is_mid_vowel() {
                12
            } else if self.is_high_vowel() {
                11
            } else {
                -1
            }
        } else if self.is_lateral_approximant() {
            8
        } else if self.is_approximant() {
            9
        } else if self.is_nasal_stop() {
            5
        } else if self.is_fricative() {
            if self.is_voiced_consonant() {
                3
            } else {
                2
            }
        } else if self.is_stop() {
            if self.is_voiced_consonant() {
                2
            } else {
                0
            }
        } else {
            -1
        }
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.symbol)
    }
}

/// A phone with phonemic decoration: subsystem tags, and — transiently — the
/// component run of a contour segment.
#[derive(Debug, Clone)]
pub struct Phoneme {
    phone: Phone,
    tags: IndexMap<String, FeatureValue>,
    elements: Vec<Phoneme>,
}

impl PartialEq for Phoneme {
    fn eq(&self, other: &Phoneme) -> bool {
        self.phone == other.phone && self.elements == other.elements
    }
}

impl Eq for Phoneme {}

impl Phoneme {
    pub fn from_ipa(model: &Arc<FeatureModel>, ipa: &str) -> Result<Phoneme, SymbolError> {
        Ok(Phoneme::from_phone(Phone::from_ipa(model, ipa)?))
    }

    pub fn from_phone(phone: Phone) -> Phoneme {
        Phoneme {
            phone,
            tags: IndexMap::new(),
            elements: Vec::new(),
        }
    }

    /// A compound segment standing for a contiguous run of phonemes. Its
    /// symbol is the concatenation of the run's symbols. Returns `None` for
    /// an empty run.
    pub fn contour(elements: Vec<Phoneme>) -> Option<Phoneme> {
        let first = elements.first()?;
        let mut phone = Phone::blank(first.phone.model());
        let symbol: String = elements.iter().map(|p| p.symbol()).collect();
        phone.set_symbol(symbol);
        Some(Phoneme {
            phone,
            tags: IndexMap::new(),
            elements,
        })
    }

    pub fn is_contour(&self) -> bool {
        !self.elements.is_empty()
    }

    pub fn elements(&self) -> &[Phoneme] {
        &self.elements
    }

    pub fn phone(&self) -> &Phone {
        &self.phone
    }

    pub fn phone_mut(&mut self) -> &mut Phone {
        &mut self.phone
    }

    /// Membership value of this phoneme in a named subsystem, if tagged.
    pub fn tag(&self, name: &str) -> Option<FeatureValue> {
        self.tags.get(name).copied()
    }

    pub fn set_tag(&mut self, name: impl Into<String>, value: FeatureValue) {
        self.tags.insert(name.into(), value);
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }

    pub fn model(&self) -> &Arc<FeatureModel> {
        self.phone.model()
    }

    pub fn symbol(&self) -> &str {
        self.phone.symbol()
    }

    pub fn is_symbol(&self, ipa: &str) -> bool {
        self.phone.is_symbol(ipa)
    }

    pub fn feature(&self, name: &str) -> Result<FeatureValue, PhonemeError> {
        self.phone.feature(name)
    }

    pub fn feature_is(&self, name: &str, value: FeatureValue) -> bool {
        self.phone.feature_is(name, value)
    }

    pub fn set_feature(&mut self, name: &str, value: FeatureValue) -> Result<(), PhonemeError> {
        self.phone.set_feature(name, value)
    }

    pub fn refresh_symbol(&mut self) -> Result<(), SymbolError> {
        self.phone.refresh_symbol()
    }

    pub fn sonority(&self) -> i32 {
        self.phone.sonority()
    }

    pub fn is_vowel(&self) -> bool {
        self.phone.is_vowel()
    }

    pub fn is_consonant(&self) -> bool {
        self.phone.is_consonant()
    }

    pub fn is_tone(&self) -> bool {
        self.phone.is_tone()
    }
}

impl fmt::Display for Phoneme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> Arc<FeatureModel> {
        Arc::new(FeatureModel::monophone().unwrap())
    }

    fn phone(m: &Arc<FeatureModel>, s: &str) -> Phone {
        Phone::from_ipa(m, s).unwrap()
    }

    #[test]
    fn classes_from_features() {
        let m = model();
        assert!(phone(&m, "a").is_vowel());
        assert!(phone(&m, "p").is_consonant());
        assert!(phone(&m, "i").is_high_vowel());
        assert!(phone(&m, "e").is_mid_vowel());
        assert!(phone(&m, "a").is_low_vowel());
        assert!(phone(&m, "e").is_front_vowel());
        assert!(phone(&m, "o").is_back_vowel());
        assert!(phone(&m, "o").is_rounded_vowel());
        assert!(phone(&m, "\u{0259}").is_central_vowel());
        assert!(phone(&m, "b").is_voiced_consonant());
        assert!(phone(&m, "t").is_stop());
        assert!(phone(&m, "n").is_nasal_stop());
        assert!(phone(&m, "r").is_approximant());
        assert!(phone(&m, "l").is_lateral_approximant());
        assert!(phone(&m, "s").is_fricative());
        assert!(!phone(&m, "s").is_tone());
    }

    #[test]
    fn sonority_scale() {
        let m = model();
        assert_eq!(phone(&m, "a").sonority(), 13);
        assert_eq!(phone(&m, "e").sonority(), 12);
        assert_eq!(phone(&m, "i").sonority(), 11);
        assert_eq!(phone(&m, "\u{0259}").sonority(), 10);
        assert_eq!(phone(&m, "r").sonority(), 9);
        assert_eq!(phone(&m, "l").sonority(), 8);
        assert_eq!(phone(&m, "m").sonority(), 5);
        assert_eq!(phone(&m, "z").sonority(), 3);
        assert_eq!(phone(&m, "s").sonority(), 2);
        assert_eq!(phone(&m, "b").sonority(), 2);
        assert_eq!(phone(&m, "p").sonority(), 0);
    }

    #[test]
    fn devoicing_moves_the_symbol() {
        let m = model();
        let mut p = phone(&m, "m");
        p.set_minus("voice").unwrap();
        p.refresh_symbol().unwrap();
        assert_eq!(p.symbol(), "m\u{0325}");
    }

    #[test]
    fn unknown_feature_is_an_error() {
        let m = model();
        let mut p = phone(&m, "m");
        assert!(matches!(
            p.set_feature("flavour", FeatureValue::Plus),
            Err(PhonemeError::UnknownFeature { .. })
        ));
        assert!(!p.feature_is("flavour", FeatureValue::Plus));
    }

    #[test]
    fn phoneme_equality_is_featural() {
        let m = model();
        let a = Phoneme::from_ipa(&m, "a").unwrap();
        let mut also_a = Phoneme::from_ipa(&m, "a").unwrap();
        also_a.set_tag("length", FeatureValue::Minus);
        assert_eq!(a, also_a);
        let e = Phoneme::from_ipa(&m, "e").unwrap();
        assert_ne!(a, e);
    }

    #[test]
    fn contour_concatenates_symbols() {
        let m = model();
        let ai = Phoneme::contour(vec![
            Phoneme::from_ipa(&m, "a").unwrap(),
            Phoneme::from_ipa(&m, "i").unwrap(),
        ])
        .unwrap();
        assert!(ai.is_contour());
        assert_eq!(ai.symbol(), "ai");
        assert_eq!(ai.elements().len(), 2);
    }

    #[test]
    fn aspiration_composes_via_diacritic() {
        let m = model();
        let mut p = phone(&m, "t");
        p.set_plus("aspirated").unwrap();
        p.refresh_symbol().unwrap();
        assert_eq!(p.symbol(), "t\u{02B0}");
    }
}
