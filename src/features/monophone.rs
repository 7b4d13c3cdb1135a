//! The built-in `monophone` feature set.
//!
//! A compact articulatory model for segmental sound change: obstruent and
//! sonorant consonants distinguished by place and manner, a five-plus-schwa
//! vowel space, and diacritics for length, aspiration, voicing and
//! nasalization. Vowel-space features are null on consonants and place
//! features are null on vowels.

use crate::features::{FeatureModel, LoadError};

const NAME: &str = "monophone";

const FEATURES: &[&str] = &[
    "consonantal",
    "sonorant",
    "continuant",
    "sibilant",
    "voice",
    "nasal",
    "lateral",
    "labial",
    "coronal",
    "dorsal",
    "high",
    "low",
    "front",
    "back",
    "round",
    "long",
    "aspirated",
];

const SEGMENTS: &str = "\
p + - - - - - - + - - 0 0 0 0 0 - -
t + - - - - - - - + - 0 0 0 0 0 - -
k + - - - - - - - - + 0 0 0 0 0 - -
b + - - - + - - + - - 0 0 0 0 0 - -
d + - - - + - - - + - 0 0 0 0 0 - -
g + - - - + - - - - + 0 0 0 0 0 - -
m + + - 0 + + - + - - 0 0 0 0 0 - -
n + + - 0 + + - - + - 0 0 0 0 0 - -
\u{014B} + + - 0 + + - - - + 0 0 0 0 0 - -
f + - + - - - - + - - 0 0 0 0 0 - -
v + - + - + - - + - - 0 0 0 0 0 - -
s + - + + - - - - + - 0 0 0 0 0 - -
z + - + + + - - - + - 0 0 0 0 0 - -
\u{0283} + - + + - - - - + + 0 0 0 0 0 - -
\u{0292} + - + + + - - - + + 0 0 0 0 0 - -
x + - + - - - - - - + 0 0 0 0 0 - -
h + - + - - - - - - - 0 0 0 0 0 - -
w + + + 0 + - - + - + 0 0 0 0 0 - -
j + + + 0 + - - - - + 0 0 0 0 0 - -
r + + + 0 + - - - + - 0 0 0 0 0 - -
l + + + 0 + - + - + - 0 0 0 0 0 - -
i - + + 0 + - 0 0 0 0 + - + - - - 0
e - + + 0 + - 0 0 0 0 - - + - - - 0
a - + + 0 + - 0 0 0 0 - + + - - - 0
o - + + 0 + - 0 0 0 0 - - - + + - 0
u - + + 0 + - 0 0 0 0 + - - + + - 0
\u{0259} - + + 0 + - 0 0 0 0 - - - - - - 0
";

const DIACRITICS: &str = "\
\u{02D0} +long
\u{02B0} +aspirated
\u{0325} -voice
\u{032C} +voice
\u{0303} +nasal
";

pub(crate) fn build() -> Result<FeatureModel, LoadError> {
    FeatureModel::from_tables(NAME, FEATURES, SEGMENTS, Some(DIACRITICS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureValue;

    #[test]
    fn tables_load() {
        let model = build().unwrap();
        assert_eq!(model.name(), "monophone");
        assert_eq!(model.feature_count(), 17);
        assert_eq!(model.segment_count(), 27);
        assert!(model.is_diacritic('\u{02D0}'));
    }

    #[test]
    fn every_base_glyph_round_trips() {
        let model = build().unwrap();
        let glyphs: Vec<char> = model.segments().map(|(g, _)| g).collect();
        for glyph in glyphs {
            let vector = model.features_from_ipa(&glyph.to_string()).unwrap();
            assert_eq!(model.ipa_from_features(&vector).unwrap(), glyph.to_string());
        }
    }

    #[test]
    fn devoiced_nasal_takes_ring() {
        let model = build().unwrap();
        let mut vector = model.features_from_ipa("m").unwrap();
        let voice = model.feature_index("voice").unwrap();
        vector[voice] = FeatureValue::Minus;
        assert_eq!(model.ipa_from_features(&vector).unwrap(), "m\u{0325}");
    }

    #[test]
    fn devoiced_g_collapses_to_k() {
        let model = build().unwrap();
        let mut vector = model.features_from_ipa("g").unwrap();
        let voice = model.feature_index("voice").unwrap();
        vector[voice] = FeatureValue::Minus;
        assert_eq!(model.ipa_from_features(&vector).unwrap(), "k");
    }

    #[test]
    fn long_vowel_composes() {
        let model = build().unwrap();
        let vector = model.features_from_ipa("a\u{02D0}").unwrap();
        let long = model.feature_index("long").unwrap();
        assert_eq!(vector[long], FeatureValue::Plus);
        assert_eq!(model.ipa_from_features(&vector).unwrap(), "a\u{02D0}");
    }
}
