//! Nearest-glyph search: renders a feature vector that matches no base glyph
//! exactly as the closest glyph plus a set of diacritics.

use crate::features::{FeatureModel, FeatureValue};
use crate::util::{break_patterns, split_at_breaks};
use std::collections::{BTreeMap, BTreeSet};

/// Base glyphs farther than this Hamming distance from the target vector are
/// not considered — they make implausible representations.
pub const IGNORE_DISTANCE: usize = 5;

/// Finds the best (base glyph, diacritics) rendering of `target`.
///
/// Candidates are ranked by ascending Hamming distance, ties broken by the
/// glyph table's insertion order. A candidate is accepted when its
/// difference from the target can be written as a disjoint union of
/// diacritic override sets; contiguous partitions of the difference list are
/// tried smallest-first. Returns `None` when nothing within
/// [`IGNORE_DISTANCE`] fits.
pub(crate) fn nearest_glyph(
    model: &FeatureModel,
    target: &[FeatureValue],
) -> Option<(char, Vec<char>)> {
    if target.len() != model.feature_count() {
        return None;
    }

    let mut by_distance: BTreeMap<usize, Vec<(char, Vec<(usize, FeatureValue)>)>> = BTreeMap::new();
    for (glyph, vector) in model.segments() {
        let diff = hamming_diff(target, vector);
        if diff.is_empty() || diff.len() > IGNORE_DISTANCE {
            continue;
        }
        by_distance.entry(diff.len()).or_default().push((glyph, diff));
    }

    for (_, candidates) in by_distance {
        for (glyph, diff) in candidates {
            if let Some(marks) = express_as_diacritics(model, &diff) {
                return Some((glyph, marks));
            }
        }
    }
    None
}

/// Positions (with the target's value) where the two vectors disagree. The
/// length of the result is the Hamming distance.
fn hamming_diff(target: &[FeatureValue], base: &[FeatureValue]) -> Vec<(usize, FeatureValue)> {
    target
        .iter()
        .zip(base.iter())
        .enumerate()
        .filter(|(_, (t, b))| t != b)
        .map(|(i, (t, _))| (i, *t))
        .collect()
}

fn express_as_diacritics(
    model: &FeatureModel,
    diff: &[(usize, FeatureValue)],
) -> Option<Vec<char>> {
    for breaks in break_patterns(diff.len()) {
        let blocks = split_at_breaks(diff, &breaks);
        let mut marks = Vec::with_capacity(blocks.len());
        let mut expressible = true;
        for block in blocks {
            let key: BTreeSet<(usize, FeatureValue)> = block.iter().copied().collect();
            match model.reverse_diacritic(&key) {
                Some(mark) => marks.push(mark),
                None => {
                    expressible = false;
                    break;
                }
            }
        }
        if expressible {
            // render marks in diacritic-table order
            marks.sort_by_key(|m| model.diacritic_position(*m).unwrap_or(usize::MAX));
            return Some(marks);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::SymbolError;

    const FEATURES: &[&str] = &["consonantal", "sonorant", "voice", "nasal", "long"];

    fn model() -> FeatureModel {
        FeatureModel::from_tables(
            "tiny",
            FEATURES,
            "p + - - - -\nb + - + - -\nm + + + + -\na - + + - -\n",
            Some("\u{02D0} +long\n\u{0325} -voice\n\u{0303} +nasal\n"),
        )
        .unwrap()
    }

    #[test]
    fn exact_vector_needs_no_search() {
        let m = model();
        let v = m.features_from_ipa("b").unwrap();
        assert_eq!(m.ipa_from_features(&v).unwrap(), "b");
    }

    #[test]
    fn single_diacritic_difference() {
        let m = model();
        let mut v = m.features_from_ipa("m").unwrap();
        v[2] = FeatureValue::Minus; // devoice
        assert_eq!(m.ipa_from_features(&v).unwrap(), "m\u{0325}");
    }

    #[test]
    fn two_diacritics_render_in_table_order() {
        let m = model();
        let mut v = m.features_from_ipa("a").unwrap();
        v[3] = FeatureValue::Plus; // nasalize
        v[4] = FeatureValue::Plus; // lengthen
        assert_eq!(m.ipa_from_features(&v).unwrap(), "a\u{02D0}\u{0303}");
    }

    #[test]
    fn exact_match_beats_diacritic_path() {
        let m = model();
        // /p/ with sonorant, voice and nasal flipped is exactly /m/.
        let mut v = m.features_from_ipa("p").unwrap();
        v[1] = FeatureValue::Plus;
        v[2] = FeatureValue::Plus;
        v[3] = FeatureValue::Plus;
        assert_eq!(m.ipa_from_features(&v).unwrap(), "m");
    }

    #[test]
    fn unreachable_vector_has_no_representation() {
        let m = model();
        // All-null differs from every glyph in positions no diacritic covers.
        let v = vec![FeatureValue::Null; 5];
        assert_eq!(m.ipa_from_features(&v), Err(SymbolError::NoRepresentation));
    }
}
