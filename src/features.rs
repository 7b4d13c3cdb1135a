//! Phonological feature models.
//!
//! A feature model fixes a canonical ordering of feature names and carries
//! two lookup tables: IPA base glyphs to feature vectors, and diacritic
//! characters to feature overrides. It answers both directions of the
//! mapping — IPA string to feature vector, and feature vector back to an IPA
//! glyph with diacritics via a bounded nearest-neighbour search.

mod model;
mod monophone;
mod search;

pub use model::{FeatureModel, LoadError};
pub use search::IGNORE_DISTANCE;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Value of a single phonological feature.
///
/// `Null` means the feature is unspecified or not applicable for the
/// segment — vowel-space features on a consonant, for example.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum FeatureValue {
    Plus,
    Minus,
    Null,
}

impl FeatureValue {
    /// Parses the textual form used by feature-set files: `+`, `-` or `0`.
    pub fn parse(s: &str) -> Option<FeatureValue> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => FeatureValue::from_char(c),
            _ => None,
        }
    }

    pub fn from_char(c: char) -> Option<FeatureValue> {
        match c {
            '+' => Some(FeatureValue::Plus),
            '-' => Some(FeatureValue::Minus),
            '0' => Some(FeatureValue::Null),
            _ => None,
        }
    }

    pub fn glyph(&self) -> char {
        match self {
            FeatureValue::Plus => '+',
            FeatureValue::Minus => '-',
            FeatureValue::Null => '0',
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.glyph())
    }
}

/// Errors raised while translating between IPA symbols and feature vectors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolError {
    /// A code point is neither a base glyph nor a diacritic of the model.
    #[error("symbol '{0}' not found in IPA lookup")]
    UnknownSymbol(String),
    /// The inverse search found no base glyph within reach of the vector.
    #[error("no IPA representation found for feature vector")]
    NoRepresentation,
    /// Two base glyphs share the vector — the model violates its load
    /// invariant.
    #[error("symbols '{0}' and '{1}' match the same feature vector")]
    AmbiguousFeatureSet(char, char),
}
