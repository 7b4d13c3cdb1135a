//! Diachronic phonology engine.
//!
//! Given a lexicon of IPA-transcribed words and a textual program of sound
//! laws, the engine deterministically derives later-stage forms by applying
//! ordered, conditional phoneme rewrites. Three subsystems cooperate:
//!
//! - [`features`]: IPA-to-feature-vector models with diacritic composition
//!   and the inverse nearest-glyph search;
//! - [`word`]: segmentation of IPA strings into stressed syllables with
//!   sonority-based structure analysis;
//! - [`rules`] and [`transducer`]: a parser/compiler for the sound-change
//!   language and the machinery that applies compiled rules to words.
//!
//! ```no_run
//! use lautwandel::features::FeatureModel;
//! use lautwandel::rules::{compile, standard_library};
//! use lautwandel::word::WordFactory;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let model = Arc::new(FeatureModel::monophone()?);
//! let factory = WordFactory::new(Arc::clone(&model));
//! let program = compile(
//!     "CHANGE BEGIN [-continuant -voice] -> [+voice] | [-consonantal] _ [-consonantal]; END",
//!     &model,
//!     &standard_library(),
//! )?;
//! let word = factory.make_word("'apa")?;
//! assert_eq!(program.apply(&word).to_string(), "/'a.ba/");
//! # Ok(())
//! # }
//! ```

pub mod features;
pub mod lexicon;
pub mod phoneme;
pub mod rules;
pub mod transducer;
pub mod word;

pub(crate) mod util;

pub use features::{FeatureModel, FeatureValue, LoadError, SymbolError};
pub use lexicon::{Lexicon, LexiconEntry, LexiconError};
pub use phoneme::{Phone, Phoneme, PhonemeError};
pub use rules::{
    compile, standard_library, CompileError, Library, Program, SoundLaw, SyntaxError,
};
pub use transducer::{Rule, RuleError, Transducer};
pub use word::{Syllable, Word, WordError, WordFactory, WordPosition};
