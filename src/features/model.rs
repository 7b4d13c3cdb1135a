use crate::features::{search, FeatureValue, SymbolError};
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading a feature set.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("feature set file is missing the '{0}' header")]
    MissingHeader(&'static str),
    #[error("segments '{0}' and '{1}' share an identical feature vector")]
    DuplicateSymbol(char, char),
    #[error("segment '{symbol}' defines {found} feature values, expected {expected}")]
    VectorLengthMismatch {
        symbol: char,
        expected: usize,
        found: usize,
    },
    #[error("invalid entry '{value}' on line {line}")]
    InvalidValue { value: String, line: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A phonological feature model: a canonical feature order plus the IPA
/// lookup tables needed to translate between glyphs and feature vectors.
///
/// Models are immutable once loaded and are meant to be shared behind an
/// [`Arc`](std::sync::Arc) by every segment built against them. Table order
/// is preserved from the source files; it is the authoritative tie-break for
/// the inverse glyph search.
#[derive(Debug)]
pub struct FeatureModel {
    name: String,
    features: Vec<String>,
    index: HashMap<String, usize>,
    segments: IndexMap<char, Vec<FeatureValue>>,
    diacritics: IndexMap<char, Vec<(usize, FeatureValue)>>,
    reverse_diacritics: HashMap<BTreeSet<(usize, FeatureValue)>, char>,
}

impl FeatureModel {
    /// Loads a feature set from disk.
    ///
    /// The set file names the model and points at its segment and diacritic
    /// tables, which are resolved relative to the set file's directory:
    ///
    /// ```text
    /// # comment lines are ignored
    /// name monophone
    /// segments monophone_segments
    /// diacritics monophone_diacritics
    /// [consonantal]
    /// [sonorant]
    /// ```
    pub fn from_files<P: AsRef<Path>>(path: P) -> Result<FeatureModel, LoadError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;

        let mut name = None;
        let mut segments_file = None;
        let mut diacritics_file = None;
        let mut features = Vec::new();

        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(feature) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                features.push(feature.to_string());
                continue;
            }
            let mut parts = line.splitn(2, char::is_whitespace);
            let key = parts.next().unwrap_or_default();
            let value = parts.next().map(str::trim).unwrap_or_default();
            match key {
                "name" => name = Some(value.to_string()),
                "segments" => segments_file = Some(value.to_string()),
                "diacritics" => diacritics_file = Some(value.to_string()),
                _ => {}
            }
        }

        let name = name.ok_or(LoadError::MissingHeader("name"))?;
        let segments_file = segments_file.ok_or(LoadError::MissingHeader("segments"))?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));

        let segments_raw = fs::read_to_string(dir.join(&segments_file))?;
        let diacritics_raw = match diacritics_file.as_deref() {
            None | Some("0") => None,
            Some(f) => Some(fs::read_to_string(dir.join(f))?),
        };

        let feature_names: Vec<&str> = features.iter().map(String::as_str).collect();
        FeatureModel::from_tables(&name, &feature_names, &segments_raw, diacritics_raw.as_deref())
    }

    /// Builds a model from in-memory tables. This is the core constructor;
    /// [`from_files`](Self::from_files) and the built-in
    /// [`monophone`](Self::monophone) set both go through it.
    pub fn from_tables(
        name: &str,
        features: &[&str],
        segments: &str,
        diacritics: Option<&str>,
    ) -> Result<FeatureModel, LoadError> {
        let features: Vec<String> = features.iter().map(|f| f.to_string()).collect();
        let index: HashMap<String, usize> = features
            .iter()
            .enumerate()
            .map(|(i, f)| (f.clone(), i))
            .collect();

        let mut model = FeatureModel {
            name: name.to_string(),
            features,
            index,
            segments: IndexMap::new(),
            diacritics: IndexMap::new(),
            reverse_diacritics: HashMap::new(),
        };

        model.parse_segments(segments)?;
        if let Some(raw) = diacritics {
            model.parse_diacritics(raw)?;
        }
        Ok(model)
    }

    /// The built-in monophone feature set shipped with the crate.
    ///
    /// Each call builds a fresh model; callers that want sharing wrap the
    /// result in an `Arc`.
    pub fn monophone() -> Result<FeatureModel, LoadError> {
        super::monophone::build()
    }

    fn parse_segments(&mut self, raw: &str) -> Result<(), LoadError> {
        let mut seen: HashMap<Vec<FeatureValue>, char> = HashMap::new();
        for (lineno, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let glyph_str = parts.next().unwrap_or_default();
            let mut glyph_chars = glyph_str.chars();
            let glyph = match (glyph_chars.next(), glyph_chars.next()) {
                (Some(g), None) => g,
                _ => {
                    return Err(LoadError::InvalidValue {
                        value: glyph_str.to_string(),
                        line: lineno + 1,
                    })
                }
            };

            let mut vector = Vec::with_capacity(self.features.len());
            for part in parts {
                let value = FeatureValue::parse(part).ok_or_else(|| LoadError::InvalidValue {
                    value: part.to_string(),
                    line: lineno + 1,
                })?;
                vector.push(value);
            }
            if vector.len() != self.features.len() {
                return Err(LoadError::VectorLengthMismatch {
                    symbol: glyph,
                    expected: self.features.len(),
                    found: vector.len(),
                });
            }
            if let Some(&other) = seen.get(&vector) {
                return Err(LoadError::DuplicateSymbol(other, glyph));
            }
            if self.segments.contains_key(&glyph) {
                return Err(LoadError::DuplicateSymbol(glyph, glyph));
            }
            seen.insert(vector.clone(), glyph);
            self.segments.insert(glyph, vector);
        }
        Ok(())
    }

    fn parse_diacritics(&mut self, raw: &str) -> Result<(), LoadError> {
        for (lineno, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let mark_str = parts.next().unwrap_or_default();
            let mut mark_chars = mark_str.chars();
            let mark = match (mark_chars.next(), mark_chars.next()) {
                (Some(m), None) => m,
                _ => {
                    return Err(LoadError::InvalidValue {
                        value: mark_str.to_string(),
                        line: lineno + 1,
                    })
                }
            };

            let mut overrides = Vec::new();
            for part in parts {
                let invalid = || LoadError::InvalidValue {
                    value: part.to_string(),
                    line: lineno + 1,
                };
                let mut chars = part.chars();
                let value = chars
                    .next()
                    .and_then(FeatureValue::from_char)
                    .ok_or_else(invalid)?;
                let idx = *self.index.get(chars.as_str()).ok_or_else(invalid)?;
                overrides.push((idx, value));
            }

            let key: BTreeSet<(usize, FeatureValue)> = overrides.iter().copied().collect();
            self.reverse_diacritics.entry(key).or_insert(mark);
            self.diacritics.insert(mark, overrides);
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Feature names in canonical order.
    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    /// Canonical position of a feature name, if the model defines it.
    pub fn feature_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn has_feature(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn is_diacritic(&self, c: char) -> bool {
        self.diacritics.contains_key(&c)
    }

    /// Base glyphs with their vectors, in table order.
    pub fn segments(&self) -> impl Iterator<Item = (char, &[FeatureValue])> {
        self.segments.iter().map(|(g, v)| (*g, v.as_slice()))
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub(crate) fn diacritic_position(&self, mark: char) -> Option<usize> {
        self.diacritics.get_index_of(&mark)
    }

    pub(crate) fn reverse_diacritic(
        &self,
        overrides: &BTreeSet<(usize, FeatureValue)>,
    ) -> Option<char> {
        self.reverse_diacritics.get(overrides).copied()
    }

    /// Resolves an IPA string — one base glyph plus trailing diacritics —
    /// into a feature vector. Diacritic overrides apply left to right, later
    /// marks winning; overrides whose value is `0` are skipped.
    pub fn features_from_ipa(&self, ipa: &str) -> Result<Vec<FeatureValue>, SymbolError> {
        let mut chars = ipa.chars();
        let base = chars
            .next()
            .ok_or_else(|| SymbolError::UnknownSymbol(ipa.to_string()))?;
        let mut vector = self
            .segments
            .get(&base)
            .ok_or_else(|| SymbolError::UnknownSymbol(base.to_string()))?
            .clone();
        for mark in chars {
            let overrides = self
                .diacritics
                .get(&mark)
                .ok_or_else(|| SymbolError::UnknownSymbol(mark.to_string()))?;
            for &(idx, value) in overrides {
                if value == FeatureValue::Null {
                    continue;
                }
                vector[idx] = value;
            }
        }
        Ok(vector)
    }

    /// The base glyph whose vector equals `vector` exactly, if any.
    pub fn exact_symbol(&self, vector: &[FeatureValue]) -> Result<Option<char>, SymbolError> {
        let mut found = None;
        for (glyph, candidate) in self.segments.iter() {
            if candidate.as_slice() == vector {
                match found {
                    None => found = Some(*glyph),
                    Some(first) => return Err(SymbolError::AmbiguousFeatureSet(first, *glyph)),
                }
            }
        }
        Ok(found)
    }

    /// Renders a feature vector as an IPA string: the exact base glyph when
    /// one exists, otherwise the nearest glyph within
    /// [`IGNORE_DISTANCE`](crate::features::IGNORE_DISTANCE) whose difference
    /// is expressible as a disjoint union of diacritic override sets.
    pub fn ipa_from_features(&self, vector: &[FeatureValue]) -> Result<String, SymbolError> {
        if let Some(glyph) = self.exact_symbol(vector)? {
            return Ok(glyph.to_string());
        }
        match search::nearest_glyph(self, vector) {
            Some((base, marks)) => {
                let mut out = String::new();
                out.push(base);
                out.extend(marks);
                Ok(out)
            }
            None => Err(SymbolError::NoRepresentation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEATURES: &[&str] = &["consonantal", "voice", "nasal"];

    fn tiny_model() -> FeatureModel {
        FeatureModel::from_tables(
            "tiny",
            FEATURES,
            "p + - -\nb + + -\nm + + +\na - + -\n",
            Some("\u{0303} +nasal\n\u{0325} -voice\n"),
        )
        .unwrap()
    }

    #[test]
    fn lookup_base_glyph() {
        let model = tiny_model();
        let vector = model.features_from_ipa("p").unwrap();
        assert_eq!(
            vector,
            vec![FeatureValue::Plus, FeatureValue::Minus, FeatureValue::Minus]
        );
    }

    #[test]
    fn diacritics_override_left_to_right() {
        let model = tiny_model();
        let vector = model.features_from_ipa("a\u{0303}").unwrap();
        assert_eq!(
            vector,
            vec![FeatureValue::Minus, FeatureValue::Plus, FeatureValue::Plus]
        );
    }

    #[test]
    fn unknown_glyph_is_reported() {
        let model = tiny_model();
        assert!(matches!(
            model.features_from_ipa("q"),
            Err(SymbolError::UnknownSymbol(_))
        ));
    }

    #[test]
    fn unknown_diacritic_is_reported() {
        let model = tiny_model();
        assert!(matches!(
            model.features_from_ipa("p\u{02B0}"),
            Err(SymbolError::UnknownSymbol(_))
        ));
    }

    #[test]
    fn duplicate_vectors_fail_loading() {
        let err = FeatureModel::from_tables(
            "dup",
            FEATURES,
            "p + - -\nq + - -\n",
            None,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::DuplicateSymbol('p', 'q')));
    }

    #[test]
    fn short_vector_fails_loading() {
        let err = FeatureModel::from_tables("short", FEATURES, "p + -\n", None).unwrap_err();
        assert!(matches!(
            err,
            LoadError::VectorLengthMismatch {
                symbol: 'p',
                expected: 3,
                found: 2
            }
        ));
    }

    #[test]
    fn bad_value_fails_loading() {
        let err = FeatureModel::from_tables("bad", FEATURES, "p + ? -\n", None).unwrap_err();
        assert!(matches!(err, LoadError::InvalidValue { .. }));
    }

    #[test]
    fn diacritic_with_unknown_feature_fails() {
        let err = FeatureModel::from_tables(
            "bad",
            FEATURES,
            "p + - -\n",
            Some("\u{0303} +sibilant\n"),
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::InvalidValue { .. }));
    }

    #[test]
    fn exact_symbol_round_trip() {
        let model = tiny_model();
        for (glyph, vector) in model.segments() {
            assert_eq!(model.exact_symbol(vector).unwrap(), Some(glyph));
        }
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let model = FeatureModel::from_tables(
            "commented",
            FEATURES,
            "# header\n\np + - -\n",
            Some("# marks\n\u{0303} +nasal\n"),
        )
        .unwrap();
        assert_eq!(model.segment_count(), 1);
        assert!(model.is_diacritic('\u{0303}'));
    }
}
