//! Sound laws: compiled rules wrapped with their human-readable metadata.

use crate::transducer::Rule;
use crate::word::Word;
use serde::{Deserialize, Serialize};

/// Metadata from a law's preamble. Serializable so that derivations can be
/// catalogued alongside the lexica they produce.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LawMeta {
    pub name: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub library_name: Option<String>,
    pub library_version: Option<String>,
}

/// One compiled `CHANGE` law: its metadata and its rules, applied in
/// declaration order.
#[derive(Debug)]
pub struct SoundLaw {
    meta: LawMeta,
    rules: Vec<Rule>,
}

impl SoundLaw {
    pub fn new(meta: LawMeta, rules: Vec<Rule>) -> SoundLaw {
        SoundLaw { meta, rules }
    }

    pub fn meta(&self) -> &LawMeta {
        &self.meta
    }

    pub fn name(&self) -> Option<&str> {
        self.meta.name.as_deref()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn apply(&self, word: &Word) -> Word {
        let mut current = word.clone();
        for rule in &self.rules {
            current = rule.apply(&current);
        }
        current
    }

    /// The law's metadata as JSON.
    pub fn meta_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.meta)
    }
}

/// An ordered set of laws applied as one unit.
#[derive(Debug)]
pub struct SoundLawGroup {
    meta: LawMeta,
    laws: Vec<SoundLaw>,
}

impl SoundLawGroup {
    pub fn new(meta: LawMeta, laws: Vec<SoundLaw>) -> SoundLawGroup {
        SoundLawGroup { meta, laws }
    }

    pub fn meta(&self) -> &LawMeta {
        &self.meta
    }

    pub fn laws(&self) -> &[SoundLaw] {
        &self.laws
    }

    pub fn apply(&self, word: &Word) -> Word {
        let mut current = word.clone();
        for law in &self.laws {
            current = law.apply(&current);
        }
        current
    }
}

#[derive(Debug)]
pub enum ProgramItem {
    Law(SoundLaw),
    Group(SoundLawGroup),
}

impl ProgramItem {
    pub fn apply(&self, word: &Word) -> Word {
        match self {
            ProgramItem::Law(law) => law.apply(word),
            ProgramItem::Group(group) => group.apply(word),
        }
    }
}

/// A whole compiled rule program.
#[derive(Debug)]
pub struct Program {
    items: Vec<ProgramItem>,
}

impl Program {
    pub fn new(items: Vec<ProgramItem>) -> Program {
        Program { items }
    }

    pub fn items(&self) -> &[ProgramItem] {
        &self.items
    }

    /// Every law in the program, groups flattened, in declaration order.
    pub fn laws(&self) -> impl Iterator<Item = &SoundLaw> {
        self.items.iter().flat_map(|item| match item {
            ProgramItem::Law(law) => std::slice::from_ref(law).iter(),
            ProgramItem::Group(group) => group.laws().iter(),
        })
    }

    /// Derives a word through the whole program in declaration order.
    pub fn apply(&self, word: &Word) -> Word {
        let mut current = word.clone();
        for item in &self.items {
            current = item.apply(&current);
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_serializes_to_json() {
        let meta = LawMeta {
            name: Some(String::from("Lenition")),
            date: Some(String::from("450")),
            ..LawMeta::default()
        };
        let law = SoundLaw::new(meta, Vec::new());
        let json = law.meta_json().unwrap();
        assert!(json.contains("Lenition"));
        let parsed: LawMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(&parsed, law.meta());
    }
}
