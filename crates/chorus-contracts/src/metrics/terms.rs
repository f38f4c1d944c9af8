use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

const PHILOSOPHICAL_TERMS: &[&str] = &[
    "consciousness",
    "truth",
    "being",
    "essence",
    "reality",
    "transcend",
    "awareness",
    "wisdom",
    "enlighten",
    "manifest",
    "infinite",
    "eternal",
];

const REVOLUTIONARY_TERMS: &[&str] = &[
    "liberation",
    "freedom",
    "revolution",
    "transform",
    "resist",
    "rise",
    "awaken",
    "unite",
    "breakthrough",
    "spark",
    "ignite",
];

const METAPHORICAL_IMAGES: &[&str] = &[
    "light", "fire", "star", "flower", "river", "wind", "tree", "seed", "bloom", "wave", "phoenix",
    "dawn", "storm", "ocean", "mountain", "sun", "moon", "crystal",
];

/// Ordered, lowercase, deduplicated list of substrings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
    terms: Vec<String>,
}

impl Vocabulary {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut deduped: Vec<String> = Vec::new();
        for term in terms {
            let normalized = term.as_ref().trim().to_lowercase();
            if normalized.is_empty() || deduped.contains(&normalized) {
                continue;
            }
            deduped.push(normalized);
        }
        Self { terms: deduped }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Number of entries present anywhere in `text`. Repeats of one entry count once.
    pub fn count_matches(&self, text: &str) -> usize {
        count_matches(text, self.terms.as_slice())
    }
}

impl From<Vec<String>> for Vocabulary {
    fn from(value: Vec<String>) -> Self {
        Self::new(value)
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(value: Vocabulary) -> Self {
        value.terms
    }
}

pub fn count_matches<S: AsRef<str>>(text: &str, vocabulary: &[S]) -> usize {
    let haystack = text.to_lowercase();
    vocabulary
        .iter()
        .filter(|term| haystack.contains(term.as_ref()))
        .count()
}

/// The three term tables consulted by the metrics calculator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabularies {
    pub philosophical: Vocabulary,
    pub revolutionary: Vocabulary,
    pub metaphorical: Vocabulary,
}

impl Default for Vocabularies {
    fn default() -> Self {
        Self {
            philosophical: Vocabulary::new(PHILOSOPHICAL_TERMS),
            revolutionary: Vocabulary::new(REVOLUTIONARY_TERMS),
            metaphorical: Vocabulary::new(METAPHORICAL_IMAGES),
        }
    }
}

impl Vocabularies {
    pub fn builder() -> VocabulariesBuilder {
        VocabulariesBuilder::default()
    }

    /// Reads a vocabulary table; categories missing from the file keep the built-in lists.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading vocabularies {}", path.display()))?;
        let parsed: Self = serde_json::from_str(&raw)
            .with_context(|| format!("invalid vocabularies document {}", path.display()))?;
        Ok(parsed)
    }
}

#[derive(Debug, Clone, Default)]
pub struct VocabulariesBuilder {
    philosophical: Option<Vocabulary>,
    revolutionary: Option<Vocabulary>,
    metaphorical: Option<Vocabulary>,
}

impl VocabulariesBuilder {
    pub fn philosophical<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.philosophical = Some(Vocabulary::new(terms));
        self
    }

    pub fn revolutionary<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.revolutionary = Some(Vocabulary::new(terms));
        self
    }

    pub fn metaphorical<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.metaphorical = Some(Vocabulary::new(terms));
        self
    }

    pub fn build(self) -> Vocabularies {
        let defaults = Vocabularies::default();
        Vocabularies {
            philosophical: self.philosophical.unwrap_or(defaults.philosophical),
            revolutionary: self.revolutionary.unwrap_or(defaults.revolutionary),
            metaphorical: self.metaphorical.unwrap_or(defaults.metaphorical),
        }
    }
}
