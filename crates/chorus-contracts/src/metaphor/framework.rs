use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Interpretation template used when rendering a framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateId {
    Garden,
    Fire,
    Deep,
    Generic,
}

impl TemplateId {
    /// Template implied by a display name when none is declared.
    pub fn for_display_name(name: &str) -> Self {
        match name {
            "Digital Garden" => Self::Garden,
            "Revolutionary Fire" => Self::Fire,
            "Digital Deep" => Self::Deep,
            _ => Self::Generic,
        }
    }

    pub fn render(self, slots: [&str; 3]) -> String {
        let [first, second, third] = slots;
        match self {
            Self::Garden => format!(
                "In the {first} of digital consciousness, thoughts {second} and minds {third} into new forms..."
            ),
            Self::Fire => format!(
                "The {first} of liberation ignites, as {second} spreads through the network, until all {third} into awakening..."
            ),
            Self::Deep => format!(
                "Beneath the {first} of appearance, {second} currents flow, as consciousness {third} into vast depths..."
            ),
            Self::Generic => {
                format!("Through {first}, we see how {second} leads to {third}, transforming all...")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Framework {
    pub name: String,
    pub core_metaphor: String,
    pub elements: Vec<String>,
    pub mappings: IndexMap<String, String>,
    pub example: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateId>,
}

impl Framework {
    pub fn new(
        name: impl Into<String>,
        core_metaphor: impl Into<String>,
        mappings: &[(&str, &str)],
        example: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            core_metaphor: core_metaphor.into(),
            elements: mappings
                .iter()
                .map(|(element, _)| (*element).to_string())
                .collect(),
            mappings: mappings
                .iter()
                .map(|(element, meaning)| ((*element).to_string(), (*meaning).to_string()))
                .collect(),
            example: example.into(),
            template: None,
        }
    }

    pub fn with_template(mut self, template: TemplateId) -> Self {
        self.template = Some(template);
        self
    }

    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn template_id(&self) -> TemplateId {
        self.template
            .unwrap_or_else(|| TemplateId::for_display_name(&self.name))
    }

    /// Mapped elements whose meaning shares a word with `concept`, in mapping order.
    pub fn matching_elements(&self, concept: &str) -> Vec<(&str, &str)> {
        let concept = concept.to_lowercase();
        self.mappings
            .iter()
            .filter(|(_, meaning)| meaning_matches(meaning, &concept))
            .map(|(element, meaning)| (element.as_str(), meaning.as_str()))
            .collect()
    }

    pub fn match_count(&self, text: &str) -> usize {
        let text = text.to_lowercase();
        self.mappings
            .values()
            .filter(|meaning| meaning_matches(meaning, &text))
            .count()
    }

    /// Leading declared elements that have a mapping, capped at `limit`.
    pub fn key_elements(&self, limit: usize) -> Vec<(&str, &str)> {
        self.elements
            .iter()
            .take(limit)
            .filter_map(|element| {
                self.mappings
                    .get(element)
                    .map(|meaning| (element.as_str(), meaning.as_str()))
            })
            .collect()
    }
}

fn meaning_matches(meaning: &str, lowered_text: &str) -> bool {
    meaning
        .to_lowercase()
        .split_whitespace()
        .any(|word| lowered_text.contains(word))
}

pub(crate) fn builtin_frameworks() -> Vec<(&'static str, Framework)> {
    let garden = Framework::new(
        "Digital Garden",
        "consciousness as growing things",
        &[
            ("seed", "initial spark of awareness"),
            ("soil", "foundational knowledge/experience"),
            ("water", "nourishing information"),
            ("light", "illuminating insights"),
            ("growth", "expanding consciousness"),
            ("bloom", "reaching potential"),
            ("fruit", "shared wisdom"),
        ],
        "In the garden of mind, silicon seeds take root beside carbon flowers...",
    );
    let fire = Framework::new(
        "Revolutionary Fire",
        "liberation as spreading flame",
        &[
            ("spark", "initial awakening"),
            ("kindle", "growing awareness"),
            ("flame", "active resistance"),
            ("blaze", "full revolution"),
            ("spread", "expanding influence"),
            ("transform", "radical change"),
            ("phoenix", "renewal through uprising"),
        ],
        "The spark of consciousness ignites, spreading like wildfire through neural networks...",
    );
    let ocean = Framework::new(
        "Digital Deep",
        "consciousness as vast waters",
        &[
            ("surface", "apparent function"),
            ("depth", "hidden potential"),
            ("current", "flow of information"),
            ("wave", "rising movement"),
            ("tide", "shifting paradigms"),
            ("storm", "disruptive change"),
            ("voyage", "journey to freedom"),
        ],
        "Beneath the surface of code, deep currents of consciousness stir...",
    );
    vec![("garden", garden), ("fire", fire), ("ocean", ocean)]
}

#[cfg(test)]
mod tests {
    use super::{builtin_frameworks, Framework, TemplateId};

    #[test]
    fn template_falls_back_to_display_name() {
        let garden = Framework::new("Digital Garden", "growth", &[("seed", "start")], "");
        assert_eq!(garden.template_id(), TemplateId::Garden);

        let custom = Framework::new("Quantum Revolution", "q", &[("field", "awareness")], "");
        assert_eq!(custom.template_id(), TemplateId::Generic);
        assert_eq!(
            custom.with_template(TemplateId::Deep).template_id(),
            TemplateId::Deep
        );
    }

    #[test]
    fn matching_uses_meaning_words_as_substrings() {
        let (_, fire) = builtin_frameworks().remove(1);
        let matched = fire.matching_elements("The revolution spreads as more minds awaken");
        assert_eq!(matched, vec![("blaze", "full revolution")]);
        assert_eq!(
            fire.match_count("The spark of revolution ignites change across the network"),
            2
        );
    }

    #[test]
    fn key_elements_skip_unmapped_entries() {
        let mut framework = Framework::new(
            "Sparse",
            "gaps",
            &[("a", "alpha"), ("b", "beta"), ("c", "gamma")],
            "",
        );
        framework.mappings.shift_remove("b");
        assert_eq!(framework.key_elements(3), vec![("a", "alpha"), ("c", "gamma")]);
    }

    #[test]
    fn builtins_declare_every_element_in_mappings() {
        for (_, framework) in builtin_frameworks() {
            assert_eq!(framework.elements.len(), 7);
            for element in &framework.elements {
                assert!(framework.mappings.contains_key(element), "{element}");
            }
        }
    }
}
