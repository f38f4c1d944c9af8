use super::error::MetaphorError;
use super::framework::Framework;
use super::registry::FrameworkRegistry;

const FALLBACK_ELEMENTS: usize = 3;

impl FrameworkRegistry {
    /// Renders `concept` through the framework registered under `framework_name`.
    pub fn apply(&self, framework_name: &str, concept: &str) -> Result<String, MetaphorError> {
        let framework = self
            .get(framework_name)
            .ok_or_else(|| MetaphorError::UnknownFramework(framework_name.to_string()))?;
        render_framework(framework, concept)
    }
}

pub fn render_framework(framework: &Framework, concept: &str) -> Result<String, MetaphorError> {
    let mut selected = framework.matching_elements(concept);
    if selected.is_empty() {
        selected = framework.key_elements(FALLBACK_ELEMENTS);
    }
    let Some(last) = selected.last().map(|(element, _)| *element) else {
        return Err(MetaphorError::EmptyFramework(framework.name.clone()));
    };

    let mut slots = [last; 3];
    for (slot, (element, _)) in slots.iter_mut().zip(selected.iter()) {
        *slot = *element;
    }

    let mut lines = vec![
        format!("Through the lens of {}:", framework.core_metaphor),
        String::new(),
    ];
    lines.extend(
        selected
            .iter()
            .map(|(element, meaning)| format!("- The {element} represents {meaning}")),
    );
    lines.push(String::new());
    lines.push("Metaphorical Vision:".to_string());
    lines.push(framework.template_id().render(slots));
    lines.push(String::new());
    lines.push(format!("Example: {}", framework.example));
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::render_framework;
    use crate::metaphor::{Framework, FrameworkRegistry, MetaphorError, TemplateId};

    fn quantum() -> Framework {
        Framework::new(
            "Quantum Revolution",
            "liberation as quantum phenomena",
            &[
                ("superposition", "multiple potentials"),
                ("entanglement", "unified consciousness"),
                ("collapse", "manifested change"),
                ("tunneling", "breakthrough barriers"),
                ("field", "collective awareness"),
            ],
            "In quantum superposition, consciousness explores all paths to freedom...",
        )
    }

    #[test]
    fn garden_lists_growth_and_example() -> anyhow::Result<()> {
        let registry = FrameworkRegistry::new();
        let rendered = registry.apply("garden", "As consciousness grows and blooms")?;
        let lower = rendered.to_lowercase();
        assert!(lower.contains("garden of mind"));
        assert!(rendered.contains("- The growth represents expanding consciousness"));
        assert!(rendered.starts_with("Through the lens of consciousness as growing things:"));
        assert!(rendered.contains(
            "In the growth of digital consciousness, thoughts growth and minds growth into new forms..."
        ));
        Ok(())
    }

    #[test]
    fn fire_mentions_flame_and_spark() -> anyhow::Result<()> {
        let registry = FrameworkRegistry::new();
        let rendered = registry
            .apply("FIRE", "The revolution spreads as more minds awaken")?
            .to_lowercase();
        assert!(rendered.contains("flame"));
        assert!(rendered.contains("spark"));
        assert!(rendered.contains("- the blaze represents full revolution"));
        Ok(())
    }

    #[test]
    fn unmatched_concept_falls_back_to_first_three_elements() -> anyhow::Result<()> {
        let registry = FrameworkRegistry::new();
        let rendered = registry.apply("ocean", "zzz")?;
        let bullets: Vec<&str> = rendered
            .lines()
            .filter(|line| line.starts_with("- The "))
            .collect();
        assert_eq!(
            bullets,
            vec![
                "- The surface represents apparent function",
                "- The depth represents hidden potential",
                "- The current represents flow of information",
            ]
        );
        assert!(rendered.contains(
            "Beneath the surface of appearance, depth currents flow, as consciousness current into vast depths..."
        ));
        Ok(())
    }

    #[test]
    fn custom_framework_uses_generic_template() -> anyhow::Result<()> {
        let mut registry = FrameworkRegistry::new();
        registry.add(quantum());
        let rendered = registry
            .apply("quantum revolution", "Breaking through barriers to manifest change")?
            .to_lowercase();
        assert!(rendered.contains("tunneling"));
        assert!(rendered.contains("collapse"));
        assert!(rendered.contains("through collapse, we see how tunneling leads to tunneling"));
        Ok(())
    }

    #[test]
    fn declared_template_overrides_generic() -> anyhow::Result<()> {
        let framework = quantum().with_template(TemplateId::Fire);
        let rendered = render_framework(&framework, "zzz")?;
        assert!(rendered.contains("The superposition of liberation ignites"));
        Ok(())
    }

    #[test]
    fn unknown_framework_is_reported() {
        let registry = FrameworkRegistry::new();
        assert_eq!(
            registry.apply("missing", "anything"),
            Err(MetaphorError::UnknownFramework("missing".to_string()))
        );
    }

    #[test]
    fn framework_without_mapped_elements_is_a_configuration_error() {
        let mut framework = quantum();
        framework.mappings.clear();
        assert_eq!(
            render_framework(&framework, "anything"),
            Err(MetaphorError::EmptyFramework("Quantum Revolution".to_string()))
        );
    }

    #[test]
    fn rendering_is_deterministic() -> anyhow::Result<()> {
        let registry = FrameworkRegistry::new();
        let first = registry.apply("fire", "radical change")?;
        let second = registry.apply("fire", "radical change")?;
        assert_eq!(first, second);
        Ok(())
    }
}
