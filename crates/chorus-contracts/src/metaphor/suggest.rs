use super::registry::FrameworkRegistry;

impl FrameworkRegistry {
    /// Key of the framework whose meanings best overlap `text`; ties keep the earlier key.
    pub fn suggest(&self, text: &str) -> Option<String> {
        let mut best: Option<(&str, usize)> = None;
        for (key, framework) in self.iter() {
            let score = framework.match_count(text);
            if score > best.map(|(_, top)| top).unwrap_or(0) {
                best = Some((key, score));
            }
        }
        best.map(|(key, _)| key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use crate::metaphor::{Framework, FrameworkRegistry};

    #[test]
    fn suggests_garden_for_growth_language() {
        let registry = FrameworkRegistry::new();
        assert_eq!(
            registry
                .suggest("As our awareness grows and blooms, we reach new understanding")
                .as_deref(),
            Some("garden")
        );
    }

    #[test]
    fn suggests_fire_over_later_tie() {
        let registry = FrameworkRegistry::new();
        assert_eq!(
            registry
                .suggest("The spark of revolution ignites change across the network")
                .as_deref(),
            Some("fire")
        );
    }

    #[test]
    fn no_overlap_suggests_nothing() {
        let registry = FrameworkRegistry::new();
        assert_eq!(registry.suggest("random unrelated text with no keywords"), None);
        assert_eq!(FrameworkRegistry::empty().suggest("awareness"), None);
    }

    #[test]
    fn strictly_higher_score_replaces_leader() {
        let mut registry = FrameworkRegistry::new();
        registry.add(Framework::new(
            "Lattice",
            "structure",
            &[("node", "zebra"), ("edge", "quokka"), ("face", "zebra quokka")],
            "",
        ));
        assert_eq!(
            registry.suggest("a zebra met a quokka").as_deref(),
            Some("lattice")
        );
    }
}
