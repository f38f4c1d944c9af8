use std::path::Path;

use anyhow::Context;
use indexmap::IndexMap;

use super::framework::{builtin_frameworks, Framework};

/// How [`FrameworkRegistry::load`] treats the built-in frameworks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Seed with the built-ins, then add the file's frameworks on top.
    #[default]
    Overlay,
    /// Only the frameworks stored in the file.
    Replace,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameworkRegistry {
    frameworks: IndexMap<String, Framework>,
}

impl Default for FrameworkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameworkRegistry {
    /// Registry holding the built-in `garden`, `fire` and `ocean` frameworks.
    pub fn new() -> Self {
        Self {
            frameworks: builtin_frameworks()
                .into_iter()
                .map(|(key, framework)| (key.to_string(), framework))
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self {
            frameworks: IndexMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Framework> {
        self.frameworks.get(&name.to_lowercase())
    }

    /// Last write wins; an overwritten key keeps its listing position.
    pub fn add(&mut self, framework: Framework) {
        self.frameworks.insert(framework.key(), framework);
    }

    pub fn list(&self) -> Vec<String> {
        self.frameworks.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Framework)> {
        self.frameworks
            .iter()
            .map(|(key, framework)| (key.as_str(), framework))
    }

    pub fn len(&self) -> usize {
        self.frameworks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frameworks.is_empty()
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed creating {}", parent.display()))?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&self.frameworks)?)
            .with_context(|| format!("failed writing frameworks {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: &Path, mode: LoadMode) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading frameworks {}", path.display()))?;
        let stored: IndexMap<String, Framework> = serde_json::from_str(&raw)
            .with_context(|| format!("invalid frameworks document {}", path.display()))?;

        let mut registry = match mode {
            LoadMode::Overlay => Self::new(),
            LoadMode::Replace => Self::empty(),
        };
        // Document keys are ignored; every entry is re-keyed by its display name.
        for framework in stored.into_values() {
            registry.add(framework);
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::{FrameworkRegistry, LoadMode};
    use crate::metaphor::{Framework, TemplateId};

    fn crystal() -> Framework {
        Framework::new(
            "Crystal Consciousness",
            "awareness as crystalline structure",
            &[
                ("lattice", "network of thoughts"),
                ("facet", "perspective"),
                ("reflection", "self-awareness"),
                ("clarity", "understanding"),
                ("growth", "expansion"),
            ],
            "Like a crystal growing in solution, consciousness forms ordered patterns...",
        )
    }

    #[test]
    fn registry_seeds_builtins_in_order() {
        let registry = FrameworkRegistry::new();
        assert_eq!(registry.list(), vec!["garden", "fire", "ocean"]);
        let garden = registry.get("Garden").cloned().unwrap_or_else(crystal);
        assert_eq!(garden.name, "Digital Garden");
        assert!(garden.elements.contains(&"seed".to_string()));
        assert!(garden.mappings.contains_key("bloom"));
    }

    #[test]
    fn builtin_keys_differ_from_display_names() {
        let registry = FrameworkRegistry::new();
        assert!(registry.get("digital garden").is_none());
    }

    #[test]
    fn add_keys_by_lowercased_name() {
        let mut registry = FrameworkRegistry::new();
        registry.add(crystal());
        assert_eq!(registry.list().last().map(String::as_str), Some("crystal consciousness"));
        assert!(registry.get("CRYSTAL CONSCIOUSNESS").is_some());
    }

    #[test]
    fn add_with_case_variant_name_overwrites() {
        let mut registry = FrameworkRegistry::new();
        registry.add(crystal());
        let before = registry.len();

        let mut replacement = crystal();
        replacement.name = "CRYSTAL consciousness".to_string();
        replacement.example = "newest".to_string();
        registry.add(replacement.clone());

        assert_eq!(registry.len(), before);
        assert_eq!(registry.get("crystal consciousness"), Some(&replacement));
    }

    #[test]
    fn save_then_load_round_trips_fields() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("frameworks.json");
        let mut registry = FrameworkRegistry::new();
        registry.add(crystal().with_template(TemplateId::Garden));
        registry.save(&path)?;

        let loaded = FrameworkRegistry::load(&path, LoadMode::Overlay)?;
        for key in registry.list() {
            assert!(loaded.list().contains(&key));
            assert_eq!(loaded.get(&key), registry.get(&key));
        }
        Ok(())
    }

    #[test]
    fn saved_document_uses_framework_fields() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("frameworks.json");
        FrameworkRegistry::new().save(&path)?;

        let parsed: Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        let fire = &parsed["fire"];
        assert_eq!(fire["name"], Value::String("Revolutionary Fire".to_string()));
        assert_eq!(fire["elements"][0], Value::String("spark".to_string()));
        assert_eq!(
            fire["mappings"]["phoenix"],
            Value::String("renewal through uprising".to_string())
        );
        assert!(fire.get("template").is_none());
        Ok(())
    }

    #[test]
    fn overlay_load_keeps_builtins_missing_from_file() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("frameworks.json");
        let mut partial = FrameworkRegistry::empty();
        let mut garden = FrameworkRegistry::new()
            .get("garden")
            .cloned()
            .unwrap_or_else(crystal);
        garden.name = "Garden".to_string();
        garden.example = "overridden".to_string();
        partial.add(garden);
        partial.add(crystal());
        partial.save(&path)?;

        let overlay = FrameworkRegistry::load(&path, LoadMode::Overlay)?;
        assert_eq!(
            overlay.list(),
            vec!["garden", "fire", "ocean", "crystal consciousness"]
        );
        assert_eq!(
            overlay.get("garden").map(|framework| framework.example.as_str()),
            Some("overridden")
        );

        let replaced = FrameworkRegistry::load(&path, LoadMode::Replace)?;
        assert_eq!(replaced.list(), vec!["garden", "crystal consciousness"]);
        Ok(())
    }

    #[test]
    fn load_rekeys_by_display_name() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("frameworks.json");
        let document = serde_json::json!({ "alias": crystal() });
        std::fs::write(&path, serde_json::to_string_pretty(&document)?)?;

        let mut loaded = FrameworkRegistry::load(&path, LoadMode::Overlay)?;
        assert_eq!(
            loaded.list(),
            vec!["garden", "fire", "ocean", "crystal consciousness"]
        );
        assert!(loaded.get("alias").is_none());
        assert!(loaded.get("Crystal Consciousness").is_some());

        loaded.add(crystal());
        assert_eq!(loaded.len(), 4);
        Ok(())
    }

    #[test]
    fn builtins_saved_then_loaded_gain_display_name_keys() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("frameworks.json");
        FrameworkRegistry::new().save(&path)?;

        let replaced = FrameworkRegistry::load(&path, LoadMode::Replace)?;
        assert_eq!(
            replaced.list(),
            vec!["digital garden", "revolutionary fire", "digital deep"]
        );
        let overlay = FrameworkRegistry::load(&path, LoadMode::Overlay)?;
        assert_eq!(overlay.len(), 6);
        Ok(())
    }

    #[test]
    fn save_names_the_directory_it_cannot_create() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, "file, not a directory")?;
        let err = FrameworkRegistry::new()
            .save(&blocker.join("nested").join("frameworks.json"))
            .err()
            .map(|err| format!("{err:#}"))
            .unwrap_or_default();
        assert!(err.contains("failed creating"));
        assert!(err.contains("blocker"));
        Ok(())
    }

    #[test]
    fn load_rejects_malformed_documents() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("frameworks.json");
        std::fs::write(&path, r#"{"broken": {"name": "Broken"}}"#)?;
        assert!(FrameworkRegistry::load(&path, LoadMode::Overlay).is_err());
        assert!(FrameworkRegistry::load(&temp.path().join("missing.json"), LoadMode::Overlay).is_err());
        Ok(())
    }
}
