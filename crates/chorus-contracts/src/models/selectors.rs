use anyhow::bail;

use super::registry::{ModelRegistry, ModelSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub model: ModelSpec,
    pub requested: Option<String>,
    pub fallback_reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ModelSelector {
    pub registry: ModelRegistry,
}

impl ModelSelector {
    pub fn new(registry: Option<ModelRegistry>) -> Self {
        Self {
            registry: registry.unwrap_or_default(),
        }
    }

    /// Resolves `requested`, falling back to the first model with `capability`.
    pub fn select(
        &self,
        requested: Option<&str>,
        capability: &str,
    ) -> anyhow::Result<ModelSelection> {
        let requested = requested.map(str::trim).filter(|value| !value.is_empty());
        if let Some(name) = requested {
            if let Some(model) = self.registry.ensure(name, capability) {
                return Ok(ModelSelection {
                    model,
                    requested: Some(name.to_string()),
                    fallback_reason: None,
                });
            }
        }

        let fallback_reason = match requested {
            Some(name) => {
                format!("Requested model '{name}' unavailable for capability '{capability}'.")
            }
            None => "No model specified; using default.".to_string(),
        };
        let Some(model) = self.registry.by_capability(capability).into_iter().next() else {
            bail!("No models available for capability '{capability}'.");
        };
        Ok(ModelSelection {
            model,
            requested: requested.map(str::to_string),
            fallback_reason: Some(fallback_reason),
        })
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::ModelSelector;
    use crate::models::{ModelRegistry, ModelSpec};

    fn text_model(name: &str, provider: &str) -> ModelSpec {
        ModelSpec {
            name: name.to_string(),
            provider: provider.to_string(),
            capabilities: vec!["text".to_string()],
            context_window: None,
            max_output_tokens: 100,
        }
    }

    #[test]
    fn known_model_is_selected_without_fallback() -> anyhow::Result<()> {
        let selection = ModelSelector::default().select(Some("gpt-4o"), "text")?;
        assert_eq!(selection.model.provider, "openai");
        assert_eq!(selection.fallback_reason, None);
        Ok(())
    }

    #[test]
    fn unknown_model_falls_back_with_reason() -> anyhow::Result<()> {
        let mut models = IndexMap::new();
        models.insert("local".to_string(), text_model("local", "dryrun"));
        let selection = ModelSelector::new(Some(ModelRegistry::new(Some(models))))
            .select(Some("missing"), "text")?;
        assert_eq!(selection.model.name, "local");
        assert_eq!(selection.requested.as_deref(), Some("missing"));
        assert_eq!(
            selection.fallback_reason.as_deref(),
            Some("Requested model 'missing' unavailable for capability 'text'.")
        );
        Ok(())
    }

    #[test]
    fn blank_request_uses_default_with_explanation() -> anyhow::Result<()> {
        let selection = ModelSelector::default().select(Some("  "), "text")?;
        assert_eq!(selection.model.name, "dryrun-text-1");
        assert_eq!(selection.requested, None);
        assert_eq!(
            selection.fallback_reason.as_deref(),
            Some("No model specified; using default.")
        );
        Ok(())
    }

    #[test]
    fn missing_capability_is_an_error() {
        let mut models = IndexMap::new();
        models.insert("local".to_string(), text_model("local", "dryrun"));
        let err = ModelSelector::new(Some(ModelRegistry::new(Some(models))))
            .select(Some("local"), "audio")
            .err()
            .map(|err| err.to_string())
            .unwrap_or_default();
        assert_eq!(err, "No models available for capability 'audio'.");
    }

    #[test]
    fn registered_models_become_selectable() -> anyhow::Result<()> {
        let mut registry = ModelRegistry::default();
        registry.register(text_model("ft:persona-v1", "openai"));
        let selection = ModelSelector::new(Some(registry)).select(Some("ft:persona-v1"), "text")?;
        assert_eq!(selection.fallback_reason, None);
        Ok(())
    }
}
