use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde_json::json;

use super::driver::BrowserDriver;
use crate::events::EventWriter;

/// Offline driver: every step becomes a `browser_step` event and filled values can be
/// read back from the same selector.
#[derive(Debug, Clone)]
pub struct DryrunDriver {
    events: EventWriter,
    current_url: Option<String>,
    filled: HashMap<String, String>,
}

impl DryrunDriver {
    pub fn new(events: EventWriter) -> Self {
        Self {
            events,
            current_url: None,
            filled: HashMap::new(),
        }
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    fn record(&self, action: &str, selector: Option<&str>) -> anyhow::Result<()> {
        self.events.emit_json(
            "browser_step",
            json!({
                "driver": "dryrun",
                "action": action,
                "selector": selector,
                "url": self.current_url,
            }),
        )?;
        Ok(())
    }
}

impl BrowserDriver for DryrunDriver {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn goto(&mut self, url: &str) -> anyhow::Result<()> {
        self.current_url = Some(url.to_string());
        self.record("goto", None)
    }

    fn wait_for(&mut self, selector: &str, _timeout: Duration) -> anyhow::Result<()> {
        self.record("wait_for", Some(selector))
    }

    fn fill(&mut self, selector: &str, text: &str) -> anyhow::Result<()> {
        self.filled.insert(selector.to_string(), text.to_string());
        self.record("fill", Some(selector))
    }

    fn click(&mut self, selector: &str) -> anyhow::Result<()> {
        self.record("click", Some(selector))
    }

    fn inner_text(&mut self, selector: &str) -> anyhow::Result<String> {
        self.record("inner_text", Some(selector))?;
        Ok(self.filled.get(selector).cloned().unwrap_or_default())
    }

    fn screenshot(&mut self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, b"")?;
        self.record("screenshot", None)
    }
}
