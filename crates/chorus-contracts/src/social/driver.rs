use std::path::Path;
use std::time::Duration;

/// Capabilities the publisher needs from a browser-automation backend.
pub trait BrowserDriver {
    fn name(&self) -> &str;
    fn goto(&mut self, url: &str) -> anyhow::Result<()>;
    fn wait_for(&mut self, selector: &str, timeout: Duration) -> anyhow::Result<()>;
    fn fill(&mut self, selector: &str, text: &str) -> anyhow::Result<()>;
    fn click(&mut self, selector: &str) -> anyhow::Result<()>;
    fn inner_text(&mut self, selector: &str) -> anyhow::Result<String>;
    fn screenshot(&mut self, path: &Path) -> anyhow::Result<()>;
}
