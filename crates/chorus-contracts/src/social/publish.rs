use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use super::driver::BrowserDriver;
use crate::events::now_utc_iso;

pub const DEFAULT_POST_MAX_CHARS: usize = 280;

/// Where the publisher clicks. Ships with neutral placeholders; real deployments load
/// their own selectors from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialSelectors {
    pub compose_url: String,
    pub compose_input: String,
    pub submit_button: String,
    pub confirmation: String,
    pub post_text: String,
    pub reply_button: String,
    pub like_button: String,
    pub repost_button: String,
    pub quote_option: String,
    pub mentions_url: String,
    pub mention_list: String,
    pub max_chars: usize,
    pub wait_timeout_ms: u64,
}

impl Default for SocialSelectors {
    fn default() -> Self {
        Self {
            compose_url: "about:blank#compose".to_string(),
            compose_input: "[data-role=\"compose\"]".to_string(),
            submit_button: "[data-role=\"submit\"]".to_string(),
            confirmation: "[data-role=\"posted\"]".to_string(),
            post_text: "[data-role=\"post-text\"]".to_string(),
            reply_button: "[data-role=\"reply\"]".to_string(),
            like_button: "[data-role=\"like\"]".to_string(),
            repost_button: "[data-role=\"repost\"]".to_string(),
            quote_option: "[data-role=\"quote\"]".to_string(),
            mentions_url: "about:blank#mentions".to_string(),
            mention_list: "[data-role=\"mentions\"]".to_string(),
            max_chars: DEFAULT_POST_MAX_CHARS,
            wait_timeout_ms: 10_000,
        }
    }
}

impl SocialSelectors {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading selectors {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid selectors document {}", path.display()))
    }

    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishReceipt {
    pub driver: String,
    pub url: String,
    pub text: String,
    pub characters: usize,
    pub screenshot: Option<PathBuf>,
    pub published_at: String,
}

/// Posts `text` through the compose form described by `selectors`.
pub fn publish(
    driver: &mut dyn BrowserDriver,
    selectors: &SocialSelectors,
    text: &str,
    screenshot: Option<&Path>,
) -> anyhow::Result<PublishReceipt> {
    let (trimmed, characters) = checked_text(selectors, text)?;

    driver.goto(&selectors.compose_url)?;
    driver.wait_for(&selectors.compose_input, selectors.timeout())?;
    driver.fill(&selectors.compose_input, trimmed)?;
    driver.click(&selectors.submit_button)?;
    driver
        .wait_for(&selectors.confirmation, selectors.timeout())
        .context("post was not confirmed")?;
    if let Some(path) = screenshot {
        driver.screenshot(path)?;
    }

    Ok(PublishReceipt {
        driver: driver.name().to_string(),
        url: selectors.compose_url.clone(),
        text: trimmed.to_string(),
        characters,
        screenshot: screenshot.map(Path::to_path_buf),
        published_at: now_utc_iso(),
    })
}

/// Trimmed text and its character count, rejecting empty or over-budget posts.
pub(crate) fn checked_text<'a>(
    selectors: &SocialSelectors,
    text: &'a str,
) -> anyhow::Result<(&'a str, usize)> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        bail!("refusing to publish an empty post");
    }
    let characters = trimmed.chars().count();
    if characters > selectors.max_chars {
        bail!(
            "post has {characters} characters; limit is {}",
            selectors.max_chars
        );
    }
    Ok((trimmed, characters))
}

/// Reads the visible text of the post at `url`.
pub fn read_post(
    driver: &mut dyn BrowserDriver,
    selectors: &SocialSelectors,
    url: &str,
) -> anyhow::Result<String> {
    driver.goto(url)?;
    driver.wait_for(&selectors.post_text, selectors.timeout())?;
    Ok(driver.inner_text(&selectors.post_text)?.trim().to_string())
}
