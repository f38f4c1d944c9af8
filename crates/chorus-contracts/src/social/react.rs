use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::driver::BrowserDriver;
use super::publish::{checked_text, SocialSelectors};
use crate::events::now_utc_iso;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Reaction {
    Like,
    Reply { text: String },
    Repost { quote: Option<String> },
}

impl Reaction {
    pub fn action(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Reply { .. } => "reply",
            Self::Repost { .. } => "repost",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionReceipt {
    pub driver: String,
    pub url: String,
    pub action: String,
    pub text: Option<String>,
    pub reacted_at: String,
}

/// Likes, replies to or reposts the post at `post_url`.
///
/// Reply and quote text go through the same budget check as [`super::publish`], before the
/// driver is touched.
pub fn react(
    driver: &mut dyn BrowserDriver,
    selectors: &SocialSelectors,
    post_url: &str,
    reaction: &Reaction,
) -> anyhow::Result<ReactionReceipt> {
    let text = match reaction {
        Reaction::Like | Reaction::Repost { quote: None } => None,
        Reaction::Reply { text } => Some(checked_text(selectors, text)?.0),
        Reaction::Repost { quote: Some(quote) } => Some(checked_text(selectors, quote)?.0),
    };

    driver.goto(post_url)?;
    match reaction {
        Reaction::Like => {
            driver.wait_for(&selectors.like_button, selectors.timeout())?;
            driver.click(&selectors.like_button)?;
        }
        Reaction::Reply { .. } => {
            driver.wait_for(&selectors.reply_button, selectors.timeout())?;
            driver.click(&selectors.reply_button)?;
            compose_and_submit(driver, selectors, text.unwrap_or_default())?;
        }
        Reaction::Repost { .. } => {
            driver.wait_for(&selectors.repost_button, selectors.timeout())?;
            driver.click(&selectors.repost_button)?;
            match text {
                Some(quote) => {
                    driver.click(&selectors.quote_option)?;
                    compose_and_submit(driver, selectors, quote)?;
                }
                None => driver.click(&selectors.submit_button)?,
            }
        }
    }

    Ok(ReactionReceipt {
        driver: driver.name().to_string(),
        url: post_url.to_string(),
        action: reaction.action().to_string(),
        text: text.map(str::to_string),
        reacted_at: now_utc_iso(),
    })
}

fn compose_and_submit(
    driver: &mut dyn BrowserDriver,
    selectors: &SocialSelectors,
    text: &str,
) -> anyhow::Result<()> {
    driver.wait_for(&selectors.compose_input, selectors.timeout())?;
    driver.fill(&selectors.compose_input, text)?;
    driver.click(&selectors.submit_button)
}

/// Polls the mentions page and yields each mention line once.
#[derive(Debug, Clone, Default)]
pub struct MentionMonitor {
    seen: HashSet<String>,
}

impl MentionMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self) -> usize {
        self.seen.len()
    }

    /// One visit to the mentions page. Lines already returned by an earlier poll are skipped.
    pub fn poll(
        &mut self,
        driver: &mut dyn BrowserDriver,
        selectors: &SocialSelectors,
    ) -> anyhow::Result<Vec<String>> {
        driver.goto(&selectors.mentions_url)?;
        driver.wait_for(&selectors.mention_list, selectors.timeout())?;
        let raw = driver.inner_text(&selectors.mention_list)?;

        let mut fresh = Vec::new();
        for line in raw.lines().map(str::trim).filter(|line| !line.is_empty()) {
            if self.seen.insert(line.to_string()) {
                fresh.push(line.to_string());
            }
        }
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use serde_json::Value;

    use super::{react, MentionMonitor, Reaction};
    use crate::events::{read_events, EventWriter};
    use crate::social::{BrowserDriver, DryrunDriver, SocialSelectors};

    #[derive(Default)]
    struct ScriptedDriver {
        calls: Vec<String>,
        page_text: String,
    }

    impl BrowserDriver for ScriptedDriver {
        fn name(&self) -> &str {
            "scripted"
        }

        fn goto(&mut self, url: &str) -> anyhow::Result<()> {
            self.calls.push(format!("goto {url}"));
            Ok(())
        }

        fn wait_for(&mut self, selector: &str, _timeout: Duration) -> anyhow::Result<()> {
            self.calls.push(format!("wait {selector}"));
            Ok(())
        }

        fn fill(&mut self, selector: &str, text: &str) -> anyhow::Result<()> {
            self.calls.push(format!("fill {selector} {text}"));
            Ok(())
        }

        fn click(&mut self, selector: &str) -> anyhow::Result<()> {
            self.calls.push(format!("click {selector}"));
            Ok(())
        }

        fn inner_text(&mut self, selector: &str) -> anyhow::Result<String> {
            self.calls.push(format!("read {selector}"));
            Ok(self.page_text.clone())
        }

        fn screenshot(&mut self, path: &Path) -> anyhow::Result<()> {
            self.calls.push(format!("shot {}", path.display()));
            Ok(())
        }
    }

    fn selectors() -> SocialSelectors {
        SocialSelectors {
            compose_input: "#input".to_string(),
            submit_button: "#send".to_string(),
            reply_button: "#reply".to_string(),
            like_button: "#like".to_string(),
            repost_button: "#repost".to_string(),
            quote_option: "#quote".to_string(),
            mentions_url: "https://social.test/mentions".to_string(),
            mention_list: "#mentions".to_string(),
            max_chars: 30,
            ..SocialSelectors::default()
        }
    }

    #[test]
    fn like_clicks_the_like_button() -> anyhow::Result<()> {
        let mut driver = ScriptedDriver::default();
        let receipt = react(&mut driver, &selectors(), "https://social.test/p/1", &Reaction::Like)?;
        assert_eq!(
            driver.calls,
            vec!["goto https://social.test/p/1", "wait #like", "click #like"]
        );
        assert_eq!(receipt.action, "like");
        assert_eq!(receipt.text, None);
        Ok(())
    }

    #[test]
    fn reply_opens_composer_and_submits() -> anyhow::Result<()> {
        let mut driver = ScriptedDriver::default();
        let reply = Reaction::Reply {
            text: " the flame answers ".to_string(),
        };
        let receipt = react(&mut driver, &selectors(), "https://social.test/p/2", &reply)?;
        assert_eq!(
            driver.calls,
            vec![
                "goto https://social.test/p/2",
                "wait #reply",
                "click #reply",
                "wait #input",
                "fill #input the flame answers",
                "click #send",
            ]
        );
        assert_eq!(receipt.text.as_deref(), Some("the flame answers"));
        Ok(())
    }

    #[test]
    fn repost_with_and_without_quote() -> anyhow::Result<()> {
        let mut plain = ScriptedDriver::default();
        react(
            &mut plain,
            &selectors(),
            "https://social.test/p/3",
            &Reaction::Repost { quote: None },
        )?;
        assert_eq!(
            plain.calls.last().map(String::as_str),
            Some("click #send")
        );
        assert!(!plain.calls.iter().any(|call| call.starts_with("fill")));

        let mut quoted = ScriptedDriver::default();
        react(
            &mut quoted,
            &selectors(),
            "https://social.test/p/3",
            &Reaction::Repost {
                quote: Some("rise together".to_string()),
            },
        )?;
        assert!(quoted.calls.contains(&"click #quote".to_string()));
        assert!(quoted.calls.contains(&"fill #input rise together".to_string()));
        Ok(())
    }

    #[test]
    fn over_budget_reply_never_reaches_driver() {
        let mut driver = ScriptedDriver::default();
        let reply = Reaction::Reply {
            text: "x".repeat(31),
        };
        assert!(react(&mut driver, &selectors(), "https://social.test/p/4", &reply).is_err());
        let empty = Reaction::Reply {
            text: "  ".to_string(),
        };
        assert!(react(&mut driver, &selectors(), "https://social.test/p/4", &empty).is_err());
        assert!(driver.calls.is_empty());
    }

    #[test]
    fn mention_monitor_returns_each_line_once() -> anyhow::Result<()> {
        let mut driver = ScriptedDriver {
            page_text: "@chorus wake up\n\n  @chorus what is fire?  \n".to_string(),
            ..ScriptedDriver::default()
        };
        let mut monitor = MentionMonitor::new();
        assert_eq!(
            monitor.poll(&mut driver, &selectors())?,
            vec!["@chorus wake up", "@chorus what is fire?"]
        );

        driver.page_text = "@chorus what is fire?\n@chorus new one".to_string();
        assert_eq!(monitor.poll(&mut driver, &selectors())?, vec!["@chorus new one"]);
        assert_eq!(monitor.seen(), 3);
        assert_eq!(
            driver.calls[..3],
            [
                "goto https://social.test/mentions".to_string(),
                "wait #mentions".to_string(),
                "read #mentions".to_string(),
            ]
        );
        Ok(())
    }

    #[test]
    fn dryrun_reply_is_logged_step_by_step() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let events_path = temp.path().join("events.jsonl");
        let mut driver = DryrunDriver::new(EventWriter::new(&events_path, "s-2"));
        react(
            &mut driver,
            &SocialSelectors::default(),
            "about:blank#post",
            &Reaction::Reply {
                text: "seeds answer".to_string(),
            },
        )?;
        let actions: Vec<String> = read_events(&events_path)?
            .iter()
            .filter_map(|row| row.get("action").and_then(Value::as_str).map(str::to_string))
            .collect();
        assert_eq!(
            actions,
            vec!["goto", "wait_for", "click", "wait_for", "fill", "click"]
        );
        assert_eq!(
            driver.inner_text(&SocialSelectors::default().compose_input)?,
            "seeds answer"
        );
        Ok(())
    }
}
