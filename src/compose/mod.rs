// src/compose/mod.rs
//! Turns a raw item into the message that gets published: summary blurb,
//! optional comment, source line and hashtags.

pub mod ai_adapter;

use tracing::{debug, warn};

use crate::config::ComposeSettings;
use crate::ingest::types::RawItem;
use crate::ingest::{clean_text, source_domain, truncate_chars};

pub use ai_adapter::{build_backend, BackendError, DynBackend, Prompt, TextBackend};

/// Upper bound on text sent to the backend.
pub const BACKEND_INPUT_MAX: usize = 3000;

const SUMMARY_PROMPT: &str = "Summarize the news item in one clear, neutral sentence. \
    Include one key figure if the text has one. Output only the sentence.";
const COMMENT_PROMPT: &str = "You are a markets analyst. Write one short, neutral remark on \
    why this news matters for investors. No advice, no emojis. Output only the remark.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPost {
    pub headline: String,
    pub blurb: String,
    pub comment: Option<String>,
    pub domain: String,
    pub link: Option<String>,
    pub hashtags: String,
}

impl ComposedPost {
    /// Message text: blocks separated by blank lines, empty blocks left out.
    /// The blurb is dropped when the headline already contains it.
    pub fn render(&self) -> String {
        let mut blocks = vec![format!("📰 {}", self.headline)];

        let blurb = self.blurb.trim();
        if !blurb.is_empty() && !self.headline.to_lowercase().contains(&blurb.to_lowercase()) {
            blocks.push(blurb.to_string());
        }
        if let Some(c) = self.comment.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            blocks.push(format!("💬 {c}"));
        }
        if !self.domain.is_empty() {
            blocks.push(format!("Source: {}", self.domain));
        }
        if let Some(link) = self.link.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            blocks.push(link.to_string());
        }
        if !self.hashtags.is_empty() {
            blocks.push(self.hashtags.clone());
        }
        blocks.join("\n\n")
    }
}

pub struct Composer {
    cfg: ComposeSettings,
    backend: Option<DynBackend>,
}

impl Composer {
    pub fn new(cfg: ComposeSettings, backend: Option<DynBackend>) -> Self {
        Self { cfg, backend }
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// At most `max_summary_len` chars. Falls back to the cleaned summary, then
    /// the title, when the backend is missing or fails.
    pub async fn summarize(&self, title: &str, raw_summary: &str) -> String {
        let max = self.cfg.max_summary_len;
        let cleaned = clean_text(raw_summary);

        if let Some(backend) = &self.backend {
            let input = truncate_chars(&format!("{}. {}", title.trim(), cleaned), BACKEND_INPUT_MAX);
            let prompt = Prompt {
                system: SUMMARY_PROMPT,
                input: &input,
                max_tokens: 150,
            };
            match backend.complete(prompt).await {
                Ok(answer) => {
                    let s = ai_adapter::fit(&answer, max);
                    if !s.is_empty() {
                        return s;
                    }
                }
                Err(e) => {
                    warn!(error = %e, provider = backend.name(), "summary backend failed, using fallback")
                }
            }
        }

        if cleaned.is_empty() {
            truncate_chars(title.trim(), max)
        } else {
            truncate_chars(&cleaned, max)
        }
    }

    /// Analyst-style remark; only produced by a backend.
    pub async fn comment(&self, title: &str, domain: &str, raw_summary: &str) -> Option<String> {
        let backend = self.backend.as_ref()?;
        let cleaned = clean_text(raw_summary);
        let input = if domain.is_empty() {
            format!("{}. {}", title.trim(), cleaned)
        } else {
            format!("{} ({}). {}", title.trim(), domain, cleaned)
        };
        let input = truncate_chars(&input, BACKEND_INPUT_MAX);
        let prompt = Prompt {
            system: COMMENT_PROMPT,
            input: &input,
            max_tokens: 120,
        };
        match backend.complete(prompt).await {
            Ok(answer) => {
                let c = ai_adapter::fit(&answer, self.cfg.max_comment_len);
                (!c.is_empty()).then_some(c)
            }
            Err(e) => {
                debug!(error = %e, provider = backend.name(), "comment backend failed, skipping comment");
                None
            }
        }
    }

    /// Base tags, then topic tags whose triggers occur in `text`; deduplicated,
    /// capped at `hashtag_max`, space-joined.
    pub fn hashtags(&self, text: &str) -> String {
        let lower = text.to_lowercase();
        let triggered = self
            .cfg
            .hashtag_topics
            .iter()
            .filter(|t| {
                t.triggers
                    .iter()
                    .any(|k| !k.trim().is_empty() && lower.contains(&k.trim().to_lowercase()))
            })
            .map(|t| t.tag.as_str());

        let mut out: Vec<String> = Vec::new();
        for raw in self.cfg.base_hashtags.iter().map(String::as_str).chain(triggered) {
            if out.len() >= self.cfg.hashtag_max {
                break;
            }
            let Some(tag) = normalize_hashtag(raw) else {
                continue;
            };
            if !out.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
                out.push(tag);
            }
        }
        out.join(" ")
    }

    pub async fn compose(&self, item: &RawItem) -> ComposedPost {
        let headline = clean_text(&item.title);
        let raw_summary = item.summary.as_deref().unwrap_or_default();
        let link = item.link.clone();
        let domain = link.as_deref().map(source_domain).unwrap_or_default();

        let blurb = self.summarize(&headline, raw_summary).await;
        let comment = self.comment(&headline, &domain, raw_summary).await;

        let mut tag_text = format!("{} {}", headline, clean_text(raw_summary));
        for t in &item.tags {
            tag_text.push(' ');
            tag_text.push_str(t);
        }
        let hashtags = self.hashtags(&tag_text);

        ComposedPost {
            headline,
            blurb,
            comment,
            domain,
            link,
            hashtags,
        }
    }
}

/// `"  Central Banks "` -> `"#CentralBanks"`; blank input gives `None`.
fn normalize_hashtag(raw: &str) -> Option<String> {
    let body: String = raw
        .trim()
        .trim_start_matches('#')
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    (!body.is_empty()).then(|| format!("#{body}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HashtagTopic;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;

    struct FailingBackend;

    impl TextBackend for FailingBackend {
        fn complete<'a>(
            &'a self,
            _prompt: Prompt<'a>,
        ) -> Pin<Box<dyn Future<Output = Result<String, BackendError>> + Send + 'a>> {
            Box::pin(async { Err(BackendError::Empty) })
        }
        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn cfg() -> ComposeSettings {
        ComposeSettings {
            max_summary_len: 20,
            max_comment_len: 30,
            hashtag_max: 3,
            base_hashtags: vec!["finance".into(), "#news".into()],
            hashtag_topics: vec![
                HashtagTopic {
                    tag: "#centralbanks".into(),
                    triggers: vec!["ecb".into(), "fed".into()],
                },
                HashtagTopic {
                    tag: "#crypto".into(),
                    triggers: vec!["bitcoin".into()],
                },
                HashtagTopic {
                    tag: "#energy".into(),
                    triggers: vec!["oil".into()],
                },
            ],
        }
    }

    #[tokio::test]
    async fn disabled_backend_uses_cleaned_summary_prefix() {
        let c = Composer::new(cfg(), None);
        let s = c
            .summarize("Title", "<p>The <b>ECB</b> kept rates unchanged today.</p>")
            .await;
        assert_eq!(s, "The ECB kept rates u");
        assert_eq!(c.summarize("A short title", "  <br> ").await, "A short title");
        assert_eq!(c.comment("t", "d", "s").await, None);
    }

    #[tokio::test]
    async fn failing_backend_falls_back() {
        let c = Composer::new(cfg(), Some(Arc::new(FailingBackend)));
        assert_eq!(c.summarize("Title", "plain text").await, "plain text");
        assert_eq!(c.comment("Title", "x.com", "plain text").await, None);
    }

    #[tokio::test]
    async fn backend_answer_is_capped() {
        let mock = ai_adapter::MockBackend {
            fixed: "One two three four five six seven eight".into(),
        };
        let c = Composer::new(cfg(), Some(Arc::new(mock)));
        assert_eq!(c.summarize("T", "s").await, "One two three four f");
        assert_eq!(
            c.comment("T", "d", "s").await.as_deref(),
            Some("One two three four five six se")
        );
    }

    #[test]
    fn hashtags_dedup_and_cap() {
        let c = Composer::new(cfg(), None);
        assert_eq!(
            c.hashtags("Fed and ECB move as Bitcoin slides"),
            "#finance #news #centralbanks"
        );
        let mut one = cfg();
        one.hashtag_max = 0;
        assert_eq!(Composer::new(one, None).hashtags("ECB"), "");
        let mut dup = cfg();
        dup.base_hashtags = vec!["#Finance".into(), "finance".into(), " ".into()];
        assert_eq!(Composer::new(dup, None).hashtags("oil"), "#Finance #energy");
    }

    #[test]
    fn render_layout() {
        let post = ComposedPost {
            headline: "ECB holds rates".into(),
            blurb: "The ECB kept rates unchanged.".into(),
            comment: Some("Markets expected it.".into()),
            domain: "reuters.com".into(),
            link: Some("https://reuters.com/x".into()),
            hashtags: "#finance #macro".into(),
        };
        assert_eq!(
            post.render(),
            "📰 ECB holds rates\n\nThe ECB kept rates unchanged.\n\n💬 Markets expected it.\n\n\
             Source: reuters.com\n\nhttps://reuters.com/x\n\n#finance #macro"
        );
    }

    #[test]
    fn render_skips_blurb_repeating_headline_and_empty_blocks() {
        let post = ComposedPost {
            headline: "ECB holds rates steady".into(),
            blurb: "ecb holds RATES".into(),
            comment: None,
            domain: String::new(),
            link: None,
            hashtags: String::new(),
        };
        assert_eq!(post.render(), "📰 ECB holds rates steady");
    }

    #[tokio::test]
    async fn compose_fills_every_part() {
        let c = Composer::new(cfg(), None);
        let item = RawItem {
            title: "Oil jumps &amp; stocks slip".into(),
            link: Some("https://www.ft.com/content/1".into()),
            summary: Some("<p>Brent up 3%.</p>".into()),
            ..Default::default()
        };
        let post = c.compose(&item).await;
        assert_eq!(post.headline, "Oil jumps & stocks slip");
        assert_eq!(post.blurb, "Brent up 3%.");
        assert_eq!(post.domain, "ft.com");
        assert_eq!(post.hashtags, "#finance #news #energy");
        assert!(post.comment.is_none());
    }
}
