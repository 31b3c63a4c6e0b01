//! Social post collector.
//!
//! Consumes a JSON search endpoint returning an array of posts. The
//! fallback synthesizes commentary posts around the topic with fixed
//! handles and index-derived engagement and timestamps.

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use super::{SignalError, SignalSource};
use crate::models::{Signal, SignalKind};

const FALLBACK_HANDLES: &[&str] = &["@chainwatch", "@ledgerlens", "@blockbeacon", "@satsignal"];

const FALLBACK_TEMPLATES: &[&str] = &[
    "{topic} is dominating every market conversation this morning.",
    "Desk note: flows are rotating toward {topic} again.",
    "Order books thinned out the moment {topic} hit the wires.",
    "Long-term holders seem unfazed by the noise around {topic}.",
];

#[derive(Debug, Deserialize)]
struct PostDto {
    author: String,
    text: String,
    #[serde(default)]
    engagement_count: u64,
    timestamp: Option<DateTime<Utc>>,
}

pub struct SocialCollector {
    client: Client,
    search_url: String,
}

impl SocialCollector {
    pub fn new(client: Client, search_url: impl Into<String>) -> Self {
        SocialCollector {
            client,
            search_url: search_url.into(),
        }
    }
}

impl SignalSource for SocialCollector {
    fn kind(&self) -> SignalKind {
        SignalKind::SocialPost
    }

    #[instrument(level = "debug", skip(self))]
    async fn collect(
        &self,
        topic: &str,
        max_count: usize,
    ) -> std::result::Result<Vec<Signal>, SignalError> {
        if self.search_url.is_empty() {
            return Err(SignalError::Disabled);
        }
        let posts: Vec<PostDto> = self
            .client
            .get(&self.search_url)
            .query(&[("q", topic), ("limit", &max_count.to_string())])
            .send()
            .await?
            .json()
            .await?;
        if posts.is_empty() {
            return Err(SignalError::Empty);
        }

        Ok(posts
            .into_iter()
            .take(max_count)
            .map(|p| Signal::SocialPost {
                author: p.author,
                text: p.text,
                engagement_count: p.engagement_count,
                timestamp: p.timestamp.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            })
            .collect())
    }

    fn fallback(&self, topic: &str, max_count: usize) -> Vec<Signal> {
        (0..max_count)
            .map(|i| Signal::SocialPost {
                author: FALLBACK_HANDLES[i % FALLBACK_HANDLES.len()].to_string(),
                text: FALLBACK_TEMPLATES[i % FALLBACK_TEMPLATES.len()]
                    .replace("{topic}", topic.trim()),
                engagement_count: 128 * (i as u64 + 1),
                timestamp: DateTime::<Utc>::UNIX_EPOCH + Duration::hours(i as i64),
            })
            .collect()
    }
}
