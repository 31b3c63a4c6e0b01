//! One end-to-end run: fetch, collect, draft, assemble, render, export.
//!
//! Control flows strictly forward. The three signal kinds are collected
//! concurrently (they are independent and side-effect free with respect to
//! each other); everything else is sequential. A run either produces one
//! artifact or fails with a single error and no partial output.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use tracing::{info, instrument};

use crate::assemble::Assembler;
use crate::config::AppConfig;
use crate::draft::{ChatClient, PassContext, RetryDraft, run_passes};
use crate::error::Result;
use crate::feed;
use crate::models::Signal;
use crate::render;
use crate::signals::{LinkCollector, SocialCollector, TrendCollector, collect_or_fallback};

/// Per-request knobs accepted over the process boundary.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub target_word_count: Option<usize>,
    pub focus_keyword: Option<String>,
}

/// Outcome of a successful run.
#[derive(Debug)]
pub struct RunReport {
    pub title: String,
    pub path: PathBuf,
    pub html: String,
    pub word_count: usize,
}

pub struct Pipeline {
    config: AppConfig,
    client: Client,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("chainpress/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());
        Pipeline { config, client }
    }

    pub async fn run(&self) -> Result<RunReport> {
        self.run_with(RunOverrides::default()).await
    }

    #[instrument(level = "info", skip_all)]
    pub async fn run_with(&self, overrides: RunOverrides) -> Result<RunReport> {
        let started = std::time::Instant::now();
        let mut config = self.config.clone();
        apply_overrides(&mut config, &overrides);

        // ---- Source fetch ----
        let item = feed::fetch_latest(&self.client, &config.feeds).await?;
        let topic = item.title.clone();

        // ---- Signal collection, one kind per collector, concurrently ----
        let trend_source =
            TrendCollector::new(self.client.clone(), config.signals.trend_suggest_url.clone());
        let social_source =
            SocialCollector::new(self.client.clone(), config.signals.social_search_url.clone());
        let link_source =
            LinkCollector::new(self.client.clone(), config.signals.link_index_url.clone());

        let (trends, socials, links) = futures::join!(
            collect_or_fallback(&trend_source, &topic, config.content.max_trend_keywords),
            collect_or_fallback(&social_source, &topic, config.content.max_social_embeds),
            collect_or_fallback(&link_source, &topic, config.content.max_related_links),
        );
        let mut signals: Vec<Signal> = trends;
        signals.extend(socials);
        signals.extend(links);
        info!(count = signals.len(), "Collected signals");

        // ---- Drafting passes ----
        let keywords: Vec<String> = signals
            .iter()
            .filter_map(|s| match s {
                Signal::TrendKeyword { term, .. } => Some(term.clone()),
                _ => None,
            })
            .collect();

        let draft_text = if config.api.passes.is_empty() || config.api.api_key.is_empty() {
            info!("Drafting passes disabled; assembling the source text directly");
            item.body_text.clone()
        } else {
            let drafter = RetryDraft::new(
                ChatClient::new(self.client.clone(), config.api.clone()),
                5,
                Duration::from_secs(1),
            );
            let ctx = PassContext {
                keywords: keywords.clone(),
                target_word_count: config.content.target_word_count,
            };
            run_passes(&drafter, &config.api.passes, &item.body_text, &ctx).await?
        };

        // ---- Assemble, render, export ----
        let generated_at = Utc::now();
        let assembler = Assembler::new(&config.content);
        let doc = assembler.assemble(&item, &draft_text, &signals, generated_at)?;
        let html = render::render(&doc)?;
        let path = render::export(&doc, &html, &config.output_dir).await?;

        info!(
            elapsed_ms = started.elapsed().as_millis() as u128,
            words = doc.meta.word_count,
            path = %path.display(),
            "Run complete"
        );
        Ok(RunReport {
            title: doc.title,
            path,
            html,
            word_count: doc.meta.word_count,
        })
    }
}

fn apply_overrides(config: &mut AppConfig, overrides: &RunOverrides) {
    if let Some(words) = overrides.target_word_count {
        config.content.target_word_count = words;
    }
    if let Some(keyword) = &overrides.focus_keyword {
        config.content.focus_keyword = keyword.clone();
    }
}
