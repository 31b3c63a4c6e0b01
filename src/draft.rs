//! Drafting service client with enhancement passes and retry logic.
//!
//! The drafting service is an OpenAI-compatible `/chat/completions`
//! endpoint, treated as a black box returning raw article text. The module
//! uses a trait-based design:
//! - [`Drafter`]: core trait for one completion call
//! - [`ChatClient`]: plain HTTP implementation
//! - [`RetryDraft`]: decorator adding exponential backoff to any [`Drafter`]
//!
//! "Enhancement passes" are an explicit ordered list of `text -> text`
//! transforms ([`PassKind`]); each pass builds its prompt from the previous
//! pass's output, so every step is independently testable with fixed
//! input/output pairs. An empty pass list is the identity transform.
//!
//! # Retry Strategy
//!
//! - Maximum 5 retry attempts
//! - Exponential backoff starting at 1 second, capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use rand::{rng, Rng};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::config::{DraftApiConfig, PassKind};
use crate::error::{Error, Result};

/// Trait for one drafting call: a system role plus a user prompt in, raw
/// text out.
pub trait Drafter {
    async fn draft(&self, system: &str, prompt: &str) -> Result<String>;
}

/// Inputs shared by every pass's prompt builder.
#[derive(Debug, Clone)]
pub struct PassContext {
    pub keywords: Vec<String>,
    pub target_word_count: usize,
}

impl PassKind {
    pub fn system_prompt(&self) -> &'static str {
        match self {
            PassKind::Draft => {
                "You are a professional financial journalist for a major news outlet. \
                 Write in a formal, objective, and authoritative tone. Avoid casual \
                 language, contractions, and personal opinions. Structure the article \
                 as a news report: headline, summary lede, body with subheadings, and \
                 a conclusion."
            }
            PassKind::Humanize => {
                "You are a professional news editor. Paraphrase the article for \
                 sentence and paragraph variety while keeping it professional and \
                 news-like."
            }
        }
    }

    /// Build this pass's user prompt from the previous pass's output.
    pub fn build_prompt(&self, input: &str, ctx: &PassContext) -> String {
        match self {
            PassKind::Draft => format!(
                "Write a comprehensive, objective news article on the topic below.\n\
                 \n\
                 REQUIREMENTS:\n\
                 - Naturally include these keywords: {keywords}\n\
                 - Target: {words} words\n\
                 - Use 4-5 subheadings, each on its own line prefixed with '## '\n\
                 - Start with a clear headline on the first line, prefixed 'Headline:'\n\
                 - Begin with a concise summary paragraph, end with an outlook\n\
                 - Attribute information to sources and keep a neutral tone\n\
                 \n\
                 Original article context:\n{context}",
                keywords = ctx.keywords.join(", "),
                words = ctx.target_word_count,
                context = input.chars().take(2000).collect::<String>(),
            ),
            PassKind::Humanize => format!(
                "Paraphrase the following news article for variety: mix paragraph \
                 lengths, vary sentence openings, and occasionally use passive voice. \
                 Keep every '## ' subheading line intact and keep the tone \
                 professional and objective. Return the full article.\n\n{input}"
            ),
        }
    }
}

/// Apply the configured passes in order.
///
/// Each pass's output is normalized (stray `# ` title markers stripped,
/// blank lines collapsed) before feeding the next pass, mirroring what the
/// assembler expects. An empty `passes` slice returns the seed unchanged.
#[instrument(level = "info", skip_all, fields(passes = passes.len()))]
pub async fn run_passes<D: Drafter>(
    drafter: &D,
    passes: &[PassKind],
    seed: &str,
    ctx: &PassContext,
) -> Result<String> {
    let mut text = seed.to_string();
    for (i, pass) in passes.iter().enumerate() {
        let prompt = pass.build_prompt(&text, ctx);
        let t0 = Instant::now();
        let raw = drafter.draft(pass.system_prompt(), &prompt).await?;
        text = normalize_draft(&raw);
        info!(
            pass = ?pass,
            index = i,
            elapsed_ms = t0.elapsed().as_millis() as u128,
            chars = text.len(),
            "Drafting pass complete"
        );
    }
    Ok(text)
}

/// Normalize model output into blank-line separated blocks: `# ` markers
/// are stripped to bare text, `## ` subheading markers are kept.
fn normalize_draft(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| match line.strip_prefix("# ") {
            Some(rest) => rest.to_string(),
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Plain `/chat/completions` client.
pub struct ChatClient {
    client: Client,
    config: DraftApiConfig,
}

impl ChatClient {
    pub fn new(client: Client, config: DraftApiConfig) -> Self {
        ChatClient { client, config }
    }
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .finish()
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

impl Drafter for ChatClient {
    #[instrument(level = "info", skip_all)]
    async fn draft(&self, system: &str, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let t0 = Instant::now();
        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Draft(e.to_string()))?
            .json::<ChatResponse>()
            .await
            .map_err(|e| Error::Draft(e.to_string()))?;
        let dt = t0.elapsed();

        let content = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        let content = content.trim().to_string();
        if content.is_empty() {
            warn!(elapsed_ms = dt.as_millis() as u128, "Empty completion");
            return Err(Error::Draft("service returned an empty completion".to_string()));
        }
        Ok(content)
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`Drafter`].
///
/// The delay between retries follows:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryDraft<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryDraft<T>
where
    T: Drafter,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        RetryDraft {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryDraft<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryDraft")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> Drafter for RetryDraft<T>
where
    T: Drafter + fmt::Debug,
{
    #[instrument(level = "info", skip_all)]
    async fn draft(&self, system: &str, prompt: &str) -> Result<String> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.draft(system, prompt).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                            elapsed_ms_total = total_dt.as_millis() as u128,
                            error = %e,
                            "draft() exhausted retries"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                        elapsed_ms_total = total_dt.as_millis() as u128,
                        ?delay,
                        error = %e,
                        "draft() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
