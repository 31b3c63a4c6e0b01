//! Source fetcher: weighted RSS feeds to a single [`NewsItem`].
//!
//! Two-phase pattern: index the configured feeds for recent entries, then
//! fetch the best candidate's article page and extract its text. Extraction
//! uses a cascade of CSS selectors covering the common article layouts; when
//! every selector misses, the stripped RSS summary stands in. Failed feeds
//! are logged and skipped; the run only fails when no source yields a
//! usable item.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};

use crate::config::FeedSource;
use crate::error::{Error, Result};
use crate::models::NewsItem;

/// Entries considered per feed before ranking across sources.
const PER_FEED_ITEMS: usize = 3;

static TITLE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["h1", ".post-title", ".article-title", "title"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

static CONTENT_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "div.post-content p",
        "article p",
        ".article-content p",
        ".post-body p",
        ".entry-content p",
    ]
    .iter()
    .map(|s| Selector::parse(s).unwrap())
    .collect()
});

/// A feed entry not yet resolved to full article text.
#[derive(Debug, Clone)]
struct Candidate {
    title: String,
    url: String,
    summary: String,
    publish_time: DateTime<Utc>,
    weight: f64,
}

/// Fetch the single most recent news item across the configured feeds.
///
/// Candidates are ordered by source weight, then recency. The first one
/// that yields non-empty text (page extraction or RSS summary) wins.
#[instrument(level = "info", skip_all, fields(feeds = feeds.len()))]
pub async fn fetch_latest(client: &Client, feeds: &[FeedSource]) -> Result<NewsItem> {
    let mut candidates = Vec::new();
    for feed in feeds {
        match fetch_feed(client, feed).await {
            Ok(mut items) => {
                info!(count = items.len(), source = %feed.name, "Indexed feed entries");
                candidates.append(&mut items);
            }
            Err(e) => {
                warn!(error = %e, source = %feed.name, "Feed fetch failed; skipping source");
            }
        }
    }

    if candidates.is_empty() {
        return Err(Error::Fetch(
            "all configured feeds were unreachable or empty".to_string(),
        ));
    }

    rank(&mut candidates);
    debug!(top = %candidates[0].title, "Ranked feed candidates");

    for candidate in candidates {
        let (page_title, body_text) = match fetch_article_text(client, &candidate.url).await {
            Ok(extracted) => extracted,
            Err(e) => {
                warn!(error = %e, url = %candidate.url, "Article fetch failed; using summary");
                (None, String::new())
            }
        };

        let body_text = if body_text.trim().is_empty() {
            strip_html(&candidate.summary)
        } else {
            body_text
        };
        if body_text.trim().is_empty() {
            warn!(url = %candidate.url, "Candidate produced no text; trying next");
            continue;
        }

        let title = page_title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| candidate.title.clone());
        info!(%title, url = %candidate.url, words = body_text.split_whitespace().count(), "Selected news item");
        return Ok(NewsItem {
            title,
            body_text,
            publish_time: candidate.publish_time,
            source_url: candidate.url,
        });
    }

    Err(Error::Fetch(
        "no feed candidate yielded article text".to_string(),
    ))
}

/// Fetch and parse one feed into ranked candidates.
async fn fetch_feed(client: &Client, feed: &FeedSource) -> Result<Vec<Candidate>> {
    let bytes = client
        .get(&feed.url)
        .send()
        .await
        .map_err(|e| Error::Fetch(e.to_string()))?
        .bytes()
        .await
        .map_err(|e| Error::Fetch(e.to_string()))?;

    let channel = rss::Channel::read_from(&bytes[..])
        .map_err(|e| Error::Fetch(format!("unparseable feed {}: {e}", feed.url)))?;
    Ok(parse_channel(&channel, feed))
}

/// Map the top entries of a parsed channel into [`Candidate`]s.
fn parse_channel(channel: &rss::Channel, feed: &FeedSource) -> Vec<Candidate> {
    channel
        .items()
        .iter()
        .take(PER_FEED_ITEMS)
        .filter_map(|item| {
            let title = item.title()?.to_string();
            let url = item.link()?.to_string();
            Some(Candidate {
                title,
                url,
                summary: item.description().unwrap_or_default().to_string(),
                publish_time: item
                    .pub_date()
                    .and_then(parse_pub_date)
                    .unwrap_or_else(Utc::now),
                weight: feed.weight,
            })
        })
        .collect()
}

/// RSS dates are usually RFC 2822; some feeds emit RFC 3339.
fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

/// Source weight first, recency second.
fn rank(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.publish_time.cmp(&a.publish_time))
    });
}

/// Fetch an article page and extract its headline and paragraph text.
#[instrument(level = "info", skip_all, fields(%url))]
async fn fetch_article_text(client: &Client, url: &str) -> Result<(Option<String>, String)> {
    let html = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::Fetch(e.to_string()))?
        .text()
        .await
        .map_err(|e| Error::Fetch(e.to_string()))?;
    Ok(extract_article(&html))
}

/// Selector-cascade extraction over a parsed document.
fn extract_article(html: &str) -> (Option<String>, String) {
    let document = Html::parse_document(html);

    let title = TITLE_SELECTORS.iter().find_map(|sel| {
        document
            .select(sel)
            .next()
            .map(|el| el.text().collect::<Vec<_>>().join(" ").trim().to_string())
            .filter(|t| !t.is_empty())
    });

    let mut body = String::new();
    for sel in CONTENT_SELECTORS.iter() {
        let paragraphs: Vec<String> = document
            .select(sel)
            .map(|el| el.text().collect::<Vec<_>>().join(" ").trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        if !paragraphs.is_empty() {
            body = paragraphs.join("\n\n");
            break;
        }
    }

    (title, body)
}

/// Strip tags and common entities from an RSS summary.
fn strip_html(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    result
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
