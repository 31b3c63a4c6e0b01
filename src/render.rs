//! HTML rendering and artifact export.
//!
//! [`render`] is a pure function over an [`AssembledDocument`]: the same
//! document always produces byte-identical markup, which is what makes
//! golden-file testing possible. Every timestamp in the artifact comes from
//! the document itself; the clock is never read here.
//!
//! [`export`] writes the artifact to a temporary sibling and renames it
//! into place, so a failed run never leaves a partial file behind.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{info, instrument};

use crate::assemble::RELATED_HEADING;
use crate::error::{Error, Result};
use crate::models::{AssembledDocument, Signal};
use crate::utils::slugify_title;

const STYLE: &str = "\
body { font-family: 'Arial', sans-serif; line-height: 1.7; max-width: 900px; margin: 0 auto; padding: 20px; color: #333; }\n\
h1 { color: #2c3e50; border-bottom: 3px solid #3498db; padding-bottom: 15px; font-size: 2.2em; }\n\
h2 { color: #34495e; margin-top: 40px; margin-bottom: 20px; font-size: 1.6em; border-left: 4px solid #3498db; padding-left: 15px; }\n\
p { margin-bottom: 20px; text-align: justify; font-size: 16px; }\n\
.meta { background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white; padding: 20px; border-radius: 10px; margin-bottom: 30px; }\n\
.social-card { background: #f8f9fa; border-left: 4px solid #1da1f2; border-radius: 8px; padding: 15px; margin: 20px 0; }\n\
.social-card footer { color: #657786; font-size: 14px; margin-top: 8px; }\n\
.link-card { background: #eaf6ff; border-left: 4px solid #3498db; border-radius: 8px; padding: 12px 18px; margin: 12px 0; }\n\
.disclaimer { background: #fff3cd; padding: 15px; border-radius: 8px; margin: 20px 0; border-left: 4px solid #ffc107; font-size: 14px; }\n\
a { color: #3498db; text-decoration: none; }\n\
a:hover { text-decoration: underline; }";

const DISCLAIMER: &str = "This article is for informational purposes only and does not \
constitute financial advice. Cryptocurrency investments carry significant risks. Always \
conduct your own research and consult with financial advisors before making investment \
decisions.";

/// Render the document to a complete HTML page.
#[instrument(level = "info", skip_all, fields(title = %doc.title))]
pub fn render(doc: &AssembledDocument) -> Result<String> {
    let meta = &doc.meta;
    let title = esc(&doc.title);
    let description = esc(&meta.description);
    let keywords = esc(&meta.keywords.join(", "));
    let published = meta.publish_time.to_rfc3339();
    let modified = meta.generated_at.to_rfc3339();

    let structured = serde_json::json!({
        "@context": "https://schema.org",
        "@type": "Article",
        "headline": doc.title,
        "description": meta.description,
        "datePublished": published,
        "dateModified": modified,
        "articleSection": "Cryptocurrency",
        "keywords": meta.keywords.join(", "),
        "wordCount": meta.word_count,
        "timeRequired": format!("PT{}M", meta.reading_time_minutes),
        "mainEntityOfPage": { "@type": "WebPage", "@id": meta.source_url },
    });
    let structured = serde_json::to_string_pretty(&structured)
        .map_err(|e| Error::Render(e.to_string()))?
        // keep "</script>" sequences from breaking out of the JSON-LD block
        .replace('<', "\\u003c");

    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n\
         <meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <title>{title}</title>\n\
         <meta name=\"description\" content=\"{description}\">\n\
         <meta name=\"keywords\" content=\"{keywords}\">\n\
         <meta name=\"robots\" content=\"index, follow, max-snippet:-1, max-image-preview:large\">\n\
         <meta name=\"article:published_time\" content=\"{published}\">\n\
         <meta name=\"article:modified_time\" content=\"{modified}\">\n\
         <meta property=\"og:title\" content=\"{title}\">\n\
         <meta property=\"og:description\" content=\"{description}\">\n\
         <meta property=\"og:type\" content=\"article\">\n\
         <meta name=\"twitter:card\" content=\"summary_large_image\">\n\
         <meta name=\"twitter:title\" content=\"{title}\">\n\
         <meta name=\"twitter:description\" content=\"{description}\">\n\
         <script type=\"application/ld+json\">\n{structured}\n</script>\n\
         <style>\n{STYLE}\n</style>\n\
         </head>\n<body>\n<article>\n<h1>{title}</h1>\n"
    );

    let _ = write!(
        html,
        "<div class=\"meta\">\n\
         <div class=\"reading-time\">Reading time: {} minutes</div>\n\
         <div>Published: {}</div>\n\
         <div class=\"keywords\">Keywords: {}</div>\n\
         </div>\n",
        meta.reading_time_minutes,
        meta.publish_time.format("%B %d, %Y"),
        esc(&meta.keywords.iter().take(5).cloned().collect::<Vec<_>>().join(", ")),
    );

    html.push_str("<div class=\"content\">\n");
    for section in &doc.body_sections {
        let _ = write!(html, "<section>\n<h2>{}</h2>\n", esc(&section.heading));
        for paragraph in &section.paragraphs {
            let _ = write!(html, "<p>{}</p>\n", esc(paragraph));
        }
        for &idx in &section.embedded {
            if let Some(signal) = doc.embedded_signals.get(idx) {
                render_signal(&mut html, signal);
            }
        }
        html.push_str("</section>\n");
    }
    html.push_str("</div>\n");

    let _ = write!(
        html,
        "<div class=\"disclaimer\"><strong>Disclaimer:</strong> {DISCLAIMER}</div>\n"
    );
    html.push_str("</article>\n</body>\n</html>\n");
    Ok(html)
}

/// Inline presentation for an embedded signal.
fn render_signal(html: &mut String, signal: &Signal) {
    match signal {
        Signal::SocialPost {
            author,
            text,
            engagement_count,
            timestamp,
        } => {
            let _ = write!(
                html,
                "<blockquote class=\"social-card\">\n<p>{}</p>\n\
                 <footer>{} &middot; {} interactions &middot; {}</footer>\n</blockquote>\n",
                esc(text),
                esc(author),
                engagement_count,
                timestamp.format("%B %d, %Y"),
            );
        }
        Signal::InternalLink { url, title, .. } => {
            let _ = write!(
                html,
                "<div class=\"link-card\"><a href=\"{}\">{}</a></div>\n",
                esc(url),
                esc(title),
            );
        }
        // trend keywords render through the meta block, not as cards
        Signal::TrendKeyword { .. } => {}
    }
}

/// Filename for the run's artifact: slugified title plus run timestamp.
pub fn artifact_filename(doc: &AssembledDocument) -> String {
    let slug = slugify_title(&doc.title);
    let slug = if slug.is_empty() { "article".to_string() } else { slug };
    format!(
        "{slug}_{}.html",
        doc.meta.generated_at.format("%Y%m%dT%H%M%S")
    )
}

/// Write the rendered artifact under `output_dir`.
///
/// The content lands in a `.tmp` sibling first and is renamed into place,
/// so readers never observe a partial file.
#[instrument(level = "info", skip_all, fields(%output_dir))]
pub async fn export(doc: &AssembledDocument, html: &str, output_dir: &str) -> Result<PathBuf> {
    fs::create_dir_all(output_dir).await?;
    let final_path = Path::new(output_dir).join(artifact_filename(doc));
    let tmp_path = final_path.with_extension("html.tmp");

    fs::write(&tmp_path, html).await?;
    fs::rename(&tmp_path, &final_path).await?;
    info!(path = %final_path.display(), bytes = html.len(), "Wrote article artifact");
    Ok(final_path)
}

fn esc(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentMeta, Section};
    use chrono::{DateTime, Utc};
    use scraper::{Html, Selector};

    fn doc() -> AssembledDocument {
        let mut first = Section::new("Bitcoin momentum");
        first
            .paragraphs
            .push("Bitcoin extended its advance on strong volume.".to_string());
        first.embedded.push(1);

        let mut related = Section::new(RELATED_HEADING);
        related.embedded.push(2);

        AssembledDocument {
            title: "Bitcoin Hits $70K".to_string(),
            meta: DocumentMeta {
                description: "Bitcoin extended its advance on strong volume.".to_string(),
                keywords: vec!["bitcoin etf".to_string()],
                focus_keyword: "bitcoin".to_string(),
                keyword_density: 0.1,
                reading_time_minutes: 1,
                word_count: 7,
                publish_time: DateTime::<Utc>::UNIX_EPOCH,
                generated_at: DateTime::<Utc>::UNIX_EPOCH,
                source_url: "https://example.com/bitcoin-70k".to_string(),
            },
            body_sections: vec![first, related],
            embedded_signals: vec![
                Signal::TrendKeyword {
                    term: "bitcoin etf".to_string(),
                    score: 1.0,
                },
                Signal::SocialPost {
                    author: "@chainwatch".to_string(),
                    text: "Bitcoin funds saw record inflows".to_string(),
                    engagement_count: 256,
                    timestamp: DateTime::<Utc>::UNIX_EPOCH,
                },
                Signal::InternalLink {
                    url: "https://example.com/guides/etf".to_string(),
                    title: "ETF flows explained".to_string(),
                    relevance_score: 0.9,
                },
            ],
        }
    }

    #[test]
    fn test_render_is_deterministic() {
        let document = doc();
        let first = render(&document).unwrap();
        let second = render(&document).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rendered_word_count_round_trips() {
        let document = doc();
        let html = render(&document).unwrap();
        let parsed = Html::parse_document(&html);
        let selector = Selector::parse("section > p").unwrap();
        let words: usize = parsed
            .select(&selector)
            .map(|el| el.text().collect::<String>().split_whitespace().count())
            .sum();
        assert_eq!(words, document.meta.word_count);
    }

    #[test]
    fn test_markup_carries_meta_and_cards() {
        let html = render(&doc()).unwrap();
        assert!(html.contains("application/ld+json"));
        assert!(html.contains("og:title"));
        assert!(html.contains("twitter:card"));
        assert!(html.contains("social-card"));
        assert!(html.contains("link-card"));
        assert!(html.contains("ETF flows explained"));
        assert!(html.contains("Disclaimer:"));
        assert!(html.contains("Related articles"));
    }

    #[test]
    fn test_user_text_is_escaped() {
        let mut document = doc();
        document.title = "Bitcoin <script>alert(1)</script>".to_string();
        let html = render(&document).unwrap();
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_artifact_filename_is_slug_plus_timestamp() {
        assert_eq!(
            artifact_filename(&doc()),
            "bitcoin-hits-70k_19700101T000000.html"
        );
    }

    #[tokio::test]
    async fn test_export_leaves_no_partial_files() {
        let dir = std::env::temp_dir().join("chainpress-export-test");
        let _ = tokio::fs::remove_dir_all(&dir).await;
        let document = doc();
        let html = render(&document).unwrap();

        let path = export(&document, &html, dir.to_str().unwrap()).await.unwrap();
        assert!(path.exists());
        let mut entries = tokio::fs::read_dir(&dir).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            assert!(!entry.file_name().to_string_lossy().ends_with(".tmp"));
        }
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_export_failure_is_write_error() {
        let document = doc();
        let err = export(&document, "<html></html>", "/dev/null/nope")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Write(_)));
    }
}
