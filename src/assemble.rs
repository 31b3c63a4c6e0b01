//! Document assembler: source text plus signals into a structured document.
//!
//! This is the deliberate logic core of the pipeline. Everything here is
//! deterministic and synchronous: the same inputs always assemble the same
//! document.
//!
//! Rules, in order:
//! 1. Headline split: a leading `Headline:` block names the document; bare
//!    drafts fall back to the news item's own title.
//! 2. Sectioning: `## ` markers win; marker-less text is chunked evenly
//!    into a section count derived from the target word count. Source text
//!    shorter than one section still produces exactly one non-empty
//!    section.
//! 3. Placement: each social post, in collection order, attaches to the
//!    unoccupied section with the highest token overlap (ties go to the
//!    earliest section); internal links become a trailing related-articles
//!    section. Per-kind caps bound everything.
//! 4. Word-count invariant: outside `target ± tolerance` the last body
//!    section is padded with keyword outlook sentences or trimmed sentence
//!    by sentence. Embedded signals are never touched; an unresolvable
//!    range is an [`Error::AssemblyPolicy`].

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::config::ContentConfig;
use crate::error::{Error, Result};
use crate::models::{AssembledDocument, DocumentMeta, NewsItem, Section, Signal, SignalKind};
use crate::utils::{leading_sentence, split_sentences, token_overlap, tokenize, upcase, word_count};

/// Meta descriptions are cut at this many characters.
const DESCRIPTION_MAX: usize = 160;

pub const RELATED_HEADING: &str = "Related articles";

pub struct Assembler<'a> {
    config: &'a ContentConfig,
}

impl<'a> Assembler<'a> {
    pub fn new(config: &'a ContentConfig) -> Self {
        Assembler { config }
    }

    /// Assemble the document for one run.
    ///
    /// `draft_text` is the (possibly multi-pass drafted) body text;
    /// `signals` holds every collected signal in collection order;
    /// `generated_at` stamps the run so rendering stays clock-free.
    #[instrument(level = "info", skip_all, fields(item = %item.title))]
    pub fn assemble(
        &self,
        item: &NewsItem,
        draft_text: &str,
        signals: &[Signal],
        generated_at: DateTime<Utc>,
    ) -> Result<AssembledDocument> {
        let (headline, body) = split_headline(draft_text);
        let title = headline.unwrap_or_else(|| item.title.clone());

        let mut sections = split_sections(&body, self.derived_section_count(), item);

        let trends: Vec<Signal> = signals
            .iter()
            .filter(|s| s.kind() == SignalKind::TrendKeyword)
            .take(self.config.max_trend_keywords)
            .cloned()
            .collect();
        let socials: Vec<Signal> = signals
            .iter()
            .filter(|s| s.kind() == SignalKind::SocialPost)
            .cloned()
            .collect();
        let links: Vec<Signal> = signals
            .iter()
            .filter(|s| s.kind() == SignalKind::InternalLink)
            .take(self.config.max_related_links)
            .cloned()
            .collect();

        let keywords: Vec<String> = trends
            .iter()
            .map(|s| match s {
                Signal::TrendKeyword { term, .. } => term.clone(),
                _ => unreachable!(),
            })
            .collect();

        let mut embedded_signals: Vec<Signal> = trends;
        attach_social(
            &mut sections,
            &socials,
            self.config.max_social_embeds,
            &mut embedded_signals,
        );

        let focus_keyword = self.focus_keyword(&keywords, &title);
        self.enforce_word_range(&mut sections, &keywords, &focus_keyword)?;

        if !links.is_empty() {
            let mut related = Section::new(RELATED_HEADING);
            for link in links {
                related.embedded.push(embedded_signals.len());
                embedded_signals.push(link);
            }
            sections.push(related);
        }

        let body_text: String = sections
            .iter()
            .flat_map(|s| s.paragraphs.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        let total_words = word_count(&body_text);

        let description = {
            let lead = sections
                .first()
                .and_then(|s| s.paragraphs.first())
                .map(|p| leading_sentence(p))
                .unwrap_or_default();
            truncate_description(&lead)
        };

        let meta = DocumentMeta {
            description,
            keywords,
            keyword_density: keyword_density(&tokenize(&body_text), &focus_keyword),
            focus_keyword,
            reading_time_minutes: reading_time(total_words, self.config.reading_speed_wpm),
            word_count: total_words,
            publish_time: item.publish_time,
            generated_at,
            source_url: item.source_url.clone(),
        };

        debug!(
            sections = sections.len(),
            words = total_words,
            embedded = embedded_signals.len(),
            "Assembled document"
        );
        Ok(AssembledDocument {
            title,
            meta,
            body_sections: sections,
            embedded_signals,
        })
    }

    fn derived_section_count(&self) -> usize {
        (self.config.target_word_count / self.config.words_per_section.max(1)).max(1)
    }

    fn focus_keyword(&self, keywords: &[String], title: &str) -> String {
        if !self.config.focus_keyword.is_empty() {
            return self.config.focus_keyword.clone();
        }
        keywords
            .first()
            .cloned()
            .or_else(|| tokenize(title).into_iter().next())
            .unwrap_or_default()
    }

    /// Pad or trim the last section until the word count lands in range.
    fn enforce_word_range(
        &self,
        sections: &mut [Section],
        keywords: &[String],
        focus_keyword: &str,
    ) -> Result<()> {
        let target = self.config.target_word_count;
        let tolerance = self.config.word_count_tolerance;
        let min = target.saturating_sub(tolerance);
        let max = target + tolerance;
        let mut words: usize = sections.iter().map(Section::word_count).sum();

        if words < min {
            let fillers = filler_sentences(keywords, focus_keyword);
            let mut pad = Vec::new();
            let mut i = 0;
            while words < min {
                let sentence = &fillers[i % fillers.len()];
                words += word_count(sentence);
                pad.push(sentence.clone());
                i += 1;
            }
            if let Some(last) = sections.last_mut() {
                last.paragraphs.push(pad.join(" "));
            }
            if words > max {
                return Err(Error::AssemblyPolicy(format!(
                    "padding overshot the window: {words} words, allowed {min}..={max}"
                )));
            }
            debug!(added = i, words, "Padded last section");
            return Ok(());
        }

        while words > max {
            let Some(last) = sections.last_mut() else {
                break;
            };
            let Some(paragraph) = last.paragraphs.last_mut() else {
                return Err(Error::AssemblyPolicy(format!(
                    "last section has no paragraphs to trim: {words} words, allowed {min}..={max}"
                )));
            };
            let mut sentences = split_sentences(paragraph);
            if sentences.len() > 1 {
                let dropped = sentences.pop().unwrap_or_default();
                words -= word_count(&dropped);
                *paragraph = sentences.join(" ");
            } else if last.paragraphs.len() > 1 {
                let dropped = last.paragraphs.pop().unwrap_or_default();
                words -= word_count(&dropped);
            } else {
                return Err(Error::AssemblyPolicy(format!(
                    "cannot trim below one sentence: {words} words, allowed {min}..={max}"
                )));
            }
        }
        if words < min {
            return Err(Error::AssemblyPolicy(format!(
                "trimming undershot the window: {words} words, allowed {min}..={max}"
            )));
        }
        Ok(())
    }
}

/// Split a leading headline off the drafted text.
///
/// Recognizes a `Headline:` prefix (with or without `**` emphasis); failing
/// that, text that carries `## ` section markers treats its first block as
/// the title. Marker-less text has no headline of its own.
fn split_headline(text: &str) -> (Option<String>, String) {
    let blocks: Vec<&str> = text
        .split("\n\n")
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .collect();
    let Some(first) = blocks.first() else {
        return (None, String::new());
    };

    let lower = first.to_lowercase();
    if lower.starts_with("**headline:**") || lower.starts_with("headline:") {
        let title = first
            .splitn(2, ':')
            .nth(1)
            .unwrap_or("")
            .trim_matches(|c| c == '*' || c == ' ')
            .to_string();
        let body = blocks[1..].join("\n\n");
        return (Some(title).filter(|t| !t.is_empty()), body);
    }

    if !first.starts_with("## ") && blocks.iter().any(|b| b.starts_with("## ")) {
        return (Some(first.to_string()), blocks[1..].join("\n\n"));
    }

    (None, blocks.join("\n\n"))
}

/// Split body text into sections, honoring `## ` markers when present.
fn split_sections(body: &str, target_count: usize, item: &NewsItem) -> Vec<Section> {
    let blocks: Vec<String> = body
        .split("\n\n")
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(str::to_string)
        .collect();

    let mut sections: Vec<Section> = Vec::new();
    if blocks.iter().any(|b| b.starts_with("## ")) {
        let mut current: Option<Section> = None;
        for block in blocks {
            if let Some(heading) = block.strip_prefix("## ") {
                if let Some(section) = current.take() {
                    if !section.paragraphs.is_empty() {
                        sections.push(section);
                    }
                }
                current = Some(Section::new(heading.trim()));
            } else {
                // text before the first marker opens its own section
                if current.is_none() {
                    current = Some(Section::new(synth_heading(&block)));
                }
                if let Some(section) = current.as_mut() {
                    section.paragraphs.push(block);
                }
            }
        }
        if let Some(section) = current {
            if !section.paragraphs.is_empty() {
                sections.push(section);
            }
        }
    } else if !blocks.is_empty() {
        let count = target_count.min(blocks.len()).max(1);
        let per = blocks.len().div_ceil(count);
        for chunk in blocks.chunks(per) {
            let heading = if sections.is_empty() {
                "Overview".to_string()
            } else {
                synth_heading(&chunk[0])
            };
            let mut section = Section::new(heading);
            section.paragraphs = chunk.to_vec();
            sections.push(section);
        }
    }

    // minimum of one non-empty section, whatever the input looked like
    if sections.is_empty() {
        let mut section = Section::new(item.title.clone());
        section.paragraphs.push(format!("{}.", item.title));
        sections.push(section);
    }
    sections
}

/// Heading synthesized from a chunk's opening words.
fn synth_heading(block: &str) -> String {
    let lead = leading_sentence(block);
    let words: Vec<&str> = lead.split_whitespace().take(6).collect();
    upcase(words.join(" ").trim_end_matches(|c: char| ".,:;!?".contains(c)))
}

/// Attach social posts to body sections by token overlap.
///
/// Signals are considered in collection order; each goes to the unoccupied
/// section with the highest overlap between post text and the section's
/// heading plus lead paragraph. Equal scores resolve to the earliest
/// section.
fn attach_social(
    sections: &mut [Section],
    socials: &[Signal],
    cap: usize,
    embedded_signals: &mut Vec<Signal>,
) {
    let mut attached = 0;
    for signal in socials {
        if attached >= cap {
            break;
        }
        let Signal::SocialPost { text, .. } = signal else {
            continue;
        };

        let mut best: Option<(usize, usize)> = None; // (score, section index)
        for (idx, section) in sections.iter().enumerate() {
            if !section.embedded.is_empty() {
                continue;
            }
            let basis = format!(
                "{} {}",
                section.heading,
                section.paragraphs.first().map(String::as_str).unwrap_or("")
            );
            let score = token_overlap(text, &basis);
            if best.map(|(s, _)| score > s).unwrap_or(true) {
                best = Some((score, idx));
            }
        }

        let Some((score, idx)) = best else {
            break; // every section already carries a signal
        };
        sections[idx].embedded.push(embedded_signals.len());
        embedded_signals.push(signal.clone());
        attached += 1;
        debug!(section = idx, score, "Attached social signal");
    }
}

/// Deterministic outlook sentences used for padding, one per keyword.
fn filler_sentences(keywords: &[String], focus_keyword: &str) -> Vec<String> {
    let mut terms: Vec<&str> = keywords.iter().map(String::as_str).collect();
    if terms.is_empty() {
        terms.push(if focus_keyword.is_empty() {
            "the market"
        } else {
            focus_keyword
        });
    }
    terms
        .iter()
        .map(|term| {
            format!(
                "Analysts continue to watch {term} closely as the market digests the latest developments."
            )
        })
        .collect()
}

/// occurrences x keyword token length / total tokens.
fn keyword_density(tokens: &[String], keyword: &str) -> f64 {
    let needle = tokenize(keyword);
    if needle.is_empty() || tokens.is_empty() {
        return 0.0;
    }
    let occurrences = tokens
        .windows(needle.len())
        .filter(|w| *w == needle.as_slice())
        .count();
    (occurrences * needle.len()) as f64 / tokens.len() as f64
}

/// Words per minute, rounded up, at least one minute.
fn reading_time(words: usize, wpm: u32) -> u32 {
    let wpm = wpm.max(1) as usize;
    (words.div_ceil(wpm)).max(1) as u32
}

/// First sentence cut to the meta-description limit.
fn truncate_description(lead: &str) -> String {
    if lead.chars().count() <= DESCRIPTION_MAX {
        lead.to_string()
    } else {
        let cut: String = lead.chars().take(DESCRIPTION_MAX - 3).collect();
        format!("{}...", cut.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContentConfig;

    fn item(title: &str) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            body_text: String::new(),
            publish_time: DateTime::<Utc>::UNIX_EPOCH,
            source_url: "https://example.com/article".to_string(),
        }
    }

    fn config(target: usize, tolerance: usize) -> ContentConfig {
        ContentConfig {
            target_word_count: target,
            word_count_tolerance: tolerance,
            words_per_section: 400,
            ..ContentConfig::default()
        }
    }

    fn repeat_sentence(sentence: &str, n: usize) -> String {
        vec![sentence; n].join(" ")
    }

    fn trend(term: &str) -> Signal {
        Signal::TrendKeyword {
            term: term.to_string(),
            score: 1.0,
        }
    }

    fn social(text: &str) -> Signal {
        Signal::SocialPost {
            author: "@chainwatch".to_string(),
            text: text.to_string(),
            engagement_count: 10,
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    fn link(title: &str) -> Signal {
        Signal::InternalLink {
            url: format!("/news/{}", crate::utils::slugify_title(title)),
            title: title.to_string(),
            relevance_score: 0.8,
        }
    }

    #[test]
    fn test_scenario_bitcoin_hits_70k() {
        // target 1000 +/- 100, 2 trends, 2 social (one matching "Bitcoin"),
        // 1 internal link
        let config = config(1000, 100);
        let assembler = Assembler::new(&config);

        let bitcoin_para = repeat_sentence(
            "Bitcoin extended its advance as spot market volumes climbed sharply.",
            35,
        );
        let regulation_para = repeat_sentence(
            "Regulators weighed new disclosure rules for digital asset platforms.",
            30,
        );
        let draft = format!(
            "## Bitcoin momentum\n\n{bitcoin_para}\n\n## Regulation outlook\n\n{regulation_para}"
        );

        let signals = vec![
            trend("bitcoin etf"),
            trend("crypto regulation"),
            social("Bitcoin funds saw record inflows this week"),
            social("Altcoin season chatter is back on the timeline"),
            link("Institutional adoption trends"),
        ];

        let doc = assembler
            .assemble(&item("Bitcoin Hits $70K"), &draft, &signals, DateTime::<Utc>::UNIX_EPOCH)
            .unwrap();

        assert!(doc.meta.word_count >= 900 && doc.meta.word_count <= 1100);

        // trailing related-articles section with the single link
        let related = doc.body_sections.last().unwrap();
        assert_eq!(related.heading, RELATED_HEADING);
        assert_eq!(related.embedded.len(), 1);
        assert!(matches!(
            doc.embedded_signals[related.embedded[0]],
            Signal::InternalLink { .. }
        ));

        // the matching social post landed on the Bitcoin section
        let bitcoin_section = &doc.body_sections[0];
        assert!(bitcoin_section.heading.contains("Bitcoin"));
        assert_eq!(bitcoin_section.embedded.len(), 1);
        match &doc.embedded_signals[bitcoin_section.embedded[0]] {
            Signal::SocialPost { text, .. } => assert!(text.contains("Bitcoin funds")),
            other => panic!("unexpected signal {other:?}"),
        }

        assert_eq!(doc.meta.keywords, vec!["bitcoin etf", "crypto regulation"]);
        assert!(!doc.meta.description.is_empty());
    }

    #[test]
    fn test_short_source_yields_one_padded_section() {
        let config = config(100, 20);
        let assembler = Assembler::new(&config);
        let doc = assembler
            .assemble(&item("Tiny"), "Tiny update.", &[], DateTime::<Utc>::UNIX_EPOCH)
            .unwrap();
        assert_eq!(doc.body_sections.len(), 1);
        assert!(!doc.body_sections[0].paragraphs.is_empty());
        assert!(doc.meta.word_count >= 80 && doc.meta.word_count <= 120);
    }

    #[test]
    fn test_empty_body_still_produces_one_section() {
        let config = config(10, 10);
        let assembler = Assembler::new(&config);
        let doc = assembler
            .assemble(&item("Placeholder Story"), "", &[], DateTime::<Utc>::UNIX_EPOCH)
            .unwrap();
        assert_eq!(doc.body_sections.len(), 1);
        assert!(!doc.body_sections[0].paragraphs.is_empty());
    }

    #[test]
    fn test_trimming_lands_inside_window() {
        let config = config(10, 2);
        let assembler = Assembler::new(&config);
        let body = format!(
            "{}\n\n{}",
            repeat_sentence("Alpha beta gamma delta.", 4),
            repeat_sentence("Alpha beta gamma delta.", 4)
        );
        let doc = assembler
            .assemble(&item("Trim Me"), &body, &[], DateTime::<Utc>::UNIX_EPOCH)
            .unwrap();
        assert!(doc.meta.word_count >= 8 && doc.meta.word_count <= 12);
    }

    #[test]
    fn test_untrimmable_single_sentence_is_policy_violation() {
        let config = config(10, 2);
        let assembler = Assembler::new(&config);
        let body = repeat_sentence("word", 30) + ".";
        let err = assembler
            .assemble(&item("Too Long"), &body, &[], DateTime::<Utc>::UNIX_EPOCH)
            .unwrap_err();
        assert!(matches!(err, Error::AssemblyPolicy(_)));
    }

    #[test]
    fn test_padding_never_removes_signals() {
        let config = config(120, 30);
        let assembler = Assembler::new(&config);
        let draft = "## Markets\n\nBitcoin rose today.";
        let signals = vec![trend("bitcoin"), social("Bitcoin chatter"), link("Guide")];
        let doc = assembler
            .assemble(&item("Signals Stay"), draft, &signals, DateTime::<Utc>::UNIX_EPOCH)
            .unwrap();
        assert_eq!(doc.embedded_signals.len(), 3);
        assert!(doc.meta.word_count >= 90);
    }

    #[test]
    fn test_tie_breaks_to_earliest_section() {
        let config = config(20, 20);
        let assembler = Assembler::new(&config);
        let draft = "## Alpha desk\n\nOne two three.\n\n## Beta desk\n\nFour five six.";
        // no token overlap with either section: score 0 everywhere
        let signals = vec![social("completely unrelated chatter")];
        let doc = assembler
            .assemble(&item("Ties"), draft, &signals, DateTime::<Utc>::UNIX_EPOCH)
            .unwrap();
        assert_eq!(doc.body_sections[0].embedded.len(), 1);
        assert!(doc.body_sections[1].embedded.is_empty());
    }

    #[test]
    fn test_social_cap_limits_embeds() {
        let config = ContentConfig {
            max_social_embeds: 1,
            target_word_count: 20,
            word_count_tolerance: 20,
            ..ContentConfig::default()
        };
        let assembler = Assembler::new(&config);
        let draft = "## One\n\nAlpha beta.\n\n## Two\n\nGamma delta.";
        let signals = vec![social("first post"), social("second post")];
        let doc = assembler
            .assemble(&item("Caps"), draft, &signals, DateTime::<Utc>::UNIX_EPOCH)
            .unwrap();
        let embedded: usize = doc.body_sections.iter().map(|s| s.embedded.len()).sum();
        assert_eq!(embedded, 1);
    }

    #[test]
    fn test_headline_extraction() {
        let (title, body) = split_headline("Headline: Fresh Title\n\n## A\n\nBody text.");
        assert_eq!(title.as_deref(), Some("Fresh Title"));
        assert!(body.starts_with("## A"));

        let (starred, _) = split_headline("**Headline:** Starred Title\n\nBody.");
        assert_eq!(starred.as_deref(), Some("Starred Title"));

        let (none, body) = split_headline("Just a paragraph.\n\nAnother one.");
        assert!(none.is_none());
        assert_eq!(body, "Just a paragraph.\n\nAnother one.");
    }

    #[test]
    fn test_marker_less_text_chunks_evenly() {
        let config = ContentConfig {
            target_word_count: 1200,
            words_per_section: 400,
            word_count_tolerance: 1200,
            ..ContentConfig::default()
        };
        let assembler = Assembler::new(&config);
        let body = (0..6)
            .map(|i| format!("Paragraph number {i} carries a few extra words."))
            .collect::<Vec<_>>()
            .join("\n\n");
        let doc = assembler
            .assemble(&item("Chunks"), &body, &[], DateTime::<Utc>::UNIX_EPOCH)
            .unwrap();
        assert_eq!(doc.body_sections.len(), 3);
        assert_eq!(doc.body_sections[0].heading, "Overview");
        assert!(doc.body_sections.iter().all(|s| s.paragraphs.len() == 2));
    }

    #[test]
    fn test_keyword_density_and_reading_time() {
        assert_eq!(
            keyword_density(&tokenize("bitcoin up bitcoin down"), "bitcoin"),
            0.5
        );
        assert_eq!(keyword_density(&tokenize("no match here"), "bitcoin"), 0.0);
        assert_eq!(
            keyword_density(&tokenize("bitcoin etf flows rise"), "bitcoin etf"),
            0.5
        );
        assert_eq!(reading_time(0, 200), 1);
        assert_eq!(reading_time(200, 200), 1);
        assert_eq!(reading_time(201, 200), 2);
    }

    #[test]
    fn test_description_truncation() {
        let long = "word ".repeat(60);
        let description = truncate_description(long.trim());
        assert!(description.chars().count() <= DESCRIPTION_MAX);
        assert!(description.ends_with("..."));
    }
}
