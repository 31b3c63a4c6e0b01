//! Utility functions for text tokenization, slugs, and file system checks.
//!
//! This module provides helper functions used throughout the pipeline:
//! - Tokenization and word counting shared by the assembler and collectors
//! - Sentence splitting for meta descriptions and trimming
//! - Slugification for output filenames
//! - String truncation for logging
//! - File system validation for the output directory

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

use crate::error::Result;

static SENTENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[^.!?]+[.!?]+["')\]]*|[^.!?]+$"#).unwrap());
static HYPHEN_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").unwrap());

/// Lowercase alphanumeric tokens of a text, in order.
///
/// This is the shared token definition: overlap scoring, keyword density,
/// and link relevance all count the same tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|t| !t.is_empty())
        .collect()
}

/// Whitespace-separated word count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Number of distinct tokens shared between two texts.
pub fn token_overlap(a: &str, b: &str) -> usize {
    use std::collections::HashSet;
    let left: HashSet<String> = tokenize(a).into_iter().collect();
    let right: HashSet<String> = tokenize(b).into_iter().collect();
    left.intersection(&right).count()
}

/// Split text into sentences, keeping terminal punctuation.
///
/// Text without any terminator comes back as a single sentence, so callers
/// never receive an empty split for non-empty input.
pub fn split_sentences(text: &str) -> Vec<String> {
    SENTENCE_RE
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// The first sentence of a text, or the whole text when it has no
/// sentence terminator.
pub fn leading_sentence(text: &str) -> String {
    split_sentences(text)
        .into_iter()
        .next()
        .unwrap_or_default()
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// byte count indicator appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}…(+{} bytes)", &s[..max], s.len() - max)
    }
}

/// Convert a title to a URL- and filename-safe slug.
///
/// Lowercases the text, removes special characters, replaces spaces with
/// hyphens, and collapses hyphen runs.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify_title("Hello World"), "hello-world");
/// assert_eq!(slugify_title("Bitcoin Hits $70K"), "bitcoin-hits-70k");
/// ```
pub fn slugify_title(title: &str) -> String {
    let slug = title
        .to_lowercase()
        .replace(|c: char| !c.is_alphanumeric() && c != ' ' && c != '-', "")
        .replace(' ', "-");
    HYPHEN_RUN_RE
        .replace_all(&slug, "-")
        .trim_matches('-')
        .to_string()
}

/// Capitalize the first character of a string.
pub fn upcase(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test by
/// creating and immediately deleting a probe file.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<()> {
    fs::create_dir_all(path).await?;
    // Small sync probe write (simpler error surface)
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    let _ = stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}
