//! `@username` mentions in post and comment text.
//!
//! Mentions are only extracted for display; they are never checked against
//! real accounts.

use once_cell::sync::Lazy;
use regex::Regex;

static MENTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"@(\w+)").unwrap());

/// Mentioned names in order of first appearance, without duplicates
pub fn extract_mentions(text: &str) -> Vec<String> {
    let mut mentions: Vec<String> = Vec::new();
    for cap in MENTION_RE.captures_iter(text) {
        let name = &cap[1];
        if !mentions.iter().any(|m| m == name) {
            mentions.push(name.to_string());
        }
    }
    mentions
}
