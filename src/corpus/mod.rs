//! Recorded-name corpus lookup and collision rewriting.
//!
//! The corpus is a global namespace: a generated name that matches any
//! previously recorded name, case-insensitively, is considered taken and the
//! pipeline tries to synthesize a brandable alternative. The synthesis is a
//! greedy ordered heuristic; the ordering is what makes it reproducible.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashSet;

use crate::error::Result;

/// Maximum length of a returned name, in characters.
pub const MAX_NAME_CHARS: usize = 80;

/// Suffix words tried first when rewriting a colliding name, in order.
const BRAND_SUFFIXES: [&str; 8] = [
    "Labs",
    "Studio",
    "Works",
    "Co",
    "HQ",
    "Group",
    "Solutions",
    "Systems",
];

/// Case-insensitive lookup against all previously recorded names.
#[async_trait]
pub trait NameCorpus: Send + Sync {
    /// Lowercased corpus entries that exactly match any of `candidates`
    /// (case-insensitive).
    async fn existing_lowercase(&self, candidates: &[String]) -> Result<HashSet<String>>;
}

/// In-memory corpus for tests and single-instance deployments.
pub struct MemoryCorpus {
    names: RwLock<HashSet<String>>,
}

impl MemoryCorpus {
    pub fn new() -> Self {
        Self {
            names: RwLock::new(HashSet::new()),
        }
    }

    pub fn record(&self, name: &str) {
        self.names.write().insert(name.to_lowercase());
    }
}

impl Default for MemoryCorpus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NameCorpus for MemoryCorpus {
    async fn existing_lowercase(&self, candidates: &[String]) -> Result<HashSet<String>> {
        let names = self.names.read();
        Ok(candidates
            .iter()
            .map(|c| c.to_lowercase())
            .filter(|c| names.contains(c))
            .collect())
    }
}

/// Trim and collapse internal whitespace. Idempotent.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First whitespace-delimited word of `s`, if any.
pub fn first_word(s: &str) -> Option<&str> {
    s.split_whitespace().next()
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Rewrite candidates for a colliding name, in selection order: base + each
/// brand suffix, then industry-word and keyword-word prefixes, then the
/// space-collapsed base, then base + industry word. Normalized, length-capped,
/// empties dropped.
pub fn rewrite_candidates(base_name: &str, industry: &str, keywords: Option<&str>) -> Vec<String> {
    let base = normalize_name(base_name);
    let industry_word = first_word(industry).unwrap_or_default();
    let keyword_word = keywords.and_then(first_word).unwrap_or_default();

    let mut raw: Vec<String> = Vec::new();
    for suffix in BRAND_SUFFIXES {
        raw.push(format!("{base} {suffix}"));
    }
    for prefix in [industry_word, keyword_word] {
        if !prefix.is_empty() {
            raw.push(format!("{prefix} {base}"));
        }
    }
    raw.push(base.split_whitespace().collect::<String>());
    raw.push(format!("{base} {industry_word}"));

    raw.into_iter()
        .map(|c| truncate_chars(&normalize_name(&c), MAX_NAME_CHARS))
        .filter(|c| !c.is_empty())
        .collect()
}

/// Synthesize a replacement for a name that collides with the corpus.
///
/// The first candidate from [`rewrite_candidates`] absent from
/// `existing_lower` wins, so the replacement is itself collision-free at
/// selection time. `None` means every candidate also collides; the caller
/// then keeps the original name, flagged as colliding.
pub fn find_alternative(
    base_name: &str,
    existing_lower: &HashSet<String>,
    industry: &str,
    keywords: Option<&str>,
) -> Option<String> {
    rewrite_candidates(base_name, industry, keywords)
        .into_iter()
        .find(|name| !existing_lower.contains(&name.to_lowercase()))
}
