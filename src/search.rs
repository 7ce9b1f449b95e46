//! Fuzzy matching and ranking over catalog records.
//!
//! Scores are integers in `0..=100`. [`partial_ratio`] slides the shorter
//! string across the longer one and keeps the best window, so a query that
//! appears inside a longer name scores 100. Name search subtracts the length
//! difference between query and name from that score so that near-exact
//! names outrank long names that merely contain the query.

use crate::catalog::ImageRecord;
use std::collections::HashSet;
use std::sync::Arc;

/// Scores must be strictly greater than this to count as a match.
pub const MATCH_THRESHOLD: i32 = 70;

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

fn ratio_chars(a: &[char], b: &[char]) -> u8 {
    let total = a.len() + b.len();
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let matched = lcs_len(a, b);
    ((200.0 * matched as f64) / total as f64).round() as u8
}

/// Share of characters two strings have in common, in order.
pub fn ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

/// Best [`ratio`] of the shorter string against every equally long window of the longer one.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    if short.is_empty() {
        return 0;
    }

    let mut best = 0;
    for window in long.windows(short.len()) {
        best = best.max(ratio_chars(&short, window));
        if best == 100 {
            break;
        }
    }
    best
}

/// Stable descending sort by score, then the first `limit` items.
pub fn rank<T>(mut scored: Vec<(i32, T)>, limit: usize) -> Vec<T> {
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().take(limit).map(|(_, item)| item).collect()
}

fn length_penalty(a: &str, b: &str) -> i32 {
    (a.chars().count() as i32 - b.chars().count() as i32).abs()
}

fn parse_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub struct SearchEngine {
    threshold: i32,
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self {
            threshold: MATCH_THRESHOLD,
        }
    }
}

impl SearchEngine {
    pub fn with_threshold(threshold: i32) -> Self {
        Self { threshold }
    }

    /// Partial ratio of the lowercased strings minus their length difference.
    pub fn name_score(&self, query: &str, name: &str) -> i32 {
        let query = query.to_lowercase();
        let name = name.to_lowercase();
        let base = partial_ratio(&query, &name) as i32;
        base - length_penalty(&query, &name)
    }

    /// [`name_score`](Self::name_score) of an already lowercased query, or `None`
    /// when it cannot exceed the threshold.
    ///
    /// A partial ratio never exceeds 100, so a length difference of
    /// `100 - threshold` or more rejects the name before any matching runs.
    fn qualifying_score(&self, query_lower: &str, name: &str) -> Option<i32> {
        let name = name.to_lowercase();
        let penalty = length_penalty(query_lower, &name);
        if penalty >= 100 - self.threshold {
            return None;
        }
        let score = partial_ratio(query_lower, &name) as i32 - penalty;
        (score > self.threshold).then_some(score)
    }

    /// Ranked name matches, optionally restricted to one category (case-insensitive).
    ///
    /// Every qualifying record is scored before truncation, so the result is
    /// the true top `limit`.
    pub fn search_by_name(
        &self,
        images: &[Arc<ImageRecord>],
        query: &str,
        category: Option<&str>,
        limit: usize,
    ) -> Vec<Arc<ImageRecord>> {
        let category = category.map(str::to_lowercase);
        let query_lower = query.to_lowercase();

        let scored: Vec<(i32, Arc<ImageRecord>)> = images
            .iter()
            .filter(|image| match &category {
                Some(c) => image.category.to_lowercase() == *c,
                None => true,
            })
            .filter_map(|image| {
                let score = self.qualifying_score(&query_lower, &image.name)?;
                log::trace!("Name score {} for '{}' against '{}'", score, query, image.name);
                Some((score, Arc::clone(image)))
            })
            .collect();

        log::debug!(
            "Name search '{}' matched {} images (limit {})",
            query,
            scored.len(),
            limit
        );
        rank(scored, limit)
    }

    fn matches_tags(&self, image: &ImageRecord, query_tags: &[String]) -> bool {
        query_tags.iter().any(|wanted| {
            image
                .tags
                .iter()
                .any(|tag| partial_ratio(wanted, &tag.to_lowercase()) as i32 > self.threshold)
        })
    }

    /// Images matching any comma-separated tag, then images authored by the exact GitHub handle.
    ///
    /// Tag matches come first, in catalog order, followed by author matches not
    /// already present. Both passes share the one `limit`.
    pub fn search_by_tags_or_author(
        &self,
        images: &[Arc<ImageRecord>],
        tags: Option<&str>,
        author: Option<&str>,
        limit: usize,
    ) -> Vec<Arc<ImageRecord>> {
        let query_tags = tags.map(parse_tags).unwrap_or_default();
        let mut found: Vec<Arc<ImageRecord>> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();

        if !query_tags.is_empty() {
            for image in images {
                if found.len() >= limit {
                    break;
                }
                if self.matches_tags(image, &query_tags) && seen.insert(image.id.as_str()) {
                    found.push(Arc::clone(image));
                }
            }
        }

        if let Some(handle) = author {
            for image in images {
                if found.len() >= limit {
                    break;
                }
                if image.authors.iter().any(|a| a.github == handle) && seen.insert(image.id.as_str()) {
                    found.push(Arc::clone(image));
                }
            }
        }

        log::debug!(
            "Tag/author search tags={:?} author={:?} matched {} images",
            query_tags,
            author,
            found.len()
        );
        found
    }
}
