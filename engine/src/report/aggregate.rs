//! Relevance scoring, ranking and quality estimation for search results.

use shared_types::SearchResult;
use std::collections::HashSet;

const CODE_HOSTS: [&str; 3] = ["github.com", "gitlab.com", "bitbucket.org"];
const TEACHING_WORDS: [&str; 3] = ["tutorial", "guide", "example"];

const TITLE_WEIGHT: f64 = 2.0;
const SNIPPET_WEIGHT: f64 = 1.0;

/// Distinct lowercase words of the topic, in order of first appearance.
pub fn topic_keywords(topic: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    topic
        .split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|word| !word.is_empty() && seen.insert(word.clone()))
        .collect()
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn keyword_hits(keywords: &[String], text: &str) -> usize {
    let tokens = tokenize(text);
    keywords
        .iter()
        .map(|keyword| tokens.iter().filter(|token| *token == keyword).count())
        .sum()
}

/// Title matches weigh twice as much as snippet matches.
pub fn relevance_score(keywords: &[String], title: &str, snippet: &str) -> f64 {
    TITLE_WEIGHT * keyword_hits(keywords, title) as f64
        + SNIPPET_WEIGHT * keyword_hits(keywords, snippet) as f64
}

/// Deduplicate by URL (first discovery wins), score against the topic and
/// stably sort by score, highest first.
pub fn rank_results(topic: &str, results: Vec<SearchResult>) -> Vec<SearchResult> {
    let keywords = topic_keywords(topic);
    let mut seen_urls = HashSet::new();
    let mut ranked: Vec<SearchResult> = results
        .into_iter()
        .filter(|result| seen_urls.insert(result.url.clone()))
        .map(|mut result| {
            result.relevance_score = relevance_score(&keywords, &result.title, &result.snippet);
            result
        })
        .collect();

    ranked.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
    ranked
}

fn host_of(url: &str) -> String {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let authority = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host = authority.rsplit('@').next().unwrap_or(authority);
    let host = host.split(':').next().unwrap_or(host).to_ascii_lowercase();
    host.strip_prefix("www.").map(str::to_string).unwrap_or(host)
}

pub fn is_code_hosting(url: &str) -> bool {
    let host = host_of(url);
    CODE_HOSTS
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")))
}

pub fn is_youtube(url: &str) -> bool {
    let host = host_of(url);
    host == "youtube.com" || host.ends_with(".youtube.com") || host == "youtu.be"
}

fn quality_bonus(result: &SearchResult) -> f64 {
    let mut bonus = 0.0;
    if is_code_hosting(&result.url) {
        bonus += 0.2;
    }
    let snippet = result.snippet.to_lowercase();
    if TEACHING_WORDS.iter().any(|word| snippet.contains(word)) {
        bonus += 0.1;
    }
    bonus
}

/// `min(10, mean(score + bonus) * 2)`; 0 for an empty set.
pub fn quality_score(results: &[SearchResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let total: f64 = results
        .iter()
        .map(|result| result.relevance_score + quality_bonus(result))
        .sum();
    let mean = total / results.len() as f64;
    (mean * 2.0).min(10.0)
}
