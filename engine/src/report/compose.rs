//! Report synthesis from ranked search results.

use chrono::{DateTime, Utc};
use shared_types::{Proposal, Report, SearchResult};
use std::fmt::Write;

use super::aggregate::{is_code_hosting, is_youtube};
use crate::markdown;

const KEY_FINDINGS: usize = 5;
const DETAILED_RESULTS: usize = 10;
const FINDING_SNIPPET_CHARS: usize = 150;

pub fn compose_report(
    topic: &str,
    proposal: &Proposal,
    ranked: &[SearchResult],
    quality_score: f64,
    generated_at: DateTime<Utc>,
) -> Report {
    let executive_summary = executive_summary(topic, proposal, ranked.len(), quality_score);
    let recommendations = recommendations(ranked);
    let key_findings = key_findings(ranked);
    let markdown = render_markdown(
        topic,
        proposal,
        ranked,
        quality_score,
        generated_at,
        &executive_summary,
        &recommendations,
    );
    let html = markdown::render_to_html(&markdown);

    Report {
        title: format!("Research Report: {topic}"),
        topic: topic.to_string(),
        approach: proposal.title.clone(),
        complexity: proposal.complexity,
        generated_at,
        quality_score,
        sources_count: ranked.len(),
        markdown,
        html,
        executive_summary,
        recommendations,
        key_findings,
    }
}

pub fn executive_summary(topic: &str, proposal: &Proposal, sources: usize, quality: f64) -> String {
    format!(
        "This research investigated \"{topic}\" using the {} methodology. \
         The analysis examined {sources} relevant sources and achieved a quality score of {quality:.1}/10.",
        proposal.title.to_lowercase()
    )
}

pub fn recommendations(ranked: &[SearchResult]) -> Vec<String> {
    let mut out = Vec::new();
    if ranked.iter().any(|r| is_code_hosting(&r.url)) {
        out.push(
            "Explore the GitHub repositories found for code examples and implementation details"
                .to_string(),
        );
    }
    if ranked.iter().any(|r| is_youtube(&r.url)) {
        out.push(
            "Watch the YouTube tutorials for visual learning and step-by-step guidance".to_string(),
        );
    }
    out.push("Start with the highest-rated sources for quality information".to_string());
    out.push("Cross-reference multiple sources to ensure comprehensive understanding".to_string());
    out
}

/// Titles of the top ranked results, skipping untitled ones.
pub fn key_findings(ranked: &[SearchResult]) -> Vec<String> {
    ranked
        .iter()
        .take(KEY_FINDINGS)
        .map(|r| r.title.trim())
        .filter(|title| !title.is_empty())
        .map(str::to_string)
        .collect()
}

fn truncate_snippet(snippet: &str) -> String {
    if snippet.chars().count() > FINDING_SNIPPET_CHARS {
        let head: String = snippet.chars().take(FINDING_SNIPPET_CHARS).collect();
        format!("{head}...")
    } else {
        snippet.to_string()
    }
}

/// Keep link text and headings from being reinterpreted as markdown syntax.
fn inline_text(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = String::with_capacity(flat.len());
    for c in flat.chars() {
        if matches!(c, '[' | ']' | '*' | '_' | '`' | '#' | '|') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn link_target(url: &str) -> String {
    url.replace(' ', "%20")
        .replace('(', "%28")
        .replace(')', "%29")
}

fn render_markdown(
    topic: &str,
    proposal: &Proposal,
    ranked: &[SearchResult],
    quality_score: f64,
    generated_at: DateTime<Utc>,
    executive_summary: &str,
    recommendations: &[String],
) -> String {
    // Writing into a String cannot fail.
    let mut md = String::new();
    let _ = writeln!(md, "# Research Report: {}\n", inline_text(topic));
    let _ = writeln!(md, "**Date:** {}  ", generated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(md, "**Research Approach:** {}  ", proposal.title);
    let _ = writeln!(md, "**Complexity Level:** {}\n", proposal.complexity.label());

    let _ = writeln!(md, "## Executive Summary\n\n{executive_summary}\n");

    let _ = writeln!(md, "## Research Methodology\n");
    let _ = writeln!(md, "**Selected Approach:** {}\n", inline_text(&proposal.description));
    let _ = writeln!(md, "**Sources Investigated:**\n");
    for source in &proposal.sources {
        let _ = writeln!(md, "- {source}");
    }
    let _ = writeln!(md, "\n**Quality Metrics:**\n");
    let _ = writeln!(md, "- Sources Found: {}", ranked.len());
    let _ = writeln!(md, "- Quality Score: {quality_score:.1}/10");
    let _ = writeln!(md, "- Confidence Level: {:.0}%\n", proposal.confidence * 100.0);

    let _ = writeln!(md, "## Key Findings\n");
    if ranked.is_empty() {
        let _ = writeln!(md, "No significant findings to report.\n");
    }
    for result in ranked.iter().take(KEY_FINDINGS) {
        let _ = writeln!(
            md,
            "**{}:** {}\n",
            inline_text(&result.title),
            inline_text(&truncate_snippet(&result.snippet))
        );
    }

    let _ = writeln!(md, "## Detailed Results\n");
    for (i, result) in ranked.iter().take(DETAILED_RESULTS).enumerate() {
        let _ = writeln!(md, "### {}. {}\n", i + 1, inline_text(&result.title));
        let _ = writeln!(
            md,
            "**Source:** [{}]({})  ",
            inline_text(&result.url),
            link_target(&result.url)
        );
        let _ = writeln!(md, "**Relevance:** {:.1}  ", result.relevance_score);
        let _ = writeln!(md, "**Found via:** {} ({})\n", inline_text(&result.source_query), result.backend);
        if result.snippet.trim().is_empty() {
            let _ = writeln!(md, "No description available.\n");
        } else {
            let _ = writeln!(md, "{}\n", inline_text(&result.snippet));
        }
        let _ = writeln!(md, "---\n");
    }

    let _ = writeln!(md, "## Recommendations\n");
    for recommendation in recommendations {
        let _ = writeln!(md, "- {recommendation}");
    }

    let _ = writeln!(md, "\n## Next Steps\n");
    let _ = writeln!(md, "1. **Immediate Actions:** Review the top 3 findings for quick implementation");
    let _ = writeln!(md, "2. **Deep Dive:** Explore the highest-rated sources for comprehensive understanding");
    let _ = writeln!(md, "3. **Practical Application:** Consider the implementation-focused results for hands-on learning");
    md
}
