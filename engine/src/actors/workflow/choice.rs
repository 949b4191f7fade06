//! Parsing the user's answer to a proposal set.

use regex::Regex;
use shared_types::Proposal;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceDirective {
    /// Let the engine pick the most confident proposal.
    Auto,
    /// 1-based proposal number as typed by the user.
    Index(usize),
}

fn option_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"option\s*(\d+)").ok())
        .as_ref()
}

fn auto_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\bauto\b").ok())
        .as_ref()
}

/// Case-insensitive. `None` when the text names no choice at all.
pub fn parse_choice(text: &str) -> Option<ChoiceDirective> {
    let lower = text.trim().to_lowercase();
    if lower.contains("choose for me") || auto_pattern().is_some_and(|re| re.is_match(&lower)) {
        return Some(ChoiceDirective::Auto);
    }

    if let Some(caps) = option_pattern().and_then(|re| re.captures(&lower)) {
        return caps
            .get(1)
            .and_then(|m| m.as_str().parse::<usize>().ok())
            .map(ChoiceDirective::Index);
    }

    lower.parse::<usize>().ok().map(ChoiceDirective::Index)
}

/// Zero-based index into `proposals`, or `None` when out of range.
/// Auto picks the highest confidence; ties go to the earliest proposal.
pub fn resolve_choice(directive: ChoiceDirective, proposals: &[Proposal]) -> Option<usize> {
    match directive {
        ChoiceDirective::Auto => proposals
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (index, proposal)| match best {
                Some((_, confidence)) if confidence >= proposal.confidence => best,
                _ => Some((index, proposal.confidence)),
            })
            .map(|(index, _)| index),
        ChoiceDirective::Index(n) if (1..=proposals.len()).contains(&n) => Some(n - 1),
        ChoiceDirective::Index(_) => None,
    }
}
