//! Research approach proposals derived from the topic.

use shared_types::{Complexity, Proposal};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// The three research strategies offered for a topic, in display order.
pub fn generate_proposals(topic: &str) -> Vec<Proposal> {
    vec![
        Proposal {
            title: "Quick Overview Research".to_string(),
            description: format!(
                "Rapid survey of {topic} using top search results and popular sources"
            ),
            sources: strings(&["Google Search", "Wikipedia", "Top 3 websites"]),
            complexity: Complexity::Simple,
            estimated_minutes: 5,
            pros: strings(&[
                "Fast results",
                "Good for initial understanding",
                "Low resource usage",
            ]),
            cons: strings(&["Less comprehensive", "May miss niche insights"]),
            confidence: 0.8,
        },
        Proposal {
            title: "Comprehensive Deep-Dive".to_string(),
            description: format!(
                "Thorough investigation of {topic} across multiple platforms and sources"
            ),
            sources: strings(&[
                "Google Search",
                "GitHub",
                "YouTube",
                "Academic sources",
                "Forums",
            ]),
            complexity: Complexity::Comprehensive,
            estimated_minutes: 15,
            pros: strings(&[
                "Very thorough",
                "Multiple perspectives",
                "High-quality insights",
            ]),
            cons: strings(&["Takes longer", "More resource intensive"]),
            confidence: 0.9,
        },
        Proposal {
            title: "Practical Implementation Focus".to_string(),
            description: format!("Focus on practical, actionable information about {topic}"),
            sources: strings(&[
                "GitHub repositories",
                "Tutorial sites",
                "Stack Overflow",
                "Documentation",
            ]),
            complexity: Complexity::Moderate,
            estimated_minutes: 10,
            pros: strings(&[
                "Actionable results",
                "Code examples",
                "Real-world solutions",
            ]),
            cons: strings(&["Less theoretical background", "May miss broader context"]),
            confidence: 0.85,
        },
    ]
}
