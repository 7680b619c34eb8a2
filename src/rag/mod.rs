//! Retrieval-augmented recommendation.
//!
//! A query is embedded and matched against the persisted index, the closest
//! catalog chunks are rendered into a fixed instruction prompt, and the chat
//! model's answer is returned together with the chunks it was shown.

mod generation;
pub mod prompt;
mod retriever;

pub use generation::{GenerationClient, GenerationOrchestrator, OpenAIChatClient};
pub use prompt::PromptComposer;
pub use retriever::{Retriever, DEFAULT_TOP_K};

use crate::index::SearchHit;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Phrases the prompt asks the model to use when the context does not help.
const UNCERTAINTY_MARKERS: &[&str] = &["don't know", "do not know", "not sure", "cannot recommend"];

fn numbered_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:\*\*)?(\d+)[.)]\s+\S").expect("Invalid regex"))
}

/// A generated recommendation and the catalog chunks behind it.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    /// The model's answer, unmodified.
    pub text: String,
    /// Retrieved chunks, best first.
    pub sources: Vec<SearchHit>,
}

impl Recommendation {
    /// Top-level numbered list items (`1. ...`, `2) ...`).
    ///
    /// Indented sub-items are not counted.
    pub fn numbered_entries(&self) -> Vec<&str> {
        self.text
            .lines()
            .filter(|line| numbered_line().is_match(line))
            .map(str::trim)
            .collect()
    }

    /// Whether the answer declines to recommend.
    ///
    /// A full list of three picks is never uncertain, whatever phrases its
    /// justifications use.
    pub fn is_uncertain(&self) -> bool {
        if self.numbered_entries().len() >= 3 {
            return false;
        }
        let lower = self.text.to_lowercase().replace('\u{2019}', "'");
        UNCERTAINTY_MARKERS.iter().any(|m| lower.contains(m))
    }
}

/// Title of the catalog entry a hit came from, or a content preview.
pub fn source_title(hit: &SearchHit) -> String {
    let content = hit.chunk.content.as_str();
    if let Some(title) = content
        .strip_prefix("Title: ")
        .and_then(|rest| rest.split(" Overview: ").next())
    {
        return title.to_string();
    }
    let preview: String = content.chars().take(60).collect();
    if preview.len() < content.len() {
        format!("{}...", preview)
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::Chunk;

    fn recommendation(text: &str) -> Recommendation {
        Recommendation {
            text: text.to_string(),
            sources: vec![SearchHit {
                chunk: Chunk {
                    record_index: 3,
                    order: 0,
                    content: "Title: Planetes Overview: Debris collectors. Genre: Drama ".to_string(),
                },
                score: 0.81,
            }],
        }
    }

    #[test]
    fn test_numbered_entries_ignore_sub_items() {
        let rec = recommendation(
            "Here are three picks:\n\n\
             1. **Cowboy Bebop**\n   1. Bounty hunters in space.\n   2. Matches your taste for jazz.\n\
             2. **Planetes**\n   - Debris collectors in orbit.\n\
             3) Space Brothers\n",
        );
        let entries = rec.numbered_entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2], "3) Space Brothers");
        assert!(!rec.is_uncertain());
    }

    #[test]
    fn test_bold_numbering_counts() {
        let rec = recommendation("**1. Trigun**\n**2. Outlaw Star**\n**3. Space Dandy**");
        assert_eq!(rec.numbered_entries().len(), 3);
    }

    #[test]
    fn test_uncertainty_detection() {
        assert!(recommendation("I don't know of any cooking anime here.").is_uncertain());
        assert!(recommendation("I DON\u{2019}T KNOW.").is_uncertain());
        assert!(recommendation("Sorry, I do not know.").is_uncertain());
        assert!(recommendation("1. Cowboy Bebop").numbered_entries().len() == 1);
    }

    #[test]
    fn test_full_list_is_not_uncertain() {
        let rec = recommendation(
            "1. Planetes - if you are not sure about hard sci-fi, start here.\n\
             2. Space Brothers - I cannot recommend it enough.\n\
             3. Cowboy Bebop - a classic.",
        );
        assert!(!rec.is_uncertain());
        assert!(recommendation("I'm not sure. 1. Planetes maybe?").is_uncertain());
    }

    #[test]
    fn test_source_title_falls_back_to_preview() {
        let hit = SearchHit {
            chunk: Chunk {
                record_index: 0,
                order: 1,
                content: "continuation of a long synopsis".to_string(),
            },
            score: 0.5,
        };
        assert_eq!(source_title(&hit), "continuation of a long synopsis");
    }
}
