//! The recommendation prompt.
//!
//! The template is fixed at compile time: the output contract (three numbered
//! picks, or an honest "I don't know") is part of the program, not of its
//! configuration. A different contract means a different template.

use crate::index::SearchHit;
use std::collections::HashMap;

/// Instruction template with `{{context}}` and `{{question}}` slots.
pub const RECOMMENDATION_TEMPLATE: &str = r#"You are an expert anime recommender. Your job is to help users find the perfect anime based on their preferences.

Using the following context, provide a detailed and engaging response to the user's question.

For each question, suggest exactly three anime titles. For each recommendation, include:
1. The anime title.
2. A concise plot summary (2-3 sentences).
3. A clear explanation of why this anime matches the user's preferences.

Present your recommendations in a numbered list format for easy reading.

If you don't know the answer, respond honestly by saying you don't know. Do not fabricate any information.

Context:
{{context}}

User's question:
{{question}}

Your well-structured response:
"#;

/// Renders retrieved chunks and the user's question into the prompt.
#[derive(Debug, Clone, Copy)]
pub struct PromptComposer {
    template: &'static str,
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptComposer {
    /// Composer over [`RECOMMENDATION_TEMPLATE`].
    pub fn new() -> Self {
        Self {
            template: RECOMMENDATION_TEMPLATE,
        }
    }

    /// Render the prompt. Chunks appear in retrieval order, separated by
    /// blank lines.
    pub fn compose(&self, chunks: &[SearchHit], query: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("context", format_context(chunks));
        vars.insert("question", query.to_string());
        render(self.template, &vars)
    }
}

/// Join chunk contents the way they are shown to the model.
pub fn format_context(chunks: &[SearchHit]) -> String {
    chunks
        .iter()
        .map(|hit| hit.chunk.content.trim_end())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Replace `{{key}}` placeholders with their values in a single pass, so
/// text inside a value is never treated as a placeholder.
fn render(template: &str, vars: &HashMap<&str, String>) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = &after[..end];
                match vars.get(key) {
                    Some(value) => result.push_str(value),
                    None => {
                        result.push_str("{{");
                        result.push_str(key);
                        result.push_str("}}");
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                result.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    result.push_str(rest);
    result
}
