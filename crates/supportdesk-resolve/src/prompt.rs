//! Prompt assembly from retrieved context and conversation history.

use std::fmt::Write;

use supportdesk_store::{ChatTurn, TurnRole};

use crate::context::RetrievedContext;

/// Number of most recent history turns included in the prompt.
pub const HISTORY_TURNS: usize = 5;

const PREAMBLE: &str = "You are a helpful customer support assistant for a company. \
Use the following information to answer the user's question accurately and helpfully.\n\n";

const CLOSING: &str = "Please provide a helpful, accurate answer based on the information \
provided above. If the information doesn't contain the answer, say so politely and offer to \
help with other questions.";

/// Render the full prompt. Pure: identical inputs give identical output.
///
/// Sections without content are omitted. Nothing is truncated.
pub fn build_prompt(query: &str, context: &RetrievedContext, history: &[ChatTurn]) -> String {
    let mut prompt = String::from(PREAMBLE);

    if !context.faqs.is_empty() {
        prompt.push_str("## Frequently Asked Questions (FAQs):\n\n");
        for (i, faq) in context.faqs.iter().enumerate() {
            let _ = write!(prompt, "{}. Q: {}\n   A: {}\n\n", i + 1, faq.question, faq.answer);
        }
    }

    if !context.chunks.is_empty() {
        prompt.push_str("## Company Documents:\n\n");
        for chunk in &context.chunks {
            let source = chunk.source_name.as_deref().unwrap_or("Document");
            let _ = write!(prompt, "[From {}]\n{}\n\n", source, chunk.content);
        }
    }

    if !history.is_empty() {
        prompt.push_str("## Previous Conversation:\n\n");
        let start = history.len().saturating_sub(HISTORY_TURNS);
        for turn in &history[start..] {
            let label = match turn.role {
                TurnRole::User => "User",
                TurnRole::Assistant => "Assistant",
            };
            let _ = writeln!(prompt, "{}: {}", label, turn.content);
        }
        prompt.push('\n');
    }

    let _ = write!(prompt, "## Current Question:\n{}\n\n", query);
    prompt.push_str(CLOSING);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ChunkSnippet, FaqSnippet, SearchStrategy};

    fn context_with_faq() -> RetrievedContext {
        RetrievedContext {
            faqs: vec![FaqSnippet {
                id: 1,
                question: "What is your refund policy?".into(),
                answer: "Full refunds within 30 days.".into(),
                score: 1.2,
            }],
            chunks: vec![ChunkSnippet {
                id: 7,
                document_id: 3,
                content: "Refunds are issued to the original payment method.".into(),
                source_name: None,
                score: 0.8,
            }],
            faq_strategy: SearchStrategy::FullText,
            chunk_strategy: SearchStrategy::FullText,
            degraded: None,
        }
    }

    #[test]
    fn test_faq_listed_as_first_item() {
        let prompt = build_prompt("refund policy", &context_with_faq(), &[]);
        assert!(prompt.contains(
            "## Frequently Asked Questions (FAQs):\n\n1. Q: What is your refund policy?\n   A: Full refunds within 30 days.\n\n"
        ));
        assert!(prompt.contains("[From Document]\nRefunds are issued"));
        assert!(!prompt.contains("## Previous Conversation"));
    }

    #[test]
    fn test_empty_context_omits_sections() {
        let prompt = build_prompt("xyzzy123", &RetrievedContext::empty(), &[]);
        assert_eq!(
            prompt,
            format!("{}## Current Question:\nxyzzy123\n\n{}", PREAMBLE, CLOSING)
        );
        assert!(!prompt.contains("## Frequently Asked Questions"));
        assert!(!prompt.contains("## Company Documents"));
    }

    #[test]
    fn test_section_order() {
        let history = vec![ChatTurn::user("hi"), ChatTurn::assistant("hello")];
        let prompt = build_prompt("refund policy", &context_with_faq(), &history);
        let faq = prompt.find("## Frequently Asked Questions").unwrap();
        let docs = prompt.find("## Company Documents").unwrap();
        let conv = prompt.find("## Previous Conversation").unwrap();
        let question = prompt.find("## Current Question").unwrap();
        assert!(faq < docs && docs < conv && conv < question);
        assert!(prompt.ends_with(CLOSING));
    }

    #[test]
    fn test_only_last_five_turns() {
        let history: Vec<ChatTurn> = (0..8)
            .map(|i| {
                if i % 2 == 0 {
                    ChatTurn::user(format!("question {}", i))
                } else {
                    ChatTurn::assistant(format!("answer {}", i))
                }
            })
            .collect();
        let prompt = build_prompt("next", &RetrievedContext::empty(), &history);
        assert!(!prompt.contains("question 2\n"));
        assert!(prompt.contains("Assistant: answer 3\nUser: question 4\n"));
        assert!(prompt.contains("Assistant: answer 7\n\n## Current Question:"));
    }

    #[test]
    fn test_deterministic() {
        let history = vec![ChatTurn::user("a"), ChatTurn::assistant("b")];
        let ctx = context_with_faq();
        assert_eq!(
            build_prompt("refund policy", &ctx, &history),
            build_prompt("refund policy", &ctx, &history)
        );
    }
}
