//! Parser for structured LLM replies.
//!
//! Rewriting prompts instruct the model to answer in a marker format:
//!
//! ```text
//! DECISION: REWRITE
//! ANSWER: <corrected answer>
//! ```
//!
//! ```text
//! DECISION: ASK_QUESTIONS
//! QUESTION: <question 1>
//! QUESTION: <question 2>
//! ```
//!
//! ```text
//! DECISION: IMPOSSIBLE
//! <explanation of why no answer exists>
//! ```
//!
//! Models occasionally wrap markers in markdown headers (`### DECISION:`),
//! so marker matching strips leading `#`. A reply with no recognizable
//! DECISION marker is treated as a rewrite whose answer is the whole
//! reply, never dropped.

use tracing::warn;

use crate::domain::models::LlmDecision;

const DECISION_PREFIX: &str = "DECISION:";
const ANSWER_PREFIX: &str = "ANSWER:";
const QUESTION_PREFIX: &str = "QUESTION:";

/// Upper bound on questions extracted from one reply.
pub const MAX_QUESTIONS: usize = 5;

/// A parsed rewrite-turn reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDecision {
    /// The decision the model declared (or the rewrite default)
    pub decision: LlmDecision,
    /// Rewritten answer (REWRITE) or explanation (IMPOSSIBLE)
    pub answer: String,
    /// Extracted questions (ASK_QUESTIONS), capped at [`MAX_QUESTIONS`]
    pub questions: Vec<String>,
}

/// Parser for structured LLM replies.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseParser;

impl ResponseParser {
    pub const fn new() -> Self {
        Self
    }

    /// Parse a rewrite-turn reply into a decision.
    pub fn parse_decision(&self, reply: &str) -> ParsedDecision {
        if reply.trim().is_empty() {
            warn!("Empty LLM reply, defaulting to REWRITE with empty answer");
            return ParsedDecision {
                decision: LlmDecision::Rewrite,
                answer: String::new(),
                questions: Vec::new(),
            };
        }

        let lines: Vec<&str> = reply.lines().collect();

        let Some(decision) = Self::find_decision(&lines) else {
            warn!("No DECISION marker in LLM reply, treating whole reply as a rewrite");
            return ParsedDecision {
                decision: LlmDecision::Rewrite,
                answer: reply.trim().to_string(),
                questions: Vec::new(),
            };
        };

        match decision {
            LlmDecision::Rewrite => ParsedDecision {
                decision,
                answer: Self::extract_answer(&lines),
                questions: Vec::new(),
            },
            LlmDecision::AskQuestions => ParsedDecision {
                decision,
                answer: String::new(),
                questions: Self::extract_questions(&lines),
            },
            LlmDecision::Impossible => ParsedDecision {
                decision,
                answer: Self::extract_explanation(&lines),
                questions: Vec::new(),
            },
            // INITIAL is never declared by the model.
            LlmDecision::Initial => ParsedDecision {
                decision: LlmDecision::Rewrite,
                answer: reply.trim().to_string(),
                questions: Vec::new(),
            },
        }
    }

    /// Scan a response for follow-up questions without a DECISION marker.
    ///
    /// Used after validation to catch replies that asked the user for
    /// clarification inline.
    pub fn detect_questions(&self, reply: &str) -> Vec<String> {
        if reply.is_empty() {
            return Vec::new();
        }
        let lines: Vec<&str> = reply.lines().collect();
        Self::extract_questions(&lines)
    }

    fn find_decision(lines: &[&str]) -> Option<LlmDecision> {
        for line in lines {
            let cleaned = Self::strip_markdown(line);
            if let Some(rest) = cleaned.strip_prefix(DECISION_PREFIX) {
                let decision_text = rest.trim().to_uppercase();
                if decision_text.contains("ASK_QUESTIONS") {
                    return Some(LlmDecision::AskQuestions);
                }
                if decision_text.contains("IMPOSSIBLE") {
                    return Some(LlmDecision::Impossible);
                }
                if decision_text.contains("REWRITE") {
                    return Some(LlmDecision::Rewrite);
                }
                return None;
            }
        }
        None
    }

    fn extract_answer(lines: &[&str]) -> String {
        let mut answer_lines: Vec<String> = Vec::new();
        let mut found_marker = false;

        for line in lines {
            let cleaned = Self::strip_markdown(line);

            if cleaned.starts_with(DECISION_PREFIX) {
                continue;
            }

            if let Some(rest) = cleaned.strip_prefix(ANSWER_PREFIX) {
                found_marker = true;
                let text = rest.trim();
                if !text.is_empty() {
                    answer_lines.push(text.to_string());
                }
                continue;
            }

            if found_marker {
                answer_lines.push(line.trim_end().to_string());
            } else if !line.trim().is_empty() {
                // No ANSWER marker yet: keep non-empty lines as fallback.
                answer_lines.push(line.trim_end().to_string());
            }
        }

        let answer = answer_lines.join("\n").trim().to_string();
        if answer.is_empty() {
            warn!("No answer text found in REWRITE decision");
        }
        answer
    }

    fn extract_questions(lines: &[&str]) -> Vec<String> {
        let mut questions = Vec::new();

        for line in lines {
            let cleaned = Self::strip_markdown(line);
            if let Some(rest) = cleaned.strip_prefix(QUESTION_PREFIX) {
                let text = rest.trim();
                if !text.is_empty() {
                    questions.push(text.to_string());
                    if questions.len() >= MAX_QUESTIONS {
                        warn!(
                            limit = MAX_QUESTIONS,
                            "Question limit reached, ignoring the rest"
                        );
                        break;
                    }
                }
            }
        }

        questions
    }

    fn extract_explanation(lines: &[&str]) -> String {
        let mut explanation_lines: Vec<String> = Vec::new();
        let mut found_decision = false;

        for line in lines {
            let cleaned = Self::strip_markdown(line);
            if cleaned.starts_with(DECISION_PREFIX) {
                found_decision = true;
                continue;
            }
            if found_decision && !line.trim().is_empty() {
                explanation_lines.push(line.trim_end().to_string());
            }
        }

        explanation_lines.join("\n").trim().to_string()
    }

    fn strip_markdown(line: &str) -> &str {
        line.trim().trim_start_matches('#').trim_start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rewrite_with_answer_marker() {
        let parser = ResponseParser::new();
        let parsed = parser.parse_decision(
            "DECISION: REWRITE\nANSWER: Refunds are available within 30 days.",
        );
        assert_eq!(parsed.decision, LlmDecision::Rewrite);
        assert_eq!(parsed.answer, "Refunds are available within 30 days.");
        assert!(parsed.questions.is_empty());
    }

    #[test]
    fn test_parse_rewrite_multiline_answer() {
        let parser = ResponseParser::new();
        let parsed =
            parser.parse_decision("DECISION: REWRITE\nANSWER: First line.\nSecond line.");
        assert_eq!(parsed.answer, "First line.\nSecond line.");
    }

    #[test]
    fn test_parse_ask_questions() {
        let parser = ResponseParser::new();
        let parsed = parser.parse_decision(
            "DECISION: ASK_QUESTIONS\nQUESTION: Which plan are you on?\nQUESTION: Is the item opened?",
        );
        assert_eq!(parsed.decision, LlmDecision::AskQuestions);
        assert_eq!(
            parsed.questions,
            vec!["Which plan are you on?", "Is the item opened?"]
        );
        assert!(parsed.answer.is_empty());
    }

    #[test]
    fn test_question_cap() {
        let parser = ResponseParser::new();
        let reply = (1..=8)
            .map(|i| format!("QUESTION: q{i}?"))
            .collect::<Vec<_>>()
            .join("\n");
        let parsed = parser.parse_decision(&format!("DECISION: ASK_QUESTIONS\n{reply}"));
        assert_eq!(parsed.questions.len(), MAX_QUESTIONS);
    }

    #[test]
    fn test_parse_impossible() {
        let parser = ResponseParser::new();
        let parsed = parser.parse_decision(
            "DECISION: IMPOSSIBLE\nThe policy rules contradict each other on this point.",
        );
        assert_eq!(parsed.decision, LlmDecision::Impossible);
        assert_eq!(
            parsed.answer,
            "The policy rules contradict each other on this point."
        );
    }

    #[test]
    fn test_markdown_headers_tolerated() {
        let parser = ResponseParser::new();
        let parsed = parser.parse_decision("### DECISION: ASK_QUESTIONS\nQUESTION: Which tier?");
        assert_eq!(parsed.decision, LlmDecision::AskQuestions);
        assert_eq!(parsed.questions, vec!["Which tier?"]);
    }

    #[test]
    fn test_missing_marker_defaults_to_rewrite() {
        let parser = ResponseParser::new();
        let parsed = parser.parse_decision("Just a plain answer with no markers.");
        assert_eq!(parsed.decision, LlmDecision::Rewrite);
        assert_eq!(parsed.answer, "Just a plain answer with no markers.");
    }

    #[test]
    fn test_empty_reply() {
        let parser = ResponseParser::new();
        let parsed = parser.parse_decision("   ");
        assert_eq!(parsed.decision, LlmDecision::Rewrite);
        assert!(parsed.answer.is_empty());
    }

    #[test]
    fn test_detect_questions() {
        let parser = ResponseParser::new();
        let questions =
            parser.detect_questions("I need more detail.\nQUESTION: What is your account type?");
        assert_eq!(questions, vec!["What is your account type?"]);

        assert!(parser.detect_questions("A plain answer.").is_empty());
        assert!(parser.detect_questions("").is_empty());
    }
}
