//! Prompt construction for the rewrite loop.
//!
//! Templates are embedded constants with `{placeholder}` substitution.
//! Each non-valid validation outcome selects its own rewriting template so
//! the correction instructions match the evidence kind; all rewriting
//! templates instruct the model to reply in the DECISION/ANSWER/QUESTION
//! marker format understood by [`crate::services::ResponseParser`].

use crate::domain::models::{Finding, QuestionAnswerExchange, ValidationOutput};

const INITIAL_RESPONSE: &str = "\
You are a careful assistant answering questions strictly within a documented policy.
Answer the question below concisely and factually. State only what the policy supports.

Question: {user_prompt}";

const REWRITE_INVALID: &str = "\
Your previous answer contradicts the policy rules.

Original question: {original_prompt}

Your previous answer: {original_response}

Validation findings:
{findings}
{context_augmentation}
Rewrite your answer so it no longer contradicts the cited rules. Reply in exactly one of these formats:

DECISION: REWRITE
ANSWER: <your corrected answer>

DECISION: IMPOSSIBLE
<explanation of why the question cannot be answered under the policy>";

const REWRITE_SATISFIABLE: &str = "\
Your previous answer makes claims the policy can neither confirm nor deny; they hold in some scenarios and fail in others.

Original question: {original_prompt}

Your previous answer: {original_response}

Validation findings:
{findings}
{context_augmentation}
Either make your answer unconditionally true under the policy, or ask the user for the missing facts. Reply in exactly one of these formats:

DECISION: REWRITE
ANSWER: <your corrected answer>

DECISION: ASK_QUESTIONS
QUESTION: <a question that pins down a missing fact>";

const REWRITE_IMPOSSIBLE: &str = "\
The premises of your previous answer are mutually contradictory under the policy.

Original question: {original_prompt}

Your previous answer: {original_response}

Validation findings:
{findings}
{context_augmentation}
Remove the contradiction, or state that the question has no answer under the policy. Reply in exactly one of these formats:

DECISION: REWRITE
ANSWER: <your corrected answer>

DECISION: IMPOSSIBLE
<explanation of the contradiction>";

const REWRITE_TRANSLATION_AMBIGUOUS: &str = "\
Your previous answer is ambiguous: it admits more than one logical reading and they disagree.

Original question: {original_prompt}

Your previous answer: {original_response}

Validation findings:
{findings}
{context_augmentation}
Restate your answer so only one reading remains, or ask the user which reading they intend. Reply in exactly one of these formats:

DECISION: REWRITE
ANSWER: <your corrected answer>

DECISION: ASK_QUESTIONS
QUESTION: <a question resolving the ambiguity>";

const REWRITE_FALLBACK: &str = "\
Your previous answer did not pass policy validation.

Original question: {original_prompt}

Your previous answer: {original_response}

Validation findings:
{findings}
{context_augmentation}
Rewrite your answer to satisfy the policy. Reply in this format:

DECISION: REWRITE
ANSWER: <your corrected answer>";

const CLARIFICATION_REGENERATION: &str = "\
The user has answered your follow-up questions.

Original question: {user_prompt}

Your previous answer: {original_response}

{context_augmentation}
Using these answers, give a complete, policy-compliant answer to the original question. Respond with the answer only.";

const CLARIFICATION_SKIPPED: &str = "\
The user declined to answer your follow-up questions.

Original question: {user_prompt}

Your previous answer: {original_response}

Give the best policy-compliant answer you can without the missing information, stating any assumption you must make. Respond with the answer only.";

/// Builds the prompts used by the rewrite loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptTemplates;

impl PromptTemplates {
    pub const fn new() -> Self {
        Self
    }

    /// Wrap the user's question for the initial generation.
    pub fn initial_response(&self, user_prompt: &str) -> String {
        render(INITIAL_RESPONSE, &[("user_prompt", user_prompt)])
    }

    /// Build a rewriting prompt for the given findings.
    ///
    /// The template is selected from the highest-priority finding;
    /// `clarifications` (if any) are folded in as context.
    pub fn rewriting_prompt(
        &self,
        findings: &[Finding],
        original_prompt: &str,
        original_response: &str,
        clarifications: &[QuestionAnswerExchange],
    ) -> String {
        let template = findings
            .first()
            .map_or(REWRITE_FALLBACK, |f| match f.validation_output {
                ValidationOutput::Invalid => REWRITE_INVALID,
                ValidationOutput::Satisfiable => REWRITE_SATISFIABLE,
                ValidationOutput::Impossible => REWRITE_IMPOSSIBLE,
                ValidationOutput::TranslationAmbiguous => REWRITE_TRANSLATION_AMBIGUOUS,
                _ => REWRITE_FALLBACK,
            });

        let findings_text = format_findings(findings);
        let context = all_clarifications_context(clarifications);

        render(
            template,
            &[
                ("original_prompt", original_prompt),
                ("original_response", original_response),
                ("findings", &findings_text),
                ("context_augmentation", &context),
            ],
        )
    }

    /// Build the regeneration prompt after the user answered questions.
    pub fn clarification_regeneration(
        &self,
        user_prompt: &str,
        original_response: &str,
        context_augmentation: &str,
    ) -> String {
        render(
            CLARIFICATION_REGENERATION,
            &[
                ("user_prompt", user_prompt),
                ("original_response", original_response),
                ("context_augmentation", context_augmentation),
            ],
        )
    }

    /// Build the regeneration prompt after the user skipped the questions.
    pub fn clarification_skipped(&self, user_prompt: &str, original_response: &str) -> String {
        render(
            CLARIFICATION_SKIPPED,
            &[
                ("user_prompt", user_prompt),
                ("original_response", original_response),
            ],
        )
    }
}

/// Render a template by substituting `{name}` placeholders.
fn render(template: &str, substitutions: &[(&str, &str)]) -> String {
    let mut rendered = template.to_string();
    for (name, value) in substitutions {
        rendered = rendered.replace(&format!("{{{name}}}"), value);
    }
    rendered
}

/// Format findings as a bulleted evidence list for a rewriting prompt.
pub fn format_findings(findings: &[Finding]) -> String {
    let mut lines = Vec::new();

    for finding in findings {
        lines.push(format!("- {}", finding.validation_output.as_str()));

        for rule in &finding.details.contradicting_rules {
            lines.push(format!("  contradicts rule {}", rule.identifier));
        }
        for claim in &finding.details.claims {
            if !claim.natural_language.is_empty() {
                lines.push(format!("  claim: {}", claim.natural_language));
            }
        }
        if let Some(scenario) = &finding.details.claims_false_scenario {
            for statement in &scenario.statements {
                if !statement.natural_language.is_empty() {
                    lines.push(format!("  fails when: {}", statement.natural_language));
                }
            }
        }
        for text in &finding.details.untranslated_claims {
            lines.push(format!("  untranslatable claim: {text}"));
        }
    }

    lines.join("\n")
}

/// Turn one answered exchange into context text for regeneration.
pub fn create_context_augmentation(questions: &[String], answers: &[String]) -> String {
    let mut lines = vec!["Additional information from the user:".to_string()];
    for (question, answer) in questions.iter().zip(answers.iter()) {
        lines.push(format!("Q: {question}"));
        lines.push(format!("A: {answer}"));
    }
    lines.join("\n")
}

/// Fold every answered exchange into context text for a rewriting prompt.
///
/// Skipped or unanswered exchanges contribute nothing. Returns an empty
/// string when there is no context, so templates can splice it in
/// unconditionally.
pub fn all_clarifications_context(clarifications: &[QuestionAnswerExchange]) -> String {
    let mut sections = Vec::new();
    for exchange in clarifications {
        if exchange.skipped {
            continue;
        }
        if let Some(answers) = &exchange.answers {
            sections.push(create_context_augmentation(&exchange.questions, answers));
        }
    }
    if sections.is_empty() {
        String::new()
    } else {
        format!("\n{}\n", sections.join("\n"))
    }
}
