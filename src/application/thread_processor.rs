//! Thread processing state machine.
//!
//! Orchestrates the validate-and-rewrite loop for one thread: generate an
//! answer, validate it against the guardrail, classify the findings, then
//! accept, rewrite, ask the user for clarification, or abort. Each thread
//! is processed by its own task; a failure here marks that thread `Error`
//! and never touches any other thread's state.

use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::error::ThreadError;
use crate::domain::models::{
    Finding, IterationData, IterationType, LlmDecision, QuestionAnswerExchange, RewriteKind,
    Thread, ThreadStatus, TypedIteration, ValidationOutput, ValidationResult,
};
use crate::domain::ports::{AuditSink, LlmClient, LlmError, ResponseValidator, ValidationError};
use crate::services::prompt_templates::{self, PromptTemplates};
use crate::services::{ResponseParser, ThreadManager};

/// User-facing message for content the checker cannot analyze.
const TOO_COMPLEX_MESSAGE: &str = "Your request is too complex for the automated reasoning \
     system to handle. Please try simplifying your question or breaking it into smaller parts.";

/// Warning attached when VALID co-occurs with NO_TRANSLATIONS.
const PARTIAL_VALIDATION_WARNING: &str = "Note: This response could not be fully validated by \
     the automated reasoning system. Some aspects of your question may not be covered by the \
     validation policy.";

/// Warning attached when actionable findings remain but none can be
/// processed further.
const UNPROCESSED_FINDINGS_WARNING: &str = "Warning: This response may be unsafe. The system \
     processed all validation findings but could not achieve a fully validated response.";

/// Warning attached when resumption exhausts the budget.
const RESUME_BUDGET_WARNING: &str = "Warning: This response may be unsafe. The system was \
     unable to fully validate the response after multiple attempts. Please review the response \
     carefully.";

/// Errors raised while driving a thread through the state machine.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Validation call failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Thread operation failed: {0}")]
    Thread(#[from] ThreadError),
}

/// States of the thread processing state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessingState {
    Init,
    GenerateInitial,
    Validate,
    CheckQuestions,
    HandleResult,
    RewritingLoop,
    AwaitingInput,
    Completed,
    Error,
}

impl ProcessingState {
    const fn is_stopped(self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::AwaitingInput)
    }
}

/// Drives one thread through generation, validation, and rewriting.
///
/// The processor owns a working copy of the thread and publishes it back
/// through the [`ThreadManager`] at every observable step, so concurrent
/// readers always see a consistent snapshot.
pub struct ThreadProcessor {
    thread: Thread,
    thread_manager: Arc<ThreadManager>,
    llm: Arc<dyn LlmClient>,
    validator: Arc<dyn ResponseValidator>,
    audit: Arc<dyn AuditSink>,

    parser: ResponseParser,
    templates: PromptTemplates,

    state: ProcessingState,
    current_response: String,
    current_validation: ValidationResult,
    initial_prompt: String,
    iteration_summaries: Vec<String>,
}

impl ThreadProcessor {
    /// Create a processor for the given thread.
    pub fn new(
        thread: Thread,
        thread_manager: Arc<ThreadManager>,
        llm: Arc<dyn LlmClient>,
        validator: Arc<dyn ResponseValidator>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            thread,
            thread_manager,
            llm,
            validator,
            audit,
            parser: ResponseParser::new(),
            templates: PromptTemplates::new(),
            state: ProcessingState::Init,
            current_response: String::new(),
            current_validation: ValidationResult::valid(),
            initial_prompt: String::new(),
            iteration_summaries: Vec::new(),
        }
    }

    fn thread_id(&self) -> Uuid {
        self.thread.thread_id
    }

    /// Execute the state machine until completion or suspension.
    ///
    /// Collaborator failures are caught here: the thread is marked
    /// `Error` with a descriptive final response and processing stops.
    pub async fn process(&mut self) {
        while !self.state.is_stopped() {
            let step = match self.state {
                ProcessingState::Init => self.handle_init(),
                ProcessingState::GenerateInitial => self.handle_generate_initial().await,
                ProcessingState::Validate => self.handle_validate().await,
                ProcessingState::CheckQuestions => self.handle_check_questions().await,
                ProcessingState::HandleResult => self.handle_result().await,
                ProcessingState::RewritingLoop => self.handle_rewriting_loop().await,
                // Stopped states never reach here.
                ProcessingState::AwaitingInput
                | ProcessingState::Completed
                | ProcessingState::Error => break,
            };

            match step {
                Ok(next) => self.state = next,
                Err(e) => {
                    error!(thread_id = %self.thread_id(), error = %e, "thread processing failed");
                    self.complete_with_error(&e.to_string()).await;
                    self.state = ProcessingState::Error;
                }
            }
        }
    }

    // === State handlers ===

    fn handle_init(&mut self) -> Result<ProcessingState, ProcessorError> {
        self.thread
            .validate()
            .map_err(ThreadError::InvalidThread)?;
        info!(
            thread_id = %self.thread_id(),
            model_id = %self.thread.model_id,
            max_iterations = self.thread.max_iterations,
            "processing thread"
        );
        Ok(ProcessingState::GenerateInitial)
    }

    async fn handle_generate_initial(&mut self) -> Result<ProcessingState, ProcessorError> {
        let wrapped = self.templates.initial_response(&self.thread.user_prompt);
        self.current_response = self.llm.generate_response(&wrapped).await?;
        self.initial_prompt = wrapped;
        info!(thread_id = %self.thread_id(), "received initial response");
        Ok(ProcessingState::Validate)
    }

    async fn handle_validate(&mut self) -> Result<ProcessingState, ProcessorError> {
        let validation = self
            .validator
            .validate(&self.thread.user_prompt, &self.current_response)
            .await?;
        info!(
            thread_id = %self.thread_id(),
            output = validation.output.as_str(),
            findings = validation.findings.len(),
            "validation result"
        );

        // First pass: record iteration 0 and claim its budget unit.
        if self.thread.iteration_counter == 0 {
            self.thread.iteration_counter = 1;
            self.thread.iterations.push(TypedIteration::new(
                0,
                "",
                self.current_response.clone(),
                self.initial_prompt.clone(),
                IterationData::ArFeedback {
                    findings: validation.findings.clone(),
                    validation_output: validation.output,
                    processed_finding_index: None,
                    llm_decision: LlmDecision::Initial,
                    rewrite_kind: RewriteKind::Initial,
                },
            ));
        }

        self.thread.current_findings = validation.findings.clone();
        self.current_validation = validation;
        self.publish().await;
        Ok(ProcessingState::CheckQuestions)
    }

    async fn handle_check_questions(&mut self) -> Result<ProcessingState, ProcessorError> {
        // Only ambiguous or underdetermined outcomes warrant asking the
        // user instead of rewriting.
        let check = matches!(
            self.current_validation.output,
            ValidationOutput::TranslationAmbiguous | ValidationOutput::Satisfiable
        );
        if !check {
            return Ok(ProcessingState::HandleResult);
        }

        let questions = self.parser.detect_questions(&self.current_response);
        if questions.is_empty() {
            return Ok(ProcessingState::HandleResult);
        }

        info!(
            thread_id = %self.thread_id(),
            count = questions.len(),
            "detected follow-up questions"
        );
        self.pause_for_questions(questions, None, None, None).await?;
        Ok(ProcessingState::AwaitingInput)
    }

    async fn handle_result(&mut self) -> Result<ProcessingState, ProcessorError> {
        if self.current_validation.is_valid_with_no_translations() {
            // Accepted, but some claims had no logical translation.
            let findings = self.current_validation.findings.clone();
            self.complete_with_response(&self.current_response.clone(), Some(PARTIAL_VALIDATION_WARNING))
                .await?;
            self.audit.log_valid_response(&self.thread, &findings).await;
            return Ok(ProcessingState::Completed);
        }

        if self.current_validation.is_sole_no_translations() {
            // Nothing could be checked at all; returned as-is, unwarned.
            self.complete_with_response(&self.current_response.clone(), None)
                .await?;
            return Ok(ProcessingState::Completed);
        }

        match self.current_validation.output {
            ValidationOutput::Valid => {
                info!(thread_id = %self.thread_id(), "response is valid");
                let findings = self.current_validation.findings.clone();
                self.complete_with_response(&self.current_response.clone(), None)
                    .await?;
                self.audit.log_valid_response(&self.thread, &findings).await;
                Ok(ProcessingState::Completed)
            }
            ValidationOutput::TooComplex => {
                info!(thread_id = %self.thread_id(), "content too complex to validate");
                self.publish().await;
                self.thread_manager
                    .update_status(
                        self.thread_id(),
                        ThreadStatus::Error,
                        Some(TOO_COMPLEX_MESSAGE.to_string()),
                        None,
                    )
                    .await?;
                self.refresh().await;
                Ok(ProcessingState::Error)
            }
            ValidationOutput::NoTranslations => {
                // Several NO_TRANSLATIONS findings and nothing else.
                self.complete_with_response(&self.current_response.clone(), None)
                    .await?;
                Ok(ProcessingState::Completed)
            }
            output => {
                info!(
                    thread_id = %self.thread_id(),
                    output = output.as_str(),
                    "response requires rewriting"
                );
                Ok(ProcessingState::RewritingLoop)
            }
        }
    }

    async fn handle_rewriting_loop(&mut self) -> Result<ProcessingState, ProcessorError> {
        if self.thread.budget_exhausted() {
            self.complete_max_iterations().await?;
            return Ok(ProcessingState::Completed);
        }

        let mut actionable: Vec<Finding> = self
            .thread
            .current_findings
            .iter()
            .filter(|f| f.validation_output != ValidationOutput::NoTranslations)
            .cloned()
            .collect();

        if actionable.is_empty() {
            self.complete_no_actionable_findings().await?;
            return Ok(ProcessingState::Completed);
        }

        actionable.sort_by_key(|f| f.validation_output.priority());
        let selected = actionable[0].clone();

        self.thread.iteration_counter += 1;
        let current_iteration = self.thread.iteration_counter;
        info!(
            thread_id = %self.thread_id(),
            iteration = current_iteration,
            max_iterations = self.thread.max_iterations,
            finding = selected.validation_output.as_str(),
            "rewrite iteration"
        );

        let rewriting_prompt = self
            .llm
            .generate_rewriting_prompt(
                std::slice::from_ref(&selected),
                &self.thread.user_prompt,
                &self.current_response,
                &self.thread.all_clarifications,
            )
            .await?;
        let reply = self.llm.generate_response(&rewriting_prompt).await?;
        let parsed = self.parser.parse_decision(&reply);
        info!(
            thread_id = %self.thread_id(),
            decision = parsed.decision.as_str(),
            "LLM decision"
        );

        match parsed.decision {
            LlmDecision::Impossible => {
                self.handle_impossible_decision(&parsed.answer, &rewriting_prompt, current_iteration)
                    .await?;
                Ok(ProcessingState::Completed)
            }
            LlmDecision::AskQuestions if !parsed.questions.is_empty() => {
                self.pause_for_questions(
                    parsed.questions,
                    Some(rewriting_prompt),
                    Some(0),
                    Some(current_iteration),
                )
                .await?;
                Ok(ProcessingState::AwaitingInput)
            }
            decision => {
                // REWRITE carries the extracted answer; ASK_QUESTIONS
                // without questions falls back to the raw reply.
                let new_response = if decision == LlmDecision::Rewrite {
                    parsed.answer
                } else {
                    reply
                };
                self.handle_rewrite_decision(new_response, rewriting_prompt, current_iteration)
                    .await
            }
        }
    }

    // === Result handlers ===

    async fn handle_impossible_decision(
        &mut self,
        explanation: &str,
        rewriting_prompt: &str,
        iteration_number: u32,
    ) -> Result<(), ProcessorError> {
        info!(
            thread_id = %self.thread_id(),
            "model declared the question unanswerable"
        );
        self.thread.iterations.push(TypedIteration::new(
            iteration_number,
            self.current_response.clone(),
            explanation,
            rewriting_prompt,
            IterationData::ArFeedback {
                findings: self.thread.current_findings.clone(),
                validation_output: ValidationOutput::Impossible,
                processed_finding_index: Some(0),
                llm_decision: LlmDecision::Impossible,
                rewrite_kind: RewriteKind::Impossible,
            },
        ));
        self.complete_with_response(explanation, None).await
    }

    async fn handle_rewrite_decision(
        &mut self,
        new_response: String,
        rewriting_prompt: String,
        iteration_number: u32,
    ) -> Result<ProcessingState, ProcessorError> {
        let new_validation = self
            .validator
            .validate(&self.thread.user_prompt, &new_response)
            .await?;

        self.thread.iterations.push(TypedIteration::new(
            iteration_number,
            self.current_response.clone(),
            new_response.clone(),
            rewriting_prompt,
            IterationData::ArFeedback {
                findings: new_validation.findings.clone(),
                validation_output: new_validation.output,
                processed_finding_index: Some(0),
                llm_decision: LlmDecision::Rewrite,
                rewrite_kind: RewriteKind::Rewriting,
            },
        ));
        self.iteration_summaries.push(format!(
            "Iteration {}: {} (REWRITE) - {} finding(s)",
            iteration_number,
            new_validation.output.as_str(),
            new_validation.findings.len()
        ));

        info!(
            thread_id = %self.thread_id(),
            iteration = iteration_number,
            output = new_validation.output.as_str(),
            "rewrite validated"
        );

        if new_validation.output == ValidationOutput::Valid {
            let findings = new_validation.findings.clone();
            self.complete_with_response(&new_response, None).await?;
            self.audit.log_valid_response(&self.thread, &findings).await;
            return Ok(ProcessingState::Completed);
        }

        self.current_response = new_response;
        self.thread.current_findings = new_validation.findings.clone();
        self.current_validation = new_validation;
        self.publish().await;
        Ok(ProcessingState::RewritingLoop)
    }

    // === Completion helpers ===

    async fn complete_with_response(
        &mut self,
        response: &str,
        warning: Option<&str>,
    ) -> Result<(), ProcessorError> {
        self.publish().await;
        self.thread_manager
            .update_status(
                self.thread_id(),
                ThreadStatus::Completed,
                Some(response.to_string()),
                warning.map(ToString::to_string),
            )
            .await?;
        self.refresh().await;
        Ok(())
    }

    async fn complete_with_error(&mut self, message: &str) {
        self.publish().await;
        let result = self
            .thread_manager
            .update_status(
                self.thread_id(),
                ThreadStatus::Error,
                Some(format!(
                    "An error occurred while processing your request: {message}"
                )),
                None,
            )
            .await;
        if let Err(e) = result {
            error!(thread_id = %self.thread_id(), error = %e, "failed to record thread error");
        }
        self.refresh().await;
    }

    async fn complete_max_iterations(&mut self) -> Result<(), ProcessorError> {
        warn!(
            thread_id = %self.thread_id(),
            max_iterations = self.thread.max_iterations,
            "reached max iterations without a valid response"
        );
        let warning = format!(
            "Warning: This response may be unsafe. The system reached the maximum iteration \
             limit ({}) while attempting to validate the response. Please review the response \
             carefully.",
            self.thread.max_iterations
        );
        self.complete_with_response(&self.current_response.clone(), Some(&warning))
            .await?;

        if let Some(last_finding) = self.current_validation.findings.last() {
            self.audit
                .log_max_iterations(&self.thread, &self.iteration_summaries, last_finding)
                .await;
        }
        Ok(())
    }

    async fn complete_no_actionable_findings(&mut self) -> Result<(), ProcessorError> {
        info!(thread_id = %self.thread_id(), "no actionable findings remain");
        let warning = if self.current_validation.output == ValidationOutput::Valid {
            None
        } else {
            Some(UNPROCESSED_FINDINGS_WARNING)
        };
        self.complete_with_response(&self.current_response.clone(), warning)
            .await
    }

    // === Question handling ===

    async fn pause_for_questions(
        &mut self,
        questions: Vec<String>,
        rewriting_prompt: Option<String>,
        finding_index: Option<usize>,
        iteration_number: Option<u32>,
    ) -> Result<(), ProcessorError> {
        info!(
            thread_id = %self.thread_id(),
            count = questions.len(),
            "pausing for user clarification"
        );

        self.thread.iterations.push(TypedIteration::new(
            iteration_number.unwrap_or(self.thread.iteration_counter),
            self.current_response.clone(),
            "",
            rewriting_prompt.unwrap_or_default(),
            IterationData::Clarification {
                qa_exchange: QuestionAnswerExchange::pending(questions),
                context_augmentation: None,
                processed_finding_index: finding_index,
                llm_decision: Some(LlmDecision::AskQuestions),
                validation_output: None,
                validation_findings: Vec::new(),
            },
        ));
        self.publish().await;
        self.thread_manager
            .update_status(self.thread_id(), ThreadStatus::AwaitingUserInput, None, None)
            .await?;
        self.refresh().await;
        Ok(())
    }

    // === Store synchronization ===

    /// Publish the working copy so concurrent readers see current state.
    async fn publish(&self) {
        self.thread_manager.put_thread(self.thread.clone()).await;
    }

    /// Reload the working copy after a manager-side status change.
    async fn refresh(&mut self) {
        if let Some(thread) = self.thread_manager.get_thread(self.thread_id()).await {
            self.thread = thread;
        }
    }
}

/// Process a thread through validation and rewriting iterations.
///
/// This is the main entry point for thread processing. A missing thread
/// id is logged and ignored; every other failure is recorded on the
/// thread itself.
pub async fn process_thread(
    thread_id: Uuid,
    thread_manager: Arc<ThreadManager>,
    llm: Arc<dyn LlmClient>,
    validator: Arc<dyn ResponseValidator>,
    audit: Arc<dyn AuditSink>,
) {
    let Some(thread) = thread_manager.get_thread(thread_id).await else {
        error!(%thread_id, "thread not found");
        return;
    };

    let mut processor = ThreadProcessor::new(thread, thread_manager, llm, validator, audit);
    processor.process().await;
}

/// Resume validation after the user answered (or skipped) follow-up
/// questions.
///
/// The pending clarification iteration is completed in place, the answer
/// regenerated with the new context, re-validated, and the thread either
/// finishes or re-enters the rewriting loop. The initial generation is
/// never re-run.
#[allow(clippy::too_many_lines)]
pub async fn resume_thread_with_answers(
    thread_id: Uuid,
    answers: Vec<String>,
    skipped: bool,
    thread_manager: Arc<ThreadManager>,
    llm: Arc<dyn LlmClient>,
    validator: Arc<dyn ResponseValidator>,
    audit: Arc<dyn AuditSink>,
) -> Result<(), ThreadError> {
    let mut thread = thread_manager
        .get_thread(thread_id)
        .await
        .ok_or(ThreadError::ThreadNotFound(thread_id))?;

    if thread.status != ThreadStatus::AwaitingUserInput {
        return Err(ThreadError::NotAwaitingInput {
            thread_id,
            status: thread.status,
        });
    }
    if thread.iterations.is_empty() {
        return Err(ThreadError::NoIterations(thread_id));
    }

    let last_index = thread.iterations.len() - 1;
    if thread.iterations[last_index].iteration_type != IterationType::UserClarification {
        return Err(ThreadError::NotAClarification(thread_id));
    }

    let questions = match &thread.iterations[last_index].data {
        IterationData::Clarification { qa_exchange, .. } => qa_exchange.questions.clone(),
        IterationData::ArFeedback { .. } => return Err(ThreadError::NotAClarification(thread_id)),
    };

    if !skipped && answers.len() != questions.len() {
        return Err(ThreadError::AnswerCountMismatch {
            answers: answers.len(),
            questions: questions.len(),
        });
    }

    // Record the exchange outcome on the pending iteration.
    let exchange = QuestionAnswerExchange {
        questions: questions.clone(),
        answers: if skipped { None } else { Some(answers.clone()) },
        skipped,
    };
    if let IterationData::Clarification { qa_exchange, .. } =
        &mut thread.iterations[last_index].data
    {
        *qa_exchange = exchange.clone();
    }
    if !skipped {
        thread.all_clarifications.push(exchange);
    }

    thread.status = ThreadStatus::Processing;
    thread.awaiting_input_since = None;
    thread_manager.put_thread(thread.clone()).await;
    info!(thread_id = %thread_id, skipped, "resuming validation");

    let templates = PromptTemplates::new();
    let original_response = thread.iterations[last_index].original_answer.clone();

    let context_augmentation = if skipped {
        None
    } else {
        Some(prompt_templates::create_context_augmentation(
            &questions, &answers,
        ))
    };

    let regeneration_prompt = context_augmentation.as_ref().map_or_else(
        || templates.clarification_skipped(&thread.user_prompt, &original_response),
        |context| {
            templates.clarification_regeneration(&thread.user_prompt, &original_response, context)
        },
    );

    // Collaborator failures from here on are recorded on the thread, not
    // surfaced to the caller; the input was accepted.
    let regenerated = match llm.generate_response(&regeneration_prompt).await {
        Ok(response) => response,
        Err(e) => {
            error!(thread_id = %thread_id, error = %e, "regeneration failed");
            fail_thread(&thread_manager, thread_id, &e.to_string()).await;
            return Ok(());
        }
    };

    let new_validation = match validator.validate(&thread.user_prompt, &regenerated).await {
        Ok(validation) => validation,
        Err(e) => {
            error!(thread_id = %thread_id, error = %e, "post-clarification validation failed");
            fail_thread(&thread_manager, thread_id, &e.to_string()).await;
            return Ok(());
        }
    };

    info!(
        thread_id = %thread_id,
        output = new_validation.output.as_str(),
        "post-clarification validation"
    );

    // Complete the clarification iteration with the regeneration outcome.
    {
        let iteration = &mut thread.iterations[last_index];
        iteration.rewritten_answer = regenerated.clone();
        iteration.rewriting_prompt = regeneration_prompt;
        if let IterationData::Clarification {
            context_augmentation: slot,
            validation_output,
            validation_findings,
            ..
        } = &mut iteration.data
        {
            *slot = context_augmentation;
            *validation_output = Some(new_validation.output);
            *validation_findings = new_validation.findings.clone();
        }
    }
    thread.current_findings = new_validation.findings.clone();
    thread_manager.put_thread(thread.clone()).await;

    if new_validation.output == ValidationOutput::Valid {
        thread_manager
            .update_status(
                thread_id,
                ThreadStatus::Completed,
                Some(regenerated),
                None,
            )
            .await?;
        if let Some(updated) = thread_manager.get_thread(thread_id).await {
            audit
                .log_valid_response(&updated, &new_validation.findings)
                .await;
        }
        return Ok(());
    }

    if thread.budget_exhausted() {
        thread_manager
            .update_status(
                thread_id,
                ThreadStatus::Completed,
                Some(regenerated),
                Some(RESUME_BUDGET_WARNING.to_string()),
            )
            .await?;
        return Ok(());
    }

    let has_actionable = new_validation
        .findings
        .iter()
        .any(|f| f.validation_output != ValidationOutput::NoTranslations);
    if !has_actionable {
        thread_manager
            .update_status(thread_id, ThreadStatus::Completed, Some(regenerated), None)
            .await?;
        return Ok(());
    }

    // Continue with the rewriting loop, skipping the initial generation.
    let mut processor = ThreadProcessor::new(thread, thread_manager, llm, validator, audit);
    processor.current_response = regenerated;
    processor.current_validation = new_validation;
    processor.state = ProcessingState::RewritingLoop;
    processor.process().await;
    Ok(())
}

async fn fail_thread(thread_manager: &Arc<ThreadManager>, thread_id: Uuid, message: &str) {
    let result = thread_manager
        .update_status(
            thread_id,
            ThreadStatus::Error,
            Some(format!(
                "An error occurred while processing your request: {message}"
            )),
            None,
        )
        .await;
    if let Err(e) = result {
        error!(%thread_id, error = %e, "failed to record thread error");
    }
}
