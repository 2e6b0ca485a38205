use thiserror::Error;
use uuid::Uuid;

use super::models::thread::ThreadStatus;

/// Domain-level errors for thread operations
#[derive(Error, Debug)]
pub enum ThreadError {
    #[error("Thread not found: {0}")]
    ThreadNotFound(Uuid),

    #[error("Thread {thread_id} is not awaiting user input (status: {status:?})")]
    NotAwaitingInput {
        thread_id: Uuid,
        status: ThreadStatus,
    },

    #[error("Thread {0} has no iterations")]
    NoIterations(Uuid),

    #[error("Thread {0} last iteration is not a clarification iteration")]
    NotAClarification(Uuid),

    #[error("Answer count ({answers}) does not match question count ({questions})")]
    AnswerCountMismatch { answers: usize, questions: usize },

    #[error("Thread is in terminal state: {0:?}")]
    ThreadInTerminalState(ThreadStatus),

    #[error("Invalid thread: {0}")]
    InvalidThread(String),
}

/// Domain-level errors
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Thread error: {0}")]
    Thread(#[from] ThreadError),
}
