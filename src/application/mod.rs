//! Application layer: the thread processing state machine.

pub mod thread_processor;

pub use thread_processor::{
    process_thread, resume_thread_with_answers, ProcessorError, ThreadProcessor,
};
