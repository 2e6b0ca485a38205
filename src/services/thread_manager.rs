//! In-memory thread store with serialized access.
//!
//! The manager is the only shared mutable state in the system. It is
//! always injected as an `Arc<ThreadManager>`, never reached through a
//! process-wide singleton, so unit tests stay hermetic.

use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::error::ThreadError;
use crate::domain::models::{Thread, ThreadStatus, TypedIteration};

/// Keyed store of threads, serialized by a read/write lock.
///
/// Each thread is only ever mutated by the worker currently processing
/// it, so per-key contention is not expected; the lock exists to make
/// concurrent access to the map itself safe.
pub struct ThreadManager {
    threads: Arc<RwLock<HashMap<Uuid, Thread>>>,
}

impl ThreadManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            threads: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a new thread in `Processing` state and store it.
    ///
    /// `max_iterations` is copied into the thread here so later config
    /// changes never affect threads already in flight.
    pub async fn create_thread(
        &self,
        prompt: impl Into<String>,
        model_id: impl Into<String>,
        max_iterations: u32,
    ) -> Thread {
        let thread = Thread::new(prompt, model_id).with_max_iterations(max_iterations);
        let mut threads = self.threads.write().await;
        threads.insert(thread.thread_id, thread.clone());
        thread
    }

    /// Retrieve a snapshot of a thread by id.
    pub async fn get_thread(&self, thread_id: Uuid) -> Option<Thread> {
        let threads = self.threads.read().await;
        threads.get(&thread_id).cloned()
    }

    /// List snapshots of all threads.
    pub async fn list_threads(&self) -> Vec<Thread> {
        let threads = self.threads.read().await;
        threads.values().cloned().collect()
    }

    /// Append an iteration record to a thread.
    pub async fn append_iteration(
        &self,
        thread_id: Uuid,
        iteration: TypedIteration,
    ) -> Result<(), ThreadError> {
        let mut threads = self.threads.write().await;
        let thread = threads
            .get_mut(&thread_id)
            .ok_or(ThreadError::ThreadNotFound(thread_id))?;
        thread.iterations.push(iteration);
        Ok(())
    }

    /// Replace the stored thread with an updated copy.
    ///
    /// Used by the processor to publish counter/findings changes made on
    /// its working copy.
    pub async fn put_thread(&self, thread: Thread) {
        let mut threads = self.threads.write().await;
        threads.insert(thread.thread_id, thread);
    }

    /// Update the status and optional terminal fields of a thread.
    ///
    /// Stamps `completed_at` on terminal transitions and maintains
    /// `awaiting_input_since` across suspend/resume.
    pub async fn update_status(
        &self,
        thread_id: Uuid,
        status: ThreadStatus,
        final_response: Option<String>,
        warning_message: Option<String>,
    ) -> Result<(), ThreadError> {
        let mut threads = self.threads.write().await;
        let thread = threads
            .get_mut(&thread_id)
            .ok_or(ThreadError::ThreadNotFound(thread_id))?;

        thread.status = status;
        if let Some(response) = final_response {
            thread.final_response = Some(response);
        }
        if let Some(warning) = warning_message {
            thread.warning_message = Some(warning);
        }

        match status {
            ThreadStatus::Completed | ThreadStatus::Error => {
                thread.completed_at = Some(Utc::now());
                thread.awaiting_input_since = None;
            }
            ThreadStatus::AwaitingUserInput => {
                thread.awaiting_input_since = Some(Utc::now());
            }
            ThreadStatus::Processing => {
                thread.awaiting_input_since = None;
            }
        }

        Ok(())
    }

    /// Threads that have been awaiting user input longer than `timeout`.
    pub async fn stale_awaiting_threads(&self, timeout: Duration) -> Vec<Thread> {
        let threads = self.threads.read().await;
        let now = Utc::now();
        threads
            .values()
            .filter(|t| {
                t.status == ThreadStatus::AwaitingUserInput
                    && t.awaiting_input_since
                        .is_some_and(|since| now - since >= timeout)
            })
            .cloned()
            .collect()
    }
}

impl Default for ThreadManager {
    fn default() -> Self {
        Self::new()
    }
}
