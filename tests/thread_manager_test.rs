//! Integration tests for the in-memory thread store.

use std::collections::HashSet;
use std::sync::Arc;

use veritor::domain::models::ThreadStatus;
use veritor::services::ThreadManager;

#[tokio::test]
async fn concurrent_creates_produce_unique_ids() {
    let manager = Arc::new(ThreadManager::new());

    let mut handles = Vec::new();
    for i in 0..32 {
        let manager = Arc::clone(&manager);
        handles.push(tokio::spawn(async move {
            manager
                .create_thread(format!("prompt {i}"), "model", 5)
                .await
                .thread_id
        }));
    }

    let mut ids = HashSet::new();
    for result in futures::future::join_all(handles).await {
        ids.insert(result.unwrap());
    }

    assert_eq!(ids.len(), 32);
    assert_eq!(manager.list_threads().await.len(), 32);
}

#[tokio::test]
async fn concurrent_status_updates_land_on_their_own_threads() {
    let manager = Arc::new(ThreadManager::new());

    let mut ids = Vec::new();
    for i in 0..8 {
        let thread = manager.create_thread(format!("prompt {i}"), "model", 5).await;
        ids.push(thread.thread_id);
    }

    let mut handles = Vec::new();
    for (i, id) in ids.iter().copied().enumerate() {
        let manager = Arc::clone(&manager);
        handles.push(tokio::spawn(async move {
            manager
                .update_status(
                    id,
                    ThreadStatus::Completed,
                    Some(format!("response {i}")),
                    None,
                )
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    for (i, id) in ids.iter().copied().enumerate() {
        let thread = manager.get_thread(id).await.unwrap();
        assert_eq!(thread.status, ThreadStatus::Completed);
        assert_eq!(
            thread.final_response.as_deref(),
            Some(format!("response {i}").as_str())
        );
        assert_eq!(thread.user_prompt, format!("prompt {i}"));
    }
}

#[tokio::test]
async fn snapshots_do_not_alias_the_store() {
    let manager = ThreadManager::new();
    let thread = manager.create_thread("prompt", "model", 5).await;

    // Mutating a snapshot must not leak into the store.
    let mut snapshot = manager.get_thread(thread.thread_id).await.unwrap();
    snapshot.user_prompt = "mutated".to_string();

    let fresh = manager.get_thread(thread.thread_id).await.unwrap();
    assert_eq!(fresh.user_prompt, "prompt");
}
