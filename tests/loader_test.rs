//! Integration tests for the data loader state machine.
//!
//! These tests verify:
//! - A fetch runs once per context token; repeat calls are no-ops
//! - Changing the token triggers a refetch and supersedes in-flight work
//! - Pagination failures keep the current items visible
//! - Cancellation reconciles transient statuses instead of erroring
//! - Smoothed refreshes hold the old value for the minimum duration

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use lantern::error::{CoreError, NetworkError};
use lantern::loader::{DataLoader, LoadStatus};
use lantern::models::{AuthEpoch, ChannelId};

/// Waits until the loader's status satisfies the predicate.
async fn wait_for<T, F>(loader: &DataLoader<T>, predicate: F)
where
    T: Clone + Send + Sync + 'static,
    F: Fn(&LoadStatus<T>) -> bool,
{
    let mut statuses = loader.subscribe();
    loop {
        if predicate(&statuses.borrow()) {
            return;
        }
        statuses
            .changed()
            .await
            .expect("loader dropped while waiting for status");
    }
}

/// Builds a fetch closure that counts invocations and returns `value`.
fn counted_fetch(
    counter: &Arc<AtomicUsize>,
    value: i32,
) -> impl Fn() -> std::future::Ready<Result<i32, CoreError>> + Clone + Send + Sync + 'static {
    let counter = Arc::clone(counter);
    move || {
        counter.fetch_add(1, Ordering::SeqCst);
        std::future::ready(Ok(value))
    }
}

// ===== Test 1: same token fetches once =====

#[tokio::test]
async fn test_unchanged_token_fetches_once() {
    let loader: DataLoader<i32> = DataLoader::new();
    let fetches = Arc::new(AtomicUsize::new(0));

    loader.load_if_needed(counted_fetch(&fetches, 42), AuthEpoch::Anonymous);
    wait_for(&loader, |status| status.is_finished()).await;

    // Same token again: the stored fetch is refreshed but not re-run.
    loader.load_if_needed(counted_fetch(&fetches, 42), AuthEpoch::Anonymous);
    tokio::task::yield_now().await;

    assert_eq!(loader.status(), LoadStatus::Finished(42));
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
}

// ===== Test 2: token change triggers a refetch =====

#[tokio::test]
async fn test_token_change_refetches() {
    let loader: DataLoader<i32> = DataLoader::new();
    let fetches = Arc::new(AtomicUsize::new(0));

    loader.load_if_needed(counted_fetch(&fetches, 1), AuthEpoch::Anonymous);
    wait_for(&loader, |status| status == &LoadStatus::Finished(1)).await;

    let user = AuthEpoch::User {
        user_id: ChannelId::new("141981764"),
    };
    loader.load_if_needed(counted_fetch(&fetches, 2), user);
    wait_for(&loader, |status| status == &LoadStatus::Finished(2)).await;

    assert_eq!(fetches.load(Ordering::SeqCst), 2);
}

// ===== Test 3: superseded fetch never surfaces =====

#[tokio::test]
async fn test_superseded_fetch_is_discarded() {
    let loader: DataLoader<i32> = DataLoader::new();
    let gate = Arc::new(Notify::new());

    // The first fetch parks on the gate and stays in flight.
    let parked = {
        let gate = Arc::clone(&gate);
        move || {
            let gate = Arc::clone(&gate);
            async move {
                gate.notified().await;
                Ok::<_, CoreError>(1)
            }
        }
    };
    loader.load_if_needed(parked, AuthEpoch::Anonymous);
    assert!(loader.status().is_loading());

    // A new token supersedes it before it resolves.
    let user = AuthEpoch::User {
        user_id: ChannelId::new("141981764"),
    };
    loader.load_if_needed(|| std::future::ready(Ok::<_, CoreError>(2)), user);
    wait_for(&loader, |status| status == &LoadStatus::Finished(2)).await;

    // Releasing the stale fetch must not overwrite the newer result.
    gate.notify_waiters();
    tokio::task::yield_now().await;
    assert_eq!(loader.status(), LoadStatus::Finished(2));
}

// ===== Test 4: fetch errors surface as Error =====

#[tokio::test]
async fn test_fetch_error_surfaces() {
    let loader: DataLoader<i32> = DataLoader::new();

    loader.load_if_needed(
        || {
            std::future::ready(Err::<i32, _>(CoreError::Network(NetworkError::HttpStatus {
                status: 500,
                message: "internal".to_string(),
            })))
        },
        AuthEpoch::Anonymous,
    );
    wait_for(&loader, |status| status.error().is_some()).await;

    let status = loader.status();
    let error = status.error().expect("status should carry the error");
    assert!(error.is_retryable());
    assert!(status.value().is_none());
}

// ===== Test 5: refresh reuses the stored fetch =====

#[tokio::test]
async fn test_refresh_reuses_stored_fetch() {
    let loader: DataLoader<i32> = DataLoader::new();
    let fetches = Arc::new(AtomicUsize::new(0));

    let fetch = {
        let fetches = Arc::clone(&fetches);
        move || {
            let call = fetches.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok::<_, CoreError>(call as i32))
        }
    };
    loader.load_if_needed(fetch, AuthEpoch::Anonymous);
    wait_for(&loader, |status| status == &LoadStatus::Finished(0)).await;

    loader.refresh();
    assert!(loader.status().is_loading());
    assert_eq!(loader.status().value(), Some(&0));

    wait_for(&loader, |status| status == &LoadStatus::Finished(1)).await;
    assert_eq!(fetches.load(Ordering::SeqCst), 2);
}

// ===== Test 6: pagination appends on success =====

#[tokio::test]
async fn test_request_more_appends() {
    let loader: DataLoader<Vec<i32>> = DataLoader::new();

    loader.load_if_needed(
        || std::future::ready(Ok::<_, CoreError>(vec![1, 2])),
        AuthEpoch::Anonymous,
    );
    wait_for(&loader, |status| status.is_finished()).await;

    loader.request_more(|current| async move {
        let mut items = current;
        items.push(3);
        Ok(items)
    });
    assert_eq!(loader.status(), LoadStatus::LoadingMore(vec![1, 2]));

    wait_for(&loader, |status| status == &LoadStatus::Finished(vec![1, 2, 3])).await;
}

// ===== Test 7: pagination failure keeps current items =====

#[tokio::test]
async fn test_request_more_failure_keeps_items() {
    let loader: DataLoader<Vec<i32>> = DataLoader::new();

    loader.load_if_needed(
        || std::future::ready(Ok::<_, CoreError>(vec![1, 2])),
        AuthEpoch::Anonymous,
    );
    wait_for(&loader, |status| status.is_finished()).await;

    loader.request_more(|_current| {
        std::future::ready(Err::<Vec<i32>, _>(CoreError::Network(
            NetworkError::Timeout {
                operation: "next page".to_string(),
            },
        )))
    });

    wait_for(&loader, |status| status.is_finished()).await;
    assert_eq!(loader.status(), LoadStatus::Finished(vec![1, 2]));
}

// ===== Test 8: pagination is ignored outside Finished =====

#[tokio::test]
async fn test_request_more_ignored_when_idle() {
    let loader: DataLoader<Vec<i32>> = DataLoader::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let calls_in_fetch = Arc::clone(&calls);
    loader.request_more(move |current| {
        calls_in_fetch.fetch_add(1, Ordering::SeqCst);
        std::future::ready(Ok(current))
    });
    tokio::task::yield_now().await;

    assert!(loader.status().is_idle());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

// ===== Test 9: cancel reconciles a first load to Idle =====

#[tokio::test]
async fn test_cancel_first_load_returns_to_idle() {
    let loader: DataLoader<i32> = DataLoader::new();
    let gate = Arc::new(Notify::new());

    let parked = {
        let gate = Arc::clone(&gate);
        move || {
            let gate = Arc::clone(&gate);
            async move {
                gate.notified().await;
                Ok::<_, CoreError>(1)
            }
        }
    };
    loader.load_if_needed(parked, AuthEpoch::Anonymous);
    assert_eq!(loader.status(), LoadStatus::Loading { previous: None });

    loader.cancel();
    assert!(loader.status().is_idle());

    // The aborted fetch must not resurface after cancellation.
    gate.notify_waiters();
    tokio::task::yield_now().await;
    assert!(loader.status().is_idle());

    // Idle under an unchanged token stays idle; only an explicit refresh
    // runs the stored fetch.
    let fetches = Arc::new(AtomicUsize::new(0));
    loader.load_if_needed(counted_fetch(&fetches, 9), AuthEpoch::Anonymous);
    tokio::task::yield_now().await;
    assert!(loader.status().is_idle());
    assert_eq!(fetches.load(Ordering::SeqCst), 0);

    loader.refresh();
    wait_for(&loader, |status| status == &LoadStatus::Finished(9)).await;
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
}

// ===== Test 10: cancel reconciles a revalidation to Finished =====

#[tokio::test]
async fn test_cancel_revalidation_restores_finished() {
    let loader: DataLoader<i32> = DataLoader::new();
    let gate = Arc::new(Notify::new());

    loader.load_if_needed(
        || std::future::ready(Ok::<_, CoreError>(7)),
        AuthEpoch::Anonymous,
    );
    wait_for(&loader, |status| status.is_finished()).await;

    // Swap in a parked fetch so the refresh stays in flight.
    let parked = {
        let gate = Arc::clone(&gate);
        move || {
            let gate = Arc::clone(&gate);
            async move {
                gate.notified().await;
                Ok::<_, CoreError>(8)
            }
        }
    };
    let user = AuthEpoch::User {
        user_id: ChannelId::new("141981764"),
    };
    loader.load_if_needed(parked, user);
    assert_eq!(
        loader.status(),
        LoadStatus::Loading { previous: Some(7) }
    );

    loader.cancel();
    assert_eq!(loader.status(), LoadStatus::Finished(7));
}

// ===== Test 11: cancel reconciles pagination to Finished =====

#[tokio::test]
async fn test_cancel_pagination_restores_finished() {
    let loader: DataLoader<Vec<i32>> = DataLoader::new();
    let gate = Arc::new(Notify::new());

    loader.load_if_needed(
        || std::future::ready(Ok::<_, CoreError>(vec![1])),
        AuthEpoch::Anonymous,
    );
    wait_for(&loader, |status| status.is_finished()).await;

    let page_gate = Arc::clone(&gate);
    loader.request_more(move |current| async move {
        page_gate.notified().await;
        Ok(current)
    });
    assert_eq!(loader.status(), LoadStatus::LoadingMore(vec![1]));

    loader.cancel();
    assert_eq!(loader.status(), LoadStatus::Finished(vec![1]));
}

// ===== Test 12: a cancelled fetch reconciles instead of erroring =====

#[tokio::test]
async fn test_cancellation_error_reconciles() {
    let loader: DataLoader<i32> = DataLoader::new();

    loader.load_if_needed(
        || std::future::ready(Err::<i32, _>(CoreError::Cancelled)),
        AuthEpoch::Anonymous,
    );
    wait_for(&loader, |status| !status.is_loading()).await;

    // A cancellation never lands as Error; with no prior value it is Idle.
    assert!(loader.status().is_idle());
}

// ===== Test 13: smoothed refresh holds the result for the minimum duration =====

#[tokio::test(start_paused = true)]
async fn test_smoothed_refresh_waits_minimum_duration() {
    let loader: DataLoader<i32> = DataLoader::new();
    let fetches = Arc::new(AtomicUsize::new(0));

    let fetch = {
        let fetches = Arc::clone(&fetches);
        move || {
            let call = fetches.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok::<_, CoreError>(call as i32))
        }
    };
    loader.load_if_needed(fetch, AuthEpoch::Anonymous);
    wait_for(&loader, |status| status == &LoadStatus::Finished(0)).await;

    loader.refresh_smoothed(Duration::from_millis(400), true);

    // The fetch resolves instantly, but the old value stays visible.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(loader.status(), LoadStatus::Finished(0));

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(loader.status(), LoadStatus::Finished(1));
    assert_eq!(fetches.load(Ordering::SeqCst), 2);
}

// ===== Test 14: smoothed refresh can suppress the loading state =====

#[tokio::test(start_paused = true)]
async fn test_smoothed_refresh_loading_visibility() {
    let loader: DataLoader<i32> = DataLoader::new();

    loader.load_if_needed(
        || std::future::ready(Ok::<_, CoreError>(3)),
        AuthEpoch::Anonymous,
    );
    wait_for(&loader, |status| status.is_finished()).await;

    // Suppressed: the status never leaves Finished during the refresh.
    loader.refresh_smoothed(Duration::from_millis(200), true);
    assert!(loader.status().is_finished());
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(loader.status().is_finished());

    // Visible: the status dips into Loading with the previous value.
    loader.refresh_smoothed(Duration::from_millis(200), false);
    assert_eq!(loader.status(), LoadStatus::Loading { previous: Some(3) });
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(loader.status().is_finished());
}
