//! Async data-loading state machine.
//!
//! A [`DataLoader`] owns one [`LoadStatus`] and coordinates fetches against
//! it: de-duplication via a change token, forced refresh, minimum-duration
//! smoothing, pagination merged into existing state, and cooperative
//! cancellation with explicit status reconciliation.
//!
//! Every mutation goes through the loader's internal commit path, gated by
//! a generation counter: a fetch that was superseded before completing has
//! a stale generation and its result is discarded, so the visible status
//! only ever reflects the newest request.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::AbortHandle;

use crate::error::CoreError;
use crate::models::AuthEpoch;

/// Observable state of one loadable value.
///
/// `Loading` carries the last known good value (if any) so consumers can
/// keep showing stale content while revalidating. `LoadingMore` is only
/// reachable from `Finished`.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus<T> {
    /// Nothing fetched yet.
    Idle,

    /// A full fetch is in flight.
    Loading { previous: Option<T> },

    /// The last fetch succeeded.
    Finished(T),

    /// A pagination fetch is in flight; current items stay visible.
    LoadingMore(T),

    /// The last fetch failed.
    Error(CoreError),
}

impl<T> LoadStatus<T> {
    pub fn is_idle(&self) -> bool {
        matches!(self, LoadStatus::Idle)
    }

    /// True while any fetch is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadStatus::Loading { .. } | LoadStatus::LoadingMore(_))
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, LoadStatus::Finished(_))
    }

    /// The value a consumer should render right now, if there is one.
    pub fn value(&self) -> Option<&T> {
        match self {
            LoadStatus::Finished(value) | LoadStatus::LoadingMore(value) => Some(value),
            LoadStatus::Loading { previous } => previous.as_ref(),
            LoadStatus::Idle | LoadStatus::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&CoreError> {
        match self {
            LoadStatus::Error(err) => Some(err),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            LoadStatus::Idle => "idle",
            LoadStatus::Loading { .. } => "loading",
            LoadStatus::Finished(_) => "finished",
            LoadStatus::LoadingMore(_) => "loading_more",
            LoadStatus::Error(_) => "error",
        }
    }
}

type FetchFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, CoreError>> + Send + Sync>;

struct LoaderState<T, C> {
    /// Change token seen on the most recent `load_if_needed` call.
    last_token: Option<C>,

    /// Most recently supplied fetch, reused by `refresh`.
    fetch: Option<FetchFn<T>>,

    /// Bumped on every new fetch and on cancel; commits carrying an older
    /// generation are discarded.
    generation: u64,

    in_flight: Option<AbortHandle>,
}

struct LoaderInner<T, C> {
    state: StdMutex<LoaderState<T, C>>,
    status_tx: watch::Sender<LoadStatus<T>>,
}

/// Generic async fetch/refresh/paginate state container.
///
/// Cloning is cheap and all clones observe the same status. The loader
/// never retries on its own and never surfaces cancellation as an error.
pub struct DataLoader<T, C = AuthEpoch> {
    inner: Arc<LoaderInner<T, C>>,
}

impl<T, C> Clone for DataLoader<T, C> {
    fn clone(&self) -> Self {
        DataLoader {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, C> Default for DataLoader<T, C>
where
    T: Clone + Send + Sync + 'static,
    C: PartialEq + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C> DataLoader<T, C>
where
    T: Clone + Send + Sync + 'static,
    C: PartialEq + Send + 'static,
{
    pub fn new() -> Self {
        let (status_tx, _) = watch::channel(LoadStatus::Idle);
        DataLoader {
            inner: Arc::new(LoaderInner {
                state: StdMutex::new(LoaderState {
                    last_token: None,
                    fetch: None,
                    generation: 0,
                    in_flight: None,
                }),
                status_tx,
            }),
        }
    }

    /// Current status snapshot.
    pub fn status(&self) -> LoadStatus<T> {
        self.inner.status_tx.borrow().clone()
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> watch::Receiver<LoadStatus<T>> {
        self.inner.status_tx.subscribe()
    }

    /// Fetch if the change token differs from the last one seen.
    ///
    /// A differing token cancels any in-flight fetch and starts a new one.
    /// With an unchanged token and `Idle` status the token is recorded but
    /// no fetch starts; re-mounting a consumer under the same identity must
    /// not trigger network work on its own. Any other state is a no-op.
    /// The fetch closure is stored either way so a later [`refresh`] can
    /// reuse it.
    ///
    /// [`refresh`]: DataLoader::refresh
    pub fn load_if_needed<F, Fut>(&self, fetch: F, token: C)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        let fetch: FetchFn<T> = Arc::new(move || fetch().boxed());

        let mut state = self.inner.state.lock().unwrap();
        state.fetch = Some(Arc::clone(&fetch));

        if state.last_token.as_ref() != Some(&token) {
            state.last_token = Some(token);
            self.begin_fetch(&mut state, fetch, None, false);
        } else if self.inner.status_tx.borrow().is_idle() {
            tracing::debug!("loader idle under unchanged context; waiting for explicit refresh");
        }
    }

    /// Cancel any in-flight fetch and start a new one with the stored fetch
    /// closure. Logs and no-ops if nothing was ever supplied.
    pub fn refresh(&self) {
        let mut state = self.inner.state.lock().unwrap();
        match state.fetch.clone() {
            Some(fetch) => self.begin_fetch(&mut state, fetch, None, false),
            None => tracing::warn!("refresh requested before any fetch was supplied"),
        }
    }

    /// Like [`refresh`], but the resulting status is not applied until at
    /// least `min_duration` has elapsed. The fetch itself runs undelayed;
    /// only the visible transition waits. With `prevent_loading_state` the
    /// current status stays in place instead of flipping to `Loading`.
    ///
    /// [`refresh`]: DataLoader::refresh
    pub fn refresh_smoothed(&self, min_duration: Duration, prevent_loading_state: bool) {
        let mut state = self.inner.state.lock().unwrap();
        match state.fetch.clone() {
            Some(fetch) => {
                self.begin_fetch(&mut state, fetch, Some(min_duration), prevent_loading_state)
            }
            None => tracing::warn!("refresh requested before any fetch was supplied"),
        }
    }

    /// Fetch the next page and merge it into the current value.
    ///
    /// Valid only from `Finished`; any other state logs and returns. On
    /// failure the status reverts to the prior `Finished` value: pagination
    /// errors must not destroy already-displayed data.
    pub fn request_more<F, Fut>(&self, get_more: F)
    where
        F: FnOnce(T) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        let mut state = self.inner.state.lock().unwrap();

        let current = {
            let status = self.inner.status_tx.borrow();
            match &*status {
                LoadStatus::Finished(value) => value.clone(),
                other => {
                    tracing::debug!(status = other.label(), "request_more ignored outside finished");
                    return;
                }
            }
        };

        if let Some(handle) = state.in_flight.take() {
            handle.abort();
        }
        state.generation = state.generation.wrapping_add(1);
        let generation = state.generation;

        self.inner
            .status_tx
            .send_replace(LoadStatus::LoadingMore(current.clone()));

        let inner = Arc::downgrade(&self.inner);
        let fallback = current.clone();
        let task = tokio::spawn(async move {
            let result = get_more(current).await;
            let Some(inner) = inner.upgrade() else {
                return;
            };
            let mut state = inner.state.lock().unwrap();
            if state.generation != generation {
                tracing::debug!(generation, "discarding stale pagination result");
                return;
            }
            state.in_flight = None;
            match result {
                Ok(value) => {
                    inner.status_tx.send_replace(LoadStatus::Finished(value));
                }
                Err(err) if err.is_cancellation() => {
                    inner.status_tx.send_replace(LoadStatus::Finished(fallback));
                }
                Err(err) => {
                    tracing::warn!(error = %err, "pagination failed; keeping current items");
                    inner.status_tx.send_replace(LoadStatus::Finished(fallback));
                }
            }
        });
        state.in_flight = Some(task.abort_handle());
    }

    /// Cancel any in-flight fetch and reconcile the status to a terminal
    /// state: `Finished(last_good)` when a value exists, else `Idle`.
    ///
    /// The aborted task never mutates status itself; reconciliation happens
    /// here, synchronously, so observers never see a stuck `Loading`.
    pub fn cancel(&self) {
        let mut state = self.inner.state.lock().unwrap();
        if let Some(handle) = state.in_flight.take() {
            handle.abort();
        }
        state.generation = state.generation.wrapping_add(1);

        let reconciled = {
            let status = self.inner.status_tx.borrow();
            match &*status {
                LoadStatus::Loading {
                    previous: Some(value),
                } => Some(LoadStatus::Finished(value.clone())),
                LoadStatus::Loading { previous: None } => Some(LoadStatus::Idle),
                LoadStatus::LoadingMore(value) => Some(LoadStatus::Finished(value.clone())),
                _ => None,
            }
        };
        if let Some(status) = reconciled {
            self.inner.status_tx.send_replace(status);
        }
    }

    /// Start a fetch under the state lock: supersede the previous one, bump
    /// the generation, publish the loading state, and spawn the worker.
    fn begin_fetch(
        &self,
        state: &mut LoaderState<T, C>,
        fetch: FetchFn<T>,
        min_duration: Option<Duration>,
        prevent_loading_state: bool,
    ) {
        if let Some(handle) = state.in_flight.take() {
            handle.abort();
        }
        state.generation = state.generation.wrapping_add(1);
        let generation = state.generation;

        if !prevent_loading_state {
            let previous = {
                let status = self.inner.status_tx.borrow();
                status.value().cloned()
            };
            self.inner
                .status_tx
                .send_replace(LoadStatus::Loading { previous });
        }

        let inner = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            // Bail before any work if this fetch was already superseded.
            if let Some(inner) = inner.upgrade() {
                if inner.state.lock().unwrap().generation != generation {
                    return;
                }
            } else {
                return;
            }

            let result = match min_duration {
                Some(min) => {
                    let (result, _) = tokio::join!(fetch(), tokio::time::sleep(min));
                    result
                }
                None => fetch().await,
            };

            let Some(inner) = inner.upgrade() else {
                return;
            };
            LoaderInner::commit(&inner, generation, result);
        });
        state.in_flight = Some(task.abort_handle());
    }
}

impl<T, C> LoaderInner<T, C>
where
    T: Clone + Send + Sync + 'static,
{
    /// Apply a fetch result to the status, unless superseded.
    fn commit(inner: &Arc<LoaderInner<T, C>>, generation: u64, result: Result<T, CoreError>) {
        let mut state = inner.state.lock().unwrap();
        if state.generation != generation {
            tracing::debug!(
                generation,
                current = state.generation,
                "discarding stale fetch result"
            );
            return;
        }
        state.in_flight = None;

        match result {
            Ok(value) => {
                inner.status_tx.send_replace(LoadStatus::Finished(value));
            }
            Err(err) if err.is_cancellation() => {
                let reconciled = {
                    let status = inner.status_tx.borrow();
                    match &*status {
                        LoadStatus::Loading {
                            previous: Some(value),
                        } => LoadStatus::Finished(value.clone()),
                        LoadStatus::Loading { previous: None } => LoadStatus::Idle,
                        LoadStatus::LoadingMore(value) => LoadStatus::Finished(value.clone()),
                        other => other.clone(),
                    }
                };
                inner.status_tx.send_replace(reconciled);
            }
            Err(err) => {
                inner.status_tx.send_replace(LoadStatus::Error(err));
            }
        }
    }
}
