//! Presenter lifecycle tracking with debounced hide notifications.
//!
//! A [`PresenceManager`] counts the presenters of one piece of content and
//! emits events on true visibility transitions:
//! - First presenter attached: `BecameVisible`, immediately.
//! - Last presenter detached: `BecameHidden`, after a debounce window
//!   (default 200ms) that absorbs attach/detach churn during navigation.
//! - Role-set change while visible: `RolesChanged`.
//!
//! The debounce is cancellable: an `attach` during the window aborts the
//! pending hide, so expensive resources survive a brief flicker.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use uuid::Uuid;

/// Default debounce before the hidden notification fires.
const DEFAULT_HIDE_DEBOUNCE_MS: u64 = 200;

/// How a presenter is showing the content.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PresenterRole {
    /// Inline inside another surface (e.g. a chat pane beside the player).
    Embedded,

    /// The content is the whole surface.
    Standalone,

    /// Application-defined role.
    Custom(String),
}

/// Opaque handle identifying one attached presenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PresenterToken {
    id: Uuid,
}

/// Events emitted on visibility and role transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceEvent {
    /// Presenter count went from zero to nonzero.
    BecameVisible,

    /// Presenter count stayed at zero through the debounce window.
    BecameHidden,

    /// The set of distinct active roles changed while visible.
    RolesChanged(BTreeSet<PresenterRole>),
}

#[derive(Debug, Clone)]
pub struct PresenceConfig {
    pub hide_debounce: Duration,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        PresenceConfig {
            hide_debounce: Duration::from_millis(DEFAULT_HIDE_DEBOUNCE_MS),
        }
    }
}

/// Point-in-time view of the manager, for callers that poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceSnapshot {
    /// Whether the content is currently considered visible. Stays true
    /// during a pending hide debounce.
    pub visible: bool,
    pub presenter_count: usize,
    pub roles: BTreeSet<PresenterRole>,
}

struct PresenceState {
    presenters: HashMap<Uuid, PresenterRole>,
    visible: bool,
    roles: BTreeSet<PresenterRole>,

    /// Guards the debounced hide: the spawned task only fires if the epoch
    /// still matches when the sleep ends.
    hide_epoch: u64,
    hide_task: Option<AbortHandle>,
}

struct ManagerInner {
    state: StdMutex<PresenceState>,
    hide_debounce: Duration,
    events_tx: mpsc::UnboundedSender<PresenceEvent>,
}

/// Tracks presenters of one piece of content. Cheap to clone; all clones
/// share state.
#[derive(Clone)]
pub struct PresenceManager {
    inner: Arc<ManagerInner>,
}

impl PresenceManager {
    /// Create a manager and the receiver its events arrive on.
    pub fn new(config: PresenceConfig) -> (Self, mpsc::UnboundedReceiver<PresenceEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let manager = PresenceManager {
            inner: Arc::new(ManagerInner {
                state: StdMutex::new(PresenceState {
                    presenters: HashMap::new(),
                    visible: false,
                    roles: BTreeSet::new(),
                    hide_epoch: 0,
                    hide_task: None,
                }),
                hide_debounce: config.hide_debounce,
                events_tx,
            }),
        };
        (manager, events_rx)
    }

    /// Register a presenter. Cancels any pending debounced hide. Emits
    /// `BecameVisible` on the zero-to-nonzero transition, then
    /// `RolesChanged` if the role set was altered.
    pub fn attach(&self, role: PresenterRole) -> PresenterToken {
        let token = PresenterToken { id: Uuid::new_v4() };
        let mut state = self.inner.state.lock().unwrap();

        state.hide_epoch = state.hide_epoch.wrapping_add(1);
        if let Some(task) = state.hide_task.take() {
            task.abort();
        }

        state.presenters.insert(token.id, role);

        if !state.visible {
            state.visible = true;
            let _ = self.inner.events_tx.send(PresenceEvent::BecameVisible);
        }
        self.emit_roles_if_changed(&mut state);

        token
    }

    /// Remove a presenter. On the last detach, schedules the debounced
    /// hide; otherwise emits `RolesChanged` immediately if the set shrank.
    pub fn detach(&self, token: PresenterToken) {
        let mut state = self.inner.state.lock().unwrap();

        if state.presenters.remove(&token.id).is_none() {
            tracing::warn!(token = %token.id, "detach for unknown presenter token");
            return;
        }

        if state.presenters.is_empty() {
            self.schedule_hide(&mut state);
        } else {
            self.emit_roles_if_changed(&mut state);
        }
    }

    /// Change a presenter's role in place without affecting the count.
    pub fn update_role(&self, token: PresenterToken, role: PresenterRole) {
        let mut state = self.inner.state.lock().unwrap();

        match state.presenters.get_mut(&token.id) {
            Some(slot) => *slot = role,
            None => {
                tracing::warn!(token = %token.id, "role update for unknown presenter token");
                return;
            }
        }
        self.emit_roles_if_changed(&mut state);
    }

    pub fn snapshot(&self) -> PresenceSnapshot {
        let state = self.inner.state.lock().unwrap();
        PresenceSnapshot {
            visible: state.visible,
            presenter_count: state.presenters.len(),
            roles: state.roles.clone(),
        }
    }

    fn emit_roles_if_changed(&self, state: &mut PresenceState) {
        let roles: BTreeSet<PresenterRole> = state.presenters.values().cloned().collect();
        if roles != state.roles {
            state.roles = roles.clone();
            let _ = self.inner.events_tx.send(PresenceEvent::RolesChanged(roles));
        }
    }

    fn schedule_hide(&self, state: &mut PresenceState) {
        state.hide_epoch = state.hide_epoch.wrapping_add(1);
        if let Some(task) = state.hide_task.take() {
            task.abort();
        }
        let epoch = state.hide_epoch;

        let inner = Arc::downgrade(&self.inner);
        let debounce = self.inner.hide_debounce;
        let task = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let Some(inner) = inner.upgrade() else {
                return;
            };
            let mut state = inner.state.lock().unwrap();
            // A newer attach/detach supersedes this timer.
            if state.hide_epoch != epoch {
                return;
            }
            state.hide_task = None;
            if state.presenters.is_empty() && state.visible {
                state.visible = false;
                state.roles.clear();
                let _ = inner.events_tx.send(PresenceEvent::BecameHidden);
            }
        });
        state.hide_task = Some(task.abort_handle());
    }
}
