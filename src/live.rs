//! Live values and switch-mapped derived streams
//!
//! An [`InputSlot`] holds the latest value set by a caller. A
//! [`DerivedStream`] is bound to one slot through a mapping function that
//! turns the slot value into a [`LiveQuery`]. Whenever the slot changes the
//! derived stream tears down its upstream subscription and subscribes to the
//! query produced for the new value.
//!
//! Each derived stream runs a small state machine:
//!
//! ```text
//! Idle --set(v)--> Subscribed(1) --set(v')--> Subscribed(2) --> ... --drop--> Closed
//! ```
//!
//! The switch happens inside [`InputSlot::set`]: it bumps the generation,
//! aborts the previous forwarder, publishes [`Snapshot::Loading`] and spawns
//! the next forwarder while holding the stream's mutex. Forwarders publish
//! under the same mutex and only while their generation is current, so once
//! `set` returns no result from a superseded query can be observed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use futures::StreamExt;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::repository::{LiveQuery, RepositoryError};

/// Failure published when an upstream ends before producing anything
pub const EMPTY_UPSTREAM: &str = "upstream completed without a result";

// =============================================================================
// Snapshot
// =============================================================================

/// What subscribers of a derived stream observe
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot<R> {
    /// The driving input has never been set
    Idle,
    /// Switched to a new input, upstream has not produced a result yet
    Loading,
    /// Latest upstream result for the current input
    Ready(R),
    /// Upstream reported an error for the current input
    Failed(String),
}

impl<R> Default for Snapshot<R> {
    fn default() -> Self {
        Snapshot::Idle
    }
}

impl<R> Snapshot<R> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Snapshot::Loading)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Snapshot::Ready(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Snapshot::Failed(_))
    }

    /// Ready or failed: the current generation has produced something
    pub fn is_settled(&self) -> bool {
        self.is_ready() || self.is_failed()
    }

    pub fn ready(&self) -> Option<&R> {
        match self {
            Snapshot::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Snapshot::Failed(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn into_ready(self) -> Option<R> {
        match self {
            Snapshot::Ready(value) => Some(value),
            _ => None,
        }
    }
}

// =============================================================================
// Input Slot
// =============================================================================

/// Called with each new slot value; returns `false` once its stream is gone
type Listener<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

struct SlotInner<T> {
    value: Option<T>,
    listeners: Vec<Listener<T>>,
}

/// Mutable holder of the latest value driving derived streams
pub struct InputSlot<T> {
    name: &'static str,
    inner: Mutex<SlotInner<T>>,
}

impl<T: std::fmt::Debug> std::fmt::Debug for InputSlot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("InputSlot")
            .field("name", &self.name)
            .field("value", &inner.value)
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

impl<T> InputSlot<T> {
    fn lock(&self) -> MutexGuard<'_, SlotInner<T>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T> InputSlot<T>
where
    T: Clone + PartialEq + Send + Sync + std::fmt::Debug + 'static,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: Mutex::new(SlotInner {
                value: None,
                listeners: Vec::new(),
            }),
        }
    }

    /// Overwrite the slot value and switch every bound stream to it.
    ///
    /// Returns `false` when `value` equals the current value; nothing is
    /// switched in that case.
    pub fn set(&self, value: T) -> bool {
        let mut inner = self.lock();
        if inner.value.as_ref() == Some(&value) {
            trace!(slot = self.name, ?value, "input slot unchanged");
            return false;
        }

        trace!(slot = self.name, ?value, "input slot updated");
        inner.listeners.retain(|listener| listener(&value));
        inner.value = Some(value);
        true
    }

    /// Current value, `None` until the first `set`
    pub fn get(&self) -> Option<T> {
        self.lock().value.clone()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Bind a derived stream to this slot.
    ///
    /// Must be called from within a Tokio runtime; forwarders are spawned on
    /// that runtime even when `set` is later called from another thread. If
    /// the slot already holds a value the stream subscribes immediately.
    pub fn switch_map<R, F>(&self, name: &'static str, mapper: F) -> (DerivedStream<R>, StreamBinding)
    where
        R: Clone + Send + Sync + 'static,
        F: Fn(T) -> LiveQuery<R> + Send + Sync + 'static,
    {
        let shared = Shared::new(name);
        let target: Weak<Shared<R>> = Arc::downgrade(&shared);
        let listener = move |value: &T| match target.upgrade() {
            Some(shared) => shared.switch(|| mapper(value.clone())),
            None => false,
        };

        let mut inner = self.lock();
        if let Some(value) = &inner.value {
            listener(value);
        }
        inner.listeners.push(Box::new(listener));
        drop(inner);

        let stream = DerivedStream::from_shared(Arc::clone(&shared));
        (stream, StreamBinding { target: shared })
    }
}

// =============================================================================
// Switch State Machine
// =============================================================================

#[derive(Debug)]
enum SwitchState {
    Idle,
    Subscribed {
        generation: u64,
        forwarder: JoinHandle<()>,
    },
    Closed,
}

impl SwitchState {
    fn generation(&self) -> u64 {
        match self {
            SwitchState::Subscribed { generation, .. } => *generation,
            SwitchState::Idle | SwitchState::Closed => 0,
        }
    }
}

#[derive(Debug)]
struct Shared<R> {
    name: &'static str,
    state: Mutex<SwitchState>,
    output: watch::Sender<Snapshot<R>>,
    runtime: Handle,
    // Generations only grow, so a forwarder can never match a later one.
    issued: AtomicU64,
}

impl<R> Shared<R>
where
    R: Clone + Send + Sync + 'static,
{
    fn new(name: &'static str) -> Arc<Self> {
        let (output, _rx) = watch::channel(Snapshot::Idle);
        Arc::new(Self {
            name,
            state: Mutex::new(SwitchState::Idle),
            output,
            runtime: Handle::current(),
            issued: AtomicU64::new(0),
        })
    }

    fn lock(&self) -> MutexGuard<'_, SwitchState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the active upstream subscription with the one `subscribe`
    /// opens.
    ///
    /// Returns `false`, without calling `subscribe`, once the stream is closed.
    fn switch(self: &Arc<Self>, subscribe: impl FnOnce() -> LiveQuery<R>) -> bool {
        let mut state = self.lock();

        match std::mem::replace(&mut *state, SwitchState::Idle) {
            SwitchState::Closed => {
                *state = SwitchState::Closed;
                return false;
            }
            SwitchState::Subscribed {
                generation: old,
                forwarder,
            } => {
                trace!(stream = self.name, generation = old, "cancelling superseded subscription");
                forwarder.abort();
            }
            SwitchState::Idle => {}
        }

        let generation = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        self.output.send_replace(Snapshot::Loading);
        let upstream = subscribe();
        let forwarder = self
            .runtime
            .spawn(forward(Arc::clone(self), generation, upstream));
        *state = SwitchState::Subscribed {
            generation,
            forwarder,
        };

        debug!(stream = self.name, generation, "switched upstream subscription");
        true
    }

    /// Publish `snapshot` if `generation` is still the active one
    fn publish(&self, generation: u64, snapshot: Snapshot<R>) -> bool {
        let state = self.lock();
        if state.generation() != generation {
            trace!(stream = self.name, generation, "dropping stale result");
            return false;
        }
        self.output.send_replace(snapshot);
        true
    }

    fn generation(&self) -> u64 {
        self.lock().generation()
    }

    fn teardown(&self) {
        let mut state = self.lock();
        if let SwitchState::Subscribed { forwarder, .. } =
            std::mem::replace(&mut *state, SwitchState::Closed)
        {
            forwarder.abort();
        }
        debug!(stream = self.name, "derived stream closed");
    }
}

async fn forward<R>(shared: Arc<Shared<R>>, generation: u64, mut upstream: LiveQuery<R>)
where
    R: Clone + Send + Sync + 'static,
{
    let mut emitted = false;
    while let Some(item) = upstream.next().await {
        let snapshot = match item {
            Ok(value) => Snapshot::Ready(value),
            Err(e) => {
                warn!(stream = shared.name, generation, error = %e, "upstream lookup failed");
                Snapshot::Failed(e.to_string())
            }
        };

        if !shared.publish(generation, snapshot) {
            return;
        }
        emitted = true;
    }

    if emitted {
        trace!(stream = shared.name, generation, "upstream completed");
    } else {
        warn!(stream = shared.name, generation, "upstream completed without a result");
        shared.publish(generation, Snapshot::Failed(EMPTY_UPSTREAM.to_string()));
    }
}

// =============================================================================
// Derived Stream
// =============================================================================

/// Read-only observable recomputed via switch-map
#[derive(Debug)]
pub struct DerivedStream<R> {
    shared: Arc<Shared<R>>,
}

impl<R> Clone for DerivedStream<R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<R> DerivedStream<R>
where
    R: Clone + Send + Sync + 'static,
{
    fn from_shared(shared: Arc<Shared<R>>) -> Self {
        Self { shared }
    }

    /// Bind directly to one upstream query, with no driving slot.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn constant(name: &'static str, upstream: LiveQuery<R>) -> (Self, StreamBinding) {
        let shared = Shared::new(name);
        shared.switch(|| upstream);
        let stream = Self::from_shared(Arc::clone(&shared));
        (stream, StreamBinding { target: shared })
    }

    pub fn name(&self) -> &'static str {
        self.shared.name
    }

    /// Latest published snapshot
    pub fn current(&self) -> Snapshot<R> {
        self.shared.output.borrow().clone()
    }

    /// A receiver notified on every publish
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<R>> {
        self.shared.output.subscribe()
    }

    /// Generation of the active upstream subscription, 0 when idle or closed
    pub fn generation(&self) -> u64 {
        self.shared.generation()
    }

    /// Wait until the published snapshot satisfies `predicate`
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&Snapshot<R>) -> bool,
    ) -> Result<Snapshot<R>, RepositoryError> {
        let mut rx = self.subscribe();
        let snapshot = rx
            .wait_for(predicate)
            .await
            .map_err(|_| RepositoryError::Closed)?;
        Ok(snapshot.clone())
    }

    /// Wait until the current generation is ready or failed
    pub async fn settled(&self) -> Result<Snapshot<R>, RepositoryError> {
        self.wait_for(Snapshot::is_settled).await
    }
}

// =============================================================================
// Binding
// =============================================================================

trait Close: Send + Sync {
    fn close(&self);
}

impl<R> Close for Shared<R>
where
    R: Clone + Send + Sync + 'static,
{
    fn close(&self) {
        self.teardown()
    }
}

/// Owner of a derived stream's upstream subscription
///
/// Dropping the binding aborts the active forwarder and detaches the stream
/// from its slot. Read handles stay valid but stop receiving updates.
#[must_use = "dropping the binding stops the derived stream"]
pub struct StreamBinding {
    target: Arc<dyn Close>,
}

impl std::fmt::Debug for StreamBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamBinding").finish_non_exhaustive()
    }
}

impl Drop for StreamBinding {
    fn drop(&mut self) {
        self.target.close();
    }
}

// =============================================================================
// Tests
// =============================================================================
