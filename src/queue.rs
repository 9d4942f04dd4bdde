//! Operation Queue (C2): an async FIFO that serializes all write operations
//! against the engine's single connection.
//!
//! Hand-rolled on a `VecDeque` behind a `tokio::sync::Mutex` plus a `Notify`
//! rather than `tokio::sync::mpsc`, because admission needs to be
//! cancellable (a timed-out item must be spliced back out of the middle of
//! the queue, which an mpsc channel cannot do once an item has been sent).
//! A single consumer task, spawned lazily on first enqueue, drains the queue
//! one item at a time and parks on the `Notify` when it runs dry.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{oneshot, Mutex as AsyncMutex, Notify};
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};

type BoxedOp = Pin<Box<dyn Future<Output = EngineResult<Box<dyn std::any::Any + Send>>> + Send>>;
type ThunkFactory = Box<dyn FnOnce() -> BoxedOp + Send>;

struct QueueItem {
    id: u64,
    thunk: ThunkFactory,
    started: oneshot::Sender<()>,
    completion: oneshot::Sender<EngineResult<Box<dyn std::any::Any + Send>>>,
    enqueued_at: Instant,
}

#[derive(Debug, Clone, Copy)]
pub struct QueueStats {
    pub pending: usize,
    pub oldest_age_ms: u64,
}

struct QueueState {
    items: VecDeque<QueueItem>,
    next_id: u64,
    consumer_running: bool,
}

/// The serialized write queue shared by the engine. Cloning a `WriteQueue`
/// clones the `Arc` handle, not the queue itself.
#[derive(Clone)]
pub struct WriteQueue {
    state: Arc<AsyncMutex<QueueState>>,
    notify: Arc<Notify>,
    cleared_generation: Arc<AtomicU64>,
}

impl WriteQueue {
    pub fn new() -> Self {
        Self {
            state: Arc::new(AsyncMutex::new(QueueState {
                items: VecDeque::new(),
                next_id: 0,
                consumer_running: false,
            })),
            notify: Arc::new(Notify::new()),
            cleared_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Enqueues `op` and awaits its outcome, failing with
    /// `Timeout{operation: "queue"}` if it has not *started* executing
    /// within `timeout_ms`. On timeout the item is removed from the queue
    /// before the thunk ever runs. Once the consumer has popped the item and
    /// signaled `started`, this stops racing the clock: the remaining
    /// execution time is bounded by the op's own timeout, not this one.
    pub async fn enqueue<T, F, Fut>(&self, timeout_ms: u64, op: F) -> EngineResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = EngineResult<T>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let (started_tx, started_rx) = oneshot::channel();
        let thunk: ThunkFactory = Box::new(move || {
            Box::pin(async move {
                op().await
                    .map(|v| Box::new(v) as Box<dyn std::any::Any + Send>)
            })
        });

        let id = {
            let mut state = self.state.lock().await;
            let id = state.next_id;
            state.next_id += 1;
            state.items.push_back(QueueItem {
                id,
                thunk,
                started: started_tx,
                completion: tx,
                enqueued_at: Instant::now(),
            });
            let needs_spawn = !state.consumer_running;
            if needs_spawn {
                state.consumer_running = true;
            }
            drop(state);
            if needs_spawn {
                self.spawn_consumer();
            } else {
                self.notify.notify_one();
            }
            id
        };

        tokio::pin!(started_rx);
        tokio::select! {
            result = &mut started_rx => {
                match result {
                    // The consumer popped this item and is about to invoke
                    // the thunk: no further deadline from this layer.
                    Ok(()) => match rx.await {
                        Ok(result) => result.map(|boxed| {
                            *boxed
                                .downcast::<T>()
                                .expect("queue item downcast type mismatch")
                        }),
                        Err(_recv_error) => Err(EngineError::QueueCleared),
                    },
                    // The sender was dropped without firing: the item was
                    // removed from the queue (cleared) before it ever ran.
                    Err(_recv_error) => Err(EngineError::QueueCleared),
                }
            }
            _ = tokio::time::sleep(Duration::from_millis(timeout_ms)) => {
                self.remove_by_id(id).await;
                Err(EngineError::timeout("queue", timeout_ms))
            }
        }
    }

    async fn remove_by_id(&self, id: u64) {
        let mut state = self.state.lock().await;
        if let Some(pos) = state.items.iter().position(|item| item.id == id) {
            state.items.remove(pos);
            debug!(id, "removed timed-out item from write queue");
        }
    }

    /// Cancels every pending item with `QueueCleared` and resets queue
    /// bookkeeping. Does not stop a thunk that the consumer has already
    /// popped and started running.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        let drained: Vec<QueueItem> = state.items.drain(..).collect();
        drop(state);
        self.cleared_generation.fetch_add(1, Ordering::SeqCst);
        for item in drained {
            let _ = item.completion.send(Err(EngineError::QueueCleared));
        }
    }

    pub async fn stats(&self) -> QueueStats {
        let state = self.state.lock().await;
        let oldest_age_ms = state
            .items
            .front()
            .map(|item| item.enqueued_at.elapsed().as_millis() as u64)
            .unwrap_or(0);
        QueueStats {
            pending: state.items.len(),
            oldest_age_ms,
        }
    }

    fn spawn_consumer(&self) {
        let state = self.state.clone();
        let notify = self.notify.clone();
        tokio::spawn(async move {
            loop {
                let next = {
                    let mut guard = state.lock().await;
                    let popped = guard.items.pop_front();
                    if popped.is_none() {
                        guard.consumer_running = false;
                    }
                    popped
                };
                let item = match next {
                    Some(item) => item,
                    None => {
                        notify.notified().await;
                        let mut guard = state.lock().await;
                        if guard.items.is_empty() {
                            continue;
                        }
                        guard.consumer_running = true;
                        drop(guard);
                        continue;
                    }
                };
                let QueueItem {
                    id,
                    thunk,
                    started,
                    completion,
                    ..
                } = item;
                let _ = started.send(());
                let result = thunk().await;
                if completion.send(result).is_err() {
                    warn!(id, "write queue item's receiver was dropped before completion");
                }
            }
        });
    }
}

impl Default for WriteQueue {
    fn default() -> Self {
        Self::new()
    }
}
