//! Owner actor - runs caller-supplied operations against state it owns
//!
//! The actor holds a piece of state `S` that nothing else can reach. Callers
//! don't send data describing what they want; they send the behaviour itself,
//! a closure taking `&mut S`. The actor pops closures off a FIFO queue and runs
//! them one at a time, so the state never needs a lock and new capabilities can
//! be added without touching the loop.
//!
//! Callers that need an answer use [`OwnerHandle::call`], which pairs the
//! closure with a `oneshot` reply slot and waits on it.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info};

use crate::actor::Actor;
use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::types::{ActorState, ActorStats};

/// A unit of behaviour executed with exclusive access to the owned state.
pub type Operation<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

/// What travels over the actor's queue.
enum Envelope<S> {
    Run(Operation<S>),

    /// Stop accepting work. Everything already queued still runs.
    Shutdown,
}

/// State shared between the actor and every clone of its handle.
#[derive(Default)]
struct Shared {
    /// Set as soon as shutdown begins; submissions check it first.
    closed: AtomicBool,
    executed: AtomicU64,
    defects: AtomicU64,
}

/// A [Tokio actor][] that owns `state` exclusively.
///
/// [Tokio actor]: https://ryhl.io/blog/actors-with-tokio/
struct OwnerActor<S> {
    /// Name used in log lines
    name: String,

    /// The owned state. Only operations run by this actor ever see it.
    state: S,

    /// Queue of operations. Actor terminates when this channel is closed.
    request_rx: mpsc::UnboundedReceiver<Envelope<S>>,

    /// Publishes `Running`/`Executing`/`Stopped` transitions to handles.
    state_tx: watch::Sender<ActorState>,

    shared: Arc<Shared>,
}

impl<S: Send + 'static> Actor for OwnerActor<S> {
    async fn run(mut self) {
        info!(actor = %self.name, "Owner actor started");

        while let Some(envelope) = self.request_rx.recv().await {
            match envelope {
                Envelope::Run(operation) => self.execute(operation),
                Envelope::Shutdown => {
                    self.drain();
                    break;
                }
            }
        }

        // Handles dropped without an explicit shutdown end up here too.
        self.shared.closed.store(true, Ordering::Release);
        self.state_tx.send_replace(ActorState::Stopped);
        info!(actor = %self.name, "Owner actor stopped");
    }
}

impl<S: Send + 'static> OwnerActor<S> {
    fn new(
        name: String,
        state: S,
        request_rx: mpsc::UnboundedReceiver<Envelope<S>>,
        state_tx: watch::Sender<ActorState>,
        shared: Arc<Shared>,
    ) -> Self {
        Self {
            name,
            state,
            request_rx,
            state_tx,
            shared,
        }
    }

    /// Run one operation. A panic is logged and counted; the loop carries on.
    fn execute(&mut self, operation: Operation<S>) {
        self.state_tx.send_replace(ActorState::Executing);

        let state = &mut self.state;
        let outcome = panic::catch_unwind(AssertUnwindSafe(move || operation(state)));

        self.shared.executed.fetch_add(1, Ordering::Relaxed);
        if let Err(payload) = outcome {
            self.shared.defects.fetch_add(1, Ordering::Relaxed);
            error!(
                actor = %self.name,
                "Operation panicked: {}",
                panic_message(payload.as_ref())
            );
        }

        self.state_tx.send_replace(ActorState::Running);
    }

    /// Close the queue and run whatever is still buffered.
    ///
    /// Once the receiver is closed no send can succeed, so every envelope left in
    /// the buffer was accepted by `submit` and is owed an execution.
    fn drain(&mut self) {
        self.request_rx.close();

        let mut drained = 0u64;
        while let Ok(envelope) = self.request_rx.try_recv() {
            if let Envelope::Run(operation) = envelope {
                self.execute(operation);
                drained += 1;
            }
        }

        if drained > 0 {
            debug!(
                actor = %self.name,
                "Ran {drained} operation(s) that raced the shutdown marker"
            );
        }
    }
}

/// Handle for submitting operations to an owner actor
pub struct OwnerHandle<S> {
    /// Send operations to the owner actor
    request_tx: mpsc::UnboundedSender<Envelope<S>>,

    /// Latest state published by the actor
    state_rx: watch::Receiver<ActorState>,

    shared: Arc<Shared>,

    /// Default bound for [`OwnerHandle::call`]
    reply_timeout: Duration,
}

impl<S> Clone for OwnerHandle<S> {
    fn clone(&self) -> Self {
        Self {
            request_tx: self.request_tx.clone(),
            state_rx: self.state_rx.clone(),
            shared: self.shared.clone(),
            reply_timeout: self.reply_timeout,
        }
    }
}

impl<S: Send + 'static> OwnerHandle<S> {
    /// Move `state` into a freshly spawned actor and return a handle to it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(state: S, config: &RegistryConfig) -> Self {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ActorState::Running);
        let shared = Arc::new(Shared::default());

        let actor = OwnerActor::new(
            config.name.clone(),
            state,
            request_rx,
            state_tx,
            shared.clone(),
        );
        actor.spawn();

        Self {
            request_tx,
            state_rx,
            shared,
            reply_timeout: config.reply_timeout,
        }
    }

    /// Enqueue `operation` without waiting for it to run.
    pub fn submit<F>(&self, operation: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(RegistryError::Closed);
        }

        self.request_tx
            .send(Envelope::Run(Box::new(operation)))
            .map_err(|_| RegistryError::Closed)
    }

    /// Enqueue `f` together with a reply slot and return the receiving end.
    ///
    /// If `f` panics, the slot is filled with [`RegistryError::Defect`] before the
    /// panic continues on to the actor loop.
    pub fn submit_with_reply<F, R>(
        &self,
        f: F,
    ) -> Result<oneshot::Receiver<Result<R, RegistryError>>, RegistryError>
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.submit(move |state: &mut S| {
            match panic::catch_unwind(AssertUnwindSafe(move || f(state))) {
                Ok(value) => {
                    if reply_tx.send(Ok(value)).is_err() {
                        // Caller timed out or went away; the result is discarded.
                        debug!("Reply slot abandoned by caller");
                    }
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    let _ = reply_tx.send(Err(RegistryError::Defect(message)));
                    panic::resume_unwind(payload);
                }
            }
        })?;

        Ok(reply_rx)
    }

    /// Run `f` against the owned state and wait for its result, bounded by the
    /// configured reply timeout.
    pub async fn call<F, R>(&self, f: F) -> Result<R, RegistryError>
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.call_with_timeout(f, self.reply_timeout).await
    }

    /// Like [`call`](Self::call) with an explicit bound on the wait.
    ///
    /// Timing out does not cancel the operation; the actor still runs it and
    /// its reply is discarded.
    pub async fn call_with_timeout<F, R>(&self, f: F, timeout: Duration) -> Result<R, RegistryError>
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        let reply_rx = self.submit_with_reply(f)?;

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(RegistryError::Closed),
            Err(_) => {
                debug!("Gave up waiting for reply after {timeout:?}");
                Err(RegistryError::Timeout(timeout))
            }
        }
    }

    /// Like [`call`](Self::call) but waits as long as it takes.
    pub async fn call_unbounded<F, R>(&self, f: F) -> Result<R, RegistryError>
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        let reply_rx = self.submit_with_reply(f)?;
        reply_rx.await.map_err(|_| RegistryError::Closed)?
    }

    /// Stop accepting operations, let everything already queued finish, and wait
    /// for the actor to stop. Safe to call more than once and from several clones.
    pub async fn shutdown(&self) {
        if !self.shared.closed.swap(true, Ordering::AcqRel) {
            info!("Owner actor shutdown requested");
            // Fails only if the actor is already gone, which is what we want anyway.
            let _ = self.request_tx.send(Envelope::Shutdown);
        }

        let mut state_rx = self.state_rx.clone();
        // An error means the actor task is gone, which also counts as stopped.
        let _ = state_rx
            .wait_for(|state| *state == ActorState::Stopped)
            .await;
    }
}

impl<S> OwnerHandle<S> {
    pub fn state(&self) -> ActorState {
        *self.state_rx.borrow()
    }

    /// True once shutdown has begun or the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> ActorStats {
        ActorStats {
            executed: self.shared.executed.load(Ordering::Relaxed),
            defects: self.shared.defects.load(Ordering::Relaxed),
        }
    }

    pub fn reply_timeout(&self) -> Duration {
        self.reply_timeout
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    fn spawn_counter() -> OwnerHandle<Vec<u32>> {
        OwnerHandle::spawn(Vec::new(), &RegistryConfig::default().with_name("test"))
    }

    #[tokio::test]
    async fn test_operations_run_in_submission_order() {
        let handle = spawn_counter();

        for i in 0..100 {
            handle.submit(move |log| log.push(i)).unwrap();
        }

        let log = handle.call(|log| log.clone()).await.unwrap();
        assert_eq!(log, (0..100).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_panicking_operation_does_not_stop_actor() {
        let handle = spawn_counter();

        handle.submit(|_| panic!("fire-and-forget defect")).unwrap();
        let result = handle.call(|_| -> u32 { panic!("boom") }).await;
        assert_eq!(result, Err(RegistryError::Defect("boom".to_string())));

        handle.submit(|log| log.push(7)).unwrap();
        let log = handle.call(|log| log.clone()).await.unwrap();
        assert_eq!(log, vec![7]);

        let stats = handle.stats();
        assert_eq!(stats.defects, 2);
        assert!(stats.executed >= 3);
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_fails_fast() {
        let handle = spawn_counter();
        handle.shutdown().await;

        assert_eq!(handle.state(), ActorState::Stopped);
        assert_eq!(handle.submit(|log| log.push(1)), Err(RegistryError::Closed));
        assert_eq!(
            handle.call(|log| log.len()).await,
            Err(RegistryError::Closed)
        );
    }

    #[tokio::test]
    async fn test_shutdown_drains_queued_operations() {
        let handle = spawn_counter();
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();

        for i in 0..10 {
            let seen_tx = seen_tx.clone();
            handle
                .submit(move |log| {
                    log.push(i);
                    let _ = seen_tx.send(i);
                })
                .unwrap();
        }
        drop(seen_tx);

        handle.shutdown().await;

        let mut seen = Vec::new();
        while let Some(i) = seen_rx.recv().await {
            seen.push(i);
        }
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_operations_queued_behind_shutdown_marker_still_run() {
        let handle = spawn_counter();
        let (ran_tx, mut ran_rx) = mpsc::unbounded_channel();

        // Marker first, then a fire-and-forget and a reply-carrying operation.
        // Nothing yields in between, so both land in the buffer behind the marker.
        assert!(handle.request_tx.send(Envelope::Shutdown).is_ok());
        handle
            .submit(move |log| {
                log.push(1);
                let _ = ran_tx.send(());
            })
            .unwrap();
        let reply_rx = handle.submit_with_reply(|log| log.clone()).unwrap();

        timeout(Duration::from_secs(1), handle.shutdown())
            .await
            .unwrap();

        assert_eq!(ran_rx.try_recv(), Ok(()));
        assert_eq!(reply_rx.await.unwrap(), Ok(vec![1]));
        assert_eq!(handle.stats(), ActorStats { executed: 2, defects: 0 });
        assert_eq!(handle.state(), ActorState::Stopped);
        assert_eq!(handle.submit(|log| log.push(2)), Err(RegistryError::Closed));
    }

    #[tokio::test]
    async fn test_reply_slot_dropped_unexecuted_resolves_closed() {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel();
        let (_state_tx, state_rx) = watch::channel(ActorState::Running);
        let handle: OwnerHandle<Vec<u32>> = OwnerHandle {
            request_tx,
            state_rx,
            shared: Arc::new(Shared::default()),
            reply_timeout: Duration::from_secs(1),
        };

        let pending = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.call(|log| log.len()).await })
        };

        // Take the operation off the queue and discard it, as a vanished actor would.
        let envelope = request_rx.recv().await.unwrap();
        drop(envelope);

        let result = timeout(Duration::from_secs(1), pending)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result, Err(RegistryError::Closed));
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let handle = spawn_counter();
        let other = handle.clone();

        timeout(Duration::from_secs(1), async {
            tokio::join!(handle.shutdown(), other.shutdown());
            handle.shutdown().await;
        })
        .await
        .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_abandoned_reply_does_not_block_actor() {
        let handle = spawn_counter();
        let (gate_tx, gate_rx) = std::sync::mpsc::channel::<()>();

        // Hold the actor busy until the caller has given up.
        handle
            .submit(move |_| {
                let _ = gate_rx.recv_timeout(Duration::from_secs(1));
            })
            .unwrap();

        let result = handle
            .call_with_timeout(|log| log.push(1), Duration::from_millis(10))
            .await;
        assert_eq!(result, Err(RegistryError::Timeout(Duration::from_millis(10))));
        gate_tx.send(()).unwrap();

        // The abandoned operation still ran, and the actor is still serving.
        let log = handle.call(|log| log.clone()).await.unwrap();
        assert_eq!(log, vec![1]);
    }

    #[test]
    fn test_panic_message_extracts_strings() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u32), "non-string panic payload");
    }
}
