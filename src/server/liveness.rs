//! Per-connection liveness tracking and the pruning lane that closes idle
//! connections.
//!
//! Every connection shares one idle timeout and connections are admitted in
//! order, so a single FIFO lane that sleeps until the oldest pending check is
//! due behaves like a timer wheel without one. Checks never run concurrently.

use std::io;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use log::debug;
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;

/// Connection ids count up from 1 and wrap back to 0 after `isize::MAX`.
pub type ConnectionId = isize;

/// The id following `id`.
pub fn next_connection_id(id: ConnectionId) -> ConnectionId {
    if id == ConnectionId::MAX {
        0
    } else {
        id + 1
    }
}

/// Liveness state shared by a connection's handler task and the pruning lane.
#[derive(Debug)]
pub struct ConnectionState {
    id: ConnectionId,
    timeout: Duration,
    last_access: Mutex<Instant>,
    task: OnceLock<AbortHandle>,
    closed: watch::Sender<bool>,
}

/// What a single check decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The connection is still active (or its task is not bound yet).
    Reschedule,
    /// The handler task already ended.
    Finished,
    /// The connection was idle too long and has been closed.
    Pruned,
}

impl ConnectionState {
    pub fn new(id: ConnectionId, timeout: Duration) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            id,
            timeout,
            last_access: Mutex::new(Instant::now()),
            task: OnceLock::new(),
            closed,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Record activity now.
    pub fn bump_access(&self) {
        *self.last_access.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    /// Time since the last recorded activity.
    pub fn age(&self) -> Duration {
        let last = *self.last_access.lock().unwrap_or_else(PoisonError::into_inner);
        Instant::now().saturating_duration_since(last)
    }

    /// Bind the task running this connection's protocol loop.
    ///
    /// Only the first call has any effect.
    pub fn bind_task(&self, handle: AbortHandle) {
        if self.task.set(handle).is_err() {
            debug!("Connection {} already bound to a task.", self.id);
        }
    }

    pub fn is_task_bound(&self) -> bool {
        self.task.get().is_some()
    }

    /// Close the connection's socket. Closing twice is harmless.
    pub fn force_close(&self) {
        self.closed.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves once [`force_close`](Self::force_close) has been called.
    pub async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        // The sender lives in `self`, so this only returns once closed.
        let _ = rx.wait_for(|closed| *closed).await;
    }

    /// The error a protocol loop observes when its socket is pruned.
    pub fn pruned_error(&self) -> io::Error {
        io::Error::new(
            io::ErrorKind::ConnectionAborted,
            format!("connection {} pruned after {:?} idle", self.id, self.timeout),
        )
    }

    /// Run one liveness check.
    ///
    /// Sleeps until the connection could have timed out, then decides whether
    /// it should be checked again later, is already finished, or gets closed.
    pub async fn check_once(&self) -> CheckOutcome {
        let remaining = self.timeout.saturating_sub(self.age());
        if !remaining.is_zero() {
            tokio::time::sleep(remaining).await;
        }

        let Some(task) = self.task.get() else {
            // The dispatcher has not bound the handler yet.
            tokio::task::yield_now().await;
            return CheckOutcome::Reschedule;
        };

        if task.is_finished() {
            debug!("Connection {} is already disconnected.", self.id);
            return CheckOutcome::Finished;
        }

        let age = self.age();
        if age >= self.timeout {
            debug!("Connection {} is stale ({:?}) and will be pruned.", self.id, age);
            self.force_close();
            return CheckOutcome::Pruned;
        }

        debug!("Connection {} still alive; will come back later.", self.id);
        CheckOutcome::Reschedule
    }
}

/// The single serial lane on which liveness checks run.
///
/// Cloning yields another handle onto the same lane.
#[derive(Debug, Clone)]
pub struct PruningLane {
    queue: mpsc::UnboundedSender<Arc<ConnectionState>>,
}

impl PruningLane {
    /// Spawn the lane's worker task on the current runtime.
    pub fn spawn() -> (Self, JoinHandle<()>) {
        let (queue, rx) = mpsc::unbounded_channel();
        let lane = Self { queue };
        let worker = tokio::spawn(Self::run(lane.queue.downgrade(), rx));
        (lane, worker)
    }

    /// Queue a check for `connection` behind every check already queued.
    pub fn schedule(&self, connection: Arc<ConnectionState>) {
        if self.queue.send(connection).is_err() {
            debug!("Pruning lane is gone; check not scheduled.");
        }
    }

    async fn run(
        requeue: mpsc::WeakUnboundedSender<Arc<ConnectionState>>,
        mut rx: mpsc::UnboundedReceiver<Arc<ConnectionState>>,
    ) {
        while let Some(connection) = rx.recv().await {
            if connection.check_once().await != CheckOutcome::Reschedule {
                continue;
            }
            match requeue.upgrade() {
                Some(tx) => {
                    let _ = tx.send(connection);
                }
                None => break,
            }
        }
    }
}
