use core::fmt;
use core::task::{Context, Poll};
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Identifies one asynchronous request. Later requests always receive larger tickets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(pub(crate) u64);

/// The worker context that runs materialization and enrichment off the frame thread.
pub trait Executor: Send + Sync {
    fn spawn(&self, task: BoxFuture<'static, ()>);
}

/// Runs tasks on a tokio runtime.
#[derive(Clone, Debug)]
pub struct TokioExecutor {
    handle: tokio::runtime::Handle,
}

impl TokioExecutor {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// The executor for the runtime the caller is running in, if any.
    pub fn try_current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }
}

impl Executor for TokioExecutor {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        drop(self.handle.spawn(task));
    }
}

/// An executor that only makes progress when the host calls [`ManualExecutor::run_pending`].
///
/// Useful for single-threaded hosts that want to schedule work themselves, and for making
/// completion order deterministic.
#[derive(Default)]
pub struct ManualExecutor {
    queue: Mutex<Vec<BoxFuture<'static, ()>>>,
}

impl ManualExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Polls every queued task once. Finished tasks are dropped, the rest stay queued.
    ///
    /// Returns the number of tasks that finished.
    pub fn run_pending(&self) -> usize {
        let tasks = core::mem::take(&mut *self.queue.lock());
        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);

        let mut finished = 0;
        let mut stalled = Vec::new();
        for mut task in tasks {
            match task.as_mut().poll(&mut cx) {
                Poll::Ready(()) => finished += 1,
                Poll::Pending => stalled.push(task),
            }
        }

        let mut queue = self.queue.lock();
        stalled.append(&mut queue);
        *queue = stalled;
        finished
    }
}

impl Executor for ManualExecutor {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        self.queue.lock().push(task);
    }
}

impl fmt::Debug for ManualExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualExecutor")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Issues work to an [`Executor`] and collects its results for the frame thread.
///
/// Results are marshaled through an unbounded channel and only observed when the frame thread
/// calls `drain`. Work whose token is cancelled before it finishes never sends a result.
pub(crate) struct CompletionQueue<T> {
    executor: Arc<dyn Executor>,
    tx: mpsc::UnboundedSender<T>,
    rx: mpsc::UnboundedReceiver<T>,
    next_ticket: u64,
    issued: u64,
}

impl<T: Send + 'static> CompletionQueue<T> {
    pub(crate) fn new(executor: Arc<dyn Executor>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            executor,
            tx,
            rx,
            next_ticket: 1,
            issued: 0,
        }
    }

    pub(crate) fn next_ticket(&mut self) -> Ticket {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        ticket
    }

    pub(crate) fn spawn<F>(&mut self, token: CancellationToken, work: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let tx = self.tx.clone();
        self.issued += 1;
        self.executor.spawn(Box::pin(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                out = work => {
                    let _ = tx.send(out);
                }
            }
        }));
    }

    pub(crate) fn drain(&mut self) -> Vec<T> {
        let mut out = Vec::new();
        while let Ok(item) = self.rx.try_recv() {
            out.push(item);
        }
        out
    }

    /// Number of tasks spawned so far.
    pub(crate) fn issued(&self) -> u64 {
        self.issued
    }
}

impl<T> fmt::Debug for CompletionQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionQueue")
            .field("next_ticket", &self.next_ticket)
            .field("issued", &self.issued)
            .finish()
    }
}
