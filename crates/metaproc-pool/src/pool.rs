use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{JobError, Result};

enum Job<T> {
    Work {
        done: oneshot::Sender<Result<T>>,
        unit: BoxFuture<'static, T>,
    },
    Terminate,
}

#[derive(Default)]
struct Load {
    backlog: AtomicUsize,
    outstanding: AtomicUsize,
}

pub struct WorkerPool<T> {
    sender: mpsc::UnboundedSender<Job<T>>,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<Job<T>>>>,
    workers: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
    load: Arc<Load>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Spawns `workers` loops on the current runtime. At least one worker
    /// is always started.
    pub fn new(workers: usize) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let receiver = Arc::new(Mutex::new(receiver));
        let cancel = CancellationToken::new();
        let load = Arc::new(Load::default());

        let workers = (0..workers.max(1))
            .map(|id| {
                tokio::spawn(worker_loop(
                    id,
                    Arc::clone(&receiver),
                    cancel.clone(),
                    Arc::clone(&load),
                ))
            })
            .collect();

        Self {
            sender,
            receiver,
            workers,
            cancel,
            load,
        }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Jobs queued but not yet picked up by a worker.
    pub fn backlog(&self) -> usize {
        self.load.backlog.load(Ordering::Acquire)
    }

    /// Jobs submitted whose handle is not yet resolved.
    pub fn outstanding(&self) -> usize {
        self.load.outstanding.load(Ordering::Acquire)
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn submit<F>(&self, unit: F) -> JobHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
    {
        let (done, rx) = oneshot::channel();
        if self.cancel.is_cancelled() {
            let _ = done.send(Err(JobError::Cancelled));
            return JobHandle { rx };
        }

        self.load.backlog.fetch_add(1, Ordering::AcqRel);
        self.load.outstanding.fetch_add(1, Ordering::AcqRel);
        let job = Job::Work {
            done,
            unit: unit.boxed(),
        };
        if let Err(mpsc::error::SendError(job)) = self.sender.send(job) {
            self.load.backlog.fetch_sub(1, Ordering::AcqRel);
            self.load.outstanding.fetch_sub(1, Ordering::AcqRel);
            if let Job::Work { done, .. } = job {
                let _ = done.send(Err(JobError::Dropped));
            }
        }
        JobHandle { rx }
    }

    /// Tells every worker to stop taking work and to abandon the job it is
    /// running at its next suspension point.
    pub fn cancel_all(&self) {
        self.cancel.cancel();
    }

    /// Queues one terminate marker per worker and waits for all of them to
    /// exit. Jobs still queued afterwards (after a cancel) resolve as
    /// `Cancelled`.
    pub async fn join(self) {
        for _ in 0..self.workers.len() {
            let _ = self.sender.send(Job::Terminate);
        }
        for (id, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.await {
                warn!(worker = id, error = %e, "worker ended abnormally");
            }
        }

        let mut receiver = self.receiver.lock().await;
        receiver.close();
        while let Ok(job) = receiver.try_recv() {
            if let Job::Work { done, .. } = job {
                self.load.backlog.fetch_sub(1, Ordering::AcqRel);
                self.load.outstanding.fetch_sub(1, Ordering::AcqRel);
                let _ = done.send(Err(JobError::Cancelled));
            }
        }
        debug!("worker pool drained");
    }
}

async fn worker_loop<T: Send + 'static>(
    id: usize,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<Job<T>>>>,
    cancel: CancellationToken,
    load: Arc<Load>,
) {
    loop {
        let job = {
            let mut receiver = receiver.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                job = receiver.recv() => job,
            }
        };
        let Some(Job::Work { done, unit }) = job else {
            break;
        };
        load.backlog.fetch_sub(1, Ordering::AcqRel);

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(JobError::Cancelled),
            out = AssertUnwindSafe(unit).catch_unwind() => out.map_err(|p| JobError::Panicked(panic_message(p))),
        };
        match &result {
            Err(JobError::Panicked(message)) => warn!(worker = id, panic = %message, "job panicked"),
            Err(e) => debug!(worker = id, error = %e, "job did not complete"),
            Ok(_) => {}
        }
        load.outstanding.fetch_sub(1, Ordering::AcqRel);
        let _ = done.send(result);
    }
    debug!(worker = id, "worker stopped");
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Resolves once with the job's output or the reason it has none.
pub struct JobHandle<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> JobHandle<T> {
    /// The job's result if it has already resolved, without waiting.
    pub fn try_result(&mut self) -> Option<Result<T>> {
        match self.rx.try_recv() {
            Ok(out) => Some(out),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(JobError::Dropped)),
        }
    }
}

impl<T> Future for JobHandle<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(out)) => Poll::Ready(out),
            Poll::Ready(Err(_)) => Poll::Ready(Err(JobError::Dropped)),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn submit_after_cancel_resolves_cancelled() {
        let pool: WorkerPool<u32> = WorkerPool::new(1);
        pool.cancel_all();
        let handle = pool.submit(async { 1 });
        assert_eq!(handle.await, Err(JobError::Cancelled));
        pool.join().await;
    }

    #[tokio::test]
    async fn zero_workers_still_runs_one() {
        let pool: WorkerPool<u32> = WorkerPool::new(0);
        assert_eq!(pool.size(), 1);
        assert_eq!(pool.submit(async { 7 }).await, Ok(7));
        pool.join().await;
    }

    #[tokio::test]
    async fn try_result_is_none_until_resolved() {
        let pool: WorkerPool<u32> = WorkerPool::new(1);
        let (go, wait) = oneshot::channel::<()>();
        let mut handle = pool.submit(async move {
            let _ = wait.await;
            5
        });
        assert_eq!(handle.try_result(), None);

        let _ = go.send(());
        let result = loop {
            if let Some(result) = handle.try_result() {
                break result;
            }
            tokio::task::yield_now().await;
        };
        assert_eq!(result, Ok(5));
        pool.join().await;
    }

    #[test]
    fn panic_payloads_become_messages() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(3u8)), "unknown panic");
    }
}
