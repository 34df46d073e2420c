//! Completion-queue engine backed by a [`WorkerPool`].

use super::{Completion, ExecutionEngine, SubmissionHandle, Work, WorkerPool};
use crate::errors::EngineError;
use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Runs submitted work on a [`WorkerPool`] and queues completions.
///
/// Every unit reports back through an unbounded channel, which `take`
/// drains in arrival order. A unit that panics completes with
/// [`EngineError::WorkerPanicked`]; a unit still waiting for a worker when
/// the pool shuts down completes with [`EngineError::Rejected`].
pub struct DefaultExecutionEngine<T> {
    pool: WorkerPool,
    sender: mpsc::UnboundedSender<Completion<T>>,
    receiver: mpsc::UnboundedReceiver<Completion<T>>,
    next_ticket: u64,
    outstanding: usize,
}

impl<T: Send + 'static> DefaultExecutionEngine<T> {
    /// Creates an engine on top of `pool`.
    #[must_use]
    pub fn new(pool: WorkerPool) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            pool,
            sender,
            receiver,
            next_ticket: 0,
            outstanding: 0,
        }
    }

    /// Returns the underlying pool.
    #[must_use]
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Submitted units not yet returned by `take`.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }
}

#[async_trait]
impl<T: Send + 'static> ExecutionEngine<T> for DefaultExecutionEngine<T> {
    fn submit(&mut self, work: Work<T>) -> Result<SubmissionHandle, EngineError> {
        if self.pool.is_shutdown() {
            return Err(EngineError::Rejected);
        }

        let handle = SubmissionHandle(self.next_ticket);
        self.next_ticket += 1;

        let permits = self.pool.permits();
        let sender = self.sender.clone();
        self.pool.spawn(async move {
            let outcome = match permits.acquire_owned().await {
                Ok(permit) => {
                    let outcome = AssertUnwindSafe(work)
                        .catch_unwind()
                        .await
                        .map_err(|payload| EngineError::WorkerPanicked(panic_message(&*payload)));
                    drop(permit);
                    outcome
                }
                Err(_) => Err(EngineError::Rejected),
            };
            // The receiver only goes away with the engine itself.
            let _ = sender.send(Completion { handle, outcome });
        });

        self.outstanding += 1;
        trace!(ticket = handle.ticket(), outstanding = self.outstanding, "work submitted");
        Ok(handle)
    }

    async fn take(&mut self) -> Result<Completion<T>, EngineError> {
        if self.outstanding == 0 {
            return Err(EngineError::Idle);
        }

        let completion = self.receiver.recv().await.ok_or(EngineError::Closed)?;
        self.outstanding -= 1;
        if let Err(err) = &completion.outcome {
            debug!(ticket = completion.handle.ticket(), error = %err, "work did not complete");
        }
        Ok(completion)
    }

    fn is_shutdown(&self) -> bool {
        self.pool.is_shutdown()
    }
}

impl<T> fmt::Debug for DefaultExecutionEngine<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultExecutionEngine")
            .field("pool", &self.pool)
            .field("next_ticket", &self.next_ticket)
            .field("outstanding", &self.outstanding)
            .finish_non_exhaustive()
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn engine(size: usize) -> DefaultExecutionEngine<u32> {
        DefaultExecutionEngine::new(WorkerPool::new(size).unwrap())
    }

    fn sleepy(value: u32, millis: u64) -> Work<u32> {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(millis)).await;
            value
        })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_take_returns_completion_order() {
        let mut engine = engine(4);
        let slow = engine.submit(sleepy(1, 120)).unwrap();
        let medium = engine.submit(sleepy(2, 60)).unwrap();
        let fast = engine.submit(sleepy(3, 0)).unwrap();
        assert!(slow.ticket() < medium.ticket() && medium.ticket() < fast.ticket());

        let mut order = Vec::new();
        for _ in 0..3 {
            let completion = engine.take().await.unwrap();
            order.push((completion.handle, completion.outcome.unwrap()));
        }
        assert_eq!(order, vec![(fast, 3), (medium, 2), (slow, 1)]);
        assert_eq!(engine.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_take_without_work_is_idle() {
        let mut engine = engine(1);
        assert_eq!(engine.take().await.unwrap_err(), EngineError::Idle);
    }

    #[tokio::test]
    async fn test_panic_is_captured() {
        let mut engine = engine(1);
        engine
            .submit(Box::pin(async {
                if true {
                    panic!("worker blew up");
                }
                0
            }))
            .unwrap();

        let completion = engine.take().await.unwrap();
        assert_eq!(
            completion.outcome.unwrap_err(),
            EngineError::WorkerPanicked("worker blew up".to_string())
        );

        // the pool survives the panic
        engine.submit(sleepy(7, 0)).unwrap();
        assert_eq!(engine.take().await.unwrap().outcome, Ok(7));
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_is_rejected() {
        let mut engine = engine(2);
        engine.pool().shutdown();
        assert!(engine.is_shutdown());
        assert_eq!(engine.submit(sleepy(1, 0)).unwrap_err(), EngineError::Rejected);
        assert_eq!(engine.outstanding(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_queued_work_is_rejected_on_shutdown() {
        let mut engine = engine(1);
        engine.submit(sleepy(1, 100)).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        engine.submit(sleepy(2, 0)).unwrap();
        engine.pool().shutdown();

        let first = engine.take().await.unwrap();
        assert_eq!(first.outcome, Err(EngineError::Rejected));
        let second = engine.take().await.unwrap();
        assert_eq!(second.outcome, Ok(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pool_size_bounds_concurrency() {
        let mut engine = engine(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for i in 0..6 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            engine
                .submit(Box::pin(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    i
                }))
                .unwrap();
        }
        for _ in 0..6 {
            engine.take().await.unwrap().outcome.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*payload), "owned");
        let payload: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(&*payload), "unknown panic payload");
    }
}
