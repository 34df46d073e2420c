//! Bounded worker pool on top of a tokio runtime.

use crate::errors::EngineError;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::debug;

/// A runtime handle plus a semaphore bounding how many units run at once.
///
/// Clones share the same permits, so shutting down one clone shuts down all
/// of them.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

#[derive(Debug)]
struct PoolInner {
    handle: Handle,
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Creates a pool on the current tokio runtime.
    ///
    /// A size of zero is raised to one.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoRuntime`] when called outside a runtime.
    pub fn new(size: usize) -> Result<Self, EngineError> {
        let handle = Handle::try_current().map_err(|e| EngineError::NoRuntime(e.to_string()))?;
        Ok(Self::with_handle(size, handle))
    }

    /// Creates a pool that spawns onto the given runtime.
    #[must_use]
    pub fn with_handle(size: usize, handle: Handle) -> Self {
        let size = size.max(1);
        Self {
            inner: Arc::new(PoolInner {
                handle,
                permits: Arc::new(Semaphore::new(size)),
                size,
            }),
        }
    }

    /// Maximum number of units running at once.
    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.size
    }

    /// Units that could start right now.
    #[must_use]
    pub fn available(&self) -> usize {
        self.inner.permits.available_permits()
    }

    /// Stops accepting work.
    ///
    /// Running units finish normally; units still waiting for a worker are
    /// rejected.
    pub fn shutdown(&self) {
        if !self.inner.permits.is_closed() {
            debug!(size = self.inner.size, "worker pool shutting down");
        }
        self.inner.permits.close();
    }

    /// Returns true once [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.inner.permits.is_closed()
    }

    pub(crate) fn permits(&self) -> Arc<Semaphore> {
        Arc::clone(&self.inner.permits)
    }

    pub(crate) fn spawn<F>(&self, future: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.handle.spawn(future)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_outside_runtime_fails() {
        let err = WorkerPool::new(2).unwrap_err();
        assert!(matches!(err, EngineError::NoRuntime(_)));
    }

    #[test]
    fn test_with_handle_outside_async_context() {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let pool = WorkerPool::with_handle(3, runtime.handle().clone());
        assert_eq!(pool.size(), 3);
        assert_eq!(pool.available(), 3);
    }

    #[tokio::test]
    async fn test_zero_size_is_raised_to_one() {
        let pool = WorkerPool::new(0).unwrap();
        assert_eq!(pool.size(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_is_shared_between_clones() {
        let pool = WorkerPool::new(2).unwrap();
        let clone = pool.clone();
        assert!(!clone.is_shutdown());

        pool.shutdown();
        assert!(clone.is_shutdown());
        pool.shutdown();
        assert!(pool.is_shutdown());
    }
}
