//! Admission Controller (C5).
//!
//! Bounded FIFO waiting plus a concurrency semaphore. The original
//! reference implementation tracked `waiting`/`running` as a plain global
//! integer mutated with `current_waiting -= 1` on an early-exit path,
//! which can double-decrement under a panic inside the `try` that already
//! decremented once. This implementation pins the increment/decrement of
//! each admission slot to a single RAII scope (`AdmissionGuard`) so a
//! panic, an early return, or a normal completion all release exactly once.

use crate::errors::SandboxError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub struct AdmissionController {
    semaphore: Arc<Semaphore>,
    waiting: AtomicUsize,
    running: AtomicUsize,
    max_queue_size: usize,
}

impl AdmissionController {
    pub fn new(max_concurrent_requests: usize, max_queue_size: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent_requests)),
            waiting: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            max_queue_size,
        }
    }

    /// Admit a request onto the queue, then suspend until an execution
    /// slot is free. Rejects immediately (no slot consumed) if the queue
    /// is already at `max_queue_size`.
    pub async fn admit(&self) -> Result<AdmissionGuard<'_>, SandboxError> {
        self.reserve_queue_slot()?;

        // `acquire_owned` on an `Arc<Semaphore>` only errs once the
        // semaphore is explicitly closed, which this service never does.
        let permit = match Arc::clone(&self.semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                self.waiting.fetch_sub(1, Ordering::SeqCst);
                return Err(SandboxError::Internal(
                    "admission semaphore closed".to_string(),
                ));
            }
        };

        self.waiting.fetch_sub(1, Ordering::SeqCst);
        self.running.fetch_add(1, Ordering::SeqCst);

        Ok(AdmissionGuard {
            controller: self,
            permit: Some(permit),
        })
    }

    fn reserve_queue_slot(&self) -> Result<(), SandboxError> {
        loop {
            let current = self.waiting.load(Ordering::SeqCst);
            if current >= self.max_queue_size {
                return Err(SandboxError::QueueFull);
            }
            if self
                .waiting
                .compare_exchange(current, current + 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return Ok(());
            }
        }
    }

    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }
}

/// An admitted, running slot. Releasing the semaphore permit and
/// decrementing `running` happen together, exactly once, on drop.
/// Covers normal completion, an early return, and a panic unwind alike.
pub struct AdmissionGuard<'a> {
    controller: &'a AdmissionController,
    permit: Option<OwnedSemaphorePermit>,
}

impl Drop for AdmissionGuard<'_> {
    fn drop(&mut self) {
        self.permit.take();
        self.controller.running.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize as StdAtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn admits_up_to_concurrency_limit() {
        let controller = AdmissionController::new(2, 10);
        let g1 = controller.admit().await.unwrap();
        let g2 = controller.admit().await.unwrap();
        assert_eq!(controller.running(), 2);
        drop(g1);
        drop(g2);
        assert_eq!(controller.running(), 0);
    }

    #[tokio::test]
    async fn rejects_when_queue_is_full() {
        let controller = Arc::new(AdmissionController::new(1, 1));
        let _running = controller.admit().await.unwrap();

        // One slot taken by `_running`; one more fits in the queue.
        let controller2 = Arc::clone(&controller);
        let waiter = tokio::spawn(async move { controller2.admit().await });

        // Give the waiter a moment to register itself as `waiting`.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(controller.waiting(), 1);

        let rejected = controller.admit().await;
        assert!(matches!(rejected, Err(SandboxError::QueueFull)));

        drop(_running);
        let waited = waiter.await.unwrap();
        assert!(waited.is_ok());
    }

    #[tokio::test]
    async fn running_returns_to_zero_after_many_concurrent_admissions() {
        let controller = Arc::new(AdmissionController::new(4, 100));
        let completed = Arc::new(StdAtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let controller = Arc::clone(&controller);
            let completed = Arc::clone(&completed);
            handles.push(tokio::spawn(async move {
                if let Ok(_guard) = controller.admit().await {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    completed.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(completed.load(Ordering::SeqCst), 20);
        assert_eq!(controller.running(), 0);
        assert_eq!(controller.waiting(), 0);
    }
}
