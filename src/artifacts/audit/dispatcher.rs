use crate::artifacts::ancestry::WalkMode;
use crate::artifacts::audit::queue::WorkQueue;
use anyhow::Context;
use std::any::Any;
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Unit of work handed to the audit workers
pub trait Consume: Send + 'static {
    fn consume(&mut self, mode: WalkMode);

    /// Called instead of keeping a half-consumed item when `consume` panicked
    fn abandon(&mut self, reason: &str);
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Fixed pool of blocking workers draining a shared [`WorkQueue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatcher {
    workers: usize,
}

impl Dispatcher {
    pub fn new(workers: usize) -> Self {
        Dispatcher {
            workers: workers.max(1),
        }
    }

    pub fn sequential() -> Self {
        Self::new(1)
    }

    /// One worker per available core
    pub fn with_available_parallelism() -> Self {
        Self::new(
            std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
        )
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Consume every item exactly once and return them in their original order
    pub async fn dispatch<T: Consume>(&self, items: Vec<T>, mode: WalkMode) -> anyhow::Result<Vec<T>> {
        let total = items.len();
        let workers = self.workers.clamp(1, total.max(1));
        let queue = Arc::new(WorkQueue::new(items));
        tracing::debug!(total, workers, "dispatching audit");

        let handles = (0..workers)
            .map(|worker| {
                let queue = Arc::clone(&queue);
                tokio::task::spawn_blocking(move || {
                    let mut consumed = Vec::new();
                    while let Some((index, mut item)) = queue.try_pop() {
                        let outcome =
                            std::panic::catch_unwind(AssertUnwindSafe(|| item.consume(mode)));
                        if let Err(panic) = outcome {
                            let reason = panic_message(panic.as_ref());
                            tracing::debug!(worker, index, %reason, "audit item panicked");
                            item.abandon(&reason);
                        }
                        consumed.push((index, item));
                    }
                    tracing::debug!(worker, consumed = consumed.len(), "audit worker done");
                    consumed
                })
            })
            .collect::<Vec<_>>();

        let mut consumed = Vec::with_capacity(total);
        for handle in handles {
            consumed.extend(handle.await.context("audit worker panicked")?);
        }
        consumed.sort_by_key(|(index, _)| *index);

        Ok(consumed.into_iter().map(|(_, item)| item).collect())
    }
}
