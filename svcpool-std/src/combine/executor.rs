//! Bounded worker pool shared by every combine call.

use crate::config::PoolConfig;
use crossbeam_channel::{Sender, bounded};
use parking_lot::Mutex;
use std::thread::{self, JoinHandle};
use thiserror::Error;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// The pool refused a job because it has been shut down.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("combine pool is shut down")]
pub(crate) struct Rejected;

/// Fixed set of worker threads draining one bounded queue.
///
/// Submission blocks while the queue is full.
pub struct CombineExecutor {
    sender: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl CombineExecutor {
    pub(crate) fn new(config: &PoolConfig) -> Self {
        let (sender, receiver) = bounded::<Job>(config.queue_capacity.max(1));
        let mut workers = Vec::with_capacity(config.workers);
        for id in 0..config.workers.max(1) {
            let receiver = receiver.clone();
            let spawned = thread::Builder::new()
                .name(format!("svcpool-combine-{id}"))
                .spawn(move || {
                    for job in receiver.iter() {
                        job();
                    }
                });
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(_err) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(worker = id, error = %_err, "failed to spawn combine worker");
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            workers = workers.len(),
            queue_capacity = config.queue_capacity,
            "combine pool started"
        );

        // Without workers nothing would drain the queue.
        let sender = (!workers.is_empty()).then_some(sender);
        Self {
            sender: Mutex::new(sender),
            workers: Mutex::new(workers),
        }
    }

    /// A pool that rejects every job.
    pub(crate) fn stopped() -> Self {
        Self {
            sender: Mutex::new(None),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Queue `job`, blocking while the queue is full.
    pub(crate) fn submit(&self, job: impl FnOnce() + Send + 'static) -> Result<(), Rejected> {
        let sender = self.sender.lock().clone().ok_or(Rejected)?;
        sender.send(Box::new(job)).map_err(|_| Rejected)
    }

    /// Whether the pool still accepts jobs.
    pub fn is_running(&self) -> bool {
        self.sender.lock().is_some()
    }

    /// Stop accepting jobs, let the workers drain the queue and join them.
    pub fn shutdown(&self) {
        let Some(sender) = self.sender.lock().take() else {
            return;
        };
        drop(sender);

        let workers = std::mem::take(&mut *self.workers.lock());
        let current = thread::current().id();
        for worker in workers {
            // A job that shuts the pool down runs on a worker; it cannot join itself.
            if worker.thread().id() != current {
                let _ = worker.join();
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("combine pool stopped");
    }
}

impl Drop for CombineExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
