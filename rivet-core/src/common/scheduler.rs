/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::runtime::{Handle, Runtime};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, instrument, trace};

use crate::common::config::SchedulerConfig;
use crate::common::SchedulerError;

/// A unit of work handed to the scheduler: an actor's wake loop or a network task.
pub type RunnableUnit = BoxFuture<'static, ()>;

/// Shared handle to the installed scheduler.
pub type SchedulerRef = Arc<Box<dyn Scheduler>>;

/// Runs actors and network tasks.
///
/// Only `start`, `enqueue` and `stop` are relied upon. How units are picked for execution is
/// up to the implementation.
#[async_trait]
pub trait Scheduler: Send + Sync + fmt::Debug + 'static {
    /// Prepares the scheduler to accept work. Calling it again has no effect.
    fn start(&self);

    /// Queues `unit` for execution.
    fn enqueue(&self, unit: RunnableUnit) -> Result<(), SchedulerError>;

    /// Stops the scheduler.
    ///
    /// Does not return until no enqueued unit can run anymore; work still pending is
    /// cancelled.
    async fn stop(&self);
}

enum Executor {
    /// The Tokio runtime that was current when the scheduler started.
    Ambient(Handle),
    /// A worker pool built and owned by the scheduler.
    Owned(Runtime),
}

impl Executor {
    fn handle(&self) -> Handle {
        match self {
            Self::Ambient(handle) => handle.clone(),
            Self::Owned(runtime) => runtime.handle().clone(),
        }
    }
}

/// The default scheduler: a Tokio multi-thread worker pool.
///
/// Started inside a Tokio runtime it borrows that runtime's workers; started anywhere else it
/// builds its own pool sized by [`SchedulerConfig::worker_threads`].
pub struct ThreadPoolScheduler {
    config: SchedulerConfig,
    executor: Mutex<Option<Executor>>,
    tracker: TaskTracker,
    cancellation_token: CancellationToken,
    stopped: AtomicBool,
}

impl ThreadPoolScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            executor: Mutex::new(None),
            tracker: TaskTracker::new(),
            cancellation_token: CancellationToken::new(),
            stopped: AtomicBool::new(false),
        }
    }

    /// Number of units currently tracked.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    fn build_runtime(&self) -> std::io::Result<Runtime> {
        let mut builder = tokio::runtime::Builder::new_multi_thread();
        if self.config.worker_threads > 0 {
            builder.worker_threads(self.config.worker_threads);
        }
        builder
            .thread_name(self.config.thread_name.clone())
            .enable_all()
            .build()
    }
}

#[async_trait]
impl Scheduler for ThreadPoolScheduler {
    fn start(&self) {
        if self.stopped.load(Ordering::Acquire) {
            return;
        }
        let mut executor = self.executor.lock();
        if executor.is_some() {
            return;
        }
        *executor = match Handle::try_current() {
            Ok(handle) => {
                debug!("Scheduler borrowing the ambient runtime");
                Some(Executor::Ambient(handle))
            }
            Err(_) => match self.build_runtime() {
                Ok(runtime) => {
                    debug!(threads = self.config.worker_threads, "Scheduler built its own worker pool");
                    Some(Executor::Owned(runtime))
                }
                Err(e) => {
                    error!("Failed to build scheduler runtime: {}", e);
                    None
                }
            },
        };
    }

    fn enqueue(&self, unit: RunnableUnit) -> Result<(), SchedulerError> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(SchedulerError::Stopped);
        }
        self.start();
        let handle = self
            .executor
            .lock()
            .as_ref()
            .map(Executor::handle)
            .ok_or(SchedulerError::NotStarted)?;
        let cancellation_token = self.cancellation_token.clone();
        self.tracker.spawn_on(
            async move {
                tokio::select! {
                    biased;
                    () = cancellation_token.cancelled() => {
                        trace!("Runnable unit cancelled by scheduler stop");
                    }
                    () = unit => {}
                }
            },
            &handle,
        );
        Ok(())
    }

    #[instrument(skip(self))]
    async fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        let executor = self.executor.lock().take();
        self.cancellation_token.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        if let Some(Executor::Owned(runtime)) = executor {
            runtime.shutdown_background();
        }
        debug!("Scheduler stopped");
    }
}

impl Drop for ThreadPoolScheduler {
    fn drop(&mut self) {
        if let Some(Executor::Owned(runtime)) = self.executor.get_mut().take() {
            runtime.shutdown_background();
        }
    }
}

impl fmt::Debug for ThreadPoolScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match &*self.executor.lock() {
            Some(Executor::Ambient(_)) => "ambient",
            Some(Executor::Owned(_)) => "owned",
            None => "idle",
        };
        f.debug_struct("ThreadPoolScheduler")
            .field("mode", &mode)
            .field("pending", &self.tracker.len())
            .field("stopped", &self.stopped.load(Ordering::Relaxed))
            .finish()
    }
}
