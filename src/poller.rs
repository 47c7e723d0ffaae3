//! Background driver for an importer
//!
//! The loop is poll-then-sleep: the next cycle starts `interval` after the
//! previous one finished, so a slow cycle never overlaps the next one. It runs
//! until its cancellation token fires; cancellation is only observed between
//! cycles, never in the middle of a dispatch.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::Result;
use crate::importer::{Importer, PollReport, Transport};
use crate::work_item::Worker;

/// Polls an importer on a fixed interval.
pub struct Poller<T: Transport> {
    importer: Arc<Importer<T>>,
    worker: Arc<dyn Worker>,
}

impl<T: Transport + 'static> Poller<T> {
    pub fn new(importer: Arc<Importer<T>>, worker: Arc<dyn Worker>) -> Self {
        Self { importer, worker }
    }

    /// Run exactly one poll cycle.
    pub async fn run_once(&self) -> Result<PollReport> {
        self.importer.poll(self.worker.as_ref()).await
    }

    /// Start polling in a background task.
    ///
    /// The task stops when `shutdown` (or the returned handle) is cancelled.
    pub fn start(self, interval: Duration, shutdown: CancellationToken) -> PollerHandle {
        let token = shutdown.child_token();
        let run_token = token.clone();
        let handle = tokio::spawn(async move { self.run(interval, run_token).await });
        PollerHandle { token, handle }
    }

    /// Poll until `shutdown` is cancelled. No poll error or worker panic ends
    /// the loop.
    pub async fn run(&self, interval: Duration, shutdown: CancellationToken) {
        info!("Starting poller, interval {:?}", interval);

        while !shutdown.is_cancelled() {
            self.cycle().await;

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        info!("Poller stopped");
    }

    async fn cycle(&self) -> Option<PollReport> {
        match AssertUnwindSafe(self.run_once()).catch_unwind().await {
            Ok(Ok(report)) => Some(report),
            Ok(Err(e)) => {
                error!("Poll failed: {}", e);
                None
            }
            Err(_) => {
                error!("Poll cycle panicked; continuing with the next cycle");
                None
            }
        }
    }
}

/// Handle to a running [`Poller`].
pub struct PollerHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl PollerHandle {
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel the loop and wait for the in-flight cycle, if any, to finish.
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            error!("Poller task ended abnormally: {}", e);
        }
    }
}
