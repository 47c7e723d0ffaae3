//! Importer: discovery and dispatch
//!
//! The importer is a pure dispatcher. It asks a transport for the items
//! currently eligible, hands each one to the worker in discovery order, and
//! never interprets the worker's result as an outcome. Everything durable
//! lives in the transport.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::error::{ImportError, Result};
use crate::lifecycle::WorkItemStatus;
use crate::work_item::{WorkItem, Worker};


/// Items found by one discovery pass.
#[derive(Debug)]
pub struct Discovery<I> {
    pub items: Vec<I>,
    /// Entries that could not be turned into items (stat/open failures).
    pub skipped: usize,
}

impl<I> Default for Discovery<I> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            skipped: 0,
        }
    }
}

/// A concrete store that realizes discovery for work items.
#[async_trait]
pub trait Transport: Send + Sync {
    type Item: WorkItem + 'static;

    /// List the items currently sitting in the discovery location.
    ///
    /// Failures on individual entries are logged and counted in
    /// [`Discovery::skipped`]; only a failure to list the location at all is
    /// an error.
    async fn discover(&self) -> Result<Discovery<Self::Item>>;
}

/// Summary of one poll cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollReport {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub discovered: usize,
    pub skipped: usize,
    pub dispatched: usize,
    pub worker_errors: usize,
    /// Status of each dispatched item once the worker returned.
    pub outcomes: BTreeMap<WorkItemStatus, usize>,
}

impl PollReport {
    fn new() -> Self {
        Self {
            cycle_id: Uuid::new_v4(),
            started_at: Utc::now(),
            discovered: 0,
            skipped: 0,
            dispatched: 0,
            worker_errors: 0,
            outcomes: BTreeMap::new(),
        }
    }

    pub fn outcome(&self, status: WorkItemStatus) -> usize {
        self.outcomes.get(&status).copied().unwrap_or(0)
    }
}

/// Discovers ready work items from a transport and invokes a worker for each.
pub struct Importer<T: Transport> {
    transport: T,
    /// Held for discovery plus dispatch so two polls never see the same item.
    poll_lock: Mutex<()>,
}

impl<T: Transport> Importer<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            poll_lock: Mutex::new(()),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Poll for importable work and dispatch every discovered item to `worker`.
    ///
    /// Dispatch is sequential: the worker for item n+1 runs only after the
    /// worker for item n returned. Returns once every item was dispatched.
    pub async fn poll(&self, worker: &dyn Worker) -> Result<PollReport> {
        let mut report = PollReport::new();
        let span = tracing::info_span!("poll", cycle = %report.cycle_id);

        async {
            let _guard = match self.poll_lock.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    debug!("Another poll is in flight, waiting for it to finish");
                    self.poll_lock.lock().await
                }
            };

            let discovery = self.transport.discover().await?;
            report.discovered = discovery.items.len();
            report.skipped = discovery.skipped;
            info!(
                "Items to import: {} ({} skipped)",
                report.discovered, report.skipped
            );

            for mut item in discovery.items {
                let name = item.name().to_string();
                debug!(item = %name, "Dispatching");

                let result = worker.handle(&mut item).await;
                report.dispatched += 1;
                let status = item.status();
                *report.outcomes.entry(status).or_insert(0) += 1;

                match result {
                    Ok(()) => {
                        if matches!(status, WorkItemStatus::Fresh | WorkItemStatus::Processing) {
                            warn!(item = %name, %status, "Worker returned without deciding an outcome");
                        }
                    }
                    Err(e) => {
                        report.worker_errors += 1;
                        if matches!(status, WorkItemStatus::Failed | WorkItemStatus::Terminated) {
                            debug!(item = %name, %status, "Worker error: {:#}", e);
                        } else {
                            warn!(
                                item = %name,
                                %status,
                                "Worker returned an error but did not fail or terminate the item: {:#}",
                                e
                            );
                        }
                    }
                }
            }

            info!(
                "Poll complete: {} dispatched, {} worker errors",
                report.dispatched, report.worker_errors
            );
            Ok::<(), ImportError>(())
        }
        .instrument(span)
        .await?;

        Ok(report)
    }
}
