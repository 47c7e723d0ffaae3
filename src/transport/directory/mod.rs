//! Directory-backed transport
//!
//! Maps the work item lifecycle onto four sibling directories. Every state
//! transition is a single rename, never copy+delete:
//!
//! ```text
//! start:     incoming/...      -> processing/<name>
//! complete:  processing/<name> -> completed/<name>
//! terminate: processing/<name> -> terminated/<name>
//! fail:      processing/<name> -> incoming/<name>~retry-N, or terminated/<name>
//!                                 once the retry budget is spent
//! ```
//!
//! Moving a file out of incoming is what keeps it from being discovered again,
//! which gives one active worker per item as long as one process walks incoming.
//!
//! A rename never replaces a file. If the target name is taken, the file is
//! stored as `<target>~copy-K` with the smallest free `K >= 2`. Symbolic links
//! in incoming are skipped, not followed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{ImportError, Result};
use crate::importer::{Discovery, Transport};
use crate::metrics::{MetricsSink, NoopMetrics, INCOMING_ITEMS};
use crate::store::RemoteStore;

mod item;
mod layout;


pub use item::DirectoryItem;
pub use layout::{
    copy_file_name, parse_file_name, stored_file_name, DirectoryLayout, Stage, COMPLETED,
    COPY_MARKER, INCOMING, PROCESSING, RETRY_MARKER, TERMINATED,
};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Bounded retry policy for failed items.
///
/// An item may be processed at most `max_attempts` times. The failure that
/// uses up the last attempt moves it to `terminated` instead of back to
/// `incoming`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// `max_attempts` below 1 is treated as 1 (no retries).
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn no_retry() -> Self {
        Self::new(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

/// State shared by the transport and every item it hands out.
pub(crate) struct Shared {
    store: Arc<dyn RemoteStore>,
    layout: DirectoryLayout,
    metrics: Arc<dyn MetricsSink>,
    retry: RetryPolicy,
}

impl Shared {
    /// Path for `file_name` in `stage` that holds no file yet.
    async fn vacant_path(&self, stage: Stage, file_name: &str) -> io::Result<PathBuf> {
        let path = self.layout.path(stage, file_name);
        if !self.occupied(&path).await? {
            return Ok(path);
        }

        let mut copy = 2;
        loop {
            let path = self.layout.path(stage, &copy_file_name(file_name, copy));
            if !self.occupied(&path).await? {
                debug!("{} is taken, using {}", file_name, path.display());
                return Ok(path);
            }
            copy += 1;
        }
    }

    async fn occupied(&self, path: &Path) -> io::Result<bool> {
        match self.store.stat(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// A file sitting in one of the stage directories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedItem {
    pub name: String,
    pub file_name: String,
    pub attempts: u32,
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCounts {
    pub incoming: usize,
    pub processing: usize,
    pub completed: usize,
    pub terminated: usize,
}

impl StageCounts {
    pub fn get(&self, stage: Stage) -> usize {
        match stage {
            Stage::Incoming => self.incoming,
            Stage::Processing => self.processing,
            Stage::Completed => self.completed,
            Stage::Terminated => self.terminated,
        }
    }
}

/// Importer transport rooted at a directory with the standard layout.
#[derive(Clone)]
pub struct DirectoryTransport {
    shared: Arc<Shared>,
}

impl DirectoryTransport {
    pub fn new(store: Arc<dyn RemoteStore>, layout: DirectoryLayout) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                layout,
                metrics: Arc::new(NoopMetrics),
                retry: RetryPolicy::default(),
            }),
        }
    }

    pub fn with_metrics(self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.map_shared(|shared| Shared { metrics, ..shared })
    }

    pub fn with_retry_policy(self, retry: RetryPolicy) -> Self {
        self.map_shared(|shared| Shared { retry, ..shared })
    }

    fn map_shared(self, f: impl FnOnce(Shared) -> Shared) -> Self {
        let shared = match Arc::try_unwrap(self.shared) {
            Ok(shared) => shared,
            Err(shared) => Shared {
                store: shared.store.clone(),
                layout: shared.layout.clone(),
                metrics: shared.metrics.clone(),
                retry: shared.retry,
            },
        };
        Self {
            shared: Arc::new(f(shared)),
        }
    }

    pub fn layout(&self) -> &DirectoryLayout {
        &self.shared.layout
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.shared.retry
    }

    /// Create any of the four stage directories that are missing.
    pub async fn ensure_layout(&self) -> Result<()> {
        for stage in Stage::ALL {
            let dir = self.shared.layout.dir(stage);
            self.shared.store.create_dir_all(&dir).await?;
            debug!("Ensured {}", dir.display());
        }
        Ok(())
    }

    /// Files in `stage`, in walk order.
    pub async fn list(&self, stage: Stage) -> Result<Vec<ListedItem>> {
        let dir = self.shared.layout.dir(stage);
        let entries = self
            .shared
            .store
            .walk(&dir)
            .await
            .map_err(|source| ImportError::Discovery { path: dir, source })?;

        let mut items = Vec::new();
        for entry in entries {
            let Ok(stat) = entry.stat else { continue };
            if stat.is_dir || stat.is_symlink {
                continue;
            }
            let (name, attempts) = parse_file_name(&stat.name);
            items.push(ListedItem {
                name,
                file_name: stat.name,
                attempts,
                size: stat.size,
            });
        }
        Ok(items)
    }

    pub async fn counts(&self) -> Result<StageCounts> {
        Ok(StageCounts {
            incoming: self.list(Stage::Incoming).await?.len(),
            processing: self.list(Stage::Processing).await?.len(),
            completed: self.list(Stage::Completed).await?.len(),
            terminated: self.list(Stage::Terminated).await?.len(),
        })
    }

    /// Move an item from `processing` or `terminated` back to `incoming`
    /// with a fresh retry budget.
    ///
    /// `name` matches either the logical name or the stored file name. A file
    /// already waiting in `incoming` under the same name is kept; the requeued
    /// one becomes a copy next to it.
    /// Use this for items stranded in `processing` by a crashed process, or
    /// for dead letters an operator has reviewed.
    pub async fn requeue(&self, stage: Stage, name: &str) -> Result<()> {
        if !matches!(stage, Stage::Processing | Stage::Terminated) {
            return Err(ImportError::UnsupportedStage(stage.to_string()));
        }

        let dir = self.shared.layout.dir(stage);
        let entries = self
            .shared
            .store
            .walk(&dir)
            .await
            .map_err(|source| ImportError::Discovery {
                path: dir.clone(),
                source,
            })?;

        let found = entries.into_iter().find_map(|entry| {
            let stat = entry.stat.ok()?;
            if stat.is_dir || stat.is_symlink {
                return None;
            }
            let (logical, _) = parse_file_name(&stat.name);
            (logical == name || stat.name == name).then_some((entry.path, logical))
        });

        let Some((path, logical)) = found else {
            return Err(ImportError::NotFound {
                stage: stage.to_string(),
                name: name.to_string(),
            });
        };

        let target = self
            .shared
            .vacant_path(Stage::Incoming, &logical)
            .await
            .map_err(|source| ImportError::Transition {
                name: logical.clone(),
                from: path.clone(),
                to: self.shared.layout.path(Stage::Incoming, &logical),
                source,
            })?;
        self.shared
            .store
            .rename(&path, &target)
            .await
            .map_err(|source| ImportError::Transition {
                name: logical.clone(),
                from: path.clone(),
                to: target.clone(),
                source,
            })?;
        info!("Requeued {} from {} as {}", logical, stage, target.display());
        Ok(())
    }
}

#[async_trait]
impl Transport for DirectoryTransport {
    type Item = DirectoryItem;

    /// Walk `incoming` recursively. Every regular file is a candidate;
    /// symbolic links and entries that cannot be stat'ed are skipped.
    async fn discover(&self) -> Result<Discovery<DirectoryItem>> {
        let incoming = self.shared.layout.dir(Stage::Incoming);
        let entries = self
            .shared
            .store
            .walk(&incoming)
            .await
            .map_err(|source| ImportError::Discovery {
                path: incoming.clone(),
                source,
            })?;

        let mut discovery = Discovery::default();
        for entry in entries {
            let stat = match entry.stat {
                Ok(stat) => stat,
                Err(e) => {
                    warn!("Skipping {}: {}", entry.path.display(), e);
                    discovery.skipped += 1;
                    continue;
                }
            };
            if stat.is_dir {
                continue;
            }
            if stat.is_symlink {
                warn!("Skipping symbolic link {}", entry.path.display());
                discovery.skipped += 1;
                continue;
            }

            let (name, attempts) = parse_file_name(&stat.name);
            discovery.items.push(DirectoryItem::new(
                self.shared.clone(),
                entry.path,
                name,
                attempts,
            ));
            self.shared.metrics.incr(INCOMING_ITEMS, 1);
        }

        Ok(discovery)
    }
}
