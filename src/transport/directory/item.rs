use async_trait::async_trait;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

use super::layout::{stored_file_name, Stage};
use super::Shared;
use crate::error::{ImportError, Result};
use crate::lifecycle::{Transition, WorkItemStatus};
use crate::metrics::{FILE_COMPLETE, FILE_FAILURE, FILE_TERMINAL};
use crate::work_item::WorkItem;

/// A file in a directory-backed import location.
pub struct DirectoryItem {
    shared: Arc<Shared>,
    path: PathBuf,
    name: String,
    attempts: u32,
    status: WorkItemStatus,
}

impl DirectoryItem {
    pub(super) fn new(shared: Arc<Shared>, path: PathBuf, name: String, attempts: u32) -> Self {
        Self {
            shared,
            path,
            name,
            attempts,
            status: WorkItemStatus::Fresh,
        }
    }

    /// Current location of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Failed attempts recorded before this one.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Rename the file into `stage` under `file_name`, or under a copy name if
    /// that is taken. The item keeps its old path if the rename fails.
    async fn move_to(&mut self, stage: Stage, file_name: &str) -> Result<()> {
        let transition_err = |to: PathBuf, source: io::Error| ImportError::Transition {
            name: self.name.clone(),
            from: self.path.clone(),
            to,
            source,
        };

        let target = self
            .shared
            .vacant_path(stage, file_name)
            .await
            .map_err(|e| transition_err(self.shared.layout.path(stage, file_name), e))?;
        self.shared
            .store
            .rename(&self.path, &target)
            .await
            .map_err(|e| transition_err(target.clone(), e))?;
        self.path = target;
        Ok(())
    }
}

impl fmt::Debug for DirectoryItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryItem")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("attempts", &self.attempts)
            .field("status", &self.status)
            .finish()
    }
}

#[async_trait]
impl WorkItem for DirectoryItem {
    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> WorkItemStatus {
        self.status
    }

    async fn content(&self) -> Result<String> {
        let content_err = |source: io::Error| ImportError::Content {
            name: self.name.clone(),
            source,
        };

        let mut reader = self.shared.store.open(&self.path).await.map_err(content_err)?;
        let stat = self.shared.store.stat(&self.path).await.map_err(content_err)?;
        let size = usize::try_from(stat.size).map_err(|_| {
            content_err(io::Error::new(io::ErrorKind::InvalidData, "file too large"))
        })?;

        let mut bytes = vec![0u8; size];
        reader.read_exact(&mut bytes).await.map_err(content_err)?;

        String::from_utf8(bytes)
            .map_err(|e| content_err(io::Error::new(io::ErrorKind::InvalidData, e)))
    }

    async fn start(&mut self) -> Result<()> {
        let next = self.status.apply(Transition::Start)?;
        // Keep the attempt count so a crash mid-processing does not reset it.
        let file_name = stored_file_name(&self.name, self.attempts);
        self.move_to(Stage::Processing, &file_name).await?;
        self.status = next;
        Ok(())
    }

    async fn complete(&mut self, msg: &str) -> Result<()> {
        let next = self.status.apply(Transition::Complete)?;
        let name = self.name.clone();
        self.move_to(Stage::Completed, &name).await?;
        self.status = next;
        self.shared.metrics.incr(FILE_COMPLETE, 1);
        info!(item = %self.name, "Completed: {}", msg);
        Ok(())
    }

    async fn fail(&mut self, msg: &str) -> Result<()> {
        let next = self.status.apply(Transition::Fail)?;
        let attempts = self.attempts + 1;
        let name = self.name.clone();

        if attempts >= self.shared.retry.max_attempts {
            self.move_to(Stage::Terminated, &name).await?;
            self.attempts = attempts;
            self.status = WorkItemStatus::Terminated;
            self.shared.metrics.incr(FILE_FAILURE, 1);
            self.shared.metrics.incr(FILE_TERMINAL, 1);
            warn!(
                item = %self.name,
                attempts,
                "Retries exhausted, moved to {}: {}",
                Stage::Terminated,
                msg
            );
            return Ok(());
        }

        self.move_to(Stage::Incoming, &stored_file_name(&name, attempts))
            .await?;
        self.attempts = attempts;
        self.status = next;
        self.shared.metrics.incr(FILE_FAILURE, 1);
        warn!(
            item = %self.name,
            attempts,
            max_attempts = self.shared.retry.max_attempts,
            "Failed, queued for retry: {}",
            msg
        );
        Ok(())
    }

    async fn terminate(&mut self, msg: &str) -> Result<()> {
        let next = self.status.apply(Transition::Terminate)?;
        let name = self.name.clone();
        self.move_to(Stage::Terminated, &name).await?;
        self.status = next;
        self.shared.metrics.incr(FILE_TERMINAL, 1);
        warn!(item = %self.name, "Terminated: {}", msg);
        Ok(())
    }
}
