//! In-memory work items and transport for tests

use async_trait::async_trait;
use std::io;
use std::sync::Mutex;

use crate::error::{ImportError, Result};
use crate::importer::{Discovery, Transport};
use crate::lifecycle::{Transition, WorkItemStatus};
use crate::work_item::WorkItem;

/// A simple work item that follows the lifecycle without touching any store.
#[derive(Debug, Clone)]
pub struct MockWorkItem {
    name: String,
    content: String,
    status: WorkItemStatus,
    history: Vec<(Transition, String)>,
    fail_start: bool,
}

impl MockWorkItem {
    /// Returns a new fresh item with the given content.
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            name: format!("mock-{}", content.len()),
            content,
            status: WorkItemStatus::Fresh,
            history: Vec::new(),
            fail_start: false,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Makes `start` return a transition error, as a store would if the
    /// claim rename failed.
    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Message passed to the most recent outcome transition.
    pub fn last_message(&self) -> Option<&str> {
        self.history.last().map(|(_, msg)| msg.as_str())
    }

    pub fn history(&self) -> &[(Transition, String)] {
        &self.history
    }

    fn transition(&mut self, transition: Transition, msg: &str) -> Result<()> {
        let next = self.status.apply(transition)?;
        self.status = next;
        self.history.push((transition, msg.to_string()));
        Ok(())
    }
}

#[async_trait]
impl WorkItem for MockWorkItem {
    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> WorkItemStatus {
        self.status
    }

    async fn content(&self) -> Result<String> {
        Ok(self.content.clone())
    }

    async fn start(&mut self) -> Result<()> {
        if self.fail_start {
            // Validate first so a bad call still reports the lifecycle error.
            self.status.apply(Transition::Start)?;
            return Err(ImportError::Transition {
                name: self.name.clone(),
                from: "mock".into(),
                to: "mock".into(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "start refused"),
            });
        }
        self.transition(Transition::Start, "")
    }

    async fn complete(&mut self, msg: &str) -> Result<()> {
        self.transition(Transition::Complete, msg)
    }

    async fn fail(&mut self, msg: &str) -> Result<()> {
        self.transition(Transition::Fail, msg)
    }

    async fn terminate(&mut self, msg: &str) -> Result<()> {
        self.transition(Transition::Terminate, msg)
    }
}

/// Transport handing out copies of a fixed set of items on every discovery.
#[derive(Debug, Default)]
pub struct MockTransport {
    items: Vec<MockWorkItem>,
    skipped: usize,
    discoveries: Mutex<usize>,
}

impl MockTransport {
    pub fn new(items: Vec<MockWorkItem>) -> Self {
        Self {
            items,
            ..Default::default()
        }
    }

    /// Report `skipped` unreadable entries alongside the items.
    pub fn with_skipped(mut self, skipped: usize) -> Self {
        self.skipped = skipped;
        self
    }

    /// Number of discovery passes run so far.
    pub fn discoveries(&self) -> usize {
        *self
            .discoveries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Item = MockWorkItem;

    async fn discover(&self) -> Result<Discovery<MockWorkItem>> {
        *self
            .discoveries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) += 1;

        Ok(Discovery {
            items: self.items.clone(),
            skipped: self.skipped,
        })
    }
}
