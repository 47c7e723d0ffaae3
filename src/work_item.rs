//! Work item and worker contracts
//!
//! Items are produced by a [`crate::importer::Transport`]. A [`Worker`] owns the
//! outcome: it calls `start`, then one of `complete`, `fail` or `terminate`.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::Result;
use crate::lifecycle::WorkItemStatus;

#[async_trait]
pub trait WorkItem: Send + Sync {
    /// Logical name of the item, stable across retries.
    fn name(&self) -> &str;

    fn status(&self) -> WorkItemStatus;

    /// Full content of the item. Has no side effects.
    async fn content(&self) -> Result<String>;

    /// Claim the item. Once this succeeds, discovery no longer returns it.
    async fn start(&mut self) -> Result<()>;

    /// Terminal success.
    async fn complete(&mut self, msg: &str) -> Result<()>;

    /// Recoverable failure; the transport decides whether and when the item
    /// comes back.
    async fn fail(&mut self, msg: &str) -> Result<()>;

    /// Terminal failure. The item is parked for an operator.
    async fn terminate(&mut self, msg: &str) -> Result<()>;
}

/// Handles the import of a single item.
///
/// The returned error is only logged by the importer; the item's state is
/// whatever transition the worker called.
#[async_trait]
pub trait Worker: Send + Sync {
    async fn handle(&self, item: &mut dyn WorkItem) -> anyhow::Result<()>;
}

#[async_trait]
impl<W: Worker + ?Sized> Worker for Arc<W> {
    async fn handle(&self, item: &mut dyn WorkItem) -> anyhow::Result<()> {
        (**self).handle(item).await
    }
}

/// Adapter turning a function into a [`Worker`].
pub struct FnWorker<F> {
    f: F,
}

/// Wrap a function as a [`Worker`].
///
/// ```ignore
/// use futures::FutureExt;
///
/// let worker = worker_fn(|item| {
///     async move {
///         item.start().await?;
///         item.complete("ok").await?;
///         anyhow::Ok(())
///     }
///     .boxed()
/// });
/// ```
pub fn worker_fn<F>(f: F) -> FnWorker<F>
where
    F: for<'a> Fn(&'a mut dyn WorkItem) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync,
{
    FnWorker { f }
}

#[async_trait]
impl<F> Worker for FnWorker<F>
where
    F: for<'a> Fn(&'a mut dyn WorkItem) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync,
{
    async fn handle(&self, item: &mut dyn WorkItem) -> anyhow::Result<()> {
        (self.f)(item).await
    }
}
