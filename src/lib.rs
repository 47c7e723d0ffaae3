pub mod cli;
pub mod config;
pub mod error;
pub mod importer;
pub mod lifecycle;
pub mod logging;
pub mod metrics;
pub mod mock;
pub mod poller;
pub mod store;
pub mod transport;
pub mod work_item;

// Re-export main types
pub use error::{ImportError, Result};
pub use importer::{Discovery, Importer, PollReport, Transport};
pub use lifecycle::{Transition, WorkItemStatus};
pub use poller::{Poller, PollerHandle};
pub use work_item::{worker_fn, FnWorker, WorkItem, Worker};

// Re-export the bundled transport for convenience
pub use store::{LocalStore, RemoteStore};
pub use transport::{DirectoryItem, DirectoryLayout, DirectoryTransport, RetryPolicy, Stage};
