//! Concrete transports

pub mod directory;

pub use directory::{
    DirectoryItem, DirectoryLayout, DirectoryTransport, ListedItem, RetryPolicy, Stage,
    StageCounts,
};
