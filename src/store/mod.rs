//! Transport client interface
//!
//! The directory transport only needs a handful of primitives from the
//! underlying store: open-for-read, stat, a recursive walk, atomic rename and
//! directory creation. Remote clients (SFTP and friends) implement
//! [`RemoteStore`]; [`LocalStore`] covers locally mounted trees.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncRead;

mod local;

pub use local::LocalStore;

/// What the store knows about one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub name: String,
    pub size: u64,
    pub is_dir: bool,
    /// Only ever set by [`RemoteStore::walk`], which does not follow links.
    pub is_symlink: bool,
}

/// One step of a recursive walk.
#[derive(Debug)]
pub struct WalkEntry {
    pub path: PathBuf,
    pub stat: io::Result<FileStat>,
}

pub type StoreReader = Box<dyn AsyncRead + Send + Unpin>;

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn open(&self, path: &Path) -> io::Result<StoreReader>;

    async fn stat(&self, path: &Path) -> io::Result<FileStat>;

    /// Walk `root` recursively. Directories are yielded as well as files.
    ///
    /// Symbolic links are reported as links and never followed, so a link
    /// back into the tree cannot make the walk revisit it.
    ///
    /// Errors on individual entries are reported in [`WalkEntry::stat`]; only
    /// a failure to read `root` itself is returned as `Err`.
    async fn walk(&self, root: &Path) -> io::Result<Vec<WalkEntry>>;

    /// Atomically move `from` to `to`.
    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    async fn create_dir_all(&self, path: &Path) -> io::Result<()>;
}
