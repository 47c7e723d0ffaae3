use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::{FileStat, RemoteStore, StoreReader, WalkEntry};

/// [`RemoteStore`] backed by the local file system.
///
/// Walks visit entries depth first, sorted by name within each directory,
/// and never descend through symbolic links.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStore;

impl LocalStore {
    pub fn new() -> Self {
        Self
    }
}

fn file_stat(path: &Path, metadata: &std::fs::Metadata) -> FileStat {
    FileStat {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        size: metadata.len(),
        is_dir: metadata.is_dir(),
        is_symlink: metadata.file_type().is_symlink(),
    }
}

async fn sorted_children(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut reader = fs::read_dir(dir).await?;
    let mut children = Vec::new();
    while let Some(entry) = reader.next_entry().await? {
        children.push(entry.path());
    }
    children.sort();
    Ok(children)
}

#[async_trait]
impl RemoteStore for LocalStore {
    async fn open(&self, path: &Path) -> io::Result<StoreReader> {
        let file = fs::File::open(path).await?;
        Ok(Box::new(file))
    }

    async fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let metadata = fs::metadata(path).await?;
        Ok(file_stat(path, &metadata))
    }

    async fn walk(&self, root: &Path) -> io::Result<Vec<WalkEntry>> {
        let mut entries = Vec::new();
        // Reversed so that popping yields name order.
        let mut stack: Vec<PathBuf> = sorted_children(root).await?.into_iter().rev().collect();

        while let Some(path) = stack.pop() {
            let stat = fs::symlink_metadata(&path)
                .await
                .map(|m| file_stat(&path, &m));
            let is_dir = matches!(&stat, Ok(s) if s.is_dir);
            entries.push(WalkEntry {
                path: path.clone(),
                stat,
            });

            if is_dir {
                match sorted_children(&path).await {
                    Ok(children) => stack.extend(children.into_iter().rev()),
                    Err(e) => entries.push(WalkEntry {
                        path,
                        stat: Err(e),
                    }),
                }
            }
        }

        Ok(entries)
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to).await
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path).await
    }
}
