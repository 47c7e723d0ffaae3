use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ImportError;

pub const INCOMING: &str = "incoming";
pub const PROCESSING: &str = "processing";
pub const COMPLETED: &str = "completed";
pub const TERMINATED: &str = "terminated";

/// Separates a logical file name from its failed-attempt count,
/// e.g. `orders.csv~retry-2`.
pub const RETRY_MARKER: &str = "~retry-";

/// Separates a stored file name from a copy number when the stage already
/// holds a file of that name, e.g. `orders.csv~copy-2`.
pub const COPY_MARKER: &str = "~copy-";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Incoming,
    Processing,
    Completed,
    Terminated,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Incoming,
        Stage::Processing,
        Stage::Completed,
        Stage::Terminated,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Incoming => INCOMING,
            Stage::Processing => PROCESSING,
            Stage::Completed => COMPLETED,
            Stage::Terminated => TERMINATED,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            INCOMING => Ok(Stage::Incoming),
            PROCESSING => Ok(Stage::Processing),
            COMPLETED => Ok(Stage::Completed),
            TERMINATED => Ok(Stage::Terminated),
            _ => Err(ImportError::UnknownStage(s.to_string())),
        }
    }
}

/// Paths of the stage directories under an import root:
///
/// ```text
/// <root>/incoming     waiting for discovery, including retries
/// <root>/processing   claimed by a worker
/// <root>/completed    done
/// <root>/terminated   dead letters, kept for review
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryLayout {
    root: PathBuf,
}

impl DirectoryLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self, stage: Stage) -> PathBuf {
        self.root.join(stage.as_str())
    }

    pub fn path(&self, stage: Stage, file_name: &str) -> PathBuf {
        self.dir(stage).join(file_name)
    }
}

/// Strip a trailing `<marker><n>` from `file_name`. `n` must be a canonical
/// positive decimal; anything else is not a marker.
fn strip_counter<'a>(file_name: &'a str, marker: &str) -> Option<(&'a str, u32)> {
    let (head, count) = file_name.rsplit_once(marker)?;
    if head.is_empty() || count.starts_with('0') || !count.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    count.parse().ok().map(|n| (head, n))
}

/// Split a stored file name into its logical name and failed-attempt count.
///
/// Stored names look like `<name>[~retry-N][~copy-K]`. Both suffixes are
/// reserved: an upstream file that already ends in one is read as if the
/// transport had written it. Names without a well-formed suffix are taken
/// literally with zero attempts.
pub fn parse_file_name(file_name: &str) -> (String, u32) {
    let rest = strip_counter(file_name, COPY_MARKER).map_or(file_name, |(head, _)| head);
    match strip_counter(rest, RETRY_MARKER) {
        Some((name, attempts)) => (name.to_string(), attempts),
        None => (rest.to_string(), 0),
    }
}

/// Inverse of [`parse_file_name`] for the first copy of a name.
pub fn stored_file_name(name: &str, attempts: u32) -> String {
    if attempts == 0 {
        name.to_string()
    } else {
        format!("{name}{RETRY_MARKER}{attempts}")
    }
}

/// Name of the `copy`-th file stored under `file_name` in one stage.
pub fn copy_file_name(file_name: &str, copy: u32) -> String {
    format!("{file_name}{COPY_MARKER}{copy}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_name() {
        assert_eq!(parse_file_name("orders.csv"), ("orders.csv".to_string(), 0));
    }

    #[test]
    fn test_parse_retry_name() {
        assert_eq!(
            parse_file_name("orders.csv~retry-2"),
            ("orders.csv".to_string(), 2)
        );
        assert_eq!(stored_file_name("orders.csv", 2), "orders.csv~retry-2");
        assert_eq!(stored_file_name("orders.csv", 0), "orders.csv");
    }

    #[test]
    fn test_malformed_marker_is_literal() {
        assert_eq!(
            parse_file_name("weird~retry-x"),
            ("weird~retry-x".to_string(), 0)
        );
        assert_eq!(parse_file_name("~retry-3"), ("~retry-3".to_string(), 0));
        assert_eq!(parse_file_name("a~retry-0"), ("a~retry-0".to_string(), 0));
        assert_eq!(parse_file_name("a~retry-05"), ("a~retry-05".to_string(), 0));
        assert_eq!(parse_file_name("a~retry-+5"), ("a~retry-+5".to_string(), 0));
    }

    #[test]
    fn test_parse_copy_names() {
        assert_eq!(parse_file_name("b.txt~copy-2"), ("b.txt".to_string(), 0));
        assert_eq!(
            parse_file_name(&copy_file_name(&stored_file_name("b.txt", 1), 3)),
            ("b.txt".to_string(), 1)
        );
        // A copy suffix is only recognised outside the retry suffix.
        assert_eq!(
            parse_file_name("b.txt~copy-2~retry-1"),
            ("b.txt~copy-2".to_string(), 1)
        );
    }

    #[test]
    fn test_stage_round_trip_and_paths() {
        for stage in Stage::ALL {
            assert_eq!(stage.as_str().parse::<Stage>().unwrap(), stage);
        }
        assert!("archive".parse::<Stage>().is_err());

        let layout = DirectoryLayout::new("/data/import");
        assert_eq!(
            layout.path(Stage::Completed, "a.txt"),
            PathBuf::from("/data/import/completed/a.txt")
        );
    }
}
