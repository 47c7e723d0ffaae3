//! Error types for importer-core

use std::path::PathBuf;

use thiserror::Error;

use crate::lifecycle::{Transition, WorkItemStatus};

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Failed to list discovery location {path}")]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read content of {name}: {source}")]
    Content {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move {name} from {from} to {to}")]
    Transition {
        name: String,
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot {transition} an item that is {from}")]
    InvalidTransition {
        from: WorkItemStatus,
        transition: Transition,
    },

    #[error("No item named {name} in {stage}")]
    NotFound { stage: String, name: String },

    #[error("Unknown stage: {0}")]
    UnknownStage(String),

    #[error("Stage {0} does not support this operation")]
    UnsupportedStage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ImportError>;
