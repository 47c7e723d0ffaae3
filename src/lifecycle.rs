//! Work item lifecycle
//!
//! ```text
//! FRESH --start--> PROCESSING --complete--> COMPLETED
//!                             --fail------> FAILED
//!                             --terminate-> TERMINATED
//! ```
//!
//! How a `FAILED` item becomes `FRESH` again is up to the transport.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ImportError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkItemStatus {
    Fresh,
    Processing,
    Completed,
    Failed,
    Terminated,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    Start,
    Complete,
    Fail,
    Terminate,
}

impl WorkItemStatus {
    /// `COMPLETED` and `TERMINATED` accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkItemStatus::Completed | WorkItemStatus::Terminated)
    }

    /// Returns the status reached by applying `transition`, or
    /// [`ImportError::InvalidTransition`] if the pair is not in the table above.
    pub fn apply(self, transition: Transition) -> Result<WorkItemStatus> {
        use Transition::*;
        use WorkItemStatus::*;

        match (self, transition) {
            (Fresh, Start) => Ok(Processing),
            (Processing, Complete) => Ok(Completed),
            (Processing, Fail) => Ok(Failed),
            (Processing, Terminate) => Ok(Terminated),
            (from, transition) => Err(ImportError::InvalidTransition { from, transition }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkItemStatus::Fresh => "FRESH",
            WorkItemStatus::Processing => "PROCESSING",
            WorkItemStatus::Completed => "COMPLETED",
            WorkItemStatus::Failed => "FAILED",
            WorkItemStatus::Terminated => "TERMINATED",
        }
    }
}

impl fmt::Display for WorkItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Transition::Start => "start",
            Transition::Complete => "complete",
            Transition::Fail => "fail",
            Transition::Terminate => "terminate",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Transition::*;
    use WorkItemStatus::*;

    const ALL_STATUSES: [WorkItemStatus; 5] = [Fresh, Processing, Completed, Failed, Terminated];
    const ALL_TRANSITIONS: [Transition; 4] = [Start, Complete, Fail, Terminate];

    #[test]
    fn test_happy_paths() {
        assert_eq!(Fresh.apply(Start).unwrap(), Processing);
        assert_eq!(Processing.apply(Complete).unwrap(), Completed);
        assert_eq!(Processing.apply(Fail).unwrap(), Failed);
        assert_eq!(Processing.apply(Terminate).unwrap(), Terminated);
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for from in [Completed, Terminated] {
            assert!(from.is_terminal());
            for transition in ALL_TRANSITIONS {
                let err = from.apply(transition).unwrap_err();
                assert!(
                    matches!(err, ImportError::InvalidTransition { from: f, transition: t } if f == from && t == transition),
                    "{from} should reject {transition}"
                );
            }
        }
    }

    #[test]
    fn test_exactly_two_terminal_states() {
        let terminal: Vec<_> = ALL_STATUSES.iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminal, vec![&Completed, &Terminated]);
    }

    #[test]
    fn test_start_cannot_be_repeated() {
        let processing = Fresh.apply(Start).unwrap();
        assert!(processing.apply(Start).is_err());
    }

    #[test]
    fn test_outcomes_require_processing() {
        for transition in [Complete, Fail, Terminate] {
            assert!(Fresh.apply(transition).is_err());
            assert!(Failed.apply(transition).is_err());
        }
    }

    #[test]
    fn test_status_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Processing).unwrap(), "\"PROCESSING\"");
        let parsed: WorkItemStatus = serde_json::from_str("\"TERMINATED\"").unwrap();
        assert_eq!(parsed, Terminated);
        assert_eq!(Failed.to_string(), "FAILED");
    }
}
