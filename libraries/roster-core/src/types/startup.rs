/// Types shared by the startup sequence and its collaborators
use serde::Serialize;
use std::fmt;

/// Result of a single readiness probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The service accepts connections
    Ready,

    /// The service answered but refuses connections for now
    /// (e.g. still starting up or in recovery)
    NotReady(String),

    /// Nothing answered: DNS failure, refused or timed out connection
    Unreachable(String),
}

impl ProbeOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::NotReady(reason) => write!(f, "not ready: {reason}"),
            Self::Unreachable(reason) => write!(f, "unreachable: {reason}"),
        }
    }
}

/// What a migration run did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Versions applied by this run, in order
    pub applied: Vec<i64>,

    /// Number of migrations known to the binary
    pub total: usize,
}

impl MigrationReport {
    /// True when the schema was already up to date
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_ready_is_ready() {
        assert!(ProbeOutcome::Ready.is_ready());
        assert!(!ProbeOutcome::NotReady("starting up".into()).is_ready());
        assert!(!ProbeOutcome::Unreachable("connection refused".into()).is_ready());
    }

    #[test]
    fn empty_report_is_noop() {
        let report = MigrationReport {
            applied: vec![],
            total: 2,
        };
        assert!(report.is_noop());

        let report = MigrationReport {
            applied: vec![1, 2],
            total: 2,
        };
        assert!(!report.is_noop());
    }
}
