//! Structured stdout logging for the pipeline and grid search.
//!
//! Progress output is plain human-readable lines, not a protocol. The
//! `Debug` level mirrors the per-candidate chatter of an exhaustive
//! search; `Info` reports only the pipeline milestones.

use std::fmt::Display;

/// How much progress output to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// No output.
    Silent,
    /// Pipeline milestones: shapes, best parameters, final scores.
    #[default]
    Info,
    /// Milestones plus per-candidate cross-validation scores.
    Debug,
}

/// Stdout logger carried through the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct SearchLogger {
    verbosity: Verbosity,
}

impl SearchLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    /// A silent logger, for library callers that manage their own output.
    pub fn silent() -> Self {
        Self::new(Verbosity::Silent)
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Log a pipeline milestone.
    pub fn info(&self, msg: impl Display) {
        if !matches!(self.verbosity, Verbosity::Silent) {
            println!("{msg}");
        }
    }

    /// Log per-candidate detail.
    pub fn debug(&self, msg: impl Display) {
        if matches!(self.verbosity, Verbosity::Debug) {
            println!("{msg}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_verbosity_is_info() {
        assert_eq!(Verbosity::default(), Verbosity::Info);
    }

    #[test]
    fn silent_logger_reports_verbosity() {
        assert_eq!(SearchLogger::silent().verbosity(), Verbosity::Silent);
    }
}
