//! Shared data models: warning records, run configuration, and the run outcome.

pub mod policy;

use crate::policy::Policy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// 1-based position of a finding inside a file.
pub struct Location {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A single analyzer finding.
pub struct Warning {
    pub filename: String,
    pub location: Location,
    pub message: String,
    pub fatal: bool,
}

impl Warning {
    pub fn new(
        filename: impl Into<String>,
        line: usize,
        column: usize,
        message: impl Into<String>,
        fatal: bool,
    ) -> Self {
        Self {
            filename: filename.into(),
            location: Location { line, column },
            message: message.into(),
            fatal,
        }
    }
}

#[derive(Debug, Clone, Default)]
/// Settings shared unchanged by every analyzer invocation of a run.
pub struct RunConfig {
    /// Normalized base path; empty means the working directory.
    pub root: String,
    pub policy: Option<Arc<Policy>>,
    /// Dependency directory name (e.g. `bower_components`).
    pub redirect: String,
}

impl RunConfig {
    /// Resolve an input descriptor against the root.
    ///
    /// The root always carries a trailing separator, so plain concatenation
    /// yields a child of the root rather than a sibling.
    pub fn resolve(&self, input: &str) -> String {
        if self.root.is_empty() || Path::new(input).is_absolute() {
            input.to_string()
        } else {
            format!("{}{}", self.root, input)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
/// Verdict for a whole run plus counters for the summary line.
///
/// `fatal` only ever moves from false to true; `join` is commutative and
/// idempotent on it, so the order in which observations arrive is irrelevant.
pub struct RunOutcome {
    pub fatal: bool,
    pub inputs: usize,
    pub failed_inputs: usize,
    pub warnings: usize,
    pub fatal_warnings: usize,
    pub guard_failures: usize,
}

impl RunOutcome {
    pub fn join(self, other: RunOutcome) -> RunOutcome {
        RunOutcome {
            fatal: self.fatal || other.fatal,
            inputs: self.inputs + other.inputs,
            failed_inputs: self.failed_inputs + other.failed_inputs,
            warnings: self.warnings + other.warnings,
            fatal_warnings: self.fatal_warnings + other.fatal_warnings,
            guard_failures: self.guard_failures + other.guard_failures,
        }
    }

    pub fn attempted() -> RunOutcome {
        RunOutcome {
            inputs: 1,
            ..RunOutcome::default()
        }
    }

    pub fn from_warning(w: &Warning) -> RunOutcome {
        RunOutcome {
            fatal: w.fatal,
            warnings: 1,
            fatal_warnings: usize::from(w.fatal),
            ..RunOutcome::default()
        }
    }

    pub fn failed_input() -> RunOutcome {
        RunOutcome {
            fatal: true,
            failed_inputs: 1,
            ..RunOutcome::default()
        }
    }

    pub fn guard_failure() -> RunOutcome {
        RunOutcome {
            fatal: true,
            guard_failures: 1,
            ..RunOutcome::default()
        }
    }

    /// Process exit status for this outcome.
    pub fn exit_code(&self) -> i32 {
        if self.fatal {
            1
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_is_monotone_on_fatal() {
        let fatal = RunOutcome::failed_input();
        let clean = RunOutcome::attempted();
        assert!(clean.join(fatal).fatal);
        assert!(fatal.join(clean).fatal);
        assert!(fatal.join(fatal).fatal);
        assert!(!clean.join(clean).fatal);
    }

    #[test]
    fn test_exit_code_tracks_fatal_only() {
        let w = Warning::new("a.html", 1, 1, "meh", false);
        let out = RunOutcome::attempted().join(RunOutcome::from_warning(&w));
        assert_eq!(out.warnings, 1);
        assert_eq!(out.exit_code(), 0);
        let f = Warning::new("a.html", 2, 3, "bad", true);
        let out = out.join(RunOutcome::from_warning(&f));
        assert_eq!(out.fatal_warnings, 1);
        assert_eq!(out.exit_code(), 1);
    }

    #[test]
    fn test_resolve_joins_relative_inputs_only() {
        let cfg = RunConfig {
            root: "app/".into(),
            ..RunConfig::default()
        };
        assert_eq!(cfg.resolve("x-foo.html"), "app/x-foo.html");
        let abs = if cfg!(windows) { "C:\\x.html" } else { "/x.html" };
        assert_eq!(cfg.resolve(abs), abs);
        assert_eq!(RunConfig::default().resolve("x.html"), "x.html");
    }

    #[test]
    fn test_warning_json_shape() {
        let w = Warning::new("a.html", 4, 2, "msg", true);
        let v = serde_json::to_value(&w).unwrap();
        assert_eq!(v["location"]["line"], 4);
        assert_eq!(v["location"]["column"], 2);
        assert_eq!(v["fatal"], true);
    }
}
