//! Rendering of warnings, failures and the run summary.
//!
//! Supports `human` (default) and `json` output. In JSON mode each warning is
//! one compact object per line so that output streams in input order, followed
//! by a final `{"summary": ...}` line. Errors always go to the error stream as
//! text.

use crate::guard::GuardFailure;
use crate::models::{RunOutcome, Warning};
use crate::utils;
use owo_colors::OwoColorize;
use serde_json::json;
use std::fmt;
use std::io::{self, Write};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Human,
    Json,
}

impl OutputMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" => Some(Self::Human),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Consumes warnings one at a time and folds their fatality into the outcome.
pub struct Reporter {
    mode: OutputMode,
    color: bool,
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
}

impl Reporter {
    pub fn new(mode: OutputMode, out: Box<dyn Write + Send>, err: Box<dyn Write + Send>) -> Self {
        Self {
            mode,
            color: false,
            out,
            err,
        }
    }

    /// Reporter bound to stdout/stderr, colored unless disabled.
    pub fn stdio(mode: OutputMode) -> Self {
        let mut r = Self::new(mode, Box::new(io::stdout()), Box::new(io::stderr()));
        r.color = mode == OutputMode::Human && utils::colors_enabled();
        r
    }

    /// Print one warning and return `outcome` joined with its fatality.
    pub fn report(&mut self, w: &Warning, outcome: RunOutcome) -> RunOutcome {
        let line = match self.mode {
            OutputMode::Json => compose_warning_json(w),
            OutputMode::Human => self.human_line(w),
        };
        Self::emit(self.out.as_mut(), format_args!("{line}"));
        outcome.join(RunOutcome::from_warning(w))
    }

    /// Print an analyzer failure for `input`.
    pub fn input_failed(&mut self, input: &str, error: &dyn fmt::Display, outcome: RunOutcome) -> RunOutcome {
        let prefix = self.error_prefix();
        Self::emit(self.err.as_mut(), format_args!("{prefix} {input}: {error}"));
        outcome.join(RunOutcome::failed_input())
    }

    /// Print a failure caught by the guard.
    pub fn guard_failed(&mut self, failure: &GuardFailure, outcome: RunOutcome) -> RunOutcome {
        let prefix = self.error_prefix();
        Self::emit(
            self.err.as_mut(),
            format_args!("{prefix} unhandled failure in {}: {}", failure.origin, failure.message),
        );
        outcome.join(RunOutcome::guard_failure())
    }

    /// Print a run-fatal error (e.g. the policy could not be loaded).
    pub fn run_failed(&mut self, error: &dyn fmt::Display) {
        let prefix = self.error_prefix();
        Self::emit(self.err.as_mut(), format_args!("{prefix} {error}"));
    }

    /// Print the summary line and flush.
    pub fn finish(&mut self, outcome: &RunOutcome) {
        match self.mode {
            OutputMode::Json => {
                let s = json!({ "summary": outcome }).to_string();
                Self::emit(self.out.as_mut(), format_args!("{s}"));
            }
            OutputMode::Human => {
                let summary = format!(
                    "— Summary — inputs={} failed={} warnings={} fatal={} unhandled={}",
                    outcome.inputs,
                    outcome.failed_inputs,
                    outcome.warnings,
                    outcome.fatal_warnings,
                    outcome.guard_failures
                );
                if self.color {
                    Self::emit(self.out.as_mut(), format_args!("{}", summary.bold()));
                } else {
                    Self::emit(self.out.as_mut(), format_args!("{summary}"));
                }
            }
        }
        if let Err(e) = self.out.flush().and_then(|_| self.err.flush()) {
            debug!("flush failed: {e}");
        }
    }

    fn human_line(&self, w: &Warning) -> String {
        let color = self.color;
        let (icon, sev) = if w.fatal {
            if color {
                ("✖".red().to_string(), "⟦fatal⟧".red().bold().to_string())
            } else {
                ("✖".to_string(), "⟦fatal⟧".to_string())
            }
        } else if color {
            ("▲".yellow().to_string(), "⟦warn⟧".yellow().bold().to_string())
        } else {
            ("▲".to_string(), "⟦warn⟧".to_string())
        };
        let pos = format!(
            "{}:{}:{}",
            utils::display_path(&w.filename),
            w.location.line,
            w.location.column
        );
        let pos = if color { pos.bold().to_string() } else { pos };
        format!("{} {} {} — {}", icon, sev, pos, w.message)
    }

    fn error_prefix(&self) -> String {
        if self.color {
            utils::error_prefix()
        } else {
            "error:".to_string()
        }
    }

    fn emit(w: &mut dyn Write, args: fmt::Arguments<'_>) {
        // Reporting must never abort the run; a closed pipe only loses output.
        if let Err(e) = writeln!(w, "{args}") {
            debug!("write failed: {e}");
        }
    }
}

/// One warning as a compact JSON line, using the `Warning` serde layout.
pub fn compose_warning_json(w: &Warning) -> String {
    serde_json::to_string(w).unwrap_or_else(|e| {
        debug!("cannot serialize warning: {e}");
        json!({ "filename": w.filename, "message": w.message, "fatal": w.fatal }).to_string()
    })
}
