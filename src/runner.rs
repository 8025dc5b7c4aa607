//! Sequential run orchestration.
//!
//! A run is a fold over the input list. The policy is loaded once before the
//! first input; each input is then analyzed, and its warnings reported, before
//! the next one starts. Inputs are never analyzed concurrently: output stays in
//! the order the user gave the inputs, at the cost of parallel speedup.
//!
//! Failure handling is asymmetric on purpose. A policy that cannot be loaded
//! aborts the run, because no input can be analyzed without it. A failing
//! input is reported and the run moves on to the next one.

use crate::analyzer::Analyzer;
use crate::error::PolicyLoadError;
use crate::guard::Guard;
use crate::models::{RunConfig, RunOutcome};
use crate::policy::load_policy;
use crate::reporter::Reporter;
use crate::root::normalize_root;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
/// Raw run options, before normalization and policy loading.
pub struct RunOptions {
    pub root: Option<String>,
    pub policy: Option<PathBuf>,
    pub redirect: String,
}

pub struct Runner<A: Analyzer> {
    analyzer: A,
    reporter: Reporter,
    guard: Guard,
}

impl<A: Analyzer> Runner<A> {
    pub fn new(analyzer: A, reporter: Reporter) -> Self {
        Self {
            analyzer,
            reporter,
            guard: Guard::new(),
        }
    }

    /// Build the shared run configuration; fails when the policy cannot load.
    pub async fn prepare(options: &RunOptions) -> Result<RunConfig, PolicyLoadError> {
        let root = normalize_root(options.root.as_deref());
        let policy = load_policy(options.policy.as_deref()).await?;
        Ok(RunConfig {
            root,
            policy,
            redirect: options.redirect.clone(),
        })
    }

    /// Analyze `inputs` in order and return the folded outcome.
    ///
    /// A policy load failure is printed and returned before any input is
    /// attempted.
    pub async fn run(&mut self, inputs: &[String], options: &RunOptions) -> Result<RunOutcome, PolicyLoadError> {
        let config = match Self::prepare(options).await {
            Ok(c) => c,
            Err(e) => {
                self.reporter.run_failed(&e);
                return Err(e);
            }
        };
        info!(
            inputs = inputs.len(),
            root = %config.root,
            policy = config.policy.is_some(),
            "starting run"
        );

        let mut outcome = RunOutcome::default();
        for input in inputs {
            outcome = self.run_one(input, &config, outcome).await;
        }

        for failure in self.guard.settle().await {
            outcome = self.reporter.guard_failed(&failure, outcome);
        }
        self.reporter.finish(&outcome);
        info!(fatal = outcome.fatal, "run finished");
        Ok(outcome)
    }

    async fn run_one(&mut self, input: &str, config: &RunConfig, outcome: RunOutcome) -> RunOutcome {
        debug!(input, "analyzing input");
        let mut outcome = outcome.join(RunOutcome::attempted());
        let sink = self.guard.sink();
        let settled = self
            .guard
            .supervise(input, self.analyzer.analyze(input, config, &sink))
            .await;
        match settled {
            Ok(Ok(warnings)) => {
                debug!(input, warnings = warnings.len(), "input analyzed");
                for w in &warnings {
                    outcome = self.reporter.report(w, outcome);
                }
            }
            Ok(Err(e)) => outcome = self.reporter.input_failed(input, &e, outcome),
            Err(failure) => outcome = self.reporter.guard_failed(&failure, outcome),
        }
        // Failures detached work reported while this input ran.
        for failure in self.guard.drain() {
            outcome = self.reporter.guard_failed(&failure, outcome);
        }
        outcome
    }
}

/// Exit status for a finished (or aborted) run.
pub fn exit_code(result: &Result<RunOutcome, PolicyLoadError>) -> i32 {
    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(_) => 1,
    }
}
