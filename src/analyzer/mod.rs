//! Analyzer contract consumed by the run orchestrator.

pub mod source;

use crate::error::AnalyzerError;
use crate::guard::FailureSink;
use crate::models::{RunConfig, Warning};
use async_trait::async_trait;

pub use source::SourceAnalyzer;

/// Produces warnings for one input descriptor.
///
/// Implementations get the run's shared configuration and a [`FailureSink`]
/// for reporting failures from work they detach from the returned future.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(
        &self,
        input: &str,
        config: &RunConfig,
        failures: &FailureSink,
    ) -> Result<Vec<Warning>, AnalyzerError>;
}
