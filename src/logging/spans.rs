//! Span wrapping one recognition call
//!
//! Records per-stage timings and the final outcome under the call's correlation id.

use crate::error::{RecognitionError, Stage};
use std::time::Instant;
use tracing::{field, span, Level, Span};
use uuid::Uuid;

pub struct RecognitionSpan {
    span: Span,
    start_time: Instant,
    stage_start: Instant,
    operation: &'static str,
}

impl RecognitionSpan {
    /// Open a span for `operation` and assign the current thread a fresh correlation id.
    pub fn new(operation: &'static str) -> Self {
        let correlation_id = crate::logging::new_correlation_id();
        Self::with_correlation_id(operation, correlation_id)
    }

    pub fn with_correlation_id(operation: &'static str, correlation_id: Uuid) -> Self {
        let span = span!(
            Level::INFO,
            "recognition",
            operation = operation,
            correlation_id = %correlation_id,
            failed_stage = field::Empty,
            elapsed_ms = field::Empty,
        );
        let now = Instant::now();
        Self {
            span,
            start_time: now,
            stage_start: now,
            operation,
        }
    }

    /// Log the time spent since the previous stage finished.
    pub fn record_stage(&mut self, stage: &str) {
        let elapsed = self.stage_start.elapsed();
        self.stage_start = Instant::now();
        tracing::debug!(
            parent: &self.span,
            stage = stage,
            stage_ms = elapsed.as_secs_f64() * 1000.0,
            "stage completed"
        );
    }

    /// Record the call outcome and release the thread's correlation id.
    pub fn finish<T: std::fmt::Debug>(self, outcome: &Result<T, RecognitionError>) {
        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        self.span.record("elapsed_ms", elapsed_ms);

        match outcome {
            Ok(value) => tracing::info!(
                parent: &self.span,
                operation = self.operation,
                result = ?value,
                elapsed_ms,
                "recognition succeeded"
            ),
            Err(err) => {
                self.span.record("failed_stage", err.stage.as_str());
                let level_is_warn = !matches!(err.stage, Stage::Capture);
                if level_is_warn {
                    tracing::warn!(
                        parent: &self.span,
                        operation = self.operation,
                        stage = %err.stage,
                        diagnostic = %err.diagnostic,
                        elapsed_ms,
                        "recognition failed"
                    );
                } else {
                    tracing::error!(
                        parent: &self.span,
                        operation = self.operation,
                        diagnostic = %err.diagnostic,
                        elapsed_ms,
                        "capture failed"
                    );
                }
            }
        }

        crate::logging::clear_correlation_id();
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Diagnostic;

    #[test]
    fn test_finish_clears_correlation_id() {
        let mut span = RecognitionSpan::new("get_temperature");
        assert!(crate::logging::get_correlation_id().is_some());

        span.record_stage("capture");
        span.finish(&Ok::<i64, RecognitionError>(24));
        assert!(crate::logging::get_correlation_id().is_none());
    }

    #[test]
    fn test_finish_on_failure() {
        let span = RecognitionSpan::new("is_power_on");
        let outcome: Result<bool, RecognitionError> = Err(RecognitionError::new(
            Stage::Alignment,
            Diagnostic::NoMatch {
                reason: "no keypoints".to_string(),
            },
        ));
        span.finish(&outcome);
        assert!(crate::logging::get_correlation_id().is_none());
    }
}
