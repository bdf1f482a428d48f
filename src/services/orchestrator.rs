use super::backend::{
    ClientError, ConversionBackend, ConversionRequest, GENERIC_CONVERSION_ERROR, RawResponse,
};
use super::error_message::{DEFAULT_EXTRACTORS, MessageExtractor, message_or};
use super::validation::{AcceptAll, WidthPolicy};
use crate::metrics::Metrics;
use crate::models::{ConversionResult, SubmissionTicket};
use crate::state::StateManager;
use std::sync::Arc;
use std::time::Instant;

/// How a call to [`ConversionOrchestrator::submit`] ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// No file pending, or a submission was already in flight
    Skipped,

    Converted { count: usize },

    /// The message now stored as the session's last error
    Failed { message: String },
}

/// Leaves the busy state when dropped.
///
/// A submission that panics or whose future is dropped mid-request still
/// ends with `busy == false` and the generic error recorded.
struct SubmissionGuard<'a> {
    state: &'a StateManager,
    completed: bool,
}

impl<'a> SubmissionGuard<'a> {
    fn new(state: &'a StateManager) -> Self {
        Self {
            state,
            completed: false,
        }
    }

    fn complete(mut self, outcome: Result<ConversionResult, String>) {
        self.completed = true;
        self.state.complete_submission(outcome);
    }
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            tracing::warn!("Submission abandoned before it resolved");
            self.state
                .complete_submission(Err(GENERIC_CONVERSION_ERROR.to_string()));
        }
    }
}

/// Turns the pending file and configuration into one conversion request and
/// records exactly one outcome.
///
/// No error ever escapes [`submit()`](Self::submit); every failure ends up
/// in `last_error`.
pub struct ConversionOrchestrator<B: ConversionBackend> {
    backend: Arc<B>,
    state: Arc<StateManager>,
    policy: Arc<dyn WidthPolicy>,
    extractors: &'static [MessageExtractor],
    metrics: Arc<Metrics>,
}

impl<B: ConversionBackend> ConversionOrchestrator<B> {
    pub fn new(backend: Arc<B>, state: Arc<StateManager>, metrics: Arc<Metrics>) -> Self {
        Self {
            backend,
            state,
            policy: Arc::new(AcceptAll),
            extractors: DEFAULT_EXTRACTORS,
            metrics,
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn WidthPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_extractors(mut self, extractors: &'static [MessageExtractor]) -> Self {
        self.extractors = extractors;
        self
    }

    /// Submit the pending file
    ///
    /// Does nothing when no file is pending or another submission is in flight.
    pub async fn submit(&self) -> SubmitOutcome {
        let Some(ticket) = self.state.begin_submission() else {
            tracing::debug!("Submit ignored: no pending file or a submission is in flight");
            self.metrics.record_submission_skipped();
            return SubmitOutcome::Skipped;
        };

        let guard = SubmissionGuard::new(&self.state);

        match self.convert(ticket).await {
            Ok(result) => {
                let count = result.count;
                tracing::info!(
                    "Conversion produced {} file(s) from sheets {:?}",
                    count,
                    result.sheet_names
                );
                self.metrics.record_conversion_succeeded();
                guard.complete(Ok(result));
                SubmitOutcome::Converted { count }
            }
            Err(err) => {
                let message = err.user_message(GENERIC_CONVERSION_ERROR);
                tracing::error!("Conversion failed: {:?}", err);
                self.metrics.record_conversion_failed();
                guard.complete(Err(message.clone()));
                SubmitOutcome::Failed { message }
            }
        }
    }

    async fn convert(&self, ticket: SubmissionTicket) -> Result<ConversionResult, ClientError> {
        self.policy
            .validate(&ticket.config)
            .map_err(ClientError::Validation)?;

        let request = ConversionRequest::new(ticket.file, &ticket.config)?;

        tracing::info!(
            "Converting {} (excluded: {:?})",
            request.file.name,
            ticket.config.excluded_columns
        );
        self.metrics.record_submission_started();

        let started = Instant::now();
        let response = self.backend.convert(request).await;
        self.metrics.record_request_time(started.elapsed());

        self.interpret(response?)
    }

    /// Map a raw service response to a result or a failure carrying the best message available
    pub fn interpret(&self, response: RawResponse) -> Result<ConversionResult, ClientError> {
        if !response.is_success() {
            return Err(ClientError::Rejected {
                status: response.status,
                message: message_or(&response.body, self.extractors, GENERIC_CONVERSION_ERROR),
            });
        }

        serde_json::from_slice(&response.body)
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}

impl<B: ConversionBackend> Clone for ConversionOrchestrator<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            state: Arc::clone(&self.state),
            policy: Arc::clone(&self.policy),
            extractors: self.extractors,
            metrics: Arc::clone(&self.metrics),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InputFile;
    use indexmap::IndexMap;

    /// Backend that must never be reached
    struct Unreachable;

    impl ConversionBackend for Unreachable {
        async fn convert(&self, _request: ConversionRequest) -> Result<RawResponse, ClientError> {
            panic!("convert should not be called")
        }

        async fn bundle(
            &self,
            _artifacts: &IndexMap<String, String>,
        ) -> Result<RawResponse, ClientError> {
            panic!("bundle should not be called")
        }
    }

    fn orchestrator() -> ConversionOrchestrator<Unreachable> {
        ConversionOrchestrator::new(
            Arc::new(Unreachable),
            Arc::new(StateManager::new()),
            Arc::new(Metrics::new()),
        )
    }

    #[test]
    fn test_interpret_success_ignores_extra_fields() {
        let body = br#"{"files":{"Sheet1.tex":"x"},"count":1,"sheet_names":["Sheet1"],"debug":{"rows":3}}"#;
        let result = orchestrator()
            .interpret(RawResponse::new(200, body.to_vec()))
            .unwrap();

        assert_eq!(result.count, 1);
        assert_eq!(result.artifact("Sheet1.tex"), Some("x"));
    }

    #[test]
    fn test_interpret_rejection_uses_detail() {
        let err = orchestrator()
            .interpret(RawResponse::new(400, br#"{"detail":"Bad sheet"}"#.to_vec()))
            .unwrap_err();

        assert!(matches!(err, ClientError::Rejected { status: 400, ref message } if message == "Bad sheet"));
    }

    #[test]
    fn test_interpret_empty_rejection_is_generic() {
        let err = orchestrator()
            .interpret(RawResponse::new(500, Vec::new()))
            .unwrap_err();
        assert_eq!(err.to_string(), GENERIC_CONVERSION_ERROR);
    }

    #[test]
    fn test_interpret_garbage_success_body() {
        let err = orchestrator()
            .interpret(RawResponse::new(200, b"<html>".to_vec()))
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidResponse(_)));
    }

    #[test]
    fn test_custom_extractors() {
        fn always(_: &[u8]) -> Option<String> {
            Some("custom".to_string())
        }
        static ONLY: &[MessageExtractor] = &[always];

        let err = orchestrator()
            .with_extractors(ONLY)
            .interpret(RawResponse::new(422, br#"{"detail":"x"}"#.to_vec()))
            .unwrap_err();
        assert_eq!(err.to_string(), "custom");
    }

    #[tokio::test]
    async fn test_submit_without_file_is_skipped() {
        let orchestrator = orchestrator();
        assert_eq!(orchestrator.submit().await, SubmitOutcome::Skipped);
        assert_eq!(
            orchestrator
                .metrics
                .submissions_skipped
                .load(std::sync::atomic::Ordering::Relaxed),
            1
        );
    }

    #[tokio::test]
    async fn test_policy_rejection_never_reaches_backend() {
        let orchestrator = orchestrator().with_policy(Arc::new(crate::services::RangePolicy::default()));
        orchestrator
            .state
            .select_file(Some(InputFile::new("lod.xlsx", vec![1u8])));
        orchestrator
            .state
            .set_column_width(crate::models::WidthClass::First, "40");

        let outcome = orchestrator.submit().await;

        assert!(matches!(outcome, SubmitOutcome::Failed { .. }));
        let state = orchestrator.state.snapshot();
        assert!(!state.busy);
        assert!(state.last_result.is_none());
        assert!(state.last_error.unwrap().contains("first column"));

        let metrics = &orchestrator.metrics;
        assert_eq!(metrics.submissions_started.load(std::sync::atomic::Ordering::Relaxed), 0);
        assert_eq!(metrics.conversions_failed.load(std::sync::atomic::Ordering::Relaxed), 1);
        assert_eq!(metrics.total_request_time_ms.load(std::sync::atomic::Ordering::Relaxed), 0);
    }

    #[test]
    fn test_dropped_guard_resets_busy() {
        let state = StateManager::new();
        state.select_file(Some(InputFile::new("lod.xlsx", vec![1u8])));
        state.begin_submission().unwrap();

        drop(SubmissionGuard::new(&state));

        let snapshot = state.snapshot();
        assert!(!snapshot.busy);
        assert_eq!(snapshot.last_error.as_deref(), Some(GENERIC_CONVERSION_ERROR));
    }
}
