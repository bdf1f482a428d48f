use super::backend::{ConversionBackend, GENERIC_BUNDLE_ERROR};
use super::save::{SavePayload, SaveStatus, SaveTarget};
use crate::metrics::Metrics;
use crate::models::ConversionResult;
use crate::state::StateManager;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// How a call to [`ResultDistributor::download_all`] ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleOutcome {
    /// No result to bundle, or a bundle request was already in flight
    Skipped,

    /// The archive was written by the save target
    Saved { bytes: usize },

    /// The archive arrived but the user dismissed the save dialog
    Cancelled,

    Failed { message: String },
}

/// Clears the in-flight flag when the bundle request ends, however it ends
struct BundleFlight {
    flag: Arc<AtomicBool>,
}

impl BundleFlight {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for BundleFlight {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Hands generated files to the user, one at a time or bundled into a ZIP archive
pub struct ResultDistributor<B: ConversionBackend> {
    backend: Arc<B>,
    state: Arc<StateManager>,
    target: Arc<dyn SaveTarget>,
    metrics: Arc<Metrics>,
    bundling: Arc<AtomicBool>,
}

impl<B: ConversionBackend> ResultDistributor<B> {
    pub fn new(
        backend: Arc<B>,
        state: Arc<StateManager>,
        target: Arc<dyn SaveTarget>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            backend,
            state,
            target,
            metrics,
            bundling: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Save `content` as a plain text file named `filename`
    ///
    /// Local only. A failed save is logged and leaves the session state alone.
    /// Returns whether the file was written.
    pub fn download_one(&self, filename: &str, content: &str) -> bool {
        match self.target.trigger_save(&SavePayload::text(filename, content)) {
            Ok(SaveStatus::Written) => {
                self.metrics.record_artifact_saved();
                true
            }
            Ok(SaveStatus::Cancelled) => false,
            Err(e) => {
                tracing::error!("Failed to save {}: {:#}", filename, e);
                false
            }
        }
    }

    /// Save one artifact of the last result by name; unknown names are ignored
    pub fn download_artifact(&self, filename: &str) -> bool {
        let content = self.state.read(|state| {
            state
                .last_result
                .as_ref()
                .and_then(|result| result.artifact(filename))
                .map(str::to_string)
        });

        match content {
            Some(content) => self.download_one(filename, &content),
            None => {
                tracing::debug!("No artifact named {} to download", filename);
                false
            }
        }
    }

    /// Whether a bundle request is currently in flight
    pub fn is_bundling(&self) -> bool {
        self.bundling.load(Ordering::Acquire)
    }

    /// Bundle every artifact of the last result into `latex_tables.zip`
    ///
    /// Does nothing without a result or while another bundle request is in
    /// flight. Only failures touch the session state.
    pub async fn download_all(&self) -> BundleOutcome {
        let Some(bundled) = self.state.read(|state| state.last_result.clone()) else {
            tracing::debug!("Download all ignored: no result");
            return BundleOutcome::Skipped;
        };

        let Some(_flight) = BundleFlight::acquire(&self.bundling) else {
            tracing::debug!("Download all ignored: a bundle request is in flight");
            return BundleOutcome::Skipped;
        };

        tracing::info!("Bundling {} file(s)", bundled.artifacts.len());

        let response = match self.backend.bundle(&bundled.artifacts).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!("Bundle request failed: {:?}", err);
                return self.bundle_failed(&bundled, err.user_message(GENERIC_BUNDLE_ERROR));
            }
        };

        if !response.is_success() {
            tracing::error!("Bundling service returned status {}", response.status);
            return self.bundle_failed(&bundled, GENERIC_BUNDLE_ERROR.to_string());
        }

        let bytes = response.body.len();
        match self.target.trigger_save(&SavePayload::archive(response.body)) {
            Ok(SaveStatus::Written) => {
                self.metrics.record_bundle_saved();
                BundleOutcome::Saved { bytes }
            }
            Ok(SaveStatus::Cancelled) => BundleOutcome::Cancelled,
            Err(e) => {
                tracing::error!("Failed to save archive: {:#}", e);
                self.metrics.record_bundle_failed();
                BundleOutcome::Failed {
                    message: format!("{:#}", e),
                }
            }
        }
    }

    fn bundle_failed(&self, bundled: &ConversionResult, message: String) -> BundleOutcome {
        self.metrics.record_bundle_failed();
        if !self.state.report_bundle_error(bundled, message.clone()) {
            tracing::debug!("Session moved on during the bundle request; not showing the error");
        }
        BundleOutcome::Failed { message }
    }
}

impl<B: ConversionBackend> Clone for ResultDistributor<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            state: Arc::clone(&self.state),
            target: Arc::clone(&self.target),
            metrics: Arc::clone(&self.metrics),
            bundling: Arc::clone(&self.bundling),
        }
    }
}
