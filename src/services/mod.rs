//! Services module - talking to the conversion service and delivering its output.
//!
//! Nothing here depends on the UI layer; the window drives these types through
//! the [`StateManager`](crate::state::StateManager) and they report back only
//! by updating state.
//!
//! # Components
//!
//! - [`ConversionBackend`]: the remote seam. [`HttpBackend`] posts multipart
//!   uploads and JSON bundles with `reqwest`; tests substitute in-memory fakes.
//! - [`ConversionOrchestrator`]: runs one submission end to end:
//!   - Enters the busy state atomically (one submission at a time)
//!   - Applies the configured [`WidthPolicy`]
//!   - Sends exactly one request, no retries
//!   - Records exactly one outcome and always leaves the busy state
//! - [`ResultDistributor`]: saves single `.tex` files and the bundled
//!   `latex_tables.zip` through a [`SaveTarget`].
//! - [`error_message`]: ordered strategies for pulling a readable message out
//!   of a failed response.
//!
//! # Usage Example
//!
//! ```ignore
//! use lodtex::services::{ConversionOrchestrator, HttpBackend};
//!
//! let backend = Arc::new(HttpBackend::new(&settings.service)?);
//! let orchestrator = ConversionOrchestrator::new(backend, state.clone(), metrics.clone());
//!
//! state.select_file(Some(InputFile::from_path(path)?));
//! match orchestrator.submit().await {
//!     SubmitOutcome::Converted { count } => println!("{count} tables"),
//!     SubmitOutcome::Failed { message } => eprintln!("{message}"),
//!     SubmitOutcome::Skipped => {}
//! }
//! ```

pub mod backend;
pub mod distributor;
pub mod error_message;
pub mod orchestrator;
pub mod save;
pub mod validation;

pub use backend::{
    BUNDLE_ENDPOINT, CONVERT_ENDPOINT, ClientError, ConversionBackend, ConversionRequest,
    GENERIC_BUNDLE_ERROR, GENERIC_CONVERSION_ERROR, HEALTH_ENDPOINT, HttpBackend, RawResponse,
};
pub use distributor::{BundleOutcome, ResultDistributor};
pub use error_message::{DEFAULT_EXTRACTORS, MessageExtractor, extract_message, message_or};
pub use orchestrator::{ConversionOrchestrator, SubmitOutcome};
pub use save::{
    BUNDLE_FILENAME, DialogSaveTarget, DirectorySaveTarget, SavePayload, SaveStatus, SaveTarget,
    TEXT_MEDIA_TYPE, ZIP_MEDIA_TYPE,
};
pub use validation::{AcceptAll, RangePolicy, WidthPolicy, policy_from_settings};
