use super::conversion::{ConversionConfig, ConversionResult, InputFile, WidthClass};

/// Single source of truth for the session.
///
/// Holds the user's conversion options and the selection state: the pending
/// spreadsheet, the busy flag and the outcome of the last submission.
///
/// # Thread Safety
///
/// `AppState` is wrapped in `Arc<RwLock<AppState>>` by [`crate::state::StateManager`].
/// Mutate it through [`update()`](crate::state::StateManager::update) or the
/// manager's convenience methods so change events get emitted.
///
/// # Invariants
///
/// - While `busy` is true, `last_result` and `last_error` are both `None`.
/// - After a submission completes exactly one of them is `Some`.
/// - Selecting a new file clears both.
#[derive(Clone, Debug, Default)]
pub struct AppState {
    // Conversion options
    pub config: ConversionConfig,

    // Selection
    pub pending_file: Option<InputFile>,

    // Runtime state
    pub busy: bool,

    // Outcome of the last submission
    pub last_result: Option<ConversionResult>,
    pub last_error: Option<String>,
}

/// Everything a submission needs, captured when it starts.
///
/// Later edits to the configuration do not affect a request already built from a ticket.
#[derive(Clone, Debug)]
pub struct SubmissionTicket {
    pub file: InputFile,
    pub config: ConversionConfig,
}

impl AppState {
    /// Whether a file is selected and nothing is in flight
    pub fn is_ready_to_submit(&self) -> bool {
        self.pending_file.is_some() && !self.busy
    }

    pub fn has_result(&self) -> bool {
        self.last_result.is_some()
    }

    pub fn toggle_excluded_column(&mut self, column: char) {
        self.config.toggle_excluded_column(column);
    }

    pub fn set_column_width(&mut self, class: WidthClass, text: impl Into<String>) {
        self.config.set_column_width(class, text);
    }

    /// Store or clear the pending file.
    ///
    /// Choosing a file discards the previous outcome. Passing `None` only
    /// drops the pending file.
    pub fn select_file(&mut self, file: Option<InputFile>) {
        match file {
            Some(file) => {
                self.pending_file = Some(file);
                self.last_result = None;
                self.last_error = None;
            }
            None => {
                self.pending_file = None;
            }
        }
    }

    /// Enter the busy state and hand out a ticket for the request.
    ///
    /// Returns `None` without touching anything when no file is pending or a
    /// submission is already in flight.
    pub fn begin_submission(&mut self) -> Option<SubmissionTicket> {
        if self.busy {
            return None;
        }
        let file = self.pending_file.clone()?;

        self.busy = true;
        self.last_result = None;
        self.last_error = None;

        Some(SubmissionTicket {
            file,
            config: self.config.clone(),
        })
    }

    /// Leave the busy state with exactly one outcome recorded
    pub fn complete_submission(&mut self, outcome: Result<ConversionResult, String>) {
        self.busy = false;
        match outcome {
            Ok(result) => {
                self.last_result = Some(result);
                self.last_error = None;
            }
            Err(message) => {
                self.last_result = None;
                self.last_error = Some(message);
            }
        }
    }

    /// Record an error that is not tied to a submission (downloads, file reads)
    ///
    /// Ignored while a submission is in flight, since that submission owns the
    /// outcome. Returns whether the error was recorded.
    pub fn report_error(&mut self, message: impl Into<String>) -> bool {
        if self.busy {
            return false;
        }
        self.last_error = Some(message.into());
        true
    }

    /// Record a failed bundle download of `bundled`
    ///
    /// Only applies while `bundled` is still the last result. A submission
    /// started or a file picked during the download makes the failure stale.
    pub fn report_bundle_error(
        &mut self,
        bundled: &ConversionResult,
        message: impl Into<String>,
    ) -> bool {
        if self.last_result.as_ref() != Some(bundled) {
            return false;
        }
        self.report_error(message)
    }

    /// Short status line for the window
    pub fn status_summary(&self) -> String {
        if self.busy {
            "Generating LaTeX files...".to_string()
        } else if let Some(ref error) = self.last_error {
            format!("Error: {}", error)
        } else if let Some(ref result) = self.last_result {
            format!(
                "Generated {} file{} from {} sheet{}",
                result.count,
                if result.count == 1 { "" } else { "s" },
                result.sheet_names.len(),
                if result.sheet_names.len() == 1 { "" } else { "s" }
            )
        } else if let Some(ref file) = self.pending_file {
            format!("Ready to convert {}", file.name)
        } else {
            "Select a spreadsheet to begin".to_string()
        }
    }
}
