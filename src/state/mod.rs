// Session state shared by the window, the orchestrator and the distributor.
//
// Every mutation goes through StateManager::update, which diffs the state and
// broadcasts what changed.

use crate::models::{AppState, ConversionResult, InputFile, SubmissionTicket, WidthClass};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

/// Change events emitted when state is modified
///
/// These events let the GUI react to state changes without polling.
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// Excluded columns or widths have been edited
    ConfigurationChanged,

    /// The pending file was replaced or cleared
    FileSelected {
        file_name: Option<String>,
    },

    /// A submission went out to the conversion service
    SubmissionStarted,

    /// The outstanding submission resolved
    SubmissionFinished {
        succeeded: bool,
    },

    /// The stored conversion result changed
    ResultChanged {
        artifact_count: Option<usize>,
    },

    /// The user-visible error message changed
    ErrorChanged {
        message: Option<String>,
    },
}

/// Thread-safe state manager with event emission
///
/// This is the central state management component that:
/// - Provides thread-safe access to [`AppState`] via `Arc<RwLock<T>>`
/// - Detects state changes and emits [`StateChange`] events
/// - Performs check-and-set transitions (starting a submission) under one lock
/// - Supports subscribing to state changes via tokio broadcast channels
///
/// # Usage
///
/// - [`read()`](Self::read) for reading state through a closure
/// - [`update()`](Self::update) for mutations with automatic event emission
/// - [`subscribe()`](Self::subscribe) for listening to state changes
pub struct StateManager {
    state: Arc<RwLock<AppState>>,

    /// Multiple subscribers can listen for state changes
    state_tx: broadcast::Sender<StateChange>,
}

impl StateManager {
    /// Create a new StateManager with default state
    ///
    /// The broadcast channel buffers 100 events.
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(AppState::default())),
            state_tx,
        }
    }

    /// Clone the entire state
    pub fn snapshot(&self) -> AppState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let busy = state_manager.read(|state| state.busy);
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&AppState) -> R,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Update the state and emit change events
    ///
    /// Captures the old state, applies `update_fn`, diffs the two and
    /// broadcasts one event per detected change.
    ///
    /// # Returns
    /// The StateChange events that were emitted
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut AppState),
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let old_state = state.clone();

        update_fn(&mut state);

        let changes = Self::detect_changes(&old_state, &state);

        for change in &changes {
            // No subscribers is fine
            let _ = self.state_tx.send(change.clone());
        }

        changes
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    fn detect_changes(old: &AppState, new: &AppState) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if old.config != new.config {
            changes.push(StateChange::ConfigurationChanged);
        }

        let file_changed = match (&old.pending_file, &new.pending_file) {
            (None, None) => false,
            (Some(a), Some(b)) => !a.is_same(b),
            _ => true,
        };
        if file_changed {
            changes.push(StateChange::FileSelected {
                file_name: new.pending_file.as_ref().map(|f| f.name.clone()),
            });
        }

        if old.busy != new.busy {
            if new.busy {
                changes.push(StateChange::SubmissionStarted);
            } else {
                changes.push(StateChange::SubmissionFinished {
                    succeeded: new.last_result.is_some(),
                });
            }
        }

        if old.last_result != new.last_result {
            changes.push(StateChange::ResultChanged {
                artifact_count: new.last_result.as_ref().map(|r| r.artifacts.len()),
            });
        }

        if old.last_error != new.last_error {
            changes.push(StateChange::ErrorChanged {
                message: new.last_error.clone(),
            });
        }

        changes
    }

    // Convenience methods for common state updates

    pub fn toggle_excluded_column(&self, column: char) -> Vec<StateChange> {
        self.update(|state| state.toggle_excluded_column(column))
    }

    pub fn set_column_width(&self, class: WidthClass, text: impl Into<String>) -> Vec<StateChange> {
        let text = text.into();
        self.update(|state| state.set_column_width(class, text))
    }

    pub fn set_total_table_width(&self, text: Option<String>) -> Vec<StateChange> {
        self.update(|state| state.config.set_total_table_width(text))
    }

    /// Replace the pending file; `Some` also clears the last result and error
    pub fn select_file(&self, file: Option<InputFile>) -> Vec<StateChange> {
        if let Some(ref f) = file {
            tracing::info!("Selected {} ({} bytes)", f.name, f.len());
        }
        self.update(|state| state.select_file(file))
    }

    /// Atomically enter the busy state
    ///
    /// Returns the captured file and configuration, or `None` when there is no
    /// pending file or another submission is in flight. In the `None` case the
    /// state is untouched and no events are emitted.
    pub fn begin_submission(&self) -> Option<SubmissionTicket> {
        let mut ticket = None;
        self.update(|state| {
            ticket = state.begin_submission();
        });
        ticket
    }

    /// Leave the busy state with a result or an error message
    pub fn complete_submission(&self, outcome: Result<ConversionResult, String>) -> Vec<StateChange> {
        self.update(|state| state.complete_submission(outcome))
    }

    /// Record a download or file error; ignored while a submission is in flight
    pub fn report_error(&self, message: impl Into<String>) -> Vec<StateChange> {
        let message = message.into();
        self.update(|state| {
            state.report_error(message);
        })
    }

    /// Record a failed bundle download, unless `bundled` is no longer the last result
    ///
    /// The check and the write happen under one lock, so a submission or a
    /// file selection that lands while the bundle request is in flight wins.
    pub fn report_bundle_error(
        &self,
        bundled: &ConversionResult,
        message: impl Into<String>,
    ) -> bool {
        let message = message.into();
        let mut recorded = false;
        self.update(|state| {
            recorded = state.report_bundle_error(bundled, message);
        });
        recorded
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

// Clones share the same state and channel
impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn sample_file() -> InputFile {
        InputFile::new("lod.xlsx", vec![1u8, 2, 3])
    }

    fn sample_result() -> ConversionResult {
        let mut artifacts = IndexMap::new();
        artifacts.insert("a.tex".to_string(), "a".to_string());
        artifacts.insert("b.tex".to_string(), "b".to_string());
        ConversionResult {
            artifacts,
            count: 2,
            sheet_names: vec!["A".to_string(), "B".to_string()],
        }
    }

    #[test]
    fn test_new_state_manager() {
        let manager = StateManager::new();
        let state = manager.snapshot();

        assert!(!state.busy);
        assert!(state.pending_file.is_none());
        assert!(state.last_result.is_none());
    }

    #[test]
    fn test_toggle_emits_configuration_changed() {
        let manager = StateManager::new();

        let changes = manager.toggle_excluded_column('A');

        assert_eq!(changes, vec![StateChange::ConfigurationChanged]);
        assert!(manager.read(|s| s.config.is_excluded('A')));
    }

    #[test]
    fn test_width_edit_emits_configuration_changed() {
        let manager = StateManager::new();

        let changes = manager.set_column_width(WidthClass::Rest, "3.5");

        assert_eq!(changes, vec![StateChange::ConfigurationChanged]);
        assert_eq!(manager.read(|s| s.config.column_widths.rest.clone()), "3.5");
    }

    #[test]
    fn test_identical_width_emits_nothing() {
        let manager = StateManager::new();
        let changes = manager.set_column_width(WidthClass::First, "4.0");
        assert!(changes.is_empty());
    }

    #[test]
    fn test_select_file_after_error() {
        let manager = StateManager::new();
        manager.report_error("boom");

        let changes = manager.select_file(Some(sample_file()));

        assert_eq!(
            changes,
            vec![
                StateChange::FileSelected {
                    file_name: Some("lod.xlsx".to_string())
                },
                StateChange::ErrorChanged { message: None },
            ]
        );
    }

    #[test]
    fn test_begin_submission_without_file() {
        let manager = StateManager::new();
        let mut rx = manager.subscribe();

        assert!(manager.begin_submission().is_none());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_submission_lifecycle_events() {
        let manager = StateManager::new();
        manager.select_file(Some(sample_file()));

        let mut rx = manager.subscribe();
        let ticket = manager.begin_submission();
        assert!(ticket.is_some());
        assert_eq!(rx.try_recv().unwrap(), StateChange::SubmissionStarted);

        let changes = manager.complete_submission(Ok(sample_result()));
        assert_eq!(
            changes,
            vec![
                StateChange::SubmissionFinished { succeeded: true },
                StateChange::ResultChanged {
                    artifact_count: Some(2)
                },
            ]
        );
    }

    #[test]
    fn test_failed_submission_events() {
        let manager = StateManager::new();
        manager.select_file(Some(sample_file()));
        manager.begin_submission();

        let changes = manager.complete_submission(Err("Unsupported file format".to_string()));

        assert!(changes.contains(&StateChange::SubmissionFinished { succeeded: false }));
        assert!(changes.contains(&StateChange::ErrorChanged {
            message: Some("Unsupported file format".to_string())
        }));
    }

    #[test]
    fn test_reselecting_same_file_is_silent() {
        let manager = StateManager::new();
        let file = sample_file();
        manager.select_file(Some(file.clone()));

        let changes = manager.select_file(Some(file));
        assert!(changes.is_empty());
    }

    #[test]
    fn test_multiple_subscribers() {
        let manager = StateManager::new();
        let mut rx1 = manager.subscribe();
        let mut rx2 = manager.subscribe();

        manager.toggle_excluded_column('G');

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn test_clone_state_manager() {
        let manager1 = StateManager::new();
        let manager2 = manager1.clone();

        manager1.select_file(Some(sample_file()));

        assert!(manager2.read(|s| s.pending_file.is_some()));
    }
}
