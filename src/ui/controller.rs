// GUI Controller - Bridges the Slint window with the conversion services
//
// This module contains the GuiController which coordinates between:
// - Slint UI (MainWindow)
// - StateManager (session state)
// - ConversionOrchestrator / ResultDistributor (service calls and downloads)
// - EventLoopBridge (async/GUI coordination)
//
// It handles:
// - Setting up UI callbacks → state updates and async tasks
// - Subscribing to state changes → UI updates
// - The spreadsheet picker dialog

use crate::models::{ACCEPTED_EXTENSIONS, InputFile, WidthClass};
use crate::services::{ConversionBackend, ConversionOrchestrator, ResultDistributor};
use crate::state::{StateChange, StateManager};
use crate::ui::bridge::{EventLoopBridge, EventLoopBridgeHandle};
use crate::ui::view::{InputView, WindowView};
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use slint::{ModelRc, SharedString, VecModel};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

// Include the generated Slint code
slint::include_modules!();

/// GUI Controller that wires up the Slint UI with session state and services
///
/// - Creates and manages the EventLoopBridge for tokio/Slint coordination
/// - Turns Slint callbacks into state updates or spawned service calls
/// - Subscribes to StateManager events and refreshes the window
///
/// # Example
/// ```ignore
/// let controller = GuiController::new(
///     state_manager,
///     orchestrator,
///     distributor,
///     "http://localhost:8000/",
///     runtime.handle().clone(),
/// )?;
/// controller.run()?;  // Blocks until window is closed
/// ```
pub struct GuiController {
    ui: MainWindow,

    _bridge: EventLoopBridge<MainWindow>,

    state_manager: Arc<StateManager>,
}

impl GuiController {
    pub fn new<B: ConversionBackend + 'static>(
        state_manager: Arc<StateManager>,
        orchestrator: ConversionOrchestrator<B>,
        distributor: ResultDistributor<B>,
        service_url: &str,
        tokio_handle: tokio::runtime::Handle,
    ) -> Result<Self> {
        let ui = MainWindow::new().context("Failed to create Slint UI")?;
        let bridge = EventLoopBridge::new(&ui, tokio_handle);

        ui.set_service_url(service_url.into());
        Self::sync_ui_with_state(&ui, &state_manager);

        Self::setup_input_callbacks(&ui, &state_manager);
        Self::setup_service_callbacks(&ui, &bridge, orchestrator, distributor);
        Self::setup_state_subscription(&bridge, &state_manager);

        tracing::info!("GUI controller initialized");

        Ok(Self {
            ui,
            _bridge: bridge,
            state_manager,
        })
    }

    /// Run the GUI (blocks until window is closed)
    pub fn run(self) -> Result<(), slint::PlatformError> {
        tracing::info!("Starting GUI event loop");
        let result = self.ui.run();

        if self.state_manager.read(|s| s.busy) {
            tracing::warn!("Window closed while a conversion was in flight");
        }
        result
    }

    /// Push the full state, width inputs included, into the window once at startup
    fn sync_ui_with_state(ui: &MainWindow, state_manager: &StateManager) {
        let state = state_manager.snapshot();

        let inputs = InputView::from_state(&state);
        let [first, second, rest] = inputs.widths;
        ui.set_first_width(first.into());
        ui.set_second_width(second.into());
        ui.set_rest_width(rest.into());
        ui.set_total_width(inputs.total_width.into());

        Self::apply_view(ui, &WindowView::from_state(&state));

        tracing::debug!("UI synchronized with initial state");
    }

    /// Copy a view model into the window's properties
    fn apply_view(ui: &MainWindow, view: &WindowView) {
        ui.set_selected_file_name(view.selected_file_name.as_str().into());
        ui.set_has_file(view.has_file);
        ui.set_busy(view.busy);
        ui.set_has_result(view.has_result);
        ui.set_status_text(view.status_text.as_str().into());
        ui.set_status_is_error(view.status_is_error);

        let columns: Vec<ColumnToggle> = view
            .columns
            .iter()
            .map(|&(letter, excluded)| ColumnToggle {
                letter: SharedString::from(letter.to_string()),
                excluded,
            })
            .collect();
        ui.set_columns(ModelRc::new(VecModel::from(columns)));

        let artifacts: Vec<ArtifactRow> = view
            .artifacts
            .iter()
            .map(|artifact| ArtifactRow {
                filename: artifact.filename.as_str().into(),
                preview: artifact.preview.as_str().into(),
            })
            .collect();
        ui.set_artifacts(ModelRc::new(VecModel::from(artifacts)));
    }

    /// Callbacks that only edit session state; these run on the event loop thread
    fn setup_input_callbacks(ui: &MainWindow, state_manager: &Arc<StateManager>) {
        let state = Arc::clone(state_manager);
        ui.on_browse_file(move || {
            let Some(path) = Self::show_file_picker(
                "Select Excel File",
                vec![("Excel Spreadsheet", &ACCEPTED_EXTENSIONS[..])],
            ) else {
                return;
            };

            match InputFile::from_path(&path) {
                Ok(file) if file.has_spreadsheet_extension() => {
                    state.select_file(Some(file));
                }
                Ok(file) => {
                    tracing::warn!("Rejected non-spreadsheet file: {}", file.name);
                    state.report_error("Please select an Excel file (.xlsx or .xls)");
                }
                Err(e) => {
                    tracing::error!("{:#}", e);
                    state.report_error(format!("{:#}", e));
                }
            }
        });

        let state = Arc::clone(state_manager);
        ui.on_toggle_column(move |letter| {
            if let Some(column) = letter.chars().next() {
                state.toggle_excluded_column(column);
            }
        });

        let state = Arc::clone(state_manager);
        ui.on_width_edited(move |index, text| {
            match usize::try_from(index)
                .ok()
                .and_then(|i| WidthClass::ALL.get(i).copied())
            {
                Some(class) => {
                    state.set_column_width(class, text.as_str());
                }
                None => tracing::warn!("Width edit for unknown class index {}", index),
            }
        });

        let state = Arc::clone(state_manager);
        ui.on_total_width_edited(move |text| {
            state.set_total_table_width(Some(text.to_string()));
        });
    }

    /// Callbacks that reach the services
    ///
    /// Network calls are spawned on tokio; single-file saves stay on the event
    /// loop thread so the save dialog has a parent.
    fn setup_service_callbacks<B: ConversionBackend + 'static>(
        ui: &MainWindow,
        bridge: &EventLoopBridge<MainWindow>,
        orchestrator: ConversionOrchestrator<B>,
        distributor: ResultDistributor<B>,
    ) {
        let bridge_handle = bridge.clone_handle();
        ui.on_submit(move || {
            tracing::info!("Generate button clicked");
            let orchestrator = orchestrator.clone();
            bridge_handle.spawn_async(move || async move {
                let outcome = orchestrator.submit().await;
                tracing::debug!("Submission finished: {:?}", outcome);
            });
        });

        let single = distributor.clone();
        ui.on_download_artifact(move |filename| {
            single.download_artifact(filename.as_str());
        });

        let bridge_handle = bridge.clone_handle();
        ui.on_download_all(move || {
            tracing::info!("Download all clicked");
            let distributor = distributor.clone();
            bridge_handle.spawn_async(move || async move {
                let outcome = distributor.download_all().await;
                tracing::debug!("Bundle download finished: {:?}", outcome);
            });
        });
    }

    /// Subscribe to state changes and update UI accordingly
    ///
    /// This spawns a background thread that listens for state change events
    /// and refreshes the window through the EventLoopBridge.
    fn setup_state_subscription(
        bridge: &EventLoopBridge<MainWindow>,
        state_manager: &Arc<StateManager>,
    ) {
        let bridge_handle = bridge.clone_handle();
        let state_manager_clone = Arc::clone(state_manager);
        let mut rx = state_manager.subscribe();

        std::thread::spawn(move || {
            tracing::debug!("State subscription thread started");

            loop {
                match rx.blocking_recv() {
                    Ok(change) => {
                        tracing::trace!("State change received: {:?}", change);

                        match &change {
                            StateChange::SubmissionFinished { succeeded } => {
                                tracing::info!("Submission finished (succeeded: {})", succeeded);
                            }
                            StateChange::ErrorChanged {
                                message: Some(message),
                            } => {
                                tracing::warn!("Showing error: {}", message);
                            }
                            _ => {}
                        }

                        Self::refresh(&bridge_handle, &state_manager_clone);
                    }
                    Err(RecvError::Closed) => {
                        tracing::info!(
                            "State broadcast channel closed - shutting down subscription thread"
                        );
                        break;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            "State subscription lagged - {} events were skipped, resynchronizing",
                            skipped
                        );
                        Self::refresh(&bridge_handle, &state_manager_clone);
                    }
                }
            }

            tracing::debug!("State subscription thread terminated gracefully");
        });
    }

    fn refresh(bridge: &EventLoopBridgeHandle<MainWindow>, state_manager: &StateManager) {
        let view = state_manager.read(WindowView::from_state);
        bridge.update_ui(move |ui| Self::apply_view(ui, &view));
    }

    /// Show a native file picker dialog
    ///
    /// # Returns
    /// The selected file path, or None if cancelled
    fn show_file_picker(title: &str, filters: Vec<(&str, &[&str])>) -> Option<Utf8PathBuf> {
        use rfd::FileDialog;

        let mut dialog = FileDialog::new().set_title(title);

        for (name, extensions) in filters {
            dialog = dialog.add_filter(name, extensions);
        }

        dialog.pick_file().and_then(|path| {
            Utf8PathBuf::try_from(path)
                .map_err(|e| {
                    tracing::error!("Failed to convert path to UTF-8: {}", e);
                    e
                })
                .ok()
        })
    }
}
