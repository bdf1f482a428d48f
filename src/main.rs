//! LodTex - Desktop client for turning LOD matrix spreadsheets into LaTeX tables
//!
//! Main entry point for the GUI application.
//!
//! # Overview
//!
//! This binary wires together:
//! - Logging infrastructure (file rotation + console output)
//! - Client settings ([`ConfigManager`], `LodTex Data/lodtex.yaml`)
//! - Tokio async runtime for the HTTP calls
//! - Session state ([`StateManager`])
//! - The conversion client, the download target and the GUI controller
//!
//! The application uses a hybrid threading model:
//! - **Main thread**: Runs the Slint event loop (blocking, synchronous)
//! - **Tokio workers**: Conversion and bundling requests
//! - **State listener**: Background std::thread for reactive UI updates
//!
//! # Execution Flow
//!
//! 1. Load `lodtex.yaml` (defaults when missing)
//! 2. Initialize logging → logs/lodtex.<date>
//! 3. Create tokio runtime and probe the service's health endpoint
//! 4. Create StateManager, services and GuiController
//! 5. Run Slint event loop (blocks until window closed)
//! 6. Shutdown tokio runtime with 5s timeout and log session metrics

use anyhow::{Context, Result};
use lodtex::config::DEFAULT_CONFIG_DIR;
use lodtex::logging::{LogOptions, setup_logging};
use lodtex::services::{
    ConversionOrchestrator, DialogSaveTarget, DirectorySaveTarget, HttpBackend, ResultDistributor,
    SaveTarget, policy_from_settings,
};
use lodtex::ui::{EventLoopSaveTarget, GuiController};
use lodtex::{APP_NAME, ConfigManager, Metrics, StateManager, VERSION};
use std::sync::Arc;
use std::time::Duration;

const WORKER_THREADS: usize = 2;

fn main() -> Result<()> {
    let config_manager = ConfigManager::new(DEFAULT_CONFIG_DIR)?;
    let settings = config_manager.load_settings()?;

    // Held until main returns so buffered log lines are flushed
    let _log_guard = setup_logging(
        &LogOptions::new("logs", "lodtex")
            .debug(settings.debug_mode)
            .console(true),
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    if config_manager.ensure_settings_file()? {
        tracing::info!("Wrote default settings to {}", config_manager.settings_path());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(WORKER_THREADS)
        .thread_name("lodtex-worker")
        .build()?;

    tracing::info!(
        "Tokio runtime initialized with {} worker threads",
        WORKER_THREADS
    );

    let backend = Arc::new(
        HttpBackend::new(&settings.service).context("Failed to configure conversion service")?,
    );

    match runtime.block_on(backend.check_health()) {
        Ok(true) => tracing::info!("Conversion service is healthy"),
        Ok(false) => tracing::warn!("Conversion service reported an unhealthy status"),
        Err(e) => tracing::warn!("Conversion service unreachable: {}", e),
    }

    let state_manager = Arc::new(StateManager::new());
    let metrics = Arc::new(Metrics::new());

    let save_target: Arc<dyn SaveTarget> = match settings.downloads.directory {
        Some(ref directory) => {
            tracing::info!("Saving downloads to {}", directory);
            Arc::new(DirectorySaveTarget::new(directory.clone()))
        }
        // Bundles are saved from tokio workers; dialogs must open on this thread
        None => Arc::new(EventLoopSaveTarget::new(Arc::new(DialogSaveTarget))),
    };

    let orchestrator = ConversionOrchestrator::new(
        Arc::clone(&backend),
        Arc::clone(&state_manager),
        Arc::clone(&metrics),
    )
    .with_policy(policy_from_settings(&settings.validation));

    let distributor = ResultDistributor::new(
        Arc::clone(&backend),
        Arc::clone(&state_manager),
        save_target,
        Arc::clone(&metrics),
    );

    let gui_controller = GuiController::new(
        Arc::clone(&state_manager),
        orchestrator,
        distributor,
        backend.base_url().as_str(),
        runtime.handle().clone(),
    )?;

    tracing::info!("GUI controller initialized, launching window");

    let result = gui_controller.run();

    tracing::info!("GUI closed, shutting down");

    // In-flight requests are not cancelled; give them a moment to finish
    runtime.shutdown_timeout(Duration::from_secs(5));

    metrics.log_summary();
    tracing::info!("Application shutdown complete");

    result.map_err(|e| {
        tracing::error!("GUI error: {}", e);
        anyhow::anyhow!("GUI error: {}", e)
    })
}
