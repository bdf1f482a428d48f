// LodTex - Desktop client for turning LOD matrix spreadsheets into LaTeX tables
//
// This is the library crate containing the session state, the service clients
// and the GUI wiring. The binary crate (main.rs) provides the entry point.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use metrics::Metrics;
pub use models::{AppState, ClientSettings, ConversionConfig, ConversionResult, InputFile};
pub use state::{StateChange, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
