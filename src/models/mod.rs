//! Data models for the lodtex client.
//!
//! - [`AppState`]: the session state: conversion options, pending file, busy flag and last outcome
//! - [`ConversionConfig`]: excluded columns and column widths sent with each conversion
//! - [`ConversionResult`]: generated LaTeX files returned by the conversion service
//! - [`ClientSettings`]: service address, download directory and validation options from `lodtex.yaml`
//!
//! Session data is never persisted; only [`ClientSettings`] is read from disk.

pub mod app_state;
pub mod config;
pub mod conversion;

pub use app_state::{AppState, SubmissionTicket};
pub use config::{ClientSettings, DownloadSettings, ServiceSettings, ValidationSettings};
pub use conversion::{
    ACCEPTED_EXTENSIONS, COLUMN_CHOICES, ColumnWidths, ConversionConfig, ConversionResult,
    InputFile, WidthClass,
};
