use crate::models::{ConversionConfig, InputFile, ServiceSettings};
use indexmap::IndexMap;
use reqwest::Url;
use reqwest::multipart::{Form, Part};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Conversion endpoint, relative to the service base URL
pub const CONVERT_ENDPOINT: &str = "api/generate-latex";

/// Bundling endpoint, relative to the service base URL
pub const BUNDLE_ENDPOINT: &str = "api/download-zip";

/// Health check endpoint, relative to the service base URL
pub const HEALTH_ENDPOINT: &str = "api/health";

/// Shown when a failed conversion yields no usable message
pub const GENERIC_CONVERSION_ERROR: &str = "Failed to generate LaTeX files";

/// Shown when the bundling service rejects a request
pub const GENERIC_BUNDLE_ERROR: &str = "Failed to download ZIP file";

/// Errors that can occur while talking to the conversion service
#[derive(Error, Debug)]
pub enum ClientError {
    /// Network failure before a response could be read
    #[error("{0}")]
    Transport(String),

    #[error("Invalid service URL: {0}")]
    InvalidUrl(String),

    /// A success status whose body could not be interpreted
    #[error("Unexpected response from conversion service: {0}")]
    InvalidResponse(String),

    /// The service answered with a non-success status
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The width policy refused the configuration before anything was sent
    #[error("{0}")]
    Validation(String),

    #[error("Failed to encode request: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl ClientError {
    /// Message for the status line: the error's own text, or `fallback` when that is blank
    pub fn user_message(&self, fallback: &str) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            fallback.to_string()
        } else {
            message
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

/// Status and body of a service response, before interpretation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    async fn read(response: reqwest::Response) -> Result<Self, ClientError> {
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(Self { status, body })
    }
}

/// One conversion request: the spreadsheet plus the serialized form fields
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub file: InputFile,

    /// JSON array of column letters
    pub excluded_columns: String,

    /// JSON object keyed by width class
    pub column_widths: String,

    pub total_table_width: Option<String>,
}

impl ConversionRequest {
    pub fn new(file: InputFile, config: &ConversionConfig) -> Result<Self, ClientError> {
        Ok(Self {
            file,
            excluded_columns: config.excluded_columns_json()?,
            column_widths: config.column_widths_json()?,
            total_table_width: config
                .total_table_width
                .as_ref()
                .map(|w| w.trim().to_string())
                .filter(|w| !w.is_empty()),
        })
    }
}

/// The two remote collaborators: conversion and bundling.
///
/// Implementations perform exactly one attempt per call and report only
/// transport failures as errors; any HTTP status comes back as a [`RawResponse`].
pub trait ConversionBackend: Send + Sync {
    fn convert(
        &self,
        request: ConversionRequest,
    ) -> impl Future<Output = Result<RawResponse, ClientError>> + Send;

    fn bundle(
        &self,
        artifacts: &IndexMap<String, String>,
    ) -> impl Future<Output = Result<RawResponse, ClientError>> + Send;
}

/// HTTP implementation of [`ConversionBackend`]
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(settings: &ServiceSettings) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = settings.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;

        // Url::join drops the last path segment unless the base ends with '/'
        let mut base = settings.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;

        tracing::info!("Conversion service at {}", base_url);

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }

    /// Probe the service's health endpoint
    pub async fn check_health(&self) -> Result<bool, ClientError> {
        let response = self.client.get(self.endpoint(HEALTH_ENDPOINT)?).send().await?;
        let healthy = response.status().is_success();
        tracing::debug!("Health check returned {}", response.status());
        Ok(healthy)
    }
}

impl ConversionBackend for HttpBackend {
    async fn convert(&self, request: ConversionRequest) -> Result<RawResponse, ClientError> {
        let url = self.endpoint(CONVERT_ENDPOINT)?;
        let media_type = request.file.media_type();

        let file_part = Part::bytes(request.file.bytes.to_vec())
            .file_name(request.file.name.clone())
            .mime_str(media_type)?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("excluded_columns", request.excluded_columns)
            .text("column_widths", request.column_widths);

        if let Some(total) = request.total_table_width {
            form = form.text("total_table_width", total);
        }

        tracing::debug!("POST {} ({} bytes)", url, request.file.len());

        let response = self.client.post(url).multipart(form).send().await?;
        RawResponse::read(response).await
    }

    async fn bundle(&self, artifacts: &IndexMap<String, String>) -> Result<RawResponse, ClientError> {
        let url = self.endpoint(BUNDLE_ENDPOINT)?;

        tracing::debug!("POST {} ({} files)", url, artifacts.len());

        let response = self.client.post(url).json(artifacts).send().await?;
        RawResponse::read(response).await
    }
}
