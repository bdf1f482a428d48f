use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;

/// Media type for a single generated `.tex` file
pub const TEXT_MEDIA_TYPE: &str = "text/plain";

/// Media type for the bundled archive
pub const ZIP_MEDIA_TYPE: &str = "application/zip";

/// Fixed name of the bundled archive
pub const BUNDLE_FILENAME: &str = "latex_tables.zip";

/// Bytes to hand to the user under a suggested file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavePayload {
    pub filename: String,
    pub media_type: &'static str,
    pub bytes: Vec<u8>,
}

impl SavePayload {
    pub fn text(filename: impl Into<String>, content: &str) -> Self {
        Self {
            filename: filename.into(),
            media_type: TEXT_MEDIA_TYPE,
            bytes: content.as_bytes().to_vec(),
        }
    }

    pub fn archive(bytes: Vec<u8>) -> Self {
        Self {
            filename: BUNDLE_FILENAME.to_string(),
            media_type: ZIP_MEDIA_TYPE,
            bytes,
        }
    }
}

/// What a save target did with a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Written,

    /// The user dismissed the save dialog
    Cancelled,
}

/// Where downloads end up
///
/// The distributor never touches the filesystem directly; it hands payloads
/// to whichever target the application was started with.
#[cfg_attr(test, mockall::automock)]
pub trait SaveTarget: Send + Sync {
    fn trigger_save(&self, payload: &SavePayload) -> Result<SaveStatus>;
}

/// Writes every payload into one directory
pub struct DirectorySaveTarget {
    directory: Utf8PathBuf,

    /// Characters that are not allowed in file names on Windows
    reserved_pattern: Regex,

    whitespace_pattern: Regex,
}

impl DirectorySaveTarget {
    pub fn new(directory: impl Into<Utf8PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            reserved_pattern: Regex::new(r#"[<>:"/\\|?*]"#).expect("Invalid reserved character regex"),
            whitespace_pattern: Regex::new(r"\s+").expect("Invalid whitespace regex"),
        }
    }

    pub fn directory(&self) -> &Utf8Path {
        &self.directory
    }

    /// Make a service-provided name safe to use as a single path component
    pub fn sanitize_filename(&self, name: &str) -> String {
        let replaced = self.reserved_pattern.replace_all(name.trim(), "_");
        let replaced = self.whitespace_pattern.replace_all(&replaced, "_");

        match replaced.as_ref() {
            "" | "." | ".." => "download".to_string(),
            safe => safe.to_string(),
        }
    }

    /// Full path a payload named `name` would be written to
    pub fn destination(&self, name: &str) -> Utf8PathBuf {
        self.directory.join(self.sanitize_filename(name))
    }
}

impl SaveTarget for DirectorySaveTarget {
    fn trigger_save(&self, payload: &SavePayload) -> Result<SaveStatus> {
        std::fs::create_dir_all(&self.directory)
            .with_context(|| format!("Failed to create download directory: {}", self.directory))?;

        let path = self.destination(&payload.filename);
        std::fs::write(&path, &payload.bytes)
            .with_context(|| format!("Failed to write {}", path))?;

        tracing::info!("Saved {} ({} bytes)", path, payload.bytes.len());
        Ok(SaveStatus::Written)
    }
}

/// Asks the user where to put each payload through a native save dialog
#[derive(Debug, Default, Clone, Copy)]
pub struct DialogSaveTarget;

impl SaveTarget for DialogSaveTarget {
    fn trigger_save(&self, payload: &SavePayload) -> Result<SaveStatus> {
        use rfd::FileDialog;

        let mut dialog = FileDialog::new()
            .set_title("Save As")
            .set_file_name(&payload.filename);

        dialog = match payload.media_type {
            ZIP_MEDIA_TYPE => dialog.add_filter("ZIP Archive", &["zip"]),
            _ => dialog.add_filter("LaTeX Source", &["tex"]),
        };

        let Some(path) = dialog.save_file() else {
            tracing::debug!("Save of {} cancelled", payload.filename);
            return Ok(SaveStatus::Cancelled);
        };

        std::fs::write(&path, &payload.bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        tracing::info!("Saved {} ({} bytes)", path.display(), payload.bytes.len());
        Ok(SaveStatus::Written)
    }
}
