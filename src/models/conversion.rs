use anyhow::{Context, Result};
use camino::Utf8Path;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::Arc;

/// Column identifiers offered as exclusion toggles in the window.
pub const COLUMN_CHOICES: [char; 12] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L'];

/// Spreadsheet extensions accepted by the conversion service.
pub const ACCEPTED_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

/// The three width classes a rendered LaTeX column can fall into.
///
/// The conversion service keys them by the letters `A`, `B` and `C`:
/// the first column, the second column, and the default for every other column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidthClass {
    First,
    Second,
    Rest,
}

impl WidthClass {
    pub const ALL: [WidthClass; 3] = [WidthClass::First, WidthClass::Second, WidthClass::Rest];

    pub fn label(self) -> &'static str {
        match self {
            WidthClass::First => "first column",
            WidthClass::Second => "second column",
            WidthClass::Rest => "remaining columns",
        }
    }
}

/// Column widths in centimetres, stored as the text the user typed.
///
/// No normalization happens here; the conversion service (or an opt-in
/// [`WidthPolicy`](crate::services::WidthPolicy)) decides whether the text is a valid number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnWidths {
    #[serde(rename = "A")]
    pub first: String,

    #[serde(rename = "B")]
    pub second: String,

    #[serde(rename = "C")]
    pub rest: String,
}

impl Default for ColumnWidths {
    fn default() -> Self {
        Self {
            first: "4.0".to_string(),
            second: "4.0".to_string(),
            rest: "2.0".to_string(),
        }
    }
}

impl ColumnWidths {
    pub fn get(&self, class: WidthClass) -> &str {
        match class {
            WidthClass::First => &self.first,
            WidthClass::Second => &self.second,
            WidthClass::Rest => &self.rest,
        }
    }

    /// Replace the stored text for a width class verbatim
    pub fn set(&mut self, class: WidthClass, text: impl Into<String>) {
        let text = text.into();
        match class {
            WidthClass::First => self.first = text,
            WidthClass::Second => self.second = text,
            WidthClass::Rest => self.rest = text,
        }
    }
}

/// User-editable conversion settings for the current session.
///
/// Created with defaults matching the conversion service's own defaults and
/// never written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionConfig {
    /// Columns left out of the generated tables, in the order they were excluded
    pub excluded_columns: IndexSet<char>,

    pub column_widths: ColumnWidths,

    /// When set, the service distributes this total width across the included
    /// columns and ignores `column_widths`
    pub total_table_width: Option<String>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            excluded_columns: ['B', 'C', 'D', 'E'].into_iter().collect(),
            column_widths: ColumnWidths::default(),
            total_table_width: None,
        }
    }
}

impl ConversionConfig {
    /// Exclude `column` if it is currently included, include it otherwise.
    ///
    /// Toggling the same column twice leaves the configuration unchanged.
    pub fn toggle_excluded_column(&mut self, column: char) {
        if !self.excluded_columns.shift_remove(&column) {
            self.excluded_columns.insert(column);
        }
    }

    pub fn is_excluded(&self, column: char) -> bool {
        self.excluded_columns.contains(&column)
    }

    pub fn set_column_width(&mut self, class: WidthClass, text: impl Into<String>) {
        self.column_widths.set(class, text);
    }

    /// Set or clear the total table width. Blank text clears it.
    pub fn set_total_table_width(&mut self, text: Option<String>) {
        self.total_table_width = text.filter(|t| !t.trim().is_empty());
    }

    /// `excluded_columns` form field: a JSON array of single-letter strings
    pub fn excluded_columns_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.excluded_columns)
    }

    /// `column_widths` form field: a JSON object keyed `A`/`B`/`C` with the raw text values
    pub fn column_widths_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.column_widths)
    }
}

/// A spreadsheet picked by the user, held in memory until submission.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub bytes: Arc<[u8]>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, keeping only its file name
    pub fn from_path(path: &Utf8Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("Failed to read spreadsheet: {}", path))?;
        let name = path
            .file_name()
            .map(str::to_string)
            .with_context(|| format!("Path has no file name: {}", path))?;

        Ok(Self::new(name, bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn extension(&self) -> Option<String> {
        Utf8Path::new(&self.name).extension().map(str::to_ascii_lowercase)
    }

    /// Whether the file name carries one of the [`ACCEPTED_EXTENSIONS`]
    pub fn has_spreadsheet_extension(&self) -> bool {
        self.extension()
            .is_some_and(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()))
    }

    /// Media type sent with the multipart upload
    pub fn media_type(&self) -> &'static str {
        match self.extension().as_deref() {
            Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Some("xls") => "application/vnd.ms-excel",
            _ => "application/octet-stream",
        }
    }

    /// Cheap identity check: same name and same shared buffer
    pub fn is_same(&self, other: &InputFile) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.bytes, &other.bytes)
    }
}

/// Successful response of the conversion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Generated LaTeX files keyed by file name, in the order the service returned them
    #[serde(rename = "files")]
    pub artifacts: IndexMap<String, String>,

    pub count: usize,

    #[serde(default)]
    pub sheet_names: Vec<String>,
}

impl ConversionResult {
    pub fn artifact(&self, filename: &str) -> Option<&str> {
        self.artifacts.get(filename).map(String::as_str)
    }
}
