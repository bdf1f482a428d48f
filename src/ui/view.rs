// Window view model
//
// Plain data describing what the window shows. Built from an AppState snapshot
// on whatever thread received the state change, then moved to the event loop
// and applied there (Slint models are not Send).

use crate::models::{AppState, COLUMN_CHOICES, WidthClass};

/// Number of lines of each generated file shown under its name
pub const PREVIEW_LINES: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactView {
    pub filename: String,
    pub preview: String,
}

/// Everything the window displays, derived from one state snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowView {
    pub selected_file_name: String,
    pub has_file: bool,
    pub busy: bool,
    pub has_result: bool,
    pub status_text: String,
    pub status_is_error: bool,

    /// `(letter, excluded)` for every selectable column
    pub columns: Vec<(char, bool)>,

    pub artifacts: Vec<ArtifactView>,
}

impl WindowView {
    pub fn from_state(state: &AppState) -> Self {
        let artifacts = state
            .last_result
            .as_ref()
            .map(|result| {
                result
                    .artifacts
                    .iter()
                    .map(|(filename, content)| ArtifactView {
                        filename: filename.clone(),
                        preview: preview(content),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            selected_file_name: state
                .pending_file
                .as_ref()
                .map(|f| f.name.clone())
                .unwrap_or_default(),
            has_file: state.pending_file.is_some(),
            busy: state.busy,
            has_result: state.has_result(),
            status_text: state.status_summary(),
            status_is_error: state.last_error.is_some() && !state.busy,
            columns: COLUMN_CHOICES
                .iter()
                .map(|&letter| (letter, state.config.is_excluded(letter)))
                .collect(),
            artifacts,
        }
    }
}

/// Text of the width inputs; only pushed to the window at start-up so typing is never overwritten
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputView {
    pub widths: [String; 3],
    pub total_width: String,
}

impl InputView {
    pub fn from_state(state: &AppState) -> Self {
        let widths = WidthClass::ALL.map(|class| state.config.column_widths.get(class).to_string());
        Self {
            widths,
            total_width: state.config.total_table_width.clone().unwrap_or_default(),
        }
    }
}

/// First [`PREVIEW_LINES`] lines of `content`, with a marker when more follow
pub fn preview(content: &str) -> String {
    let mut lines = content.lines();
    let head: Vec<&str> = lines.by_ref().take(PREVIEW_LINES).collect();
    let remaining = lines.count();

    let mut text = head.join("\n");
    if remaining > 0 {
        text.push_str(&format!("\n... ({} more lines)", remaining));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConversionResult, InputFile};
    use indexmap::IndexMap;

    #[test]
    fn test_initial_view() {
        let view = WindowView::from_state(&AppState::default());

        assert!(!view.has_file);
        assert!(!view.busy);
        assert!(view.artifacts.is_empty());
        assert_eq!(view.status_text, "Select a spreadsheet to begin");
        assert_eq!(view.columns.len(), 12);
        assert_eq!(view.columns[0], ('A', false));
        assert_eq!(view.columns[1], ('B', true));
        assert_eq!(view.columns[5], ('F', false));
    }

    #[test]
    fn test_view_with_result() {
        let mut state = AppState::default();
        state.select_file(Some(InputFile::new("lod.xlsx", vec![1u8])));
        state.begin_submission();

        let mut artifacts = IndexMap::new();
        artifacts.insert("Sheet1.tex".to_string(), "line1\nline2".to_string());
        state.complete_submission(Ok(ConversionResult {
            artifacts,
            count: 1,
            sheet_names: vec!["Sheet1".to_string()],
        }));

        let view = WindowView::from_state(&state);

        assert_eq!(view.selected_file_name, "lod.xlsx");
        assert!(view.has_result);
        assert!(!view.status_is_error);
        assert_eq!(
            view.artifacts,
            vec![ArtifactView {
                filename: "Sheet1.tex".to_string(),
                preview: "line1\nline2".to_string()
            }]
        );
    }

    #[test]
    fn test_view_with_error() {
        let mut state = AppState::default();
        state.report_error("Failed to download ZIP file");

        let view = WindowView::from_state(&state);
        assert!(view.status_is_error);
        assert_eq!(view.status_text, "Error: Failed to download ZIP file");
    }

    #[test]
    fn test_preview_truncates() {
        let content: String = (1..=20).map(|i| format!("row {}\n", i)).collect();
        let text = preview(&content);

        assert!(text.starts_with("row 1\n"));
        assert!(text.contains("row 12"));
        assert!(!text.contains("row 13"));
        assert!(text.ends_with("... (8 more lines)"));
    }

    #[test]
    fn test_preview_short_content_unchanged() {
        assert_eq!(preview("\\begin{table}"), "\\begin{table}");
        assert_eq!(preview(""), "");
    }

    #[test]
    fn test_input_view_defaults() {
        let inputs = InputView::from_state(&AppState::default());
        assert_eq!(inputs.widths, ["4.0", "4.0", "2.0"].map(String::from));
        assert_eq!(inputs.total_width, "");
    }
}
