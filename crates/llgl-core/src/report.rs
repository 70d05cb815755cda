//! Diagnostic report: accumulated text plus an error flag.

use std::fmt;

use crate::ffi::{string_from_ptr, RenderSystemHeader};

/// Human-readable diagnostics collected while creating a renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    text: String,
    has_errors: bool,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole report.
    pub fn reset(&mut self, text: impl Into<String>, has_errors: bool) {
        self.text = text.into();
        self.has_errors = has_errors;
    }

    /// Append an informational line.
    pub fn append(&mut self, line: impl AsRef<str>) {
        self.push_line(line.as_ref());
    }

    /// Append an error line and mark the report as failed.
    pub fn error(&mut self, line: impl AsRef<str>) {
        self.push_line(line.as_ref());
        self.has_errors = true;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && !self.has_errors
    }

    /// Read the report a backend stored in a renderer header.
    ///
    /// # Safety
    ///
    /// `header.report_text` must be null or a valid NUL-terminated string.
    pub unsafe fn from_header(header: &RenderSystemHeader) -> Self {
        Self {
            text: unsafe { string_from_ptr(header.report_text) },
            has_errors: header.has_errors,
        }
    }

    fn push_line(&mut self, line: &str) {
        self.text.push_str(line);
        if !line.ends_with('\n') {
            self.text.push('\n');
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text.trim_end())
    }
}
