//! Structured compile errors with source-snippet rendering.

use thiserror::Error;

/// Which phase rejected the input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompilePhase {
    Lexer,
    Parser,
    Transform,
}

/// A compile-time failure, positioned in the original source.
#[derive(Debug, Clone, Error)]
#[error("{file}:{line}:{column}: {message}")]
pub struct CompileError {
    pub message: String,
    pub phase: CompilePhase,
    pub line: usize,
    pub column: usize,
    pub file: String,
    pub suggestion: Option<String>,
}

impl CompileError {
    pub fn new(
        phase: CompilePhase,
        message: impl Into<String>,
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            message: message.into(),
            phase,
            line,
            column,
            file: String::new(),
            suggestion: None,
        }
    }

    pub fn with_file(mut self, file: &str) -> Self {
        self.file = file.to_string();
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Stable machine-readable code for tooling and tests.
    pub fn code(&self) -> &'static str {
        match self.phase {
            CompilePhase::Lexer => "LEXER_ERROR",
            CompilePhase::Parser => "PARSER_ERROR",
            CompilePhase::Transform => "TRANSFORM_ERROR",
        }
    }

    /// Renders the failure as a caret snippet: two lines of context on each
    /// side, a caret under the offending column, and the suggestion.
    pub fn render_snippet(&self, source: &str) -> String {
        let lines: Vec<&str> = source.lines().collect();
        let mut out = format!("{}:{}:{}: {}\n", self.file, self.line, self.column, self.message);
        if self.line == 0 || self.line > lines.len() {
            return out;
        }
        let index = self.line - 1;
        let from = index.saturating_sub(2);
        let to = (index + 2).min(lines.len() - 1);
        let width = (to + 1).to_string().len();
        for (i, line) in lines.iter().enumerate().take(to + 1).skip(from) {
            out.push_str(&format!("{:>width$} | {}\n", i + 1, line, width = width));
            if i == index {
                let pad = " ".repeat(width + 3 + self.column.saturating_sub(1));
                out.push_str(&pad);
                out.push_str("^\n");
            }
        }
        if let Some(suggestion) = &self.suggestion {
            out.push_str(&format!("help: {suggestion}\n"));
        }
        out
    }
}
