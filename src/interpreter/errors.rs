//! The unified error type: one of three kinds, a message, and a 1-based
//! line number. Mirrors the single global error slot described by the
//! component design, but returned as an ordinary `Result` error instead of
//! being read back out of shared state.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Runtime,
    Memory,
}

impl ErrorKind {
    fn label(self) -> &'static str {
        match self {
            ErrorKind::Syntax => "Syntax Error",
            ErrorKind::Runtime => "Runtime Error",
            ErrorKind::Memory => "Memory Error",
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{line}: {}: {message}", kind.label())]
pub struct MewoError {
    pub kind: ErrorKind,
    pub message: String,
    pub line: usize,
}

impl MewoError {
    pub fn new(kind: ErrorKind, line: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            line,
            message: message.into(),
        }
    }

    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, line, message)
    }

    pub fn runtime(line: usize, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Runtime, line, message)
    }

    pub fn memory(line: usize, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Memory, line, message)
    }

    /// Formats the way the top-level CLI reports a failure:
    /// `<file>:<line>: <Kind>: <message>`.
    pub fn format_for_file(&self, file: &str) -> String {
        format!("{}:{}: {}: {}", file, self.line, self.kind.label(), self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_file_and_two_word_kind() {
        let err = MewoError::runtime(12, "Unknown label 'build'");
        assert_eq!(
            err.format_for_file("Mewofile"),
            "Mewofile:12: Runtime Error: Unknown label 'build'"
        );
    }
}
