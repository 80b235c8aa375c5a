//! Parser error type and resource limits.

use thiserror::Error;

use crate::interpreter::errors::{ErrorKind, MewoError};

/// A faithful port of the original's fixed-size `Stmt* parameters[3]` array:
/// the C parser's param-collection loop is bounded by `param_count < 3` and
/// simply stops collecting once full, so extra parameters are truncated
/// rather than rejected here too.
pub const MAX_ATTR_PARAMS: usize = 3;

#[derive(Debug, Clone, Error)]
#[error("line {line}: {message}")]
pub struct ParseException {
    pub message: String,
    pub line: usize,
}

impl ParseException {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl From<ParseException> for MewoError {
    fn from(e: ParseException) -> Self {
        MewoError::new(ErrorKind::Syntax, e.line, e.message)
    }
}
