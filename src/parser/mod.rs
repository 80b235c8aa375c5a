//! Line-oriented parser: turns Mewofile text into a flat, ordered
//! `Statement` stream.

pub mod lexer;
pub mod parser;
pub mod types;

pub use parser::Parser;
pub use types::ParseException;

use crate::ast::Statement;

/// Everything the parser produced, plus the first error encountered (if
/// any). The statements accumulated before a failure are kept around so a
/// caller in debug mode can still print the partial AST, mirroring the
/// reference CLI which prints whatever the parser built before checking for
/// an error.
pub struct ParseOutcome {
    pub statements: Vec<Statement>,
    pub error: Option<ParseException>,
}

/// Parses `source` into an ordered statement list. The parser halts at the
/// first syntax error but returns the statements produced so far alongside
/// it.
pub fn parse(source: &str) -> ParseOutcome {
    Parser::new(source).parse()
}
