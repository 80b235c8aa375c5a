//! Execution: the process-wide `Interpreter` value, predicate evaluation,
//! the command spawner, and the statement executor built on top of them.

pub mod conditionals;
pub mod errors;
pub mod executor;
pub mod spawner;
pub mod types;

pub use errors::{ErrorKind, MewoError};
pub use executor::Executor;
pub use types::{Interpreter, LabelTable};
