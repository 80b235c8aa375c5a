//! Statement types produced by the parser and consumed by the executor.

pub mod types;

pub use types::*;
