//! The string-interpolation engine: a pure function over a template and the
//! ambient variable/feature/argv/environment state.

pub mod interpolator;

pub use interpolator::{interpolate, InterpContext};
