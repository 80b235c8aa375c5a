//! Process-wide state: the tagged value type and the ordered variable and
//! feature stores that sit between the parser and the executor.

pub mod features;
pub mod value;
pub mod variables;

pub use features::FeatureStore;
pub use value::Value;
pub use variables::VariableStore;
