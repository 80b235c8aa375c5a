//! The process-wide `Interpreter` value: every store the executor,
//! interpolator, and spawner read or mutate, threaded through by reference
//! rather than kept as true process globals (see the design notes on
//! modeling "process-wide" as scope, not implementation).

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::interpolator::InterpContext;
use crate::store::{FeatureStore, VariableStore};

/// Ordered `(name, statement_index)` pairs, built once before execution.
/// Name uniqueness is enforced before the first statement runs.
pub type LabelTable = IndexMap<String, usize>;

pub struct Interpreter {
    pub vars: VariableStore,
    pub features: FeatureStore,
    pub argv: Vec<String>,
    pub last_exit_code: i32,
    pub global_shell: Option<String>,
    /// Line numbers of `#once` commands already executed this process.
    pub once_seen: HashSet<usize>,
    pub dry_run: bool,
}

impl Interpreter {
    pub fn new(argv: Vec<String>, dry_run: bool, default_shell: Option<String>) -> Self {
        Self {
            vars: VariableStore::new(),
            features: FeatureStore::new(),
            argv,
            last_exit_code: 0,
            global_shell: default_shell,
            once_seen: HashSet::new(),
            dry_run,
        }
    }

    pub fn interp_ctx(&self) -> InterpContext<'_> {
        InterpContext {
            vars: &self.vars,
            features: &self.features,
            argv: &self.argv,
            last_exit_code: self.last_exit_code,
        }
    }
}
