//! Process-wide, insertion-ordered set of enabled feature names.

use indexmap::IndexSet;

#[derive(Debug, Default)]
pub struct FeatureStore {
    names: IndexSet<String>,
}

impl FeatureStore {
    pub fn new() -> Self {
        Self {
            names: IndexSet::new(),
        }
    }

    pub fn exists(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Idempotent: enabling an already-enabled feature is a no-op.
    pub fn enable(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }

    /// No-op if the feature was never enabled.
    pub fn disable(&mut self, name: &str) {
        self.names.shift_remove(name);
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.names.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enable_is_idempotent() {
        let mut features = FeatureStore::new();
        features.enable("fast");
        features.enable("fast");
        assert_eq!(features.names().count(), 1);
    }

    #[test]
    fn disable_missing_is_noop() {
        let mut features = FeatureStore::new();
        features.disable("absent");
        assert!(!features.exists("absent"));
    }

    #[test]
    fn disable_removes_enabled_feature() {
        let mut features = FeatureStore::new();
        features.enable("fast");
        features.disable("fast");
        assert!(!features.exists("fast"));
    }
}
