//! Process-wide, insertion-ordered mapping from identifier to `Value`.

use indexmap::IndexMap;

use super::value::Value;

#[derive(Debug, Default)]
pub struct VariableStore {
    entries: IndexMap<String, Value>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Takes ownership of `value`, overwriting any prior binding.
    pub fn set(&mut self, name: String, value: Value) {
        self.entries.insert(name, value);
    }

    pub fn set_number(&mut self, name: impl Into<String>, n: f64) {
        self.set(name.into(), Value::Number(n));
    }

    pub fn set_string(&mut self, name: impl Into<String>, s: impl Into<String>) {
        self.set(name.into(), Value::String(s.into()));
    }

    pub fn set_bool(&mut self, name: impl Into<String>, b: bool) {
        self.set(name.into(), Value::Bool(b));
    }

    pub fn delete(&mut self, name: &str) -> bool {
        self.entries.shift_remove(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let mut vars = VariableStore::new();
        vars.set_string("x", "hi");
        assert_eq!(vars.get("x"), Some(&Value::String("hi".to_string())));
    }

    #[test]
    fn overwrite_replaces_prior_binding() {
        let mut vars = VariableStore::new();
        vars.set_number("x", 1.0);
        vars.set_number("x", 2.0);
        assert_eq!(vars.get("x"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn iteration_order_is_insertion_order() {
        let mut vars = VariableStore::new();
        vars.set_number("b", 1.0);
        vars.set_number("a", 2.0);
        let names: Vec<&String> = vars.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn delete_removes_binding() {
        let mut vars = VariableStore::new();
        vars.set_bool("flag", true);
        assert!(vars.delete("flag"));
        assert!(!vars.exists("flag"));
        assert!(!vars.delete("flag"));
    }
}
