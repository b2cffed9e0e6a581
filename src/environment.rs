use std::collections::HashMap;
use std::ffi::CString;

#[derive(Debug, Clone, PartialEq)]
struct Variable {
    value: String,
    exported: bool,
}

/// Shell variables. Exported ones form the environment of spawned commands.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Environment {
    vars: HashMap<String, Variable>,
}

impl Environment {
    /// Starts from the process environment, everything exported.
    pub fn new() -> Self {
        let mut env = Environment::empty();
        for (k, v) in std::env::vars() {
            env.set_exported(&k, &v);
        }
        env
    }

    pub fn empty() -> Self {
        Environment { vars: HashMap::new() }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|v| v.value.as_str())
    }

    /// Sets a value, keeping the export flag of an existing variable.
    pub fn set(&mut self, key: &str, value: &str) {
        self.vars
            .entry(key.to_string())
            .and_modify(|var| var.value = value.to_string())
            .or_insert(Variable {
                value: value.to_string(),
                exported: false,
            });
    }

    pub fn set_exported(&mut self, key: &str, value: &str) {
        self.vars.insert(
            key.to_string(),
            Variable {
                value: value.to_string(),
                exported: true,
            },
        );
    }

    pub fn unset(&mut self, key: &str) {
        self.vars.remove(key);
    }

    pub fn is_exported(&self, key: &str) -> bool {
        self.vars.get(key).is_some_and(|v| v.exported)
    }

    pub fn exported_vars(&self) -> Vec<(String, String)> {
        self.vars
            .iter()
            .filter(|(_, v)| v.exported)
            .map(|(k, v)| (k.clone(), v.value.clone()))
            .collect()
    }

    /// `KEY=value` strings for `execve`. Entries containing NUL are skipped.
    pub fn to_exec_env(&self) -> Vec<CString> {
        self.exported_vars()
            .into_iter()
            .filter_map(|(k, v)| CString::new(format!("{}={}", k, v)).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_includes_os_env() {
        let env = Environment::new();
        // PATH is present in any sane test environment
        assert!(env.get("PATH").is_some());
        assert!(env.is_exported("PATH"));
    }

    #[test]
    fn test_set_and_get() {
        let mut env = Environment::empty();
        env.set("FOO", "bar");
        assert_eq!(env.get("FOO"), Some("bar"));
        assert!(!env.is_exported("FOO"));
    }

    #[test]
    fn test_unset() {
        let mut env = Environment::empty();
        env.set("FOO", "bar");
        env.unset("FOO");
        assert_eq!(env.get("FOO"), None);
    }

    #[test]
    fn test_set_keeps_export_flag() {
        let mut env = Environment::empty();
        env.set_exported("FOO", "one");
        env.set("FOO", "two");
        assert!(env.is_exported("FOO"));
        assert_eq!(env.get("FOO"), Some("two"));
    }

    #[test]
    fn test_exported_vars() {
        let mut env = Environment::empty();
        env.set_exported("FOO", "bar");
        env.set("BAZ", "qux");
        let exported = env.exported_vars();
        assert!(exported.iter().any(|(k, v)| k == "FOO" && v == "bar"));
        assert!(!exported.iter().any(|(k, _)| k == "BAZ"));
    }

    #[test]
    fn test_exec_env() {
        let mut env = Environment::empty();
        env.set_exported("A", "1");
        env.set("B", "2");
        let strings = env.to_exec_env();
        assert_eq!(strings, vec![CString::new("A=1").unwrap()]);
    }
}
