use std::collections::{BTreeMap, HashMap};

/// A read-only key/value store that deployment variables are looked up in.
///
/// Implementations must return the current value on every call; callers rely
/// on lookups never being cached.
pub trait VariableSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads variables from the environment of the running process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl VariableSource for ProcessEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl VariableSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl VariableSource for BTreeMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl<S: VariableSource + ?Sized> VariableSource for &S {
    fn var(&self, key: &str) -> Option<String> {
        (**self).var(key)
    }
}
