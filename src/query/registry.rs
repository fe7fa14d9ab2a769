//! Function registry
//!
//! Maps case-sensitive function names to implementations. Built once at
//! startup and then shared immutably (usually behind an `Arc`), so lookups
//! need no locking.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::query::ast::CallExpr;
use crate::query::evaluator::EvalContext;
use crate::query::metadata::FunctionDescriptor;
use crate::types::SeriesRef;

/// Uniform contract every function implementation fulfils
///
/// Implementations evaluate their own series arguments through `ctx`, which
/// is also how re-entrant functions call back into the evaluator.
pub trait Function: Send + Sync {
    /// Evaluate `call` in `ctx`
    fn call(&self, ctx: &EvalContext<'_>, call: &CallExpr) -> Result<Vec<SeriesRef>>;

    /// Descriptors for every name this implementation serves
    fn describe(&self) -> Vec<FunctionDescriptor>;
}

/// Name → implementation table
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn Function>>,
}

impl FunctionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in function
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::new();
        crate::functions::register_builtins(&mut registry)?;
        Ok(registry)
    }

    /// Associate `name` with `function`; a name can only be registered once
    pub fn register(&mut self, name: &str, function: Arc<dyn Function>) -> Result<()> {
        if self.functions.contains_key(name) {
            return Err(Error::Configuration(format!(
                "function '{}' is already registered",
                name
            )));
        }
        self.functions.insert(name.to_string(), function);
        Ok(())
    }

    /// Register one implementation under a name and its aliases
    pub fn register_all(&mut self, names: &[&str], function: Arc<dyn Function>) -> Result<()> {
        for name in names {
            self.register(name, Arc::clone(&function))?;
        }
        Ok(())
    }

    /// Look up `name`; `position` locates the call for error reporting
    pub fn resolve(&self, name: &str, position: usize) -> Result<&dyn Function> {
        self.functions
            .get(name)
            .map(|f| f.as_ref())
            .ok_or_else(|| Error::UnknownFunction {
                name: name.to_string(),
                position,
            })
    }

    /// Whether `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered names (aliases included)
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Descriptor listing for documentation tooling, keyed by function name
    pub fn catalogue(&self) -> BTreeMap<String, FunctionDescriptor> {
        let mut catalogue = BTreeMap::new();
        for function in self.functions.values() {
            for descriptor in function.describe() {
                if self.functions.contains_key(&descriptor.name) {
                    catalogue.insert(descriptor.name.clone(), descriptor);
                }
            }
        }
        catalogue
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nothing;

    impl Function for Nothing {
        fn call(&self, _ctx: &EvalContext<'_>, _call: &CallExpr) -> Result<Vec<SeriesRef>> {
            Ok(Vec::new())
        }

        fn describe(&self) -> Vec<FunctionDescriptor> {
            vec![FunctionDescriptor::new("nothing", "nothing()", "Test", "Returns nothing", vec![])]
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = FunctionRegistry::new();
        registry.register_all(&["nothing", "none"], Arc::new(Nothing)).unwrap();
        assert!(registry.resolve("nothing", 0).is_ok());
        assert!(registry.resolve("none", 0).is_ok());
        assert_eq!(registry.names(), vec!["none", "nothing"]);
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let mut registry = FunctionRegistry::new();
        registry.register("nothing", Arc::new(Nothing)).unwrap();
        match registry.resolve("Nothing", 7) {
            Err(Error::UnknownFunction { name, position }) => {
                assert_eq!(name, "Nothing");
                assert_eq!(position, 7);
            },
            _ => panic!("Expected UnknownFunction"),
        }
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = FunctionRegistry::new();
        registry.register("nothing", Arc::new(Nothing)).unwrap();
        assert!(registry.register("nothing", Arc::new(Nothing)).is_err());
    }

    #[test]
    fn test_catalogue_only_lists_registered_names() {
        let mut registry = FunctionRegistry::new();
        registry.register("none", Arc::new(Nothing)).unwrap();
        assert!(registry.catalogue().is_empty());
        registry.register("nothing", Arc::new(Nothing)).unwrap();
        assert_eq!(registry.catalogue().len(), 1);
    }

    #[test]
    fn test_builtins_register_cleanly() {
        let registry = FunctionRegistry::with_builtins().unwrap();
        for name in [
            "averageSeries",
            "avg",
            "minSeries",
            "maxSeries",
            "summarize",
            "filterSeries",
            "groupByNode",
            "groupByNodes",
            "ewma",
            "exponentialWeightedMovingAverage",
        ] {
            assert!(registry.contains(name), "missing {}", name);
        }
        let catalogue = registry.catalogue();
        assert!(catalogue.contains_key("summarize"));
        assert!(catalogue.contains_key("groupByNodes"));
    }
}
