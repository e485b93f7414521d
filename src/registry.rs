//! The set of refactorings the front door can run.
//!
//! Refactorings are registered under a short name (`rename`, `var`) and
//! listed in registration order. A registry is an ordinary value: build one
//! with [`Registry::with_defaults`] and pass it where it is needed.

use gorefactor_go::{ExtractLocal, Refactoring, Rename};
use thiserror::Error;

/// Errors from registering refactorings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The short name is already in use.
    #[error("a refactoring named '{name}' is already registered")]
    Duplicate { name: String },

    /// Short names are single words used on the command line.
    #[error("invalid refactoring name '{name}'")]
    InvalidName { name: String },
}

/// Refactorings by short name, in registration order.
#[derive(Default)]
pub struct Registry {
    entries: Vec<(String, Box<dyn Refactoring>)>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Registry::default()
    }

    /// A registry holding every built-in refactoring.
    pub fn with_defaults() -> Self {
        let mut registry = Registry::new();
        registry.insert("rename", Box::new(Rename));
        registry.insert("var", Box::new(ExtractLocal));
        registry
    }

    fn insert(&mut self, short_name: &str, refactoring: Box<dyn Refactoring>) {
        self.entries.push((short_name.to_string(), refactoring));
    }

    /// Register `refactoring` under `short_name`.
    pub fn add(
        &mut self,
        short_name: impl Into<String>,
        refactoring: Box<dyn Refactoring>,
    ) -> Result<(), RegistryError> {
        let name = short_name.into();
        if name.is_empty() || name.starts_with('-') || name.contains(char::is_whitespace) {
            return Err(RegistryError::InvalidName { name });
        }
        if self.get(&name).is_some() {
            return Err(RegistryError::Duplicate { name });
        }
        self.insert(&name, refactoring);
        Ok(())
    }

    pub fn get(&self, short_name: &str) -> Option<&dyn Refactoring> {
        self.entries
            .iter()
            .find(|(name, _)| name == short_name)
            .map(|(_, refactoring)| refactoring.as_ref())
    }

    /// `(short name, refactoring)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &dyn Refactoring)> {
        self.entries
            .iter()
            .map(|(name, refactoring)| (name.as_str(), refactoring.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(name, _)| name))
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use gorefactor_go::{Config, Description, Program, RefactoringResult};

    struct Noop;

    impl Refactoring for Noop {
        fn description(&self) -> Description {
            Description {
                name: "Noop".to_string(),
                synopsis: "Does nothing".to_string(),
                usage: String::new(),
                params: Vec::new(),
                multifile: false,
                hidden: true,
            }
        }

        fn run(&self, _program: &Program, _config: &Config) -> RefactoringResult {
            RefactoringResult::default()
        }
    }

    mod defaults {
        use super::*;

        #[test]
        fn test_defaults_in_order() {
            let registry = Registry::with_defaults();
            let names: Vec<&str> = registry.iter().map(|(name, _)| name).collect();
            assert_eq!(names, vec!["rename", "var"]);
        }

        #[test]
        fn test_get_by_short_name() {
            let registry = Registry::with_defaults();
            assert_eq!(registry.get("rename").unwrap().description().name, "Rename");
            assert_eq!(
                registry.get("var").unwrap().description().name,
                "Extract Local Variable Refactoring"
            );
            assert!(registry.get("extract").is_none());
        }
    }

    mod add {
        use super::*;

        #[test]
        fn test_add_appends() {
            let mut registry = Registry::with_defaults();
            registry.add("noop", Box::new(Noop)).unwrap();
            assert_eq!(registry.len(), 3);
            assert_eq!(registry.iter().last().unwrap().0, "noop");
        }

        #[test]
        fn test_taken_name_is_rejected() {
            let mut registry = Registry::with_defaults();
            let err = registry.add("rename", Box::new(Noop)).unwrap_err();
            assert_eq!(
                err,
                RegistryError::Duplicate {
                    name: "rename".to_string()
                }
            );
            assert_eq!(registry.len(), 2);
            assert_eq!(registry.get("rename").unwrap().description().name, "Rename");
        }

        #[test]
        fn test_invalid_names() {
            let mut registry = Registry::new();
            assert!(registry.is_empty());
            for name in ["", "--file", "two words"] {
                assert!(matches!(
                    registry.add(name, Box::new(Noop)),
                    Err(RegistryError::InvalidName { .. })
                ));
            }
        }
    }
}
