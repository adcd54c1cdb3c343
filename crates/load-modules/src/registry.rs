//! Name-to-factory lookup for load modules.

use crate::builtin;
use crate::error::LoadError;
use crate::params::LoadParams;
use crate::worker::{LoadModule, LoadThread};
use std::collections::BTreeMap;

/// Builds a module from its resolved parameters.
pub type ModuleFactory = fn(&LoadParams) -> Result<Box<dyn LoadModule>, LoadError>;

#[derive(Clone)]
struct Registration {
    factory: ModuleFactory,
    description: &'static str,
}

/// Known load modules, keyed by module name.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, Registration>,
}

impl ModuleRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in module.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }

    /// Register (or replace) a module.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        description: &'static str,
        factory: ModuleFactory,
    ) {
        self.modules.insert(
            name.into(),
            Registration {
                factory,
                description,
            },
        );
    }

    pub fn contains(&self, module: &str) -> bool {
        self.modules.contains_key(module)
    }

    /// Registered module names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    pub fn describe(&self, module: &str) -> Option<&'static str> {
        self.modules.get(module).map(|r| r.description)
    }

    /// Instantiate `module` as a worker called `name`.
    pub fn create(
        &self,
        module: &str,
        name: &str,
        params: LoadParams,
    ) -> Result<LoadThread, LoadError> {
        let registration = self
            .modules
            .get(module)
            .ok_or_else(|| LoadError::UnknownModule(module.to_string()))?;
        let instance = (registration.factory)(&params)?;
        LoadThread::new(name, params, instance)
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.modules.keys()).finish()
    }
}
