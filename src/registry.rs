//! Type identifier to constructor mapping.
//!
//! Built once at startup by the embedder from its catalog of graph-object
//! kinds; no runtime type discovery happens here. A lookup miss is not an
//! error: it signals "preserve this fragment as an unknown object".

use std::collections::HashMap;
use std::rc::Rc;

use anyhow::Result;

use crate::object::Handle;

type Factory = Rc<dyn Fn() -> Result<Handle>>;

/// Maps stable type identifier strings (and legacy aliases) to constructors.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    factories: HashMap<String, Factory>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructible kind under its stable type name.
    pub fn register<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Handle> + 'static,
    {
        self.factories.insert(type_name.into(), Rc::new(factory));
    }

    /// Map a deprecated type name onto an already-registered kind. Returns
    /// `false` if `canonical` has not been registered.
    pub fn register_alias(&mut self, legacy_name: impl Into<String>, canonical: &str) -> bool {
        let Some(factory) = self.factories.get(canonical).cloned() else {
            return false;
        };
        self.factories.insert(legacy_name.into(), factory);
        true
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Construct an instance of the named kind, or `None` when the name is
    /// unresolvable and the caller should fall back to an unknown object.
    pub fn create(&self, type_name: &str) -> Option<Result<Handle>> {
        self.factories.get(type_name).map(|factory| factory())
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}
