//! Typed services that modules share with one another.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Identifies a provider by its Rust type.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProviderKey {
    id: TypeId,
    name: &'static str,
}

impl ProviderKey {
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ProviderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for ProviderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A shared service instance exported by a module.
#[derive(Clone)]
pub struct Provider {
    key: ProviderKey,
    value: Arc<dyn Any + Send + Sync>,
}

impl Provider {
    pub fn new<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            key: ProviderKey::of::<T>(),
            value,
        }
    }

    pub fn key(&self) -> ProviderKey {
        self.key
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Provider").field(&self.key).finish()
    }
}

/// Every provider exported by the assembled modules.
#[derive(Clone, Default)]
pub struct Providers {
    entries: HashMap<ProviderKey, Provider>,
}

impl Providers {
    /// Adds a provider. On collision the existing entry is kept and the
    /// rejected one is handed back.
    pub(crate) fn insert(&mut self, provider: Provider) -> Result<(), Provider> {
        if self.entries.contains_key(&provider.key) {
            return Err(provider);
        }
        self.entries.insert(provider.key, provider);
        Ok(())
    }

    pub fn contains(&self, key: &ProviderKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Fetches a provider by type.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let provider = self.entries.get(&ProviderKey::of::<T>())?;
        Arc::clone(&provider.value).downcast::<T>().ok()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Providers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}
