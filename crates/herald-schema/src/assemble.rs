use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::fragment::{Schema, SchemaFragment};
use crate::provider::{Provider, ProviderKey, Providers};
use crate::resolver::{Resolver, ResolverMap};

/// Reasons the modules cannot be served together. All are fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssembleError {
    #[error("field {type_name}.{field} is defined by both `{first}` and `{second}`")]
    SchemaConflict {
        type_name: String,
        field: String,
        first: String,
        second: String,
    },
    #[error("module `{module}` requires provider {provider}, which no module exports")]
    MissingProvider { module: String, provider: String },
    #[error("provider {provider} is exported by both `{first}` and `{second}`")]
    DuplicateProvider {
        provider: String,
        first: String,
        second: String,
    },
}

/// One feature area's contribution to the API.
pub struct ApiModule<C, E> {
    name: String,
    schema: SchemaFragment,
    resolvers: ResolverMap<C, E>,
    exports: Vec<Provider>,
    requires: Vec<ProviderKey>,
}

impl<C, E> ApiModule<C, E> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: SchemaFragment::default(),
            resolvers: ResolverMap::new(),
            exports: Vec::new(),
            requires: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the module's schema fragment.
    pub fn schema(mut self, fragment: SchemaFragment) -> Self {
        self.schema = fragment;
        self
    }

    /// Registers the resolver for `key` (`"Type.field"`).
    pub fn resolver(mut self, key: impl Into<String>, resolver: Arc<dyn Resolver<C, E>>) -> Self {
        self.resolvers.insert(key, resolver);
        self
    }

    /// Offers `value` to every other module.
    pub fn export<T: Any + Send + Sync>(mut self, value: Arc<T>) -> Self {
        self.exports.push(Provider::new(value));
        self
    }

    /// Declares that this module cannot work unless some module exports `T`.
    pub fn require<T: Any>(mut self) -> Self {
        self.requires.push(ProviderKey::of::<T>());
        self
    }
}

/// The merged result of [`assemble`].
pub struct Assembled<C, E> {
    pub schema: Schema,
    pub resolvers: ResolverMap<C, E>,
    pub providers: Providers,
}

impl<C, E> fmt::Debug for Assembled<C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assembled")
            .field("types", &self.schema.type_names().collect::<Vec<_>>())
            .field("resolvers", &self.resolvers)
            .field("providers", &self.providers)
            .finish()
    }
}

/// Merges modules in order.
///
/// Schema and provider collisions fail. Resolver collisions keep the
/// resolver registered last.
pub fn assemble<C, E>(
    modules: impl IntoIterator<Item = ApiModule<C, E>>,
) -> Result<Assembled<C, E>, AssembleError> {
    let mut schema = Schema::default();
    let mut resolvers = ResolverMap::new();
    let mut providers = Providers::default();
    let mut exporters: HashMap<ProviderKey, String> = HashMap::new();
    let mut requirements: Vec<(String, ProviderKey)> = Vec::new();
    let mut resolver_owner: HashMap<String, String> = HashMap::new();

    for module in modules {
        let ApiModule {
            name,
            schema: fragment,
            resolvers: module_resolvers,
            exports,
            requires,
        } = module;

        for (type_name, kind, fields) in fragment.types {
            for field in fields {
                let field_name = field.name.clone();
                schema
                    .insert(&type_name, kind, field, &name)
                    .map_err(|first| AssembleError::SchemaConflict {
                        type_name: type_name.clone(),
                        field: field_name,
                        first,
                        second: name.clone(),
                    })?;
            }
        }

        for provider in exports {
            let key = provider.key();
            if let Err(rejected) = providers.insert(provider) {
                return Err(AssembleError::DuplicateProvider {
                    provider: rejected.key().to_string(),
                    first: exporters.get(&key).cloned().unwrap_or_default(),
                    second: name,
                });
            }
            exporters.insert(key, name.clone());
        }

        requirements.extend(requires.into_iter().map(|key| (name.clone(), key)));

        for (key, resolver) in module_resolvers.into_entries() {
            if let Some(previous) = resolver_owner.insert(key.clone(), name.clone()) {
                tracing::warn!(
                    resolver = %key,
                    replaced = %previous,
                    by = %name,
                    "resolver registered twice, keeping the later one"
                );
            }
            resolvers.insert(key, resolver);
        }
    }

    for (module, key) in requirements {
        if !providers.contains(&key) {
            return Err(AssembleError::MissingProvider {
                module,
                provider: key.to_string(),
            });
        }
    }

    for key in resolvers.keys() {
        let field = key
            .split_once('.')
            .and_then(|(type_name, field)| schema.field(type_name, field));
        if field.is_none() {
            tracing::warn!(resolver = %key, "resolver has no matching schema field");
        }
    }

    tracing::debug!(
        types = schema.type_names().count(),
        fields = schema.field_count(),
        resolvers = resolvers.len(),
        providers = providers.len(),
        "api modules assembled"
    );

    Ok(Assembled {
        schema,
        resolvers,
        providers,
    })
}
