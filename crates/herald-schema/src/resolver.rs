//! Resolvers and resolver maps.
//!
//! A resolver is written against concrete input and output types and erased
//! to JSON only when it enters a [`ResolverMap`], via [`typed_resolver`].

use std::collections::BTreeMap;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Boxed future returned by an erased resolver.
pub type ResolverFuture<E> = Pin<Box<dyn Future<Output = Result<Value, E>> + Send + 'static>>;

/// A field implementation callable with a request context and JSON arguments.
pub trait Resolver<C, E>: Send + Sync {
    fn resolve(&self, ctx: C, args: Value) -> ResolverFuture<E>;
}

struct FnResolver<F, A, R, Fut> {
    func: F,
    _types: PhantomData<fn(A) -> (R, Fut)>,
}

impl<C, E, F, A, R, Fut> Resolver<C, E> for FnResolver<F, A, R, Fut>
where
    F: Fn(C, A) -> Fut + Send + Sync,
    A: DeserializeOwned,
    R: Serialize,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    E: From<serde_json::Error> + Send + 'static,
{
    fn resolve(&self, ctx: C, args: Value) -> ResolverFuture<E> {
        // A missing argument object is treated as `{}` so input structs made of
        // optional fields accept it.
        let args = if args.is_null() {
            Value::Object(Default::default())
        } else {
            args
        };

        let input = match serde_json::from_value::<A>(args) {
            Ok(input) => input,
            Err(e) => return Box::pin(async move { Err(E::from(e)) }),
        };

        let fut = (self.func)(ctx, input);
        Box::pin(async move {
            let output = fut.await?;
            Ok(serde_json::to_value(output)?)
        })
    }
}

/// Wraps a typed async function as an erased resolver.
///
/// Malformed arguments surface as `E::from(serde_json::Error)` without
/// calling `func`.
pub fn typed_resolver<C, E, A, R, F, Fut>(func: F) -> Arc<dyn Resolver<C, E>>
where
    C: 'static,
    F: Fn(C, A) -> Fut + Send + Sync + 'static,
    A: DeserializeOwned + 'static,
    R: Serialize + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    E: From<serde_json::Error> + Send + 'static,
{
    Arc::new(FnResolver {
        func,
        _types: PhantomData,
    })
}

/// Resolvers keyed by `"Type.field"`.
pub struct ResolverMap<C, E> {
    entries: BTreeMap<String, Arc<dyn Resolver<C, E>>>,
}

impl<C, E> Default for ResolverMap<C, E> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<C, E> ResolverMap<C, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resolver, returning the one it replaced, if any.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        resolver: Arc<dyn Resolver<C, E>>,
    ) -> Option<Arc<dyn Resolver<C, E>>> {
        self.entries.insert(key.into(), resolver)
    }

    pub fn get(&self, key: &str) -> Option<&Arc<dyn Resolver<C, E>>> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> impl Iterator<Item = (String, Arc<dyn Resolver<C, E>>)> {
        self.entries.into_iter()
    }
}

impl<C, E> std::fmt::Debug for ResolverMap<C, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}
