//! Module composition for the Herald API.
//!
//! Each feature area (users, posts, comments) ships as an [`ApiModule`]: a
//! schema fragment describing its types and fields, a resolver map
//! implementing those fields, the providers it offers to other modules, and
//! the providers it needs from them. [`assemble`] merges every module into one
//! servable unit or refuses to, before the server starts listening.
//!
//! # Merge rules
//!
//! | Part | On collision |
//! |------|--------------|
//! | Schema fields (`Type.field`) | fatal [`AssembleError::SchemaConflict`] |
//! | Resolvers (`Type.field`) | last registered wins, logged at `warn` |
//! | Exported providers (by Rust type) | fatal [`AssembleError::DuplicateProvider`] |
//! | Required providers | fatal [`AssembleError::MissingProvider`] if nobody exports them |

mod assemble;
mod fragment;
mod provider;
mod resolver;

pub use assemble::{assemble, ApiModule, AssembleError, Assembled};
pub use fragment::{FieldDef, ParseSchemaError, Schema, SchemaFragment, TypeKind};
pub use provider::{Provider, ProviderKey, Providers};
pub use resolver::{typed_resolver, Resolver, ResolverFuture, ResolverMap};
