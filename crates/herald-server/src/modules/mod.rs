//! The API's feature modules.
//!
//! Each module pairs an SDL fragment with the resolvers that implement it.
//! Subscription fields are served as SSE streams by [`crate::api_sse`]; they
//! appear in the schema but have no resolver.
//!
//! Relation fields such as `Post.author` are operations too. They take the
//! parent's key as `{ "id": N }` and apply the same draft rules as the
//! top-level queries.

pub mod comments;
pub mod posts;
pub mod users;

use herald_schema::{ApiModule, ParseSchemaError};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::Authenticator;
use crate::context::RequestContext;
use crate::error::ApiError;

pub type Module = ApiModule<RequestContext, ApiError>;

/// Arguments for operations that take none.
#[derive(Debug, Default, Deserialize)]
pub struct NoArgs {}

/// Arguments naming a single entity.
#[derive(Debug, Deserialize)]
pub struct IdArgs {
    pub id: i64,
}

/// Every module in registration order.
pub fn all(authenticator: Arc<Authenticator>) -> Result<Vec<Module>, ParseSchemaError> {
    Ok(vec![
        users::module(authenticator)?,
        posts::module()?,
        comments::module()?,
    ])
}
