//! `users` module: sign-up, login, and the caller's own account.

use herald_content::{CreateUserParams, ListParams, UpdateUserParams};
use herald_schema::{typed_resolver, ParseSchemaError, SchemaFragment};
use herald_types::User;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{Module, NoArgs};
use crate::auth::{AuthError, Authenticator};
use crate::context::RequestContext;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateUserArgs {
    pub name: String,
    pub email: String,
    pub password: String,
    pub age: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct LoginArgs {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: User,
}

pub fn module(authenticator: Arc<Authenticator>) -> Result<Module, ParseSchemaError> {
    let schema = SchemaFragment::parse("users", include_str!("users.graphql"))?;
    Ok(Module::new("users")
        .schema(schema)
        .export(authenticator)
        .resolver("Query.users", typed_resolver(users))
        .resolver("Query.me", typed_resolver(me))
        .resolver("Mutation.createUser", typed_resolver(create_user))
        .resolver("Mutation.login", typed_resolver(login))
        .resolver("Mutation.updateUser", typed_resolver(update_user))
        .resolver("Mutation.deleteUser", typed_resolver(delete_user)))
}

async fn users(ctx: RequestContext, list: ListParams) -> Result<Vec<User>, ApiError> {
    ctx.read(move |conn| herald_content::list_users(conn, &list))
        .await
}

async fn me(ctx: RequestContext, _: NoArgs) -> Result<Option<User>, ApiError> {
    let Some(user_id) = ctx.auth.user_id() else {
        return Ok(None);
    };
    ctx.read(move |conn| match herald_content::get_user(conn, user_id) {
        Ok(user) => Ok(Some(user)),
        Err(herald_content::ContentError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    })
    .await
}

async fn create_user(ctx: RequestContext, args: CreateUserArgs) -> Result<User, ApiError> {
    let name = args.name.trim().to_string();
    let email = args.email.trim().to_lowercase();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".to_string()));
    }
    if !email.contains('@') {
        return Err(ApiError::BadRequest("email is not valid".to_string()));
    }

    let authenticator = ctx.provider::<Authenticator>()?;
    let password = args.password;
    let password_hash =
        tokio::task::spawn_blocking(move || authenticator.hash_password(&password)).await??;

    let params = CreateUserParams {
        name,
        email,
        password_hash,
        age: args.age,
    };
    let user = ctx
        .read(move |conn| herald_content::create_user(conn, &params))
        .await?;
    tracing::info!(user_id = user.id, "user created");
    Ok(user)
}

async fn login(ctx: RequestContext, args: LoginArgs) -> Result<AuthPayload, ApiError> {
    let authenticator = ctx.provider::<Authenticator>()?;
    let email = args.email.trim().to_lowercase();
    let credentials = ctx
        .read(move |conn| herald_content::find_credentials(conn, &email))
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    let password = args.password;
    let checker = Arc::clone(&authenticator);
    let stored_hash = credentials.password_hash;
    tokio::task::spawn_blocking(move || checker.verify_password(&password, &stored_hash))
        .await??;

    let user = credentials.user;
    tracing::debug!(user_id = user.id, "login succeeded");
    Ok(AuthPayload {
        token: authenticator.issue_token(user.id),
        user,
    })
}

async fn update_user(ctx: RequestContext, mut args: UpdateUserParams) -> Result<User, ApiError> {
    let user_id = ctx.require_user()?;
    if let Some(name) = args.name.as_mut() {
        *name = name.trim().to_string();
        if name.is_empty() {
            return Err(ApiError::BadRequest("name must not be empty".to_string()));
        }
    }
    if let Some(email) = args.email.as_mut() {
        *email = email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(ApiError::BadRequest("email is not valid".to_string()));
        }
    }
    ctx.read(move |conn| herald_content::update_user(conn, user_id, &args))
        .await
}

async fn delete_user(ctx: RequestContext, _: NoArgs) -> Result<User, ApiError> {
    let user_id = ctx.require_user()?;
    let user = ctx.gateway.delete_user(user_id).await?;
    tracing::info!(user_id, "user deleted");
    Ok(user)
}
