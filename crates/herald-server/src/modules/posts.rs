//! `posts` module.

use herald_content::{CreatePostParams, ListParams, UpdatePostParams};
use herald_schema::{typed_resolver, ParseSchemaError, SchemaFragment};
use herald_types::{AuthContext, PostSnapshot, User};
use serde::Deserialize;
use std::sync::Arc;

use super::{IdArgs, Module};
use crate::context::RequestContext;
use crate::error::ApiError;

/// Who may see and change a post. Shared with the comments module.
#[derive(Debug, Default)]
pub struct PostAccess;

impl PostAccess {
    /// Published posts are public; drafts are visible to their author only.
    pub fn can_read(&self, post: &PostSnapshot, auth: AuthContext) -> bool {
        post.published || self.is_author(post, auth)
    }

    pub fn is_author(&self, post: &PostSnapshot, auth: AuthContext) -> bool {
        auth.user_id() == Some(post.author_id)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePostArgs {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub published: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostArgs {
    pub id: i64,
    #[serde(flatten)]
    pub updates: UpdatePostParams,
}

pub fn module() -> Result<Module, ParseSchemaError> {
    let schema = SchemaFragment::parse("posts", include_str!("posts.graphql"))?;
    Ok(Module::new("posts")
        .schema(schema)
        .export(Arc::new(PostAccess))
        .resolver("Query.posts", typed_resolver(posts))
        .resolver("Query.post", typed_resolver(post))
        .resolver("Post.author", typed_resolver(post_author))
        .resolver("User.posts", typed_resolver(user_posts))
        .resolver("Mutation.createPost", typed_resolver(create_post))
        .resolver("Mutation.updatePost", typed_resolver(update_post))
        .resolver("Mutation.deletePost", typed_resolver(delete_post)))
}

async fn posts(ctx: RequestContext, list: ListParams) -> Result<Vec<PostSnapshot>, ApiError> {
    ctx.read(move |conn| herald_content::list_published_posts(conn, &list))
        .await
}

async fn post(ctx: RequestContext, args: IdArgs) -> Result<Option<PostSnapshot>, ApiError> {
    let access = ctx.provider::<PostAccess>()?;
    let found = ctx
        .read(move |conn| herald_content::find_post(conn, args.id))
        .await?;
    Ok(found.filter(|post| access.can_read(post, ctx.auth)))
}

async fn post_author(ctx: RequestContext, args: IdArgs) -> Result<User, ApiError> {
    let access = ctx.provider::<PostAccess>()?;
    let id = args.id;
    let (post, author) = ctx
        .read(move |conn| {
            let post = herald_content::get_post(conn, id)?;
            let author = herald_content::get_user(conn, post.author_id)?;
            Ok((post, author))
        })
        .await?;

    if !access.can_read(&post, ctx.auth) {
        return Err(ApiError::NotFound(format!("post {id}")));
    }
    Ok(author)
}

/// A user's posts, without the drafts the caller may not see.
async fn user_posts(ctx: RequestContext, args: IdArgs) -> Result<Vec<PostSnapshot>, ApiError> {
    let access = ctx.provider::<PostAccess>()?;
    let user_id = args.id;
    let posts = ctx
        .read(move |conn| {
            herald_content::get_user(conn, user_id)?;
            herald_content::list_posts_by_author(conn, user_id)
        })
        .await?;
    Ok(posts
        .into_iter()
        .filter(|post| access.can_read(post, ctx.auth))
        .collect())
}

async fn create_post(ctx: RequestContext, args: CreatePostArgs) -> Result<PostSnapshot, ApiError> {
    let author_id = ctx.require_user()?;
    if args.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title must not be empty".to_string()));
    }

    let post = ctx
        .gateway
        .create_post(CreatePostParams {
            title: args.title,
            body: args.body,
            published: args.published,
            author_id,
        })
        .await?;
    tracing::debug!(post_id = post.id, published = post.published, "post created");
    Ok(post)
}

async fn update_post(ctx: RequestContext, args: UpdatePostArgs) -> Result<PostSnapshot, ApiError> {
    authorize_author(&ctx, args.id).await?;
    if args
        .updates
        .title
        .as_deref()
        .is_some_and(|title| title.trim().is_empty())
    {
        return Err(ApiError::BadRequest("title must not be empty".to_string()));
    }
    ctx.gateway.update_post(args.id, args.updates).await
}

async fn delete_post(ctx: RequestContext, args: IdArgs) -> Result<PostSnapshot, ApiError> {
    authorize_author(&ctx, args.id).await?;
    ctx.gateway.delete_post(args.id).await
}

/// Succeeds only if the caller wrote post `id`. Other people's drafts are
/// reported as missing.
async fn authorize_author(ctx: &RequestContext, id: i64) -> Result<(), ApiError> {
    let caller = ctx.require_user()?;
    let access = ctx.provider::<PostAccess>()?;
    let post = ctx
        .read(move |conn| herald_content::get_post(conn, id))
        .await?;

    if access.is_author(&post, ctx.auth) {
        Ok(())
    } else if access.can_read(&post, ctx.auth) {
        tracing::debug!(post_id = id, caller, "refused edit by non-author");
        Err(ApiError::Forbidden("only the author may change a post".to_string()))
    } else {
        Err(ApiError::NotFound(format!("post {id}")))
    }
}
