//! `comments` module.

use herald_content::{CreateCommentParams, ListParams, UpdateCommentParams};
use herald_schema::{typed_resolver, ParseSchemaError, SchemaFragment};
use herald_types::{CommentSnapshot, PostSnapshot, User};
use serde::Deserialize;

use super::posts::PostAccess;
use super::{IdArgs, Module};
use crate::context::RequestContext;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostCommentsArgs {
    pub post_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentArgs {
    pub post_id: i64,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentArgs {
    pub id: i64,
    pub text: String,
}

pub fn module() -> Result<Module, ParseSchemaError> {
    let schema = SchemaFragment::parse("comments", include_str!("comments.graphql"))?;
    Ok(Module::new("comments")
        .schema(schema)
        .require::<PostAccess>()
        .resolver("Query.comments", typed_resolver(comments))
        .resolver("Query.postComments", typed_resolver(post_comments))
        .resolver("Post.comments", typed_resolver(comments_of_post))
        .resolver("User.comments", typed_resolver(user_comments))
        .resolver("Comment.author", typed_resolver(comment_author))
        .resolver("Comment.post", typed_resolver(comment_post))
        .resolver("Mutation.createComment", typed_resolver(create_comment))
        .resolver("Mutation.updateComment", typed_resolver(update_comment))
        .resolver("Mutation.deleteComment", typed_resolver(delete_comment)))
}

async fn comments(ctx: RequestContext, list: ListParams) -> Result<Vec<CommentSnapshot>, ApiError> {
    ctx.read(move |conn| herald_content::list_comments(conn, &list))
        .await
}

async fn post_comments(
    ctx: RequestContext,
    args: PostCommentsArgs,
) -> Result<Vec<CommentSnapshot>, ApiError> {
    readable_comments(&ctx, args.post_id).await
}

async fn comments_of_post(
    ctx: RequestContext,
    args: IdArgs,
) -> Result<Vec<CommentSnapshot>, ApiError> {
    readable_comments(&ctx, args.id).await
}

/// Comments under post `post_id`, or `NotFound` if the caller may not read it.
async fn readable_comments(
    ctx: &RequestContext,
    post_id: i64,
) -> Result<Vec<CommentSnapshot>, ApiError> {
    let access = ctx.provider::<PostAccess>()?;
    let (post, comments) = ctx
        .read(move |conn| {
            let post = herald_content::get_post(conn, post_id)?;
            let comments = herald_content::list_comments_for_post(conn, post_id)?;
            Ok((post, comments))
        })
        .await?;

    if !access.can_read(&post, ctx.auth) {
        return Err(ApiError::NotFound(format!("post {post_id}")));
    }
    Ok(comments)
}

/// A user's comments, skipping those under posts the caller may not read.
async fn user_comments(
    ctx: RequestContext,
    args: IdArgs,
) -> Result<Vec<CommentSnapshot>, ApiError> {
    let access = ctx.provider::<PostAccess>()?;
    let user_id = args.id;
    let with_parents = ctx
        .read(move |conn| {
            herald_content::get_user(conn, user_id)?;
            herald_content::list_comments_by_author(conn, user_id)?
                .into_iter()
                .map(|comment| {
                    herald_content::get_post(conn, comment.post_id).map(|post| (comment, post))
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .await?;

    Ok(with_parents
        .into_iter()
        .filter(|(_, post)| access.can_read(post, ctx.auth))
        .map(|(comment, _)| comment)
        .collect())
}

async fn comment_author(ctx: RequestContext, args: IdArgs) -> Result<User, ApiError> {
    let (comment, _) = readable_comment(&ctx, args.id).await?;
    ctx.read(move |conn| herald_content::get_user(conn, comment.author_id))
        .await
}

async fn comment_post(ctx: RequestContext, args: IdArgs) -> Result<PostSnapshot, ApiError> {
    let (_, post) = readable_comment(&ctx, args.id).await?;
    Ok(post)
}

/// Comment `id` with its post. Comments under unreadable posts are missing.
async fn readable_comment(
    ctx: &RequestContext,
    id: i64,
) -> Result<(CommentSnapshot, PostSnapshot), ApiError> {
    let access = ctx.provider::<PostAccess>()?;
    let (comment, post) = ctx
        .read(move |conn| {
            let comment = herald_content::get_comment(conn, id)?;
            let post = herald_content::get_post(conn, comment.post_id)?;
            Ok((comment, post))
        })
        .await?;

    if !access.can_read(&post, ctx.auth) {
        return Err(ApiError::NotFound(format!("comment {id}")));
    }
    Ok((comment, post))
}

async fn create_comment(
    ctx: RequestContext,
    args: CreateCommentArgs,
) -> Result<CommentSnapshot, ApiError> {
    let author_id = ctx.require_user()?;
    let text = non_empty(args.text)?;
    ctx.gateway
        .create_comment(CreateCommentParams {
            text,
            author_id,
            post_id: args.post_id,
        })
        .await
}

async fn update_comment(
    ctx: RequestContext,
    args: UpdateCommentArgs,
) -> Result<CommentSnapshot, ApiError> {
    let caller = ctx.require_user()?;
    let text = non_empty(args.text)?;
    let id = args.id;
    let comment = ctx
        .read(move |conn| herald_content::get_comment(conn, id))
        .await?;

    if comment.author_id != caller {
        return Err(ApiError::Forbidden(
            "only the author may edit a comment".to_string(),
        ));
    }
    ctx.gateway
        .update_comment(id, UpdateCommentParams { text: Some(text) })
        .await
}

/// Comments may be removed by their author or by the author of the post.
async fn delete_comment(ctx: RequestContext, args: IdArgs) -> Result<CommentSnapshot, ApiError> {
    let caller = ctx.require_user()?;
    let access = ctx.provider::<PostAccess>()?;
    let id = args.id;
    let (comment, post) = ctx
        .read(move |conn| {
            let comment = herald_content::get_comment(conn, id)?;
            let post = herald_content::get_post(conn, comment.post_id)?;
            Ok((comment, post))
        })
        .await?;

    if comment.author_id != caller && !access.is_author(&post, ctx.auth) {
        return Err(ApiError::Forbidden(
            "only the comment or post author may delete a comment".to_string(),
        ));
    }
    ctx.gateway.delete_comment(id).await
}

fn non_empty(text: String) -> Result<String, ApiError> {
    if text.trim().is_empty() {
        Err(ApiError::BadRequest("text must not be empty".to_string()))
    } else {
        Ok(text)
    }
}
