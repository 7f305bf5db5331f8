mod common;

use axum::http::StatusCode;
use common::test_app;
use serde_json::json;

#[tokio::test]
async fn health_check_returns_ok() {
    let app = test_app();
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], "0.0.1");
}

#[tokio::test]
async fn schema_merges_every_module() {
    let app = test_app();
    let (status, body) = app.get("/api/schema", None).await;
    assert_eq!(status, StatusCode::OK);

    let sdl = body.as_str().unwrap();
    for expected in [
        "type Post {",
        "type Comment {",
        "type User {",
        "createPost(title: String!, body: String!, published: Boolean): Post!",
        "postComments(postId: Int!): [Comment!]!",
        "me: User",
        "author: User!",
        "posts: [Post!]!",
        "comments: [Comment!]!",
    ] {
        assert!(sdl.contains(expected), "schema is missing `{expected}`:\n{sdl}");
    }
}

#[tokio::test]
async fn sign_up_login_and_me() {
    let app = test_app();
    let (user_id, token) = app.sign_up("Ada").await;

    let me = app.ok(Some(&token), "Query.me", json!({})).await;
    assert_eq!(me["id"], user_id);
    assert_eq!(me["email"], "ada@example.com");
    assert!(me.get("passwordHash").is_none());

    let anonymous = app.ok(None, "Query.me", json!(null)).await;
    assert!(anonymous.is_null());
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let app = test_app();
    app.sign_up("Ada").await;
    let (status, body) = app
        .op(
            None,
            "Mutation.createUser",
            json!({ "name": "Imposter", "email": "ADA@example.com", "password": "password123" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "email already taken");
}

#[tokio::test]
async fn weak_password_is_rejected() {
    let app = test_app();
    let (status, _) = app
        .op(
            None,
            "Mutation.createUser",
            json!({ "name": "Ada", "email": "ada@example.com", "password": "short" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = test_app();
    app.sign_up("Ada").await;
    let (status, _) = app
        .op(
            None,
            "Mutation.login",
            json!({ "email": "ada@example.com", "password": "not-the-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forged_token_is_rejected_before_dispatch() {
    let app = test_app();
    let (status, _) = app.op(Some("forged"), "Query.posts", json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_operation_is_not_found() {
    let app = test_app();
    let (status, body) = app.op(None, "Query.nothing", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("Query.nothing"));
}

#[tokio::test]
async fn malformed_args_are_bad_requests() {
    let app = test_app();
    let (status, _) = app.op(None, "Query.post", json!({ "id": "seven" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn drafts_are_private() {
    let app = test_app();
    let (_, alice) = app.sign_up("Alice").await;
    let (_, bob) = app.sign_up("Bob").await;
    let draft = app.create_post(&alice, "Secret", false).await;
    app.create_post(&alice, "Public", true).await;

    let listed = app.ok(None, "Query.posts", json!({})).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["title"], "Public");

    let as_author = app.ok(Some(&alice), "Query.post", json!({ "id": draft["id"] })).await;
    assert_eq!(as_author["title"], "Secret");
    let as_other = app.ok(Some(&bob), "Query.post", json!({ "id": draft["id"] })).await;
    assert!(as_other.is_null());

    let (status, _) = app
        .op(Some(&bob), "Mutation.deletePost", json!({ "id": draft["id"] }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn post_search_and_pagination() {
    let app = test_app();
    let (_, token) = app.sign_up("Alice").await;
    for title in ["Rust async", "Gardening", "Rust traits"] {
        app.create_post(&token, title, true).await;
    }

    let found = app.ok(None, "Query.posts", json!({ "query": "rust" })).await;
    assert_eq!(found.as_array().unwrap().len(), 2);

    let page = app
        .ok(None, "Query.posts", json!({ "skip": 1, "take": 1 }))
        .await;
    assert_eq!(page.as_array().unwrap().len(), 1);
    assert_eq!(page[0]["title"], "Gardening");
}

#[tokio::test]
async fn comments_on_drafts_are_refused() {
    let app = test_app();
    let (_, alice) = app.sign_up("Alice").await;
    let draft = app.create_post(&alice, "Draft", false).await;

    let (status, _) = app
        .op(
            Some(&alice),
            "Mutation.createComment",
            json!({ "postId": draft["id"], "text": "note to self" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comment_permissions() {
    let app = test_app();
    let (_, alice) = app.sign_up("Alice").await;
    let (_, bob) = app.sign_up("Bob").await;
    let (_, carol) = app.sign_up("Carol").await;
    let post = app.create_post(&alice, "Post", true).await;

    let comment = app
        .ok(
            Some(&bob),
            "Mutation.createComment",
            json!({ "postId": post["id"], "text": "hello" }),
        )
        .await;

    let (status, _) = app
        .op(
            Some(&alice),
            "Mutation.updateComment",
            json!({ "id": comment["id"], "text": "rewritten" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "only the comment author edits");

    let (status, _) = app
        .op(Some(&carol), "Mutation.deleteComment", json!({ "id": comment["id"] }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let listed = app
        .ok(None, "Query.postComments", json!({ "postId": post["id"] }))
        .await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    app.ok(Some(&alice), "Mutation.deleteComment", json!({ "id": comment["id"] }))
        .await;
    let listed = app.ok(None, "Query.comments", json!({})).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn update_and_delete_self() {
    let app = test_app();
    let (user_id, token) = app.sign_up("Ada").await;

    let updated = app
        .ok(
            Some(&token),
            "Mutation.updateUser",
            json!({ "name": "Ada Lovelace", "age": 36 }),
        )
        .await;
    assert_eq!(updated["name"], "Ada Lovelace");
    assert_eq!(updated["age"], 36);

    let deleted = app.ok(Some(&token), "Mutation.deleteUser", json!({})).await;
    assert_eq!(deleted["id"], user_id);

    let users = app.ok(None, "Query.users", json!({})).await;
    assert!(users.as_array().unwrap().is_empty());
    let me = app.ok(Some(&token), "Query.me", json!({})).await;
    assert!(me.is_null());
}

#[tokio::test]
async fn subscription_stats_start_empty() {
    let app = test_app();
    let _posts = app.bus.subscribe(herald_types::Topic::Posts);

    let (status, body) = app.get("/api/stats/subscriptions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["topicCount"], 1);
    assert_eq!(body["topics"][0]["topic"], "post");
    assert_eq!(body["topics"][0]["subscribers"], 1);
}

#[tokio::test]
async fn relations_follow_draft_visibility() {
    let app = test_app();
    let (alice_id, alice) = app.sign_up("Alice").await;
    let (bob_id, bob) = app.sign_up("Bob").await;
    let public = app.create_post(&alice, "Public", true).await;
    let draft = app.create_post(&alice, "Draft", false).await;
    let comment = app
        .ok(
            Some(&bob),
            "Mutation.createComment",
            json!({ "postId": public["id"], "text": "nice" }),
        )
        .await;

    let as_anonymous = app.ok(None, "User.posts", json!({ "id": alice_id })).await;
    assert_eq!(as_anonymous.as_array().unwrap().len(), 1);
    assert_eq!(as_anonymous[0]["title"], "Public");
    let as_author = app
        .ok(Some(&alice), "User.posts", json!({ "id": alice_id }))
        .await;
    assert_eq!(as_author.as_array().unwrap().len(), 2);

    let author = app.ok(None, "Post.author", json!({ "id": public["id"] })).await;
    assert_eq!(author["id"], alice_id);
    assert!(author.get("passwordHash").is_none());
    let (status, _) = app
        .op(Some(&bob), "Post.author", json!({ "id": draft["id"] }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let on_post = app.ok(None, "Post.comments", json!({ "id": public["id"] })).await;
    assert_eq!(on_post[0]["id"], comment["id"]);
    let by_bob = app.ok(None, "User.comments", json!({ "id": bob_id })).await;
    assert_eq!(by_bob.as_array().unwrap().len(), 1);

    let commenter = app
        .ok(None, "Comment.author", json!({ "id": comment["id"] }))
        .await;
    assert_eq!(commenter["name"], "Bob");
    let parent = app.ok(None, "Comment.post", json!({ "id": comment["id"] })).await;
    assert_eq!(parent["id"], public["id"]);

    app.ok(
        Some(&alice),
        "Mutation.updatePost",
        json!({ "id": public["id"], "published": false }),
    )
    .await;
    let hidden = app.ok(None, "User.comments", json!({ "id": bob_id })).await;
    assert!(hidden.as_array().unwrap().is_empty());
    let (status, _) = app
        .op(None, "Comment.post", json!({ "id": comment["id"] }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn relations_of_missing_users_are_not_found() {
    let app = test_app();
    let (status, _) = app.op(None, "User.posts", json!({ "id": 404 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.op(None, "User.comments", json!({ "id": 404 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn renaming_to_blank_is_rejected() {
    let app = test_app();
    let (_, token) = app.sign_up("Ada").await;

    let (status, _) = app
        .op(Some(&token), "Mutation.updateUser", json!({ "name": "   " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let renamed = app
        .ok(Some(&token), "Mutation.updateUser", json!({ "name": "  Ada L.  " }))
        .await;
    assert_eq!(renamed["name"], "Ada L.");
}
