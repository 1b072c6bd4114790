use axum::{Json, extract::State};
use tracing::info;

use kindred_db::models::PostRow;
use kindred_types::api::{CreatePostRequest, PostResponse};

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::{AppState, run_blocking};

/// How many posts `GET /posts` returns.
pub const RECENT_POSTS_LIMIT: u32 = 5;

pub async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let rows = run_blocking(move || Ok(state.db.list_recent_posts(RECENT_POSTS_LIMIT)?)).await?;
    Ok(Json(rows.into_iter().map(post_view).collect()))
}

/// Author name is taken as given; it is not checked against registered users.
pub async fn create_post(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreatePostRequest>,
) -> Result<Json<PostResponse>, ApiError> {
    let row = run_blocking(move || {
        Ok(state
            .db
            .create_post(&req.user_name, &req.content, req.image_base64.as_deref())?)
    })
    .await?;

    info!(post_id = row.id, user_name = %row.user_name, "post created");
    Ok(Json(post_view(row)))
}

fn post_view(row: PostRow) -> PostResponse {
    PostResponse {
        id: row.id,
        user_name: row.user_name,
        created_at: row.created_at,
        content: row.content,
        image_base64: row.image_base64,
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{Value, json};

    use crate::test_support::{send, test_app};

    #[tokio::test]
    async fn lists_five_newest_first() {
        let app = test_app();
        for i in 1..=7 {
            let (status, _) = send(
                &app,
                Method::POST,
                "/posts",
                Some(json!({ "user_name": "alice", "content": format!("P{i}") })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = send(&app, Method::GET, "/posts", None).await;
        assert_eq!(status, StatusCode::OK);

        let contents: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["content"].as_str().unwrap())
            .collect();
        assert_eq!(contents, ["P7", "P6", "P5", "P4", "P3"]);
    }

    #[tokio::test]
    async fn created_post_echoes_with_assigned_id() {
        let app = test_app();

        let (status, first) = send(
            &app,
            Method::POST,
            "/posts",
            Some(json!({ "user_name": "alice", "content": "hi" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["user_name"], "alice");
        assert_eq!(first["content"], "hi");
        assert_eq!(first["image_base64"], Value::Null);
        assert!(first["created_at"].is_string());

        let (_, second) = send(
            &app,
            Method::POST,
            "/posts",
            Some(json!({ "user_name": "bob", "content": "look", "image_base64": "iVBORw0KGgo=" })),
        )
        .await;
        assert_eq!(second["image_base64"], "iVBORw0KGgo=");
        assert!(second["id"].as_i64().unwrap() > first["id"].as_i64().unwrap());
    }

    #[tokio::test]
    async fn empty_feed_is_an_empty_list() {
        let app = test_app();
        let (status, body) = send(&app, Method::GET, "/posts", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn malformed_post_is_a_client_error() {
        let app = test_app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/posts",
            Some(json!({ "content": "no author" })),
        )
        .await;
        assert!(status.is_client_error());
        assert!(body["detail"].as_str().unwrap().contains("user_name"));
    }

    #[tokio::test]
    async fn unknown_keys_in_post_body_are_ignored() {
        let app = test_app();
        let (status, post) = send(
            &app,
            Method::POST,
            "/posts",
            Some(json!({ "user_name": "alice", "content": "hi", "client_ts": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(post["content"], "hi");
        assert!(post.get("client_ts").is_none());
    }
}
