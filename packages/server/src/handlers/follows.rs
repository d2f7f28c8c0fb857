//! Follow-graph handlers.
//!
//! - `POST   /v1/users/{id}/following`               — follow a user.
//! - `DELETE /v1/users/{id}/following/{followee_id}` — unfollow a user.
//! - `GET    /v1/users/{id}/following`               — users that `id` follows.
//! - `GET    /v1/users/{id}/followers`               — users that follow `id`.
//! - `GET    /v1/users/{id}/mutual`                  — users in both lists.
//!
//! Mutations must be signed by `{id}` itself. Listings require any valid
//! signature. The edge invariants (no self-follow, one edge per pair) are
//! enforced by the store; these handlers only translate its errors.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use socialgraph::UserId;
use socialgraph_api::{FollowRequest, UserRefList, UserRefPage};

use crate::{error::AppError, middleware::auth::RequireAuth};

use super::{AppState, PageQuery};

fn require_self(auth: &RequireAuth, id: UserId, action: &str) -> Result<(), AppError> {
    if auth.user_id != id {
        return Err(AppError::Forbidden(format!(
            "cannot {action} on behalf of another user"
        )));
    }
    Ok(())
}

/// `POST /v1/users/{id}/following` — create the edge `id → followee_id`.
///
/// Returns 201 with the new edge. Returns 400 (`self_follow`) when
/// `followee_id == id`, 404 when the followee is not registered, and 409
/// (`already_following`) when the edge exists.
pub async fn follow(
    State(state): State<AppState>,
    path: Result<Path<UserId>, PathRejection>,
    auth: RequireAuth,
    payload: Result<Json<FollowRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = path?;
    let Json(req) = payload?;
    require_self(&auth, id, "follow")?;

    state.require_user(req.followee_id).await?;

    let edge = state.storage.follow(id, req.followee_id).await?;
    tracing::info!(follower = %id, followee = %req.followee_id, "follow");
    Ok((StatusCode::CREATED, Json(edge)))
}

/// `DELETE /v1/users/{id}/following/{followee_id}`
///
/// Returns 204 on success and 404 when `id` does not follow `followee_id`.
pub async fn unfollow(
    State(state): State<AppState>,
    path: Result<Path<(UserId, UserId)>, PathRejection>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, AppError> {
    let Path((id, followee)) = path?;
    require_self(&auth, id, "unfollow")?;

    if !state.storage.unfollow(id, followee).await? {
        return Err(AppError::NotFound(format!(
            "user {id} does not follow user {followee}"
        )));
    }
    tracing::info!(follower = %id, followee = %followee, "unfollow");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /v1/users/{id}/following?page=&limit=`
pub async fn list_following(
    State(state): State<AppState>,
    path: Result<Path<UserId>, PathRejection>,
    _auth: RequireAuth,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<UserRefPage>, AppError> {
    let Path(id) = path?;
    let Query(query) = query?;
    let page = query.resolve(&state.config)?;

    state.require_user(id).await?;
    let result = state.storage.list_following(id, &page).await?;
    Ok(Json(result.into()))
}

/// `GET /v1/users/{id}/followers?page=&limit=`
pub async fn list_followers(
    State(state): State<AppState>,
    path: Result<Path<UserId>, PathRejection>,
    _auth: RequireAuth,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<UserRefPage>, AppError> {
    let Path(id) = path?;
    let Query(query) = query?;
    let page = query.resolve(&state.config)?;

    state.require_user(id).await?;
    let result = state.storage.list_followers(id, &page).await?;
    Ok(Json(result.into()))
}

/// `GET /v1/users/{id}/mutual`
///
/// Users that `id` follows and who follow `id` back. Empty when there are
/// none.
pub async fn list_mutual(
    State(state): State<AppState>,
    path: Result<Path<UserId>, PathRejection>,
    _auth: RequireAuth,
) -> Result<Json<UserRefList>, AppError> {
    let Path(id) = path?;
    state.require_user(id).await?;
    let items = state.storage.list_mutual(id).await?;
    Ok(Json(UserRefList { items }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    use std::sync::Arc;

    use crate::handlers::test_support::{
        assert_opaque_internal_error, body_json, signed, BrokenStorage, TestApp, TestUser,
    };

    async fn follow(app: &TestApp, from: &TestUser, to: &TestUser) -> StatusCode {
        let path = format!("/v1/users/{}/following", from.id);
        app.send(signed(from, "POST", &path, Some(json!({ "followee_id": to.id }))))
            .await
            .status()
    }

    fn ids(list: &Value) -> Vec<i64> {
        list["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["id"].as_i64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn follow_returns_the_edge() {
        let app = TestApp::new();
        let (ana, bruno) = (app.user("ana").await, app.user("bruno").await);
        let path = format!("/v1/users/{}/following", ana.id);
        let resp = app
            .send(signed(&ana, "POST", &path, Some(json!({ "followee_id": bruno.id }))))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let edge = body_json(resp).await;
        assert_eq!(edge["follower_id"], ana.id.get());
        assert_eq!(edge["followee_id"], bruno.id.get());
        assert!(edge["created_at"].is_string());
    }

    #[tokio::test]
    async fn follow_error_codes() {
        let app = TestApp::new();
        let (ana, bruno) = (app.user("ana").await, app.user("bruno").await);
        assert_eq!(follow(&app, &ana, &bruno).await, StatusCode::CREATED);

        let path = format!("/v1/users/{}/following", ana.id);
        let resp = app
            .send(signed(&ana, "POST", &path, Some(json!({ "followee_id": bruno.id }))))
            .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(resp).await["code"], "already_following");

        let resp = app
            .send(signed(&ana, "POST", &path, Some(json!({ "followee_id": ana.id }))))
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["code"], "self_follow");

        let resp = app
            .send(signed(&ana, "POST", &path, Some(json!({ "followee_id": 999 }))))
            .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cannot_follow_on_behalf_of_another_user() {
        let app = TestApp::new();
        let (ana, bruno) = (app.user("ana").await, app.user("bruno").await);
        let path = format!("/v1/users/{}/following", bruno.id);
        let resp = app
            .send(signed(&ana, "POST", &path, Some(json!({ "followee_id": ana.id }))))
            .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert!(!app.storage.is_following(bruno.id, ana.id).await.unwrap());
    }

    #[tokio::test]
    async fn unfollow_then_unfollow_again() {
        let app = TestApp::new();
        let (ana, bruno) = (app.user("ana").await, app.user("bruno").await);
        follow(&app, &ana, &bruno).await;

        let path = format!("/v1/users/{}/following/{}", ana.id, bruno.id);
        let resp = app.send(signed(&ana, "DELETE", &path, None)).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = app.send(signed(&ana, "DELETE", &path, None)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["code"], "not_found");
    }

    #[tokio::test]
    async fn listings_match_the_three_user_scenario() {
        let app = TestApp::new();
        let u1 = app.user("user_one").await;
        let u2 = app.user("user_two").await;
        let u3 = app.user("user_three").await;
        follow(&app, &u1, &u2).await;
        follow(&app, &u2, &u1).await;
        follow(&app, &u1, &u3).await;

        let get = |path: String| signed(&u3, "GET", &path, None);

        let following = body_json(app.send(get(format!("/v1/users/{}/following", u1.id))).await).await;
        assert_eq!(ids(&following), vec![u2.id.get(), u3.id.get()]);
        assert_eq!(following["total"], 2);

        let followers = body_json(app.send(get(format!("/v1/users/{}/followers", u1.id))).await).await;
        assert_eq!(ids(&followers), vec![u2.id.get()]);

        let mutual = body_json(app.send(get(format!("/v1/users/{}/mutual", u1.id))).await).await;
        assert_eq!(ids(&mutual), vec![u2.id.get()]);

        let mutual3 = body_json(app.send(get(format!("/v1/users/{}/mutual", u3.id))).await).await;
        assert!(ids(&mutual3).is_empty());
    }

    #[tokio::test]
    async fn listing_pages_and_limits() {
        let app = TestApp::new();
        let hub = app.user("hub").await;
        for i in 0..5 {
            let u = app.user(&format!("fan{i}")).await;
            follow(&app, &u, &hub).await;
        }

        let path = format!("/v1/users/{}/followers?page=2&limit=2", hub.id);
        let page = body_json(app.send(signed(&hub, "GET", &path, None)).await).await;
        assert_eq!(page["items"].as_array().unwrap().len(), 2);
        assert_eq!(page["page"], 2);
        assert_eq!(page["total"], 5);
        assert_eq!(page["total_pages"], 3);

        let path = format!("/v1/users/{}/followers?page=0", hub.id);
        let resp = app.send(signed(&hub, "GET", &path, None)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let path = format!("/v1/users/{}/followers?limit=-1", hub.id);
        let resp = app.send(signed(&hub, "GET", &path, None)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn limit_is_capped() {
        let app = TestApp::new();
        let ana = app.user("ana").await;
        let path = format!("/v1/users/{}/following?limit=5000", ana.id);
        let page = body_json(app.send(signed(&ana, "GET", &path, None)).await).await;
        assert_eq!(page["limit"], 100);
        assert_eq!(page["total"], 0);
    }

    #[tokio::test]
    async fn listing_unknown_user_is_404() {
        let app = TestApp::new();
        let ana = app.user("ana").await;
        for suffix in ["following", "followers", "mutual"] {
            let path = format!("/v1/users/999/{suffix}");
            let resp = app.send(signed(&ana, "GET", &path, None)).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{suffix}");
        }
    }

    #[tokio::test]
    async fn listings_require_a_signature() {
        let app = TestApp::new();
        let ana = app.user("ana").await;
        let req = axum::http::Request::builder()
            .uri(format!("/v1/users/{}/following", ana.id))
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(app.send(req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn storage_failures_surface_as_opaque_500s() {
        let app = TestApp::with_storage(Arc::new(BrokenStorage::default()));
        let (ana, bruno) = (app.user("ana").await, app.user("bruno").await);

        let path = format!("/v1/users/{}/following", ana.id);
        let resp = app
            .send(signed(&ana, "POST", &path, Some(json!({ "followee_id": bruno.id }))))
            .await;
        assert_opaque_internal_error(resp).await;

        let resp = app.send(signed(&ana, "GET", &path, None)).await;
        assert_opaque_internal_error(resp).await;

        let path = format!("/v1/users/{}/following/{}", ana.id, bruno.id);
        let resp = app.send(signed(&ana, "DELETE", &path, None)).await;
        assert_opaque_internal_error(resp).await;
    }
}
