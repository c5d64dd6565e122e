use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::jwt::{AuthUser, JwtKeys},
    error::ApiError,
    state::AppState,
    users::{
        dto::{LoginRequest, RegisterRequest, TokenResponse, UpdateUserRequest, UserResponse},
        service,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register))
        .route("/users/login", post(login))
        .route("/users/me", get(me).patch(update_me))
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = service::create_user(state.users.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = service::authenticate(state.users.as_ref(), payload).await?;
    let token = JwtKeys::from_ref(&state).sign(user.id)?;
    Ok(Json(TokenResponse {
        token,
        user: user.into(),
    }))
}

#[instrument(skip(state))]
async fn me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .users
        .find_by_id(user_id)
        .await
        .map_err(ApiError::from)?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = service::update_user(state.users.as_ref(), user_id, payload).await?;
    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    use crate::{app::build_app, state::AppState};

    fn test_app() -> Router {
        build_app(AppState::fake())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_works() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn register_login_and_fetch_me() {
        let app = test_app();

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/v1/users",
                json!({"email": "a@b.com", "password": "s3cret", "name": "Test"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["email"], "a@b.com");
        assert!(created.get("password").is_none());
        assert!(created.get("password_hash").is_none());

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/v1/users/login",
                json!({"email": "a@b.com", "password": "s3cret"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let login = body_json(response).await;
        let token = login["token"].as_str().expect("token present").to_string();
        assert_eq!(login["user"]["email"], "a@b.com");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/users/me")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let me = body_json(response).await;
        assert_eq!(me["email"], "a@b.com");
        assert_eq!(me["name"], "Test");
    }

    #[tokio::test]
    async fn register_short_password_reports_field() {
        let response = test_app()
            .oneshot(post_json(
                "/api/v1/users",
                json!({"email": "a@b.com", "password": "1234"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["errors"][0]["field"], "password");
    }

    #[tokio::test]
    async fn login_wrong_password_is_opaque_401() {
        let app = test_app();
        app.clone()
            .oneshot(post_json(
                "/api/v1/users",
                json!({"email": "a@b.com", "password": "correct"}),
            ))
            .await
            .unwrap();

        let response = app
            .oneshot(post_json(
                "/api/v1/users/login",
                json!({"email": "a@b.com", "password": "wrong"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(
            body["error"],
            "Unable to authenticate with provided credentials"
        );
    }

    #[tokio::test]
    async fn register_duplicate_email_conflicts() {
        let app = test_app();
        let payload = json!({"email": "a@b.com", "password": "s3cret"});
        app.clone()
            .oneshot(post_json("/api/v1/users", payload.clone()))
            .await
            .unwrap();

        let response = app
            .oneshot(post_json("/api/v1/users", payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn me_without_token_is_unauthorized() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/users/me")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn patch_me_updates_name() {
        let app = test_app();
        app.clone()
            .oneshot(post_json(
                "/api/v1/users",
                json!({"email": "a@b.com", "password": "s3cret"}),
            ))
            .await
            .unwrap();
        let login = body_json(
            app.clone()
                .oneshot(post_json(
                    "/api/v1/users/login",
                    json!({"email": "a@b.com", "password": "s3cret"}),
                ))
                .await
                .unwrap(),
        )
        .await;
        let token = login["token"].as_str().unwrap().to_string();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/users/me")
                    .method("PATCH")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        serde_json::to_vec(&json!({"name": "Renamed"})).unwrap(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["name"], "Renamed");
    }
}
