use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{LoginRequest, LoginResponse, PublicUser, RegisterRequest},
    email::{is_valid_email, normalize_email},
    errors::{into_http, UserError},
    model::UserFields,
};
use crate::{
    auth::{AuthUser, JwtKeys},
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 8;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), (StatusCode, String)> {
    let email = normalize_email(&payload.email);

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
    }

    let user = state
        .users
        .create_user(&email, &payload.password, UserFields::default())
        .await
        .map_err(into_http)?;

    info!(user_id = ?user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, String)> {
    let user = state
        .users
        .authenticate(&payload.email, &payload.password)
        .await
        .map_err(into_http)?;

    let keys = JwtKeys::from_ref(&state);
    let tokens = user.get_tokens(&keys).map_err(into_http)?;

    info!(user_id = ?user.id, email = %user.email, "user logged in");
    Ok(Json(LoginResponse {
        refresh: tokens.refresh,
        access: tokens.access,
        user: user.into(),
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let user = state.users.get(user_id).await.map_err(|e| match e {
        UserError::NotFound(_) => {
            warn!(user_id = %user_id, "token for unknown user");
            (StatusCode::UNAUTHORIZED, "User not found".to_string())
        }
        other => into_http(other),
    })?;
    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::TokenKind;
    use axum::http::{header::AUTHORIZATION, Request};
    use axum::extract::FromRequestParts;
    use crate::users::{model::User, repo::UserRepository};
    use async_trait::async_trait;
    use std::sync::Arc;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn register_body(email: &str, password: &str) -> Json<RegisterRequest> {
        Json(RegisterRequest {
            email: email.into(),
            password: password.into(),
        })
    }

    fn login_body(email: &str, password: &str) -> Json<LoginRequest> {
        Json(LoginRequest {
            email: email.into(),
            password: password.into(),
        })
    }

    async fn bearer(state: &AppState, token: &str) -> AuthUser {
        let (mut parts, _) = Request::builder()
            .uri("/me")
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(())
            .unwrap()
            .into_parts();
        AuthUser::from_request_parts(&mut parts, state)
            .await
            .unwrap_or_else(|(s, m)| panic!("rejected: {s} {m}"))
    }

    #[tokio::test]
    async fn register_creates_inactive_user() {
        let state = AppState::in_memory();
        let (status, Json(user)) =
            register(State(state), register_body(" New@Example.com", "long-enough"))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(user.email, "new@example.com");
        assert!(user.id.is_some());
        assert!(!user.is_active);
        assert!(!user.is_superuser);
    }

    #[tokio::test]
    async fn register_rejects_bad_input() {
        let state = AppState::in_memory();
        let err = register(State(state.clone()), register_body("nope", "long-enough"))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);

        let err = register(State(state), register_body("a@x.com", "short"))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn register_twice_conflicts() {
        let state = AppState::in_memory();
        register(State(state.clone()), register_body("A@Example.com", "pw123456"))
            .await
            .unwrap();
        let err = register(State(state), register_body("a@example.com", "pw456789"))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn inactive_user_cannot_log_in() {
        let state = AppState::in_memory();
        register(State(state.clone()), register_body("u@x.com", "pw123456"))
            .await
            .unwrap();
        let err = login(State(state), login_body("u@x.com", "pw123456"))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let state = AppState::in_memory();
        state
            .users
            .create_superuser("admin@x.com", "pw123456", UserFields::default())
            .await
            .unwrap();
        let err = login(State(state), login_body("admin@x.com", "nope"))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login_issues_tokens_accepted_by_me() {
        let state = AppState::in_memory();
        let admin = state
            .users
            .create_superuser("admin@x.com", "pw123456", UserFields::default())
            .await
            .unwrap();

        let Json(resp) = login(State(state.clone()), login_body("Admin@X.com", "pw123456"))
            .await
            .unwrap();
        assert_eq!(resp.user.id, admin.id);
        assert!(resp.user.is_superuser);

        let keys = JwtKeys::from_ref(&state);
        assert_eq!(keys.verify(&resp.refresh).unwrap().kind, TokenKind::Refresh);

        let auth = bearer(&state, &resp.access).await;
        let Json(me) = get_me(State(state), auth).await.unwrap();
        assert_eq!(me.email, "admin@x.com");
        assert!(me.is_staff && me.is_active && me.is_verified);
    }

    #[tokio::test]
    async fn me_with_token_for_unknown_user_is_unauthorized() {
        let state = AppState::in_memory();
        let keys = JwtKeys::from_ref(&state);
        let token = keys.sign_access(Uuid::new_v4()).unwrap();
        let auth = bearer(&state, &token).await;
        let err = get_me(State(state), auth).await.unwrap_err();
        assert_eq!(err.0, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn register_rejects_overlong_email() {
        let state = AppState::in_memory();
        let email = format!("{}@example.com", "a".repeat(300));
        let err = register(State(state), register_body(&email, "long-enough"))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    struct UnreachableRepository;

    #[async_trait]
    impl UserRepository for UnreachableRepository {
        async fn save(&self, _user: &User) -> Result<User, UserError> {
            Err(UserError::Database(sqlx::Error::PoolTimedOut))
        }
        async fn find_by_email(&self, _email: &str) -> Result<Option<User>, UserError> {
            Err(UserError::Database(sqlx::Error::PoolTimedOut))
        }
        async fn find_by_id(&self, _id: Uuid) -> Result<Option<User>, UserError> {
            Err(UserError::Database(sqlx::Error::PoolTimedOut))
        }
        async fn record_login(&self, _id: Uuid, _at: OffsetDateTime) -> Result<(), UserError> {
            Err(UserError::Database(sqlx::Error::PoolTimedOut))
        }
    }

    #[tokio::test]
    async fn me_during_database_outage_is_a_server_error() {
        let healthy = AppState::in_memory();
        let state = AppState::from_parts(
            Arc::new(UnreachableRepository),
            healthy.config.clone(),
        );
        let token = JwtKeys::from_ref(&state).sign_access(Uuid::new_v4()).unwrap();
        let auth = bearer(&state, &token).await;
        let err = get_me(State(state), auth).await.unwrap_err();
        assert_eq!(err.0, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn public_user_serialization() {
        let user = User::new("test@example.com".into(), UserFields::default());
        let json = serde_json::to_value(PublicUser::from(user)).unwrap();
        assert_eq!(json["email"], "test@example.com");
        assert!(json.get("password_hash").is_none());
        assert!(json.get("id").is_some());
    }
}
