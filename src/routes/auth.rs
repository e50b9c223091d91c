//! # 계정 API 핸들러
//!
//! | 메서드 | 경로 | 핸들러 |
//! |--------|------|--------|
//! | POST | /api/v1/auth/register | `register` |
//! | POST | /api/v1/auth/login | `login` |
//! | POST | /api/v1/auth/refresh | `refresh` |
//! | POST | /api/v1/auth/logout | `logout` |
//! | GET | /api/v1/auth/me | `me` |
//!
//! 여기서 발급한 access 토큰의 `sub`가 노트/태그의 소유자 ID가 됩니다.

use crate::{
    db::{self, users as db_users, TIMESTAMP_FORMAT},
    error::AppError,
    middleware::auth::{
        create_access_token, create_refresh_token, hash_token, verify_token, AuthUser,
        REFRESH_TOKEN_DAYS,
    },
    models::*,
    routes::AppState,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, http::StatusCode, Json};
use chrono::{Duration, Utc};
use serde_json::{json, Value};

/// access/refresh 토큰 쌍을 발급하고 refresh 토큰 해시를 저장합니다.
async fn issue_session(state: &AppState, user: User) -> Result<AuthResponse, AppError> {
    let access_token = create_access_token(&user.id, &state.jwt_secret)
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;
    let refresh_token = create_refresh_token(&user.id, &state.jwt_secret)
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

    let token_id = uuid::Uuid::now_v7().to_string();
    let expires_at = (Utc::now() + Duration::days(REFRESH_TOKEN_DAYS))
        .format(TIMESTAMP_FORMAT)
        .to_string();
    db_users::store_refresh_token(
        &state.pool,
        &token_id,
        &user.id,
        &hash_token(&refresh_token),
        &expires_at,
    )
    .await?;

    Ok(AuthResponse {
        user: user.into(),
        access_token,
        refresh_token,
    })
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let username = req.username.trim();
    if username.chars().count() < 3 {
        return Err(AppError::BadRequest("Username must be at least 3 characters".to_string()));
    }
    if req.password.len() < 8 {
        return Err(AppError::BadRequest("Password must be at least 8 characters".to_string()));
    }
    let email = req
        .email
        .as_deref()
        .map(str::trim)
        .filter(|email| !email.is_empty());
    if let Some(email) = email {
        if !email.contains('@') {
            return Err(AppError::BadRequest("Invalid email address".to_string()));
        }
        if db_users::find_by_email(&state.pool, email).await?.is_some() {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }
    }

    if db_users::find_by_username(&state.pool, username).await?.is_some() {
        return Err(AppError::Conflict("Username already exists".to_string()));
    }

    // Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?
        .to_string();

    let user_id = uuid::Uuid::now_v7().to_string();
    let user = db_users::create_user(&state.pool, &user_id, username, email, &password_hash)
        .await
        .map_err(|e| match e {
            AppError::Database(err) => AppError::conflict_on_unique(err, "Username already exists"),
            other => other,
        })?;

    tracing::info!("Registered user {}", user.id);
    Ok((StatusCode::CREATED, Json(issue_session(&state, user).await?)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = db_users::find_by_username(&state.pool, req.username.trim())
        .await?
        .ok_or(AppError::Unauthorized("Invalid username or password".to_string()))?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|e| AppError::Internal(format!("Password hash parse error: {}", e)))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::Unauthorized("Invalid username or password".to_string()))?;

    Ok(Json(issue_session(&state, user).await?))
}

/// refresh 토큰을 새 토큰 쌍으로 교환합니다. 사용한 토큰은 폐기됩니다.
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    verify_token(&req.refresh_token, &state.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid refresh token".to_string()))?;

    let token_hash = hash_token(&req.refresh_token);
    let stored = db_users::find_refresh_token(&state.pool, &token_hash)
        .await?
        .ok_or(AppError::Unauthorized("Refresh token not found or revoked".to_string()))?;

    let expires = chrono::NaiveDateTime::parse_from_str(&stored.expires_at, TIMESTAMP_FORMAT)
        .map_err(|e| AppError::Internal(format!("Date parse error: {}", e)))?;
    if expires.and_utc() < Utc::now() {
        db_users::delete_refresh_token(&state.pool, &token_hash).await?;
        return Err(AppError::Unauthorized("Refresh token expired".to_string()));
    }

    let user = db_users::find_by_id(&state.pool, &stored.user_id)
        .await?
        .ok_or(AppError::Unauthorized("User not found".to_string()))?;

    db_users::delete_refresh_token(&state.pool, &token_hash).await?;

    Ok(Json(issue_session(&state, user).await?))
}

/// 사용자의 refresh 토큰을 모두 폐기합니다.
pub async fn logout(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Value>, AppError> {
    db_users::delete_user_refresh_tokens(&state.pool, &auth_user.user_id).await?;

    Ok(Json(json!({ "message": "Logged out successfully" })))
}

/// 내 계정 정보와 노트/태그 개수
pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    let user = db_users::find_by_id(&state.pool, &auth_user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let stats = OwnerStats {
        notes: db::count_notes(&state.pool, &user.id).await?,
        tags: db::count_tags(&state.pool, &user.id).await?,
    };

    Ok(Json(UserResponse::from(user).with_stats(stats)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_state;

    fn register_req(username: &str, email: Option<&str>, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: email.map(str::to_string),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn register_login_refresh_logout() {
        let state = test_state().await;

        let (status, Json(registered)) = register(
            State(state.clone()),
            Json(register_req("alice", None, "password123")),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert!(registered.user.email.is_none());

        let Json(logged_in) = login(
            State(state.clone()),
            Json(LoginRequest {
                username: "alice".to_string(),
                password: "password123".to_string(),
            }),
        )
        .await
        .unwrap();

        let Json(rotated) = refresh(
            State(state.clone()),
            Json(RefreshRequest {
                refresh_token: logged_in.refresh_token.clone(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(rotated.user.id, registered.user.id);

        // 한 번 쓴 refresh 토큰은 다시 쓸 수 없습니다.
        let reused = refresh(
            State(state.clone()),
            Json(RefreshRequest {
                refresh_token: logged_in.refresh_token,
            }),
        )
        .await;
        assert!(matches!(reused, Err(AppError::Unauthorized(_))));

        let auth = AuthUser {
            user_id: registered.user.id.clone(),
        };
        let Json(message) = logout(State(state.clone()), auth).await.unwrap();
        assert_eq!(message["message"], "Logged out successfully");
        let after_logout = refresh(
            State(state),
            Json(RefreshRequest {
                refresh_token: rotated.refresh_token,
            }),
        )
        .await;
        assert!(matches!(after_logout, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn register_validates_input() {
        let state = test_state().await;

        let short_name = register(State(state.clone()), Json(register_req("al", None, "password123"))).await;
        assert!(matches!(short_name, Err(AppError::BadRequest(_))));

        let bad_email =
            register(State(state.clone()), Json(register_req("alice", Some("nope"), "password123"))).await;
        assert!(matches!(bad_email, Err(AppError::BadRequest(_))));

        let (_, Json(registered)) =
            register(State(state.clone()), Json(register_req("alice", Some("a@x.io"), "password123")))
                .await
                .unwrap();
        assert_eq!(registered.user.email.as_deref(), Some("a@x.io"));
        let dup = register(State(state), Json(register_req("alice", None, "password123"))).await;
        assert!(matches!(dup, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn me_reports_owner_counts() {
        let state = test_state().await;
        let (_, Json(registered)) =
            register(State(state.clone()), Json(register_req("alice", None, "password123")))
                .await
                .unwrap();
        assert!(registered.user.stats.is_none());
        let owner_id = registered.user.id.clone();

        let req = CreateNoteRequest {
            title: Some("first".to_string()),
            content: None,
            status: None,
            tags: vec!["Work".to_string()],
        };
        let note_id = uuid::Uuid::now_v7().to_string();
        let _ = db::create_note(&state.pool, &note_id, &owner_id, &req, &req.tags)
            .await
            .unwrap();
        let _ = state
            .tag_sync
            .sync_on_create(&note_id, &owner_id, &req.tags)
            .await
            .unwrap();

        let Json(me_body) = me(State(state), AuthUser { user_id: owner_id }).await.unwrap();
        assert_eq!(me_body.stats, Some(OwnerStats { notes: 1, tags: 1 }));
        assert_eq!(serde_json::to_value(&me_body).unwrap()["stats"]["notes"], json!(1));
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let state = test_state().await;
        let _ = register(State(state.clone()), Json(register_req("alice", None, "password123")))
            .await
            .unwrap();

        let result = login(
            State(state),
            Json(LoginRequest {
                username: "alice".to_string(),
                password: "wrong-password".to_string(),
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }
}
