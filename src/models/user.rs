//! # 계정 모델
//!
//! 노트와 태그의 `owner_id`는 모두 여기의 `User.id`를 가리킵니다.
//! 응답에는 계정 정보와 함께 그 소유자가 가진 노트/태그 개수를 실을 수 있습니다.

use serde::{Deserialize, Serialize};

/// `users` 테이블 행
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: String,
    pub updated_at: String,
}

/// 소유자 단위 집계
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OwnerStats {
    pub notes: i64,
    pub tags: i64,
}

/// 소유자 정보 응답. `stats`는 `GET /auth/me`에서만 채워집니다.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<OwnerStats>,
}

impl UserResponse {
    pub fn with_stats(mut self, stats: OwnerStats) -> Self {
        self.stats = Some(stats);
        self
    }
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
            stats: None,
        }
    }
}

/// 이메일은 선택입니다. 비어 있으면 없는 것으로 봅니다.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// 가입/로그인/갱신 응답. `user.id`가 이후 요청의 소유자 ID입니다.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
}

/// 갱신 시 확인하는 토큰 행. 토큰 원문은 저장하지 않고 해시로만 찾습니다.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredRefreshToken {
    pub user_id: String,
    pub expires_at: String,
}
