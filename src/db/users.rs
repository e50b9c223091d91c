//! # 사용자 계정 쿼리 모듈
//!
//! 회원가입/로그인과 refresh 토큰 저장소(`refresh_tokens`) 쿼리입니다.
//! refresh 토큰은 원문이 아니라 SHA-256 해시로만 저장합니다.

use crate::error::AppError;
use crate::models::{StoredRefreshToken, User};
use sqlx::SqlitePool;

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at, updated_at";

pub async fn create_user(
    pool: &SqlitePool,
    id: &str,
    username: &str,
    email: Option<&str>,
    password_hash: &str,
) -> Result<User, AppError> {
    sqlx::query("INSERT INTO users (id, username, email, password_hash) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .execute(pool)
        .await?;

    find_by_id(pool, id)
        .await?
        .ok_or(AppError::Internal("Failed to retrieve created user".to_string()))
}

/// 한 컬럼 값으로 사용자 하나를 찾습니다. `column`은 코드 안의 상수만 넘깁니다.
async fn find_by(pool: &SqlitePool, column: &str, value: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE {column} = ?"
    ))
    .bind(value)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn find_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>, AppError> {
    find_by(pool, "username", username).await
}

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<User>, AppError> {
    find_by(pool, "id", id).await
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, AppError> {
    find_by(pool, "email", email).await
}

pub async fn store_refresh_token(
    pool: &SqlitePool,
    id: &str,
    user_id: &str,
    token_hash: &str,
    expires_at: &str,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at) VALUES (?, ?, ?, ?)",
    )
    .bind(id)
    .bind(user_id)
    .bind(token_hash)
    .bind(expires_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn find_refresh_token(
    pool: &SqlitePool,
    token_hash: &str,
) -> Result<Option<StoredRefreshToken>, AppError> {
    let row = sqlx::query_as::<_, StoredRefreshToken>(
        "SELECT user_id, expires_at FROM refresh_tokens WHERE token_hash = ?",
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn delete_refresh_token(pool: &SqlitePool, token_hash: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = ?")
        .bind(token_hash)
        .execute(pool)
        .await?;

    Ok(())
}

/// 사용자의 모든 refresh 토큰을 폐기합니다 (로그아웃).
pub async fn delete_user_refresh_tokens(pool: &SqlitePool, user_id: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn user_lookup_and_token_lifecycle() {
        let pool = test_pool().await;
        let user = create_user(&pool, "u1", "alice", Some("a@example.com"), "hash")
            .await
            .unwrap();

        assert_eq!(find_by_username(&pool, "alice").await.unwrap().unwrap().id, user.id);
        assert!(find_by_email(&pool, "a@example.com").await.unwrap().is_some());
        assert!(find_by_id(&pool, "nobody").await.unwrap().is_none());

        store_refresh_token(&pool, "t1", "u1", "h1", "2099-01-01T00:00:00.000Z")
            .await
            .unwrap();
        let stored = find_refresh_token(&pool, "h1").await.unwrap().unwrap();
        assert_eq!(stored.user_id, "u1");

        delete_user_refresh_tokens(&pool, "u1").await.unwrap();
        assert!(find_refresh_token(&pool, "h1").await.unwrap().is_none());
    }
}
