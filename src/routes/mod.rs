//! # 라우트 핸들러 모듈
//!
//! HTTP 요청을 처리하는 핸들러 함수들을 모아둔 모듈입니다.
//! Axum에서 핸들러는 HTTP 요청을 받아 응답을 반환하는 async 함수입니다.
//!
//! 각 하위 모듈:
//! - `auth`: 계정 (회원가입, 로그인, 토큰 갱신, 로그아웃, 내 정보)
//! - `health`: 서버 상태 확인 (헬스체크)
//! - `notes`: 노트 CRUD 핸들러 (태그 동기화 포함)
//! - `tags`: 정규 태그 CRUD 핸들러

pub mod auth;
pub mod health;
pub mod notes;
pub mod tags;

use sqlx::SqlitePool;

use crate::db::SqliteStore;
use crate::services::tag_sync::TagSynchronizer;

pub use health::*;
pub use notes::*;
pub use tags::*;

/// 모든 핸들러가 공유하는 애플리케이션 상태
///
/// `SqlitePool`은 내부적으로 Arc이므로 clone 비용이 작습니다.
/// 동기화기도 같은 풀을 가리키는 저장소 핸들을 들고 있습니다.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt_secret: String,
    pub tag_sync: TagSynchronizer<SqliteStore>,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt_secret: String) -> Self {
        let tag_sync = TagSynchronizer::new(SqliteStore::new(pool.clone()), Default::default());
        Self {
            pool,
            jwt_secret,
            tag_sync,
        }
    }
}

/// 메모리 DB를 쓰는 핸들러 테스트용 상태
#[cfg(test)]
pub async fn test_state() -> AppState {
    AppState::new(crate::db::test_pool().await, "test-secret".to_string())
}
