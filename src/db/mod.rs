//! # 데이터베이스 접근 계층 (Data Access Layer)
//!
//! 데이터베이스와 직접 상호작용하는 함수들을 모아둔 모듈입니다.
//! 라우트 핸들러(routes/)와 태그 동기화기(services/)가 이 모듈을 통해 DB 작업을 수행합니다.
//!
//! 각 하위 모듈:
//! - `notes`: 노트 CRUD 쿼리
//! - `note_tags`: 노트-태그 피벗 쿼리
//! - `store`: 태그 동기화기가 사용하는 저장소 트레이트와 SQLite 구현
//! - `tags`: 정규 태그 CRUD 쿼리
//! - `users`: 사용자 인증 관련 쿼리

pub mod note_tags;
pub mod notes;
pub mod store;
pub mod tags;
pub mod users;

// `crate::db::list_notes`처럼 바로 접근할 수 있게 재공개합니다.
pub use note_tags::*;
pub use notes::*;
pub use store::*;
pub use tags::*;

/// 마이그레이션이 적용된 메모리 SQLite 풀을 만듭니다.
///
/// `sqlite::memory:`는 연결마다 별도의 DB가 생기므로 연결 수를 1로 제한합니다.
#[cfg(test)]
pub async fn test_pool() -> sqlx::SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}
