//! # 태그/피벗 저장소 추상화
//!
//! 태그 동기화기(`services::tag_sync`)는 구체적인 DB가 아니라 이 트레이트들에만 의존합니다.
//! 운영 환경에서는 `SqliteStore`를, 테스트에서는 메모리 기반 대역을 넘깁니다.
//!
//! - `TagStore`: 정규 태그 일괄 조회 / 단건 생성
//! - `PivotStore`: 피벗 조회 / 생성 / 태그 ID 보충 / 삭제
//! - `Clock`: 레코드 생성 시각 (ISO-8601 문자열)

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::db;
use crate::error::AppError;
use crate::models::*;

/// 정규 태그 저장소
#[async_trait]
pub trait TagStore: Send + Sync {
    /// 소유자의 태그 중 `name_lower`가 `keys`에 속하는 것을 한 번의 조회로 가져옵니다.
    async fn find_tags_by_keys(&self, owner_id: &str, keys: &[String]) -> Result<Vec<Tag>, AppError>;

    /// 태그 하나를 생성합니다. 같은 (owner_id, name_lower)가 이미 있으면 에러입니다.
    async fn insert_tag(&self, new_tag: &NewTag) -> Result<Tag, AppError>;
}

/// 노트-태그 피벗 저장소
#[async_trait]
pub trait PivotStore: Send + Sync {
    async fn list_note_tags(&self, note_id: &str, limit: i64) -> Result<Vec<NoteTag>, AppError>;

    async fn list_note_tags_for_notes(
        &self,
        note_ids: &[String],
        limit: i64,
    ) -> Result<Vec<NoteTag>, AppError>;

    async fn insert_note_tag(&self, new_row: &NewNoteTag) -> Result<NoteTag, AppError>;

    /// 레거시 행의 `tag_id`만 채웁니다.
    async fn set_note_tag_tag_id(&self, id: &str, tag_id: &str) -> Result<(), AppError>;

    async fn delete_note_tag(&self, id: &str) -> Result<(), AppError>;
}

/// 저장되는 모든 시각 문자열의 형식 (밀리초, UTC `Z`)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// 현재 시각 제공자
pub trait Clock: Send + Sync {
    /// ISO-8601 UTC 문자열 (예: "2026-01-01T00:00:00.000Z")
    fn now(&self) -> String;
}

/// 시스템 시계
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> String {
        Utc::now().format(TIMESTAMP_FORMAT).to_string()
    }
}

/// SQLite 기반 저장소. 실제 쿼리는 `db::tags`, `db::note_tags`의 함수에 위임합니다.
///
/// `SqlitePool`은 내부적으로 Arc이므로 clone해도 같은 풀을 가리킵니다.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagStore for SqliteStore {
    async fn find_tags_by_keys(&self, owner_id: &str, keys: &[String]) -> Result<Vec<Tag>, AppError> {
        db::tags::find_tags_by_name_lower(&self.pool, owner_id, keys).await
    }

    async fn insert_tag(&self, new_tag: &NewTag) -> Result<Tag, AppError> {
        db::tags::insert_tag(&self.pool, new_tag).await
    }
}

#[async_trait]
impl PivotStore for SqliteStore {
    async fn list_note_tags(&self, note_id: &str, limit: i64) -> Result<Vec<NoteTag>, AppError> {
        db::note_tags::list_note_tags(&self.pool, note_id, limit).await
    }

    async fn list_note_tags_for_notes(
        &self,
        note_ids: &[String],
        limit: i64,
    ) -> Result<Vec<NoteTag>, AppError> {
        db::note_tags::list_note_tags_for_notes(&self.pool, note_ids, limit).await
    }

    async fn insert_note_tag(&self, new_row: &NewNoteTag) -> Result<NoteTag, AppError> {
        db::note_tags::insert_note_tag(&self.pool, new_row).await
    }

    async fn set_note_tag_tag_id(&self, id: &str, tag_id: &str) -> Result<(), AppError> {
        db::note_tags::set_note_tag_tag_id(&self.pool, id, tag_id).await
    }

    async fn delete_note_tag(&self, id: &str) -> Result<(), AppError> {
        db::note_tags::delete_note_tag(&self.pool, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_iso8601_utc() {
        let now = SystemClock.now();
        assert!(now.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&now).is_ok());
    }
}
