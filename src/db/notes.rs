//! # 노트 데이터베이스 쿼리 모듈
//!
//! `notes` 테이블에 대한 CRUD 쿼리 함수들입니다.
//! 모든 조회/수정은 소유자(owner_id) 조건을 함께 걸어, 다른 사용자의 노트는 "없는 것"으로 취급합니다.
//!
//! `tags` 컬럼은 태그 이름의 JSON 배열 캐시입니다. 태그의 원본은 `note_tags` 피벗이며,
//! 피벗 동기화는 `services::tag_sync`가 담당합니다. 이 모듈은 캐시 문자열만 씁니다.

use crate::error::AppError;
use crate::models::*;
use sqlx::SqlitePool;

const NOTE_COLUMNS: &str = "id, owner_id, title, content, status, tags, created_at, updated_at";

fn tags_json(tags: &[String]) -> Result<String, AppError> {
    serde_json::to_string(tags)
        .map_err(|e| AppError::Internal(format!("Failed to encode tag cache: {}", e)))
}

/// 소유자의 노트 목록을 최신순으로 조회합니다.
///
/// # 매개변수
/// - `status`: Some이면 해당 상태의 노트만 조회
pub async fn list_notes(
    pool: &SqlitePool,
    owner_id: &str,
    status: Option<NoteStatus>,
) -> Result<Vec<Note>, AppError> {
    let notes = match status {
        Some(status) => {
            sqlx::query_as::<_, Note>(&format!(
                "SELECT {NOTE_COLUMNS} FROM notes WHERE owner_id = ? AND status = ? ORDER BY created_at DESC, id DESC"
            ))
            .bind(owner_id)
            .bind(status.as_str())
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Note>(&format!(
                "SELECT {NOTE_COLUMNS} FROM notes WHERE owner_id = ? ORDER BY created_at DESC, id DESC"
            ))
            .bind(owner_id)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(notes)
}

/// ID로 노트 하나를 조회합니다.
///
/// # 반환값
/// - `Ok(Some(Note))`: 소유자의 노트를 찾은 경우
/// - `Ok(None)`: 없거나 다른 소유자의 노트인 경우
pub async fn get_note(pool: &SqlitePool, owner_id: &str, id: &str) -> Result<Option<Note>, AppError> {
    let note = sqlx::query_as::<_, Note>(&format!(
        "SELECT {NOTE_COLUMNS} FROM notes WHERE id = ? AND owner_id = ?"
    ))
    .bind(id)
    .bind(owner_id)
    .fetch_optional(pool)
    .await?;

    Ok(note)
}

/// 새 노트를 생성합니다.
///
/// # 매개변수
/// - `id`: 미리 생성한 노트 ID (UUIDv7)
/// - `tags`: 정규화된 태그 이름 목록. 캐시 컬럼에 그대로 기록됩니다.
pub async fn create_note(
    pool: &SqlitePool,
    id: &str,
    owner_id: &str,
    req: &CreateNoteRequest,
    tags: &[String],
) -> Result<Note, AppError> {
    let status = req.status.unwrap_or_default();

    sqlx::query(
        r#"
        INSERT INTO notes (id, owner_id, title, content, status, tags)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(owner_id)
    .bind(req.title.as_deref().unwrap_or(""))
    .bind(req.content.as_deref().unwrap_or(""))
    .bind(status.as_str())
    .bind(tags_json(tags)?)
    .execute(pool)
    .await?;

    get_note(pool, owner_id, id)
        .await?
        .ok_or(AppError::Internal("Failed to retrieve created note".to_string()))
}

/// 노트를 수정합니다 (부분 업데이트 - PATCH 방식).
///
/// 요청에 포함된 필드만 UPDATE 문에 넣도록 쿼리를 동적으로 구성합니다.
/// `tags`가 Some이면 캐시 컬럼도 교체합니다.
///
/// # 반환값
/// - `Ok(Some(Note))`: 수정 성공
/// - `Ok(None)`: 해당 소유자의 노트가 없음
pub async fn update_note(
    pool: &SqlitePool,
    owner_id: &str,
    id: &str,
    req: &UpdateNoteRequest,
    tags: Option<&[String]>,
) -> Result<Option<Note>, AppError> {
    if get_note(pool, owner_id, id).await?.is_none() {
        return Ok(None);
    }

    let mut query =
        String::from("UPDATE notes SET updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')");
    let mut bindings: Vec<String> = Vec::new();

    if let Some(title) = &req.title {
        query.push_str(", title = ?");
        bindings.push(title.clone());
    }

    if let Some(content) = &req.content {
        query.push_str(", content = ?");
        bindings.push(content.clone());
    }

    if let Some(status) = req.status {
        query.push_str(", status = ?");
        bindings.push(status.as_str().to_string());
    }

    if let Some(tags) = tags {
        query.push_str(", tags = ?");
        bindings.push(tags_json(tags)?);
    }

    query.push_str(" WHERE id = ? AND owner_id = ?");

    let mut query_builder = sqlx::query(&query);
    for binding in bindings {
        query_builder = query_builder.bind(binding);
    }
    query_builder.bind(id).bind(owner_id).execute(pool).await?;

    get_note(pool, owner_id, id).await
}

/// 노트를 삭제합니다. 피벗 정리는 호출자가 별도로 합니다.
///
/// # 반환값
/// - `Ok(true)`: 삭제 성공
/// - `Ok(false)`: 해당 소유자의 노트가 없음
pub async fn delete_note(pool: &SqlitePool, owner_id: &str, id: &str) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM notes WHERE id = ? AND owner_id = ?")
        .bind(id)
        .bind(owner_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// 소유자의 노트 개수
pub async fn count_notes(pool: &SqlitePool, owner_id: &str) -> Result<i64, AppError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM notes WHERE owner_id = ?")
        .bind(owner_id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}
