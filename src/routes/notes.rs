//! # 노트 API 라우트 핸들러
//!
//! ## 엔드포인트 목록
//! | 메서드 | 경로 | 핸들러 | 설명 |
//! |--------|------|--------|------|
//! | GET | /api/v1/notes | `list_notes` | 내 노트 목록 (`?status=` 필터) |
//! | POST | /api/v1/notes | `create_note` | 노트 생성 + 태그 동기화 |
//! | GET | /api/v1/notes/{id} | `get_note` | 노트 하나 조회 |
//! | PATCH | /api/v1/notes/{id} | `update_note` | 부분 수정 (+ `tags`가 있으면 태그 동기화) |
//! | DELETE | /api/v1/notes/{id} | `delete_note` | 노트 및 피벗 삭제 |
//! | GET | /api/v1/notes/{id}/tags | `get_note_tags` | 피벗 기준 태그 목록 |
//!
//! ## 태그 처리 흐름
//! 쓰기: 노트 행(태그 캐시 포함)을 먼저 저장하고, 그다음 동기화기가 정규 태그와 피벗을 맞춥니다.
//! 동기화가 일부 실패해도 노트 저장은 성공이며, 실패한 태그는 응답의 `unsynced_tags`에 담깁니다.
//! 기존 피벗을 읽지 못해 비교 자체를 못 했다면 응답의 `tags_unreconciled`가 true입니다.
//!
//! 읽기: 피벗이 있으면 피벗에서 읽은 이름으로 응답의 캐시를 덮어씁니다.
//! 피벗 조회가 실패하거나 피벗이 없으면 저장된 캐시를 그대로 돌려줍니다.

use crate::{
    db,
    error::AppError,
    middleware::auth::AuthUser,
    models::*,
    routes::AppState,
    services::tag_sync::{normalize_tag_names, SyncReport},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use sqlx::types::Json as SqlJson;

/// 동기화 결과를 응답 본문에 싣고, 완전히 반영되지 않았으면 경고를 남깁니다.
fn note_response(note: Note, report: &SyncReport) -> NoteResponse {
    if !report.is_complete() {
        tracing::warn!("Note {} saved with unsynced tags: {:?}", note.id, report);
    }
    NoteResponse {
        note,
        unsynced_tags: report.failed_tags().to_vec(),
        tags_unreconciled: !report.is_reconciled(),
    }
}

/// 피벗에서 읽은 태그로 노트의 캐시를 새로 고칩니다. 실패는 로그만 남깁니다.
async fn refresh_tag_cache(state: &AppState, note: &mut Note) {
    match state.tag_sync.read_note_tags(&note.id).await {
        Ok(tags) if !tags.is_empty() => note.tags = SqlJson(tags),
        Ok(_) => {}
        Err(e) => tracing::warn!("Failed to read tags for note {}: {}", note.id, e),
    }
}

/// `GET /api/v1/notes` → `{ "notes": [...] }`
///
/// 목록의 태그 캐시는 노트 100개 단위로 묶어서 한꺼번에 새로 고칩니다.
pub async fn list_notes(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListNotesQuery>,
) -> Result<Json<Value>, AppError> {
    let mut notes = db::list_notes(&state.pool, &auth.user_id, query.status).await?;

    let ids: Vec<String> = notes.iter().map(|note| note.id.clone()).collect();
    match state.tag_sync.read_tags_for_notes(&ids).await {
        Ok(mut tags_by_note) => {
            for note in &mut notes {
                if let Some(tags) = tags_by_note.remove(&note.id) {
                    note.tags = SqlJson(tags);
                }
            }
        }
        Err(e) => tracing::warn!("Failed to read tags for note list: {}", e),
    }

    Ok(Json(json!({ "notes": notes })))
}

/// 새 노트를 생성합니다.
///
/// `POST /api/v1/notes` + `{ "title": "...", "content": "...", "tags": [...] }` → `201 Created`
pub async fn create_note(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<NoteResponse>), AppError> {
    let tags = normalize_tag_names(&req.tags);
    let id = uuid::Uuid::now_v7().to_string();

    let note = db::create_note(&state.pool, &id, &auth.user_id, &req, &tags).await?;
    let report = state
        .tag_sync
        .sync_on_create(&note.id, &auth.user_id, &tags)
        .await?;

    tracing::debug!("Created note {} with {} tag(s)", note.id, tags.len());
    Ok((StatusCode::CREATED, Json(note_response(note, &report))))
}

/// `GET /api/v1/notes/{id}`
///
/// 다른 소유자의 노트는 404입니다.
pub async fn get_note(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Note>, AppError> {
    let mut note = db::get_note(&state.pool, &auth.user_id, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    refresh_tag_cache(&state, &mut note).await;
    Ok(Json(note))
}

/// 노트를 수정합니다 (PATCH).
///
/// 요청 본문에 `tags`가 없으면 태그는 건드리지 않습니다.
/// `"tags": []`는 모든 태그를 떼라는 뜻입니다.
pub async fn update_note(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateNoteRequest>,
) -> Result<Json<NoteResponse>, AppError> {
    let tags = req.tags.as_deref().map(normalize_tag_names);

    let note = db::update_note(&state.pool, &auth.user_id, &id, &req, tags.as_deref())
        .await?
        .ok_or(AppError::NotFound)?;
    let report = state
        .tag_sync
        .sync_on_update(&note.id, &auth.user_id, tags.as_deref())
        .await?;

    Ok(Json(note_response(note, &report)))
}

/// `DELETE /api/v1/notes/{id}` → `204 No Content`
///
/// 노트를 지운 뒤 피벗을 지웁니다. 피벗 삭제 실패는 로그만 남기고 성공으로 응답합니다.
pub async fn delete_note(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let deleted = db::delete_note(&state.pool, &auth.user_id, &id).await?;
    if !deleted {
        return Err(AppError::NotFound);
    }

    match db::delete_note_tags_for_note(&state.pool, &id).await {
        Ok(count) => tracing::debug!("Deleted note {} and {} pivot(s)", id, count),
        Err(e) => tracing::warn!("Failed to delete pivots of note {}: {}", id, e),
    }

    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/v1/notes/{id}/tags` → `{ "tags": [...] }`
pub async fn get_note_tags(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    db::get_note(&state.pool, &auth.user_id, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    let tags = state.tag_sync.read_note_tags(&id).await?;
    Ok(Json(json!({ "tags": tags })))
}
