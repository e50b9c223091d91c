//! # 태그 API 라우트 핸들러
//!
//! 소유자별 정규 태그의 CRUD 핸들러입니다.
//! 노트에 태그를 붙이고 떼는 일은 노트 쓰기 경로(태그 동기화기)가 하므로 여기에는 없습니다.
//!
//! ## 엔드포인트 목록
//! | 메서드 | 경로 | 핸들러 | 설명 |
//! |--------|------|--------|------|
//! | GET | /api/v1/tags | `list_tags` | 내 태그 목록 (사용 횟수 내림차순, 이름순) |
//! | POST | /api/v1/tags | `create_tag` | 새 태그 생성 |
//! | GET | /api/v1/tags/{id} | `get_tag` | 태그 하나 조회 |
//! | PATCH | /api/v1/tags/{id} | `update_tag` | 태그 이름 변경 |
//! | DELETE | /api/v1/tags/{id} | `delete_tag` | 태그 삭제 |
//!
//! ## Axum 핸들러 패턴
//! - `State(state)`: 애플리케이션 공유 상태 (DB 풀 등)
//! - `auth`: Bearer 토큰에서 꺼낸 소유자. 모든 쿼리는 이 소유자로 범위가 제한됩니다.
//! - `Path(id)`: URL 경로의 변수 (`{id}` 부분)
//! - `Json(req)`: 요청 본문을 구조체로 파싱

use crate::{
    db::{self, Clock, SystemClock},
    error::AppError,
    middleware::auth::AuthUser,
    models::*,
    routes::AppState,
    services::tag_sync::fold_tag_name,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

const DUPLICATE_TAG: &str = "A tag with this name already exists";

/// 앞뒤 공백을 잘라낸 이름을 돌려줍니다. 비어 있으면 400입니다.
fn tag_name(raw: &str) -> Result<&str, AppError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Tag name must not be empty".to_string()));
    }
    Ok(name)
}

/// DB 에러 중 (owner_id, name_lower) 유일 인덱스 충돌만 409로 바꿉니다.
fn map_duplicate(err: AppError) -> AppError {
    match err {
        AppError::Database(e) => AppError::conflict_on_unique(e, DUPLICATE_TAG),
        other => other,
    }
}

/// `GET /api/v1/tags` → `{ "tags": [...] }`
pub async fn list_tags(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Value>, AppError> {
    let tags = db::list_tags(&state.pool, &auth.user_id).await?;
    Ok(Json(json!({ "tags": tags })))
}

/// 새 태그를 생성합니다.
///
/// `POST /api/v1/tags` + `{ "name": "..." }` → `201 Created`
///
/// 입력한 대소문자 표기가 표시 이름이 되고, 소문자로 접은 이름이 유일 키가 됩니다.
/// "Work"가 있는데 "work"를 만들려 하면 409입니다.
pub async fn create_tag(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateTagRequest>,
) -> Result<(StatusCode, Json<Tag>), AppError> {
    let name = tag_name(&req.name)?;
    let new_tag = NewTag {
        name: name.to_string(),
        name_lower: fold_tag_name(name),
        owner_id: auth.user_id,
        created_at: SystemClock.now(),
    };

    let tag = db::insert_tag(&state.pool, &new_tag)
        .await
        .map_err(map_duplicate)?;
    Ok((StatusCode::CREATED, Json(tag)))
}

/// `GET /api/v1/tags/{id}`
pub async fn get_tag(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Tag>, AppError> {
    let tag = db::get_tag(&state.pool, &auth.user_id, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(tag))
}

/// 태그 이름을 바꿉니다.
///
/// `PATCH /api/v1/tags/{id}` + `{ "name": "..." }`
///
/// 이미 노트에 붙어 있는 피벗의 표시 이름 사본은 그대로 남습니다.
pub async fn update_tag(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateTagRequest>,
) -> Result<Json<Tag>, AppError> {
    let Some(raw) = req.name.as_deref() else {
        // 바꿀 것이 없으면 현재 값을 그대로 돌려줍니다.
        return get_tag(State(state), auth, Path(id)).await;
    };

    let tag = db::rename_tag(&state.pool, &auth.user_id, &id, tag_name(raw)?)
        .await
        .map_err(map_duplicate)?
        .ok_or(AppError::NotFound)?;
    Ok(Json(tag))
}

/// `DELETE /api/v1/tags/{id}` → `204 No Content`
///
/// 이 태그를 가리키던 피벗은 지우지 않습니다. 노트는 피벗의 표시 이름 사본으로 계속 태그를 보여줍니다.
pub async fn delete_tag(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let deleted = db::delete_tag(&state.pool, &auth.user_id, &id).await?;
    if !deleted {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_state;

    fn owner(id: &str) -> AuthUser {
        AuthUser {
            user_id: id.to_string(),
        }
    }

    fn create_req(name: &str) -> Json<CreateTagRequest> {
        Json(CreateTagRequest {
            name: name.to_string(),
        })
    }

    #[tokio::test]
    async fn create_trims_and_rejects_duplicates() {
        let state = test_state().await;

        let (status, Json(tag)) = create_tag(State(state.clone()), owner("u1"), create_req("  Work "))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(tag.name, "Work");
        assert_eq!(tag.name_lower, "work");
        assert!(chrono::NaiveDateTime::parse_from_str(&tag.created_at, db::TIMESTAMP_FORMAT).is_ok());

        let dup = create_tag(State(state.clone()), owner("u1"), create_req("WORK")).await;
        assert!(matches!(dup, Err(AppError::Conflict(_))));

        let empty = create_tag(State(state.clone()), owner("u1"), create_req("   ")).await;
        assert!(matches!(empty, Err(AppError::BadRequest(_))));

        // 다른 소유자는 같은 이름을 쓸 수 있습니다.
        assert!(create_tag(State(state), owner("u2"), create_req("work")).await.is_ok());
    }

    #[tokio::test]
    async fn rename_collision_is_conflict() {
        let state = test_state().await;
        let (_, Json(work)) = create_tag(State(state.clone()), owner("u1"), create_req("Work"))
            .await
            .unwrap();
        assert_eq!(work.name, "Work");
        let (_, Json(ideas)) = create_tag(State(state.clone()), owner("u1"), create_req("Ideas"))
            .await
            .unwrap();

        let result = update_tag(
            State(state.clone()),
            owner("u1"),
            Path(ideas.id.clone()),
            Json(UpdateTagRequest {
                name: Some("work".to_string()),
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        let Json(renamed) = update_tag(
            State(state),
            owner("u1"),
            Path(ideas.id),
            Json(UpdateTagRequest {
                name: Some("Thoughts".to_string()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(renamed.name_lower, "thoughts");
    }

    #[tokio::test]
    async fn other_owners_tags_are_not_found() {
        let state = test_state().await;
        let (_, Json(tag)) = create_tag(State(state.clone()), owner("u1"), create_req("Work"))
            .await
            .unwrap();

        let get = get_tag(State(state.clone()), owner("u2"), Path(tag.id.clone())).await;
        assert!(matches!(get, Err(AppError::NotFound)));
        let delete = delete_tag(State(state.clone()), owner("u2"), Path(tag.id.clone())).await;
        assert!(matches!(delete, Err(AppError::NotFound)));

        let status = delete_tag(State(state), owner("u1"), Path(tag.id)).await.unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}
