//! # 태그 데이터베이스 쿼리 모듈
//!
//! 정규(canonical) 태그의 CRUD 쿼리 함수들입니다.
//! 모든 함수는 `SqlitePool` 참조를 받아 비동기로 실행되며, 소유자(owner_id) 범위 안에서만 동작합니다.
//!
//! ## 테이블 구조
//! - `tags`: 태그 엔티티 (id, name, name_lower, owner_id, usage_count, created_at)
//! - `(owner_id, name_lower)`에 UNIQUE 인덱스가 있어 같은 소유자의 대소문자만 다른 태그는 하나만 존재합니다.

use crate::error::AppError;
use crate::models::*;
use sqlx::SqlitePool;

const TAG_COLUMNS: &str = "id, name, name_lower, owner_id, usage_count, created_at";

/// 소유자의 태그 목록을 사용 횟수 내림차순 → 이름순으로 조회합니다 (최대 1000개).
pub async fn list_tags(pool: &SqlitePool, owner_id: &str) -> Result<Vec<Tag>, AppError> {
    let tags = sqlx::query_as::<_, Tag>(&format!(
        "SELECT {TAG_COLUMNS} FROM tags WHERE owner_id = ? ORDER BY usage_count DESC, name LIMIT 1000"
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    Ok(tags)
}

/// ID로 태그 하나를 조회합니다. 다른 소유자의 태그는 `None`입니다.
///
/// `fetch_optional`은 결과가 0행이면 None, 1행이면 Some(Tag)을 반환합니다.
pub async fn get_tag(pool: &SqlitePool, owner_id: &str, id: &str) -> Result<Option<Tag>, AppError> {
    let tag = sqlx::query_as::<_, Tag>(&format!(
        "SELECT {TAG_COLUMNS} FROM tags WHERE id = ? AND owner_id = ?"
    ))
    .bind(id)
    .bind(owner_id)
    .fetch_optional(pool)
    .await?;

    Ok(tag)
}

/// 소문자 이름 목록으로 소유자의 태그를 한 번에 조회합니다.
///
/// SQLite는 배열 바인딩을 지원하지 않으므로 `IN (?, ?, ...)` 자리표시자를
/// 키 개수만큼 동적으로 만든 뒤 하나씩 바인딩합니다.
/// 키가 비어 있으면 쿼리 없이 빈 목록을 반환합니다.
pub async fn find_tags_by_name_lower(
    pool: &SqlitePool,
    owner_id: &str,
    keys: &[String],
) -> Result<Vec<Tag>, AppError> {
    if keys.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; keys.len()].join(", ");
    let sql = format!(
        "SELECT {TAG_COLUMNS} FROM tags WHERE owner_id = ? AND name_lower IN ({placeholders}) LIMIT ?"
    );

    let mut query = sqlx::query_as::<_, Tag>(&sql).bind(owner_id);
    for key in keys {
        query = query.bind(key);
    }
    let tags = query.bind(keys.len() as i64).fetch_all(pool).await?;

    Ok(tags)
}

/// 새 태그를 삽입하고 삽입된 행을 반환합니다.
///
/// ## 처리 흐름
/// 1. UUIDv7으로 고유 ID 생성
/// 2. INSERT (usage_count는 0으로 시작)
/// 3. 방금 만든 행을 다시 조회하여 반환
///
/// 같은 (owner_id, name_lower)가 이미 있으면 UNIQUE 위반으로 `AppError::Database`가 반환됩니다.
/// 동시 생성 경쟁에서 진 쪽은 이 에러를 받고, 호출자가 재조회로 이긴 쪽의 행을 찾습니다.
pub async fn insert_tag(pool: &SqlitePool, new_tag: &NewTag) -> Result<Tag, AppError> {
    let id = uuid::Uuid::now_v7().to_string();

    sqlx::query(
        r#"
        INSERT INTO tags (id, name, name_lower, owner_id, usage_count, created_at)
        VALUES (?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(&id)
    .bind(&new_tag.name)
    .bind(&new_tag.name_lower)
    .bind(&new_tag.owner_id)
    .bind(&new_tag.created_at)
    .execute(pool)
    .await?;

    get_tag(pool, &new_tag.owner_id, &id)
        .await?
        .ok_or(AppError::Internal("Failed to retrieve created tag".to_string()))
}

/// 태그 이름을 바꿉니다. `name_lower`도 함께 갱신합니다.
///
/// 피벗 행의 표시 이름 사본은 건드리지 않습니다.
///
/// ## 반환값
/// - `Ok(Some(Tag))`: 변경 성공
/// - `Ok(None)`: 해당 소유자의 태그가 아님
/// - `Err(...)`: DB 에러 (이름 충돌 시 UNIQUE 위반 포함)
pub async fn rename_tag(
    pool: &SqlitePool,
    owner_id: &str,
    id: &str,
    name: &str,
) -> Result<Option<Tag>, AppError> {
    let result = sqlx::query("UPDATE tags SET name = ?, name_lower = ? WHERE id = ? AND owner_id = ?")
        .bind(name)
        .bind(name.to_lowercase())
        .bind(id)
        .bind(owner_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    get_tag(pool, owner_id, id).await
}

/// 태그를 삭제합니다.
///
/// 피벗 행은 그대로 남습니다. 남은 피벗은 표시 이름 사본으로 계속 읽힙니다.
///
/// ## 반환값
/// - `true`: 삭제 성공
/// - `false`: 해당 소유자의 태그가 없음
pub async fn delete_tag(pool: &SqlitePool, owner_id: &str, id: &str) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM tags WHERE id = ? AND owner_id = ?")
        .bind(id)
        .bind(owner_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// 소유자의 정규 태그 개수
pub async fn count_tags(pool: &SqlitePool, owner_id: &str) -> Result<i64, AppError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tags WHERE owner_id = ?")
        .bind(owner_id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn new_tag(owner: &str, name: &str) -> NewTag {
        NewTag {
            name: name.to_string(),
            name_lower: name.to_lowercase(),
            owner_id: owner.to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn insert_and_find_by_folded_name() {
        let pool = test_pool().await;
        let work = insert_tag(&pool, &new_tag("u1", "Work")).await.unwrap();
        insert_tag(&pool, &new_tag("u1", "Ideas")).await.unwrap();
        insert_tag(&pool, &new_tag("u2", "Work")).await.unwrap();

        assert_eq!(work.usage_count, 0);
        assert_eq!(work.name_lower, "work");

        let found = find_tags_by_name_lower(&pool, "u1", &["work".to_string()])
            .await
            .unwrap();
        assert_eq!(found, vec![work]);

        let none = find_tags_by_name_lower(&pool, "u1", &[]).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn duplicate_folded_name_is_rejected_per_owner() {
        let pool = test_pool().await;
        insert_tag(&pool, &new_tag("u1", "Work")).await.unwrap();

        let dup = insert_tag(&pool, &new_tag("u1", "WORK")).await;
        match dup {
            Err(AppError::Database(e)) => {
                assert!(matches!(
                    AppError::conflict_on_unique(e, "dup"),
                    AppError::Conflict(_)
                ));
            }
            other => panic!("expected unique violation, got {:?}", other),
        }

        // 다른 소유자는 같은 이름을 가질 수 있습니다.
        assert!(insert_tag(&pool, &new_tag("u2", "work")).await.is_ok());
        assert_eq!(count_tags(&pool, "u1").await.unwrap(), 1);
        assert_eq!(count_tags(&pool, "u3").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rename_and_delete_are_owner_scoped() {
        let pool = test_pool().await;
        let tag = insert_tag(&pool, &new_tag("u1", "Work")).await.unwrap();

        assert!(rename_tag(&pool, "u2", &tag.id, "Job").await.unwrap().is_none());
        let renamed = rename_tag(&pool, "u1", &tag.id, "Job").await.unwrap().unwrap();
        assert_eq!(renamed.name, "Job");
        assert_eq!(renamed.name_lower, "job");

        assert!(!delete_tag(&pool, "u2", &tag.id).await.unwrap());
        assert!(delete_tag(&pool, "u1", &tag.id).await.unwrap());
        assert!(get_tag(&pool, "u1", &tag.id).await.unwrap().is_none());
    }
}
