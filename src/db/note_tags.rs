//! # 노트-태그 피벗 쿼리 모듈
//!
//! `note_tags` 테이블은 노트와 태그의 다대다(N:M) 관계를 기록합니다.
//!
//! ```sql
//! tags ←── note_tags ──→ notes
//!  (1)       (N:M)        (1)
//! ```
//!
//! 외래키가 없으므로 태그나 노트가 지워져도 피벗은 자동으로 정리되지 않습니다.

use crate::error::AppError;
use crate::models::*;
use sqlx::SqlitePool;

const NOTE_TAG_COLUMNS: &str = "id, note_id, tag_id, tag, owner_id, created_at";

/// 노트 하나의 피벗 행을 생성 순서대로 최대 `limit`개 조회합니다. 같은 시각이면 삽입 순서(rowid)입니다.
pub async fn list_note_tags(
    pool: &SqlitePool,
    note_id: &str,
    limit: i64,
) -> Result<Vec<NoteTag>, AppError> {
    let rows = sqlx::query_as::<_, NoteTag>(&format!(
        "SELECT {NOTE_TAG_COLUMNS} FROM note_tags WHERE note_id = ? ORDER BY created_at, rowid LIMIT ?"
    ))
    .bind(note_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// 여러 노트의 피벗 행을 한 번에 조회합니다 (목록 화면의 태그 캐시 갱신용).
pub async fn list_note_tags_for_notes(
    pool: &SqlitePool,
    note_ids: &[String],
    limit: i64,
) -> Result<Vec<NoteTag>, AppError> {
    if note_ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; note_ids.len()].join(", ");
    let sql = format!(
        "SELECT {NOTE_TAG_COLUMNS} FROM note_tags WHERE note_id IN ({placeholders}) ORDER BY created_at, rowid LIMIT ?"
    );

    let mut query = sqlx::query_as::<_, NoteTag>(&sql);
    for id in note_ids {
        query = query.bind(id);
    }
    let rows = query.bind(limit).fetch_all(pool).await?;

    Ok(rows)
}

/// 피벗 행을 하나 삽입합니다.
///
/// 같은 (note_id, tag_id) 조합의 중복 여부는 여기서 검사하지 않습니다.
/// 중복 방지는 호출자(태그 동기화기)의 몫입니다.
pub async fn insert_note_tag(pool: &SqlitePool, new_row: &NewNoteTag) -> Result<NoteTag, AppError> {
    let id = uuid::Uuid::now_v7().to_string();

    sqlx::query(
        r#"
        INSERT INTO note_tags (id, note_id, tag_id, tag, owner_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&new_row.note_id)
    .bind(&new_row.tag_id)
    .bind(&new_row.tag)
    .bind(&new_row.owner_id)
    .bind(&new_row.created_at)
    .execute(pool)
    .await?;

    Ok(NoteTag {
        id,
        note_id: new_row.note_id.clone(),
        tag_id: Some(new_row.tag_id.clone()),
        tag: Some(new_row.tag.clone()),
        owner_id: Some(new_row.owner_id.clone()),
        created_at: new_row.created_at.clone(),
    })
}

/// 레거시 피벗 행에 태그 ID를 채워 넣습니다. 다른 컬럼은 바꾸지 않습니다.
pub async fn set_note_tag_tag_id(pool: &SqlitePool, id: &str, tag_id: &str) -> Result<(), AppError> {
    let result = sqlx::query("UPDATE note_tags SET tag_id = ? WHERE id = ?")
        .bind(tag_id)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// 피벗 행 하나를 자신의 ID로 삭제합니다.
pub async fn delete_note_tag(pool: &SqlitePool, id: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM note_tags WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// 노트에 달린 모든 피벗 행을 삭제하고 삭제된 행 수를 반환합니다 (노트 삭제 후 정리용).
pub async fn delete_note_tags_for_note(pool: &SqlitePool, note_id: &str) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM note_tags WHERE note_id = ?")
        .bind(note_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// 이름만 있는 레거시 피벗 행을 삽입합니다. 예전 데이터를 재현하는 테스트에서만 씁니다.
#[cfg(test)]
pub async fn insert_legacy_note_tag(
    pool: &SqlitePool,
    note_id: &str,
    tag: &str,
) -> Result<String, AppError> {
    let id = uuid::Uuid::now_v7().to_string();
    sqlx::query("INSERT INTO note_tags (id, note_id, tag, created_at) VALUES (?, ?, ?, ?)")
        .bind(&id)
        .bind(note_id)
        .bind(tag)
        .bind("2020-01-01T00:00:00.000Z")
        .execute(pool)
        .await?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn new_row(note: &str, tag_id: &str, tag: &str) -> NewNoteTag {
        NewNoteTag {
            note_id: note.to_string(),
            tag_id: tag_id.to_string(),
            tag: tag.to_string(),
            owner_id: "u1".to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn list_is_scoped_and_bounded() {
        let pool = test_pool().await;
        insert_note_tag(&pool, &new_row("n1", "t1", "Work")).await.unwrap();
        insert_note_tag(&pool, &new_row("n1", "t2", "Ideas")).await.unwrap();
        insert_note_tag(&pool, &new_row("n2", "t1", "Work")).await.unwrap();

        assert_eq!(list_note_tags(&pool, "n1", 500).await.unwrap().len(), 2);
        assert_eq!(list_note_tags(&pool, "n1", 1).await.unwrap().len(), 1);

        let both = list_note_tags_for_notes(&pool, &["n1".into(), "n2".into()], 100)
            .await
            .unwrap();
        assert_eq!(both.len(), 3);
    }

    #[tokio::test]
    async fn backfill_and_delete() {
        let pool = test_pool().await;
        let legacy_id = insert_legacy_note_tag(&pool, "n1", "Work").await.unwrap();

        set_note_tag_tag_id(&pool, &legacy_id, "t1").await.unwrap();
        let rows = list_note_tags(&pool, "n1", 500).await.unwrap();
        assert_eq!(rows[0].tag_id.as_deref(), Some("t1"));
        assert_eq!(rows[0].tag.as_deref(), Some("Work"));

        assert!(matches!(
            set_note_tag_tag_id(&pool, "missing", "t1").await,
            Err(AppError::NotFound)
        ));

        delete_note_tag(&pool, &legacy_id).await.unwrap();
        assert!(list_note_tags(&pool, "n1", 500).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_for_note_only_touches_that_note() {
        let pool = test_pool().await;
        insert_note_tag(&pool, &new_row("n1", "t1", "Work")).await.unwrap();
        insert_note_tag(&pool, &new_row("n2", "t1", "Work")).await.unwrap();

        assert_eq!(delete_note_tags_for_note(&pool, "n1").await.unwrap(), 1);
        assert_eq!(list_note_tags(&pool, "n2", 500).await.unwrap().len(), 1);
    }
}
