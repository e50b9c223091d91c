//! # 노트-태그 피벗 모델
//!
//! `note_tags` 테이블 한 행은 "이 노트가 이 태그를 달고 있다"는 관계를 나타냅니다.
//! `tag_id`와 `tag`(표시 이름 사본)는 둘 다 비어 있을 수 있습니다:
//! 예전 데이터에는 이름만 기록되고 `tag_id`가 없는 행이 남아 있습니다.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct NoteTag {
    pub id: String,
    pub note_id: String,
    /// 정규 태그 ID. None이면 레거시 행입니다.
    pub tag_id: Option<String>,
    /// 태그 표시 이름 사본 (비정규화)
    pub tag: Option<String>,
    pub owner_id: Option<String>,
    pub created_at: String,
}

/// 피벗 저장소에 새 행을 넣을 때 사용하는 값입니다.
#[derive(Debug, Clone)]
pub struct NewNoteTag {
    pub note_id: String,
    pub tag_id: String,
    pub tag: String,
    pub owner_id: String,
    pub created_at: String,
}
