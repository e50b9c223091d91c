use serde::{Deserialize, Serialize};
use sqlx::types::Json;

/// 노트 공개 상태. DB에는 소문자 문자열로 저장됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum NoteStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl NoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteStatus::Draft => "draft",
            NoteStatus::Published => "published",
            NoteStatus::Archived => "archived",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Note {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub content: String,
    pub status: NoteStatus,
    /// 태그 이름 캐시. 읽기 경로에서 피벗 행으로 다시 채워집니다.
    pub tags: Json<Vec<String>>,
    pub created_at: String,
    pub updated_at: String,
}

/// 노트 응답 본문.
///
/// 태그 동기화가 일부 실패했다면 `unsynced_tags`에 해당 태그 이름이 담깁니다.
/// 기존 피벗을 읽지 못해 태그 목록을 맞추지 못했다면 `tags_unreconciled`가 true입니다.
/// 어느 경우든 노트 저장 자체는 성공한 상태입니다.
#[derive(Debug, Serialize)]
pub struct NoteResponse {
    #[serde(flatten)]
    pub note: Note,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unsynced_tags: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub tags_unreconciled: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<NoteStatus>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<NoteStatus>,
    /// None = 필드 누락 (태그를 건드리지 않음), Some(vec) = 태그 목록 전체 교체
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ListNotesQuery {
    pub status: Option<NoteStatus>,
}
