//! # 태그 모델 정의
//!
//! 태그(Tag) 시스템에서 사용하는 데이터 구조체들을 정의합니다.
//! 태그는 소유자(owner)별로 관리되며, 소문자로 접은 이름(`name_lower`)이 유일 키입니다.
//!
//! ## 구조체 역할
//! - `Tag`: 데이터베이스에 저장된 정규(canonical) 태그 (응답용)
//! - `NewTag`: 태그 저장소에 새 태그를 넣을 때 사용하는 입력값
//! - `CreateTagRequest`: 새 태그 생성 시 클라이언트가 보내는 JSON 본문
//! - `UpdateTagRequest`: 태그 이름 변경 시 클라이언트가 보내는 JSON 본문

use serde::{Deserialize, Serialize};

/// 태그 엔티티 — DB의 `tags` 테이블 한 행(row)에 대응합니다.
///
/// # derive 매크로 설명
/// - `Serialize`: 이 구조체를 JSON으로 변환할 수 있게 합니다 (API 응답 시 사용)
/// - `Deserialize`: JSON을 이 구조체로 변환할 수 있게 합니다
/// - `sqlx::FromRow`: SQL 쿼리 결과(행)를 이 구조체로 자동 매핑합니다
/// - `PartialEq`: 테스트에서 `assert_eq!`로 비교할 수 있게 합니다
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    /// 태그 고유 식별자 (UUIDv7 형식 문자열)
    pub id: String,
    /// 화면에 보여줄 이름. 처음 입력된 대소문자 표기를 그대로 유지합니다.
    pub name: String,
    /// 소문자로 접은 이름. (owner_id, name_lower) 조합이 유일합니다.
    pub name_lower: String,
    /// 태그 소유자(사용자) ID
    pub owner_id: String,
    /// 사용 횟수. 생성 시 0으로 시작합니다.
    pub usage_count: i64,
    /// 생성 시각 (ISO-8601 UTC 문자열)
    pub created_at: String,
}

/// 태그 저장소에 새 태그를 삽입할 때 넘기는 값입니다.
///
/// ID와 usage_count는 저장소가 채웁니다.
#[derive(Debug, Clone)]
pub struct NewTag {
    pub name: String,
    pub name_lower: String,
    pub owner_id: String,
    pub created_at: String,
}

/// 태그 생성 요청 — `POST /api/v1/tags`의 요청 본문(body)에 해당합니다.
///
/// 이 구조체는 클라이언트 → 서버 방향으로만 사용되므로 Deserialize만 derive합니다.
#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    /// 생성할 태그 이름 (필수, 앞뒤 공백은 제거됨)
    pub name: String,
}

/// 태그 수정 요청 — `PATCH /api/v1/tags/{id}`의 요청 본문에 해당합니다.
///
/// PATCH는 부분 업데이트이므로 필드가 Option입니다.
/// 이름이 바뀌면 `name_lower`도 함께 갱신됩니다.
#[derive(Debug, Deserialize)]
pub struct UpdateTagRequest {
    /// 변경할 태그 이름 (None이면 변경하지 않음)
    pub name: Option<String>,
}
