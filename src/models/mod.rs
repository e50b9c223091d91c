//! # 데이터 모델 모듈
//!
//! 애플리케이션에서 사용하는 데이터 구조체(struct)들을 정의합니다.
//! 각 하위 모듈은 특정 도메인의 데이터 타입을 담당합니다:
//! - `note`: 노트(Note)와 요청/응답 구조체
//! - `note_tag`: 노트-태그 피벗 행
//! - `tag`: 정규 태그 관련 구조체
//! - `user`: 사용자(User) 및 인증 관련 구조체
//!
//! `pub use X::*;`로 재공개하여 `crate::models::Note`처럼 짧게 접근할 수 있습니다.

pub mod note;
pub mod note_tag;
pub mod tag;
pub mod user;

pub use note::*;
pub use note_tag::*;
pub use tag::*;
pub use user::*;
