//! # 서비스 계층
//!
//! 라우트 핸들러와 DB 쿼리 사이의 도메인 로직입니다.
//!
//! - `tag_sync`: 노트 쓰기 시 태그 캐시/정규 태그/피벗을 맞추는 동기화기

pub mod tag_sync;
