//! # 미들웨어 모듈
//!
//! - `auth`: Bearer 토큰에서 요청 소유자(`AuthUser`)를 꺼내는 추출자와 JWT 유틸리티

pub mod auth;
