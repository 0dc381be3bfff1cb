//! # OHLCV Core
//!
//! 과거 캔들 수집기의 핵심 도메인 타입을 제공합니다.
//!
//! 이 크레이트는 수집 파이프라인 전반에서 사용되는 기본 타입을 제공합니다:
//! - 캔들(OHLCV) 레코드와 시계열 정규화
//! - 수집 단위(타임프레임) 정의
//! - 심볼 참조 및 저장 테이블 이름 규칙
//! - 로깅 인프라

pub mod logging;
pub mod types;

pub use logging::*;
pub use types::*;
