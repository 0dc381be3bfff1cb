//! Full-history OHLCV backfill collector.
//!
//! 이 crate는 차트 백엔드의 전체 과거 캔들을 수집해 저장하는 바이너리를 제공합니다:
//! - 심볼 하나 × 단위 하나의 전체 이력 조립 (`HistoryFetcher`)
//! - 배치 단위 동시 수집과 배치 간 대기 (`FetchScheduler`)
//! - 수집 통계 (`RunStats`)

pub mod config;
pub mod error;
pub mod modules;
pub mod stats;

pub use config::CollectorConfig;
pub use error::{CollectorError, Result};
pub use stats::RunStats;
