//! 외부 협력 컴포넌트: 차트 백엔드, 심볼 목록, 시계열 저장소.
//!
//! 이 crate는 다음을 제공합니다:
//! - 차트 백엔드 과거 캔들 API 클라이언트 (`HistorySource`)
//! - 심볼 목록 제공자 (`SymbolDirectory`)
//! - (거래소, 거래쌍)별 시계열 테이블 저장소 (`SeriesStore`)

pub mod error;
pub mod provider;
pub mod storage;

pub use error::{DataError, Result};

pub use provider::{
    ChartApiClient, ChartApiConfig, ChartPageDirectory, HistorySource, InitialWindow,
    SymbolDirectory,
};
pub use storage::{MemorySeriesStore, PgSeriesStore, SeriesStore};
