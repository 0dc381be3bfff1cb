//! 과거 캔들 데이터 소스 trait.
//!
//! 차트 백엔드는 전체 이력을 한 번에 주지 않고 두 가지 엔드포인트만 제공합니다:
//! - **initial**: 가장 최근 구간과, 다음 요청에 사용할 불투명한 count 값
//! - **slide**: 그보다 과거 구간 하나. 더 이상 이력이 없으면 빈 응답
//!
//! 전체 이력 조립은 수집기 쪽(HistoryFetcher)이 담당합니다.

use async_trait::async_trait;
use ohlcv_core::Candle;

use crate::Result;

/// initial 요청 결과.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitialWindow {
    /// 가장 최근 구간 캔들 (수신 순서)
    pub candles: Vec<Candle>,
    /// slide 요청에 그대로 전달해야 하는 값
    pub slice_count: i64,
}

/// 과거 캔들 데이터 소스.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// 최근 구간 조회.
    ///
    /// # 인자
    /// * `symbol_id` - 백엔드 심볼 ID
    /// * `step` - 캔들 간격 (초)
    async fn fetch_initial(&self, symbol_id: &str, step: u64) -> Result<InitialWindow>;

    /// 과거 구간 하나 조회. 이력이 끝나면 빈 Vec을 반환합니다.
    ///
    /// # 인자
    /// * `slice_count` - initial 응답의 count
    /// * `iteration` - 1부터 시작하는 slide 회차
    async fn fetch_slide(
        &self,
        symbol_id: &str,
        slice_count: i64,
        step: u64,
        iteration: u32,
    ) -> Result<Vec<Candle>>;
}
