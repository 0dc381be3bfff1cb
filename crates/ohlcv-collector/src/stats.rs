//! 수집 통계 구조체.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 수집 실행 통계.
///
/// `total`은 (심볼, 단위) 조합 수이며
/// `success + ceiling_reached + empty + errors == total`입니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// 처리한 심볼 수
    pub symbols: usize,
    /// 실행한 배치 수
    pub batches: usize,
    /// (심볼, 단위) 조합 수
    pub total: usize,
    /// 전체 이력 수집 및 저장 성공
    pub success: usize,
    /// slide 상한 도달 (수집분은 저장됨)
    pub ceiling_reached: usize,
    /// 조회 성공, 데이터 없음
    pub empty: usize,
    /// 조회 또는 저장 실패
    pub errors: usize,
    /// 정규화 후 저장 요청한 캔들 수
    pub total_candles: usize,
    /// 새로 삽입된 행 수
    pub inserted: usize,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RunStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 다른 통계를 합산합니다. `elapsed`와 `batches`는 합산하지 않습니다.
    pub fn merge(&mut self, other: &RunStats) {
        self.symbols += other.symbols;
        self.total += other.total;
        self.success += other.success;
        self.ceiling_reached += other.ceiling_reached;
        self.empty += other.empty;
        self.errors += other.errors;
        self.total_candles += other.total_candles;
        self.inserted += other.inserted;
    }

    /// 성공률 계산 (%). 상한 도달도 저장되었으므로 성공으로 봅니다.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            ((self.success + self.ceiling_reached) as f64 / self.total as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            symbols = self.symbols,
            batches = self.batches,
            total = self.total,
            success = self.success,
            ceiling_reached = self.ceiling_reached,
            empty = self.empty,
            errors = self.errors,
            total_candles = self.total_candles,
            inserted = self.inserted,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "수집 완료"
        );
    }
}
