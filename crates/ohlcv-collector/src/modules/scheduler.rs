//! 배치 단위 동시 수집 스케줄러.
//!
//! 심볼 목록을 고정 크기 배치로 나누어 배치 안의 심볼은 동시에, 심볼 안의
//! 단위들도 동시에 조립합니다. 배치 사이에는 설정된 시간만큼 대기하고,
//! 마지막 배치가 끝나면 저장소를 한 번만 닫습니다.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use ohlcv_core::{count_gaps, harvest_span, normalize_series, Granularity, SymbolRef};
use ohlcv_data::SeriesStore;
use tracing::Instrument;

use super::history_fetch::{FetchOutcome, HistoryFetcher};
use crate::config::ScheduleConfig;
use crate::{CollectorError, Result, RunStats};

/// 스케줄 옵션.
#[derive(Debug, Clone)]
pub struct ScheduleOptions {
    /// 배치당 심볼 수
    pub batch_size: usize,
    /// 배치 사이 대기
    pub batch_pause: Duration,
    /// 수집할 단위 목록
    pub granularities: Vec<Granularity>,
}

impl ScheduleOptions {
    pub fn new(config: &ScheduleConfig, granularities: Vec<Granularity>) -> Self {
        Self {
            batch_size: config.batch_size,
            batch_pause: config.batch_pause(),
            granularities,
        }
    }
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self::new(&ScheduleConfig::default(), Granularity::ALL.to_vec())
    }
}

/// 심볼 × 단위 수집 스케줄러.
pub struct FetchScheduler {
    fetcher: HistoryFetcher,
    store: Arc<dyn SeriesStore>,
    options: ScheduleOptions,
}

impl FetchScheduler {
    pub fn new(
        fetcher: HistoryFetcher,
        store: Arc<dyn SeriesStore>,
        options: ScheduleOptions,
    ) -> Self {
        Self {
            fetcher,
            store,
            options,
        }
    }

    /// 전체 심볼을 수집하고 저장소를 닫습니다.
    ///
    /// 개별 (심볼, 단위) 실패는 통계에만 반영됩니다. 잘못된 배치 크기와 저장소 종료
    /// 실패만 에러로 반환되며, 어느 경우든 저장소는 닫힌 상태로 끝납니다.
    pub async fn run(&self, symbols: &[SymbolRef]) -> Result<RunStats> {
        if self.options.batch_size == 0 {
            self.store.close().await?;
            return Err(CollectorError::Config(
                "batch_size는 1 이상이어야 합니다".to_string(),
            ));
        }

        let start = Instant::now();
        let mut stats = RunStats::new();
        let batch_count = symbols.len().div_ceil(self.options.batch_size);

        tracing::info!(
            symbols = symbols.len(),
            granularities = self.options.granularities.len(),
            batch_size = self.options.batch_size,
            batches = batch_count,
            "수집 시작"
        );

        for (idx, batch) in symbols.chunks(self.options.batch_size).enumerate() {
            tracing::debug!(
                batch = idx + 1,
                progress = format!("{}/{}", idx + 1, batch_count),
                size = batch.len(),
                "배치 시작"
            );

            let results = join_all(batch.iter().map(|symbol| self.harvest_symbol(symbol))).await;
            for symbol_stats in &results {
                stats.merge(symbol_stats);
            }
            stats.batches += 1;

            if idx + 1 < batch_count {
                tokio::time::sleep(self.options.batch_pause).await;
            }
        }

        self.store.close().await?;

        stats.elapsed = start.elapsed();
        Ok(stats)
    }

    /// 한 심볼의 모든 단위를 동시에 조립한 뒤 순서대로 저장합니다.
    async fn harvest_symbol(&self, symbol: &SymbolRef) -> RunStats {
        let span = harvest_span!("harvest_symbol", symbol);
        async move {
            let mut stats = RunStats {
                symbols: 1,
                total: self.options.granularities.len(),
                ..Default::default()
            };

            let outcomes = join_all(
                self.options
                    .granularities
                    .iter()
                    .map(|g| self.fetcher.fetch(&symbol.symbol_id, *g)),
            )
            .await;

            let mut storable = Vec::new();
            for (granularity, outcome) in self.options.granularities.iter().zip(outcomes) {
                match outcome {
                    FetchOutcome::Failed(e) => {
                        stats.errors += 1;
                        tracing::error!(
                            granularity = %granularity,
                            error = %e,
                            transport = e.is_transport(),
                            "조회 실패"
                        );
                    }
                    FetchOutcome::Completed(series) if series.candles.is_empty() => {
                        stats.empty += 1;
                        tracing::debug!(granularity = %granularity, "데이터 없음");
                    }
                    FetchOutcome::Completed(series) => {
                        storable.push((*granularity, series, false));
                    }
                    FetchOutcome::CeilingReached(series) => {
                        storable.push((*granularity, series, true));
                    }
                }
            }

            if storable.is_empty() {
                return stats;
            }

            if let Err(e) = self.store.ensure_table(&symbol.exchange, &symbol.pair).await {
                stats.errors += storable.len();
                tracing::error!(table = %symbol.table_name(), error = %e, "테이블 생성 실패");
                return stats;
            }

            for (granularity, series, ceiling) in storable {
                let calls = series.calls;
                let candles = normalize_series(series.candles);
                let gaps = count_gaps(&candles, granularity);
                match self
                    .store
                    .upsert_candles(&symbol.exchange, &symbol.pair, &candles)
                    .await
                {
                    Ok(inserted) => {
                        if ceiling {
                            stats.ceiling_reached += 1;
                        } else {
                            stats.success += 1;
                        }
                        stats.total_candles += candles.len();
                        stats.inserted += inserted;
                        tracing::info!(
                            granularity = %granularity,
                            candles = candles.len(),
                            inserted,
                            calls,
                            gaps,
                            "수집 및 저장 완료"
                        );
                    }
                    Err(e) => {
                        stats.errors += 1;
                        tracing::error!(granularity = %granularity, error = %e, "저장 실패");
                    }
                }
            }

            stats
        }
        .instrument(span)
        .await
    }
}
