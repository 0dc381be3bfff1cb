//! 심볼 하나 × 단위 하나의 전체 과거 캔들 조립.
//!
//! 백엔드는 최근 구간(initial)과 그보다 과거 구간(slide)만 제공하므로
//! 빈 slide 응답이 올 때까지 회차를 늘려 가며 요청합니다.
//!
//! ```text
//! initial ──> slide 1 ──> slide 2 ──> ... ──> slide N (빈 응답) ──> Completed
//!                                        └──> max_slides 도달 ──> CeilingReached
//!        어느 요청이든 실패 ──> Failed (누적분 폐기)
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ohlcv_core::{harvest_span, Candle, Granularity};
use ohlcv_data::{DataError, HistorySource};
use tracing::Instrument;

use crate::config::FetchConfig;

/// 재시도 정책.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 재시도 가능한 오류에 대한 최대 재시도 횟수
    pub max_retries: u32,
    /// 재시도 간 대기
    pub delay: Duration,
}

impl RetryPolicy {
    /// 재시도하지 않는 정책
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// 이력 조립 옵션.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    /// slide 요청 전 최소 대기
    pub slide_delay: Duration,
    /// 최대 slide 요청 수
    pub max_slides: u32,
    /// 재시도 정책
    pub retry: RetryPolicy,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}

impl From<&FetchConfig> for FetchOptions {
    fn from(config: &FetchConfig) -> Self {
        Self {
            slide_delay: config.slide_delay(),
            max_slides: config.max_slides,
            retry: RetryPolicy {
                max_retries: config.max_retries,
                delay: config.retry_delay(),
            },
        }
    }
}

/// 조립된 시계열 (수신 순서, 정규화 전).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedSeries {
    pub candles: Vec<Candle>,
    /// 외부 호출 수 (initial + slide + 재시도)
    pub calls: u32,
    /// slide 회차 수
    pub slides: u32,
}

/// 이력 조립 결과.
#[derive(Debug)]
pub enum FetchOutcome {
    /// 빈 slide 응답까지 도달
    Completed(FetchedSeries),
    /// `max_slides`에 도달해 중단. 수집분은 유효합니다.
    CeilingReached(FetchedSeries),
    /// 요청 실패. 누적분은 버려집니다.
    Failed(DataError),
}

impl FetchOutcome {
    /// 저장할 시계열이 있으면 반환합니다.
    pub fn series(&self) -> Option<&FetchedSeries> {
        match self {
            Self::Completed(series) | Self::CeilingReached(series) => Some(series),
            Self::Failed(_) => None,
        }
    }

    pub fn into_series(self) -> Option<FetchedSeries> {
        match self {
            Self::Completed(series) | Self::CeilingReached(series) => Some(series),
            Self::Failed(_) => None,
        }
    }
}

/// 한 번의 조립 동안만 유지되는 상태.
struct FetchCursor {
    candles: Vec<Candle>,
    slice_count: i64,
    iteration: u32,
    calls: u32,
}

impl FetchCursor {
    fn into_series(self) -> FetchedSeries {
        FetchedSeries {
            candles: self.candles,
            calls: self.calls,
            slides: self.iteration,
        }
    }
}

/// 전체 이력 조립기.
#[derive(Clone)]
pub struct HistoryFetcher {
    source: Arc<dyn HistorySource>,
    options: FetchOptions,
}

impl HistoryFetcher {
    pub fn new(source: Arc<dyn HistorySource>, options: FetchOptions) -> Self {
        Self { source, options }
    }

    /// (symbol_id, granularity)의 전체 이력을 조립합니다.
    pub async fn fetch(&self, symbol_id: &str, granularity: Granularity) -> FetchOutcome {
        self.fetch_inner(symbol_id, granularity)
            .instrument(harvest_span!("history_fetch", symbol_id, granularity))
            .await
    }

    async fn fetch_inner(&self, symbol_id: &str, granularity: Granularity) -> FetchOutcome {
        let step = granularity.step_secs();
        let mut calls = 0u32;

        let initial = match self
            .with_retry(&mut calls, || self.source.fetch_initial(symbol_id, step))
            .await
        {
            Ok(window) => window,
            Err(e) => {
                tracing::error!(error = %e, calls, "initial 요청 실패");
                return FetchOutcome::Failed(e);
            }
        };

        tracing::debug!(
            candles = initial.candles.len(),
            slice_count = initial.slice_count,
            "initial 구간 수신"
        );

        let mut cursor = FetchCursor {
            candles: initial.candles,
            slice_count: initial.slice_count,
            iteration: 0,
            calls,
        };

        loop {
            if cursor.iteration >= self.options.max_slides {
                tracing::warn!(
                    max_slides = self.options.max_slides,
                    candles = cursor.candles.len(),
                    "slide 상한 도달, 수집 중단"
                );
                return FetchOutcome::CeilingReached(cursor.into_series());
            }

            tokio::time::sleep(self.options.slide_delay).await;
            cursor.iteration += 1;

            let iteration = cursor.iteration;
            let slice_count = cursor.slice_count;
            let page = self
                .with_retry(&mut cursor.calls, || {
                    self.source.fetch_slide(symbol_id, slice_count, step, iteration)
                })
                .await;

            match page {
                Ok(page) if page.is_empty() => {
                    tracing::debug!(
                        slides = cursor.iteration,
                        candles = cursor.candles.len(),
                        "이력 끝 도달"
                    );
                    return FetchOutcome::Completed(cursor.into_series());
                }
                Ok(page) => {
                    tracing::trace!(iteration, received = page.len(), "slide 수신");
                    cursor.candles.extend(page);
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        iteration,
                        discarded = cursor.candles.len(),
                        "slide 요청 실패"
                    );
                    return FetchOutcome::Failed(e);
                }
            }
        }
    }

    /// 재시도 가능한 오류면 정책에 따라 다시 호출합니다. 모든 시도를 `calls`에 셉니다.
    async fn with_retry<T, F, Fut>(&self, calls: &mut u32, mut op: F) -> ohlcv_data::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ohlcv_data::Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            *calls += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.options.retry.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        error = %e,
                        attempt,
                        max_retries = self.options.retry.max_retries,
                        "재시도"
                    );
                    tokio::time::sleep(self.options.retry.delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ohlcv_data::InitialWindow;
    use rust_decimal_macros::dec;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn candle(ts: i64) -> Candle {
        Candle::new(ts, dec!(1), dec!(2), dec!(0.5), dec!(1.5), dec!(100))
    }

    /// 미리 정한 응답을 순서대로 돌려주는 데이터 소스
    struct ScriptedSource {
        initial: Mutex<VecDeque<ohlcv_data::Result<InitialWindow>>>,
        slides: Mutex<VecDeque<ohlcv_data::Result<Vec<Candle>>>>,
        slide_log: Mutex<Vec<(i64, u64, u32)>>,
    }

    impl ScriptedSource {
        fn new(
            initial: Vec<ohlcv_data::Result<InitialWindow>>,
            slides: Vec<ohlcv_data::Result<Vec<Candle>>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                initial: Mutex::new(initial.into()),
                slides: Mutex::new(slides.into()),
                slide_log: Mutex::new(Vec::new()),
            })
        }

        fn slide_log(&self) -> Vec<(i64, u64, u32)> {
            self.slide_log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HistorySource for ScriptedSource {
        async fn fetch_initial(
            &self,
            _symbol_id: &str,
            _step: u64,
        ) -> ohlcv_data::Result<InitialWindow> {
            self.initial
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(DataError::Network("no initial scripted".into())))
        }

        async fn fetch_slide(
            &self,
            _symbol_id: &str,
            slice_count: i64,
            step: u64,
            iteration: u32,
        ) -> ohlcv_data::Result<Vec<Candle>> {
            self.slide_log
                .lock()
                .unwrap()
                .push((slice_count, step, iteration));
            self.slides
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn window(candles: Vec<Candle>, slice_count: i64) -> ohlcv_data::Result<InitialWindow> {
        Ok(InitialWindow {
            candles,
            slice_count,
        })
    }

    fn options(max_slides: u32, retry: RetryPolicy) -> FetchOptions {
        FetchOptions {
            slide_delay: Duration::from_secs(1),
            max_slides,
            retry,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_then_slides_until_empty() {
        let source = ScriptedSource::new(
            vec![window(vec![candle(120), candle(180)], 2)],
            vec![Ok(vec![candle(60)]), Ok(vec![])],
        );
        let fetcher = HistoryFetcher::new(source.clone(), options(100, RetryPolicy::none()));

        let outcome = fetcher.fetch("BTCUSD", Granularity::M1).await;

        let series = match outcome {
            FetchOutcome::Completed(series) => series,
            other => panic!("expected Completed, got {:?}", other),
        };
        let timestamps: Vec<i64> = series.candles.iter().map(|c| c.timestamp).collect();
        assert_eq!(timestamps, vec![120, 180, 60]);
        assert_eq!(series.calls, 3);
        assert_eq!(series.slides, 2);
        assert_eq!(source.slide_log(), vec![(2, 60, 1), (2, 60, 2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_n_pages_make_n_plus_one_slides() {
        let n = 5;
        let mut pages: Vec<ohlcv_data::Result<Vec<Candle>>> =
            (0..n).map(|i| Ok(vec![candle(i as i64 * 3_600)])).collect();
        pages.push(Ok(vec![]));
        let source = ScriptedSource::new(vec![window(vec![candle(99_999)], 7)], pages);
        let fetcher = HistoryFetcher::new(source.clone(), options(100, RetryPolicy::none()));

        let series = fetcher
            .fetch("ETHUSD", Granularity::H1)
            .await
            .into_series()
            .unwrap();

        assert_eq!(series.slides, n + 1);
        assert_eq!(series.calls, n + 2);
        assert_eq!(series.candles.len(), n as usize + 1);
        assert!(source.slide_log().iter().all(|(count, step, _)| *count == 7 && *step == 3_600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slide_delay_before_every_slide() {
        let source = ScriptedSource::new(
            vec![window(vec![candle(1)], 1)],
            vec![Ok(vec![candle(0)]), Ok(vec![])],
        );
        let fetcher = HistoryFetcher::new(source, options(100, RetryPolicy::none()));

        let started = tokio::time::Instant::now();
        fetcher.fetch("BTCUSD", Granularity::M1).await;

        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ceiling_reached_keeps_candles() {
        let pages = (0..10).map(|i| Ok(vec![candle(i)])).collect();
        let source = ScriptedSource::new(vec![window(vec![candle(100)], 1)], pages);
        let fetcher = HistoryFetcher::new(source.clone(), options(3, RetryPolicy::none()));

        let outcome = fetcher.fetch("BTCUSD", Granularity::M1).await;

        let series = match outcome {
            FetchOutcome::CeilingReached(series) => series,
            other => panic!("expected CeilingReached, got {:?}", other),
        };
        assert_eq!(series.slides, 3);
        assert_eq!(series.candles.len(), 4);
        assert_eq!(source.slide_log().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_on_last_allowed_slide_is_completed() {
        let source = ScriptedSource::new(
            vec![window(vec![candle(100)], 1)],
            vec![Ok(vec![candle(1)]), Ok(vec![])],
        );
        let fetcher = HistoryFetcher::new(source, options(2, RetryPolicy::none()));

        let outcome = fetcher.fetch("BTCUSD", Granularity::M1).await;
        assert!(matches!(outcome, FetchOutcome::Completed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_failure() {
        let source = ScriptedSource::new(
            vec![Err(DataError::MalformedResponse("missing count".into()))],
            vec![],
        );
        let fetcher = HistoryFetcher::new(source.clone(), options(100, RetryPolicy::none()));

        let outcome = fetcher.fetch("BTCUSD", Granularity::M1).await;

        assert!(matches!(
            outcome,
            FetchOutcome::Failed(DataError::MalformedResponse(_))
        ));
        assert!(source.slide_log().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slide_failure_discards_partial_series() {
        let source = ScriptedSource::new(
            vec![window(vec![candle(100)], 1)],
            vec![
                Ok(vec![candle(50)]),
                Err(DataError::Timeout("slide".into())),
            ],
        );
        let fetcher = HistoryFetcher::new(source, options(100, RetryPolicy::none()));

        let outcome = fetcher.fetch("BTCUSD", Granularity::M1).await;

        assert!(matches!(outcome, FetchOutcome::Failed(DataError::Timeout(_))));
        assert!(outcome.series().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_retryable_errors() {
        let source = ScriptedSource::new(
            vec![
                Err(DataError::HttpStatus {
                    status: 503,
                    url: "period".into(),
                }),
                window(vec![candle(100)], 1),
            ],
            vec![
                Err(DataError::Network("reset".into())),
                Ok(vec![candle(50)]),
                Ok(vec![]),
            ],
        );
        let retry = RetryPolicy {
            max_retries: 2,
            delay: Duration::from_millis(500),
        };
        let fetcher = HistoryFetcher::new(source.clone(), options(100, retry));

        let series = fetcher
            .fetch("BTCUSD", Granularity::M1)
            .await
            .into_series()
            .unwrap();

        assert_eq!(series.candles.len(), 2);
        assert_eq!(series.slides, 2);
        assert_eq!(series.calls, 5);
        // 재시도는 같은 회차로 다시 요청
        let iterations: Vec<u32> = source.slide_log().iter().map(|(_, _, i)| *i).collect();
        assert_eq!(iterations, vec![1, 1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_is_not_retried() {
        let source = ScriptedSource::new(
            vec![
                Err(DataError::MalformedResponse("bad".into())),
                window(vec![candle(100)], 1),
            ],
            vec![],
        );
        let retry = RetryPolicy {
            max_retries: 3,
            delay: Duration::from_millis(10),
        };
        let fetcher = HistoryFetcher::new(source, options(100, retry));

        let outcome = fetcher.fetch("BTCUSD", Granularity::M1).await;
        assert!(matches!(outcome, FetchOutcome::Failed(_)));
    }

    #[test]
    fn test_options_from_config() {
        let options = FetchOptions::default();
        assert_eq!(options.slide_delay, Duration::from_secs(1));
        assert_eq!(options.max_slides, 100_000);
        assert_eq!(options.retry.max_retries, 0);
    }
}
