//! 환경변수 기반 설정 모듈.

use std::time::Duration;

use ohlcv_data::ChartApiConfig;

use crate::{CollectorError, Result};

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 데이터베이스 URL (`--dry-run`이면 없어도 됨)
    pub database_url: Option<String>,
    /// 연결 풀 최대 연결 수
    pub database_max_connections: u32,
    /// 차트 백엔드 설정
    pub chart: ChartApiConfig,
    /// 이력 조립 설정
    pub fetch: FetchConfig,
    /// 배치 스케줄 설정
    pub schedule: ScheduleConfig,
}

/// 이력 조립(HistoryFetcher) 설정
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// slide 요청 전 최소 대기 (밀리초)
    pub slide_delay_ms: u64,
    /// (심볼, 단위)당 최대 slide 요청 수
    pub max_slides: u32,
    /// 재시도 가능한 오류의 최대 재시도 횟수 (0이면 재시도 없음)
    pub max_retries: u32,
    /// 재시도 간 대기 (밀리초)
    pub retry_delay_ms: u64,
}

/// 배치 스케줄(FetchScheduler) 설정
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// 배치당 심볼 수
    pub batch_size: usize,
    /// 배치 사이 대기 (밀리초)
    pub batch_pause_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            slide_delay_ms: 1_000,
            max_slides: 100_000,
            max_retries: 0,
            retry_delay_ms: 1_000,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            batch_size: 4,
            batch_pause_ms: 1_000,
        }
    }
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let chart_defaults = ChartApiConfig::default();
        let fetch_defaults = FetchConfig::default();
        let schedule_defaults = ScheduleConfig::default();

        let base_url = std::env::var("CHART_BASE_URL").unwrap_or(chart_defaults.base_url);
        let chart = ChartApiConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            market_id: std::env::var("CHART_MARKET_ID").unwrap_or(chart_defaults.market_id),
            timeout: Duration::from_secs(env_var_parse(
                "CHART_TIMEOUT_SECS",
                chart_defaults.timeout.as_secs(),
            )),
            user_agent: std::env::var("CHART_USER_AGENT").unwrap_or(chart_defaults.user_agent),
        };

        let config = Self {
            database_url: std::env::var("DATABASE_URL").ok(),
            database_max_connections: env_var_parse("DATABASE_MAX_CONNECTIONS", 5),
            chart,
            fetch: FetchConfig {
                slide_delay_ms: env_var_parse(
                    "HARVEST_SLIDE_DELAY_MS",
                    fetch_defaults.slide_delay_ms,
                ),
                max_slides: env_var_parse("HARVEST_MAX_SLIDES", fetch_defaults.max_slides),
                max_retries: env_var_parse("HARVEST_MAX_RETRIES", fetch_defaults.max_retries),
                retry_delay_ms: env_var_parse(
                    "HARVEST_RETRY_DELAY_MS",
                    fetch_defaults.retry_delay_ms,
                ),
            },
            schedule: ScheduleConfig {
                batch_size: env_var_parse("HARVEST_BATCH_SIZE", schedule_defaults.batch_size),
                batch_pause_ms: env_var_parse(
                    "HARVEST_BATCH_PAUSE_MS",
                    schedule_defaults.batch_pause_ms,
                ),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// 설정 값 검증
    pub fn validate(&self) -> Result<()> {
        if self.schedule.batch_size == 0 {
            return Err(CollectorError::Config(
                "HARVEST_BATCH_SIZE는 1 이상이어야 합니다".to_string(),
            ));
        }
        if self.fetch.max_slides == 0 {
            return Err(CollectorError::Config(
                "HARVEST_MAX_SLIDES는 1 이상이어야 합니다".to_string(),
            ));
        }
        if self.database_max_connections == 0 {
            return Err(CollectorError::Config(
                "DATABASE_MAX_CONNECTIONS는 1 이상이어야 합니다".to_string(),
            ));
        }
        Ok(())
    }

    /// 데이터베이스 URL (없으면 에러)
    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url.as_deref().ok_or_else(|| {
            CollectorError::Config("DATABASE_URL 환경변수가 설정되지 않았습니다".to_string())
        })
    }
}

impl FetchConfig {
    /// slide 요청 전 대기를 Duration으로 반환
    pub fn slide_delay(&self) -> Duration {
        Duration::from_millis(self.slide_delay_ms)
    }

    /// 재시도 간 대기를 Duration으로 반환
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl ScheduleConfig {
    /// 배치 사이 대기를 Duration으로 반환
    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
