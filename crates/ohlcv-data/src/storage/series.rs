//! (거래소, 거래쌍)별 캔들 시계열 테이블 저장소.
//!
//! # 테이블 구조
//!
//! 테이블 이름은 `t_{exchange}_{pair}`이며 처음 쓰기 전에 생성됩니다.
//!
//! ```sql
//! CREATE TABLE t_bitfinex_btc_usd (
//!     id           BIGSERIAL PRIMARY KEY,
//!     ts           TIMESTAMPTZ NOT NULL,   -- 고유 인덱스
//!     open         NUMERIC NOT NULL,
//!     high         NUMERIC NOT NULL,
//!     low          NUMERIC NOT NULL,
//!     close        NUMERIC NOT NULL,
//!     volume_quote NUMERIC NOT NULL,
//!     created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```
//!
//! 쓰기는 `ON CONFLICT (ts) DO NOTHING`이므로 같은 시계열을 여러 번 저장해도
//! 결과가 같고, 이미 있는 timestamp는 먼저 저장된 값이 유지됩니다.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ohlcv_core::{series_table_name, Candle};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info, instrument, warn};

use crate::error::{DataError, Result};

/// UNNEST 한 번에 넣는 최대 행 수
const UPSERT_CHUNK_SIZE: usize = 500;

/// 캔들 시계열 저장소 trait.
///
/// 모든 메서드는 여러 태스크에서 동시에 호출될 수 있습니다.
#[async_trait]
pub trait SeriesStore: Send + Sync {
    /// 테이블이 없으면 생성합니다. 동시에 호출해도 "이미 존재" 오류를 내지 않습니다.
    async fn ensure_table(&self, exchange: &str, pair: &str) -> Result<()>;

    /// 캔들을 저장하고 새로 삽입된 행 수를 반환합니다.
    ///
    /// 이미 존재하는 timestamp는 덮어쓰지 않고 건너뜁니다.
    async fn upsert_candles(&self, exchange: &str, pair: &str, candles: &[Candle])
        -> Result<usize>;

    /// 저장 세션을 정리하고 닫습니다.
    async fn close(&self) -> Result<()>;
}

/// PostgreSQL 시계열 저장소.
pub struct PgSeriesStore {
    pool: PgPool,
    /// 이번 프로세스에서 이미 생성 확인한 테이블
    ensured: Mutex<HashSet<String>>,
}

impl PgSeriesStore {
    /// 기존 연결 풀로 생성.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            ensured: Mutex::new(HashSet::new()),
        }
    }

    /// 데이터베이스에 연결.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        info!(max_connections, "데이터베이스 연결 성공");
        Ok(Self::new(pool))
    }

    fn is_ensured(&self, table: &str) -> bool {
        self.ensured
            .lock()
            .map(|set| set.contains(table))
            .unwrap_or(false)
    }

    fn mark_ensured(&self, table: String) {
        if let Ok(mut set) = self.ensured.lock() {
            set.insert(table);
        }
    }

    async fn execute_ddl(&self, sql: &str) -> Result<()> {
        match sqlx::query(sql).execute(&self.pool).await {
            Ok(_) => Ok(()),
            Err(e) => match DataError::from(e) {
                // 동시 생성 경쟁: 다른 태스크가 먼저 만들었음
                DataError::DuplicateError(msg) => {
                    debug!(error = %msg, "이미 존재하는 객체");
                    Ok(())
                }
                other => Err(other),
            },
        }
    }
}

#[async_trait]
impl SeriesStore for PgSeriesStore {
    #[instrument(skip(self))]
    async fn ensure_table(&self, exchange: &str, pair: &str) -> Result<()> {
        let table = series_table_name(exchange, pair);
        if self.is_ensured(&table) {
            return Ok(());
        }

        let create_table = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id BIGSERIAL PRIMARY KEY,
                ts TIMESTAMPTZ NOT NULL,
                open NUMERIC NOT NULL,
                high NUMERIC NOT NULL,
                low NUMERIC NOT NULL,
                close NUMERIC NOT NULL,
                volume_quote NUMERIC NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#
        );
        self.execute_ddl(&create_table).await?;

        let create_index =
            format!("CREATE UNIQUE INDEX IF NOT EXISTS {table}_ts ON {table} (ts)");
        self.execute_ddl(&create_index).await?;

        debug!(table = %table, "테이블 확인 완료");
        self.mark_ensured(table);
        Ok(())
    }

    #[instrument(skip(self, candles), fields(count = candles.len()))]
    async fn upsert_candles(
        &self,
        exchange: &str,
        pair: &str,
        candles: &[Candle],
    ) -> Result<usize> {
        if candles.is_empty() {
            return Ok(0);
        }

        self.ensure_table(exchange, pair).await?;
        let table = series_table_name(exchange, pair);
        let mut inserted = 0;

        // UNNEST 패턴으로 일괄 삽입 (청크 하나가 한 문장 = 한 트랜잭션)
        for chunk in candles.chunks(UPSERT_CHUNK_SIZE) {
            let mut timestamps: Vec<DateTime<Utc>> = Vec::with_capacity(chunk.len());
            for candle in chunk {
                let ts = candle.open_time().ok_or_else(|| {
                    DataError::InvalidData(format!("timestamp out of range: {}", candle.timestamp))
                })?;
                timestamps.push(ts);
            }
            let opens: Vec<Decimal> = chunk.iter().map(|c| c.open).collect();
            let highs: Vec<Decimal> = chunk.iter().map(|c| c.high).collect();
            let lows: Vec<Decimal> = chunk.iter().map(|c| c.low).collect();
            let closes: Vec<Decimal> = chunk.iter().map(|c| c.close).collect();
            let volumes: Vec<Decimal> = chunk.iter().map(|c| c.volume_quote).collect();

            let sql = format!(
                r#"
                INSERT INTO {table} (ts, open, high, low, close, volume_quote)
                SELECT * FROM UNNEST(
                    $1::timestamptz[], $2::numeric[], $3::numeric[],
                    $4::numeric[], $5::numeric[], $6::numeric[]
                )
                ON CONFLICT (ts) DO NOTHING
                "#
            );

            let result = sqlx::query(&sql)
                .bind(&timestamps)
                .bind(&opens)
                .bind(&highs)
                .bind(&lows)
                .bind(&closes)
                .bind(&volumes)
                .execute(&self.pool)
                .await
                .map_err(|e| DataError::InsertError(e.to_string()))?;

            inserted += result.rows_affected() as usize;
        }

        debug!(
            table = %table,
            received = candles.len(),
            inserted,
            "캔들 저장"
        );

        Ok(inserted)
    }

    async fn close(&self) -> Result<()> {
        if self.pool.is_closed() {
            warn!("이미 닫힌 연결 풀");
            return Ok(());
        }
        // 각 문장은 autocommit이므로 풀 종료 전 대기 중인 커밋이 없음
        self.pool.close().await;
        info!("데이터베이스 연결 종료");
        Ok(())
    }
}
