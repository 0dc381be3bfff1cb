//! 메모리 기반 시계열 저장소.
//!
//! `--dry-run` 실행과 테스트에서 PostgreSQL 대신 사용합니다.
//! 충돌 규칙은 `PgSeriesStore`와 같습니다 (먼저 저장된 timestamp 유지).

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use ohlcv_core::{series_table_name, Candle};

use super::series::SeriesStore;
use crate::error::{DataError, Result};

/// 메모리 시계열 저장소.
#[derive(Debug, Default)]
pub struct MemorySeriesStore {
    tables: Mutex<HashMap<String, BTreeMap<i64, Candle>>>,
    upsert_calls: AtomicUsize,
    close_calls: AtomicUsize,
    closed: AtomicBool,
}

impl MemorySeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 테이블의 전체 행 (timestamp 오름차순).
    pub fn rows(&self, exchange: &str, pair: &str) -> Vec<Candle> {
        let table = series_table_name(exchange, pair);
        self.tables
            .lock()
            .map(|tables| {
                tables
                    .get(&table)
                    .map(|rows| rows.values().cloned().collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    /// 생성된 테이블 이름 (정렬됨).
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tables
            .lock()
            .map(|tables| tables.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// 전체 행 수.
    pub fn total_rows(&self) -> usize {
        self.tables
            .lock()
            .map(|tables| tables.values().map(BTreeMap::len).sum())
            .unwrap_or(0)
    }

    /// `upsert_candles` 호출 횟수.
    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    /// `close` 호출 횟수.
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(DataError::ConfigError("store is closed".to_string()))
        } else {
            Ok(())
        }
    }

    fn poisoned() -> DataError {
        DataError::QueryError("memory store lock poisoned".to_string())
    }
}

#[async_trait]
impl SeriesStore for MemorySeriesStore {
    async fn ensure_table(&self, exchange: &str, pair: &str) -> Result<()> {
        self.check_open()?;
        let table = series_table_name(exchange, pair);
        let mut tables = self.tables.lock().map_err(|_| Self::poisoned())?;
        tables.entry(table).or_default();
        Ok(())
    }

    async fn upsert_candles(
        &self,
        exchange: &str,
        pair: &str,
        candles: &[Candle],
    ) -> Result<usize> {
        self.check_open()?;
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);

        let table = series_table_name(exchange, pair);
        let mut tables = self.tables.lock().map_err(|_| Self::poisoned())?;
        let rows = tables.entry(table).or_default();

        let mut inserted = 0;
        for candle in candles {
            if let std::collections::btree_map::Entry::Vacant(slot) = rows.entry(candle.timestamp)
            {
                slot.insert(candle.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
