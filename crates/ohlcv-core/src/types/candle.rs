//! 캔들(OHLCV) 레코드와 시계열 정규화.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Granularity;

/// 한 구간의 OHLCV 캔들.
///
/// 시계열 안에서의 키는 `timestamp`(unix 초)입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// 캔들 시작 시각 (unix 초)
    pub timestamp: i64,
    /// 시가
    pub open: Decimal,
    /// 고가
    pub high: Decimal,
    /// 저가
    pub low: Decimal,
    /// 종가
    pub close: Decimal,
    /// 거래대금 (호가 자산 단위)
    pub volume_quote: Decimal,
}

impl Candle {
    /// 새 캔들을 생성합니다.
    pub fn new(
        timestamp: i64,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume_quote: Decimal,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume_quote,
        }
    }

    /// 시작 시각을 UTC 시각으로 변환합니다. 표현 범위를 벗어나면 `None`.
    pub fn open_time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.timestamp, 0).single()
    }
}

/// 수신 순서의 캔들 시퀀스를 저장 가능한 시계열로 정규화합니다.
///
/// timestamp 오름차순으로 안정 정렬한 뒤 같은 timestamp는 먼저 수신된 것만 남깁니다.
/// 값이 다른 중복도 병합하지 않고 버립니다.
pub fn normalize_series(mut candles: Vec<Candle>) -> Vec<Candle> {
    candles.sort_by_key(|c| c.timestamp);
    candles.dedup_by_key(|c| c.timestamp);
    candles
}

/// 정규화된 시계열에서 step 간격이 맞지 않는 인접 구간 수를 셉니다.
///
/// 백엔드에 빠진 구간이 있는지 진단용으로만 사용합니다.
pub fn count_gaps(series: &[Candle], granularity: Granularity) -> usize {
    let step = granularity.step_secs() as i64;
    series
        .windows(2)
        .filter(|w| w[1].timestamp - w[0].timestamp != step)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn candle(ts: i64, close: Decimal) -> Candle {
        Candle::new(ts, close, close, close, close, dec!(1))
    }

    #[test]
    fn test_normalize_sorts_ascending() {
        let series = normalize_series(vec![
            candle(180, dec!(3)),
            candle(60, dec!(1)),
            candle(120, dec!(2)),
        ]);
        let ts: Vec<i64> = series.iter().map(|c| c.timestamp).collect();
        assert_eq!(ts, vec![60, 120, 180]);
    }

    #[test]
    fn test_normalize_first_received_wins() {
        let series = normalize_series(vec![
            candle(120, dec!(2)),
            candle(60, dec!(1)),
            candle(120, dec!(99)),
        ]);
        assert_eq!(series.len(), 2);
        assert_eq!(series[1].close, dec!(2));
    }

    #[test]
    fn test_count_gaps() {
        let series = vec![candle(0, dec!(1)), candle(60, dec!(1)), candle(240, dec!(1))];
        assert_eq!(count_gaps(&series, Granularity::M1), 1);
        assert_eq!(count_gaps(&series[..2], Granularity::M1), 0);
        assert_eq!(count_gaps(&[], Granularity::M1), 0);
    }

    #[test]
    fn test_open_time() {
        let c = candle(1_546_300_800, dec!(1));
        assert_eq!(
            c.open_time().unwrap().to_rfc3339(),
            "2019-01-01T00:00:00+00:00"
        );
    }

    proptest! {
        #[test]
        fn prop_normalized_is_strictly_ascending(
            ts in proptest::collection::vec(0i64..500, 0..200)
        ) {
            let input: Vec<Candle> = ts
                .iter()
                .enumerate()
                .map(|(i, t)| candle(*t, Decimal::from(i as i64)))
                .collect();
            let series = normalize_series(input.clone());

            for w in series.windows(2) {
                prop_assert!(w[0].timestamp < w[1].timestamp);
            }

            // 각 timestamp는 입력에서 처음 등장한 캔들이어야 함
            for c in &series {
                let first = input.iter().find(|x| x.timestamp == c.timestamp).unwrap();
                prop_assert_eq!(first, c);
            }

            let mut unique = ts.clone();
            unique.sort_unstable();
            unique.dedup();
            prop_assert_eq!(series.len(), unique.len());
        }
    }
}
