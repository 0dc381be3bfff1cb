//! 심볼 참조 정의.
//!
//! 차트 백엔드가 노출하는 거래 상품 하나와, 그 캔들이 저장될
//! (거래소, 거래쌍) 테이블을 함께 식별합니다.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 수집 대상 심볼.
///
/// 예: `bitfinexbtcusd` → 거래소 `bitfinex`, 거래쌍 `btc_usd`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolRef {
    /// 백엔드 심볼 ID (API 요청 키)
    pub symbol_id: String,
    /// 거래소 식별자
    pub exchange: String,
    /// 거래쌍 (예: btc_usd)
    pub pair: String,
}

impl SymbolRef {
    /// 새 심볼 참조를 생성합니다.
    pub fn new(
        symbol_id: impl Into<String>,
        exchange: impl Into<String>,
        pair: impl Into<String>,
    ) -> Self {
        Self {
            symbol_id: symbol_id.into(),
            exchange: exchange.into(),
            pair: pair.into(),
        }
    }

    /// 저장 테이블 이름을 반환합니다.
    pub fn table_name(&self) -> String {
        series_table_name(&self.exchange, &self.pair)
    }
}

impl fmt::Display for SymbolRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.symbol_id, self.exchange, self.pair)
    }
}

/// PostgreSQL 식별자 최대 길이 (바이트). 넘으면 서버가 잘라냅니다.
const MAX_TABLE_NAME_LEN: usize = 63;

/// (거래소, 거래쌍)에서 결정적으로 테이블 이름을 만듭니다.
///
/// 소문자로 변환하고 `[a-z0-9_]` 이외의 문자는 `_`로 치환하므로
/// 결과는 따옴표 없이도 안전한 SQL 식별자입니다.
///
/// 치환은 손실이 있어 `eth-usdt`와 `eth_usdt`가 같은 테이블이 됩니다.
/// 치환이 일어나거나 길이 제한을 넘으면 경고를 남깁니다.
pub fn series_table_name(exchange: &str, pair: &str) -> String {
    let (name, replaced) = sanitize_identifier(&format!("t_{}_{}", exchange, pair));
    if replaced {
        tracing::warn!(
            exchange,
            pair,
            table = %name,
            "테이블 이름 문자 치환 (다른 거래쌍과 충돌 가능)"
        );
    }
    if name.len() > MAX_TABLE_NAME_LEN {
        tracing::warn!(
            table = %name,
            max_len = MAX_TABLE_NAME_LEN,
            "테이블 이름이 식별자 길이 제한을 넘음"
        );
    }
    name
}

/// 소문자 변환 후 `[a-z0-9_]` 이외의 문자를 `_`로 바꿉니다. 치환 여부를 함께 반환합니다.
fn sanitize_identifier(raw: &str) -> (String, bool) {
    let mut replaced = false;
    let name = raw
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                replaced = true;
                '_'
            }
        })
        .collect();
    (name, replaced)
}
