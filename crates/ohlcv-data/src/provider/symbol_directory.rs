//! 심볼 목록 Provider.
//!
//! 차트 마켓 페이지에는 `window.COINS = [...]` 형태로 전체 심볼 목록이
//! 스크립트에 내장되어 있습니다. 각 원소는 평탄한 JSON 객체입니다:
//!
//! ```text
//! {"symbol":"bitfinexbtcusd","mid":"bitfinex","coin":"BTC", ...}
//! ```
//!
//! `symbol`은 API 요청 키, `mid`는 거래소, 거래쌍은 `symbol`에서
//! `{mid}{coin 소문자}` 뒤에 오는 호가 자산으로 만듭니다 (예: `btc_usd`).

use async_trait::async_trait;
use ohlcv_core::SymbolRef;
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::{info, warn};

use super::chart_api::ChartApiClient;
use crate::error::{DataError, Result};

const COINS_MARKER: &str = "window.COINS";

/// 심볼 목록 Provider trait.
#[async_trait]
pub trait SymbolDirectory: Send + Sync {
    /// Provider 이름.
    fn name(&self) -> &str;

    /// 수집 대상 심볼 전체 조회.
    async fn list_symbols(&self) -> Result<Vec<SymbolRef>>;
}

/// 차트 마켓 페이지 기반 심볼 Provider.
pub struct ChartPageDirectory {
    client: ChartApiClient,
}

impl ChartPageDirectory {
    pub fn new(client: ChartApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SymbolDirectory for ChartPageDirectory {
    fn name(&self) -> &str {
        "ChartPage"
    }

    async fn list_symbols(&self) -> Result<Vec<SymbolRef>> {
        let html = self.client.fetch_market_page().await?;
        let symbols = parse_symbol_page(&html)?;
        info!(
            page = %self.client.market_page_url(),
            count = symbols.len(),
            "심볼 목록 조회 완료"
        );
        Ok(symbols)
    }
}

#[derive(Debug, Deserialize)]
struct CoinEntry {
    symbol: String,
    mid: String,
    coin: String,
}

/// 마켓 페이지 HTML에서 심볼 목록을 추출합니다.
///
/// 파싱할 수 없는 개별 항목은 경고 후 건너뛰고, 목록 자체가 없으면 오류입니다.
pub fn parse_symbol_page(html: &str) -> Result<Vec<SymbolRef>> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("script")
        .map_err(|e| DataError::InvalidData(format!("selector: {:?}", e)))?;

    let script = document
        .select(&selector)
        .map(|el| el.text().collect::<String>())
        .find(|text| text.contains(COINS_MARKER));

    let source = match script {
        Some(text) => text,
        // 스크립트 태그 밖에 있는 경우 (비정상 마크업)
        None if html.contains(COINS_MARKER) => html.to_string(),
        None => {
            return Err(DataError::MalformedResponse(format!(
                "`{}` not found in market page",
                COINS_MARKER
            )))
        }
    };

    let block = coins_block(&source)?;
    let mut symbols = Vec::new();

    for segment in object_segments(block) {
        match serde_json::from_str::<CoinEntry>(segment) {
            Ok(entry) => match to_symbol_ref(entry) {
                Some(symbol) => symbols.push(symbol),
                None => warn!(entry = segment, "거래쌍을 만들 수 없는 항목"),
            },
            Err(e) => warn!(error = %e, entry = segment, "심볼 항목 파싱 실패"),
        }
    }

    Ok(symbols)
}

/// `window.COINS = [ ... ];`의 `[ ... ]` 부분.
fn coins_block(source: &str) -> Result<&str> {
    let malformed = || DataError::MalformedResponse(format!("unterminated `{}`", COINS_MARKER));

    let marker = source.find(COINS_MARKER).ok_or_else(malformed)?;
    let after = &source[marker..];
    let open = after.find('[').ok_or_else(malformed)?;
    let close = after[open..].find("];").ok_or_else(malformed)?;
    Ok(&after[open..open + close + 1])
}

/// 중첩 없는 `{...}` 구간들.
fn object_segments(block: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut rest = block;
    while let Some(start) = rest.find('{') {
        match rest[start..].find('}') {
            Some(len) => {
                segments.push(&rest[start..start + len + 1]);
                rest = &rest[start + len + 1..];
            }
            None => break,
        }
    }
    segments
}

fn to_symbol_ref(entry: CoinEntry) -> Option<SymbolRef> {
    if entry.symbol.is_empty() || entry.mid.is_empty() || entry.coin.is_empty() {
        return None;
    }
    let coin = entry.coin.to_lowercase();
    let prefix = format!("{}{}", entry.mid, coin);
    let quote = entry.symbol.rsplit(prefix.as_str()).next().unwrap_or_default();
    if quote.is_empty() {
        return None;
    }

    Some(SymbolRef {
        pair: format!("{}_{}", coin, quote),
        exchange: entry.mid,
        symbol_id: entry.symbol,
    })
}
