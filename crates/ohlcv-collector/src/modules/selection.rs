//! CLI 필터에 따른 수집 대상 선택.

use ohlcv_core::SymbolRef;

/// 쉼표로 구분된 목록을 파싱합니다. 빈 항목은 무시합니다.
pub fn parse_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

/// 심볼/거래소 필터를 적용합니다.
///
/// 필터가 비어 있으면 전체를 통과시킵니다. 심볼 필터는 `symbol_id` 또는
/// 거래쌍과 대소문자 구분 없이 비교합니다. 원래 순서는 유지됩니다.
pub fn select_symbols(
    symbols: Vec<SymbolRef>,
    symbol_filter: &[String],
    exchange_filter: &[String],
) -> Vec<SymbolRef> {
    symbols
        .into_iter()
        .filter(|s| {
            exchange_filter.is_empty()
                || exchange_filter
                    .iter()
                    .any(|ex| ex.eq_ignore_ascii_case(&s.exchange))
        })
        .filter(|s| {
            symbol_filter.is_empty()
                || symbol_filter.iter().any(|wanted| {
                    wanted.eq_ignore_ascii_case(&s.symbol_id)
                        || wanted.eq_ignore_ascii_case(&s.pair)
                })
        })
        .collect()
}
