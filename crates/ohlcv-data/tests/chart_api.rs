//! Integration tests for the chart backend client against a mock HTTP server.

use mockito::Matcher;
use ohlcv_core::SymbolRef;
use ohlcv_data::{
    ChartApiClient, ChartApiConfig, ChartPageDirectory, DataError, HistorySource,
    SymbolDirectory,
};
use rust_decimal_macros::dec;

fn client_for(server: &mockito::ServerGuard) -> ChartApiClient {
    ChartApiClient::new(ChartApiConfig::with_base_url(server.url())).expect("client")
}

#[tokio::test]
async fn test_fetch_initial_window() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/data/period")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("symbol".into(), "bitfinexbtcusd".into()),
            Matcher::UrlEncoded("step".into(), "60".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"data":[[1546300800,3700,3710,3690,3705,12.5],[1546300860,3705,3712,3700,3711,8]],"count":2}"#,
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let window = client.fetch_initial("bitfinexbtcusd", 60).await.unwrap();

    mock.assert_async().await;
    assert_eq!(window.slice_count, 2);
    assert_eq!(window.candles.len(), 2);
    assert_eq!(window.candles[0].timestamp, 1_546_300_800);
    assert_eq!(window.candles[1].close, dec!(3711));
    assert_eq!(window.candles[0].volume_quote, dec!(12.5));
}

#[tokio::test]
async fn test_fetch_slide_posts_form() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/data/periodHistory")
        .match_header("x-requested-with", "XMLHttpRequest")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("symbol".into(), "okexethbtc".into()),
            Matcher::UrlEncoded("step".into(), "3600".into()),
            Matcher::UrlEncoded("times".into(), "3".into()),
            Matcher::UrlEncoded("count".into(), "1500".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[["1546290000","0.03","0.031","0.029","0.0305","77.1"]]"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let candles = client.fetch_slide("okexethbtc", 1500, 3600, 3).await.unwrap();

    mock.assert_async().await;
    assert_eq!(candles.len(), 1);
    assert_eq!(candles[0].timestamp, 1_546_290_000);
    assert_eq!(candles[0].high, dec!(0.031));
}

#[tokio::test]
async fn test_fetch_slide_empty_means_end_of_history() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/data/periodHistory")
        .with_status(200)
        .with_body(r#"{"data":[]}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let candles = client.fetch_slide("x", 10, 60, 1).await.unwrap();
    assert!(candles.is_empty());
}

#[tokio::test]
async fn test_non_200_is_transport_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/data/period")
        .match_query(Matcher::Any)
        .with_status(502)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client.fetch_initial("x", 60).await.unwrap_err();

    assert!(matches!(err, DataError::HttpStatus { status: 502, .. }));
    assert!(err.is_transport());
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_initial_without_count_is_malformed() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/data/period")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"data":[]}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client.fetch_initial("x", 60).await.unwrap_err();
    assert!(matches!(err, DataError::MalformedResponse(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_slide_with_invalid_json_is_malformed() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/data/periodHistory")
        .with_status(200)
        .with_body("<html>rate limited</html>")
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client.fetch_slide("x", 10, 60, 1).await.unwrap_err();
    assert!(matches!(err, DataError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_directory_lists_symbols_from_market_page() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/59D56005")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(
            r#"<html><body><script>
                window.COINS = [{"symbol":"bitfinexbtcusd","mid":"bitfinex","coin":"BTC"},
                                {"symbol":"binanceethusdt","mid":"binance","coin":"ETH"}];
            </script></body></html>"#,
        )
        .create_async()
        .await;

    let directory = ChartPageDirectory::new(client_for(&server));
    let symbols = directory.list_symbols().await.unwrap();

    assert_eq!(
        symbols,
        vec![
            SymbolRef::new("bitfinexbtcusd", "bitfinex", "btc_usd"),
            SymbolRef::new("binanceethusdt", "binance", "eth_usdt"),
        ]
    );
}
