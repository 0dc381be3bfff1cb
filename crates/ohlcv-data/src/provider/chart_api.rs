//! 차트 백엔드 HTTP 클라이언트.
//!
//! # 엔드포인트
//!
//! - `GET  {base}/{market_id}`: 심볼 목록이 내장된 차트 페이지 (HTML)
//! - `GET  {base}/api/data/period?symbol=&step=`: 최근 구간 + count
//! - `POST {base}/api/data/periodHistory` (form: symbol, step, times, count): 과거 구간
//!
//! 캔들 행은 `[ts, open, high, low, close, volume, ...]` 형식이며 값은 숫자 또는
//! 숫자 문자열입니다. 앞의 6개 필드만 사용합니다.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use ohlcv_core::Candle;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, instrument};

use super::history::{HistorySource, InitialWindow};
use crate::error::{DataError, Result};

/// 브라우저 요청으로 보이도록 사용하는 기본 User-Agent
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_14_0) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/69.0.3497.100 Safari/537.36";

/// 차트 백엔드 클라이언트 설정.
#[derive(Debug, Clone)]
pub struct ChartApiConfig {
    /// 차트 사이트 기본 URL (끝의 `/` 없이)
    pub base_url: String,
    /// 심볼 목록을 읽을 마켓 페이지 ID
    pub market_id: String,
    /// 요청 타임아웃
    pub timeout: Duration,
    /// User-Agent 헤더
    pub user_agent: String,
}

impl Default for ChartApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.aicoin.net.cn/chart".to_string(),
            market_id: "59D56005".to_string(),
            timeout: Duration::from_secs(6),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ChartApiConfig {
    /// 기본 URL을 지정하여 설정 생성.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }
}

/// 차트 백엔드 클라이언트.
///
/// 내부 `reqwest::Client`가 연결 풀을 공유하므로 clone 비용이 작습니다.
#[derive(Debug, Clone)]
pub struct ChartApiClient {
    client: reqwest::Client,
    config: ChartApiConfig,
}

impl ChartApiClient {
    /// 새 클라이언트 생성.
    pub fn new(config: ChartApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
        );

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| DataError::ConfigError(format!("HTTP client build failed: {}", e)))?;

        Ok(Self { client, config })
    }

    /// 심볼 목록이 포함된 마켓 페이지 URL.
    pub fn market_page_url(&self) -> String {
        format!("{}/{}", self.config.base_url, self.config.market_id)
    }

    fn period_url(&self) -> String {
        format!("{}/api/data/period", self.config.base_url)
    }

    fn history_url(&self) -> String {
        format!("{}/api/data/periodHistory", self.config.base_url)
    }

    /// 마켓 페이지 HTML 조회.
    pub async fn fetch_market_page(&self) -> Result<String> {
        let url = self.market_page_url();
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "text/html,application/xhtml+xml")
            .send()
            .await?;
        let response = ensure_success(response, &url)?;
        Ok(response.text().await?)
    }

    async fn read_json(response: reqwest::Response, url: &str) -> Result<Value> {
        let response = ensure_success(response, url)?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl HistorySource for ChartApiClient {
    #[instrument(skip(self), level = "debug")]
    async fn fetch_initial(&self, symbol_id: &str, step: u64) -> Result<InitialWindow> {
        let url = self.period_url();
        let response = self
            .client
            .get(&url)
            .header(REFERER, self.market_page_url())
            .query(&[("symbol", symbol_id.to_string()), ("step", step.to_string())])
            .send()
            .await?;
        let body = Self::read_json(response, &url).await?;

        let data = body
            .get("data")
            .ok_or_else(|| DataError::MalformedResponse("initial window without `data`".into()))?;
        let candles = parse_rows(data)?;

        let slice_count = body
            .get("count")
            .and_then(value_to_i64)
            .ok_or_else(|| DataError::MalformedResponse("initial window without `count`".into()))?;

        debug!(
            symbol = symbol_id,
            step,
            candles = candles.len(),
            slice_count,
            "최근 구간 조회"
        );

        Ok(InitialWindow {
            candles,
            slice_count,
        })
    }

    #[instrument(skip(self), level = "debug")]
    async fn fetch_slide(
        &self,
        symbol_id: &str,
        slice_count: i64,
        step: u64,
        iteration: u32,
    ) -> Result<Vec<Candle>> {
        let url = self.history_url();
        let form = [
            ("symbol", symbol_id.to_string()),
            ("step", step.to_string()),
            ("times", iteration.to_string()),
            ("count", slice_count.to_string()),
        ];
        let response = self
            .client
            .post(&url)
            .header(REFERER, self.market_page_url())
            .header(ORIGIN, origin_of(&self.config.base_url))
            .header("x-requested-with", "XMLHttpRequest")
            .form(&form)
            .send()
            .await?;
        let body = Self::read_json(response, &url).await?;

        // 응답은 행 배열 그 자체이거나 `data` 필드를 가진 객체
        let candles = match &body {
            Value::Array(_) => parse_rows(&body)?,
            Value::Object(map) => match map.get("data") {
                Some(data) => parse_rows(data)?,
                None => {
                    return Err(DataError::MalformedResponse(
                        "slide response without `data`".into(),
                    ))
                }
            },
            other => {
                return Err(DataError::MalformedResponse(format!(
                    "unexpected slide response: {}",
                    truncate(&other.to_string(), 120)
                )))
            }
        };

        debug!(
            symbol = symbol_id,
            step,
            iteration,
            candles = candles.len(),
            "과거 구간 조회"
        );

        Ok(candles)
    }
}

fn ensure_success(response: reqwest::Response, url: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(DataError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        })
    }
}

/// `https://host/path` → `https://host`
fn origin_of(base_url: &str) -> String {
    match base_url.find("://") {
        Some(idx) => {
            let rest = &base_url[idx + 3..];
            let host_end = rest.find('/').unwrap_or(rest.len());
            base_url[..idx + 3 + host_end].to_string()
        }
        None => base_url.to_string(),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// `data` 값을 캔들 목록으로 변환합니다. `null`은 빈 목록입니다.
pub fn parse_rows(data: &Value) -> Result<Vec<Candle>> {
    match data {
        Value::Null => Ok(Vec::new()),
        Value::Array(rows) => rows.iter().map(parse_row).collect(),
        other => Err(DataError::MalformedResponse(format!(
            "`data` is not an array: {}",
            truncate(&other.to_string(), 120)
        ))),
    }
}

fn parse_row(row: &Value) -> Result<Candle> {
    let fields = row
        .as_array()
        .ok_or_else(|| DataError::MalformedResponse(format!("row is not an array: {}", row)))?;
    if fields.len() < 6 {
        return Err(DataError::MalformedResponse(format!(
            "row has {} fields, expected at least 6",
            fields.len()
        )));
    }

    let timestamp = value_to_i64(&fields[0])
        .ok_or_else(|| DataError::MalformedResponse(format!("bad timestamp: {}", fields[0])))?;
    let decimal = |idx: usize| {
        value_to_decimal(&fields[idx])
            .ok_or_else(|| DataError::MalformedResponse(format!("bad number: {}", fields[idx])))
    };

    Ok(Candle::new(
        timestamp,
        decimal(1)?,
        decimal(2)?,
        decimal(3)?,
        decimal(4)?,
        decimal(5)?,
    ))
}

fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .ok()
            .or_else(|| s.trim().parse::<f64>().ok().map(|f| f as i64)),
        _ => None,
    }
}

fn value_to_decimal(value: &Value) -> Option<Decimal> {
    let raw = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .ok()
}
