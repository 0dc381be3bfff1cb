//! 데이터 모듈 오류 타입.

use thiserror::Error;

/// 데이터 수집/저장 관련 오류.
#[derive(Debug, Error)]
pub enum DataError {
    /// 네트워크/연결 오류
    #[error("Network error: {0}")]
    Network(String),

    /// 요청 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 200이 아닌 HTTP 응답
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// 예상과 다른 응답 형식
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// 쿼리 실행 오류
    #[error("Query error: {0}")]
    QueryError(String),

    /// 데이터 삽입 오류
    #[error("Insert error: {0}")]
    InsertError(String),

    /// 중복 레코드/객체 (고유 제약 위반)
    #[error("Duplicate record: {0}")]
    DuplicateError(String),

    /// 연결 풀 소진
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// 잘못된 데이터
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// 설정 오류
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DataError {
    /// 재시도 가능한 오류인지 확인.
    ///
    /// 429와 5xx는 백엔드 일시 장애로 보고 재시도 대상에 포함합니다.
    pub fn is_retryable(&self) -> bool {
        match self {
            DataError::Network(_) | DataError::Timeout(_) | DataError::PoolExhausted => true,
            DataError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// 전송 계층 오류인지 확인 (네트워크, 타임아웃, HTTP 상태).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            DataError::Network(_) | DataError::Timeout(_) | DataError::HttpStatus { .. }
        )
    }
}

impl From<reqwest::Error> for DataError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DataError::Timeout(err.to_string())
        } else if err.is_decode() {
            DataError::MalformedResponse(err.to_string())
        } else if let Some(status) = err.status() {
            DataError::HttpStatus {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            DataError::Network(err.to_string())
        }
    }
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => DataError::PoolExhausted,
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().unwrap_or_default();
                // 23505: unique_violation, 42P07: duplicate_table
                if code == "23505" || code == "42P07" {
                    DataError::DuplicateError(db_err.message().to_string())
                } else {
                    DataError::QueryError(db_err.message().to_string())
                }
            }
            _ => DataError::QueryError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::MalformedResponse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
