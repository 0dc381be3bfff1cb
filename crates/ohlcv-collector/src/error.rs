//! 에러 타입 정의.

use std::fmt;

use ohlcv_data::DataError;

/// Collector 에러 타입.
///
/// 개별 (심볼, 단위) 수집 실패는 통계로만 집계되고 여기까지 올라오지 않습니다.
/// 실행 전체를 중단시키는 실패만 이 타입으로 전달됩니다.
#[derive(Debug)]
pub enum CollectorError {
    /// 저장소/데이터 소스 에러
    Data(DataError),
    /// 설정 에러
    Config(String),
}

impl fmt::Display for CollectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data(e) => write!(f, "Data error: {}", e),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for CollectorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Data(e) => Some(e),
            Self::Config(_) => None,
        }
    }
}

impl From<DataError> for CollectorError {
    fn from(err: DataError) -> Self {
        Self::Data(err)
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;
