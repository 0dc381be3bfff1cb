//! 캔들 수집 단위(granularity) 정의.
//!
//! 차트 백엔드가 제공하는 고정된 캔들 간격 목록입니다.
//! 각 단위는 이름과 초 단위 step 값을 가지며, step 값이 그대로 API 파라미터로 사용됩니다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 캔들 수집 단위.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Granularity {
    /// 1분봉
    #[serde(rename = "1m")]
    M1,
    /// 5분봉
    #[serde(rename = "5m")]
    M5,
    /// 15분봉
    #[serde(rename = "15m")]
    M15,
    /// 30분봉
    #[serde(rename = "30m")]
    M30,
    /// 1시간봉
    #[serde(rename = "1h")]
    H1,
    /// 4시간봉
    #[serde(rename = "4h")]
    H4,
    /// 12시간봉
    #[serde(rename = "12h")]
    H12,
    /// 일봉
    #[serde(rename = "1d", alias = "24h")]
    D1,
    /// 주봉
    #[serde(rename = "1w")]
    W1,
    /// 월봉 (30일 고정)
    #[serde(rename = "1M")]
    MN1,
}

impl Granularity {
    /// 수집 대상 전체 단위 (짧은 간격부터).
    pub const ALL: [Granularity; 10] = [
        Granularity::M1,
        Granularity::M5,
        Granularity::M15,
        Granularity::M30,
        Granularity::H1,
        Granularity::H4,
        Granularity::H12,
        Granularity::D1,
        Granularity::W1,
        Granularity::MN1,
    ];

    /// 초 단위 step 값을 반환합니다.
    pub const fn step_secs(&self) -> u64 {
        match self {
            Granularity::M1 => 60,
            Granularity::M5 => 300,
            Granularity::M15 => 900,
            Granularity::M30 => 1_800,
            Granularity::H1 => 3_600,
            Granularity::H4 => 14_400,
            Granularity::H12 => 43_200,
            Granularity::D1 => 86_400,
            Granularity::W1 => 604_800,
            Granularity::MN1 => 2_592_000,
        }
    }

    /// 단위 이름 (예: "1m", "1h", "1M").
    pub const fn name(&self) -> &'static str {
        match self {
            Granularity::M1 => "1m",
            Granularity::M5 => "5m",
            Granularity::M15 => "15m",
            Granularity::M30 => "30m",
            Granularity::H1 => "1h",
            Granularity::H4 => "4h",
            Granularity::H12 => "12h",
            Granularity::D1 => "1d",
            Granularity::W1 => "1w",
            Granularity::MN1 => "1M",
        }
    }

    /// 이름에서 파싱합니다. 월봉 "1M"과 분봉 "1m"을 구분하므로 대소문자를 유지합니다.
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "1m" => Some(Granularity::M1),
            "5m" => Some(Granularity::M5),
            "15m" => Some(Granularity::M15),
            "30m" => Some(Granularity::M30),
            "1h" => Some(Granularity::H1),
            "4h" => Some(Granularity::H4),
            "12h" => Some(Granularity::H12),
            "1d" | "24h" => Some(Granularity::D1),
            "1w" => Some(Granularity::W1),
            "1M" => Some(Granularity::MN1),
            _ => None,
        }
    }

    /// 쉼표로 구분된 목록을 파싱합니다 (예: "1m,1h,1d").
    pub fn parse_list(s: &str) -> Result<Vec<Self>, String> {
        let mut list = Vec::new();
        for name in s.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let granularity = name.parse::<Granularity>()?;
            if !list.contains(&granularity) {
                list.push(granularity);
            }
        }
        if list.is_empty() {
            return Err(format!("Empty granularity list: {:?}", s));
        }
        Ok(list)
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("Invalid granularity: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_table() {
        assert_eq!(Granularity::M1.step_secs(), 60);
        assert_eq!(Granularity::H1.step_secs(), 3600);
        assert_eq!(Granularity::D1.step_secs(), 86400);
        assert_eq!(Granularity::MN1.step_secs(), 2_592_000);
        assert_eq!(Granularity::ALL.len(), 10);
    }

    #[test]
    fn test_all_is_ascending() {
        for pair in Granularity::ALL.windows(2) {
            assert!(pair[0].step_secs() < pair[1].step_secs());
        }
    }

    #[test]
    fn test_name_round_trip_and_case() {
        assert_eq!("1m".parse::<Granularity>().unwrap(), Granularity::M1);
        assert_eq!("1M".parse::<Granularity>().unwrap(), Granularity::MN1);
        assert_eq!("24h".parse::<Granularity>().unwrap(), Granularity::D1);
        assert_eq!(Granularity::D1.to_string(), "1d");
        assert!("2h".parse::<Granularity>().is_err());
    }

    #[test]
    fn test_parse_list() {
        let list = Granularity::parse_list("5m, 1h,1d,1h").unwrap();
        assert_eq!(list, vec![Granularity::M5, Granularity::H1, Granularity::D1]);
        assert!(Granularity::parse_list(" , ").is_err());
        assert!(Granularity::parse_list("1m,3m").is_err());
    }
}
