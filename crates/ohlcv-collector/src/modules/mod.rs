//! 수집 모듈.

pub mod history_fetch;
pub mod scheduler;
pub mod selection;

pub use history_fetch::{
    FetchOptions, FetchOutcome, FetchedSeries, HistoryFetcher, RetryPolicy,
};
pub use scheduler::{FetchScheduler, ScheduleOptions};
pub use selection::{parse_csv, select_symbols};
