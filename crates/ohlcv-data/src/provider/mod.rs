//! 외부 데이터 제공자.

pub mod chart_api;
pub mod history;
pub mod symbol_directory;

pub use chart_api::{ChartApiClient, ChartApiConfig};
pub use history::{HistorySource, InitialWindow};
pub use symbol_directory::{parse_symbol_page, ChartPageDirectory, SymbolDirectory};
