//! 시계열 저장소.

pub mod memory;
pub mod series;

pub use memory::MemorySeriesStore;
pub use series::{PgSeriesStore, SeriesStore};
