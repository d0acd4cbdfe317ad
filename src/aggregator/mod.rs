/// Bounded per-stream sample buffers and derived statistics
pub mod data_aggregator;
pub mod stream_buffer;

pub use data_aggregator::{DataAggregator, DEFAULT_AVERAGE_WINDOW, DEFAULT_TREND_LOOKBACK};
pub use stream_buffer::StreamBuffer;
