//! Range math for chunked downloads.
//!
//! Splits a known-length resource into contiguous byte ranges (`ChunkPlan`)
//! and tracks the bytes received across all chunk tasks (`ByteCounter`).

mod counter;
mod range;

pub use counter::ByteCounter;
pub use range::{plan_ranges, ChunkPlan, ChunkRange, DEFAULT_MIN_CHUNK_SIZE};
