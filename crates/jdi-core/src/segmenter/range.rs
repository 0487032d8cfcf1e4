//! Chunk ranges and the per-download chunk plan.

/// Floor on chunk length so a high thread count does not shred small files.
pub const DEFAULT_MIN_CHUNK_SIZE: u64 = 1024 * 1024;

/// A single chunk: byte range [start, end) (half-open).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    /// Start offset (inclusive).
    pub start: u64,
    /// End offset (exclusive).
    pub end: u64,
}

impl ChunkRange {
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inclusive `start-end` bounds, the form libcurl's `range` option takes.
    pub fn curl_range(&self) -> String {
        if self.start >= self.end {
            "0-0".to_string()
        } else {
            format!("{}-{}", self.start, self.end - 1)
        }
    }
}

/// Splits `[0, total_size)` into `count` ranges that are as equal as possible;
/// earlier ranges take the remainder bytes. Empty if either argument is 0.
pub fn plan_ranges(total_size: u64, count: usize) -> Vec<ChunkRange> {
    if total_size == 0 || count == 0 {
        return Vec::new();
    }

    let count = (count as u64).min(total_size);
    let base = total_size / count;
    let remainder = total_size % count;

    let mut out = Vec::with_capacity(count as usize);
    let mut offset = 0u64;
    for i in 0..count {
        let len = base + u64::from(i < remainder);
        let end = (offset + len).min(total_size);
        out.push(ChunkRange { start: offset, end });
        offset = end;
    }
    out
}

/// How one download is split across connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    pub total_size: u64,
    pub min_chunk_size: u64,
    pub ranges: Vec<ChunkRange>,
}

impl ChunkPlan {
    /// `chunk_count = ceil(total / max(min_chunk_size, ceil(total / thread_count)))`.
    /// A zero thread count or floor is treated as 1.
    pub fn new(total_size: u64, thread_count: usize, min_chunk_size: u64) -> Self {
        let threads = thread_count.max(1) as u64;
        let floor = min_chunk_size.max(1);
        let ranges = if total_size == 0 {
            Vec::new()
        } else {
            let chunk_len = floor.max(total_size.div_ceil(threads));
            let count = total_size.div_ceil(chunk_len);
            plan_ranges(total_size, count as usize)
        };
        Self {
            total_size,
            min_chunk_size: floor,
            ranges,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.ranges.len()
    }
}
