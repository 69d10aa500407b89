//! Worker abstraction for fork-join execution on a rayon thread pool.
//!
//! Every parallel stage of the detector splits a row range into contiguous chunks,
//! runs one closure per chunk and gets the chunk results back in range order. Passing
//! `None` instead of a [`Worker`] runs the whole range on the calling thread.

use std::ops::Range;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::Result;

/// A dedicated rayon thread pool.
///
/// # Examples
///
/// ```rust,no_run
/// use hough_lines::{HoughParams, LineDetector, Worker};
///
/// let worker = Worker::new(4).unwrap();
/// let image = image::open("input.png").unwrap().to_luma8();
/// let detector = LineDetector::new(HoughParams::default()).unwrap();
/// let detection = detector.detect_lines(&image, Some(&worker)).unwrap();
/// println!("{} lines", detection.infinite_lines.len());
/// ```
pub struct Worker {
    pool: ThreadPool,
}

impl Worker {
    /// Creates a pool with `threads` threads; `0` lets rayon pick the number of CPUs.
    pub fn new(threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new().num_threads(threads).build()?;
        debug!("worker created with {} threads", pool.current_num_threads());
        Ok(Self { pool })
    }

    /// Number of threads of the pool.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs `operation` inside the pool.
    pub fn install<R, F>(&self, operation: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        self.pool.install(operation)
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("threads", &self.threads())
            .finish()
    }
}

/// Splits `range` into at most `threads` contiguous chunks holding at least
/// `min_per_chunk` elements each (except when the range itself is shorter).
pub(crate) fn split_range(range: Range<u32>, threads: usize, min_per_chunk: u32) -> Vec<Range<u32>> {
    let len = range.end.saturating_sub(range.start);
    if len == 0 {
        return Vec::new();
    }

    let by_size = (len / min_per_chunk.max(1)).max(1);
    let chunks = (threads.max(1) as u32).min(by_size);

    let base = len / chunks;
    let remainder = len % chunks;

    let mut start = range.start;
    (0..chunks)
        .map(|index| {
            let size = base + u32::from(index < remainder);
            let chunk = start..start + size;
            start += size;
            chunk
        })
        .collect()
}

/// Runs `function` on contiguous sub-ranges of `range` and returns the results in
/// range order.
///
/// Without a worker `function` is called once with the whole range. An empty range
/// yields no results.
pub fn execute<R, F>(worker: Option<&Worker>, range: Range<u32>, min_per_chunk: u32, function: F) -> Vec<R>
where
    R: Send,
    F: Fn(Range<u32>) -> R + Sync,
{
    if range.is_empty() {
        return Vec::new();
    }

    match worker {
        Some(worker) if worker.threads() > 1 => {
            let chunks = split_range(range, worker.threads(), min_per_chunk);
            worker.install(|| chunks.into_par_iter().map(&function).collect())
        }
        _ => vec![function(range)],
    }
}

/// Calls `function(first_row, rows)` on disjoint blocks of whole rows of `data`.
///
/// `data.len()` must be a multiple of `row_length`. Blocks are processed in parallel
/// inside the worker's pool, or in one call without a worker.
pub fn for_each_row_block<T, F>(worker: Option<&Worker>, data: &mut [T], row_length: usize, min_rows: usize, function: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync,
{
    if data.is_empty() || row_length == 0 {
        return;
    }
    debug_assert_eq!(data.len() % row_length, 0);

    let rows = data.len() / row_length;

    match worker {
        Some(worker) if worker.threads() > 1 && rows > min_rows => {
            let rows_per_block = rows.div_ceil(worker.threads()).max(min_rows.max(1));
            worker.install(|| {
                data.par_chunks_mut(rows_per_block * row_length)
                    .enumerate()
                    .for_each(|(index, block)| function(index * rows_per_block, block));
            });
        }
        _ => function(0, data),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_blocks_see_their_offset() {
        let worker = Worker::new(4).unwrap();
        let mut data = vec![0u32; 10 * 7];
        for_each_row_block(Some(&worker), &mut data, 7, 1, |first_row, block| {
            for (index, row) in block.chunks_mut(7).enumerate() {
                row.fill((first_row + index) as u32);
            }
        });
        for (row, values) in data.chunks(7).enumerate() {
            assert!(values.iter().all(|&v| v == row as u32));
        }
    }

    #[test]
    fn split_covers_range_contiguously() {
        let chunks = split_range(3..103, 4, 10);
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].start, 3);
        assert_eq!(chunks[3].end, 103);
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        let total: u32 = chunks.iter().map(|c| c.end - c.start).sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn split_respects_minimal_chunk_size() {
        let chunks = split_range(0..15, 8, 10);
        assert_eq!(chunks, vec![0..15]);
        assert!(split_range(5..5, 4, 1).is_empty());
    }

    #[test]
    fn execute_keeps_range_order() {
        let worker = Worker::new(3).unwrap();
        let parts = execute(Some(&worker), 0..90, 1, |range| range.collect::<Vec<_>>());
        let flat: Vec<u32> = parts.into_iter().flatten().collect();
        assert_eq!(flat, (0..90).collect::<Vec<_>>());

        let single = execute(None, 0..90, 1, |range| range.len());
        assert_eq!(single, vec![90]);
    }
}
