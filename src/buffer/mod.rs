//! Fixed-capacity sample windows
//!
//! This module provides the storage every histogram engine is built on: a
//! multi-axis FIFO window that keeps only the most recent `capacity` samples,
//! and a weighted variant that carries one weight per sample.
//!
//! # Example
//!
//! ```
//! use rapidhist::buffer::SlidingSampleBuffer;
//!
//! let mut window = SlidingSampleBuffer::new(5, 1);
//!
//! // Push far more than fits: only the newest five survive
//! let values: Vec<f64> = (0..30).map(|i| (i % 3) as f64).collect();
//! window.push(&[values]).unwrap();
//!
//! assert_eq!(window.current_length(), 5);
//! assert_eq!(window.snapshot(), vec![vec![1.0, 2.0, 0.0, 1.0, 2.0]]);
//! ```

mod weighted;
mod window;

pub use weighted::WeightedBuffer;
pub use window::SlidingSampleBuffer;

use std::collections::VecDeque;

/// Append `values` to `axis`, evicting from the front past `capacity`
///
/// Returns the number of evicted samples.
pub(crate) fn extend_window(axis: &mut VecDeque<f64>, values: &[f64], capacity: usize) -> usize {
    // Anything older than the last `capacity` values would be evicted by this
    // same call, so never copy it in.
    let skipped = values.len().saturating_sub(capacity);
    let tail = &values[skipped..];
    let overflow = (axis.len() + tail.len()).saturating_sub(capacity);
    axis.drain(..overflow);
    axis.extend(tail.iter().copied());
    overflow + skipped
}
