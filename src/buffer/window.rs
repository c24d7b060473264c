//! Multi-axis sliding window of samples
//!
//! Every axis is a bounded FIFO of the same capacity. Pushes are validated
//! as a whole before any axis is touched, so the same index on every axis
//! always refers to values that arrived in the same push.

use std::collections::VecDeque;

use super::extend_window;
use crate::traits::{HistError, Result, SampleSink};

/// Fixed-capacity, multi-axis FIFO window
///
/// # Example
///
/// ```
/// use rapidhist::buffer::SlidingSampleBuffer;
///
/// let mut window = SlidingSampleBuffer::new(3, 2);
///
/// window.push(&[[0.0, 1.0], [10.0, 11.0]]).unwrap();
/// window.push_point(&[2.0, 12.0]).unwrap();
/// window.push_point(&[3.0, 13.0]).unwrap();
///
/// // The oldest pair was evicted from both axes together
/// assert_eq!(window.snapshot(), vec![vec![1.0, 2.0, 3.0], vec![11.0, 12.0, 13.0]]);
/// ```
#[derive(Clone, Debug)]
pub struct SlidingSampleBuffer {
    /// Maximum samples retained per axis
    capacity: usize,
    /// Histogram and fit operations fail below this length
    minimum_required: Option<usize>,
    /// One FIFO per axis, oldest first
    axes: Vec<VecDeque<f64>>,
    /// Samples accepted over the buffer's lifetime
    items_seen: u64,
}

impl SlidingSampleBuffer {
    /// Create a window holding at most `capacity` samples on each of `axis_count` axes
    ///
    /// # Panics
    ///
    /// Panics if `capacity` or `axis_count` is zero.
    pub fn new(capacity: usize, axis_count: usize) -> Self {
        assert!(capacity > 0, "capacity must be positive");
        assert!(axis_count > 0, "a buffer needs at least one axis");

        Self {
            capacity,
            minimum_required: None,
            axes: (0..axis_count)
                .map(|_| VecDeque::with_capacity(capacity))
                .collect(),
            items_seen: 0,
        }
    }

    /// Require at least `minimum` samples before histograms can be computed
    pub fn with_minimum(mut self, minimum: Option<usize>) -> Self {
        self.minimum_required = minimum;
        self
    }

    /// Append one batch of values per axis
    ///
    /// All axes must receive the same number of values. On error nothing is
    /// appended.
    pub fn push<S: AsRef<[f64]>>(&mut self, data: &[S]) -> Result<()> {
        let axes: Vec<&[f64]> = data.iter().map(AsRef::as_ref).collect();
        let len = self.validate(&axes)?;
        self.append(&axes, len);
        Ok(())
    }

    /// Append a single sample given as one scalar per axis
    pub fn push_point(&mut self, point: &[f64]) -> Result<()> {
        if point.len() != self.axes.len() {
            return Err(HistError::AxisCountMismatch {
                expected: self.axes.len(),
                found: point.len(),
            });
        }
        for (axis, &value) in self.axes.iter_mut().zip(point) {
            extend_window(axis, &[value], self.capacity);
        }
        self.items_seen += 1;
        Ok(())
    }

    /// Check a push against the buffer shape and return its common length
    pub(crate) fn validate(&self, data: &[&[f64]]) -> Result<usize> {
        if data.len() != self.axes.len() {
            return Err(HistError::AxisCountMismatch {
                expected: self.axes.len(),
                found: data.len(),
            });
        }
        let expected = data[0].len();
        for (axis, values) in data.iter().enumerate().skip(1) {
            if values.len() != expected {
                return Err(HistError::RaggedAxes {
                    axis,
                    expected,
                    found: values.len(),
                });
            }
        }
        Ok(expected)
    }

    /// Append an already validated push
    pub(crate) fn append(&mut self, data: &[&[f64]], len: usize) {
        if len == 0 {
            return;
        }
        let mut evicted = 0;
        for (axis, values) in self.axes.iter_mut().zip(data) {
            evicted = extend_window(axis, values, self.capacity);
        }
        self.items_seen += len as u64;
        tracing::trace!(pushed = len, evicted, held = self.current_length(), "window push");
    }

    /// Fail with [`HistError::InsufficientData`] when any axis is below the minimum
    pub fn ensure_minimum(&self) -> Result<()> {
        if let Some(required) = self.minimum_required {
            for axis in &self.axes {
                if axis.len() < required {
                    return Err(HistError::InsufficientData {
                        required,
                        found: axis.len(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Number of samples held; identical on every axis
    pub fn current_length(&self) -> usize {
        self.axes[0].len()
    }

    /// Get the window capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the number of axes
    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }

    /// Get the minimum length needed for histogramming
    pub fn minimum_required(&self) -> Option<usize> {
        self.minimum_required
    }

    /// Samples accepted over the buffer's lifetime, evicted ones included
    pub fn items_seen(&self) -> u64 {
        self.items_seen
    }

    /// Check if the window holds no samples
    pub fn is_empty(&self) -> bool {
        self.current_length() == 0
    }

    /// Check if the next push will evict
    pub fn is_full(&self) -> bool {
        self.current_length() >= self.capacity
    }

    /// Iterate over one axis, oldest first
    pub fn axis(&self, index: usize) -> Option<impl ExactSizeIterator<Item = f64> + '_> {
        self.axes.get(index).map(|axis| axis.iter().copied())
    }

    /// Copy of every axis, oldest first
    pub fn snapshot(&self) -> Vec<Vec<f64>> {
        self.axes
            .iter()
            .map(|axis| axis.iter().copied().collect())
            .collect()
    }

    pub(crate) fn axes(&self) -> &[VecDeque<f64>] {
        &self.axes
    }
}

impl SampleSink for SlidingSampleBuffer {
    fn push_batch(&mut self, data: &[&[f64]], weights: &[&[f64]]) -> Result<()> {
        if !weights.is_empty() {
            return Err(HistError::WeightSeriesMismatch {
                expected: 0,
                found: weights.len(),
            });
        }
        let len = self.validate(data)?;
        self.append(data, len);
        Ok(())
    }

    fn current_length(&self) -> usize {
        SlidingSampleBuffer::current_length(self)
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn axis_count(&self) -> usize {
        self.axes.len()
    }
}
