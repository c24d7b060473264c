//! Thread-safe handle around a histogram engine
//!
//! Ingestion and visualization usually run on different threads. Pushes
//! hold the lock only while appending; readers clone the engine under the
//! lock and do their binning and fitting on the copy, so a slow fit never
//! stalls ingestion.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::traits::{Result, SampleSink};

/// Cloneable shared handle to one engine
///
/// # Example
///
/// ```
/// use rapidhist::histogram::Histogrammer;
/// use rapidhist::shared::SharedHistogrammer;
/// use rapidhist::traits::Histogrammable;
///
/// let shared = SharedHistogrammer::new(Histogrammer::new(100, 1));
/// let writer = shared.clone();
///
/// std::thread::spawn(move || writer.push_batch(&[&[1.0, 2.0, 3.0]], &[]).unwrap())
///     .join()
///     .unwrap();
///
/// let mut copy = shared.snapshot_engine();
/// assert_eq!(copy.hist(None, false).unwrap().total(), 3.0);
/// ```
#[derive(Debug)]
pub struct SharedHistogrammer<H> {
    inner: Arc<Mutex<H>>,
}

impl<H> Clone for SharedHistogrammer<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H> SharedHistogrammer<H> {
    pub fn new(engine: H) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Run `f` with exclusive access to the engine
    pub fn with<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        f(&mut self.lock())
    }

    /// Number of handles sharing this engine
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    // A panic in another holder cannot leave the engine half-pushed, since
    // pushes validate before they mutate.
    fn lock(&self) -> MutexGuard<'_, H> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("engine lock poisoned, continuing with its last state");
            poisoned.into_inner()
        })
    }
}

impl<H: Clone> SharedHistogrammer<H> {
    /// Copy the engine out from under the lock
    pub fn snapshot_engine(&self) -> H {
        self.lock().clone()
    }
}

impl<H: SampleSink> SharedHistogrammer<H> {
    /// Push through the lock; see [`SampleSink::push_batch`]
    pub fn push_batch(&self, data: &[&[f64]], weights: &[&[f64]]) -> Result<()> {
        self.lock().push_batch(data, weights)
    }

    pub fn current_length(&self) -> usize {
        self.lock().current_length()
    }
}
