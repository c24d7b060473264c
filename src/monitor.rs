//! The consumption-loop boundary
//!
//! A [`Monitor`] owns the shared engine and turns it into display frames on
//! demand. Nothing that goes wrong while binning or fitting escapes a
//! refresh: the tick is skipped, logged, and the previous frame stays
//! current. With the `runtime` feature the same loop can run as a tokio
//! interval task, next to an aggregator task that batches incoming samples.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::fit::FitType;
use crate::histogram::BinSpec;
use crate::shared::SharedHistogrammer;
use crate::traits::{Fittable, HistError, Histogrammable, Result, SampleSink};

/// One histogram and the fit computed from it
#[derive(Clone, Debug, PartialEq)]
pub struct Frame<O, F> {
    pub histogram: O,
    pub fit: F,
    /// Samples held in the window when the frame was computed
    pub window: usize,
    /// Counts produced frames, starting at 1
    pub sequence: u64,
}

/// Frame type produced by a monitor over engine `H`
pub type FrameOf<H> = Frame<<H as Histogrammable>::Output, <H as Fittable>::Fit>;

/// Periodic histogram and fit producer over a shared engine
///
/// # Example
///
/// ```
/// use rapidhist::histogram::{BinSpec, Histogrammer};
/// use rapidhist::monitor::Monitor;
/// use rapidhist::shared::SharedHistogrammer;
///
/// let shared = SharedHistogrammer::new(Histogrammer::new(100, 1).with_minimum(Some(5)));
/// let monitor = Monitor::new(shared.clone()).with_bins(BinSpec::Count(5));
///
/// // Warm-up ticks are skipped, not failed
/// assert!(!monitor.refresh());
///
/// shared.push_batch(&[&[1.0, 2.0, 2.0, 3.0, 3.0, 3.0, 4.0, 4.0, 5.0]], &[]).unwrap();
/// assert!(monitor.refresh());
/// assert_eq!(monitor.latest().unwrap().window, 9);
/// ```
#[derive(Debug)]
pub struct Monitor<H: Histogrammable + Fittable> {
    engine: SharedHistogrammer<H>,
    bins: Option<BinSpec>,
    density: bool,
    fit_type: FitType,
    latest: Mutex<Option<FrameOf<H>>>,
    produced: AtomicU64,
    skipped: AtomicU64,
}

impl<H> Monitor<H>
where
    H: Histogrammable + Fittable + SampleSink + Clone,
{
    pub fn new(engine: SharedHistogrammer<H>) -> Self {
        Self {
            engine,
            bins: None,
            density: false,
            fit_type: FitType::default(),
            latest: Mutex::new(None),
            produced: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }

    /// Build a monitor with the binning, density and fit type of `config`
    #[cfg(feature = "config")]
    pub fn from_config(config: &crate::config::MonitorConfig, engine: H) -> Result<Self> {
        config.validate()?;
        let mut monitor = Self::new(SharedHistogrammer::new(engine))
            .with_density(config.density)
            .with_fit_type(config.fit_type);
        monitor.bins = config.bins.clone();
        Ok(monitor)
    }

    /// Binning passed to every `hist()`; `None` uses the engine's own
    pub fn with_bins(mut self, bins: BinSpec) -> Self {
        self.bins = Some(bins);
        self
    }

    pub fn with_density(mut self, density: bool) -> Self {
        self.density = density;
        self
    }

    pub fn with_fit_type(mut self, fit_type: FitType) -> Self {
        self.fit_type = fit_type;
        self
    }

    /// Handle for ingestion
    pub fn engine(&self) -> &SharedHistogrammer<H> {
        &self.engine
    }

    /// Push through the shared engine
    pub fn ingest(&self, data: &[&[f64]], weights: &[&[f64]]) -> Result<()> {
        self.engine.push_batch(data, weights)
    }

    /// Compute a new frame from a copy of the engine
    ///
    /// Returns `false` when the tick was skipped; the reason is logged and
    /// the previous frame is kept.
    pub fn refresh(&self) -> bool {
        let mut engine = self.engine.snapshot_engine();
        match self.compute(&mut engine) {
            Ok((histogram, fit)) => {
                let sequence = self.produced.fetch_add(1, Ordering::Relaxed) + 1;
                let frame = Frame {
                    histogram,
                    fit,
                    window: engine.current_length(),
                    sequence,
                };
                *self.slot() = Some(frame);
                true
            }
            Err(err) => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
                if err.is_recoverable() {
                    tracing::debug!(error = %err, "skipping monitor tick");
                } else {
                    tracing::warn!(error = %err, "monitor tick failed");
                }
                false
            }
        }
    }

    fn compute(&self, engine: &mut H) -> Result<(H::Output, H::Fit), HistError> {
        let histogram = engine.hist(self.bins.as_ref(), self.density)?;
        let fit = engine.fit(self.fit_type)?;
        Ok((histogram, fit))
    }

    /// The most recent frame, if any tick has succeeded
    pub fn latest(&self) -> Option<FrameOf<H>> {
        self.slot().clone()
    }

    /// Number of frames produced so far
    pub fn frames_produced(&self) -> u64 {
        self.produced.load(Ordering::Relaxed)
    }

    /// Number of ticks skipped so far
    pub fn ticks_skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    fn slot(&self) -> MutexGuard<'_, Option<FrameOf<H>>> {
        self.latest.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(feature = "runtime")]
pub use self::runtime::{spawn_aggregator, Sample};

#[cfg(feature = "runtime")]
mod runtime {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;
    use tokio::time;

    use super::{FrameOf, Monitor};
    use crate::shared::SharedHistogrammer;
    use crate::traits::{Fittable, Histogrammable, SampleSink};

    /// One incoming point with its weights, as delivered by an ingestion source
    #[derive(Clone, Debug, PartialEq)]
    pub struct Sample {
        /// One value per axis
        pub point: Vec<f64>,
        /// One value per weight series
        pub weights: Vec<f64>,
    }

    impl Sample {
        pub fn new(point: Vec<f64>) -> Self {
            Self {
                point,
                weights: Vec::new(),
            }
        }

        pub fn weighted(point: Vec<f64>, weights: Vec<f64>) -> Self {
            Self { point, weights }
        }
    }

    impl<H> Monitor<H>
    where
        H: Histogrammable + Fittable + SampleSink + Clone + Send + 'static,
        H::Output: Send,
        H::Fit: Send,
    {
        /// Refresh every `period` on a background task
        ///
        /// Every new frame is sent through the returned channel. The task
        /// stops when the receiver is dropped.
        pub fn spawn_refresh(self: &Arc<Self>, period: Duration) -> mpsc::Receiver<FrameOf<H>> {
            let (tx, rx) = mpsc::channel(4);
            let monitor = Arc::clone(self);

            tokio::spawn(async move {
                let mut ticker = time::interval(period);
                loop {
                    ticker.tick().await;
                    if tx.is_closed() {
                        break;
                    }
                    if !monitor.refresh() {
                        continue;
                    }
                    let Some(frame) = monitor.latest() else {
                        continue;
                    };
                    if tx.send(frame).await.is_err() {
                        break;
                    }
                }
                tracing::debug!("refresh task stopped");
            });

            rx
        }
    }

    /// Batch samples and push them into `engine` once per `period`
    ///
    /// Samples whose shape does not match the engine are logged and dropped.
    /// When every sender is gone the pending batch is flushed and the task
    /// ends.
    pub fn spawn_aggregator<H>(engine: SharedHistogrammer<H>, period: Duration) -> (mpsc::Sender<Sample>, JoinHandle<()>)
    where
        H: SampleSink + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<Sample>(1024);
        let (axes, series) = engine.with(|h| (h.axis_count(), h.weight_series()));

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            let mut pending = Batch::new(axes, series);

            loop {
                tokio::select! {
                    _ = ticker.tick() => pending.flush(&engine),
                    sample = rx.recv() => match sample {
                        Some(sample) => pending.add(sample),
                        None => {
                            pending.flush(&engine);
                            break;
                        }
                    },
                }
            }
            tracing::debug!("aggregator task stopped");
        });

        (tx, handle)
    }

    /// Column-major staging area for one aggregation interval
    struct Batch {
        data: Vec<Vec<f64>>,
        weights: Vec<Vec<f64>>,
    }

    impl Batch {
        fn new(axes: usize, series: usize) -> Self {
            Self {
                data: vec![Vec::new(); axes],
                weights: vec![Vec::new(); series],
            }
        }

        fn add(&mut self, sample: Sample) {
            if sample.point.len() != self.data.len() || sample.weights.len() != self.weights.len() {
                tracing::warn!(
                    axes = sample.point.len(),
                    weights = sample.weights.len(),
                    "dropping sample with the wrong shape"
                );
                return;
            }
            for (column, value) in self.data.iter_mut().zip(sample.point) {
                column.push(value);
            }
            for (column, value) in self.weights.iter_mut().zip(sample.weights) {
                column.push(value);
            }
        }

        fn flush<H: SampleSink>(&mut self, engine: &SharedHistogrammer<H>) {
            if self.data.first().map_or(true, Vec::is_empty) {
                return;
            }
            let data: Vec<&[f64]> = self.data.iter().map(Vec::as_slice).collect();
            let weights: Vec<&[f64]> = self.weights.iter().map(Vec::as_slice).collect();
            if let Err(err) = engine.push_batch(&data, &weights) {
                tracing::warn!(error = %err, "dropping aggregated batch");
            }
            self.data.iter_mut().for_each(Vec::clear);
            self.weights.iter_mut().for_each(Vec::clear);
        }
    }
}
