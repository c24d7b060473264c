//! # Rapidhist
//!
//! Sliding-window histograms and curve fits for live monitoring.
//!
//! Rapidhist keeps the most recent N samples of one or more aligned
//! measurement axes and bins them on demand, so a display loop can redraw
//! the current distribution of a fast signal at its own pace.
//!
//! ## Features
//!
//! - **Sliding windows**: fixed-capacity multi-axis FIFO buffers with atomic pushes
//! - **Histograms**: counts or weight sums, with numpy-compatible binning
//! - **Transmission**: incident/outgoing histograms on shared edges and their ratio
//! - **Curve fits**: Gaussian and polynomial least squares over bin centers
//! - **Concurrency**: a shared handle and a monitor loop that never fails a tick
//!
//! ## Quick Start
//!
//! ```rust
//! use rapidhist::prelude::*;
//!
//! let mut hist = Histogrammer::new(1000, 1);
//! for i in 0..2000 {
//!     hist.push_point(&[(i % 7) as f64]).unwrap();
//! }
//!
//! let result = hist.hist(Some(&BinSpec::Count(7)), false).unwrap();
//! assert_eq!(result.total(), 1000.0);
//! ```
//!
//! ## Transmission
//!
//! A [`TransmissionHistogrammer`] bins every sample twice, once as an
//! incident hit and once weighted by its outgoing signal:
//!
//! ```rust
//! use rapidhist::prelude::*;
//!
//! let mut trans = TransmissionHistogrammer::new(100, 1);
//! trans.push(&[[0.2, 0.4, 0.6, 0.8]], &[1.0, 0.5, 0.5, 0.0]).unwrap();
//!
//! let result = trans.hist(Some(&BinSpec::Count(2)), false).unwrap();
//! assert_eq!(result.fractional_yield.as_slice().unwrap(), &[0.75, 0.25]);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: serialization of bin specs, histograms and fits
//! - `config` (default): TOML configuration via [`config::MonitorConfig`]
//! - `runtime` (default): tokio refresh and aggregation tasks
//! - `full`: everything

#![cfg_attr(docsrs, feature(doc_cfg))]

// Core traits always available
pub mod traits;

pub mod buffer;
pub mod fit;
pub mod histogram;
pub mod monitor;
pub mod shared;
pub mod transmission;

#[cfg(feature = "config")]
#[cfg_attr(docsrs, doc(cfg(feature = "config")))]
pub mod config;

pub mod prelude {
    pub use crate::traits::*;

    pub use crate::buffer::{SlidingSampleBuffer, WeightedBuffer};
    pub use crate::fit::{CurveFitter, FitModel, FitResult, FitType};
    pub use crate::histogram::{AxisBins, BinEdges, BinSpec, HistogramResult, Histogrammer, WeightedHistogrammer};
    pub use crate::monitor::{Frame, Monitor};
    pub use crate::shared::SharedHistogrammer;
    pub use crate::transmission::{
        TransmissionFit, TransmissionHistogrammer, TransmissionResult, WeightedTransmissionHistogrammer,
    };

    #[cfg(feature = "config")]
    pub use crate::config::MonitorConfig;
}

pub use buffer::{SlidingSampleBuffer, WeightedBuffer};
pub use fit::CurveFitter;
pub use histogram::{Histogrammer, WeightedHistogrammer};
pub use monitor::Monitor;
pub use shared::SharedHistogrammer;
pub use traits::{HistError, Result};
pub use transmission::{TransmissionHistogrammer, WeightedTransmissionHistogrammer};

#[cfg(feature = "config")]
pub use config::MonitorConfig;
