//! Monitor configuration loaded from TOML
//!
//! ```toml
//! capacity = 5000
//! minimum_required = 100
//! bins = [40, [0.0, 0.5, 1.0, 2.0]]
//! density = false
//! fit_type = "poly"
//! poly_degree = 2
//! redraw_interval_ms = 250
//! ```
//!
//! Every key is optional. A missing file is not an error: [`load`] warns
//! and returns the defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::fit::{CurveFitter, FitType};
use crate::histogram::BinSpec;
use crate::traits::{HistError, Result};

/// Settings shared by every engine and the monitor loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Samples retained per axis
    pub capacity: usize,
    /// Samples required before a histogram is computed
    pub minimum_required: Option<usize>,
    /// Default binning; ten bins per axis when unset
    pub bins: Option<BinSpec>,
    pub density: bool,
    pub fit_type: FitType,
    /// Degree used when `fit_type = "poly"`
    pub poly_degree: usize,
    /// Period of the histogram/fit refresh
    pub redraw_interval_ms: u64,
    /// Period over which incoming samples are batched before a push
    pub aggregation_interval_ms: u64,
    /// Levenberg-Marquardt iteration budget for Gaussian fits
    pub max_fit_iterations: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            minimum_required: None,
            bins: None,
            density: false,
            fit_type: FitType::Gaussian,
            poly_degree: 2,
            redraw_interval_ms: 500,
            aggregation_interval_ms: 500,
            max_fit_iterations: 200,
        }
    }
}

impl MonitorConfig {
    /// Reject settings no engine can run with
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(HistError::Config("capacity must be positive".into()));
        }
        if let Some(minimum) = self.minimum_required {
            if minimum > self.capacity {
                return Err(HistError::Config(format!(
                    "minimum_required ({minimum}) exceeds capacity ({})",
                    self.capacity
                )));
            }
        }
        if self.redraw_interval_ms == 0 || self.aggregation_interval_ms == 0 {
            return Err(HistError::Config("intervals must be positive".into()));
        }
        if self.poly_degree == 0 {
            return Err(HistError::Config("poly_degree must be positive".into()));
        }
        if self.max_fit_iterations == 0 {
            return Err(HistError::Config("max_fit_iterations must be positive".into()));
        }
        Ok(())
    }

    /// Curve fitter with the configured degree and iteration budget
    pub fn fitter(&self) -> CurveFitter {
        CurveFitter::new()
            .with_poly_degree(self.poly_degree.max(1))
            .with_max_iterations(self.max_fit_iterations)
    }

    pub fn redraw_interval(&self) -> Duration {
        Duration::from_millis(self.redraw_interval_ms)
    }

    pub fn aggregation_interval(&self) -> Duration {
        Duration::from_millis(self.aggregation_interval_ms)
    }
}

/// Parse and validate a configuration from TOML text
pub fn from_toml_str(raw: &str) -> Result<MonitorConfig> {
    let config: MonitorConfig =
        toml::from_str(raw).map_err(|e| HistError::Config(format!("TOML parse error: {e}")))?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from a TOML file
///
/// Returns `MonitorConfig::default()` if the file doesn't exist.
pub fn load(path: impl AsRef<Path>) -> Result<MonitorConfig> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::warn!(
            "Config file not found at '{}'; using defaults.",
            path.display()
        );
        return Ok(MonitorConfig::default());
    }

    let raw = std::fs::read_to_string(path)?;
    from_toml_str(&raw)
}

/// Default config path, honouring `$XDG_CONFIG_HOME`
pub fn default_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("rapidhist").join("monitor.toml")
}
