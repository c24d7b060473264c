//! Weighted running mean and variance
//!
//! West's weighted extension of Welford's online algorithm. Used to seed the
//! Gaussian fit from bin centers weighted by bin heights.

/// Weighted mean and variance accumulator
///
/// # Example
///
/// ```
/// use rapidhist::fit::WeightedMoments;
///
/// let mut moments = WeightedMoments::new();
/// for (center, height) in [(1.0, 1.0), (2.0, 2.0), (3.0, 1.0)] {
///     moments.add(center, height);
/// }
///
/// assert!((moments.mean() - 2.0).abs() < 1e-12);
/// assert!((moments.variance() - 0.5).abs() < 1e-12);
/// ```
#[derive(Clone, Debug)]
pub struct WeightedMoments {
    /// Sum of accepted weights
    total_weight: f64,
    /// Running weighted mean
    mean: f64,
    /// Weighted sum of squared differences from the mean
    m2: f64,
}

impl Default for WeightedMoments {
    fn default() -> Self {
        Self::new()
    }
}

impl WeightedMoments {
    pub fn new() -> Self {
        Self {
            total_weight: 0.0,
            mean: 0.0,
            m2: 0.0,
        }
    }

    /// Add a value with the given weight
    ///
    /// Non-finite values and non-positive or non-finite weights are ignored,
    /// so empty or negative bins never pull the estimate around.
    pub fn add(&mut self, value: f64, weight: f64) {
        if !value.is_finite() || !(weight > 0.0) || !weight.is_finite() {
            return;
        }

        self.total_weight += weight;
        let delta = value - self.mean;
        self.mean += delta * weight / self.total_weight;
        self.m2 += weight * delta * (value - self.mean);
    }

    /// True until a value with positive weight has been added
    pub fn is_empty(&self) -> bool {
        self.total_weight == 0.0
    }

    /// Sum of the accepted weights
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Weighted mean
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Weighted population variance
    pub fn variance(&self) -> f64 {
        if self.total_weight <= 0.0 {
            0.0
        } else {
            (self.m2 / self.total_weight).max(0.0)
        }
    }

    pub fn stddev(&self) -> f64 {
        self.variance().sqrt()
    }
}
