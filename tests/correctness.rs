//! Correctness and invariant tests for rapidhist
//!
//! These tests verify the window, binning and ratio invariants across all
//! engines. They complement the unit tests in each module by focusing on
//! properties that must always hold.
//!
//! Run with: cargo test --test correctness --features full

// Require all features
#[cfg(not(all(feature = "config", feature = "runtime")))]
compile_error!(
    "Correctness tests require all features. Run: cargo test --test correctness --features full"
);

use rapidhist::buffer::{SlidingSampleBuffer, WeightedBuffer};
use rapidhist::fit::{gaussian, FitModel, FitType};
use rapidhist::histogram::{BinSpec, Histogrammer, WeightedHistogrammer};
use rapidhist::traits::{Fittable, HistError, Histogrammable, SampleSink};
use rapidhist::transmission::{TransmissionHistogrammer, WeightedTransmissionHistogrammer};

/// Deterministic pseudo-random values in [0, 1)
fn lcg(seed: u64) -> impl Iterator<Item = f64> {
    let mut state = seed;
    std::iter::repeat_with(move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 11) as f64 / (1u64 << 53) as f64
    })
}

fn unit_edges() -> BinSpec {
    BinSpec::edges([vec![0.0, 1.0, 2.0, 3.0, 4.0]])
}

// ============================================================================
// Sliding Sample Buffer
// ============================================================================

mod window {
    use super::*;

    #[test]
    fn length_follows_min_formula() {
        let capacity = 37;
        let mut buffer = SlidingSampleBuffer::new(capacity, 3);
        let mut sizes = lcg(7).map(|v| (v * 60.0) as usize);
        let mut values = lcg(11);

        for _ in 0..200 {
            let before = buffer.current_length();
            let n = sizes.next().unwrap();
            let axis: Vec<f64> = values.by_ref().take(n).collect();
            buffer.push(&[axis.clone(), axis.clone(), axis]).unwrap();

            assert_eq!(
                buffer.current_length(),
                capacity.min(before + n),
                "length after pushing {n} onto {before} should be min(capacity, sum)"
            );
        }
    }

    #[test]
    fn eviction_is_fifo() {
        let capacity = 50;
        let mut buffer = SlidingSampleBuffer::new(capacity, 1);
        for i in 0..=capacity {
            buffer.push_point(&[i as f64]).unwrap();
        }

        let expected: Vec<f64> = (1..=capacity).map(|i| i as f64).collect();
        assert_eq!(buffer.snapshot(), vec![expected]);
    }

    #[test]
    fn oversized_push_keeps_newest_tail() {
        let mut buffer = SlidingSampleBuffer::new(5, 1);
        let values: Vec<f64> = (0..30).map(|i| (i % 3) as f64).collect();
        buffer.push(&[values]).unwrap();

        assert_eq!(buffer.snapshot(), vec![vec![1.0, 2.0, 0.0, 1.0, 2.0]]);
        assert_eq!(buffer.items_seen(), 30);
    }

    #[test]
    fn axes_stay_aligned_after_rejections() {
        let mut buffer = SlidingSampleBuffer::new(10, 2);
        buffer.push(&[vec![1.0, 2.0], vec![10.0, 20.0]]).unwrap();

        assert!(matches!(
            buffer.push(&[vec![3.0], vec![30.0, 40.0]]),
            Err(HistError::RaggedAxes { .. })
        ));
        assert!(matches!(
            buffer.push(&[vec![3.0]]),
            Err(HistError::AxisCountMismatch { expected: 2, found: 1 })
        ));

        let snapshot = buffer.snapshot();
        assert_eq!(snapshot[0].len(), snapshot[1].len());
        assert_eq!(buffer.current_length(), 2);
    }

    #[test]
    fn weighted_push_is_atomic() {
        let mut buffer = WeightedBuffer::new(10, 2);
        buffer
            .push(&[vec![1.0, 2.0], vec![3.0, 4.0]], &[0.5, 0.5])
            .unwrap();

        let before = buffer.current_length();
        let err = buffer
            .push(&[vec![1.0, 2.0, 3.0], vec![3.0, 4.0, 5.0]], &[0.5, 0.5])
            .unwrap_err();

        assert!(matches!(err, HistError::AxisWeightLengthMismatch { .. }));
        assert_eq!(buffer.current_length(), before);
        assert_eq!(buffer.weights().len(), before);
    }

    #[test]
    fn wrong_weight_series_count_reports_one_error() {
        let mut sinks: Vec<Box<dyn SampleSink>> = vec![
            Box::new(SlidingSampleBuffer::new(8, 1)),
            Box::new(WeightedBuffer::new(8, 1)),
            Box::new(Histogrammer::new(8, 1)),
            Box::new(WeightedHistogrammer::new(8, 1)),
            Box::new(TransmissionHistogrammer::new(8, 1)),
            Box::new(WeightedTransmissionHistogrammer::new(8, 1)),
        ];
        let series: [&[f64]; 3] = [&[1.0], &[1.0], &[1.0]];

        for sink in sinks.iter_mut() {
            let expected = sink.weight_series();
            let found = if expected == 0 { 1 } else { expected + 1 };
            let err = sink.push_batch(&[&[1.0]], &series[..found]).unwrap_err();
            assert!(
                matches!(err, HistError::WeightSeriesMismatch { expected: e, found: f } if e == expected && f == found),
                "{err:?} for a sink taking {expected} series"
            );
            assert!(sink.is_empty());
        }
    }
}

// ============================================================================
// Histogrammer
// ============================================================================

mod histogrammer {
    use super::*;

    #[test]
    fn repeated_pattern_scenario() {
        let mut hist = Histogrammer::new(5, 1)
            .with_minimum(Some(3))
            .with_bins(unit_edges());
        let values: Vec<f64> = (0..30).map(|i| (i % 3) as f64).collect();
        hist.push(&[values]).unwrap();

        let result = hist.hist(None, false).unwrap();
        assert_eq!(result.heights_1d().unwrap(), vec![1.0, 2.0, 2.0, 0.0]);
        assert_eq!(result.edges.axis(0).unwrap(), &[0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn two_axis_scenario() {
        let mut hist = Histogrammer::new(5, 2).with_minimum(Some(3));
        hist.push(&[[0.0, 0.0, 2.0, 2.0, 2.0], [0.0, 2.0, 2.0, 2.0, 2.0]])
            .unwrap();

        let bins = BinSpec::edges([vec![0.0, 1.0, 2.0, 3.0], vec![0.0, 1.0, 2.0, 3.0]]);
        let result = hist.hist(Some(&bins), false).unwrap();
        let heights: Vec<f64> = result.heights.iter().copied().collect();
        assert_eq!(heights, vec![1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 3.0]);
    }

    #[test]
    fn hist_is_idempotent() {
        let mut hist = Histogrammer::new(500, 2);
        let values: Vec<f64> = lcg(3).take(400).collect();
        let other: Vec<f64> = lcg(5).take(400).collect();
        hist.push(&[values, other]).unwrap();

        let bins = BinSpec::Count(9);
        let first = hist.hist(Some(&bins), true).unwrap();
        let second = hist.hist(Some(&bins), true).unwrap();

        assert_eq!(first, second);
        let first_bits: Vec<u64> = first.heights.iter().map(|v| v.to_bits()).collect();
        let second_bits: Vec<u64> = second.heights.iter().map(|v| v.to_bits()).collect();
        assert_eq!(first_bits, second_bits);
    }

    #[test]
    fn minimum_gates_hist() {
        let mut hist = Histogrammer::new(10, 1).with_minimum(Some(3));
        hist.push(&[[1.0, 2.0]]).unwrap();

        let err = hist.hist(None, false).unwrap_err();
        assert!(err.is_recoverable());
        assert!(matches!(err, HistError::InsufficientData { required: 3, found: 2 }));
    }

    #[test]
    fn density_integrates_to_one() {
        let mut hist = Histogrammer::new(1000, 2);
        let x: Vec<f64> = lcg(17).take(1000).collect();
        let y: Vec<f64> = lcg(19).take(1000).map(|v| v * 4.0).collect();
        hist.push(&[x, y]).unwrap();

        let result = hist.hist(Some(&BinSpec::Count(6)), true).unwrap();
        let shape = result.edges.shape();
        let mut integral = 0.0;
        for i in 0..shape[0] {
            for j in 0..shape[1] {
                let ex = result.edges.axis(0).unwrap();
                let ey = result.edges.axis(1).unwrap();
                integral += result.heights[[i, j].as_slice()] * (ex[i + 1] - ex[i]) * (ey[j + 1] - ey[j]);
            }
        }
        assert!((integral - 1.0).abs() < 1e-9, "integral {integral}");
    }

    #[test]
    fn oversized_bin_request_is_an_error() {
        let mut hist = Histogrammer::new(16, 3);
        hist.push(&[[1.0, 2.0], [1.0, 2.0], [1.0, 2.0]]).unwrap();

        let err = hist.hist(Some(&BinSpec::Count(3_000_000)), false).unwrap_err();
        assert!(matches!(err, HistError::InvalidBins(_)));
        assert!(hist.latest().is_none());
        assert!(hist.hist(Some(&BinSpec::Count(4)), false).is_ok());
    }

    #[test]
    fn push_invalidates_fit() {
        let mut hist = Histogrammer::new(100, 1);
        hist.push(&[[1.0, 2.0, 2.0, 3.0]]).unwrap();
        hist.hist(Some(&BinSpec::Count(3)), false).unwrap();
        assert!(hist.poly_fit().is_ok());

        hist.push_point(&[2.5]).unwrap();
        assert!(matches!(hist.poly_fit(), Err(HistError::FitNotReady)));
        assert!(hist.latest().is_none());
    }
}

// ============================================================================
// Weighted Histogrammer
// ============================================================================

mod weighted {
    use super::*;

    #[test]
    fn heights_are_weight_sums() {
        let mut hist = WeightedHistogrammer::new(5, 1).with_bins(unit_edges());
        let data = [1.0, 1.0, 1.0, 2.0, 3.0];
        let weights = [3.0, 8.0, 1.0, 2.0, 4.0];
        hist.push(&[data], &weights).unwrap();

        let result = hist.hist(None, false).unwrap();
        let mut expected = vec![0.0; 4];
        for (&x, &w) in data.iter().zip(&weights) {
            expected[x as usize] += w;
        }
        assert_eq!(result.heights_1d().unwrap(), expected);
    }

    #[test]
    fn weights_evict_with_data() {
        let mut hist = WeightedHistogrammer::new(5, 1).with_bins(unit_edges());
        let values: Vec<f64> = (0..30).map(|i| (i % 3) as f64).collect();
        hist.push(&[values.clone()], &values).unwrap();

        let result = hist.hist(None, false).unwrap();
        assert_eq!(result.heights_1d().unwrap(), vec![0.0, 2.0, 4.0, 0.0]);
    }

    #[test]
    fn failed_push_changes_nothing() {
        let mut hist = WeightedHistogrammer::new(8, 1);
        hist.push(&[[1.0, 2.0, 3.0]], &[1.0, 1.0, 1.0]).unwrap();
        let before = (hist.snapshot(), hist.weights_snapshot());

        assert!(hist.push(&[[4.0, 5.0]], &[1.0, 1.0, 1.0]).is_err());
        assert!(hist.push_batch(&[&[4.0]], &[]).is_err());
        assert_eq!((hist.snapshot(), hist.weights_snapshot()), before);
    }
}

// ============================================================================
// Transmission
// ============================================================================

mod transmission {
    use super::*;

    #[test]
    fn yield_scenario() {
        let mut trans = TransmissionHistogrammer::new(5, 1)
            .with_minimum(Some(3))
            .with_bins(unit_edges());
        trans
            .push(&[[1.0, 1.0, 1.0, 2.0, 3.0]], &[3.0, 8.0, 1.0, 2.0, 4.0])
            .unwrap();

        let result = trans.hist(None, false).unwrap();
        assert_eq!(result.incident.as_slice().unwrap(), &[0.0, 3.0, 1.0, 1.0]);
        assert_eq!(result.outgoing.as_slice().unwrap(), &[0.0, 12.0, 2.0, 4.0]);
        assert_eq!(result.fractional_yield.as_slice().unwrap(), &[0.0, 4.0, 2.0, 4.0]);
    }

    #[test]
    fn yield_is_always_finite() {
        let mut trans = TransmissionHistogrammer::new(300, 2);
        let mut values = lcg(23);
        for round in 0..20 {
            let x: Vec<f64> = values.by_ref().take(15).collect();
            let y: Vec<f64> = values.by_ref().take(15).collect();
            // Mix zero, negative and huge weights
            let w: Vec<f64> = (0..15)
                .map(|i| match (i + round) % 4 {
                    0 => 0.0,
                    1 => -1.0,
                    2 => 1e300,
                    _ => 0.5,
                })
                .collect();
            trans.push(&[x, y], &w).unwrap();

            let result = trans.hist(Some(&BinSpec::Count(12)), round % 2 == 0).unwrap();
            assert!(result.fractional_yield.iter().all(|v| v.is_finite()));
            for ((&inc, &out), &flag) in result
                .incident
                .iter()
                .zip(&result.outgoing)
                .zip(&result.anomalous)
            {
                assert_eq!(flag, inc == 0.0 && out != 0.0);
            }
        }
    }

    #[test]
    fn outgoing_reuses_incident_edges() {
        let mut trans = TransmissionHistogrammer::new(100, 1);
        let data: Vec<f64> = lcg(29).take(100).map(|v| v * 10.0 - 3.0).collect();
        let weights: Vec<f64> = lcg(31).take(100).collect();
        trans.push(&[data], &weights).unwrap();
        let result = trans.hist(Some(&BinSpec::Count(8)), false).unwrap();

        let incident = trans.incident().latest().unwrap();
        let outgoing = trans.outgoing().latest().unwrap();
        assert_eq!(incident.edges, outgoing.edges);
        assert_eq!(result.edges, incident.edges);
    }

    #[test]
    fn weighted_variant_divides_by_incident_weights() {
        let mut trans = WeightedTransmissionHistogrammer::new(5, 1).with_bins(unit_edges());
        trans
            .push(
                &[[1.0, 1.0, 1.0, 2.0, 3.0]],
                &[3.0, 8.0, 1.0, 2.0, 4.0],
                &[3.0, 8.0, 1.0, 2.0, 4.0],
            )
            .unwrap();

        let result = trans.hist(None, false).unwrap();
        assert_eq!(result.fractional_yield.as_slice().unwrap(), &[0.0, 1.0, 1.0, 1.0]);
        assert_eq!(result.hits.unwrap().as_slice().unwrap(), &[0.0, 3.0, 1.0, 1.0]);
    }

    #[test]
    fn failed_push_keeps_all_windows() {
        let mut trans = WeightedTransmissionHistogrammer::new(5, 1);
        trans.push(&[[1.0]], &[1.0], &[1.0]).unwrap();

        assert!(trans.push(&[[1.0, 2.0]], &[1.0, 1.0], &[1.0]).is_err());
        assert_eq!(trans.hits().current_length(), 1);
        assert_eq!(trans.incident().current_length(), 1);
        assert_eq!(trans.outgoing().current_length(), 1);
    }
}

// ============================================================================
// Curve Fitting
// ============================================================================

mod fitting {
    use super::*;

    fn peaked(mu: f64, sigma: f64, total: f64) -> Histogrammer {
        let mut hist = Histogrammer::new(100_000, 1)
            .with_bins(BinSpec::edges([(0..=40).map(|i| i as f64 * 0.25).collect::<Vec<_>>()]));
        let mut data = Vec::new();
        for bin in 0..40 {
            let center = bin as f64 * 0.25 + 0.125;
            let count = (gaussian(center, mu, sigma, total) * 0.25).round() as usize;
            data.extend(std::iter::repeat(center).take(count));
        }
        hist.push(&[data]).unwrap();
        hist
    }

    #[test]
    fn gaussian_recovers_mean_and_width() {
        let mut hist = peaked(4.2, 0.9, 20_000.0);
        hist.hist(None, false).unwrap();

        let fit = hist.gaussian_fit().unwrap();
        assert_eq!(fit.model, FitModel::Gaussian);
        assert!((fit.parameters[0] - 4.2).abs() < 0.01, "mu {}", fit.parameters[0]);
        assert!((fit.parameters[1] - 0.9).abs() < 0.01, "sigma {}", fit.parameters[1]);
        assert!(fit.parameters[1] > 0.0);
        assert!(fit.std_errors().iter().all(|e| e.is_finite()));
    }

    #[test]
    fn quadratic_peak_near_maximum() {
        let mut hist = peaked(5.0, 2.0, 50_000.0);
        hist.hist(None, false).unwrap();

        let fit = hist.fit(FitType::Poly).unwrap();
        assert_eq!(fit.parameters.len(), 3);
        assert!(fit.parameters[0] < 0.0);
        assert!((fit.peak().unwrap() - 5.0).abs() < 0.1);
    }

    #[test]
    fn single_bin_window_fits() {
        let mut hist = Histogrammer::new(100, 1).with_bins(BinSpec::edges([(0..=9).map(f64::from).collect::<Vec<_>>()]));
        hist.push(&[vec![4.5; 60]]).unwrap();
        hist.hist(None, false).unwrap();

        let fit = hist.gaussian_fit().unwrap();
        assert!((fit.peak().unwrap() - 4.5).abs() < 1e-6);
        assert!((fit.evaluate(4.5) - 60.0).abs() < 0.1);
    }

    #[test]
    fn flat_window_fits() {
        let mut hist = Histogrammer::new(1000, 1);
        let values: Vec<f64> = (0..1000).map(|i| (i % 10) as f64 + 0.5).collect();
        hist.push(&[values]).unwrap();
        let result = hist.hist(Some(&BinSpec::Count(10)), false).unwrap();
        assert!(result.heights_1d().unwrap().iter().all(|&h| h == 100.0));

        let fit = hist.gaussian_fit().unwrap();
        for center in result.centers().unwrap() {
            assert!((fit.evaluate(center) - 100.0).abs() < 0.5, "f({center}) = {}", fit.evaluate(center));
        }
    }

    #[test]
    fn fit_needs_a_histogram() {
        let hist = peaked(5.0, 1.0, 1000.0);
        assert!(matches!(hist.gaussian_fit(), Err(HistError::FitNotReady)));
    }
}

// ============================================================================
// Configuration
// ============================================================================

mod config {
    use super::*;
    use rapidhist::config::{from_toml_str, MonitorConfig};

    #[test]
    fn engines_share_config() {
        let config = from_toml_str("capacity = 5\nminimum_required = 3\nbins = [[0, 1, 2, 3, 4]]").unwrap();

        let mut trans = TransmissionHistogrammer::from_config(&config, 1).unwrap();
        trans
            .push(&[[1.0, 1.0, 1.0, 2.0, 3.0]], &[3.0, 8.0, 1.0, 2.0, 4.0])
            .unwrap();
        let result = trans.hist(None, false).unwrap();
        assert_eq!(result.fractional_yield.as_slice().unwrap(), &[0.0, 4.0, 2.0, 4.0]);

        let weighted = WeightedHistogrammer::from_config(&config, 1).unwrap();
        assert_eq!(weighted.bins(), config.bins.as_ref());
    }

    #[test]
    fn invalid_config_rejected_by_constructors() {
        let config = MonitorConfig {
            minimum_required: Some(2000),
            ..MonitorConfig::default()
        };
        assert!(matches!(
            Histogrammer::from_config(&config, 1),
            Err(HistError::Config(_))
        ));
        assert!(WeightedTransmissionHistogrammer::from_config(&config, 1).is_err());
    }
}

// ============================================================================
// Concurrency
// ============================================================================

mod concurrency {
    use super::*;
    use rapidhist::monitor::{spawn_aggregator, Monitor, Sample};
    use rapidhist::shared::SharedHistogrammer;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn readers_and_writers_interleave() {
        let shared = SharedHistogrammer::new(WeightedHistogrammer::new(256, 1));
        let monitor = Arc::new(Monitor::new(shared.clone()).with_bins(BinSpec::Count(8)));

        let writer = {
            let shared = shared.clone();
            thread::spawn(move || {
                let mut values = lcg(41);
                for _ in 0..200 {
                    let batch: Vec<f64> = values.by_ref().take(10).collect();
                    let weights = vec![1.0; batch.len()];
                    shared.push_batch(&[&batch], &[&weights]).unwrap();
                }
            })
        };
        let reader = {
            let monitor = Arc::clone(&monitor);
            thread::spawn(move || {
                for _ in 0..50 {
                    if let Some(frame) = monitor.latest() {
                        assert!(frame.window <= 256);
                        assert!(frame.histogram.total() <= 256.0);
                    }
                    monitor.refresh();
                }
            })
        };

        writer.join().unwrap();
        reader.join().unwrap();
        assert_eq!(shared.current_length(), 256);
    }

    #[tokio::test]
    async fn aggregated_ingest_feeds_monitor() {
        let shared = SharedHistogrammer::new(TransmissionHistogrammer::new(5000, 1));
        let (tx, ingest) = spawn_aggregator(shared.clone(), Duration::from_millis(5));

        // Hits per position and the per-hit yield both trace a Gaussian
        let mut sent = 0;
        for x in (0..20).map(f64::from) {
            let hits = gaussian(x, 10.0, 4.0, 2000.0).round() as usize;
            let weight = gaussian(x, 10.0, 3.0, 10.0);
            for _ in 0..hits {
                tx.send(Sample::weighted(vec![x], vec![weight])).await.unwrap();
            }
            sent += hits;
        }
        drop(tx);
        ingest.await.unwrap();

        let monitor = Monitor::new(shared)
            .with_bins(BinSpec::edges([(0..=20).map(|i| i as f64 - 0.5).collect::<Vec<_>>()]));
        assert!(monitor.refresh());

        let frame = monitor.latest().unwrap();
        assert_eq!(frame.window, sent);
        assert!((frame.fit.fractional_yield.parameters[0] - 10.0).abs() < 1e-3);
    }
}
