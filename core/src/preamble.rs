use crate::config::ModemConfig;
use crate::error::Result;
use crate::ring::RingBuffer;
use crate::spectrum::{argmax, freq_of, SpectralAnalyzer};
use log::{debug, info};
use std::f64::consts::PI;

/// Synthesize the linear chirp preamble: `sin(2π (rate/2 · t² + f0 · t))`
/// sweeping from `preamble_start_freq` to `preamble_final_freq`.
pub fn chirp_samples(cfg: &ModemConfig) -> Vec<f64> {
    let fs = cfg.sample_rate;
    let rate = cfg.chirp_rate();
    let f0 = cfg.preamble_start_freq;
    (0..cfg.preamble_samples())
        .map(|n| {
            let t = n as f64 / fs;
            (2.0 * PI * (rate / 2.0 * t * t + f0 * t)).sin()
        })
        .collect()
}

/// Outcome of a successful preamble detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncLock {
    /// Constant frequency bias between observed and expected chirp, Hz.
    pub freq_shift: f64,
    /// Timing offset in seconds; positive means the buffer tail is past
    /// the true chirp end. Seeds the receiver's sample counter.
    pub time_shift: f64,
    /// Mean squared normalized frequency error over all slices.
    pub error: f64,
}

/// Locates the chirp preamble in the most recent buffered samples.
///
/// The expected preamble duration is sliced into `slice_count`
/// sub-windows (newest first); each sub-window's peak frequency is
/// compared against the instantaneous chirp frequency expected at that
/// slice's midpoint. Slice 0 doubles as a calibrator: a near-match
/// there records a constant frequency bias that both confirms the
/// sweep and measures how far from the true chirp end the buffer tail
/// landed.
pub struct PreambleDetector {
    cfg: ModemConfig,
}

impl PreambleDetector {
    pub fn new(cfg: ModemConfig) -> Self {
        Self { cfg }
    }

    /// Evaluate the buffered tail for a chirp. `Ok(None)` means no lock;
    /// errors indicate the ring did not hold a full detection window.
    pub fn evaluate(
        &self,
        ring: &RingBuffer,
        analyzer: &mut SpectralAnalyzer,
    ) -> Result<Option<SyncLock>> {
        let cfg = &self.cfg;
        let slice_w = cfg.slice_samples();
        let inner = cfg.slice_inner_samples();
        let rate = cfg.chirp_rate();
        let fs = cfg.sample_rate;

        let mut total = 0.0;
        let mut shift = 0.0;
        for i in 0..cfg.slice_count {
            let window = ring.window(i * slice_w + inner, slice_w - 2 * inner)?;
            let energy = analyzer.energy(&window);
            let observed = freq_of(argmax(&energy), window.len(), fs);

            // Slice 0 is the most recent, i.e. the end of the sweep.
            let expected =
                cfg.preamble_final_freq - (i as f64 + 0.5) * cfg.slice_duration * rate;
            if i == 0 && (expected - observed).abs() < cfg.slice_duration * rate {
                shift = observed - expected;
            }
            let delta = (expected - observed + shift) / expected;
            debug!(
                "slice {}: expected {:.1} Hz, observed {:.1} Hz, delta {:.4}",
                i, expected, observed, delta
            );
            total += delta * delta;
        }

        let error = total / cfg.slice_count as f64;
        if error < cfg.cutoff_variance {
            let lock = SyncLock {
                freq_shift: shift,
                time_shift: shift / rate,
                error,
            };
            info!(
                "preamble detected: error {:.4}, shift {:.1} Hz ({:+.1} ms)",
                error,
                shift,
                lock.time_shift * 1000.0
            );
            Ok(Some(lock))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn test_config() -> ModemConfig {
        ModemConfig {
            preamble_duration: 0.4,
            slice_count: 10,
            slice_duration: 0.04,
            slice_inner: 0.01,
            ..ModemConfig::default()
        }
    }

    fn ring_with(samples: &[f64], capacity: usize) -> RingBuffer {
        let mut rb = RingBuffer::new(capacity);
        for &s in samples {
            rb.write(s);
        }
        rb
    }

    #[test]
    fn test_chirp_sweeps_upward() {
        let cfg = test_config();
        let chirp = chirp_samples(&cfg);
        assert_eq!(chirp.len(), cfg.preamble_samples());

        // Zero crossings per window rise along the sweep.
        let early = chirp[..2000]
            .windows(2)
            .filter(|w| (w[0] > 0.0) != (w[1] > 0.0))
            .count();
        let late = chirp[chirp.len() - 2000..]
            .windows(2)
            .filter(|w| (w[0] > 0.0) != (w[1] > 0.0))
            .count();
        assert!(late > early, "late {} should exceed early {}", late, early);
    }

    #[test]
    fn test_exact_chirp_locks_with_near_zero_error() {
        let cfg = test_config();
        cfg.validate().unwrap();
        let ring = ring_with(&chirp_samples(&cfg), cfg.ring_capacity());
        let mut analyzer = SpectralAnalyzer::new();

        let lock = PreambleDetector::new(cfg)
            .evaluate(&ring, &mut analyzer)
            .unwrap()
            .expect("exact chirp must lock");
        assert!(lock.error < 0.05, "aggregate error {}", lock.error);
        // Any residual bias is far below the per-slice tolerance.
        assert!(lock.freq_shift.abs() < cfg.slice_duration * cfg.chirp_rate());
    }

    #[test]
    fn test_flat_noise_never_locks() {
        let cfg = test_config();
        let mut rng = StdRng::seed_from_u64(7);
        let normal = Normal::new(0.0, 0.5).unwrap();
        let detector = PreambleDetector::new(cfg);
        let mut analyzer = SpectralAnalyzer::new();

        let mut ring = RingBuffer::new(cfg.ring_capacity());
        for _ in 0..cfg.detect_window_samples() {
            ring.write(normal.sample(&mut rng));
        }
        // Slide the noise forward repeatedly; no window may lock.
        for _ in 0..20 {
            assert_eq!(detector.evaluate(&ring, &mut analyzer).unwrap(), None);
            for _ in 0..441 {
                ring.write(normal.sample(&mut rng));
            }
        }
    }

    #[test]
    fn test_silence_does_not_lock() {
        let cfg = test_config();
        let ring = ring_with(
            &vec![0.0; cfg.detect_window_samples()],
            cfg.ring_capacity(),
        );
        let mut analyzer = SpectralAnalyzer::new();
        let result = PreambleDetector::new(cfg).evaluate(&ring, &mut analyzer);
        assert_eq!(result.unwrap(), None);
    }

    #[test]
    fn test_short_buffer_is_an_error() {
        let cfg = test_config();
        let ring = ring_with(&[0.0; 100], cfg.ring_capacity());
        let mut analyzer = SpectralAnalyzer::new();
        assert!(PreambleDetector::new(cfg)
            .evaluate(&ring, &mut analyzer)
            .is_err());
    }
}
