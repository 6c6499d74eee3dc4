use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// Thin wrapper around the FFT primitive.
///
/// Converts a real sample window into a one-sided amplitude spectrum
/// and maps between bin indices and physical frequencies. Plans are
/// cached per window length by the underlying planner, so repeated
/// analysis of same-sized windows does not replan.
pub struct SpectralAnalyzer {
    planner: FftPlanner<f64>,
}

impl SpectralAnalyzer {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }

    /// One-sided amplitude spectrum of a rectangular-windowed signal.
    ///
    /// Returns `L/2 + 1` values: `out[0] = |X[0]| / L` for the DC bin
    /// and `out[i] = 2 |X[i]| / L` for the positive-frequency bins.
    pub fn energy(&mut self, window: &[f64]) -> Vec<f64> {
        let l = window.len();
        if l == 0 {
            return Vec::new();
        }
        let fft = self.planner.plan_fft_forward(l);

        let mut buf: Vec<Complex<f64>> =
            window.iter().map(|&s| Complex::new(s, 0.0)).collect();
        fft.process(&mut buf);

        let mut energy = vec![0.0; l / 2 + 1];
        energy[0] = buf[0].norm() / l as f64;
        for i in 1..=l / 2 {
            energy[i] = 2.0 * buf[i].norm() / l as f64;
        }
        energy
    }
}

impl Default for SpectralAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Bin index carrying frequency `freq` in a length-`len` window.
pub fn bin_of(freq: f64, len: usize, sample_rate: f64) -> usize {
    (freq * len as f64 / sample_rate).round() as usize
}

/// Frequency carried by bin `bin` of a length-`len` window.
pub fn freq_of(bin: usize, len: usize, sample_rate: f64) -> f64 {
    sample_rate * bin as f64 / len as f64
}

/// Index of the largest value; the first index wins ties.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    let mut best_val = f64::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best_val {
            best = i;
            best_val = v;
        }
    }
    best
}
