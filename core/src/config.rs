use crate::error::{ModemError, Result};

/// Modem parameters shared by the transmit and receive paths.
///
/// Constructed once, validated with [`ModemConfig::validate`], and passed
/// by value to every component. Both ends of a link must use identical
/// values or symbols will not line up on the tone grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModemConfig {
    /// Sample rate in Hz.
    pub sample_rate: f64,
    /// Lower edge of the modulation spectrum in Hz.
    pub low_freq: f64,
    /// Upper edge of the modulation spectrum in Hz (exclusive).
    pub high_freq: f64,
    /// Number of disjoint frequency bands, one tone per band per symbol.
    pub num_bands: usize,
    /// Spacing between adjacent tone states within a band, in Hz.
    pub freq_step: f64,
    /// Duration of one symbol in seconds.
    pub symbol_duration: f64,
    /// Guard trimmed from each edge of a symbol window before analysis,
    /// in seconds. Absorbs timing error from the preamble lock.
    pub symbol_gap: f64,
    /// Chirp start frequency in Hz.
    pub preamble_start_freq: f64,
    /// Chirp final frequency in Hz.
    pub preamble_final_freq: f64,
    /// Chirp duration in seconds.
    pub preamble_duration: f64,
    /// Number of sub-windows the detector slices the preamble into.
    pub slice_count: usize,
    /// Duration of one detector slice in seconds.
    pub slice_duration: f64,
    /// Guard trimmed from each edge of a detector slice, in seconds.
    pub slice_inner: f64,
    /// Silence between the end of the chirp and the first symbol,
    /// in seconds.
    pub lead_silence: f64,
    /// Detection threshold: mean squared normalized frequency error
    /// below which the preamble is declared present.
    pub cutoff_variance: f64,
    /// Width of the packet length field, in symbols.
    pub len_field_width: usize,
    /// Width of the packet checksum field, in symbols.
    pub checksum_width: usize,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            low_freq: 1000.0,
            high_freq: 17000.0,
            num_bands: 10,
            freq_step: 140.0,
            symbol_duration: 0.8,
            symbol_gap: 0.02,
            preamble_start_freq: 1000.0,
            preamble_final_freq: 5000.0,
            preamble_duration: 0.8,
            slice_count: 10,
            slice_duration: 0.04,
            slice_inner: 0.01,
            lead_silence: 0.5,
            cutoff_variance: 0.1,
            len_field_width: 2,
            checksum_width: 1,
        }
    }
}

impl ModemConfig {
    /// Width of one frequency band in Hz.
    pub fn band_width(&self) -> f64 {
        (self.high_freq - self.low_freq) / self.num_bands as f64
    }

    /// Number of discrete tone states per band.
    pub fn states_per_band(&self) -> u128 {
        (self.band_width() / self.freq_step).floor() as u128
    }

    /// Total symbol alphabet size, `states_per_band ^ num_bands`.
    /// `None` when the product does not fit in a `u128`.
    pub fn alphabet_size(&self) -> Option<u128> {
        let radix = self.states_per_band();
        let mut size: u128 = 1;
        for _ in 0..self.num_bands {
            size = size.checked_mul(radix)?;
        }
        Some(size)
    }

    /// Raw bits carried per symbol.
    ///
    /// The alphabet is rounded down to the nearest power of two so a
    /// whole number of bits maps onto each symbol; the residual state
    /// space above `2^bits_per_symbol` is deliberately left unused.
    pub fn bits_per_symbol(&self) -> usize {
        match self.alphabet_size() {
            Some(size) if size > 1 => (127 - size.leading_zeros()) as usize,
            _ => 0,
        }
    }

    /// Linear chirp sweep rate in Hz per second.
    pub fn chirp_rate(&self) -> f64 {
        (self.preamble_final_freq - self.preamble_start_freq) / self.preamble_duration
    }

    pub fn samples_per_symbol(&self) -> usize {
        (self.symbol_duration * self.sample_rate).ceil() as usize
    }

    pub fn gap_samples(&self) -> usize {
        (self.symbol_gap * self.sample_rate).ceil() as usize
    }

    pub fn preamble_samples(&self) -> usize {
        (self.preamble_duration * self.sample_rate).ceil() as usize
    }

    pub fn lead_silence_samples(&self) -> usize {
        (self.lead_silence * self.sample_rate).ceil() as usize
    }

    pub fn slice_samples(&self) -> usize {
        (self.slice_duration * self.sample_rate).ceil() as usize
    }

    pub fn slice_inner_samples(&self) -> usize {
        (self.slice_inner * self.sample_rate).ceil() as usize
    }

    /// Samples that must be buffered before preamble detection can run.
    pub fn detect_window_samples(&self) -> usize {
        self.preamble_samples().max(2 * self.samples_per_symbol())
    }

    /// Receive ring capacity: the detection window with generous
    /// headroom so symbol extraction can trail the live tail.
    pub fn ring_capacity(&self) -> usize {
        self.detect_window_samples() * 10
    }

    /// Check that the parameters describe a physically workable link.
    ///
    /// Errors here are fatal at startup; nothing should be transmitted
    /// or captured with a configuration that fails validation.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(ModemError::InvalidConfig(msg));

        if self.sample_rate <= 0.0 {
            return fail(format!("sample rate {} must be positive", self.sample_rate));
        }
        if self.num_bands == 0 {
            return fail("at least one frequency band is required".into());
        }
        if self.high_freq <= self.low_freq {
            return fail(format!(
                "spectrum [{}, {}) is empty",
                self.low_freq, self.high_freq
            ));
        }
        if self.high_freq > self.sample_rate / 2.0 {
            return fail(format!(
                "high frequency {} exceeds Nyquist limit {}",
                self.high_freq,
                self.sample_rate / 2.0
            ));
        }
        if self.freq_step <= 0.0 {
            return fail(format!("frequency step {} must be positive", self.freq_step));
        }
        if self.symbol_duration <= 0.0 || self.preamble_duration <= 0.0 {
            return fail("symbol and preamble durations must be positive".into());
        }
        if self.symbol_gap < 0.0 || 2.0 * self.symbol_gap >= self.symbol_duration {
            return fail(format!(
                "symbol gap {} leaves no analysis window inside a {} s symbol",
                self.symbol_gap, self.symbol_duration
            ));
        }
        // The finest frequency difference resolvable from a window of
        // t seconds is 1/t; the trimmed symbol window must still
        // discriminate adjacent tone states.
        let analysis_window = self.symbol_duration - 2.0 * self.symbol_gap;
        if 1.0 / analysis_window > self.freq_step {
            return fail(format!(
                "frequency step {} Hz is below the {:.2} Hz resolution of a {:.3} s window",
                self.freq_step,
                1.0 / analysis_window,
                analysis_window
            ));
        }
        if self.states_per_band() < 2 {
            return fail(format!(
                "band width {:.1} Hz holds fewer than two {} Hz states",
                self.band_width(),
                self.freq_step
            ));
        }
        let bits = match self.alphabet_size() {
            Some(_) => self.bits_per_symbol(),
            None => {
                return fail(format!(
                    "alphabet {}^{} exceeds the 128-bit symbol type",
                    self.states_per_band(),
                    self.num_bands
                ))
            }
        };
        if bits < 1 {
            return fail("symbol alphabet carries no bits".into());
        }
        if self.len_field_width == 0 || self.checksum_width == 0 {
            return fail("length and checksum fields must be at least one symbol wide".into());
        }
        if bits * self.len_field_width > 128 {
            return fail(format!(
                "length field spans {} bits, beyond the 128-bit accumulator",
                bits * self.len_field_width
            ));
        }
        if bits * self.checksum_width > 128 {
            return fail(format!(
                "checksum field spans {} bits, beyond the 128-bit accumulator",
                bits * self.checksum_width
            ));
        }
        if self.preamble_final_freq <= self.preamble_start_freq {
            return fail(format!(
                "chirp must sweep upward, got {} -> {}",
                self.preamble_start_freq, self.preamble_final_freq
            ));
        }
        if self.preamble_final_freq > self.sample_rate / 2.0 {
            return fail(format!(
                "chirp final frequency {} exceeds Nyquist limit {}",
                self.preamble_final_freq,
                self.sample_rate / 2.0
            ));
        }
        if self.slice_count == 0 {
            return fail("at least one detector slice is required".into());
        }
        if self.slice_count as f64 * self.slice_duration > self.preamble_duration {
            return fail(format!(
                "{} slices of {} s overrun the {} s preamble",
                self.slice_count, self.slice_duration, self.preamble_duration
            ));
        }
        if self.slice_inner < 0.0 || 2.0 * self.slice_inner >= self.slice_duration {
            return fail(format!(
                "slice guard {} leaves no analysis window inside a {} s slice",
                self.slice_inner, self.slice_duration
            ));
        }
        if self.lead_silence < 0.0 {
            return fail("lead silence cannot be negative".into());
        }
        if self.cutoff_variance <= 0.0 {
            return fail(format!(
                "detection cutoff {} must be positive",
                self.cutoff_variance
            ));
        }
        Ok(())
    }
}
