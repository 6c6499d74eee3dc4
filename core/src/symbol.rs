use crate::config::ModemConfig;
use crate::error::{ModemError, Result};
use crate::spectrum::{argmax, freq_of, SpectralAnalyzer};
use std::f64::consts::PI;

/// Tone-grid symbol codec.
///
/// A symbol is a base-`states_per_band` number with one digit per
/// frequency band: band 0 holds the least significant digit. Digit `s`
/// of band `k` is transmitted as a tone at
/// `low_freq + k · band_width + s · freq_step`, and every band sounds
/// simultaneously, so one symbol is a stack of `num_bands` sines.
pub struct SymbolCodec {
    cfg: ModemConfig,
}

impl SymbolCodec {
    pub fn new(cfg: ModemConfig) -> Self {
        Self { cfg }
    }

    /// The tone frequency for each band of `symbol`, band 0 first.
    pub fn tone_frequencies(&self, symbol: u128) -> Vec<f64> {
        let cfg = &self.cfg;
        let radix = cfg.states_per_band();
        let band_width = cfg.band_width();
        let mut rest = symbol;
        (0..cfg.num_bands)
            .map(|k| {
                let state = rest % radix;
                rest /= radix;
                cfg.low_freq + k as f64 * band_width + state as f64 * cfg.freq_step
            })
            .collect()
    }

    /// Time-domain waveform of one full symbol period.
    ///
    /// The tone stack is scaled by `1/num_bands` so the sum always stays
    /// within ±1.0.
    pub fn waveform(&self, symbol: u128) -> Vec<f64> {
        let freqs = self.tone_frequencies(symbol);
        let fs = self.cfg.sample_rate;
        let scale = 1.0 / self.cfg.num_bands as f64;
        (0..self.cfg.samples_per_symbol())
            .map(|n| {
                let t = n as f64 / fs;
                freqs.iter().map(|f| (2.0 * PI * f * t).sin()).sum::<f64>() * scale
            })
            .collect()
    }

    /// Recover a symbol from a sample window.
    ///
    /// Each band's sub-spectrum is searched for its peak, offset down by
    /// half a `freq_step` so the quantization cells are centered on the
    /// tone grid; the peak frequency rounds to the nearest state. Bands
    /// are folded highest first, mirroring the positional layout of
    /// [`SymbolCodec::tone_frequencies`].
    pub fn decode_window(
        &self,
        analyzer: &mut SpectralAnalyzer,
        window: &[f64],
    ) -> Result<u128> {
        let cfg = &self.cfg;
        let energy = analyzer.energy(window);
        let l = window.len();
        let fs = cfg.sample_rate;
        let radix = cfg.states_per_band();
        let band_width = cfg.band_width();
        let guard = cfg.freq_step / 2.0;

        let mut symbol: u128 = 0;
        for k in (0..cfg.num_bands).rev() {
            let band_start = cfg.low_freq + k as f64 * band_width;
            let lo = ((band_start - guard) * l as f64 / fs) as usize;
            let hi = (((band_start + band_width - guard) * l as f64 / fs) as usize)
                .min(energy.len());
            if lo >= hi {
                return Err(ModemError::InsufficientData {
                    requested: hi + 1,
                    available: energy.len(),
                });
            }
            let peak = freq_of(lo + argmax(&energy[lo..hi]), l, fs);
            let state = ((peak - band_start) / cfg.freq_step).round() as i64;
            let state = state.clamp(0, radix as i64 - 1) as u128;
            symbol = symbol * radix + state;
        }
        Ok(symbol)
    }

    /// Pack a bit string into symbols, `bits_per_symbol` bits each,
    /// MSB first. The final group is zero-padded on the right; the
    /// returned modulo is `bits.len() % bits_per_symbol`, the number of
    /// data bits occupying the final symbol (0 = fully occupied).
    pub fn pack_bits(&self, bits: &[bool]) -> (Vec<u128>, usize) {
        let bps = self.cfg.bits_per_symbol();
        let mut symbols = Vec::with_capacity(bits.len().div_ceil(bps));
        for chunk in bits.chunks(bps) {
            let mut sym: u128 = 0;
            for &bit in chunk {
                sym = (sym << 1) | bit as u128;
            }
            sym <<= bps - chunk.len();
            symbols.push(sym);
        }
        (symbols, bits.len() % bps)
    }

    /// Inverse of [`SymbolCodec::pack_bits`]: expand symbols back into
    /// bits and strip the final symbol's padding per `modulo`.
    pub fn unpack_bits(&self, symbols: &[u128], modulo: usize) -> Vec<bool> {
        let bps = self.cfg.bits_per_symbol();
        if symbols.is_empty() {
            return Vec::new();
        }
        let bit_len = bps * symbols.len() - (bps - modulo) % bps;
        let mut bits = Vec::with_capacity(bit_len);
        'outer: for &sym in symbols {
            for j in 0..bps {
                if bits.len() == bit_len {
                    break 'outer;
                }
                bits.push((sym >> (bps - 1 - j)) & 1 == 1);
            }
        }
        bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::parse_bit_string;

    /// Band layout from the reference modulation scenario:
    /// [500 Hz, 18000 Hz), 10 bands, 140 Hz steps -> 12 states per
    /// band, 35 bits per symbol.
    fn scenario_config() -> ModemConfig {
        ModemConfig {
            low_freq: 500.0,
            high_freq: 18000.0,
            symbol_duration: 0.1,
            ..ModemConfig::default()
        }
    }

    #[test]
    fn test_tone_frequencies_follow_the_grid() {
        let cfg = scenario_config();
        let codec = SymbolCodec::new(cfg);
        let radix = cfg.states_per_band();

        // Symbol 0: every band at its base frequency.
        let freqs = codec.tone_frequencies(0);
        assert_eq!(freqs.len(), 10);
        for (k, &f) in freqs.iter().enumerate() {
            assert_eq!(f, 500.0 + k as f64 * 1750.0);
        }

        // Digit d in band 0 moves only the first tone, d steps up.
        let freqs = codec.tone_frequencies(5);
        assert_eq!(freqs[0], 500.0 + 5.0 * 140.0);
        assert_eq!(freqs[1], 2250.0);

        // Digit in band 1 is worth one radix.
        let freqs = codec.tone_frequencies(3 * radix);
        assert_eq!(freqs[0], 500.0);
        assert_eq!(freqs[1], 2250.0 + 3.0 * 140.0);
    }

    #[test]
    fn test_waveform_stays_in_range() {
        let cfg = scenario_config();
        let codec = SymbolCodec::new(cfg);
        let wave = codec.waveform(123_456_789);
        assert_eq!(wave.len(), cfg.samples_per_symbol());
        assert!(wave.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn test_symbol_round_trip_through_spectrum() {
        let cfg = scenario_config();
        cfg.validate().unwrap();
        let codec = SymbolCodec::new(cfg);
        let mut analyzer = SpectralAnalyzer::new();
        let gap = cfg.gap_samples();
        let sps = cfg.samples_per_symbol();

        let max = (1u128 << cfg.bits_per_symbol()) - 1;
        for symbol in [0u128, 1, 5, 4095, max / 3, max - 1, max] {
            let wave = codec.waveform(symbol);
            // Decode over the gap-trimmed interior, as the receiver does.
            let decoded = codec
                .decode_window(&mut analyzer, &wave[gap..sps - gap])
                .unwrap();
            assert_eq!(decoded, symbol, "round trip failed for {}", symbol);
        }
    }

    #[test]
    fn test_decode_mirrors_encode_peel_order() {
        // One step in band 0 must change the least significant digit.
        let cfg = scenario_config();
        let codec = SymbolCodec::new(cfg);
        let mut analyzer = SpectralAnalyzer::new();
        let gap = cfg.gap_samples();
        let sps = cfg.samples_per_symbol();

        let wave = codec.waveform(1);
        let decoded = codec
            .decode_window(&mut analyzer, &wave[gap..sps - gap])
            .unwrap();
        assert_eq!(decoded, 1);
    }

    #[test]
    fn test_pack_bits_scenario() {
        let cfg = scenario_config();
        let codec = SymbolCodec::new(cfg);
        assert_eq!(cfg.bits_per_symbol(), 35);

        let bits = parse_bit_string("1010110011").unwrap();
        let (symbols, modulo) = codec.pack_bits(&bits);
        assert_eq!(symbols.len(), 1);
        assert_eq!(modulo, 10 % 35);
        // MSB-first, zero-padded on the right to 35 bits.
        assert_eq!(symbols[0], 0b1010110011 << 25);

        let unpacked = codec.unpack_bits(&symbols, modulo);
        assert_eq!(unpacked, bits);
    }

    #[test]
    fn test_pack_bits_multi_symbol() {
        let cfg = scenario_config();
        let codec = SymbolCodec::new(cfg);
        let bps = cfg.bits_per_symbol();

        // 83 bits: two full symbols and a 13-bit tail.
        let bits: Vec<bool> = (0..83).map(|i| i % 3 == 0).collect();
        let (symbols, modulo) = codec.pack_bits(&bits);
        assert_eq!(symbols.len(), 3);
        assert_eq!(modulo, 83 % bps);
        assert_eq!(codec.unpack_bits(&symbols, modulo), bits);
    }

    #[test]
    fn test_pack_bits_exact_multiple() {
        // A message that exactly fills its symbols has modulo 0 and no
        // padding to strip.
        let cfg = scenario_config();
        let codec = SymbolCodec::new(cfg);
        let bps = cfg.bits_per_symbol();

        let bits: Vec<bool> = (0..2 * bps).map(|i| i % 2 == 1).collect();
        let (symbols, modulo) = codec.pack_bits(&bits);
        assert_eq!(symbols.len(), 2);
        assert_eq!(modulo, 0);
        assert_eq!(codec.unpack_bits(&symbols, modulo), bits);
    }
}
