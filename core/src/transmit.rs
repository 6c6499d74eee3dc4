use crate::config::ModemConfig;
use crate::error::{ModemError, Result};
use crate::packet::frame_symbols;
use crate::preamble::chirp_samples;
use crate::symbol::SymbolCodec;
use log::info;
use std::f64::consts::PI;

/// Pull-based waveform source for one transmission.
///
/// The sample stream is chirp preamble, then lead silence, then one
/// multi-tone waveform per packet symbol. A sink drains it through
/// [`Transmitter::fill`]; a short (eventually zero) write signals end
/// of stream. Generation is a pure function of the running sample
/// offset, so filling never blocks and allocates only the one-symbol
/// frequency cache.
pub struct Transmitter {
    cfg: ModemConfig,
    codec: SymbolCodec,
    symbols: Vec<u128>,
    preamble: Vec<f64>,
    offset: usize,
    cached_tones: Option<(usize, Vec<f64>)>,
}

impl Transmitter {
    /// Frame `bits` into a packet and prepare the waveform.
    pub fn new(cfg: ModemConfig, bits: &[bool]) -> Result<Self> {
        cfg.validate()?;
        if bits.is_empty() {
            return Err(ModemError::EmptyMessage);
        }
        let codec = SymbolCodec::new(cfg);
        let (payload, modulo) = codec.pack_bits(bits);
        let symbols = frame_symbols(&cfg, &payload, modulo)?;
        info!(
            "transmitting {} bits as {} payload symbols ({} bits/symbol, modulo {})",
            bits.len(),
            payload.len(),
            cfg.bits_per_symbol(),
            modulo
        );
        Ok(Self {
            cfg,
            codec,
            symbols,
            preamble: chirp_samples(&cfg),
            offset: 0,
            cached_tones: None,
        })
    }

    /// Total length of the transmission in samples.
    pub fn total_samples(&self) -> usize {
        self.preamble.len()
            + self.cfg.lead_silence_samples()
            + self.symbols.len() * self.cfg.samples_per_symbol()
    }

    /// Samples generated so far.
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Fill `buf` with the next samples; returns how many were written.
    /// Fewer than `buf.len()` (including zero) means end of stream.
    pub fn fill(&mut self, buf: &mut [f32]) -> usize {
        let mut written = 0;
        while written < buf.len() {
            match self.sample_at(self.offset) {
                Some(sample) => {
                    buf[written] = sample as f32;
                    written += 1;
                    self.offset += 1;
                }
                None => break,
            }
        }
        written
    }

    fn sample_at(&mut self, n: usize) -> Option<f64> {
        let preamble_len = self.preamble.len();
        if n < preamble_len {
            return Some(self.preamble[n]);
        }
        let silence_len = self.cfg.lead_silence_samples();
        if n < preamble_len + silence_len {
            return Some(0.0);
        }

        let sps = self.cfg.samples_per_symbol();
        let data_offset = n - preamble_len - silence_len;
        let sym_idx = data_offset / sps;
        if sym_idx >= self.symbols.len() {
            return None;
        }
        let frame = data_offset % sps;

        // Tone frequencies are recomputed once per symbol, not per sample.
        let fresh = match &self.cached_tones {
            Some((cached_idx, _)) => *cached_idx != sym_idx,
            None => true,
        };
        if fresh {
            let tones = self.codec.tone_frequencies(self.symbols[sym_idx]);
            self.cached_tones = Some((sym_idx, tones));
        }
        let (_, tones) = self.cached_tones.as_ref().unwrap();

        let t = frame as f64 / self.cfg.sample_rate;
        let sum: f64 = tones.iter().map(|f| (2.0 * PI * f * t).sin()).sum();
        Some(sum / self.cfg.num_bands as f64)
    }
}
