use crate::config::ModemConfig;
use crate::error::{ModemError, Result};
use crate::packet::{Packet, PacketAssembler};
use crate::preamble::PreambleDetector;
use crate::ring::RingBuffer;
use crate::spectrum::SpectralAnalyzer;
use crate::symbol::SymbolCodec;
use log::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    /// Accumulating samples, watching for the chirp.
    Idle,
    /// Locked; decoding symbols as they arrive.
    Receiving,
    /// A packet was delivered; the session is over.
    Done,
}

/// One-shot receive session.
///
/// The capture side pushes every hardware buffer through
/// [`Receiver::push_frames`]; all work — ring writes, preamble
/// evaluation, symbol decode, packet assembly — happens inline in that
/// call, on the caller's thread. Nothing here blocks or waits, so the
/// callback stays inside a real-time budget; if the caller falls
/// behind, the ring drops the oldest samples rather than stalling the
/// audio thread.
pub struct Receiver {
    cfg: ModemConfig,
    ring: RingBuffer,
    analyzer: SpectralAnalyzer,
    detector: PreambleDetector,
    codec: SymbolCodec,
    assembler: PacketAssembler,
    phase: Phase,
    frames_seen: usize,
    frames_since_lock: i64,
    symbols_read: usize,
}

impl Receiver {
    pub fn new(cfg: ModemConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            ring: RingBuffer::new(cfg.ring_capacity()),
            analyzer: SpectralAnalyzer::new(),
            detector: PreambleDetector::new(cfg),
            codec: SymbolCodec::new(cfg),
            assembler: PacketAssembler::new(cfg),
            phase: Phase::Idle,
            frames_seen: 0,
            frames_since_lock: 0,
            symbols_read: 0,
        })
    }

    /// Whether the preamble has been detected.
    pub fn is_locked(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Feed one captured buffer. Returns the completed packet exactly
    /// once; afterwards the session ignores further input.
    pub fn push_frames(&mut self, frames: &[f32]) -> Result<Option<Packet>> {
        if frames.len() > self.ring.capacity() {
            return Err(ModemError::InsufficientData {
                requested: frames.len(),
                available: self.ring.capacity(),
            });
        }
        for &f in frames {
            self.ring.write(f as f64);
        }

        match self.phase {
            Phase::Done => Ok(None),
            Phase::Idle => {
                self.frames_seen += frames.len();
                if self.frames_seen >= self.cfg.detect_window_samples() {
                    if let Some(lock) = self.detector.evaluate(&self.ring, &mut self.analyzer)? {
                        // Seed the counter with the measured timing
                        // offset so symbol windows line up with the
                        // true chirp end, not wherever this capture
                        // buffer happened to land.
                        self.frames_since_lock =
                            (lock.time_shift * self.cfg.sample_rate).round() as i64;
                        self.phase = Phase::Receiving;
                        self.symbols_read = 0;
                        info!(
                            "lock acquired after {} frames, counter seeded at {}",
                            self.frames_seen, self.frames_since_lock
                        );
                    }
                }
                Ok(None)
            }
            Phase::Receiving => {
                self.frames_since_lock += frames.len() as i64;
                self.drain_symbols()
            }
        }
    }

    /// Decode every symbol that has fully arrived since the last call.
    fn drain_symbols(&mut self) -> Result<Option<Packet>> {
        let silence = self.cfg.lead_silence_samples() as i64;
        if self.frames_since_lock <= silence {
            return Ok(None);
        }
        let effective = (self.frames_since_lock - silence) as usize;
        let sps = self.cfg.samples_per_symbol();
        let gap = self.cfg.gap_samples();
        let pending = effective / sps;
        let leftover = effective % sps;

        while self.symbols_read < pending {
            let back = gap + leftover + (pending - self.symbols_read - 1) * sps;
            let window = self.ring.window(back, sps - 2 * gap)?;
            let symbol = self.codec.decode_window(&mut self.analyzer, &window)?;
            debug!("symbol {}: {}", self.symbols_read, symbol);
            self.symbols_read += 1;

            if let Some(packet) = self.assembler.push(symbol)? {
                self.phase = Phase::Done;
                return Ok(Some(packet));
            }
        }
        Ok(None)
    }
}
