use crate::config::ModemConfig;
use crate::error::{ModemError, Result};
use log::{info, warn};

/// Upper bound on the packet length field; anything larger is treated
/// as a corrupt header rather than an allocation request.
const MAX_PACKET_SYMBOLS: u128 = 1 << 16;

/// Order-sensitive checksum over payload symbols: the XOR of
/// `index · symbol` with a 0-based index and wrapping multiply.
///
/// This is a transmission-integrity hint, not a cryptographic hash.
/// Known weakness: the symbol at index 0 contributes nothing to the
/// product, so a flip there goes undetected.
pub fn checksum(payload: &[u128]) -> u128 {
    payload
        .iter()
        .enumerate()
        .fold(0, |acc, (i, &sym)| acc ^ (i as u128).wrapping_mul(sym))
}

/// Checksum truncated to the bits that fit the transmitted field.
pub fn masked_checksum(payload: &[u128], field_bits: usize) -> u128 {
    checksum(payload) & mask(field_bits)
}

fn mask(bits: usize) -> u128 {
    if bits >= 128 {
        u128::MAX
    } else {
        (1u128 << bits) - 1
    }
}

/// A fully assembled packet.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    /// Value of the length field: payload symbols + 1 (modulo field)
    /// + checksum field width.
    pub length: usize,
    /// Data bits occupying the final payload symbol (0 = all of them).
    pub modulo: usize,
    /// Checksum as received.
    pub checksum: u128,
    /// Payload symbols in arrival order.
    pub payload: Vec<u128>,
    /// Whether the received checksum matches the payload. A mismatch is
    /// a soft failure: the payload is still delivered, flagged untrusted.
    pub checksum_ok: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    AwaitingLead,
    ReadingLength,
    ReadingModulo,
    ReadingChecksum,
    ReadingPayload,
    Complete,
}

/// Interprets a growing sequence of decoded symbols as a framed packet.
///
/// Synchronization self-correction: a preamble lock that fires one
/// symbol period early makes the first decoded symbol garbage. The
/// first effective symbol of a real packet is always zero (the length
/// field's high digits are zero for any sane payload), so a non-zero
/// first symbol is discarded by advancing an offset instead of
/// rewinding anything. A length field that reads as all zeros is the
/// same mistake one symbol later and advances the offset again.
pub struct PacketAssembler {
    cfg: ModemConfig,
    state: State,
    seen: usize,
    discard: usize,
    length_acc: u128,
    length: usize,
    modulo: usize,
    checksum_syms: Vec<u128>,
    payload: Vec<u128>,
}

impl PacketAssembler {
    pub fn new(cfg: ModemConfig) -> Self {
        Self {
            cfg,
            state: State::AwaitingLead,
            seen: 0,
            discard: 0,
            length_acc: 0,
            length: 0,
            modulo: 0,
            checksum_syms: Vec::new(),
            payload: Vec::new(),
        }
    }

    /// Symbols discarded by the spurious-lock self-correction.
    pub fn discard_offset(&self) -> usize {
        self.discard
    }

    /// Feed one decoded symbol; returns the packet when it completes.
    pub fn push(&mut self, symbol: u128) -> Result<Option<Packet>> {
        if self.state == State::Complete {
            return Ok(None);
        }
        self.seen += 1;
        let idx = self.seen - self.discard;
        let bps = self.cfg.bits_per_symbol();
        let len_width = self.cfg.len_field_width;
        let checksum_width = self.cfg.checksum_width;

        match self.state {
            State::AwaitingLead => {
                if symbol != 0 {
                    warn!("discarding spurious lead symbol {}", symbol);
                    self.discard += 1;
                    return Ok(None);
                }
                self.state = State::ReadingLength;
                self.length_acc = symbol;
                if idx == len_width {
                    self.finish_length()?;
                }
                Ok(None)
            }
            State::ReadingLength => {
                self.length_acc = (self.length_acc << bps) | symbol;
                if idx == len_width {
                    self.finish_length()?;
                }
                Ok(None)
            }
            State::ReadingModulo => {
                if symbol >= bps as u128 {
                    return Err(ModemError::MalformedModulo(symbol));
                }
                self.modulo = symbol as usize;
                self.state = State::ReadingChecksum;
                Ok(None)
            }
            State::ReadingChecksum => {
                self.checksum_syms.push(symbol);
                if self.checksum_syms.len() == checksum_width {
                    self.state = State::ReadingPayload;
                }
                Ok(None)
            }
            State::ReadingPayload => {
                self.payload.push(symbol);
                let expected_payload = self.length - 1 - checksum_width;
                if self.payload.len() == expected_payload {
                    self.state = State::Complete;
                    return Ok(Some(self.assemble()));
                }
                Ok(None)
            }
            State::Complete => Ok(None),
        }
    }

    fn finish_length(&mut self) -> Result<()> {
        if self.length_acc == 0 {
            // A zero length field means the lock swallowed one more
            // leading-zero symbol; slide the frame by one.
            warn!("length field is zero, advancing discard offset");
            self.discard += 1;
            // length_acc keeps rolling: the next symbol shifts in and
            // the width check fires again.
            return Ok(());
        }
        let min = 2 + self.cfg.checksum_width as u128;
        if self.length_acc < min || self.length_acc > MAX_PACKET_SYMBOLS {
            return Err(ModemError::MalformedLength(self.length_acc));
        }
        self.length = self.length_acc as usize;
        self.state = State::ReadingModulo;
        Ok(())
    }

    fn assemble(&self) -> Packet {
        let bps = self.cfg.bits_per_symbol();
        let field_bits = bps * self.cfg.checksum_width;
        let received = self
            .checksum_syms
            .iter()
            .fold(0u128, |acc, &sym| (acc << bps) | sym);
        let computed = masked_checksum(&self.payload, field_bits);
        let checksum_ok = received == computed;
        if checksum_ok {
            info!(
                "packet complete: {} payload symbols, modulo {}",
                self.payload.len(),
                self.modulo
            );
        } else {
            warn!(
                "packet checksum mismatch: received {:#x}, computed {:#x}",
                received, computed
            );
        }
        Packet {
            length: self.length,
            modulo: self.modulo,
            checksum: received,
            payload: self.payload.clone(),
            checksum_ok,
        }
    }
}

/// Lay out the full symbol sequence for a payload: length field,
/// modulo, checksum, then the payload itself.
pub fn frame_symbols(cfg: &ModemConfig, payload: &[u128], modulo: usize) -> Result<Vec<u128>> {
    let bps = cfg.bits_per_symbol();
    let len_width = cfg.len_field_width;
    let checksum_width = cfg.checksum_width;

    let length = (payload.len() + 1 + checksum_width) as u128;
    let field_capacity_bits = bps * len_width;
    if field_capacity_bits < 128 && length >> field_capacity_bits != 0 {
        return Err(ModemError::MessageTooLong);
    }
    if length > MAX_PACKET_SYMBOLS {
        return Err(ModemError::MessageTooLong);
    }

    let sym_mask = mask(bps);
    let mut symbols = Vec::with_capacity(len_width + 1 + checksum_width + payload.len());
    for i in (0..len_width).rev() {
        symbols.push((length >> (bps * i)) & sym_mask);
    }
    symbols.push(modulo as u128);
    let cs = masked_checksum(payload, bps * checksum_width);
    for i in (0..checksum_width).rev() {
        symbols.push((cs >> (bps * i)) & sym_mask);
    }
    symbols.extend_from_slice(payload);
    Ok(symbols)
}
