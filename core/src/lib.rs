//! Acoustic data modem library
//!
//! Turns a bit string into an audible multi-tone waveform and recovers
//! it from a live capture: a linear chirp preamble locates the
//! transmission start, then each symbol period carries one tone per
//! frequency band, decoded in the frequency domain and reassembled
//! into a length-prefixed, checksummed packet.

pub mod bits;
pub mod config;
pub mod error;
pub mod packet;
pub mod preamble;
pub mod receive;
pub mod ring;
pub mod spectrum;
pub mod symbol;
pub mod transmit;

pub use config::ModemConfig;
pub use error::{ModemError, Result};
pub use packet::Packet;
pub use receive::Receiver;
pub use symbol::SymbolCodec;
pub use transmit::Transmitter;
