use chirplink_core::bits::{format_bit_string, parse_bit_string};
use chirplink_core::{ModemConfig, Receiver, SymbolCodec, Transmitter};
use clap::{Args, Parser, Subcommand};
use hound::{SampleFormat, WavSpec};
use std::path::PathBuf;

/// Capture-buffer size used when streaming a WAV through the receiver,
/// standing in for the hardware buffer cadence of a live device.
const RECV_CHUNK: usize = 441;

#[derive(Parser)]
#[command(name = "chirplink")]
#[command(about = "Acoustic data modem: bit strings over audible multi-tone audio")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConfigArgs {
    /// Sample rate in Hz
    #[arg(long, default_value_t = 44100.0)]
    sample_rate: f64,

    /// Lower edge of the modulation spectrum in Hz
    #[arg(long, default_value_t = 1000.0)]
    low_freq: f64,

    /// Upper edge of the modulation spectrum in Hz
    #[arg(long, default_value_t = 17000.0)]
    high_freq: f64,

    /// Number of frequency bands (one tone each per symbol)
    #[arg(long, default_value_t = 10)]
    bands: usize,

    /// Tone state spacing within a band, in Hz
    #[arg(long, default_value_t = 140.0)]
    freq_step: f64,

    /// Symbol duration in seconds
    #[arg(long, default_value_t = 0.8)]
    symbol_duration: f64,

    /// Chirp preamble duration in seconds
    #[arg(long, default_value_t = 0.8)]
    preamble_duration: f64,

    /// Preamble detection cutoff (mean squared normalized error)
    #[arg(long, default_value_t = 0.1)]
    cutoff: f64,
}

impl ConfigArgs {
    fn to_config(&self) -> ModemConfig {
        ModemConfig {
            sample_rate: self.sample_rate,
            low_freq: self.low_freq,
            high_freq: self.high_freq,
            num_bands: self.bands,
            freq_step: self.freq_step,
            symbol_duration: self.symbol_duration,
            preamble_duration: self.preamble_duration,
            cutoff_variance: self.cutoff,
            ..ModemConfig::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Modulate an ASCII bit string file into a WAV file
    Send {
        /// Input file of '0'/'1' characters
        #[arg(value_name = "BITS.TXT")]
        input: PathBuf,

        /// Output WAV file
        #[arg(value_name = "OUTPUT.WAV")]
        output: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Demodulate a WAV file back into a bit string
    Recv {
        /// Input WAV file
        #[arg(value_name = "INPUT.WAV")]
        input: PathBuf,

        /// Where to write the recovered bit string (default: stdout)
        #[arg(short, long, value_name = "BITS.TXT")]
        output: Option<PathBuf>,

        #[command(flatten)]
        config: ConfigArgs,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Send {
            input,
            output,
            config,
        } => send_command(&input, &output, config.to_config()),
        Commands::Recv {
            input,
            output,
            config,
        } => recv_command(&input, output.as_deref(), config.to_config()),
    }
}

fn send_command(
    input: &PathBuf,
    output: &PathBuf,
    cfg: ModemConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(input)?;
    let bits = parse_bit_string(&text)?;
    println!("Read {} bits from {}", bits.len(), input.display());

    let mut tx = Transmitter::new(cfg, &bits)?;
    println!(
        "Transmission: {} samples ({:.2} s at {} Hz)",
        tx.total_samples(),
        tx.total_samples() as f64 / cfg.sample_rate,
        cfg.sample_rate
    );

    let spec = WavSpec {
        channels: 1,
        sample_rate: cfg.sample_rate as u32,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(output, spec)?;

    let mut buf = [0f32; 4096];
    loop {
        let n = tx.fill(&mut buf);
        for &sample in &buf[..n] {
            // Clamp before scaling so rounding can never overflow i16.
            let clamped = sample.clamp(-1.0, 1.0);
            writer.write_sample((clamped * 32767.0) as i16)?;
        }
        if n < buf.len() {
            break;
        }
    }
    writer.finalize()?;

    println!("Wrote waveform to {}", output.display());
    Ok(())
}

fn recv_command(
    input: &PathBuf,
    output: Option<&std::path::Path>,
    cfg: ModemConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut reader = hound::WavReader::open(input)?;
    let spec = reader.spec();
    if spec.sample_rate as f64 != cfg.sample_rate {
        return Err(format!(
            "WAV sample rate {} does not match configured {}",
            spec.sample_rate, cfg.sample_rate
        )
        .into());
    }

    let channels = spec.channels as usize;
    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .step_by(channels)
            .collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .step_by(channels)
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };
    println!("Read {} samples from {}", samples.len(), input.display());

    let mut rx = Receiver::new(cfg)?;
    let mut packet = None;
    for frames in samples.chunks(RECV_CHUNK) {
        if let Some(p) = rx.push_frames(frames)? {
            packet = Some(p);
            break;
        }
    }

    let packet = match packet {
        Some(p) => p,
        None => return Err("no packet recovered from the recording".into()),
    };
    println!(
        "Packet: {} payload symbols, modulo {}, checksum {}",
        packet.payload.len(),
        packet.modulo,
        if packet.checksum_ok { "ok" } else { "MISMATCH" }
    );

    let codec = SymbolCodec::new(cfg);
    let text = format_bit_string(&codec.unpack_bits(&packet.payload, packet.modulo));
    match output {
        Some(path) => {
            std::fs::write(path, &text)?;
            println!("Wrote {} bits to {}", text.len(), path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}
