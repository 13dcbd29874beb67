use clap::Parser;
use h4032l_lib::H4032L;
use h4032l_lib::acquisition::SampleSink;
use h4032l_lib::trigger::{TriggerCondition, TriggerMatch, TriggerStage};
use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{error, info};

/// Capture logic samples from a Hantek 4032L logic analyzer.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Sample rate in Hz, from the supported set (see --list)
    #[arg(long, default_value_t = 1_000_000)]
    rate: u64,

    /// Samples per channel, rounded up to a multiple of 512
    #[arg(long, default_value_t = 16384)]
    samples: u64,

    /// Percentage of samples captured before the trigger point (0-100)
    #[arg(long, default_value_t = 5)]
    capture_ratio: u64,

    /// Threshold voltage of channel group A
    #[arg(long, default_value_t = 2.5)]
    threshold_a: f64,

    /// Threshold voltage of channel group B
    #[arg(long, default_value_t = 2.5)]
    threshold_b: f64,

    /// Trigger conditions as channel=kind pairs, e.g. "A3=zero,B2=one,9=rising".
    /// Channels are A0-A15, B0-B15, or raw indices 0-31.
    #[arg(long)]
    trigger: Option<String>,

    /// Write raw little-endian sample words here instead of hex to stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// List supported sample rates and trigger match kinds, then exit
    #[arg(long)]
    list: bool,
}

/// Streams sample words to a raw file.
struct FileSink {
    writer: BufWriter<File>,
    samples: u64,
}

impl SampleSink for FileSink {
    fn logic(&mut self, samples: &[u32]) {
        for word in samples {
            if let Err(e) = self.writer.write_all(&word.to_le_bytes()) {
                error!("failed to write samples: {e}");
                return;
            }
        }
        self.samples += samples.len() as u64;
    }

    fn end_of_stream(&mut self) {
        if let Err(e) = self.writer.flush() {
            error!("failed to flush output: {e}");
        }
        info!("capture complete: {} samples", self.samples);
    }
}

/// Prints one sample word per line as hex.
struct HexSink {
    samples: u64,
}

impl SampleSink for HexSink {
    fn logic(&mut self, samples: &[u32]) {
        for word in samples {
            println!("{word:08x}");
        }
        self.samples += samples.len() as u64;
    }

    fn end_of_stream(&mut self) {
        info!("capture complete: {} samples", self.samples);
    }
}

/// Group A holds the even channel indices, group B the odd ones.
fn parse_channel(name: &str) -> Result<u8, String> {
    let err = || format!("bad channel '{name}', expected A0-A15, B0-B15 or 0-31");
    let (group, digits) = match name.split_at_checked(1) {
        Some(("A" | "a", rest)) => (0, rest),
        Some(("B" | "b", rest)) => (1, rest),
        _ => return name.parse().map_err(|_| err()),
    };
    let index: u8 = digits.parse().map_err(|_| err())?;
    if index > 15 {
        return Err(err());
    }
    Ok(index * 2 + group)
}

fn parse_trigger(spec: &str) -> Result<TriggerStage, String> {
    let mut stage = TriggerStage::default();
    for part in spec.split(',') {
        let (channel, kind) = part
            .split_once('=')
            .ok_or_else(|| format!("bad trigger condition '{part}', expected channel=kind"))?;
        let channel = parse_channel(channel.trim())?;
        let kind = match kind.trim() {
            "zero" | "0" => TriggerMatch::Zero,
            "one" | "1" => TriggerMatch::One,
            "rising" | "r" => TriggerMatch::Rising,
            "falling" | "f" => TriggerMatch::Falling,
            "edge" | "e" => TriggerMatch::Edge,
            other => return Err(format!("unknown trigger match kind '{other}'")),
        };
        stage.conditions.push(TriggerCondition { channel, kind });
    }
    Ok(stage)
}


#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    if args.list {
        println!("Supported sample rates (Hz):");
        for rate in H4032L::supported_sample_rates() {
            println!("  {rate}");
        }
        println!("Trigger match kinds:");
        for kind in H4032L::trigger_matches() {
            println!("  {kind}");
        }
        return Ok(());
    }

    let mut device = H4032L::new().await?;
    println!("Connected to Hantek 4032L");

    device.set_sample_rate(args.rate)?;
    device.set_sample_count(args.samples)?;
    device.set_capture_ratio(args.capture_ratio)?;
    device.set_threshold_voltages(args.threshold_a, args.threshold_b);
    if let Some(spec) = &args.trigger {
        device.set_trigger(vec![parse_trigger(spec)?]);
    }

    info!(
        "capturing {} samples at {} Hz",
        device.sample_count(),
        device.sample_rate()
    );

    // Ctrl-C cancels the in-flight transfer and returns the device to idle.
    let stop = device.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("stopping acquisition");
            stop.stop();
        }
    });

    let mut sink: Box<dyn SampleSink> = match &args.output {
        Some(path) => Box::new(FileSink {
            writer: BufWriter::new(File::create(path)?),
            samples: 0,
        }),
        None => Box::new(HexSink { samples: 0 }),
    };

    device.acquire(&mut *sink).await?;
    Ok(())
}
