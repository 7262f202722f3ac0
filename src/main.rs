//! annwire CLI.
//!
//! - `run`: drive a full dataset through the data plane per a JSON config
//! - `monitor`: print every decoded ANN frame seen on an interface
//! - `inject`: hand-craft and transmit stimulus frames
//! - `mask`: compute the expected-stimuli register bitmask for a neuron set
//! - `interfaces`: enumerate host network interfaces

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use annwire::capture::CaptureMux;
use annwire::protocol::{AnnFrame, WireLayout, STIMULUS_NEURON_ID};
use annwire::transport::{interface_names, DatalinkTx, StimulusPort};
use annwire::{AnnwireError, Harness, HarnessConfig, Result};

#[derive(Parser, Debug)]
#[command(name = "annwire")]
#[command(author, version, about = "Stimulus/response harness for a P4 ANN data plane")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full harness over a dataset.
    Run {
        /// Path to the JSON harness configuration.
        #[arg(short, long)]
        config: PathBuf,

        /// Cap the number of dataset rows (overrides the config's limit).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print every decoded ANN frame observed on an interface until Ctrl-C.
    Monitor {
        /// Interface to sniff.
        iface: String,

        /// Bits per data field.
        #[arg(long, default_value = "32")]
        word_size: u32,

        /// Number of data fields per frame.
        #[arg(long, default_value = "2")]
        data_fields: usize,

        /// Slack bits at the end of the payload.
        #[arg(long, default_value = "8")]
        slack: u32,
    },

    /// Transmit hand-crafted stimulus frames.
    Inject {
        /// Interface to transmit on.
        iface: String,

        /// Data field values, one per layout data field.
        #[arg(long, required = true, num_args = 1.., value_delimiter = ',')]
        data: Vec<u64>,

        /// Frame neuron_id (default: the harness-reserved stimulus value).
        #[arg(long, default_value_t = STIMULUS_NEURON_ID)]
        neuron_id: u32,

        /// Frame run_id.
        #[arg(long, default_value = "0")]
        run_id: u16,

        /// Bits per data field.
        #[arg(long, default_value = "32")]
        word_size: u32,

        /// Slack bits at the end of the payload.
        #[arg(long, default_value = "8")]
        slack: u32,

        /// Number of times to send the frame.
        #[arg(long, default_value = "1")]
        repeat: u32,

        /// Delay between repeats in milliseconds.
        #[arg(long, default_value = "1000")]
        interval_ms: u64,
    },

    /// Compute the expected-stimuli register bitmask for a neuron set.
    Mask {
        /// Comma-separated neuron ids, e.g. "1,5,126".
        neurons: String,
    },

    /// Enumerate host network interfaces.
    Interfaces,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match Cli::parse().command {
        Commands::Run { config, limit } => {
            let mut config = HarnessConfig::from_file(&config)?;
            if limit.is_some() {
                config.limit = limit;
            }
            let table = Harness::new(config)?.run().await?;
            println!("{} test cases completed", table.rows.len());
            Ok(())
        }
        Commands::Monitor {
            iface,
            word_size,
            data_fields,
            slack,
        } => {
            let layout = WireLayout::new(word_size, data_fields, slack);
            layout.validate()?;
            monitor(iface, layout).await
        }
        Commands::Inject {
            iface,
            data,
            neuron_id,
            run_id,
            word_size,
            slack,
            repeat,
            interval_ms,
        } => {
            inject(
                iface,
                data,
                neuron_id,
                run_id,
                word_size,
                slack,
                repeat,
                Duration::from_millis(interval_ms),
            )
            .await
        }
        Commands::Mask { neurons } => mask(&neurons),
        Commands::Interfaces => {
            for name in interface_names() {
                println!("{name}");
            }
            Ok(())
        }
    }
}

/// Sniff one interface and print decoded frames until Ctrl-C.
async fn monitor(iface: String, layout: WireLayout) -> Result<()> {
    println!("sniffing on {iface}");
    let (mut mux, mut inbox) = CaptureMux::start(layout, std::slice::from_ref(&iface))?;

    loop {
        tokio::select! {
            taken = inbox.take(Duration::from_millis(500)) => {
                if let Some(frame) = taken? {
                    println!(
                        "neuron_id={} data={:?} run_id={}",
                        frame.neuron_id, frame.data, frame.run_id
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    mux.stop();
    Ok(())
}

/// Build and transmit a stimulus frame, optionally repeating.
#[allow(clippy::too_many_arguments)]
async fn inject(
    iface: String,
    data: Vec<u64>,
    neuron_id: u32,
    run_id: u16,
    word_size: u32,
    slack: u32,
    repeat: u32,
    interval: Duration,
) -> Result<()> {
    let layout = WireLayout::new(word_size, data.len(), slack);
    layout.validate()?;
    for &value in &data {
        if !layout.fits_word(value) {
            return Err(AnnwireError::ValueOutOfRange {
                column: "--data".into(),
                value,
                word_size,
            });
        }
    }

    let mut port = DatalinkTx::open(&iface)?;
    let frame = AnnFrame::new(neuron_id, data, run_id);
    let wire = frame.encode_ethernet(&layout, port.source_mac());

    for sent in 1..=repeat {
        port.transmit(&wire)?;
        tracing::info!(%iface, sent, repeat, "stimulus frame transmitted");
        if sent < repeat {
            tokio::time::sleep(interval).await;
        }
    }

    Ok(())
}

/// Print the expected-stimuli bitmask, decimal and binary.
fn mask(neurons: &str) -> Result<()> {
    let mut mask = 0u128;
    for part in neurons.split(',') {
        let id: u32 = part
            .trim()
            .parse()
            .map_err(|_| AnnwireError::Config(format!("'{part}' is not a neuron id")))?;
        if id >= 128 {
            return Err(AnnwireError::Config(format!(
                "neuron id {id} exceeds the 128-bit stimulus register"
            )));
        }
        mask |= 1u128 << id;
    }

    println!("dec: {mask}");
    println!("bin: {mask:#b}");
    Ok(())
}
