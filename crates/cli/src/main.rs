//! tagscan: scan MIFARE Classic cards sector by sector
//!
//! The binary drives the scan core against the simulated reader: either a
//! built-in NDEF demo card or a raw 1K card image loaded from disk. Real
//! hardware plugs in by implementing `tagscan_reader::ReaderDriver` and
//! swapping the driver here.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tagscan_classic::{ScanConfig, Scanner};
use tagscan_sim::{SimCard, SimReader};
use tracing::info;

mod display;

/// Hold-off after a finished scan before polling again in watch mode
const SCAN_HOLD: Duration = Duration::from_secs(5);

/// UID of the built-in demo card
const DEMO_UID: &[u8] = &[0x04, 0x7A, 0x91, 0xC2];

#[derive(Parser)]
#[command(version, about = "MIFARE Classic sector scanner")]
struct Cli {
    /// Trace level output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the card on the reader and print the report
    Scan {
        /// Raw 1K card image (64 blocks of 16 bytes) to load into the
        /// simulated reader instead of the built-in demo card
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Keep polling for cards instead of stopping after the first scan
        #[arg(short, long)]
        watch: bool,
    },

    /// Print the key catalog tiers
    Keys,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match &cli.command {
        Commands::Scan { image, watch } => scan_command(image.as_deref(), *watch),
        Commands::Keys => {
            display::print_catalog();
            Ok(())
        }
    }
}

fn scan_command(image: Option<&Path>, watch: bool) -> anyhow::Result<()> {
    let card = match image {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("reading card image {}", path.display()))?;
            SimCard::from_image(&bytes).context("parsing card image")?
        }
        None => demo_card(),
    };

    let driver = SimReader::new(card);
    let mut scanner = Scanner::with_config(driver, ScanConfig::default())
        .with_status_handler(display::indicate);

    let version = scanner
        .initialize()
        .context("reader bring-up failed")?;
    info!(version = %format_args!("{version:#04x}"), "reader initialized");

    let poll_interval = scanner.session().timings().poll_interval;
    loop {
        match scanner.poll_once()? {
            Some(report) => {
                display::print_report(&report);
                if !watch {
                    return Ok(());
                }
                thread::sleep(SCAN_HOLD);
            }
            None => thread::sleep(poll_interval),
        }
    }
}

/// An NDEF-formatted demo card carrying one text record
fn demo_card() -> SimCard {
    // TLV wrapping an NDEF text record: "tagscan", language "en"
    let record_head = [
        0x03, 0x0E, 0xD1, 0x01, 0x0A, 0x54, 0x02, 0x65, 0x6E, 0x74, 0x61, 0x67, 0x73, 0x63,
        0x61, 0x6E,
    ];
    let mut terminator = [0u8; 16];
    terminator[0] = 0xFE;

    SimCard::ndef_formatted(DEMO_UID)
        .with_block(4, record_head)
        .with_block(5, terminator)
}

fn setup_logging(verbose: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(if verbose { "debug" } else { "info" })
        });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(true)
        .init();
}
