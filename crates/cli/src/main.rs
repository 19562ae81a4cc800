use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rprom_cli::commands::{erase, init, read, status, switch, write};
use rprom_cli::device::{Device, Layout};

#[derive(Parser)]
#[command(name = "rprom", version)]
#[command(about = "RPROM cartridge tool - drives an emulated cartridge over the ROM bus protocol", long_about = None)]
struct Cli {
    /// Flash dump backing the emulated cartridge.
    #[arg(long, global = true, default_value = "rprom-flash.bin")]
    flash: PathBuf,

    /// Address wiring of the emulated board.
    #[arg(long, global = true, value_enum, default_value_t = Layout::Contiguous)]
    layout: Layout,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a blank flash dump.
    Init {
        /// Replace an existing dump.
        #[arg(long)]
        force: bool,
    },
    /// Show firmware version, flash size and active slot.
    Status {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Select the slot to boot from.
    Switch { slot: u32 },
    /// Erase a slot.
    Erase { slot: u32 },
    /// Erase a slot and program it with a 512 KiB image.
    Write {
        slot: u32,
        file: PathBuf,

        /// Read the slot back and compare checksums.
        #[arg(long)]
        verify: bool,
    },
    /// Save a slot to a file.
    Read { slot: u32, file: PathBuf },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "rprom=info,rprom_cli=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Commands::Init { force } = cli.command {
        return init::run(&cli.flash, force);
    }

    let device = Device::open(&cli.flash, cli.layout)?;
    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Status { json } => status::run(device, json),
        Commands::Switch { slot } => switch::run(device, slot),
        Commands::Erase { slot } => erase::run(device, slot),
        Commands::Write { slot, file, verify } => write::run(device, slot, &file, verify),
        Commands::Read { slot, file } => read::run(device, slot, &file),
    }
}
