//! oscport CLI - decode OSC packets and print them for humans
//!
//! Reads a raw packet from a file (or inline hex) and renders it with the
//! pretty printer. Useful for inspecting captures and ring dumps.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use oscport_core::{is_bundle, Message};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Decode and pretty-print OSC packets
#[derive(Parser)]
#[command(name = "oscport")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Packet file to decode; `-` or absent reads stdin
    file: Option<PathBuf>,

    /// Inline packet as hex, e.g. "2f68656c6c6f00002c7300..."
    #[arg(long, conflicts_with = "file")]
    hex: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone())),
        )
        .init();

    let packet = read_packet(&cli)?;
    debug!(bytes = packet.len(), "packet loaded");

    if packet.len() < oscport_core::MIN_MESSAGE_SIZE {
        bail!("packet too short to be an OSC message: {} bytes", packet.len());
    }
    if !is_bundle(&packet) && !packet.starts_with(b"/") {
        bail!("packet starts with neither '/' nor '#bundle'");
    }

    if let Some(len) = Message::new(&packet).wire_len() {
        if !is_bundle(&packet) && len < packet.len() {
            debug!(declared = len, actual = packet.len(), "trailing bytes after message");
        }
    }

    print!("{}", oscport_dump::dump_packet(&packet));
    Ok(())
}

fn read_packet(cli: &Cli) -> Result<Vec<u8>> {
    if let Some(hex) = &cli.hex {
        return parse_hex(hex);
    }

    match cli.file.as_deref() {
        Some(path) if path.as_os_str() != "-" => std::fs::read(path)
            .with_context(|| format!("reading {}", path.display())),
        _ => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("reading stdin")?;
            Ok(buf)
        }
    }
}

fn parse_hex(hex: &str) -> Result<Vec<u8>> {
    let cleaned: String = hex.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.len() % 2 != 0 {
        bail!("hex input has an odd number of digits");
    }
    (0..cleaned.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&cleaned[i..i + 2], 16)
                .with_context(|| format!("invalid hex at offset {i}"))
        })
        .collect()
}
