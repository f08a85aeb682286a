//! otacheck: validate, stamp, and inspect staged A/B firmware slots.
//!
//! The validation battery itself lives in `otacheck-core`; this binary
//! feeds it slot dump files through the simulated transport, renders the
//! per-check report, and maps the verdict onto the process exit code
//! (0 = safe to boot, 1 = any check failed). Probe-attached validation
//! uses the same core behind a probe-SDK transport.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use otacheck_core::layout::META_RESERVED;
use otacheck_core::metadata::{FirmwareMetadata, META_LEN};
use otacheck_core::transport::{REG_PC, REG_SP};
use otacheck_core::{validate_staged_image, SimTransport, TargetLayout};

mod slotfile;
mod summary;

#[derive(Parser)]
#[command(name = "otacheck", version, about = "Staged-firmware slot validation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the validation battery against slot dump files
    Validate {
        /// Staging-slot dump (slot B)
        slot_b: PathBuf,

        /// Active-slot dump (slot A); omitted means first flash
        #[arg(long)]
        slot_a: Option<PathBuf>,

        #[command(flatten)]
        layout: LayoutArgs,

        /// Simulated CFSR value (hex), for rehearsing fault handling
        #[arg(long, value_parser = parse_u32, default_value = "0")]
        cfsr: u32,

        /// Emit the machine-readable report as JSON instead of the table
        #[arg(long)]
        json: bool,
    },

    /// Compute digests for an image and write a sealed slot dump
    Stamp {
        /// Raw firmware image (vector table first)
        image: PathBuf,

        /// Output slot dump path
        #[arg(short, long)]
        out: PathBuf,

        /// Version to stamp; must exceed the active slot's to survive the
        /// rollback guard
        #[arg(long, value_parser = parse_u32, default_value = "1")]
        version: u32,

        /// Opaque lifecycle state byte
        #[arg(long, value_parser = parse_u8, default_value = "0x01")]
        state: u8,

        #[command(flatten)]
        layout: LayoutArgs,
    },

    /// Decode and print the metadata record of a slot dump
    Meta {
        /// Slot dump path
        slot: PathBuf,

        #[command(flatten)]
        layout: LayoutArgs,
    },
}

/// Flash geometry overrides. Defaults describe the reference target.
#[derive(Args)]
struct LayoutArgs {
    /// Active slot base address
    #[arg(long, value_parser = parse_u32, default_value = "0x08008000")]
    slot_a_start: u32,

    /// Staging slot base address
    #[arg(long, value_parser = parse_u32, default_value = "0x08040000")]
    slot_b_start: u32,

    /// Slot size in bytes
    #[arg(long, value_parser = parse_u32, default_value = "0x38000")]
    slot_size: u32,

    /// Metadata record offset within each slot; default is the last
    /// 64-byte line of the slot
    #[arg(long, value_parser = parse_u32)]
    metadata_offset: Option<u32>,

    /// Lower bound of the initial-SP sanity window
    #[arg(long, value_parser = parse_u32, default_value = "0x20000000")]
    sram_lo: u32,

    /// Upper bound of the initial-SP sanity window
    #[arg(long, value_parser = parse_u32, default_value = "0x20080000")]
    sram_hi: u32,
}

impl LayoutArgs {
    fn to_layout(&self) -> TargetLayout {
        TargetLayout {
            slot_a_start: self.slot_a_start,
            slot_b_start: self.slot_b_start,
            slot_size: self.slot_size,
            metadata_offset: self
                .metadata_offset
                .unwrap_or_else(|| self.slot_size.saturating_sub(META_RESERVED)),
            sram_lo: self.sram_lo,
            sram_hi: self.sram_hi,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate {
            slot_b,
            slot_a,
            layout,
            cfsr,
            json,
        } => cmd_validate(slot_b, slot_a, layout.to_layout(), cfsr, json),
        Commands::Stamp {
            image,
            out,
            version,
            state,
            layout,
        } => cmd_stamp(image, out, version, state, layout.to_layout()),
        Commands::Meta { slot, layout } => cmd_meta(slot, layout.to_layout()),
    }
}

fn cmd_validate(
    slot_b: PathBuf,
    slot_a: Option<PathBuf>,
    layout: TargetLayout,
    cfsr: u32,
    json: bool,
) -> ExitCode {
    if !layout.is_coherent() {
        eprintln!("Error: incoherent flash geometry (overlapping slots or metadata outside slot)");
        return ExitCode::FAILURE;
    }

    let staged = match std::fs::read(&slot_b) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", slot_b.display());
            return ExitCode::FAILURE;
        }
    };

    let meta_end = layout.metadata_offset as usize + META_LEN;
    if staged.len() < meta_end {
        eprintln!(
            "Note: {} is {} bytes, shorter than the metadata record region; \
             the record will read as erased flash",
            slot_b.display(),
            staged.len()
        );
    }

    let mut sim = SimTransport::new();
    sim.map_region(layout.slot_b_start, staged);
    if let Some(path) = slot_a {
        match std::fs::read(&path) {
            Ok(bytes) => sim.map_region(layout.slot_a_start, bytes),
            Err(e) => {
                eprintln!("Error reading {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        }
    }
    sim.set_cfsr(cfsr);
    // A plausible halt context for the simulated core
    sim.set_register(REG_PC, layout.slot_a_start | 1);
    sim.set_register(REG_SP, layout.sram_lo + 0x1_0000);

    let report = validate_staged_image(&mut sim, &layout);

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("Error serializing report: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        print!("{}", summary::render(&report));
    }

    if report.overall_pass() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn cmd_stamp(
    image_path: PathBuf,
    out: PathBuf,
    version: u32,
    state: u8,
    layout: TargetLayout,
) -> ExitCode {
    let image = match std::fs::read(&image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", image_path.display());
            return ExitCode::FAILURE;
        }
    };

    let meta = FirmwareMetadata::for_image(&image, version, state);
    let slot = match slotfile::build_slot(&image, &meta, layout.metadata_offset) {
        Ok(slot) => slot,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = std::fs::write(&out, &slot) {
        eprintln!("Error writing {}: {e}", out.display());
        return ExitCode::FAILURE;
    }

    eprintln!(
        "Stamped {} ({} bytes) as version {version}, state 0x{state:02X}",
        image_path.display(),
        meta.image_size
    );
    eprintln!("  CRC32  = 0x{:08X}", meta.crc32);
    eprintln!("  SHA256 = {}", hex32(&meta.sha256));
    eprintln!("  -> {}", out.display());
    ExitCode::SUCCESS
}

fn cmd_meta(slot: PathBuf, layout: TargetLayout) -> ExitCode {
    let dump = match std::fs::read(&slot) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", slot.display());
            return ExitCode::FAILURE;
        }
    };

    let offset = layout.metadata_offset as usize;
    if dump.len() < offset + META_LEN {
        eprintln!(
            "Error: dump is {} bytes; no metadata record at offset 0x{offset:X}",
            dump.len()
        );
        return ExitCode::FAILURE;
    }
    let raw = &dump[offset..offset + META_LEN];

    // Unchecked first so a corrupt record still prints its fields
    let meta = match FirmwareMetadata::decode_unchecked(raw) {
        Ok(meta) => meta,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    println!("magic        = 0x{:08X}", meta.magic);
    println!("version      = {}", meta.version);
    println!("state        = 0x{:02X}", meta.state);
    println!("image_size   = {} bytes", meta.image_size);
    println!("crc32        = 0x{:08X}", meta.crc32);
    println!("sha256       = {}", hex32(&meta.sha256));
    println!("metadata_crc = 0x{:08X}", meta.metadata_crc);

    match FirmwareMetadata::decode(raw) {
        Ok(_) => {
            println!("record OK");
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("record INVALID: {e}");
            ExitCode::FAILURE
        }
    }
}

fn hex32(digest: &[u8; 32]) -> String {
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn parse_u32(s: &str) -> Result<u32, String> {
    parse_int(s).ok_or_else(|| format!("invalid 32-bit value: {s}"))
}

fn parse_u8(s: &str) -> Result<u8, String> {
    parse_int(s)
        .and_then(|v| u8::try_from(v).ok())
        .ok_or_else(|| format!("invalid byte value: {s}"))
}

/// Accepts decimal or 0x-prefixed hex.
fn parse_int(s: &str) -> Option<u32> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("0x08040000"), Some(0x0804_0000));
        assert_eq!(parse_int("0X10"), Some(16));
        assert_eq!(parse_int("1024"), Some(1024));
        assert_eq!(parse_int("zz"), None);
    }

    #[test]
    fn test_parse_u8_range() {
        assert_eq!(parse_u8("0x01"), Ok(1));
        assert!(parse_u8("0x100").is_err());
    }

    #[test]
    fn test_layout_args_default_metadata_offset() {
        let args = LayoutArgs {
            slot_a_start: 0x0800_8000,
            slot_b_start: 0x0804_0000,
            slot_size: 0x38000,
            metadata_offset: None,
            sram_lo: 0x2000_0000,
            sram_hi: 0x2008_0000,
        };
        let layout = args.to_layout();
        assert_eq!(layout.metadata_offset, 0x38000 - 64);
        assert!(layout.is_coherent());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "otacheck", "validate", "b.bin", "--slot-a", "a.bin", "--cfsr", "0x100", "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Validate { cfsr, json, .. } => {
                assert_eq!(cfsr, 0x100);
                assert!(json);
            }
            _ => panic!("expected validate"),
        }
    }
}
