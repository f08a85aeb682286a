//! The individual validation steps: metadata gate, image digests, boot
//! vector sanity, fault state, rollback guard.
//!
//! Each step reads through the transport, writes its own report fields,
//! and returns its verdict. Transport failures never propagate — they
//! land as a `false` verdict for the step that hit them.

use crate::crc32::Crc32;
use crate::layout::TargetLayout;
use crate::metadata::{FirmwareMetadata, META_LEN, OTA_MAGIC};
use crate::report::ValidationReport;
use crate::sha256::Sha256;
use crate::transport::{read_u32, DebugTransport, CFSR};

/// Flash is pulled through the digests in chunks of this size, one pass
/// feeding CRC-32 and SHA-256 together.
const READ_CHUNK: usize = 4096;

// ---------------------------------------------------------------------------
// Metadata gate
// ---------------------------------------------------------------------------

/// Read and verify the staging slot's metadata record. This is a gate:
/// on failure the image-content checks are skipped by the orchestrator.
pub fn validate_metadata(
    transport: &mut dyn DebugTransport,
    layout: &TargetLayout,
    report: &mut ValidationReport,
) -> Option<FirmwareMetadata> {
    let mut raw = [0u8; META_LEN];
    if transport
        .read_flash_block(layout.metadata_addr_b(), &mut raw)
        .is_err()
    {
        return None;
    }

    match FirmwareMetadata::decode(&raw) {
        Ok(meta) => {
            report.metadata_valid = true;
            report.ota_state = meta.state;
            Some(meta)
        }
        Err(_) => None,
    }
}

// ---------------------------------------------------------------------------
// Image digests
// ---------------------------------------------------------------------------

/// Stream the staged image once, feeding both digests, and compare against
/// the metadata. Records the calculated and stored CRC regardless of
/// outcome. An out-of-range `image_size` fails both digests without
/// touching flash.
pub fn verify_image(
    transport: &mut dyn DebugTransport,
    layout: &TargetLayout,
    meta: &FirmwareMetadata,
    report: &mut ValidationReport,
) {
    report.stored_crc = meta.crc32;

    if meta.image_size == 0 || meta.image_size > layout.slot_size {
        return;
    }

    let mut crc = Crc32::new();
    let mut sha = Sha256::new();
    let mut chunk = [0u8; READ_CHUNK];
    let mut offset = 0u32;

    while offset < meta.image_size {
        let take = ((meta.image_size - offset) as usize).min(READ_CHUNK);
        if transport
            .read_flash_block(layout.slot_b_start + offset, &mut chunk[..take])
            .is_err()
        {
            return;
        }
        crc.update(&chunk[..take]);
        sha.update(&chunk[..take]);
        offset += take as u32;
    }

    report.calculated_crc = crc.finalize();
    report.crc_valid = report.calculated_crc == meta.crc32;
    report.hash_valid = digest_eq(&sha.finalize(), &meta.sha256);
}

/// Byte equality over the full 32 bytes, no early exit.
fn digest_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// ---------------------------------------------------------------------------
// Boot vector sanity
// ---------------------------------------------------------------------------

/// Check the first two words of the staged vector table: initial SP inside
/// the SRAM window, reset handler Thumb-tagged and inside the slot.
pub fn check_boot_vector(
    transport: &mut dyn DebugTransport,
    layout: &TargetLayout,
    report: &mut ValidationReport,
) {
    let initial_sp = match read_u32(transport, layout.slot_b_start) {
        Ok(word) => word,
        Err(_) => return,
    };
    let reset_handler = match read_u32(transport, layout.slot_b_start + 4) {
        Ok(word) => word,
        Err(_) => return,
    };

    let sp_sane = initial_sp >= layout.sram_lo && initial_sp <= layout.sram_hi;
    let handler = reset_handler & !1;
    let rh_sane = reset_handler & 1 == 1
        && handler >= layout.slot_b_start
        && handler < layout.slot_b_end();

    report.boot_vector_sane = sp_sane && rh_sane;
}

// ---------------------------------------------------------------------------
// Fault state
// ---------------------------------------------------------------------------

/// Read the CFSR through the transport (the target is halted; this is a
/// debug-memory read, not a local dereference). Passes iff zero.
pub fn check_fault_status(transport: &mut dyn DebugTransport, report: &mut ValidationReport) {
    let cfsr = match read_u32(transport, CFSR) {
        Ok(word) => word,
        Err(_) => return,
    };
    report.fault_status = cfsr;
    report.no_hardfault_pending = cfsr == 0;
}

// ---------------------------------------------------------------------------
// Rollback guard
// ---------------------------------------------------------------------------

/// Strict-monotonic version comparison against the active slot. A slot A
/// record without the magic sentinel means first flash — the check passes
/// unconditionally. Equal versions are a no-op rollback and are rejected.
pub fn check_version(
    transport: &mut dyn DebugTransport,
    layout: &TargetLayout,
    staged: &FirmwareMetadata,
    report: &mut ValidationReport,
) {
    let mut raw = [0u8; META_LEN];
    if transport
        .read_flash_block(layout.metadata_addr_a(), &mut raw)
        .is_err()
    {
        return;
    }

    // The version field gates even when the record's own CRC is stale, so
    // a corrupt active descriptor cannot open the door to a downgrade.
    let active = match FirmwareMetadata::decode_unchecked(&raw) {
        Ok(meta) => meta,
        Err(_) => return,
    };

    report.version_monotonic = active.magic != OTA_MAGIC || staged.version > active.version;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
