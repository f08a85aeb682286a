//! Per-run validation verdicts.

use serde::Serialize;

/// Named checks in execution order, paired with their verdicts by
/// [`ValidationReport::checks`].
pub const CHECK_NAMES: [&str; 7] = [
    "Core Halt",
    "Metadata Valid",
    "CRC32 Match",
    "SHA-256 Match",
    "Boot Vector Sane",
    "No Pending Faults",
    "Version Monotonic",
];

/// Verdicts and raw values collected by one validation run.
///
/// Constructed all-false/zero; each step writes only its own fields. The
/// overall verdict is the conjunction of the seven named booleans — the
/// raw values (`pc_at_halt`, `calculated_crc`, `fault_status`, ...) are
/// diagnostic only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub halt_success: bool,
    pub pc_at_halt: u32,
    pub sp_at_halt: u32,
    pub metadata_valid: bool,
    pub ota_state: u8,
    pub crc_valid: bool,
    pub calculated_crc: u32,
    pub stored_crc: u32,
    pub hash_valid: bool,
    pub boot_vector_sane: bool,
    pub no_hardfault_pending: bool,
    pub fault_status: u32,
    pub version_monotonic: bool,
}

impl ValidationReport {
    /// The seven named verdicts in execution order.
    pub fn checks(&self) -> [(&'static str, bool); 7] {
        [
            (CHECK_NAMES[0], self.halt_success),
            (CHECK_NAMES[1], self.metadata_valid),
            (CHECK_NAMES[2], self.crc_valid),
            (CHECK_NAMES[3], self.hash_valid),
            (CHECK_NAMES[4], self.boot_vector_sane),
            (CHECK_NAMES[5], self.no_hardfault_pending),
            (CHECK_NAMES[6], self.version_monotonic),
        ]
    }

    /// Conjunction of the seven named booleans. No other field participates.
    pub fn overall_pass(&self) -> bool {
        self.checks().iter().all(|&(_, ok)| ok)
    }
}

// ---------------------------------------------------------------------------
// CFSR decoding
// ---------------------------------------------------------------------------

/// CFSR bits decoded for human reporting; everything else stays raw hex.
const CFSR_BITS: [(u32, &str); 5] = [
    (0x0002, "INVSTATE: invalid execution state"),
    (0x0004, "INVPC: invalid PC load"),
    (0x0008, "NOCP: no coprocessor"),
    (0x0100, "IBUSERR: instruction bus error"),
    (0x8000, "BFARVALID: bus fault address valid"),
];

/// Human-readable descriptions of the set CFSR bits.
pub fn describe_cfsr(cfsr: u32) -> Vec<&'static str> {
    CFSR_BITS
        .iter()
        .filter(|(mask, _)| cfsr & mask != 0)
        .map(|&(_, desc)| desc)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
