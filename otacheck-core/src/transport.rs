//! The debug-access capability the validation battery runs against.
//!
//! Everything the checks need from a probe is five operations: enable the
//! debug features, halt, resume, read a core register, read target memory.
//! Concrete backends live in [`crate::mmio`] (self-hosted, memory-mapped
//! debug registers) and [`crate::sim`] (in-memory target model); host-side
//! probe SDKs (OpenOCD, J-Link, CMSIS-DAP) slot in behind the same trait.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Cortex-M debug register map (ARMv7-M Architecture Reference Manual, C1)
// ---------------------------------------------------------------------------

/// Debug Halting Control and Status Register.
pub const DHCSR: u32 = 0xE000_EDF0;
/// Debug Core Register Selector Register.
pub const DCRSR: u32 = 0xE000_EDF4;
/// Debug Core Register Data Register.
pub const DCRDR: u32 = 0xE000_EDF8;
/// Debug Exception and Monitor Control Register.
pub const DEMCR: u32 = 0xE000_EDFC;
/// Configurable Fault Status Register.
pub const CFSR: u32 = 0xE000_ED28;
/// Vector Table Offset Register.
pub const SCB_VTOR: u32 = 0xE000_ED08;

/// Write key enabling the DHCSR control bits.
pub const DHCSR_DBGKEY: u32 = 0xA05F << 16;
pub const DHCSR_C_DEBUGEN: u32 = 1 << 0;
pub const DHCSR_C_HALT: u32 = 1 << 1;
pub const DHCSR_S_REGRDY: u32 = 1 << 16;
pub const DHCSR_S_HALT: u32 = 1 << 17;

pub const DEMCR_VC_HARDERR: u32 = 1 << 10;
pub const DEMCR_TRCENA: u32 = 1 << 24;

/// DCRSR selector for the stack pointer (R13).
pub const REG_SP: u8 = 13;
/// DCRSR selector for the program counter (R15, DebugReturnAddress).
pub const REG_PC: u8 = 15;

// ---------------------------------------------------------------------------
// Capability trait
// ---------------------------------------------------------------------------

/// Failures surfaced by a transport backend. The orchestrator maps these
/// into report fields; they never cross the public validation surface.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("target did not assert S_REGRDY within {0} polls")]
    RegisterReadTimeout(u32),
    #[error("memory read of {len} bytes at 0x{addr:08X} failed")]
    MemoryFault { addr: u32, len: usize },
    #[error("probe rejected the request: {0}")]
    Probe(&'static str),
}

/// Debug access to a stopped (or stoppable) Cortex-M target.
///
/// One validation run owns the transport exclusively; implementations do
/// not need to be reentrant. Every wait inside an implementation must be
/// bounded so a wedged target fails the run instead of hanging it.
pub trait DebugTransport {
    /// Set TRCENA and vector-catch-on-hard-fault. Idempotent.
    fn enable_debug_features(&mut self) -> Result<(), TransportError>;

    /// Request a halt. `Ok(true)` iff the target reported halted within the
    /// backend's bounded wait; `Ok(false)` on a quiet timeout.
    fn halt_core(&mut self) -> Result<bool, TransportError>;

    /// Clear the halt request. Best-effort; called on every exit path after
    /// a successful halt, including unwinds.
    fn resume_core(&mut self);

    /// Read CPU register `id` (bits 0..4 of the DCRSR selector encoding).
    fn read_core_register(&mut self, id: u8) -> Result<u32, TransportError>;

    /// Copy `out.len()` bytes of target memory at `addr` into `out`.
    fn read_flash_block(&mut self, addr: u32, out: &mut [u8]) -> Result<(), TransportError>;
}

/// Read one little-endian 32-bit word of target memory.
pub fn read_u32(
    transport: &mut dyn DebugTransport,
    addr: u32,
) -> Result<u32, TransportError> {
    let mut word = [0u8; 4];
    transport.read_flash_block(addr, &mut word)?;
    Ok(u32::from_le_bytes(word))
}
