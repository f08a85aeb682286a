//! Validation orchestrator: fixed check sequence with two gates.
//!
//! ```text
//! halt_and_enable_debug ──fail──► end (no resume; target never halted)
//!       │
//! metadata ──────────────fail──► resume ──► end
//!       │
//! image crc+sha / boot vector / fault status / version   (all run)
//!       ▼
//! resume ──► report
//! ```
//!
//! After a successful halt the target is resumed on every exit path,
//! including unwinds, via a drop guard holding the transport borrow.

use crate::checks;
use crate::layout::TargetLayout;
use crate::report::ValidationReport;
use crate::transport::{DebugTransport, REG_PC, REG_SP};

/// Scope of a successfully halted core. Dropping it resumes the target.
struct HaltedCore<'a> {
    transport: &'a mut dyn DebugTransport,
}

impl HaltedCore<'_> {
    fn transport(&mut self) -> &mut dyn DebugTransport {
        self.transport
    }
}

impl Drop for HaltedCore<'_> {
    fn drop(&mut self) {
        self.transport.resume_core();
    }
}

/// Run the full validation battery against the staging slot.
///
/// Never fails outward: every failure mode lands as `false` fields in the
/// returned report. Deterministic for identical target memory and
/// register state.
pub fn validate_staged_image(
    transport: &mut dyn DebugTransport,
    layout: &TargetLayout,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    if transport.enable_debug_features().is_err() {
        return report;
    }
    match transport.halt_core() {
        Ok(true) => {}
        // Never successfully stopped, so there is nothing to resume.
        Ok(false) | Err(_) => return report,
    }
    report.halt_success = true;

    let mut core = HaltedCore { transport };

    // A transport that cannot complete the register handshake is wedged;
    // the run collapses to an all-false report, as with a failed halt.
    let pc = core.transport().read_core_register(REG_PC);
    let sp = core.transport().read_core_register(REG_SP);
    let (pc, sp) = match (pc, sp) {
        (Ok(pc), Ok(sp)) => (pc, sp),
        _ => return ValidationReport::default(),
    };
    report.pc_at_halt = pc;
    report.sp_at_halt = sp;

    // Gate: the image checks need a trustworthy descriptor.
    let meta = match checks::validate_metadata(core.transport(), layout, &mut report) {
        Some(meta) => meta,
        None => return report,
    };

    // Non-gating: each check runs so one pass yields a full diagnostic.
    checks::verify_image(core.transport(), layout, &meta, &mut report);
    checks::check_boot_vector(core.transport(), layout, &mut report);
    checks::check_fault_status(core.transport(), &mut report);
    checks::check_version(core.transport(), layout, &meta, &mut report);

    report
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
