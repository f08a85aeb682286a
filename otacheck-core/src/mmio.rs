//! Self-hosted transport backend: the validator runs on the target itself
//! and drives its own debug registers through memory-mapped I/O.
//!
//! Halt writes `DBGKEY | C_DEBUGEN | C_HALT` to DHCSR and polls S_HALT;
//! resume rewrites DHCSR with C_HALT cleared; register reads go through
//! the DCRSR/DCRDR handshake. All polling loops are bounded so a wedged
//! core fails the run instead of hanging it.

use crate::transport::{
    DebugTransport, TransportError, DCRDR, DCRSR, DEMCR, DEMCR_TRCENA, DEMCR_VC_HARDERR, DHCSR,
    DHCSR_C_DEBUGEN, DHCSR_C_HALT, DHCSR_DBGKEY, DHCSR_S_HALT, DHCSR_S_REGRDY,
};

const HALT_POLL_BUDGET: u32 = 1_000_000;
const REGRDY_POLL_BUDGET: u32 = 100_000;

/// Memory-mapped debug access from the target's own address space.
pub struct MmioTransport {
    _private: (),
}

impl MmioTransport {
    /// # Safety
    ///
    /// The caller must be executing on (or in the address space of) a
    /// Cortex-M target where the SCS debug registers and both flash slots
    /// are mapped at their architectural addresses. Constructing this on a
    /// host process makes every operation dereference raw target addresses.
    pub unsafe fn new() -> Self {
        MmioTransport { _private: () }
    }

    fn reg_read(&self, addr: u32) -> u32 {
        unsafe { core::ptr::read_volatile(addr as usize as *const u32) }
    }

    fn reg_write(&mut self, addr: u32, value: u32) {
        unsafe { core::ptr::write_volatile(addr as usize as *mut u32, value) }
    }
}

impl DebugTransport for MmioTransport {
    fn enable_debug_features(&mut self) -> Result<(), TransportError> {
        let demcr = self.reg_read(DEMCR);
        self.reg_write(DEMCR, demcr | DEMCR_TRCENA | DEMCR_VC_HARDERR);
        Ok(())
    }

    fn halt_core(&mut self) -> Result<bool, TransportError> {
        self.reg_write(DHCSR, DHCSR_DBGKEY | DHCSR_C_DEBUGEN | DHCSR_C_HALT);
        for _ in 0..HALT_POLL_BUDGET {
            if self.reg_read(DHCSR) & DHCSR_S_HALT != 0 {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn resume_core(&mut self) {
        let dhcsr = self.reg_read(DHCSR) & !DHCSR_C_HALT;
        self.reg_write(DHCSR, DHCSR_DBGKEY | (dhcsr & 0xFFFF));
    }

    fn read_core_register(&mut self, id: u8) -> Result<u32, TransportError> {
        // REGWnR = 0: read request
        self.reg_write(DCRSR, (id & 0x1F) as u32);
        for _ in 0..REGRDY_POLL_BUDGET {
            if self.reg_read(DHCSR) & DHCSR_S_REGRDY != 0 {
                return Ok(self.reg_read(DCRDR));
            }
        }
        Err(TransportError::RegisterReadTimeout(REGRDY_POLL_BUDGET))
    }

    fn read_flash_block(&mut self, addr: u32, out: &mut [u8]) -> Result<(), TransportError> {
        for (i, slot) in out.iter_mut().enumerate() {
            let p = (addr as usize + i) as *const u8;
            *slot = unsafe { core::ptr::read_volatile(p) };
        }
        Ok(())
    }
}
