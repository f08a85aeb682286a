//! Flash geometry of the A/B update scheme on the target.
//!
//! The defaults describe the reference STM32-class part (slot A active at
//! 0x0800_8000, slot B staging right behind it, 224 KiB per slot, metadata
//! record in the last 64-byte line of each slot). Every field can be
//! overridden by the caller for other parts.

use crate::metadata::META_LEN;

/// Bytes reserved at the end of each slot for the metadata record.
pub const META_RESERVED: u32 = 64;

/// Slot addresses, slot size, metadata placement, and the SRAM window used
/// by the boot-vector sanity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetLayout {
    /// Start of the active slot (slot A).
    pub slot_a_start: u32,
    /// Start of the staging slot (slot B).
    pub slot_b_start: u32,
    /// Size of each slot in bytes.
    pub slot_size: u32,
    /// Offset of the `FirmwareMetadata` record within each slot.
    pub metadata_offset: u32,
    /// Inclusive lower bound of the initial-SP sanity window.
    pub sram_lo: u32,
    /// Inclusive upper bound of the initial-SP sanity window.
    pub sram_hi: u32,
}

impl TargetLayout {
    /// Address of the metadata record in the active slot.
    pub fn metadata_addr_a(&self) -> u32 {
        self.slot_a_start + self.metadata_offset
    }

    /// Address of the metadata record in the staging slot.
    pub fn metadata_addr_b(&self) -> u32 {
        self.slot_b_start + self.metadata_offset
    }

    /// One past the last address of the staging slot.
    pub fn slot_b_end(&self) -> u32 {
        self.slot_b_start + self.slot_size
    }

    /// True iff the geometry is self-consistent: a non-empty slot, the
    /// metadata record inside it, slots within the 32-bit address space,
    /// an ordered SRAM window, and non-overlapping slots.
    pub fn is_coherent(&self) -> bool {
        let size = self.slot_size as u64;
        let a = self.slot_a_start as u64;
        let b = self.slot_b_start as u64;
        self.slot_size > 0
            && self.metadata_offset as u64 + META_LEN as u64 <= size
            && a + size <= u32::MAX as u64 + 1
            && b + size <= u32::MAX as u64 + 1
            && self.sram_lo <= self.sram_hi
            && (a + size <= b || b + size <= a)
    }
}

impl Default for TargetLayout {
    fn default() -> Self {
        TargetLayout {
            slot_a_start: 0x0800_8000,
            slot_b_start: 0x0804_0000,
            slot_size: 0x0003_8000,
            metadata_offset: 0x0003_8000 - META_RESERVED,
            sram_lo: 0x2000_0000,
            sram_hi: 0x2008_0000,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_coherent() {
        assert!(TargetLayout::default().is_coherent());
    }

    #[test]
    fn test_metadata_addresses() {
        let layout = TargetLayout::default();
        assert_eq!(layout.metadata_addr_a(), 0x0800_8000 + 0x0003_8000 - 64);
        assert_eq!(layout.metadata_addr_b(), 0x0804_0000 + 0x0003_8000 - 64);
        assert_eq!(layout.slot_b_end(), 0x0807_8000);
    }

    #[test]
    fn test_overlapping_slots_rejected() {
        let layout = TargetLayout {
            slot_b_start: 0x0800_9000,
            ..TargetLayout::default()
        };
        assert!(!layout.is_coherent());
    }

    #[test]
    fn test_metadata_outside_slot_rejected() {
        let layout = TargetLayout {
            metadata_offset: 0x0003_8000,
            ..TargetLayout::default()
        };
        assert!(!layout.is_coherent());
    }
}
