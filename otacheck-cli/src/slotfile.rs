//! Slot dump assembly: image bytes, erased-flash padding, metadata record.

use otacheck_core::metadata::{FirmwareMetadata, META_LEN};

/// Lay out a slot dump: the image at offset 0, `0xFF` padding up to the
/// metadata offset, then the sealed record. Fails if the image would
/// overrun the record.
pub fn build_slot(
    image: &[u8],
    meta: &FirmwareMetadata,
    metadata_offset: u32,
) -> Result<Vec<u8>, String> {
    let offset = metadata_offset as usize;
    if image.len() > offset {
        return Err(format!(
            "image ({} bytes) overruns the metadata record at offset 0x{offset:X}",
            image.len()
        ));
    }

    let mut slot = vec![0xFF; offset + META_LEN];
    slot[..image.len()].copy_from_slice(image);
    slot[offset..].copy_from_slice(&meta.encode());
    Ok(slot)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use otacheck_core::transport::{REG_PC, REG_SP};
    use otacheck_core::{validate_staged_image, SimTransport, TargetLayout};

    fn test_image(layout: &TargetLayout, size: usize) -> Vec<u8> {
        let mut image: Vec<u8> = (0u8..=255).cycle().take(size).collect();
        image[0..4].copy_from_slice(&0x2001_0000u32.to_le_bytes());
        image[4..8].copy_from_slice(&(layout.slot_b_start + 0x201).to_le_bytes());
        image
    }

    #[test]
    fn test_build_slot_layout() {
        let layout = TargetLayout::default();
        let image = test_image(&layout, 1024);
        let meta = FirmwareMetadata::for_image(&image, 1, 0x01);
        let slot = build_slot(&image, &meta, layout.metadata_offset).unwrap();

        assert_eq!(slot.len(), layout.metadata_offset as usize + META_LEN);
        assert_eq!(&slot[..1024], &image[..]);
        assert_eq!(slot[1024], 0xFF); // erased gap
        let record = &slot[layout.metadata_offset as usize..];
        assert_eq!(FirmwareMetadata::decode(record).unwrap(), meta);
    }

    #[test]
    fn test_build_slot_rejects_oversized_image() {
        let image = vec![0u8; 128];
        let meta = FirmwareMetadata::for_image(&image, 1, 0);
        assert!(build_slot(&image, &meta, 64).is_err());
    }

    #[test]
    fn test_stamped_slot_validates_end_to_end() {
        let layout = TargetLayout::default();
        let image = test_image(&layout, 4096);
        let meta = FirmwareMetadata::for_image(&image, 1, 0x01);
        let slot = build_slot(&image, &meta, layout.metadata_offset).unwrap();

        let mut sim = SimTransport::new();
        sim.map_region(layout.slot_b_start, slot);
        sim.set_register(REG_PC, layout.slot_a_start | 1);
        sim.set_register(REG_SP, 0x2001_0000);

        let report = validate_staged_image(&mut sim, &layout);
        assert!(report.overall_pass(), "stamped slot must validate: {report:?}");
    }

    #[test]
    fn test_stamped_slot_file_roundtrip() {
        let layout = TargetLayout::default();
        let image = test_image(&layout, 512);
        let meta = FirmwareMetadata::for_image(&image, 7, 0x02);
        let slot = build_slot(&image, &meta, layout.metadata_offset).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slot_b.bin");
        std::fs::write(&path, &slot).unwrap();
        let reread = std::fs::read(&path).unwrap();

        let record = &reread[layout.metadata_offset as usize..];
        let parsed = FirmwareMetadata::decode(record).unwrap();
        assert_eq!(parsed.version, 7);
        assert_eq!(parsed.state, 0x02);
        assert_eq!(parsed.image_size, 512);
    }
}
