//! otacheck-core: Pure validation library for staged Cortex-M firmware.
//!
//! No probe SDKs, no I/O — just the check battery. This crate is the shared
//! core used by `otacheck-cli` (host-side validation of slot dumps) and by
//! self-hosted on-target builds through the memory-mapped transport backend.

pub mod checks;
pub mod crc32;
pub mod layout;
pub mod metadata;
pub mod mmio;
pub mod report;
pub mod sha256;
pub mod sim;
pub mod transport;
pub mod validate;

// Re-export commonly used types at crate root
pub use layout::TargetLayout;
pub use metadata::{FirmwareMetadata, OTA_MAGIC};
pub use report::ValidationReport;
pub use sim::SimTransport;
pub use transport::{DebugTransport, TransportError};
pub use validate::validate_staged_image;
