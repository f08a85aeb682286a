//! Human-readable rendering of a validation report.

use comfy_table::{Cell, Table};

use otacheck_core::report::describe_cfsr;
use otacheck_core::ValidationReport;

/// Render the per-check table, decoded fault bits, and the overall
/// verdict. The machine-readable report is the record itself; this is the
/// operator view.
pub fn render(report: &ValidationReport) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Check", "Result", "Detail"]);

    for (name, ok) in report.checks() {
        table.add_row(vec![
            Cell::new(name),
            Cell::new(if ok { "PASS" } else { "FAIL" }),
            Cell::new(detail(report, name)),
        ]);
    }

    let mut out = String::new();
    out.push_str(&table.to_string());
    out.push('\n');

    for desc in describe_cfsr(report.fault_status) {
        out.push_str(&format!("  fault: {desc}\n"));
    }

    out.push_str(&format!("OTA state: 0x{:02X}\n", report.ota_state));
    out.push_str(&format!(
        "OVERALL: {}\n",
        if report.overall_pass() { "PASS" } else { "FAIL" }
    ));
    out
}

fn detail(report: &ValidationReport, check: &str) -> String {
    match check {
        "Core Halt" if report.halt_success => format!(
            "PC=0x{:08X} SP=0x{:08X}",
            report.pc_at_halt, report.sp_at_halt
        ),
        "Metadata Valid" if report.metadata_valid => {
            format!("state=0x{:02X}", report.ota_state)
        }
        "CRC32 Match" => format!(
            "calc=0x{:08X} stored=0x{:08X}",
            report.calculated_crc, report.stored_crc
        ),
        "No Pending Faults" => format!("CFSR=0x{:08X}", report.fault_status),
        _ => "-".into(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_all_false() {
        let text = render(&ValidationReport::default());
        assert!(text.contains("Core Halt"));
        assert!(text.contains("FAIL"));
        assert!(text.contains("OVERALL: FAIL"));
        assert!(!text.contains("PASS"));
    }

    #[test]
    fn test_render_pass_with_values() {
        let report = ValidationReport {
            halt_success: true,
            pc_at_halt: 0x0800_9000,
            sp_at_halt: 0x2002_0000,
            metadata_valid: true,
            ota_state: 0x01,
            crc_valid: true,
            calculated_crc: 0xCBF43926,
            stored_crc: 0xCBF43926,
            hash_valid: true,
            boot_vector_sane: true,
            no_hardfault_pending: true,
            fault_status: 0,
            version_monotonic: true,
        };
        let text = render(&report);
        assert!(text.contains("OVERALL: PASS"));
        assert!(text.contains("0xCBF43926"));
        assert!(text.contains("PC=0x08009000"));
        assert!(text.contains("OTA state: 0x01"));
    }

    #[test]
    fn test_render_decodes_fault_bits() {
        let report = ValidationReport {
            halt_success: true,
            fault_status: 0x0000_0100,
            ..ValidationReport::default()
        };
        let text = render(&report);
        assert!(text.contains("IBUSERR"));
        assert!(text.contains("CFSR=0x00000100"));
    }
}
