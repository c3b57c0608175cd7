//! End-to-end tests for `run_check` with the fixture database, exception
//! list, module index and inventory.

use hwcompat_core::{CheckConfig, InventoryProvider, InventorySnapshot, OsVersion, StaticInventory};
use hwcompat_engine::Status;
use hwcompat_kmod::ResolverMode;
use hwcompat_report::{run_check, ExitStatus, Report};
use std::path::{Path, PathBuf};

fn fixture(relative: &str) -> PathBuf {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap();
    let workspace_root = Path::new(&manifest_dir).parent().unwrap().parent().unwrap();
    workspace_root.join("testing/fixtures").join(relative)
}

fn config() -> CheckConfig {
    CheckConfig::new(OsVersion::major(9))
        .database(fixture("deprecation/native.json"))
        .exceptions(Some(fixture("exceptions.json")))
        .kmod_index(fixture("kmod-idx"))
}

fn inventory() -> InventorySnapshot {
    InventorySnapshot::load(fixture("inventory.json")).unwrap()
}

fn status_of(report: &Report, device: &str) -> Status {
    report
        .devices
        .iter()
        .find(|l| l.device.starts_with(device))
        .map(|l| l.status)
        .unwrap()
}

// =============================================================================
// Full Pipeline
// =============================================================================

#[test]
fn test_check_against_next_release() {
    let report = run_check(&config(), &inventory()).unwrap();

    assert_eq!(report.devices.len(), 8);
    assert_eq!(report.target_version, OsVersion::major(9));
    assert_eq!(
        report.resolver,
        ResolverMode::Enabled {
            resolver: "kmod-index".to_string()
        }
    );

    assert_eq!(status_of(&report, "0000:01:00.0"), Status::Unsupported);
    assert_eq!(status_of(&report, "0000:03:00.0"), Status::Unsupported);
    assert_eq!(status_of(&report, "0000:04:00.0"), Status::Supported);
    assert_eq!(status_of(&report, "0000:00:1d.0"), Status::Supported);
    assert_eq!(status_of(&report, "0000:05:00.0"), Status::Unsupported);
    assert_eq!(status_of(&report, "0000:06:00.0"), Status::Supported);
    assert_eq!(status_of(&report, "platform:floppy.0"), Status::Unsupported);
    assert_eq!(status_of(&report, "0000:07:00.0"), Status::Unknown);

    assert_eq!(report.summary.unsupported, 4);
    assert_eq!(report.summary.supported, 3);
    assert_eq!(report.summary.unknown, 1);
    assert_eq!(report.exit_status(), ExitStatus::Incompatible);
}

#[test]
fn test_unbound_loaded_modules_are_reported() {
    let report = run_check(&config(), &inventory()).unwrap();

    // Modules bound to a device are covered by that device's line
    assert_eq!(report.modules.len(), 1);
    let qla = &report.modules[0];
    assert_eq!(qla.module, "qla3xxx");
    assert_eq!(qla.status, Status::Unsupported);
    assert_eq!(qla.entry_id, "driver:qla3xxx");
    assert_eq!(qla.reason, "QLogic ISP3XXX network driver removed");
    assert_eq!(report.devices.len(), 8);

    let current = run_check(&config().target(OsVersion::major(8)), &inventory()).unwrap();
    assert_eq!(current.modules[0].status, Status::Deprecated);
    assert_eq!(current.exit_status(), ExitStatus::Compatible);

    let devices_only = StaticInventory::new(inventory().devices().unwrap());
    let report = run_check(&config(), &devices_only).unwrap();
    assert!(report.modules.is_empty());
}

#[test]
fn test_override_and_exemption_are_visible() {
    let report = run_check(&config(), &inventory()).unwrap();

    let raid = &report.devices[2];
    assert!(raid.overridden);
    assert_eq!(raid.entry_id.as_deref(), Some("1000:0071"));
    assert!(raid.note.as_deref().unwrap().contains("megaraid_sas"));

    let uhci = &report.devices[3];
    assert!(uhci.exempted);
    assert!(report.notes.iter().any(|n| n.contains("exception list")));
}

#[test]
fn test_reasons_in_report() {
    let report = run_check(&config(), &inventory()).unwrap();

    assert_eq!(report.devices[0].reason, "No driver");
    assert_eq!(report.devices[6].reason, "Module floppy is removed");
    assert_eq!(report.devices[4].reason, "OEM subsystem variant without firmware support");
    assert_eq!(report.devices[5].reason, "");
    assert!(report.devices[7].reason.contains("zzzz:0001"));

    let hidden = run_check(&config().hide_reason(true), &inventory()).unwrap();
    assert!(hidden.devices.iter().all(|l| l.reason.is_empty()));
    let statuses = |r: &Report| r.devices.iter().map(|l| l.status).collect::<Vec<_>>();
    assert_eq!(statuses(&report), statuses(&hidden));
}

#[test]
fn test_skip_kmod_drops_overrides() {
    let report = run_check(&config().skip_kmod(true), &inventory()).unwrap();

    assert_eq!(report.resolver, ResolverMode::Skipped);
    assert_eq!(status_of(&report, "0000:04:00.0"), Status::Unsupported);
    assert_eq!(report.summary.unsupported, 5);
}

#[test]
fn test_missing_index_degrades() {
    let config = config().kmod_index(fixture("no-such-kmod-idx"));
    let report = run_check(&config, &inventory()).unwrap();

    assert!(report.resolver.is_degraded());
    assert!(report.notes.iter().any(|n| n.contains("less precise")));
    assert_eq!(status_of(&report, "0000:04:00.0"), Status::Unsupported);
}

#[test]
fn test_current_release_reports_deprecation() {
    let report = run_check(&config().target(OsVersion::major(8)), &inventory()).unwrap();

    assert_eq!(status_of(&report, "0000:03:00.0"), Status::Deprecated);
    assert_eq!(status_of(&report, "0000:01:00.0"), Status::Supported);
    assert_eq!(status_of(&report, "platform:floppy.0"), Status::Supported);
    assert_eq!(report.summary.unsupported, 0);
    assert_eq!(report.exit_status(), ExitStatus::Compatible);
}

#[test]
fn test_legacy_database() {
    let config = config().database(fixture("deprecation/legacy.json"));
    let report = run_check(&config, &inventory()).unwrap();

    // mptsas is gone in 9, megaraid_sas still ships
    assert_eq!(status_of(&report, "0000:03:00.0"), Status::Unsupported);
    assert_eq!(status_of(&report, "0000:04:00.0"), Status::Supported);
    assert_eq!(status_of(&report, "0000:01:00.0"), Status::Supported);
    assert_eq!(status_of(&report, "platform:floppy.0"), Status::Unsupported);
}

// =============================================================================
// Config, Output and Failures
// =============================================================================

#[test]
fn test_yaml_config_with_entry_dump() {
    let config = CheckConfig::load(fixture("hwcompat.yaml"))
        .unwrap()
        .database(fixture("deprecation/native.json"))
        .exceptions(None)
        .kmod_index(fixture("kmod-idx"));
    assert_eq!(config.target_version, OsVersion::major(8));

    let report = run_check(&config, &inventory()).unwrap();
    let entries = report.entries.as_ref().unwrap();
    assert_eq!(entries.len(), 8);
    assert_eq!(report.devices[1].entry.as_ref().map(|e| e.id()), Some("1000:0058"));
}

#[test]
fn test_report_json_is_stable() {
    let first = run_check(&config(), &inventory()).unwrap().to_json().unwrap();
    let second = run_check(&config(), &inventory()).unwrap().to_json().unwrap();
    assert_eq!(first, second);

    let value: serde_json::Value = serde_json::from_str(&first).unwrap();
    assert_eq!(value["summary"]["unsupported"], 4);
    assert_eq!(value["devices"][0]["status"], "unsupported");
    assert_eq!(value["modules"][0]["module"], "qla3xxx");
}

#[test]
fn test_database_failure_exit_code() {
    let config = config().database(fixture("deprecation/missing.json"));
    let result = run_check(&config, &StaticInventory::default());

    assert!(result.is_err());
    assert_eq!(ExitStatus::for_result(&result).code(), 2);
}

#[test]
fn test_empty_inventory_is_compatible() {
    let report = run_check(&config(), &StaticInventory::default()).unwrap();
    assert!(report.devices.is_empty());
    assert_eq!(ExitStatus::for_result(&Ok(report)).code(), 0);
}
