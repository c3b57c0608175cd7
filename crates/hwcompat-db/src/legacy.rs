//! Import of the legacy `device_driver_deprecation_data.json` layout.
//!
//! Legacy rows list the releases a device or driver is available and
//! maintained in rather than the release it goes away in:
//!
//! ```json
//! {"data": [{"device_id": "0x1000:0x0071", "device_type": "pci",
//!            "driver_name": "megaraid_sas", "device_name": "MR SAS HBA 2004",
//!            "available_in_rhel": [7, 8], "maintained_in_rhel": [7]}]}
//! ```
//!
//! Each row becomes one entry: `since` is the release after the last
//! available one, `deprecated_since` the release after the last maintained
//! one. Rows without `device_id` are keyed by driver name. Later rows win
//! over earlier rows with the same key.
//!
//! A list with gaps (`[7, 9]`) cannot be expressed as a single window; the
//! gap is dropped with a warning and the device counts as available in 8.

use crate::entry::EntryRecord;
use hwcompat_core::{parse_components, DatabaseLoadError, OsVersion};
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize)]
struct LegacyFile {
    data: Vec<LegacyRow>,
}

#[derive(Debug, Clone, Deserialize)]
struct LegacyRow {
    #[serde(default)]
    device_id: String,
    #[serde(default = "default_device_type")]
    device_type: String,
    #[serde(default)]
    driver_name: String,
    #[serde(default)]
    device_name: Option<String>,
    #[serde(default)]
    available_in_rhel: Vec<u32>,
    #[serde(default)]
    maintained_in_rhel: Vec<u32>,
}

fn default_device_type() -> String {
    "pci".to_string()
}

/// Legacy files have a top-level `data` array and no `entries`
pub fn is_legacy(value: &serde_json::Value) -> bool {
    value.get("data").is_some() && value.get("entries").is_none()
}

/// Convert a legacy document to native records
pub fn convert(value: serde_json::Value) -> Result<Vec<EntryRecord>, DatabaseLoadError> {
    let file: LegacyFile = serde_json::from_value(value)
        .map_err(|e| DatabaseLoadError::Parse(format!("invalid legacy database: {}", e)))?;

    let mut records: BTreeMap<String, EntryRecord> = BTreeMap::new();
    let mut skipped = 0usize;

    for row in file.data {
        let Some(record) = convert_row(&row)? else {
            skipped += 1;
            continue;
        };

        if records.insert(record.id.clone(), record).is_some() {
            tracing::debug!(device_id = %row.device_id, driver = %row.driver_name, "legacy row overrides an earlier one");
        }
    }

    tracing::debug!(entries = records.len(), skipped, "converted legacy database");
    Ok(records.into_values().collect())
}

fn convert_row(row: &LegacyRow) -> Result<Option<EntryRecord>, DatabaseLoadError> {
    let device_id = row.device_id.trim();
    let driver = row.driver_name.trim();

    // Only PCI identifiers are matchable; other buses fall back to nothing
    if !device_id.is_empty() && !row.device_type.eq_ignore_ascii_case("pci") {
        return Ok(None);
    }
    if device_id.is_empty() && driver.is_empty() {
        return Ok(None);
    }

    let key = if device_id.is_empty() {
        format!("driver:{}", driver)
    } else {
        device_id.to_string()
    };
    let since = release_after(&key, "available_in_rhel", &row.available_in_rhel)?;
    let unmaintained_from = release_after(&key, "maintained_in_rhel", &row.maintained_in_rhel)?;

    let mut record = if device_id.is_empty() {
        EntryRecord::new(key, since).with_driver(driver)
    } else {
        let components = parse_components(device_id).map_err(|e| DatabaseLoadError::InvalidEntry {
            id: device_id.to_string(),
            message: e.to_string(),
        })?;
        let id = components
            .iter()
            .map(|c| format!("{:04x}", c))
            .collect::<Vec<_>>()
            .join(":");
        let mut record = EntryRecord::new(id, since);
        if !driver.is_empty() {
            record = record.with_module(driver);
        }
        record
    };

    if unmaintained_from < since {
        record = record.deprecated_from(unmaintained_from);
    }
    if let Some(name) = row.device_name.as_deref().filter(|n| !n.trim().is_empty()) {
        record = record.with_device_name(name);
    }

    Ok(Some(record))
}

/// First major release after the last listed one; `0` for an empty list
fn release_after(key: &str, field: &str, releases: &[u32]) -> Result<OsVersion, DatabaseLoadError> {
    let Some(&last) = releases.iter().max() else {
        return Ok(OsVersion::major(0));
    };

    let mut sorted = releases.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    if sorted.windows(2).any(|w| w[1] - w[0] > 1) {
        tracing::warn!(entry = %key, field, releases = ?sorted, "legacy release list has gaps; treating it as contiguous");
    }

    OsVersion::major(last)
        .next_major()
        .ok_or_else(|| DatabaseLoadError::InvalidEntry {
            id: key.to_string(),
            message: format!("{} release {} is out of range", field, last),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detects_layout() {
        assert!(is_legacy(&json!({"data": []})));
        assert!(!is_legacy(&json!({"entries": []})));
    }

    #[test]
    fn test_convert_pci_row() {
        let records = convert(json!({"data": [{
            "device_id": "0x1000:0x0071",
            "device_type": "pci",
            "driver_name": "megaraid-sas",
            "device_name": "MR SAS HBA 2004",
            "available_in_rhel": [7, 8],
            "maintained_in_rhel": [7]
        }]}))
        .unwrap();

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.id, "1000:0071");
        assert_eq!(r.since, OsVersion::major(9));
        assert_eq!(r.deprecated_since, Some(OsVersion::major(8)));
        assert_eq!(r.module.as_deref(), Some("megaraid-sas"));
        assert_eq!(r.device_name.as_deref(), Some("MR SAS HBA 2004"));
    }

    #[test]
    fn test_convert_driver_row_and_overrides() {
        let records = convert(json!({"data": [
            {"device_id": "", "driver_name": "floppy", "available_in_rhel": [7], "maintained_in_rhel": [7]},
            {"device_id": "", "driver_name": "floppy", "available_in_rhel": [7, 8], "maintained_in_rhel": [7, 8]}
        ]}))
        .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "driver:floppy");
        assert_eq!(records[0].driver.as_deref(), Some("floppy"));
        assert_eq!(records[0].since, OsVersion::major(9));
        assert_eq!(records[0].deprecated_since, None);
    }

    #[test]
    fn test_skips_unmatchable_rows() {
        let records = convert(json!({"data": [
            {"device_id": "046d:c52b", "device_type": "usb", "driver_name": "", "available_in_rhel": []},
            {"device_id": "", "driver_name": "", "available_in_rhel": [8]}
        ]}))
        .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_never_available_is_removed_everywhere() {
        let records = convert(json!({"data": [
            {"device_id": "8086:1234", "driver_name": "", "available_in_rhel": [], "maintained_in_rhel": []}
        ]}))
        .unwrap();
        assert_eq!(records[0].since, OsVersion::major(0));
        assert_eq!(records[0].deprecated_since, None);
    }

    #[test]
    fn test_release_out_of_range() {
        let err = convert(json!({"data": [
            {"device_id": "8086:1234", "driver_name": "", "available_in_rhel": [4294967295u32]}
        ]}))
        .unwrap_err();
        assert!(matches!(&err, DatabaseLoadError::InvalidEntry { id, .. } if id == "8086:1234"));
        assert!(err.to_string().contains("available_in_rhel"));

        let err = convert(json!({"data": [
            {"device_id": "", "driver_name": "floppy", "available_in_rhel": [8], "maintained_in_rhel": [4294967295u32]}
        ]}))
        .unwrap_err();
        assert!(matches!(&err, DatabaseLoadError::InvalidEntry { id, .. } if id == "driver:floppy"));
    }

    #[test]
    fn test_gaps_collapse_to_last_release() {
        let records = convert(json!({"data": [
            {"device_id": "8086:1234", "driver_name": "", "available_in_rhel": [9, 7], "maintained_in_rhel": [7]}
        ]}))
        .unwrap();
        assert_eq!(records[0].since, OsVersion::major(10));
        assert_eq!(records[0].deprecated_since, Some(OsVersion::major(8)));
    }

    #[test]
    fn test_bad_device_id() {
        let err = convert(json!({"data": [{"device_id": "pci:xyz", "driver_name": "x"}]})).unwrap_err();
        assert!(matches!(err, DatabaseLoadError::InvalidEntry { .. }));
    }
}
