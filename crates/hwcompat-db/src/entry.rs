//! Deprecation entries and how they match a device
//!
//! An entry names hardware in one of three ways, from most to least specific:
//! a PCI identifier pattern, the driver the device is bound to, or a class
//! code prefix.

use hwcompat_core::{
    normalize_class, normalize_module_name, parse_components, DeviceIdentity, OsVersion, PciId,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Entry as written in the database file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    /// Unique, stable key. Also the PCI pattern when neither `class` nor
    /// `driver` is given.
    pub id: String,

    /// Class code prefix (wildcard entry)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,

    /// Bound driver name (driver-keyed entry)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,

    /// First version on which the hardware is unsupported
    pub since: OsVersion,

    /// First version on which the hardware ships but is unmaintained
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated_since: Option<OsVersion>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Kernel module whose availability can vouch for the hardware
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
}

impl EntryRecord {
    pub fn new(id: impl Into<String>, since: OsVersion) -> Self {
        Self {
            id: id.into(),
            class: None,
            driver: None,
            since,
            deprecated_since: None,
            reason: None,
            module: None,
            device_name: None,
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = Some(driver.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = Some(name.into());
        self
    }

    pub fn deprecated_from(mut self, version: OsVersion) -> Self {
        self.deprecated_since = Some(version);
        self
    }
}

/// How an entry selects devices
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criteria {
    /// PCI identifier prefix: vendor, then device, subvendor, subdevice
    Id(Vec<u16>),
    /// Normalised class code prefix
    Class(String),
    /// Normalised driver module name
    Driver(String),
}

/// How precisely an entry matched. Declaration order is ranking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specificity {
    Class,
    Driver,
    Vendor,
    Device,
    Subvendor,
    Subsystem,
}

impl Specificity {
    /// Exact identifier matches (vendor and device at least)
    pub fn is_exact(&self) -> bool {
        *self >= Specificity::Device
    }
}

impl fmt::Display for Specificity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Specificity::Class => "class",
            Specificity::Driver => "driver",
            Specificity::Vendor => "vendor",
            Specificity::Device => "device",
            Specificity::Subvendor => "subvendor",
            Specificity::Subsystem => "subsystem",
        };
        write!(f, "{}", s)
    }
}

/// Rank of a single match: specificity first, then the number of class
/// digits for class entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MatchRank {
    pub specificity: Specificity,
    pub detail: u8,
}

impl MatchRank {
    fn new(specificity: Specificity) -> Self {
        Self { specificity, detail: 0 }
    }
}

/// What an applicable entry says about the target version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Still shipped, no longer maintained
    Unmaintained,
    /// Not shipped at all
    Removed,
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EntryStatus::Unmaintained => write!(f, "unmaintained"),
            EntryStatus::Removed => write!(f, "removed"),
        }
    }
}

/// A validated, immutable deprecation entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EntryRecord", into = "EntryRecord")]
pub struct DeprecationEntry {
    record: EntryRecord,
    criteria: Criteria,
}

impl TryFrom<EntryRecord> for DeprecationEntry {
    type Error = String;

    fn try_from(record: EntryRecord) -> Result<Self, Self::Error> {
        if record.id.trim().is_empty() {
            return Err("entry id must not be empty".to_string());
        }

        if let Some(deprecated) = record.deprecated_since {
            if deprecated >= record.since {
                return Err(format!(
                    "deprecated_since {} must be lower than since {}",
                    deprecated, record.since
                ));
            }
        }

        let criteria = if let Some(class) = &record.class {
            let normalized = normalize_class(class).ok_or_else(|| format!("invalid class code {:?}", class))?;
            Criteria::Class(normalized)
        } else if let Some(driver) = &record.driver {
            let normalized = normalize_module_name(driver);
            if normalized.is_empty() {
                return Err("driver name must not be empty".to_string());
            }
            Criteria::Driver(normalized)
        } else {
            let components = parse_components(&record.id)
                .map_err(|e| format!("id is not a PCI identifier pattern: {}", e))?;
            Criteria::Id(components)
        };

        Ok(Self { record, criteria })
    }
}

impl From<DeprecationEntry> for EntryRecord {
    fn from(entry: DeprecationEntry) -> Self {
        entry.record
    }
}

impl DeprecationEntry {
    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    pub fn since(&self) -> OsVersion {
        self.record.since
    }

    pub fn deprecated_since(&self) -> Option<OsVersion> {
        self.record.deprecated_since
    }

    pub fn reason(&self) -> Option<&str> {
        self.record.reason.as_deref()
    }

    pub fn module(&self) -> Option<&str> {
        self.record.module.as_deref().filter(|m| !m.trim().is_empty())
    }

    pub fn device_name(&self) -> Option<&str> {
        self.record.device_name.as_deref()
    }

    pub fn record(&self) -> &EntryRecord {
        &self.record
    }

    /// How this entry matches the device, if at all
    pub fn rank_for(&self, identity: &DeviceIdentity) -> Option<MatchRank> {
        match &self.criteria {
            Criteria::Id(pattern) => {
                let pci = identity.pci.as_ref()?;
                id_pattern_matches(pattern, pci).then(|| MatchRank::new(id_specificity(pattern.len())))
            }
            Criteria::Class(prefix) => {
                let class = identity.class.as_deref()?;
                class.starts_with(prefix.as_str()).then(|| MatchRank {
                    specificity: Specificity::Class,
                    detail: prefix.len().min(u8::MAX as usize) as u8,
                })
            }
            Criteria::Driver(name) => {
                let driver = identity.driver.as_deref()?;
                (driver == name).then(|| MatchRank::new(Specificity::Driver))
            }
        }
    }

    /// The version this entry declares for `target`: `since` once removed,
    /// `deprecated_since` while unmaintained, `None` before either.
    pub fn effective_version(&self, target: OsVersion) -> Option<OsVersion> {
        if self.record.since <= target {
            Some(self.record.since)
        } else {
            self.record.deprecated_since.filter(|v| *v <= target)
        }
    }

    pub fn status_at(&self, target: OsVersion) -> Option<EntryStatus> {
        if self.record.since <= target {
            Some(EntryStatus::Removed)
        } else if self.record.deprecated_since.map_or(false, |v| v <= target) {
            Some(EntryStatus::Unmaintained)
        } else {
            None
        }
    }

    /// Stock explanation used when the entry carries no reason text
    pub fn default_reason(&self, status: EntryStatus) -> String {
        match &self.criteria {
            Criteria::Id(_) => format!("Device with ID {} is {}", self.record.id, status),
            Criteria::Driver(name) => format!("Module {} is {}", name, status),
            Criteria::Class(class) => format!("Device class {} is {}", class, status),
        }
    }
}

fn id_pattern_matches(pattern: &[u16], pci: &PciId) -> bool {
    let components = pci.components();
    pattern.len() <= components.len() && pattern.iter().zip(components.iter()).all(|(p, c)| p == c)
}

fn id_specificity(components: usize) -> Specificity {
    match components {
        1 => Specificity::Vendor,
        2 => Specificity::Device,
        3 => Specificity::Subvendor,
        _ => Specificity::Subsystem,
    }
}
