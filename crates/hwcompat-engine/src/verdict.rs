//! Verdict types for device evaluation
//!
//! Supported/Deprecated/Unknown/Unsupported outcomes with the entry that
//! decided them.

use hwcompat_core::{DetectedDevice, OsVersion};
use hwcompat_db::{DeprecationEntry, Specificity};
use hwcompat_kmod::ModuleAvailability;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome for one device. Declaration order is severity order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// No applicable entry, or a driver module vouches for the device
    Supported,
    /// Ships on the target but is no longer maintained
    Deprecated,
    /// Not enough identity data to decide
    Unknown,
    /// Not supported on the target
    Unsupported,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Status::Supported => write!(f, "supported"),
            Status::Deprecated => write!(f, "deprecated"),
            Status::Unknown => write!(f, "unknown"),
            Status::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// A module lookup made while deciding a verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleCheck {
    pub module: String,
    pub target: OsVersion,
    pub availability: ModuleAvailability,
}

/// The evaluation result for a single device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub device: DetectedDevice,
    pub status: Status,

    /// Winning database entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<DeprecationEntry>,

    /// How the winning entry matched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specificity: Option<Specificity>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Extra context (module override, exemption)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_check: Option<ModuleCheck>,

    /// A confirmed driver module turned an unsupported match into supported
    #[serde(default)]
    pub overridden: bool,

    /// The local exception list waived a negative outcome
    #[serde(default)]
    pub exempted: bool,
}

impl Verdict {
    fn base(device: &DetectedDevice, status: Status) -> Self {
        Self {
            device: device.clone(),
            status,
            entry: None,
            specificity: None,
            reason: None,
            note: None,
            module_check: None,
            overridden: false,
            exempted: false,
        }
    }

    /// No applicable entry
    pub fn supported(device: &DetectedDevice) -> Self {
        Self::base(device, Status::Supported)
    }

    /// Device could not be classified
    pub fn unknown(device: &DetectedDevice, reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::base(device, Status::Unknown)
        }
    }

    /// Outcome decided by a database entry
    pub fn from_entry(
        device: &DetectedDevice,
        status: Status,
        entry: &DeprecationEntry,
        specificity: Specificity,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            entry: Some(entry.clone()),
            specificity: Some(specificity),
            reason: Some(reason.into()),
            ..Self::base(device, status)
        }
    }

    pub fn with_module_check(mut self, check: ModuleCheck) -> Self {
        self.module_check = Some(check);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Mark as supported because the driver module ships on the target.
    /// The entry and its reason are kept for reference.
    pub fn override_by_module(mut self, module: &str, target: OsVersion) -> Self {
        self.status = Status::Supported;
        self.overridden = true;
        self.note = Some(format!(
            "supported via driver availability: module {} ships for {}",
            module, target
        ));
        self
    }

    /// Waive an unsupported or deprecated outcome
    pub fn exempt(mut self) -> Self {
        self.status = Status::Supported;
        self.exempted = true;
        self.note = Some("exempted by local exception list".to_string());
        self
    }

    pub fn is_supported(&self) -> bool {
        self.status == Status::Supported
    }

    pub fn is_unsupported(&self) -> bool {
        self.status == Status::Unsupported
    }

    /// Reason text, empty when there is none
    pub fn reason_text(&self) -> &str {
        self.reason.as_deref().unwrap_or("")
    }
}

/// Outcome for a loaded kernel module no detected device is bound to.
///
/// Only modules matching a driver entry get one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleVerdict {
    /// Normalised module name
    pub module: String,
    pub status: Status,
    pub entry: DeprecationEntry,
    pub reason: String,

    #[serde(default)]
    pub exempted: bool,
}

impl ModuleVerdict {
    /// Waive the finding, like [`Verdict::exempt`]
    pub fn exempt(mut self) -> Self {
        self.status = Status::Supported;
        self.exempted = true;
        self
    }

    pub fn is_unsupported(&self) -> bool {
        self.status == Status::Unsupported
    }
}

impl fmt::Display for ModuleVerdict {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:<12} module {}: {}",
            self.status.to_string().to_uppercase(),
            self.module,
            self.reason
        )
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:<12} {}", self.status.to_string().to_uppercase(), self.device.summary())?;
        if let Some(reason) = &self.reason {
            write!(f, ": {}", reason)?;
        }
        if let Some(note) = &self.note {
            write!(f, " ({})", note)?;
        }
        Ok(())
    }
}
