//! Detected hardware as handed over by an inventory provider

use crate::error::MalformedDeviceError;
use crate::ids::PciId;
use serde::{Deserialize, Serialize};

/// Kernel module names use `_` and `-` interchangeably; compare on `_`.
pub fn normalize_module_name(name: &str) -> String {
    name.trim().replace('-', "_")
}

/// A hardware component found on the host.
///
/// All identity fields are kept as the provider reported them; the engine
/// parses them lazily so one bad device never spoils a whole inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedDevice {
    /// Stable location of the device (PCI slot, sysfs path)
    pub name: String,

    /// Human-readable vendor/product text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Raw identifier, e.g. `8086:1234` or `8086:1234:1028:0abc`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Hex class code (`class`, `class+subclass` or with prog-if)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,

    /// Currently bound driver module
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modalias: Option<String>,
}

/// Parsed identity of a device
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceIdentity {
    pub pci: Option<PciId>,
    /// Lowercase hex without prefix
    pub class: Option<String>,
    /// Normalised module name
    pub driver: Option<String>,
    pub modalias: Option<String>,
}

impl DeviceIdentity {
    /// True when the device carries any identifying information: an
    /// identifier, a class code, a bound driver or a modalias.
    pub fn is_identifiable(&self) -> bool {
        self.pci.is_some() || self.class.is_some() || self.driver.is_some() || self.modalias.is_some()
    }
}

impl DetectedDevice {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            id: None,
            class: None,
            driver: None,
            modalias: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = Some(driver.into());
        self
    }

    pub fn with_modalias(mut self, modalias: impl Into<String>) -> Self {
        self.modalias = Some(modalias.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Parse the raw identity fields.
    ///
    /// Blank fields count as absent. A present but unparsable identifier or
    /// class code is a [`MalformedDeviceError`].
    pub fn identity(&self) -> Result<DeviceIdentity, MalformedDeviceError> {
        let pci = match non_blank(&self.id) {
            Some(raw) => Some(PciId::parse(raw).map_err(|source| MalformedDeviceError::InvalidId {
                device: self.name.clone(),
                value: raw.to_string(),
                source,
            })?),
            None => None,
        };

        let class = match non_blank(&self.class) {
            Some(raw) => Some(normalize_class(raw).ok_or_else(|| MalformedDeviceError::InvalidClass {
                device: self.name.clone(),
                value: raw.to_string(),
            })?),
            None => None,
        };

        let driver = non_blank(&self.driver).map(normalize_module_name);
        let modalias = non_blank(&self.modalias).map(str::to_string);

        Ok(DeviceIdentity {
            pci,
            class,
            driver,
            modalias,
        })
    }

    /// One-line description: name, then description or identifier
    pub fn summary(&self) -> String {
        let mut parts = vec![self.name.clone()];
        if let Some(desc) = non_blank(&self.description) {
            parts.push(desc.to_string());
        }
        if let Some(id) = non_blank(&self.id) {
            parts.push(format!("[{}]", id));
        }
        parts.join(" ")
    }
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Lowercase a hex class code and drop an optional `0x` prefix.
/// Returns `None` when the code is not hex.
pub fn normalize_class(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(digits.to_ascii_lowercase())
}
