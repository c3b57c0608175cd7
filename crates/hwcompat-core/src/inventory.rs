//! Hardware inventory providers.
//!
//! Probing the live system is left to the embedding application. This module
//! defines the seam and ships two providers: an in-memory list and a loader
//! for inventories captured to JSON.
//!
//! Besides devices, a provider may report the kernel modules loaded on the
//! host (`lsmod`). Loaded modules not bound to any device are checked on
//! their own.

use crate::device::DetectedDevice;
use crate::error::InventoryError;
use serde::Deserialize;
use std::path::Path;

/// Source of detected devices for one run
pub trait InventoryProvider {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Produce the device list. Called once per run, before evaluation.
    fn devices(&self) -> Result<Vec<DetectedDevice>, InventoryError>;

    /// Names of the loaded kernel modules. Providers that cannot tell
    /// report none.
    fn loaded_modules(&self) -> Result<Vec<String>, InventoryError> {
        Ok(Vec::new())
    }
}

/// Inventory held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    devices: Vec<DetectedDevice>,
    modules: Vec<String>,
}

impl StaticInventory {
    pub fn new(devices: Vec<DetectedDevice>) -> Self {
        Self {
            devices,
            modules: Vec::new(),
        }
    }

    pub fn with_device(mut self, device: DetectedDevice) -> Self {
        self.devices.push(device);
        self
    }

    pub fn with_loaded_module(mut self, module: impl Into<String>) -> Self {
        self.modules.push(module.into());
        self
    }
}

impl InventoryProvider for StaticInventory {
    fn name(&self) -> &str {
        "static"
    }

    fn devices(&self) -> Result<Vec<DetectedDevice>, InventoryError> {
        Ok(self.devices.clone())
    }

    fn loaded_modules(&self) -> Result<Vec<String>, InventoryError> {
        Ok(self.modules.clone())
    }
}

/// Inventory captured to a JSON file, either a bare array of devices or
/// `{"devices": [...], "modules": [...]}`
#[derive(Debug, Clone)]
pub struct InventorySnapshot {
    source: String,
    devices: Vec<DetectedDevice>,
    modules: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
    List(Vec<DetectedDevice>),
    Wrapped {
        devices: Vec<DetectedDevice>,
        #[serde(default)]
        modules: Vec<String>,
    },
}

impl InventorySnapshot {
    /// Load a snapshot from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InventoryError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| InventoryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut snapshot = Self::from_json(&content)?;
        snapshot.source = path.display().to_string();
        tracing::info!(
            source = %snapshot.source,
            devices = snapshot.len(),
            modules = snapshot.modules.len(),
            "loaded inventory snapshot"
        );
        Ok(snapshot)
    }

    /// Parse a snapshot from JSON text
    pub fn from_json(json: &str) -> Result<Self, InventoryError> {
        let file: SnapshotFile = serde_json::from_str(json)
            .map_err(|e| InventoryError::Parse(format!("invalid inventory snapshot: {}", e)))?;

        let (devices, modules) = match file {
            SnapshotFile::List(devices) => (devices, Vec::new()),
            SnapshotFile::Wrapped { devices, modules } => (devices, modules),
        };

        Ok(Self {
            source: "inline".to_string(),
            devices,
            modules,
        })
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl InventoryProvider for InventorySnapshot {
    fn name(&self) -> &str {
        &self.source
    }

    fn devices(&self) -> Result<Vec<DetectedDevice>, InventoryError> {
        Ok(self.devices.clone())
    }

    fn loaded_modules(&self) -> Result<Vec<String>, InventoryError> {
        Ok(self.modules.clone())
    }
}
