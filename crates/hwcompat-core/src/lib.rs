//! hwcompat core: versions, devices, inventory seam, errors and run config.
//!
//! Everything here is shared by the database, resolver, engine and report
//! crates. Nothing in this crate performs matching.

pub mod config;
pub mod device;
pub mod error;
pub mod ids;
pub mod inventory;
pub mod version;

pub use config::CheckConfig;
pub use device::{normalize_class, normalize_module_name, DetectedDevice, DeviceIdentity};
pub use error::{
    CompatError, ConfigError, DatabaseLoadError, InventoryError, MalformedDeviceError,
    ResolverUnavailableError,
};
pub use ids::{parse_components, IdParseError, PciId};
pub use inventory::{InventoryProvider, InventorySnapshot, StaticInventory};
pub use version::{OsVersion, VersionParseError};

/// Engine version, recorded in reports
pub const HWCOMPAT_VERSION: &str = env!("CARGO_PKG_VERSION");
