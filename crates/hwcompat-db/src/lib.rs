//! hwcompat-db: the deprecation database.
//!
//! # Example
//!
//! ```
//! use hwcompat_core::{DetectedDevice, OsVersion};
//! use hwcompat_db::DeprecationDatabase;
//!
//! let db = DeprecationDatabase::from_json(r#"{
//!     "schema_version": 1,
//!     "entries": [
//!         {"id": "VEN1234:DEV5678", "since": 9, "reason": "No driver", "module": "legacy_net"}
//!     ]
//! }"#).unwrap();
//!
//! let device = DetectedDevice::new("0000:01:00.0").with_id("1234:5678");
//! let matches = db.lookup_device(&device, OsVersion::major(9)).unwrap();
//! assert_eq!(matches[0].entry.reason(), Some("No driver"));
//! ```

pub mod database;
pub mod entry;
pub mod exceptions;
pub mod legacy;

pub use database::{DeprecationDatabase, EntryMatch, SCHEMA_VERSION};
pub use entry::{Criteria, DeprecationEntry, EntryRecord, EntryStatus, MatchRank, Specificity};
pub use exceptions::ExceptionList;
