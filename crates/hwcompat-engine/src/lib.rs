//! hwcompat-engine: per-device compatibility verdicts.
//!
//! ```
//! use hwcompat_core::{DetectedDevice, OsVersion};
//! use hwcompat_db::DeprecationDatabase;
//! use hwcompat_engine::{CompatibilityEngine, Status};
//!
//! let db = DeprecationDatabase::from_json(
//!     r#"{"entries": [{"id": "1234:5678", "since": 9, "reason": "No driver"}]}"#,
//! ).unwrap();
//! let devices = vec![
//!     DetectedDevice::new("0000:01:00.0").with_id("1234:5678"),
//!     DetectedDevice::new("0000:02:00.0").with_id("abcd:0001"),
//! ];
//!
//! let verdicts = CompatibilityEngine::new(&db).evaluate(&devices, OsVersion::major(9));
//! assert_eq!(verdicts[0].status, Status::Unsupported);
//! assert_eq!(verdicts[1].status, Status::Supported);
//! ```

pub mod engine;
pub mod verdict;

pub use engine::{evaluate, CompatibilityEngine};
pub use verdict::{ModuleCheck, ModuleVerdict, Status, Verdict};
