//! hwcompat-report: the pre-flight check as a library call.
//!
//! ```no_run
//! use hwcompat_core::{CheckConfig, InventorySnapshot};
//! use hwcompat_report::{run_check, ExitStatus};
//!
//! let config = CheckConfig::default().with_env_overrides()?;
//! let inventory = InventorySnapshot::load("inventory.json")?;
//!
//! let result = run_check(&config, &inventory);
//! if let Ok(report) = &result {
//!     println!("{}", report.to_json()?);
//! }
//! std::process::exit(ExitStatus::for_result(&result).code());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod check;
pub mod exit;
pub mod report;

pub use check::run_check;
pub use exit::ExitStatus;
pub use report::{DatabaseInfo, ModuleLine, Report, ReportLine, ReportOptions, StatusCounts};
