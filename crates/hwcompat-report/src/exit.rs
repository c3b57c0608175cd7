//! Process exit status for a pre-flight check

use crate::report::Report;
use hwcompat_core::CompatError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Exit code contract:
/// - `0`: no device or loaded module is unsupported on the target
/// - `1`: at least one device or unbound loaded module is unsupported
/// - `2`: the check could not run (config, database or inventory failure)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitStatus {
    Compatible,
    Incompatible,
    Failure,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Compatible => 0,
            ExitStatus::Incompatible => 1,
            ExitStatus::Failure => 2,
        }
    }

    /// Unknown and deprecated devices do not fail the check
    pub fn for_report(report: &Report) -> Self {
        if report.has_unsupported() {
            ExitStatus::Incompatible
        } else {
            ExitStatus::Compatible
        }
    }

    pub fn for_result(result: &Result<Report, CompatError>) -> Self {
        match result {
            Ok(report) => Self::for_report(report),
            Err(_) => ExitStatus::Failure,
        }
    }
}

impl From<&CompatError> for ExitStatus {
    fn from(_: &CompatError) -> Self {
        ExitStatus::Failure
    }
}

impl From<ExitStatus> for std::process::ExitCode {
    fn from(status: ExitStatus) -> Self {
        std::process::ExitCode::from(status.code() as u8)
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExitStatus::Compatible => write!(f, "compatible"),
            ExitStatus::Incompatible => write!(f, "incompatible"),
            ExitStatus::Failure => write!(f, "failure"),
        }
    }
}
