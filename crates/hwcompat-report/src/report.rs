//! Report assembly.
//!
//! The report is a projection of the verdicts: display policy decides what
//! is shown, never what status a device gets.

use crate::exit::ExitStatus;
use hwcompat_core::{CheckConfig, OsVersion, HWCOMPAT_VERSION};
use hwcompat_db::{DeprecationDatabase, DeprecationEntry, Specificity};
use hwcompat_engine::{ModuleVerdict, Status, Verdict};
use hwcompat_kmod::ResolverMode;
use serde::{Deserialize, Serialize};

/// Display policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportOptions {
    /// Leave reason text out of every line
    pub hide_reason: bool,
    /// Attach the matched entry per line and dump every loaded entry
    pub show_entries: bool,
}

impl From<&CheckConfig> for ReportOptions {
    fn from(config: &CheckConfig) -> Self {
        Self {
            hide_reason: config.hide_reason,
            show_entries: config.show_entries,
        }
    }
}

/// One device in the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLine {
    /// `name description [id]`
    pub device: String,
    pub status: Status,

    /// Empty when there is no reason or reasons are hidden
    pub reason: String,

    /// Id of the deciding entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specificity: Option<Specificity>,

    /// Full matched entry, only with `show_entries`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<DeprecationEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    #[serde(default)]
    pub overridden: bool,
    #[serde(default)]
    pub exempted: bool,
}

impl ReportLine {
    pub fn from_verdict(verdict: &Verdict, options: ReportOptions) -> Self {
        let reason = if options.hide_reason {
            String::new()
        } else {
            verdict.reason_text().to_string()
        };

        Self {
            device: verdict.device.summary(),
            status: verdict.status,
            reason,
            entry_id: verdict.entry.as_ref().map(|e| e.id().to_string()),
            specificity: verdict.specificity,
            entry: if options.show_entries { verdict.entry.clone() } else { None },
            note: verdict.note.clone(),
            overridden: verdict.overridden,
            exempted: verdict.exempted,
        }
    }
}

/// One loaded module that no device is bound to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleLine {
    pub module: String,
    pub status: Status,
    pub reason: String,
    pub entry_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<DeprecationEntry>,

    #[serde(default)]
    pub exempted: bool,
}

impl ModuleLine {
    pub fn from_verdict(verdict: &ModuleVerdict, options: ReportOptions) -> Self {
        Self {
            module: verdict.module.clone(),
            status: verdict.status,
            reason: if options.hide_reason { String::new() } else { verdict.reason.clone() },
            entry_id: verdict.entry.id().to_string(),
            entry: options.show_entries.then(|| verdict.entry.clone()),
            exempted: verdict.exempted,
        }
    }
}

/// Devices per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub supported: usize,
    pub deprecated: usize,
    pub unknown: usize,
    pub unsupported: usize,
}

impl StatusCounts {
    pub fn add(&mut self, status: Status) {
        match status {
            Status::Supported => self.supported += 1,
            Status::Deprecated => self.deprecated += 1,
            Status::Unknown => self.unknown += 1,
            Status::Unsupported => self.unsupported += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.supported + self.deprecated + self.unknown + self.unsupported
    }
}

/// The database snapshot a report was computed against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub source: String,
    pub digest: String,
    pub entries: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub engine_version: String,
    pub target_version: OsVersion,
    pub resolver: ResolverMode,
    pub database: DatabaseInfo,
    pub summary: StatusCounts,

    /// One line per device, in inventory order
    pub devices: Vec<ReportLine>,

    /// Loaded modules without a device that match a driver entry
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<ModuleLine>,

    /// Every loaded entry sorted by id, only with `show_entries`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<DeprecationEntry>>,

    /// Run-level remarks (degraded resolver, exemptions)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl Report {
    /// Project device and module verdicts into a report
    pub fn assemble(
        verdicts: &[Verdict],
        modules: &[ModuleVerdict],
        database: &DeprecationDatabase,
        target: OsVersion,
        resolver: &ResolverMode,
        options: ReportOptions,
    ) -> Self {
        let mut summary = StatusCounts::default();
        let devices: Vec<ReportLine> = verdicts
            .iter()
            .map(|v| {
                summary.add(v.status);
                ReportLine::from_verdict(v, options)
            })
            .collect();

        let mut notes = Vec::new();
        match resolver {
            ResolverMode::Degraded { reason } => notes.push(format!(
                "kernel module index unavailable ({}); driver availability was not checked and results may be less precise",
                reason
            )),
            ResolverMode::Skipped => notes.push("kernel module checks skipped".to_string()),
            ResolverMode::Enabled { .. } => {}
        }

        let exempted = verdicts.iter().filter(|v| v.exempted).count();
        if exempted > 0 {
            notes.push(format!("{} device(s) waived by the local exception list", exempted));
        }
        let exempted_modules = modules.iter().filter(|m| m.exempted).count();
        if exempted_modules > 0 {
            notes.push(format!("{} module(s) waived by the local exception list", exempted_modules));
        }

        Self {
            engine_version: HWCOMPAT_VERSION.to_string(),
            target_version: target,
            resolver: resolver.clone(),
            database: DatabaseInfo {
                source: database.source().to_string(),
                digest: database.digest().to_string(),
                entries: database.len(),
            },
            summary,
            devices,
            modules: modules.iter().map(|m| ModuleLine::from_verdict(m, options)).collect(),
            entries: options.show_entries.then(|| database.entries().to_vec()),
            notes,
        }
    }

    /// Any unsupported device or unsupported loaded module
    pub fn has_unsupported(&self) -> bool {
        self.summary.unsupported > 0 || self.modules.iter().any(|m| m.status == Status::Unsupported)
    }

    pub fn exit_status(&self) -> ExitStatus {
        ExitStatus::for_report(self)
    }

    /// Lines with the given status
    pub fn lines_with(&self, status: Status) -> impl Iterator<Item = &ReportLine> {
        self.devices.iter().filter(move |l| l.status == status)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
