//! The compatibility engine.
//!
//! Per device:
//!
//! ```text
//! identity ──malformed/absent──→ Unknown
//!     │
//! database lookup ──no match──→ Supported
//!     │
//! winner (rank, version, id)
//!     │
//!     ├─ unmaintained ──────────────────────→ Deprecated
//!     └─ removed ── module? ──Available──→ Supported (overridden)
//!                      │
//!                      └─ Unavailable/Unknown/none → Unsupported
//! ```
//!
//! Exceptions are applied last and can only waive Deprecated/Unsupported.
//!
//! Loaded modules that no device is bound to are checked separately against
//! driver entries, see [`CompatibilityEngine::evaluate_modules`].

use crate::verdict::{ModuleCheck, ModuleVerdict, Status, Verdict};
use hwcompat_core::{normalize_module_name, DetectedDevice, OsVersion};
use hwcompat_db::{DeprecationDatabase, EntryStatus, ExceptionList};
use hwcompat_kmod::{ModuleResolver, NoopResolver};
use std::collections::BTreeSet;

static NOOP: NoopResolver = NoopResolver;

/// Evaluates devices against an immutable database snapshot
pub struct CompatibilityEngine<'a> {
    database: &'a DeprecationDatabase,
    resolver: &'a dyn ModuleResolver,
    exceptions: Option<&'a ExceptionList>,
}

impl<'a> CompatibilityEngine<'a> {
    /// Engine without module checks or exceptions
    pub fn new(database: &'a DeprecationDatabase) -> Self {
        Self {
            database,
            resolver: &NOOP,
            exceptions: None,
        }
    }

    pub fn with_resolver(mut self, resolver: &'a dyn ModuleResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_exceptions(mut self, exceptions: &'a ExceptionList) -> Self {
        self.exceptions = Some(exceptions);
        self
    }

    pub fn database(&self) -> &DeprecationDatabase {
        self.database
    }

    /// One verdict per device, in input order
    pub fn evaluate(&self, devices: &[DetectedDevice], target: OsVersion) -> Vec<Verdict> {
        let verdicts: Vec<Verdict> = devices.iter().map(|d| self.evaluate_device(d, target)).collect();

        tracing::info!(
            target_version = %target,
            devices = verdicts.len(),
            unsupported = verdicts.iter().filter(|v| v.is_unsupported()).count(),
            resolver = self.resolver.name(),
            "evaluated inventory"
        );
        verdicts
    }

    pub fn evaluate_device(&self, device: &DetectedDevice, target: OsVersion) -> Verdict {
        let verdict = self.decide(device, target);
        let verdict = self.apply_exceptions(device, verdict);

        tracing::debug!(
            device = %device.name,
            status = %verdict.status,
            entry = verdict.entry.as_ref().map(|e| e.id()).unwrap_or("-"),
            overridden = verdict.overridden,
            exempted = verdict.exempted,
            "device verdict"
        );
        verdict
    }

    /// Findings for the `loaded` modules not bound to any of `devices`,
    /// sorted by module name.
    ///
    /// The module resolver is not consulted: a loaded module is on disk now,
    /// the entry says whether it ships on the target.
    pub fn evaluate_modules(
        &self,
        loaded: &[String],
        devices: &[DetectedDevice],
        target: OsVersion,
    ) -> Vec<ModuleVerdict> {
        let bound: BTreeSet<String> = devices
            .iter()
            .filter_map(|d| d.driver.as_deref())
            .map(normalize_module_name)
            .collect();
        let unbound: BTreeSet<String> = loaded
            .iter()
            .map(|m| normalize_module_name(m))
            .filter(|m| !m.is_empty() && !bound.contains(m))
            .collect();

        let verdicts: Vec<ModuleVerdict> = unbound
            .into_iter()
            .filter_map(|module| {
                let winner = self.database.lookup_module(&module, target)?;
                let entry_status = winner.entry.status_at(target)?;
                let status = match entry_status {
                    EntryStatus::Unmaintained => Status::Deprecated,
                    EntryStatus::Removed => Status::Unsupported,
                };
                let reason = winner
                    .entry
                    .reason()
                    .map(str::to_string)
                    .unwrap_or_else(|| winner.entry.default_reason(entry_status));

                let verdict = ModuleVerdict {
                    module,
                    status,
                    entry: winner.entry.clone(),
                    reason,
                    exempted: false,
                };
                tracing::debug!(module = %verdict.module, status = %verdict.status, entry = verdict.entry.id(), "module verdict");

                Some(match self.exceptions {
                    Some(exceptions) if exceptions.is_exempt(&verdict.module) => verdict.exempt(),
                    _ => verdict,
                })
            })
            .collect();

        if !verdicts.is_empty() {
            tracing::info!(
                target_version = %target,
                loaded = loaded.len(),
                findings = verdicts.len(),
                "evaluated unbound modules"
            );
        }
        verdicts
    }

    fn decide(&self, device: &DetectedDevice, target: OsVersion) -> Verdict {
        let identity = match device.identity() {
            Ok(identity) => identity,
            Err(e) => {
                tracing::debug!(device = %device.name, error = %e, "malformed device");
                return Verdict::unknown(device, e.to_string());
            }
        };

        if !identity.is_identifiable() {
            return Verdict::unknown(device, "no identifier, class, driver or modalias information");
        }

        let matches = self.database.lookup(&identity, target);
        let Some(winner) = matches.first() else {
            return Verdict::supported(device);
        };

        let entry = winner.entry;
        let specificity = winner.rank.specificity;
        let Some(entry_status) = entry.status_at(target) else {
            // Lookup only returns entries that apply at the target
            return Verdict::supported(device);
        };
        let reason = entry
            .reason()
            .map(str::to_string)
            .unwrap_or_else(|| entry.default_reason(entry_status));

        if matches.len() > 1 {
            tracing::debug!(
                device = %device.name,
                winner = entry.id(),
                candidates = matches.len(),
                "multiple entries matched"
            );
        }

        match entry_status {
            EntryStatus::Unmaintained => {
                Verdict::from_entry(device, Status::Deprecated, entry, specificity, reason)
            }
            EntryStatus::Removed => {
                let verdict = Verdict::from_entry(device, Status::Unsupported, entry, specificity, reason);

                let Some(module) = entry.module() else {
                    return verdict;
                };

                let availability = self.resolver.lookup(module, target);
                let verdict = verdict.with_module_check(ModuleCheck {
                    module: module.to_string(),
                    target,
                    availability,
                });

                if availability.confirms_driver() {
                    verdict.override_by_module(module, target)
                } else {
                    verdict
                }
            }
        }
    }

    fn apply_exceptions(&self, device: &DetectedDevice, verdict: Verdict) -> Verdict {
        let waivable = matches!(verdict.status, Status::Unsupported | Status::Deprecated);
        match self.exceptions {
            Some(exceptions) if waivable && exceptions.exempts(device) => verdict.exempt(),
            _ => verdict,
        }
    }
}

/// Evaluate `devices` at `target`.
///
/// With `module_resolver_enabled == false` the given resolver is never
/// consulted; every module lookup is answered `Unknown`.
pub fn evaluate(
    devices: &[DetectedDevice],
    database: &DeprecationDatabase,
    target: OsVersion,
    module_resolver_enabled: bool,
    resolver: &dyn ModuleResolver,
) -> Vec<Verdict> {
    let resolver: &dyn ModuleResolver = if module_resolver_enabled { resolver } else { &NOOP };
    CompatibilityEngine::new(database)
        .with_resolver(resolver)
        .evaluate(devices, target)
}
