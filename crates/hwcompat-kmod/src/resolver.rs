//! Resolver trait and the in-memory implementations

use hwcompat_core::{normalize_module_name, OsVersion};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Answer to "does `module` ship for `target`?"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleAvailability {
    Available,
    Unavailable,
    /// No record for this module/version pair
    Unknown,
}

impl ModuleAvailability {
    /// Only a confirmed `Available` may override a database match
    pub fn confirms_driver(&self) -> bool {
        matches!(self, ModuleAvailability::Available)
    }
}

impl fmt::Display for ModuleAvailability {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ModuleAvailability::Available => write!(f, "available"),
            ModuleAvailability::Unavailable => write!(f, "unavailable"),
            ModuleAvailability::Unknown => write!(f, "unknown"),
        }
    }
}

/// Kernel module index capability.
///
/// Implementations are immutable snapshots; a lookup never performs I/O.
pub trait ModuleResolver {
    /// Short name for logs and reports
    fn name(&self) -> &str;

    fn lookup(&self, module: &str, target: OsVersion) -> ModuleAvailability;
}

impl<R: ModuleResolver + ?Sized> ModuleResolver for &R {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn lookup(&self, module: &str, target: OsVersion) -> ModuleAvailability {
        (**self).lookup(module, target)
    }
}

impl<R: ModuleResolver + ?Sized> ModuleResolver for Box<R> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn lookup(&self, module: &str, target: OsVersion) -> ModuleAvailability {
        (**self).lookup(module, target)
    }
}

/// Resolver used when module checks are skipped: every answer is `Unknown`
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResolver;

impl ModuleResolver for NoopResolver {
    fn name(&self) -> &str {
        "noop"
    }

    fn lookup(&self, _module: &str, _target: OsVersion) -> ModuleAvailability {
        ModuleAvailability::Unknown
    }
}

/// Resolver backed by an explicit table. Pairs that were never recorded
/// resolve to `Unknown`.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    table: HashMap<(String, OsVersion), ModuleAvailability>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, module: &str, target: OsVersion, availability: ModuleAvailability) -> Self {
        self.insert(module, target, availability);
        self
    }

    pub fn available(self, module: &str, target: OsVersion) -> Self {
        self.with(module, target, ModuleAvailability::Available)
    }

    pub fn unavailable(self, module: &str, target: OsVersion) -> Self {
        self.with(module, target, ModuleAvailability::Unavailable)
    }

    pub fn insert(&mut self, module: &str, target: OsVersion, availability: ModuleAvailability) {
        self.table.insert((normalize_module_name(module), target), availability);
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl ModuleResolver for StaticResolver {
    fn name(&self) -> &str {
        "static"
    }

    fn lookup(&self, module: &str, target: OsVersion) -> ModuleAvailability {
        self.table
            .get(&(normalize_module_name(module), target))
            .copied()
            .unwrap_or(ModuleAvailability::Unknown)
    }
}
