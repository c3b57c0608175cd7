//! hwcompat-kmod: kernel module availability.
//!
//! The engine asks one question: does the driver module named by a
//! deprecation entry ship for the target release? The answer comes from a
//! [`ModuleResolver`] chosen once per run:
//!
//! ```text
//! skip_kmod ──yes──→ NoopResolver            (mode: skipped)
//!     │
//!     no
//!     ↓
//! KmodIndex::load ──ok──→ KmodIndex          (mode: enabled)
//!     │
//!    err ──────────────→ NoopResolver        (mode: degraded)
//! ```

pub mod index;
pub mod resolver;

pub use index::{KmodIndex, ReleaseIndex};
pub use resolver::{ModuleAvailability, ModuleResolver, NoopResolver, StaticResolver};

use hwcompat_core::ResolverUnavailableError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// How the resolver for a run was chosen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ResolverMode {
    /// A real index answers lookups
    Enabled { resolver: String },
    /// Module checks were turned off
    Skipped,
    /// The index failed to load; lookups answer `Unknown`
    Degraded { reason: String },
}

impl ResolverMode {
    pub fn is_degraded(&self) -> bool {
        matches!(self, ResolverMode::Degraded { .. })
    }

    /// Whether module lookups can override database matches in this mode
    pub fn consults_modules(&self) -> bool {
        matches!(self, ResolverMode::Enabled { .. })
    }
}

impl fmt::Display for ResolverMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ResolverMode::Enabled { resolver } => write!(f, "enabled ({})", resolver),
            ResolverMode::Skipped => write!(f, "skipped"),
            ResolverMode::Degraded { reason } => write!(f, "degraded: {}", reason),
        }
    }
}

/// The resolver chosen for a run and how it was chosen
pub struct SelectedResolver {
    pub resolver: Box<dyn ModuleResolver>,
    pub mode: ResolverMode,
}

impl SelectedResolver {
    pub fn skipped() -> Self {
        Self {
            resolver: Box::new(NoopResolver),
            mode: ResolverMode::Skipped,
        }
    }

    pub fn enabled(resolver: Box<dyn ModuleResolver>) -> Self {
        let mode = ResolverMode::Enabled {
            resolver: resolver.name().to_string(),
        };
        Self { resolver, mode }
    }

    pub fn degraded(error: &ResolverUnavailableError) -> Self {
        Self {
            resolver: Box::new(NoopResolver),
            mode: ResolverMode::Degraded {
                reason: error.to_string(),
            },
        }
    }
}

impl fmt::Debug for SelectedResolver {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SelectedResolver")
            .field("resolver", &self.resolver.name())
            .field("mode", &self.mode)
            .finish()
    }
}

/// Choose the resolver for a run. `load` is only invoked when module checks
/// are not skipped; its failure degrades to the no-op resolver.
pub fn select_with<R, F>(skip_kmod: bool, load: F) -> SelectedResolver
where
    R: ModuleResolver + 'static,
    F: FnOnce() -> Result<R, ResolverUnavailableError>,
{
    if skip_kmod {
        tracing::debug!("kernel module checks skipped");
        return SelectedResolver::skipped();
    }

    match load() {
        Ok(resolver) => SelectedResolver::enabled(Box::new(resolver)),
        Err(error) => {
            tracing::warn!(%error, "kernel module index unavailable, continuing without module checks");
            SelectedResolver::degraded(&error)
        }
    }
}

/// Choose between the on-disk index at `index_dir` and the no-op resolver
pub fn select_resolver(skip_kmod: bool, index_dir: &Path) -> SelectedResolver {
    select_with(skip_kmod, || KmodIndex::load(index_dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwcompat_core::OsVersion;
    use std::cell::Cell;

    #[test]
    fn test_skip_never_loads() {
        let loaded = Cell::new(false);
        let selected = select_with(true, || {
            loaded.set(true);
            Ok(StaticResolver::new())
        });

        assert!(!loaded.get());
        assert_eq!(selected.mode, ResolverMode::Skipped);
        assert_eq!(
            selected.resolver.lookup("anything", OsVersion::major(9)),
            ModuleAvailability::Unknown
        );
    }

    #[test]
    fn test_enabled() {
        let selected = select_with(false, || Ok(StaticResolver::new().available("ahci", OsVersion::major(9))));
        assert_eq!(selected.mode, ResolverMode::Enabled { resolver: "static".to_string() });
        assert!(selected.mode.consults_modules());
        assert_eq!(
            selected.resolver.lookup("ahci", OsVersion::major(9)),
            ModuleAvailability::Available
        );
    }

    #[test]
    fn test_degraded_on_load_failure() {
        let selected = select_resolver(false, Path::new("/nonexistent/kmod-idx"));
        assert!(selected.mode.is_degraded());
        assert!(!selected.mode.consults_modules());
        assert_eq!(selected.resolver.name(), "noop");
    }

    #[test]
    fn test_mode_serialization() {
        let json = serde_json::to_value(ResolverMode::Degraded { reason: "gone".to_string() }).unwrap();
        assert_eq!(json["mode"], "degraded");
        assert_eq!(json["reason"], "gone");
        assert_eq!(ResolverMode::Skipped.to_string(), "skipped");
    }
}
