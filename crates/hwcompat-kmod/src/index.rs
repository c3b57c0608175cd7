//! On-disk kernel module indexes.
//!
//! The index root holds one directory per target release, each with the
//! depmod output of that release's kernel:
//!
//! ```text
//! kmod-idx/
//!   8/modules.dep
//!   9/modules.dep
//!   9/modules.builtin
//! ```
//!
//! A module listed in `modules.dep` or `modules.builtin` is available for
//! that release. A release with an index but no such module is unavailable.
//! A release without an index directory is unknown.

use crate::resolver::{ModuleAvailability, ModuleResolver};
use hwcompat_core::{normalize_module_name, OsVersion, ResolverUnavailableError};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

pub const MODULES_DEP: &str = "modules.dep";
pub const MODULES_BUILTIN: &str = "modules.builtin";

/// Module set of one release
#[derive(Debug, Clone, Default)]
pub struct ReleaseIndex {
    modules: HashSet<String>,
}

impl ReleaseIndex {
    /// Build from the text of `modules.dep` and, optionally, `modules.builtin`
    pub fn parse(modules_dep: &str, modules_builtin: Option<&str>) -> Self {
        let mut modules = HashSet::new();

        // modules.dep: "kernel/drivers/net/foo.ko.xz: kernel/lib/bar.ko.xz"
        for line in modules_dep.lines() {
            let path = line.split(':').next().unwrap_or("").trim();
            if let Some(name) = module_name_from_path(path) {
                modules.insert(name);
            }
        }

        // modules.builtin: one path per line
        for line in modules_builtin.unwrap_or("").lines() {
            if let Some(name) = module_name_from_path(line.trim()) {
                modules.insert(name);
            }
        }

        Self { modules }
    }

    pub fn contains(&self, module: &str) -> bool {
        self.modules.contains(&normalize_module_name(module))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// `kernel/drivers/net/foo-bar.ko.xz` -> `foo_bar`
fn module_name_from_path(path: &str) -> Option<String> {
    if path.is_empty() || path.starts_with('#') {
        return None;
    }

    let file = path.rsplit('/').next()?;
    let stem = file.split(".ko").next()?;
    if stem.is_empty() || stem == file {
        return None;
    }
    Some(normalize_module_name(stem))
}

/// Per-release module indexes loaded from an index root
#[derive(Debug, Clone, Default)]
pub struct KmodIndex {
    root: PathBuf,
    releases: BTreeMap<OsVersion, ReleaseIndex>,
}

impl KmodIndex {
    /// Load every release directory under `root`.
    ///
    /// Fails when the root cannot be read or contains no usable release.
    /// Directories whose names are not versions are ignored.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, ResolverUnavailableError> {
        let root = root.as_ref();
        let unavailable = |message: String| ResolverUnavailableError {
            path: root.display().to_string(),
            message,
        };

        let dir = std::fs::read_dir(root).map_err(|e| unavailable(e.to_string()))?;

        let mut releases = BTreeMap::new();
        for item in dir {
            let item = item.map_err(|e| unavailable(e.to_string()))?;
            let path = item.path();
            if !path.is_dir() {
                continue;
            }

            let Some(version) = item.file_name().to_str().and_then(|n| n.parse::<OsVersion>().ok()) else {
                tracing::debug!(path = %path.display(), "skipping non-release directory in kmod index");
                continue;
            };

            let dep_path = path.join(MODULES_DEP);
            let dep = match std::fs::read_to_string(&dep_path) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(path = %dep_path.display(), error = %e, "release index has no readable modules.dep");
                    continue;
                }
            };
            let builtin = std::fs::read_to_string(path.join(MODULES_BUILTIN)).ok();

            let index = ReleaseIndex::parse(&dep, builtin.as_deref());
            tracing::debug!(release = %version, modules = index.len(), "loaded release module index");
            releases.insert(version, index);
        }

        if releases.is_empty() {
            return Err(unavailable("no release indexes found".to_string()));
        }

        tracing::info!(
            root = %root.display(),
            releases = ?releases.keys().map(|v| v.to_string()).collect::<Vec<_>>(),
            "loaded kernel module index"
        );

        Ok(Self {
            root: root.to_path_buf(),
            releases,
        })
    }

    /// Build an index from already parsed releases
    pub fn from_releases(releases: impl IntoIterator<Item = (OsVersion, ReleaseIndex)>) -> Self {
        Self {
            root: PathBuf::new(),
            releases: releases.into_iter().collect(),
        }
    }

    pub fn releases(&self) -> impl Iterator<Item = OsVersion> + '_ {
        self.releases.keys().copied()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ModuleResolver for KmodIndex {
    fn name(&self) -> &str {
        "kmod-index"
    }

    fn lookup(&self, module: &str, target: OsVersion) -> ModuleAvailability {
        match self.releases.get(&target) {
            Some(index) if index.contains(module) => ModuleAvailability::Available,
            Some(_) => ModuleAvailability::Unavailable,
            None => ModuleAvailability::Unknown,
        }
    }
}
