//! The deprecation database: loading, indexing and lookup.
//!
//! A loaded database is an immutable snapshot. Entries are kept sorted by id
//! so every derived view (dumps, digests, lookups) is independent of the
//! order the source file happened to list them in.

use crate::entry::{Criteria, DeprecationEntry, EntryRecord, MatchRank};
use crate::legacy;
use hwcompat_core::{
    normalize_module_name, DatabaseLoadError, DetectedDevice, DeviceIdentity, MalformedDeviceError, OsVersion,
};
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

/// Highest native schema version understood by this build
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Deserialize)]
struct NativeFile {
    #[serde(default = "default_schema")]
    schema_version: u32,
    entries: Vec<EntryRecord>,
}

fn default_schema() -> u32 {
    SCHEMA_VERSION
}

/// An entry that applies to a device at the requested target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMatch<'a> {
    pub entry: &'a DeprecationEntry,
    pub rank: MatchRank,
    /// Declared version relevant at the target (see
    /// [`DeprecationEntry::effective_version`])
    pub version: OsVersion,
}

impl<'a> EntryMatch<'a> {
    /// Precedence between two matches for the same device and target:
    /// higher rank first, then the version closest to the target (all
    /// candidate versions are already ≤ target, so the highest), then the
    /// smallest entry id.
    pub fn precedence(&self, other: &Self) -> Ordering {
        other
            .rank
            .cmp(&self.rank)
            .then_with(|| other.version.cmp(&self.version))
            .then_with(|| self.entry.id().cmp(other.entry.id()))
    }
}

#[derive(Debug, Clone)]
pub struct DeprecationDatabase {
    entries: Vec<DeprecationEntry>,
    by_vendor: HashMap<u16, Vec<usize>>,
    by_driver: HashMap<String, Vec<usize>>,
    by_class: Vec<usize>,
    digest: String,
    source: String,
}

impl DeprecationDatabase {
    /// Load a database file in native or legacy format
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatabaseLoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| DatabaseLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let mut db = Self::from_json(&content)?;
        db.source = path.display().to_string();

        tracing::info!(
            source = %db.source,
            entries = db.len(),
            digest = %db.digest,
            "loaded deprecation database"
        );
        Ok(db)
    }

    /// Parse a database from JSON text. The legacy `{"data": [...]}` layout
    /// is detected and converted.
    pub fn from_json(json: &str) -> Result<Self, DatabaseLoadError> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| DatabaseLoadError::Parse(format!("invalid database JSON: {}", e)))?;

        let records = if legacy::is_legacy(&value) {
            legacy::convert(value)?
        } else {
            let file: NativeFile = serde_json::from_value(value)
                .map_err(|e| DatabaseLoadError::Parse(format!("invalid database layout: {}", e)))?;
            if file.schema_version > SCHEMA_VERSION {
                return Err(DatabaseLoadError::UnsupportedSchema(file.schema_version));
            }
            file.entries
        };

        let entries = records
            .into_iter()
            .map(|record| {
                let id = record.id.clone();
                DeprecationEntry::try_from(record)
                    .map_err(|message| DatabaseLoadError::InvalidEntry { id, message })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_entries(entries)
    }

    /// Build a database from already validated entries
    pub fn from_entries(mut entries: Vec<DeprecationEntry>) -> Result<Self, DatabaseLoadError> {
        entries.sort_by(|a, b| a.id().cmp(b.id()));

        if let Some(dup) = entries.windows(2).find(|w| w[0].id() == w[1].id()) {
            return Err(DatabaseLoadError::DuplicateEntry(dup[0].id().to_string()));
        }

        let mut by_vendor: HashMap<u16, Vec<usize>> = HashMap::new();
        let mut by_driver: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_class = Vec::new();

        for (idx, entry) in entries.iter().enumerate() {
            match entry.criteria() {
                Criteria::Id(pattern) => by_vendor.entry(pattern[0]).or_default().push(idx),
                Criteria::Driver(name) => by_driver.entry(name.clone()).or_default().push(idx),
                Criteria::Class(_) => by_class.push(idx),
            }
        }

        let canonical = serde_json::to_vec(&entries)
            .map_err(|e| DatabaseLoadError::Parse(format!("failed to canonicalise entries: {}", e)))?;
        let digest = format!("blake3:{}", blake3::hash(&canonical));

        Ok(Self {
            entries,
            by_vendor,
            by_driver,
            by_class,
            digest,
            source: "inline".to_string(),
        })
    }

    /// Entries applying to `identity` at `target`, best first.
    ///
    /// Only entries whose declared version is ≤ `target` are returned.
    pub fn lookup(&self, identity: &DeviceIdentity, target: OsVersion) -> Vec<EntryMatch<'_>> {
        let mut candidates: Vec<usize> = Vec::new();
        if let Some(pci) = &identity.pci {
            candidates.extend(self.by_vendor.get(&pci.vendor).into_iter().flatten());
        }
        if let Some(driver) = &identity.driver {
            candidates.extend(self.by_driver.get(driver).into_iter().flatten());
        }
        if identity.class.is_some() {
            candidates.extend(self.by_class.iter());
        }

        let mut matches: Vec<EntryMatch<'_>> = candidates
            .into_iter()
            .filter_map(|idx| {
                let entry = &self.entries[idx];
                let rank = entry.rank_for(identity)?;
                let version = entry.effective_version(target)?;
                Some(EntryMatch { entry, rank, version })
            })
            .collect();

        matches.sort_by(|a, b| a.precedence(b));
        matches
    }

    /// Parse the device identity and look it up
    pub fn lookup_device(
        &self,
        device: &DetectedDevice,
        target: OsVersion,
    ) -> Result<Vec<EntryMatch<'_>>, MalformedDeviceError> {
        let identity = device.identity()?;
        Ok(self.lookup(&identity, target))
    }

    /// Best driver entry for a loaded kernel module at `target`.
    ///
    /// Only driver entries are considered; identifier and class entries
    /// need a device.
    pub fn lookup_module(&self, module: &str, target: OsVersion) -> Option<EntryMatch<'_>> {
        let identity = DeviceIdentity {
            driver: Some(normalize_module_name(module)),
            ..Default::default()
        };
        self.lookup(&identity, target).into_iter().next()
    }

    /// All entries, sorted by id
    pub fn entries(&self) -> &[DeprecationEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&DeprecationEntry> {
        self.entries
            .binary_search_by(|e| e.id().cmp(id))
            .ok()
            .map(|idx| &self.entries[idx])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `blake3:` digest of the canonical entry list
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Where the snapshot came from (file path or `inline`)
    pub fn source(&self) -> &str {
        &self.source
    }
}
