//! Unified Error Model
use crate::ids::IdParseError;
use thiserror::Error;

/// The deprecation database (or its exception list) could not be loaded.
/// Fatal for a run.
#[derive(Error, Debug)]
pub enum DatabaseLoadError {
    #[error("DB/IO: failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("DB/PARSE: {0}")]
    Parse(String),

    #[error("DB/SCHEMA: unsupported schema version {0}")]
    UnsupportedSchema(u32),

    #[error("DB/ENTRY: entry {id:?}: {message}")]
    InvalidEntry { id: String, message: String },

    #[error("DB/DUPLICATE: entry id {0:?} appears more than once")]
    DuplicateEntry(String),

    #[error("DB/EXCEPTIONS: {0}")]
    Exceptions(String),
}

/// The kernel module index could not be opened. Callers degrade to the
/// no-op resolver.
#[derive(Error, Debug)]
#[error("KMOD/UNAVAILABLE: {path}: {message}")]
pub struct ResolverUnavailableError {
    pub path: String,
    pub message: String,
}

/// A detected device carries identity data the engine cannot interpret.
/// Scoped to that device only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedDeviceError {
    #[error("DEVICE/ID: {device}: bad identifier {value:?}: {source}")]
    InvalidId {
        device: String,
        value: String,
        #[source]
        source: IdParseError,
    },

    #[error("DEVICE/CLASS: {device}: bad class code {value:?}")]
    InvalidClass { device: String, value: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("CONFIG/IO: failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CONFIG/PARSE: {0}")]
    Parse(String),

    #[error("CONFIG/VALUE: {key}={value:?}: {message}")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },
}

#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("INVENTORY/IO: failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("INVENTORY/PARSE: {0}")]
    Parse(String),
}

/// Top-level error for a compatibility run
#[derive(Error, Debug)]
pub enum CompatError {
    #[error(transparent)]
    Database(#[from] DatabaseLoadError),

    #[error(transparent)]
    Resolver(#[from] ResolverUnavailableError),

    #[error(transparent)]
    Device(#[from] MalformedDeviceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),
}

impl CompatError {
    /// Whether this error aborts the run before any report is produced
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CompatError::Resolver(_) | CompatError::Device(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_category() {
        let err = DatabaseLoadError::DuplicateEntry("8086:1234".to_string());
        assert!(err.to_string().starts_with("DB/DUPLICATE"));

        let err = MalformedDeviceError::InvalidClass {
            device: "0000:00:1f.2".to_string(),
            value: "zz".to_string(),
        };
        assert!(err.to_string().contains("0000:00:1f.2"));
    }

    #[test]
    fn test_fatality() {
        let db: CompatError = DatabaseLoadError::Parse("bad".to_string()).into();
        assert!(db.is_fatal());

        let resolver: CompatError = ResolverUnavailableError {
            path: "./kmod-idx".to_string(),
            message: "missing".to_string(),
        }
        .into();
        assert!(!resolver.is_fatal());
    }
}
