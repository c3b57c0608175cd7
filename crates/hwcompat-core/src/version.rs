//! Target OS versions.
//!
//! Versions are compared as `(major, minor)` pairs. `"9"` and `"9.0"` are the
//! same version and both display as `9`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// An operating-system release, e.g. `9` or `8.6`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct OsVersion {
    pub major: u32,
    pub minor: u32,
}

impl OsVersion {
    /// A major release (`OsVersion::major(9)` is `9.0`)
    pub const fn major(major: u32) -> Self {
        Self { major, minor: 0 }
    }

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// The first major release after this one, `None` past `u32::MAX`
    pub fn next_major(&self) -> Option<Self> {
        self.major.checked_add(1).map(Self::major)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid OS version {0:?}: expected MAJOR or MAJOR.MINOR")]
pub struct VersionParseError(pub String);

impl FromStr for OsVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let err = || VersionParseError(s.to_string());

        let (major, minor) = match trimmed.split_once('.') {
            Some((major, minor)) => (major, Some(minor)),
            None => (trimmed, None),
        };

        let major = major.parse::<u32>().map_err(|_| err())?;
        let minor = match minor {
            Some(m) => m.parse::<u32>().map_err(|_| err())?,
            None => 0,
        };

        Ok(Self { major, minor })
    }
}

impl fmt::Display for OsVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.minor == 0 {
            write!(f, "{}", self.major)
        } else {
            write!(f, "{}.{}", self.major, self.minor)
        }
    }
}

impl Serialize for OsVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OsVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Data files carry versions both as bare numbers and as strings
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(major) => Ok(OsVersion::major(major)),
            Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_major_and_minor() {
        assert_eq!("9".parse::<OsVersion>().unwrap(), OsVersion::major(9));
        assert_eq!("8.6".parse::<OsVersion>().unwrap(), OsVersion::new(8, 6));
        assert_eq!(" 10 ".parse::<OsVersion>().unwrap(), OsVersion::major(10));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<OsVersion>().is_err());
        assert!("nine".parse::<OsVersion>().is_err());
        assert!("9.".parse::<OsVersion>().is_err());
        assert!("9.1.2".parse::<OsVersion>().is_err());
    }

    #[test]
    fn test_ordering() {
        assert!(OsVersion::major(8) < OsVersion::new(8, 6));
        assert!(OsVersion::new(8, 6) < OsVersion::major(9));
        assert_eq!(OsVersion::major(9), "9.0".parse::<OsVersion>().unwrap());
    }

    #[test]
    fn test_display() {
        assert_eq!(OsVersion::major(9).to_string(), "9");
        assert_eq!(OsVersion::new(8, 6).to_string(), "8.6");
        assert_eq!(OsVersion::new(8, 6).next_major(), Some(OsVersion::major(9)));
        assert_eq!(OsVersion::major(u32::MAX).next_major(), None);
    }

    #[test]
    fn test_serde_accepts_numbers_and_strings() {
        let n: OsVersion = serde_json::from_str("9").unwrap();
        let s: OsVersion = serde_json::from_str("\"8.4\"").unwrap();
        assert_eq!(n, OsVersion::major(9));
        assert_eq!(s, OsVersion::new(8, 4));

        assert_eq!(serde_json::to_string(&s).unwrap(), "\"8.4\"");
        assert!(serde_json::from_str::<OsVersion>("\"eight\"").is_err());
    }
}
