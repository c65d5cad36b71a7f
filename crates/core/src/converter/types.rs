//! Types for the converter module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Container formats the acquisition tool can mux into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    /// Matroska (.mkv)
    #[default]
    Mkv,
    /// MPEG-4 Part 14 (.mp4)
    Mp4,
    /// MPEG transport stream (.ts)
    Ts,
}

impl ContainerFormat {
    /// Returns the file extension for this container.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mkv => "mkv",
            Self::Mp4 => "mp4",
            Self::Ts => "ts",
        }
    }

    /// Whether players and browsers handle this container without remuxing.
    pub fn is_broadly_compatible(&self) -> bool {
        matches!(self, Self::Mp4)
    }

    /// Guess the container from a file name's extension.
    pub fn from_filename(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        ext.parse().ok()
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ContainerFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mkv" => Ok(Self::Mkv),
            "mp4" => Ok(Self::Mp4),
            "ts" => Ok(Self::Ts),
            other => Err(format!("unsupported container format: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension() {
        assert_eq!(ContainerFormat::Mkv.extension(), "mkv");
        assert_eq!(ContainerFormat::Mp4.extension(), "mp4");
        assert_eq!(ContainerFormat::Ts.extension(), "ts");
    }

    #[test]
    fn test_default_is_mkv() {
        assert_eq!(ContainerFormat::default(), ContainerFormat::Mkv);
        assert!(!ContainerFormat::Mkv.is_broadly_compatible());
        assert!(ContainerFormat::Mp4.is_broadly_compatible());
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("MP4".parse::<ContainerFormat>(), Ok(ContainerFormat::Mp4));
        assert!("avi".parse::<ContainerFormat>().is_err());
    }

    #[test]
    fn test_from_filename() {
        assert_eq!(
            ContainerFormat::from_filename("show.s01e01.mkv"),
            Some(ContainerFormat::Mkv)
        );
        assert_eq!(ContainerFormat::from_filename("notes.txt"), None);
        assert_eq!(ContainerFormat::from_filename("noext"), None);
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&ContainerFormat::Mp4).unwrap();
        assert_eq!(json, "\"mp4\"");
        let parsed: ContainerFormat = serde_json::from_str("\"ts\"").unwrap();
        assert_eq!(parsed, ContainerFormat::Ts);
    }
}
