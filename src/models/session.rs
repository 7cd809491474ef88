//! Archive session model and its sidecar metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the archive directory was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    Unknown,
    /// Directory written by the interactive capture browser (HAR + metadata).
    HarCapture,
}

impl SourceType {
    pub fn as_i32(&self) -> i32 {
        match self {
            Self::Unknown => 0,
            Self::HarCapture => 1,
        }
    }

    pub fn from_i32(v: i32) -> Self {
        match v {
            1 => Self::HarCapture,
            _ => Self::Unknown,
        }
    }
}

/// One archive session row: a single capture directory and its pipeline
/// progress. Stage markers hold the algorithm version that produced the
/// output and are only written on success; failures land in
/// `extraction_error` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveSession {
    #[serde(default)]
    pub id: i64,
    pub external_id: String,
    /// Directory of the session, relative to the archives root.
    pub archive_location: String,
    pub archived_url: Option<String>,
    pub archiving_timestamp: Option<DateTime<Utc>>,
    /// IANA name or UTC offset of the zone assumed when converting the
    /// zoneless capture timestamp. Recorded so the conversion is auditable.
    pub archiving_timezone: Option<String>,
    pub parsed_version: Option<i32>,
    pub extracted_version: Option<i32>,
    pub structures: Option<serde_json::Value>,
    pub metadata: Option<serde_json::Value>,
    pub attachments: Option<serde_json::Value>,
    pub extraction_error: Option<String>,
    pub source_type: SourceType,
    #[serde(default)]
    pub create_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub update_date: Option<DateTime<Utc>>,
}

/// Keys read from a session's `metadata.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionMetadata {
    #[serde(default)]
    pub target_url: Option<String>,
    /// ISO 8601, typically without a zone; interpreted in the host zone.
    #[serde(default)]
    pub archiving_start_timestamp: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Inventory of non-HAR files found in a session directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionAttachments {
    #[serde(default)]
    pub screen_recordings: Vec<String>,
    #[serde(default)]
    pub har_archives: Vec<String>,
    #[serde(default)]
    pub hash_files: Vec<String>,
    #[serde(default)]
    pub timestamp_files: Vec<String>,
    #[serde(default)]
    pub other_files: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_type_round_trip() {
        assert_eq!(SourceType::from_i32(SourceType::HarCapture.as_i32()), SourceType::HarCapture);
        assert_eq!(SourceType::from_i32(7), SourceType::Unknown);
    }
}
