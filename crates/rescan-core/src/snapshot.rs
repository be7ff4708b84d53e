//! Per-path metadata snapshots.

use std::fs::Metadata;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::EntryKind;

/// Metadata fields compared between passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// Last modification time.
    pub modified: SystemTime,
    /// Permission bits (`0o7777` on Unix).
    pub permissions: u32,
}

impl Observation {
    /// Create an observation from raw values.
    pub fn new(modified: SystemTime, permissions: u32) -> Self {
        Self {
            modified,
            permissions,
        }
    }

    /// Extract the compared fields from filesystem metadata.
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            modified: metadata.modified().unwrap_or(UNIX_EPOCH),
            permissions: permission_bits(metadata),
        }
    }
}

/// Cached state for one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathSnapshot {
    /// Entry type when last observed.
    pub kind: EntryKind,
    /// Last observed modification time.
    pub modified: SystemTime,
    /// Last observed permission bits.
    pub permissions: u32,
    /// Whether the path was seen during the current pass.
    pub visited: bool,
}

impl PathSnapshot {
    /// Create a snapshot from an observation.
    pub fn new(kind: EntryKind, observation: Observation, visited: bool) -> Self {
        Self {
            kind,
            modified: observation.modified,
            permissions: observation.permissions,
            visited,
        }
    }
}

#[cfg(unix)]
fn permission_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn permission_bits(metadata: &Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o666
    }
}
