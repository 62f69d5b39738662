//! Signature records and their identifiers.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Store-assigned record identifier.
///
/// Ids are 12 bytes rendered as 24 lowercase hex characters: a big-endian
/// seconds timestamp, five process-unique bytes and a 24-bit counter.
/// Values read back from the wire are accepted as-is; [`RecordId::parse`]
/// is the checked constructor used for ids coming from request paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Number of hex characters in a well-formed id
    pub const LEN: usize = 24;

    /// Parse an id, rejecting anything that is not 24 hex characters.
    pub fn parse(s: &str) -> Result<Self> {
        if s.len() != Self::LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::Validation(format!(
                "Cast to ObjectId failed for value \"{}\"",
                s
            )));
        }
        Ok(RecordId(s.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One persisted guestbook entry.
///
/// `signature` holds the encoded image (a data URI) exactly as submitted;
/// nothing on the service side decodes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecord {
    #[serde(rename = "_id")]
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub signature: String,
}

/// The payload a client submits to create a record. Never carries an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSignature {
    pub name: String,
    pub signature: String,
}

impl NewSignature {
    pub fn new(name: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signature: signature.into(),
        }
    }
}

/// Generates fresh [`RecordId`]s.
///
/// The process-unique bytes and the counter seed are derived from a SHA-256
/// digest of the pid and the start time, so two store handles opened on the
/// same journal from different processes do not collide.
#[derive(Debug)]
pub struct IdGenerator {
    process: [u8; 5],
    counter: AtomicU32,
}

impl IdGenerator {
    pub fn new() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(std::process::id().to_le_bytes());
        hasher.update(nanos.to_le_bytes());
        let digest = hasher.finalize();

        let mut process = [0u8; 5];
        process.copy_from_slice(&digest[..5]);
        let seed = u32::from_be_bytes([0, digest[5], digest[6], digest[7]]);

        Self {
            process,
            counter: AtomicU32::new(seed),
        }
    }

    pub fn next_id(&self) -> RecordId {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or_default();
        let count = self.counter.fetch_add(1, Ordering::Relaxed) & 0x00ff_ffff;

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&self.process);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        RecordId(hex::encode(bytes))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
