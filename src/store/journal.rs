//! Durable journal-backed store.
//!
//! The journal is a UTF-8 text file holding one JSON object per line:
//!
//! ```text
//! {"format":"signbook-journal","version":1}
//! {"op":"insert","record":{"_id":"...","name":"Alice","signature":"data:..."}}
//! {"op":"delete","_id":"..."}
//! ```
//!
//! Opening replays the file into an in-memory index that preserves
//! insertion order. Every mutation appends exactly one line and flushes it
//! before the index is updated, so a call either lands completely or not at
//! all: a failed write is rolled back to the previous file length. A crash
//! mid-append leaves a final line without its newline; that torn tail is cut
//! off on the next open, and a torn header is rewritten. Any other
//! unparseable line is reported as [`Error::CorruptJournal`].

use crate::record::{IdGenerator, RecordId, SignatureRecord};
use crate::store::SignatureStore;
use crate::{Error, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const FORMAT: &str = "signbook-journal";
const VERSION: u32 = 1;

/// Options for opening a journal.
#[derive(Debug, Clone)]
pub struct JournalOptions {
    /// Whether to fsync after each append (default: true).
    pub sync: bool,
    /// Whether to create the file if it doesn't exist (default: true).
    pub create: bool,
}

impl Default for JournalOptions {
    fn default() -> Self {
        Self {
            sync: true,
            create: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    format: String,
    version: u32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum Entry {
    Insert {
        record: SignatureRecord,
    },
    Delete {
        #[serde(rename = "_id")]
        id: RecordId,
    },
}

struct JournalState {
    file: Option<File>,
    records: Vec<SignatureRecord>,
    /// Lines after the header, live or not. Drives compaction decisions.
    entries: usize,
}

/// Store backed by an append-only journal file.
pub struct JournalStore {
    path: PathBuf,
    sync: bool,
    ids: IdGenerator,
    state: Mutex<JournalState>,
}

impl JournalStore {
    /// Open (or create) the journal at `path` and replay it.
    pub fn open<P: AsRef<Path>>(path: P, options: JournalOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .create(options.create)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                Error::StoreUnavailable(format!("cannot open {}: {}", path.display(), e))
            })?;

        let mut text = String::new();
        file.read_to_string(&mut text)?;

        let (records, entries, valid_len) = if !text.contains('\n') {
            // Empty, or the header write itself was torn.
            if !text.is_empty() {
                warn!(
                    "journal {} has a torn header; starting it over",
                    path.display()
                );
                file.set_len(0)?;
            }
            write_line(&mut file, &header_line()?, options.sync)?;
            (Vec::new(), 0, None)
        } else {
            replay(&text)?
        };

        if let Some(len) = valid_len {
            warn!(
                "journal {} has a torn final entry; truncating {} bytes",
                path.display(),
                text.len() as u64 - len
            );
            file.set_len(len)?;
            file.seek(SeekFrom::End(0))?;
            if options.sync {
                file.sync_all()?;
            }
        }

        info!(
            "opened journal {} ({} records, {} entries)",
            path.display(),
            records.len(),
            entries
        );

        Ok(Self {
            path,
            sync: options.sync,
            ids: IdGenerator::new(),
            state: Mutex::new(JournalState {
                file: Some(file),
                records,
                entries,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of journal entries that no longer describe a live record.
    pub fn dead_entries(&self) -> Result<usize> {
        let state = self.state.lock()?;
        Ok(state.entries.saturating_sub(state.records.len()))
    }

    /// Rewrite the journal so it holds one insert per live record.
    ///
    /// The new journal is written beside the old one and renamed over it.
    pub fn compact(&self) -> Result<()> {
        let mut state = self.state.lock()?;
        if state.file.is_none() {
            return Err(Error::StoreUnavailable("store is closed".into()));
        }

        let tmp = self.path.with_extension("compact");
        {
            let mut out = BufWriter::new(File::create(&tmp)?);
            writeln!(out, "{}", header_line()?)?;
            for record in &state.records {
                let line = serde_json::to_string(&Entry::Insert {
                    record: record.clone(),
                })?;
                writeln!(out, "{}", line)?;
            }
            let file = out
                .into_inner()
                .map_err(|e| Error::Io(e.into_error()))?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;

        let file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        let before = state.entries;
        state.entries = state.records.len();
        state.file = Some(file);
        info!(
            "compacted journal {} ({} -> {} entries)",
            self.path.display(),
            before,
            state.entries
        );
        Ok(())
    }

    fn append(&self, state: &mut JournalState, entry: &Entry) -> Result<()> {
        let file = state
            .file
            .as_mut()
            .ok_or_else(|| Error::StoreUnavailable("store is closed".into()))?;
        let line = serde_json::to_string(entry)?;
        write_line(file, &line, self.sync)?;
        state.entries += 1;
        Ok(())
    }
}

impl SignatureStore for JournalStore {
    fn insert(&self, name: &str, signature: &str) -> Result<SignatureRecord> {
        let mut state = self.state.lock()?;
        let record = SignatureRecord {
            id: self.ids.next_id(),
            name: name.to_string(),
            signature: signature.to_string(),
        };
        self.append(
            &mut state,
            &Entry::Insert {
                record: record.clone(),
            },
        )?;
        state.records.push(record.clone());
        debug!("inserted signature {}", record.id);
        Ok(record)
    }

    fn list(&self) -> Result<Vec<SignatureRecord>> {
        let state = self.state.lock()?;
        if state.file.is_none() {
            return Err(Error::StoreUnavailable("store is closed".into()));
        }
        Ok(state.records.clone())
    }

    fn delete_by_id(&self, id: &RecordId) -> Result<Option<SignatureRecord>> {
        let mut state = self.state.lock()?;
        if state.file.is_none() {
            return Err(Error::StoreUnavailable("store is closed".into()));
        }
        let Some(idx) = state.records.iter().position(|r| &r.id == id) else {
            return Ok(None);
        };
        self.append(&mut state, &Entry::Delete { id: id.clone() })?;
        let removed = state.records.remove(idx);
        debug!("deleted signature {}", removed.id);
        Ok(Some(removed))
    }

    fn close(&self) -> Result<()> {
        let mut state = self.state.lock()?;
        if let Some(mut file) = state.file.take() {
            file.flush()?;
            file.sync_all()?;
            info!("closed journal {}", self.path.display());
        }
        Ok(())
    }
}

impl Drop for JournalStore {
    fn drop(&mut self) {
        if let Ok(state) = self.state.get_mut() {
            if let Some(file) = state.file.as_mut() {
                let _ = file.flush();
                if self.sync {
                    let _ = file.sync_all();
                }
            }
        }
    }
}

fn header_line() -> Result<String> {
    Ok(serde_json::to_string(&Header {
        format: FORMAT.to_string(),
        version: VERSION,
    })?)
}

fn write_line(file: &mut File, line: &str, sync: bool) -> Result<()> {
    write_line_with(file, line, sync, |f, buf| f.write_all(buf))
}

/// Append `line` plus a newline through `write`. On any failure the file is
/// cut back to its previous length so no fragment is left for the next
/// append to land behind.
fn write_line_with<F>(file: &mut File, line: &str, sync: bool, write: F) -> Result<()>
where
    F: FnOnce(&mut File, &[u8]) -> std::io::Result<()>,
{
    let start = file.metadata()?.len();
    let mut buf = Vec::with_capacity(line.len() + 1);
    buf.extend_from_slice(line.as_bytes());
    buf.push(b'\n');

    let written = write(file, &buf).and_then(|_| {
        file.flush()?;
        if sync {
            file.sync_data()?;
        }
        Ok(())
    });
    if let Err(e) = written {
        warn!("journal append failed, rolling back to {} bytes: {}", start, e);
        file.set_len(start)?;
        file.seek(SeekFrom::End(0))?;
        return Err(e.into());
    }
    Ok(())
}

/// Replay journal text. Returns the live records, the entry count and, when
/// the final line is torn, the byte length the file should be cut back to.
fn replay(text: &str) -> Result<(Vec<SignatureRecord>, usize, Option<u64>)> {
    let mut records: Vec<SignatureRecord> = Vec::new();
    let mut entries = 0usize;
    let mut offset = 0usize;
    let mut lines = text.split_inclusive('\n').enumerate();

    let header = match lines.next() {
        Some((_, line)) if line.ends_with('\n') => line,
        _ => {
            return Err(Error::CorruptJournal {
                line: 1,
                reason: "missing header".into(),
            })
        }
    };
    let parsed: Header = serde_json::from_str(header.trim_end()).map_err(|e| {
        Error::CorruptJournal {
            line: 1,
            reason: format!("invalid header: {}", e),
        }
    })?;
    if parsed.format != FORMAT || parsed.version != VERSION {
        return Err(Error::CorruptJournal {
            line: 1,
            reason: format!("unsupported format {} v{}", parsed.format, parsed.version),
        });
    }
    offset += header.len();

    for (idx, line) in lines {
        // Only the final piece can lack its newline: that append never finished.
        if !line.ends_with('\n') {
            return Ok((records, entries, Some(offset as u64)));
        }
        let body = line.trim_end();
        if body.is_empty() {
            offset += line.len();
            continue;
        }

        let entry: Entry = serde_json::from_str(body).map_err(|e| Error::CorruptJournal {
            line: idx + 1,
            reason: e.to_string(),
        })?;

        match entry {
            Entry::Insert { record } => records.push(record),
            Entry::Delete { id } => records.retain(|r| r.id != id),
        }
        entries += 1;
        offset += line.len();
    }

    Ok((records, entries, None))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "{\"format\":\"signbook-journal\",\"version\":1}\n";

    #[test]
    fn replay_applies_inserts_and_deletes_in_order() {
        let text = format!(
            "{}{}\n{}\n{}\n",
            HEADER,
            r#"{"op":"insert","record":{"_id":"000000000000000000000001","name":"A","signature":"a"}}"#,
            r#"{"op":"insert","record":{"_id":"000000000000000000000002","name":"B","signature":"b"}}"#,
            r#"{"op":"delete","_id":"000000000000000000000001"}"#,
        );
        let (records, entries, torn) = replay(&text).unwrap();
        assert_eq!(entries, 3);
        assert!(torn.is_none());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "B");
    }

    #[test]
    fn replay_reports_torn_tail_offset() {
        let good = r#"{"op":"insert","record":{"_id":"000000000000000000000001","name":"A","signature":"a"}}"#;
        let text = format!("{}{}\n{}", HEADER, good, r#"{"op":"insert","rec"#);
        let (records, entries, torn) = replay(&text).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(entries, 1);
        assert_eq!(torn, Some((HEADER.len() + good.len() + 1) as u64));
    }

    #[test]
    fn replay_rejects_corrupt_interior_line() {
        let text = format!("{}garbage\n{}\n", HEADER, r#"{"op":"delete","_id":"x"}"#);
        match replay(&text) {
            Err(Error::CorruptJournal { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected corrupt journal, got {:?}", other.map(|r| r.1)),
        }
    }

    #[test]
    fn failed_append_leaves_no_fragment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sigs.journal");
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .unwrap();
        write_line(&mut file, &header_line().unwrap(), false).unwrap();
        let clean_len = file.metadata().unwrap().len();

        // Half the line reaches the disk, then the device fills up.
        let line = r#"{"op":"insert","record":{"_id":"000000000000000000000001","name":"A","signature":"a"}}"#;
        let err = write_line_with(&mut file, line, false, |f, buf| {
            f.write_all(&buf[..buf.len() / 2])?;
            Err(std::io::Error::new(std::io::ErrorKind::Other, "no space left on device"))
        })
        .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(file.metadata().unwrap().len(), clean_len);

        write_line(&mut file, line, false).unwrap();
        drop(file);

        let text = fs::read_to_string(&path).unwrap();
        let (records, entries, torn) = replay(&text).unwrap();
        assert_eq!(entries, 1);
        assert!(torn.is_none());
        assert_eq!(records[0].name, "A");
    }

    #[test]
    fn replay_rejects_foreign_header() {
        let text = "{\"format\":\"other\",\"version\":1}\n";
        assert!(matches!(
            replay(text),
            Err(Error::CorruptJournal { line: 1, .. })
        ));
    }
}
