use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::entry::JournalEntry;
use crate::error::{JournalError, JournalResult};

/// Flush/sync strategy for the segment file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` after every write.
    EveryWrite,
    /// Flush to the OS and rely on its page cache.
    #[default]
    OsDefault,
}

/// Configuration for the write-ahead log.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalConfig {
    pub sync_mode: SyncMode,
}

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

struct WalWriter {
    writer: BufWriter<File>,
    /// Current write offset in the segment file.
    offset: u64,
}

/// Outcome of walking the bytes of a segment.
#[derive(Debug, Default)]
struct Scan {
    entries: Vec<JournalEntry>,
    /// Length of the prefix made of complete frames.
    valid_len: u64,
    /// Complete frames dropped for a bad checksum or payload.
    skipped: usize,
}

/// Split the frame at the start of `buf` into its checksum and payload.
///
/// `None` when `buf` does not hold a complete frame.
fn split_frame(buf: &[u8]) -> Option<(u32, &[u8])> {
    let header = buf.get(..HEADER_SIZE)?;
    let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
    let crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if length == 0 {
        return None;
    }
    let payload = buf.get(HEADER_SIZE..HEADER_SIZE.checked_add(length)?)?;
    Some((crc, payload))
}

fn scan(bytes: &[u8]) -> Scan {
    let mut scan = Scan::default();
    let mut pos = 0;
    while let Some((crc, payload)) = split_frame(&bytes[pos..]) {
        let offset = pos as u64;
        pos += HEADER_SIZE + payload.len();

        if crc32fast::hash(payload) != crc {
            warn!(offset, "WAL frame checksum mismatch; skipping");
            scan.skipped += 1;
            continue;
        }
        match serde_json::from_slice::<JournalEntry>(payload) {
            Ok(entry) => scan.entries.push(entry),
            Err(e) => {
                warn!(offset, error = %e, "undecodable WAL frame; skipping");
                scan.skipped += 1;
            }
        }
    }
    scan.valid_len = pos as u64;
    scan
}

fn read_segment(path: &Path) -> io::Result<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

/// Append-only segment file of journal entries.
///
/// On-disk frame:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (JSON-encoded JournalEntry)]
/// ```
///
/// Complete frames failing the CRC check or failing to decode are skipped
/// on recovery. Bytes after the last complete frame are a torn write: they
/// are never returned, and [`WriteAheadLog::open`] truncates them so new
/// frames follow the intact prefix.
pub struct WriteAheadLog {
    path: PathBuf,
    writer: Mutex<WalWriter>,
    config: WalConfig,
}

impl WriteAheadLog {
    /// Open (or create) a segment file at the given path, cutting off any
    /// torn tail left by a crash.
    pub fn open(path: &Path, config: WalConfig) -> JournalResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let bytes = read_segment(path)?;
        let scan = scan(&bytes);
        let file_len = bytes.len() as u64;
        if scan.valid_len < file_len {
            warn!(
                path = %path.display(),
                valid_len = scan.valid_len,
                dropped = file_len - scan.valid_len,
                "truncating torn WAL tail"
            );
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(scan.valid_len)?;
            file.sync_all()?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        debug!(
            path = %path.display(),
            entries = scan.entries.len(),
            skipped = scan.skipped,
            "WAL opened"
        );

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(WalWriter {
                writer: BufWriter::new(file),
                offset: scan.valid_len,
            }),
            config,
        })
    }

    /// Append one entry. Returns the byte offset of its frame.
    pub fn append(&self, entry: &JournalEntry) -> JournalResult<u64> {
        let payload =
            serde_json::to_vec(entry).map_err(|e| JournalError::Serialization(e.to_string()))?;
        let length = u32::try_from(payload.len()).map_err(|_| {
            JournalError::Serialization(format!("entry {} exceeds frame size", entry.seq))
        })?;
        let crc = crc32fast::hash(&payload);

        let mut w = self.lock_writer()?;
        let entry_offset = w.offset;

        w.writer.write_all(&length.to_le_bytes())?;
        w.writer.write_all(&crc.to_le_bytes())?;
        w.writer.write_all(&payload)?;
        w.writer.flush()?;
        if self.config.sync_mode == SyncMode::EveryWrite {
            w.writer.get_ref().sync_all()?;
        }

        w.offset += (HEADER_SIZE + payload.len()) as u64;

        debug!(offset = entry_offset, seq = entry.seq, len = payload.len(), "WAL append");
        Ok(entry_offset)
    }

    /// Read every intact entry in the segment.
    pub fn recover(&self) -> JournalResult<Vec<JournalEntry>> {
        // Holding the writer lock keeps a concurrent append from being half-read.
        let _guard = self.lock_writer()?;
        let scan = scan(&read_segment(&self.path)?);
        debug!(recovered = scan.entries.len(), skipped = scan.skipped, "WAL recovery complete");
        Ok(scan.entries)
    }

    /// Current write offset.
    pub fn offset(&self) -> JournalResult<u64> {
        Ok(self.lock_writer()?.offset)
    }

    /// Path to the segment file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_writer(&self) -> JournalResult<MutexGuard<'_, WalWriter>> {
        self.writer.lock().map_err(|_| JournalError::LockPoisoned)
    }
}

impl std::fmt::Debug for WriteAheadLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteAheadLog")
            .field("path", &self.path)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Seek, SeekFrom};

    use crate::entry::EntryKind;
    use muxlog_types::Record;

    fn make_entry(seq: u64) -> JournalEntry {
        JournalEntry {
            seq,
            kind: EntryKind::Put,
            class: "billing.Invoice".into(),
            service: Some("billing".into()),
            record: Record::new().with("id", seq).with("amount", 10),
        }
    }

    #[test]
    fn append_and_recover() {
        let dir = tempfile::tempdir().unwrap();
        let wal = WriteAheadLog::open(&dir.path().join("j.wal"), WalConfig::default()).unwrap();

        for seq in 1..=3 {
            wal.append(&make_entry(seq)).unwrap();
        }

        let recovered = wal.recover().unwrap();
        assert_eq!(recovered, vec![make_entry(1), make_entry(2), make_entry(3)]);
    }

    #[test]
    fn recover_empty_segment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wal");
        let wal = WriteAheadLog::open(&path, WalConfig::default()).unwrap();
        assert!(wal.recover().unwrap().is_empty());
        assert_eq!(wal.offset().unwrap(), 0);
    }

    #[test]
    fn open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/j.wal");
        let wal = WriteAheadLog::open(&path, WalConfig::default()).unwrap();
        assert_eq!(wal.path(), path.as_path());
        assert!(path.exists());
    }

    #[test]
    fn crc_mismatch_skips_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.wal");
        let wal = WriteAheadLog::open(&path, WalConfig::default()).unwrap();
        wal.append(&make_entry(1)).unwrap();
        wal.append(&make_entry(2)).unwrap();
        drop(wal);

        {
            let mut file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
            file.seek(SeekFrom::Start(HEADER_SIZE as u64)).unwrap();
            let mut buf = [0u8; 1];
            file.read_exact(&mut buf).unwrap();
            buf[0] ^= 0xFF;
            file.seek(SeekFrom::Start(HEADER_SIZE as u64)).unwrap();
            file.write_all(&buf).unwrap();
            file.sync_all().unwrap();
        }

        let wal = WriteAheadLog::open(&path, WalConfig::default()).unwrap();
        assert_eq!(wal.recover().unwrap(), vec![make_entry(2)]);
    }

    #[test]
    fn torn_tail_stops_recovery() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tail.wal");
        let wal = WriteAheadLog::open(&path, WalConfig::default()).unwrap();
        wal.append(&make_entry(1)).unwrap();
        wal.append(&make_entry(2)).unwrap();
        let total = wal.offset().unwrap();
        drop(wal);

        OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_len(total - 3)
            .unwrap();

        let wal = WriteAheadLog::open(&path, WalConfig::default()).unwrap();
        assert_eq!(wal.recover().unwrap(), vec![make_entry(1)]);
    }

    /// Write a frame header promising more payload than follows it.
    fn write_torn_frame(path: &Path) {
        let mut file = OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(&200u32.to_le_bytes()).unwrap();
        file.write_all(&0u32.to_le_bytes()).unwrap();
        file.write_all(b"{\"s").unwrap();
        file.sync_all().unwrap();
    }

    #[test]
    fn open_truncates_torn_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("torn.wal");
        let wal = WriteAheadLog::open(&path, WalConfig::default()).unwrap();
        wal.append(&make_entry(1)).unwrap();
        let intact = wal.offset().unwrap();
        drop(wal);

        write_torn_frame(&path);
        assert_eq!(fs::metadata(&path).unwrap().len(), intact + HEADER_SIZE as u64 + 3);

        let wal = WriteAheadLog::open(&path, WalConfig::default()).unwrap();
        assert_eq!(wal.offset().unwrap(), intact);
        assert_eq!(fs::metadata(&path).unwrap().len(), intact);
    }

    #[test]
    fn appends_after_torn_tail_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.wal");
        let wal = WriteAheadLog::open(&path, WalConfig::default()).unwrap();
        wal.append(&make_entry(1)).unwrap();
        drop(wal);

        write_torn_frame(&path);

        let wal = WriteAheadLog::open(&path, WalConfig::default()).unwrap();
        wal.append(&make_entry(2)).unwrap();
        drop(wal);

        let wal = WriteAheadLog::open(&path, WalConfig::default()).unwrap();
        assert_eq!(wal.recover().unwrap(), vec![make_entry(1), make_entry(2)]);
    }

    #[test]
    fn scan_reports_complete_prefix() {
        let mut bytes = Vec::new();
        for seq in 1..=2 {
            let payload = serde_json::to_vec(&make_entry(seq)).unwrap();
            bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            bytes.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
            bytes.extend_from_slice(&payload);
        }
        let complete = bytes.len() as u64;
        // Zero-length header: never written by append, so treated as torn.
        bytes.extend_from_slice(&[0u8; HEADER_SIZE]);

        let result = scan(&bytes);
        assert_eq!(result.entries, vec![make_entry(1), make_entry(2)]);
        assert_eq!(result.valid_len, complete);
        assert_eq!(result.skipped, 0);

        let empty = scan(&[]);
        assert!(empty.entries.is_empty());
        assert_eq!(empty.valid_len, 0);
    }

    #[test]
    fn offsets_increase_and_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("offsets.wal");
        let wal = WriteAheadLog::open(&path, WalConfig::default()).unwrap();
        let first = wal.append(&make_entry(1)).unwrap();
        let second = wal.append(&make_entry(2)).unwrap();
        assert_eq!(first, 0);
        assert!(second > first);
        let end = wal.offset().unwrap();
        drop(wal);

        let wal = WriteAheadLog::open(&path, WalConfig::default()).unwrap();
        assert_eq!(wal.offset().unwrap(), end);
        assert_eq!(wal.append(&make_entry(3)).unwrap(), end);
    }

    #[test]
    fn sync_every_write() {
        let dir = tempfile::tempdir().unwrap();
        let config = WalConfig {
            sync_mode: SyncMode::EveryWrite,
        };
        let wal = WriteAheadLog::open(&dir.path().join("sync.wal"), config).unwrap();
        wal.append(&make_entry(1)).unwrap();
        assert_eq!(wal.recover().unwrap().len(), 1);
    }

    #[test]
    fn config_parses_from_json() {
        let config: WalConfig = serde_json::from_str(r#"{"sync_mode":"every_write"}"#).unwrap();
        assert_eq!(config.sync_mode, SyncMode::EveryWrite);
        let empty: WalConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, WalConfig::default());
    }
}
