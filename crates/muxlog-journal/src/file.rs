use std::path::Path;
use std::sync::Mutex;

use tracing::info;

use muxlog_types::{ClassInfo, Context, Record};

use crate::entry::{EntryKind, JournalEntry};
use crate::error::{JournalError, JournalResult};
use crate::traits::Journal;
use crate::wal::{WalConfig, WriteAheadLog};

/// Crash-recoverable journal backed by a single [`WriteAheadLog`] segment.
///
/// Opening an existing segment resumes sequence numbering after the highest
/// recovered entry. Appends are serialized so that frame order on disk
/// equals sequence order.
pub struct FileJournal {
    wal: WriteAheadLog,
    next_seq: Mutex<u64>,
}

impl FileJournal {
    /// Open (or create) the journal segment at `path`.
    pub fn open(path: &Path, config: WalConfig) -> JournalResult<Self> {
        let wal = WriteAheadLog::open(path, config)?;
        let recovered = wal.recover()?;
        let last_seq = recovered.iter().map(|e| e.seq).max().unwrap_or(0);

        info!(
            path = %path.display(),
            entries = recovered.len(),
            last_seq,
            "journal opened"
        );

        Ok(Self {
            wal,
            next_seq: Mutex::new(last_seq + 1),
        })
    }

    pub fn path(&self) -> &Path {
        self.wal.path()
    }
}

impl Journal for FileJournal {
    fn append(
        &self,
        ctx: &Context,
        kind: EntryKind,
        class: &ClassInfo,
        record: &Record,
    ) -> JournalResult<JournalEntry> {
        let mut next_seq = self.next_seq.lock().map_err(|_| JournalError::LockPoisoned)?;
        let entry = JournalEntry::from_context(*next_seq, ctx, kind, class, record);
        self.wal.append(&entry)?;
        *next_seq += 1;
        Ok(entry)
    }

    fn entries(&self) -> JournalResult<Vec<JournalEntry>> {
        self.wal.recover()
    }
}

impl std::fmt::Debug for FileJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileJournal")
            .field("path", &self.wal.path())
            .finish()
    }
}
