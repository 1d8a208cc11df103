use std::sync::RwLock;

use muxlog_types::{ClassInfo, Context, Record};

use crate::entry::{EntryKind, JournalEntry};
use crate::error::{JournalError, JournalResult};
use crate::traits::Journal;

/// In-memory journal for tests, local demos, and embedding.
#[derive(Default)]
pub struct InMemoryJournal {
    entries: RwLock<Vec<JournalEntry>>,
}

impl InMemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries recorded.
    pub fn len(&self) -> JournalResult<usize> {
        Ok(self
            .entries
            .read()
            .map_err(|_| JournalError::LockPoisoned)?
            .len())
    }

    pub fn is_empty(&self) -> JournalResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Entries tagged with `service`, in append order.
    pub fn entries_for(&self, service: &str) -> JournalResult<Vec<JournalEntry>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|e| e.service.as_deref() == Some(service))
            .collect())
    }
}

impl Journal for InMemoryJournal {
    fn append(
        &self,
        ctx: &Context,
        kind: EntryKind,
        class: &ClassInfo,
        record: &Record,
    ) -> JournalResult<JournalEntry> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| JournalError::LockPoisoned)?;
        let seq = entries.last().map(|e| e.seq + 1).unwrap_or(1);
        let entry = JournalEntry::from_context(seq, ctx, kind, class, record);
        entries.push(entry.clone());
        Ok(entry)
    }

    fn entries(&self) -> JournalResult<Vec<JournalEntry>> {
        Ok(self
            .entries
            .read()
            .map_err(|_| JournalError::LockPoisoned)?
            .clone())
    }
}

impl std::fmt::Debug for InMemoryJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryJournal")
            .field("entry_count", &self.len().unwrap_or_default())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn class() -> ClassInfo {
        ClassInfo::new("billing.Invoice")
    }

    #[test]
    fn append_assigns_increasing_seq() {
        let journal = InMemoryJournal::new();
        let ctx = Context::new();
        let record = Record::new().with("id", 1);
        let a = journal.append(&ctx, EntryKind::Put, &class(), &record).unwrap();
        let b = journal.append(&ctx, EntryKind::Remove, &class(), &record).unwrap();
        assert_eq!(a.seq, 1);
        assert_eq!(b.seq, 2);
        assert_eq!(journal.len().unwrap(), 2);
    }

    #[test]
    fn append_tags_with_context_service() {
        let journal = InMemoryJournal::new();
        let billing = Context::new().with("service", "billing".to_string());
        let ledger = Context::new().with("service", "ledger".to_string());
        journal.append(&billing, EntryKind::Put, &class(), &Record::new().with("id", 1)).unwrap();
        journal.append(&ledger, EntryKind::Put, &class(), &Record::new().with("id", 2)).unwrap();
        journal.append(&billing, EntryKind::Put, &class(), &Record::new().with("id", 3)).unwrap();

        let ours = journal.entries_for("billing").unwrap();
        assert_eq!(ours.len(), 2);
        assert_eq!(ours[1].seq, 3);
    }

    #[test]
    fn concurrent_appends_keep_unique_seq() {
        let journal = Arc::new(InMemoryJournal::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let journal = Arc::clone(&journal);
                thread::spawn(move || {
                    let record = Record::new().with("id", i);
                    journal
                        .append(&Context::new(), EntryKind::Put, &class(), &record)
                        .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }

        let seqs: Vec<u64> = journal.entries().unwrap().iter().map(|e| e.seq).collect();
        assert_eq!(seqs, (1..=8).collect::<Vec<_>>());
    }

    #[test]
    fn empty_journal() {
        let journal = InMemoryJournal::default();
        assert!(journal.is_empty().unwrap());
        assert!(format!("{journal:?}").contains("entry_count"));
    }
}
