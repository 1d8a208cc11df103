use tracing::debug;

use muxlog_store::Store;
use muxlog_types::{keys, Context};

use crate::entry::{EntryFilter, EntryKind, JournalEntry, ReplayReport};
use crate::error::{JournalError, JournalResult};

/// Context under which a single entry is re-applied.
pub fn replay_context(ctx: &Context, entry: &JournalEntry) -> Context {
    let ctx = ctx
        .with(keys::REPLAY, entry.seq)
        .with(keys::RECORDED_CLASS, entry.class.clone());
    match entry.service {
        Some(ref service) => ctx.with(keys::RECORDED_SERVICE, service.clone()),
        None => ctx,
    }
}

/// Dispatch `entries` to `target` in order.
pub fn replay_entries(
    entries: &[JournalEntry],
    ctx: &Context,
    target: &dyn Store,
    filter: Option<&EntryFilter>,
) -> JournalResult<ReplayReport> {
    let mut report = ReplayReport::default();

    for entry in entries {
        report.evaluated += 1;
        if let Some(filter) = filter {
            if !filter.matches(entry) {
                report.skipped += 1;
                continue;
            }
        }

        let entry_ctx = replay_context(ctx, entry);
        let applied = match entry.kind {
            EntryKind::Put => target.put(&entry_ctx, entry.record.clone()).map(|_| ()),
            EntryKind::Remove => target.remove(&entry_ctx, &entry.record).map(|_| ()),
        };
        applied.map_err(|source| JournalError::Store {
            seq: entry.seq,
            source,
        })?;

        report.dispatched += 1;
        report.last_seq = Some(entry.seq);
    }

    debug!(
        evaluated = report.evaluated,
        dispatched = report.dispatched,
        skipped = report.skipped,
        "journal replay complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use muxlog_store::{InMemoryStore, StoreError};
    use muxlog_types::{ClassInfo, Record};
    use serde_json::json;

    fn entry(seq: u64, kind: EntryKind, id: i64, service: Option<&str>) -> JournalEntry {
        JournalEntry {
            seq,
            kind,
            class: "billing.Invoice".into(),
            service: service.map(str::to_string),
            record: Record::new().with("id", id).with("amount", seq as i64 * 10),
        }
    }

    fn store() -> InMemoryStore {
        InMemoryStore::new(ClassInfo::new("billing.Invoice"))
    }

    #[test]
    fn replay_context_carries_entry_metadata() {
        let base = Context::new().with("tenant", "acme".to_string());
        let ctx = replay_context(&base, &entry(7, EntryKind::Put, 1, Some("billing")));
        assert_eq!(ctx.get::<u64>(keys::REPLAY), Some(&7));
        assert_eq!(ctx.get_str(keys::RECORDED_SERVICE), Some("billing"));
        assert_eq!(ctx.get_str(keys::RECORDED_CLASS), Some("billing.Invoice"));
        assert_eq!(ctx.get_str("tenant"), Some("acme"));
        assert!(!base.contains(keys::REPLAY));

        let untagged = replay_context(&base, &entry(8, EntryKind::Put, 1, None));
        assert!(!untagged.contains(keys::RECORDED_SERVICE));
    }

    #[test]
    fn applies_entries_in_order() {
        let target = store();
        let entries = vec![
            entry(1, EntryKind::Put, 1, Some("billing")),
            entry(2, EntryKind::Put, 2, Some("billing")),
            entry(3, EntryKind::Remove, 1, Some("billing")),
            entry(4, EntryKind::Put, 2, Some("billing")),
        ];
        let report = replay_entries(&entries, &Context::new(), &target, None).unwrap();

        assert_eq!(report.evaluated, 4);
        assert_eq!(report.dispatched, 4);
        assert_eq!(report.last_seq, Some(4));

        let records = target.select(&Context::new()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("amount"), Some(&json!(40)));
    }

    #[test]
    fn filter_skips_entries() {
        let target = store();
        let entries = vec![
            entry(1, EntryKind::Put, 1, Some("billing")),
            entry(2, EntryKind::Put, 2, Some("ledger")),
        ];
        let filter = EntryFilter::for_service("billing");
        let report = replay_entries(&entries, &Context::new(), &target, Some(&filter)).unwrap();

        assert_eq!(report.dispatched, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(target.len().unwrap(), 1);
    }

    #[test]
    fn target_error_aborts_with_seq() {
        let target = store();
        let mut bad = entry(2, EntryKind::Put, 0, None);
        bad.record = Record::new().with("amount", 1);
        let entries = vec![
            entry(1, EntryKind::Put, 1, None),
            bad,
            entry(3, EntryKind::Put, 3, None),
        ];

        let err = replay_entries(&entries, &Context::new(), &target, None).unwrap_err();
        match err {
            JournalError::Store { seq, source } => {
                assert_eq!(seq, 2);
                assert!(matches!(source, StoreError::MissingKey { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        // Entry 1 stays applied; entry 3 was never reached.
        assert_eq!(target.len().unwrap(), 1);
    }
}
