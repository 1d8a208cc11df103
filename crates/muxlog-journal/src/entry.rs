use serde::{Deserialize, Serialize};

use muxlog_types::{ClassInfo, Context, Record};

/// Kind of write recorded by a journal entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Put,
    Remove,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Put => write!(f, "put"),
            Self::Remove => write!(f, "remove"),
        }
    }
}

/// A single recorded write.
///
/// `seq` is assigned by the journal on append: it starts at 1 and strictly
/// increases in append order. `service` is the service name bound in the
/// writer's context, or `None` if the writer had none.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub seq: u64,
    pub kind: EntryKind,
    /// Class id of the record.
    pub class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    pub record: Record,
}

impl JournalEntry {
    /// Build an entry, taking the service tag from `ctx`.
    pub fn from_context(
        seq: u64,
        ctx: &Context,
        kind: EntryKind,
        class: &ClassInfo,
        record: &Record,
    ) -> Self {
        Self {
            seq,
            kind,
            class: class.id.clone(),
            service: ctx.service().map(str::to_string),
            record: record.clone(),
        }
    }
}

/// Selects the entries a replay should dispatch.
#[derive(Clone, Debug, Default)]
pub struct EntryFilter {
    /// If set, only entries tagged with one of these services. Untagged
    /// entries never match.
    pub services: Option<Vec<String>>,
    /// If set, only entries of these kinds.
    pub kinds: Option<Vec<EntryKind>>,
    /// If set, only entries with a greater sequence number.
    pub after_seq: Option<u64>,
}

impl EntryFilter {
    /// Filter matching entries tagged with `service`.
    pub fn for_service(service: impl Into<String>) -> Self {
        Self {
            services: Some(vec![service.into()]),
            ..Self::default()
        }
    }

    /// Returns `true` if the given entry matches this filter.
    pub fn matches(&self, entry: &JournalEntry) -> bool {
        if let Some(ref services) = self.services {
            match entry.service {
                Some(ref tag) if services.contains(tag) => {}
                _ => return false,
            }
        }
        if let Some(ref kinds) = self.kinds {
            if !kinds.contains(&entry.kind) {
                return false;
            }
        }
        if let Some(after) = self.after_seq {
            if entry.seq <= after {
                return false;
            }
        }
        true
    }
}

/// Outcome of a replay pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Entries read from the journal.
    pub evaluated: u64,
    /// Entries handed to the replay target.
    pub dispatched: u64,
    /// Entries rejected by the filter.
    pub skipped: u64,
    /// Sequence number of the last dispatched entry.
    pub last_seq: Option<u64>,
}
