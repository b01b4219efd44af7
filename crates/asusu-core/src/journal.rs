use crate::error::AsusuError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Store mutations recorded in the journal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JournalEntryKind {
    GroupCreated,
    MemberJoined,
    MemberRemoved,
    ContributionRecorded,
    ForceStarted,
    TurnAssigned,
    PayoutDisbursed,
}

/// Hash-chained journal entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub entry_id: String,
    pub index: u64,
    pub group_id: String,
    pub actor: String,
    pub kind: JournalEntryKind,
    pub timestamp: DateTime<Utc>,
    pub payload: Value,
    pub previous_hash: Option<String>,
    pub entry_hash: String,
}

/// Append-only record of every applied group mutation.
///
/// No in-place mutation APIs are exposed; entries are built first and committed only
/// once the store change they describe is ready to apply.
#[derive(Debug, Default, Clone)]
pub struct ActivityJournal {
    entries: Vec<JournalEntry>,
}

impl ActivityJournal {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Rebuild a journal from exported entries and verify the hash chain.
    pub fn from_entries(entries: Vec<JournalEntry>) -> Result<Self, AsusuError> {
        let journal = Self { entries };

        for (expected_index, entry) in journal.entries.iter().enumerate() {
            if entry.index != expected_index as u64 {
                return Err(AsusuError::Journal(format!(
                    "journal index gap at position {} (found {})",
                    expected_index, entry.index
                )));
            }
        }

        if !journal.verify_chain() {
            return Err(AsusuError::Journal(
                "journal hash-chain verification failed".to_string(),
            ));
        }

        Ok(journal)
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries_for_group<'a>(
        &'a self,
        group_id: &'a str,
    ) -> impl Iterator<Item = &'a JournalEntry> + 'a {
        self.entries
            .iter()
            .filter(move |entry| entry.group_id == group_id)
    }

    pub fn verify_chain(&self) -> bool {
        let mut previous_hash: Option<String> = None;
        for entry in &self.entries {
            let expected_hash = compute_entry_hash(
                entry.index,
                &entry.group_id,
                &entry.actor,
                entry.kind,
                entry.timestamp,
                &entry.payload,
                previous_hash.as_deref(),
            );
            if entry.entry_hash != expected_hash || entry.previous_hash != previous_hash {
                return false;
            }
            previous_hash = Some(entry.entry_hash.clone());
        }
        true
    }

    /// Build the next entry without touching the chain.
    pub fn build_entry<P: Serialize>(
        &self,
        group_id: &str,
        actor: &str,
        kind: JournalEntryKind,
        payload: &P,
    ) -> Result<JournalEntry, AsusuError> {
        let payload =
            serde_json::to_value(payload).map_err(|e| AsusuError::Journal(e.to_string()))?;
        let index = self.entries.len() as u64;
        let timestamp = Utc::now();
        let previous_hash = self.entries.last().map(|entry| entry.entry_hash.clone());
        let entry_hash = compute_entry_hash(
            index,
            group_id,
            actor,
            kind,
            timestamp,
            &payload,
            previous_hash.as_deref(),
        );

        Ok(JournalEntry {
            entry_id: Uuid::new_v4().to_string(),
            index,
            group_id: group_id.to_string(),
            actor: actor.to_string(),
            kind,
            timestamp,
            payload,
            previous_hash,
            entry_hash,
        })
    }

    /// Commit an entry produced by [`ActivityJournal::build_entry`] against the current tip.
    pub fn commit_entry(&mut self, entry: JournalEntry) -> Result<(), AsusuError> {
        let expected_index = self.entries.len() as u64;
        if entry.index != expected_index {
            return Err(AsusuError::Journal(format!(
                "commit index mismatch: expected {}, got {}",
                expected_index, entry.index
            )));
        }

        let expected_previous_hash = self.entries.last().map(|e| e.entry_hash.clone());
        if entry.previous_hash != expected_previous_hash {
            return Err(AsusuError::Journal(
                "commit previous hash mismatch".to_string(),
            ));
        }

        let expected_hash = compute_entry_hash(
            entry.index,
            &entry.group_id,
            &entry.actor,
            entry.kind,
            entry.timestamp,
            &entry.payload,
            entry.previous_hash.as_deref(),
        );
        if entry.entry_hash != expected_hash {
            return Err(AsusuError::Journal(
                "commit hash mismatch for journal entry".to_string(),
            ));
        }

        self.entries.push(entry);
        Ok(())
    }
}

fn compute_entry_hash(
    index: u64,
    group_id: &str,
    actor: &str,
    kind: JournalEntryKind,
    timestamp: DateTime<Utc>,
    payload: &Value,
    previous_hash: Option<&str>,
) -> String {
    let material = serde_json::json!({
        "index": index,
        "group_id": group_id,
        "actor": actor,
        "kind": kind,
        "timestamp": timestamp,
        "payload": payload,
        "previous_hash": previous_hash,
    });

    let bytes = serde_json::to_vec(&material).unwrap_or_default();
    blake3::hash(&bytes).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn append(journal: &mut ActivityJournal, kind: JournalEntryKind, group_id: &str) {
        let entry = journal
            .build_entry(group_id, "fatima", kind, &serde_json::json!({"amount": 5000}))
            .unwrap();
        journal.commit_entry(entry).unwrap();
    }

    #[test]
    fn verifies_hash_chain() {
        let mut journal = ActivityJournal::new();
        append(&mut journal, JournalEntryKind::GroupCreated, "g-1");
        append(&mut journal, JournalEntryKind::ContributionRecorded, "g-1");
        append(&mut journal, JournalEntryKind::MemberJoined, "g-2");

        assert!(journal.verify_chain());
        assert_eq!(journal.entries_for_group("g-1").count(), 2);

        let rebuilt = ActivityJournal::from_entries(journal.entries().to_vec()).unwrap();
        assert_eq!(rebuilt.len(), 3);
    }

    #[test]
    fn detects_tampered_entries() {
        let mut journal = ActivityJournal::new();
        append(&mut journal, JournalEntryKind::PayoutDisbursed, "g-1");

        let mut tampered = journal.entries().to_vec();
        tampered[0].payload = serde_json::json!({"amount": 50000});

        assert!(matches!(
            ActivityJournal::from_entries(tampered),
            Err(AsusuError::Journal(_))
        ));
    }

    #[test]
    fn stale_entry_cannot_be_committed() {
        let mut journal = ActivityJournal::new();
        let stale = journal
            .build_entry("g-1", "fatima", JournalEntryKind::GroupCreated, &())
            .unwrap();
        append(&mut journal, JournalEntryKind::GroupCreated, "g-2");

        let err = journal.commit_entry(stale).unwrap_err();
        assert!(err.to_string().contains("expected 1, got 0"));
    }
}
