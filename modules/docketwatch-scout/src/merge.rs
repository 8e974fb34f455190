use std::collections::HashMap;

use docketwatch_common::FilingRecord;

/// Joins the titles of entries that share a link.
pub const TITLE_SEPARATOR: &str = " // ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merged {
    /// First record with this link.
    New,
    /// Title appended to an existing record.
    Appended,
    /// Title was already present in the existing record.
    Duplicate,
}

struct Slot {
    record: FilingRecord,
    titles: Vec<String>,
}

/// Coalesces records that point at the same document within one poll
/// cycle. Records are accumulated in feed order (newest first); the first
/// record seen for a link is the one kept, later ones only add titles.
#[derive(Default)]
pub struct MergeBuffer {
    slots: Vec<Slot>,
    by_link: HashMap<String, usize>,
}

impl MergeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: FilingRecord) -> Merged {
        if let Some(&idx) = self.by_link.get(record.merge_key()) {
            let slot = &mut self.slots[idx];
            if slot.titles.iter().any(|t| *t == record.title) {
                return Merged::Duplicate;
            }
            slot.titles.push(record.title);
            return Merged::Appended;
        }

        self.by_link
            .insert(record.merge_key().to_string(), self.slots.len());
        let titles = vec![record.title.clone()];
        self.slots.push(Slot { record, titles });
        Merged::New
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Finalized records, oldest first.
    pub fn drain_chronological(self) -> Vec<FilingRecord> {
        self.slots
            .into_iter()
            .rev()
            .map(|slot| FilingRecord {
                title: slot.titles.join(TITLE_SEPARATOR),
                ..slot.record
            })
            .collect()
    }
}
