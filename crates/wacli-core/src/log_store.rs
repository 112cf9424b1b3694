use crate::entry::Entry;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogError {
    #[error("log already loaded or appended to; history can only be loaded once")]
    AlreadyLoaded,
    #[error("log index {index} out of range (len {len})")]
    OutOfRange { index: usize, len: usize },
}

/// Append-only, time-ordered chat log.
///
/// History is merged once through [`LogStore::load`]; after that entries only
/// arrive at the tail in arrival order, whatever their timestamp.
#[derive(Debug, Default)]
pub struct LogStore {
    entries: Vec<Entry>,
    sealed: bool,
}

impl LogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the contents with `initial`, stably sorted by timestamp.
    pub fn load(&mut self, initial: Vec<Entry>) -> Result<(), LogError> {
        if self.sealed {
            return Err(LogError::AlreadyLoaded);
        }
        let mut entries = initial;
        entries.sort_by_key(Entry::timestamp);
        self.entries = entries;
        self.sealed = true;
        Ok(())
    }

    /// Adds `entry` at the tail and returns its index.
    pub fn append(&mut self, entry: Entry) -> usize {
        self.sealed = true;
        self.entries.push(entry);
        self.entries.len() - 1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&Entry, LogError> {
        self.entries.get(index).ok_or(LogError::OutOfRange {
            index,
            len: self.entries.len(),
        })
    }

    pub fn last_index(&self) -> Option<usize> {
        self.entries.len().checked_sub(1)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }
}
