use std::collections::VecDeque;
use std::path::PathBuf;

use crate::error::{ImportError, Result};

/// Files waiting to be uploaded, in the order they were resolved.
///
/// Entries are never deduplicated or reordered; a path matched by two
/// patterns is queued twice.
#[derive(Debug, Default)]
pub struct ImportQueue {
    entries: VecDeque<PathBuf>,
}

impl ImportQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_all<I>(&mut self, paths: I)
    where
        I: IntoIterator<Item = PathBuf>,
    {
        self.entries.extend(paths);
    }

    pub fn pop_front(&mut self) -> Result<PathBuf> {
        self.entries.pop_front().ok_or(ImportError::EmptyQueue)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl FromIterator<PathBuf> for ImportQueue {
    fn from_iter<T: IntoIterator<Item = PathBuf>>(iter: T) -> Self {
        let mut queue = Self::new();
        queue.push_all(iter);
        queue
    }
}
