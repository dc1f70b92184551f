use super::{EntryReader, EntryWriter};
use crate::error::{BundleError, Result};
use std::collections::HashMap;

/// In-memory archive.
///
/// Keeps entries in insertion order like the on-disk writer, so layouts
/// produced here match what ends up in a tar.gz file.
#[derive(Debug, Default, Clone)]
pub struct MemArchive {
    entries: Vec<(String, Vec<u8>)>,
    index: HashMap<String, usize>,
    simulate_write_error: bool,
}

impl MemArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable write error simulation for testing error handling.
    pub fn set_simulate_write_error(&mut self, simulate: bool) {
        self.simulate_write_error = simulate;
    }

    /// Removes an entry, returning its payload.
    pub fn remove_entry(&mut self, path: &str) -> Option<Vec<u8>> {
        let pos = self.index.remove(path)?;
        let (_, data) = self.entries.remove(pos);
        for slot in self.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        Some(data)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries
            .iter()
            .map(|(name, data)| (name.as_str(), data.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl EntryReader for MemArchive {
    fn find_entry(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.index.get(path).map(|&i| self.entries[i].1.clone()))
    }

    fn entry_names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }
}

impl EntryWriter for MemArchive {
    fn write_entry(&mut self, path: &str, data: &[u8]) -> Result<()> {
        if self.simulate_write_error {
            return Err(BundleError::archive("Simulated write error"));
        }
        match self.index.get(path) {
            Some(&i) => self.entries[i].1 = data.to_vec(),
            None => {
                self.index.insert(path.to_string(), self.entries.len());
                self.entries.push((path.to_string(), data.to_vec()));
            }
        }
        Ok(())
    }
}
