use std::collections::HashMap;

use crate::error::LookupError;

/// Read-only `local id → phone number` lookup.
///
/// `Ok(None)` means the LID is simply unknown, which is an expected outcome.
/// `Err` is reserved for a mapping source that could not be read.
pub trait MappingLookup {
    fn lookup(&self, local_id: &str) -> Result<Option<String>, LookupError>;
}

impl<T: MappingLookup + ?Sized> MappingLookup for &T {
    fn lookup(&self, local_id: &str) -> Result<Option<String>, LookupError> {
        (**self).lookup(local_id)
    }
}

impl<T: MappingLookup + ?Sized> MappingLookup for Box<T> {
    fn lookup(&self, local_id: &str) -> Result<Option<String>, LookupError> {
        (**self).lookup(local_id)
    }
}

/// In-memory mapping snapshot.
#[derive(Debug, Clone, Default)]
pub struct MemoryMapping {
    entries: HashMap<String, String>,
}

impl MemoryMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, local_id: impl Into<String>, phone: impl Into<String>) -> Self {
        self.insert(local_id, phone);
        self
    }

    pub fn insert(&mut self, local_id: impl Into<String>, phone: impl Into<String>) {
        self.entries.insert(local_id.into(), phone.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for MemoryMapping {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl MappingLookup for MemoryMapping {
    fn lookup(&self, local_id: &str) -> Result<Option<String>, LookupError> {
        Ok(self.entries.get(local_id).cloned())
    }
}

/// A mapping that knows nothing. Every LID falls back to itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMapping;

impl MappingLookup for NoMapping {
    fn lookup(&self, _local_id: &str) -> Result<Option<String>, LookupError> {
        Ok(None)
    }
}
