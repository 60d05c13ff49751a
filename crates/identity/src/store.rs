use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::model::ContactRecord;

/// Storage collaborator. The engine only reads, rewrites and deletes;
/// record creation and id assignment belong to the backend.
pub trait ContactStore {
    /// Full snapshot ordered by `created_at` ascending, then id.
    fn list_all(&self) -> Result<Vec<ContactRecord>, StoreError>;

    /// Persist `record.identity_value` for `record.id`.
    fn update(&mut self, record: &ContactRecord) -> Result<(), StoreError>;

    fn delete(&mut self, record: &ContactRecord) -> Result<(), StoreError>;

    fn count(&self) -> Result<u64, StoreError>;
}

impl<T: ContactStore + ?Sized> ContactStore for &mut T {
    fn list_all(&self) -> Result<Vec<ContactRecord>, StoreError> {
        (**self).list_all()
    }

    fn update(&mut self, record: &ContactRecord) -> Result<(), StoreError> {
        (**self).update(record)
    }

    fn delete(&mut self, record: &ContactRecord) -> Result<(), StoreError> {
        (**self).delete(record)
    }

    fn count(&self) -> Result<u64, StoreError> {
        (**self).count()
    }
}

/// In-memory store with optional failure injection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Vec<ContactRecord>,
    next_id: i64,
    unavailable: bool,
    failing_updates: HashSet<i64>,
    failing_deletes: HashSet<i64>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Seed a record. Returns the assigned id.
    pub fn insert(
        &mut self,
        display_name: &str,
        identity_value: &str,
        created_at: DateTime<Utc>,
    ) -> i64 {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        self.records.push(ContactRecord {
            id,
            display_name: display_name.to_string(),
            identity_value: identity_value.to_string(),
            created_at,
            updated_at: created_at,
        });
        id
    }

    pub fn get(&self, id: i64) -> Option<&ContactRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn records(&self) -> &[ContactRecord] {
        &self.records
    }

    /// Successful update + delete calls so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Make `list_all` and `count` fail as if the backend were down.
    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    pub fn fail_updates_for(&mut self, id: i64) {
        self.failing_updates.insert(id);
    }

    pub fn fail_deletes_for(&mut self, id: i64) {
        self.failing_deletes.insert(id);
    }

    fn position(&self, id: i64) -> Result<usize, StoreError> {
        self.records
            .iter()
            .position(|r| r.id == id)
            .ok_or(StoreError::NotFound { id })
    }
}

impl ContactStore for MemoryStore {
    fn list_all(&self) -> Result<Vec<ContactRecord>, StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("memory store marked unavailable".into()));
        }
        let mut records = self.records.clone();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    fn update(&mut self, record: &ContactRecord) -> Result<(), StoreError> {
        if self.failing_updates.contains(&record.id) {
            return Err(StoreError::Backend(format!("injected update failure for {}", record.id)));
        }
        let idx = self.position(record.id)?;
        let stored = &mut self.records[idx];
        stored.identity_value = record.identity_value.clone();
        stored.updated_at = Utc::now();
        self.writes += 1;
        Ok(())
    }

    fn delete(&mut self, record: &ContactRecord) -> Result<(), StoreError> {
        if self.failing_deletes.contains(&record.id) {
            return Err(StoreError::Backend(format!("injected delete failure for {}", record.id)));
        }
        let idx = self.position(record.id)?;
        self.records.remove(idx);
        self.writes += 1;
        Ok(())
    }

    fn count(&self) -> Result<u64, StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("memory store marked unavailable".into()));
        }
        Ok(self.records.len() as u64)
    }
}
