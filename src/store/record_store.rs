use crate::store::{StoreError, UserRecord};
use std::collections::HashMap;
use std::sync::Mutex;

/// RecordStore is where user records live between process restarts. The directory keeps every
/// record in memory and writes through to one of these on each mutation.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync + 'static {
    async fn load_all(&self) -> Result<Vec<UserRecord>, StoreError>;

    /// Insert or overwrite.
    async fn persist(&self, record: &UserRecord) -> Result<(), StoreError>;

    /// Removing a user that isn't stored is not an error.
    async fn remove(&self, username: &str) -> Result<(), StoreError>;

    async fn clear(&self) -> Result<(), StoreError>;
}

#[derive(Default)]
pub struct InMemoryRecordStore {
    records: Mutex<HashMap<String, UserRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> std::sync::MutexGuard<'_, HashMap<String, UserRecord>> {
        self.records.lock().expect("InMemoryRecordStore mutex guard poison")
    }
}

#[async_trait::async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn load_all(&self) -> Result<Vec<UserRecord>, StoreError> {
        Ok(self.records().values().cloned().collect())
    }

    async fn persist(&self, record: &UserRecord) -> Result<(), StoreError> {
        self.records().insert(record.username.clone(), record.clone());
        Ok(())
    }

    async fn remove(&self, username: &str) -> Result<(), StoreError> {
        self.records().remove(username);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.records().clear();
        Ok(())
    }
}
