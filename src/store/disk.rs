use crate::store::{RecordStore, StoreError, UserRecord};
use crate::wire::ProtoUserRecord;
use prost::Message;
use std::convert::TryFrom;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

const RECORD_EXTENSION: &str = "user";
const STAGING_EXTENSION: &str = "staging";

/// DiskRecordStore keeps one protobuf-encoded file per user under a data directory. File names are
/// the hex encoded username, so any username is a safe file name.
pub struct DiskRecordStore {
    logger: slog::Logger,
    directory: PathBuf,
}

impl DiskRecordStore {
    pub async fn open(logger: slog::Logger, directory: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let directory = directory.into();
        fs::create_dir_all(&directory)
            .await
            .map_err(StoreError::io(&directory))?;
        slog::info!(logger, "Opened record store at {:?}", directory);

        Ok(DiskRecordStore { logger, directory })
    }

    fn path_for(&self, username: &str) -> PathBuf {
        self.directory
            .join(format!("{}.{}", hex::encode(username.as_bytes()), RECORD_EXTENSION))
    }

    async fn record_paths(&self) -> Result<Vec<PathBuf>, StoreError> {
        let mut entries = fs::read_dir(&self.directory)
            .await
            .map_err(StoreError::io(&self.directory))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(StoreError::io(&self.directory))? {
            let path = entry.path();
            if is_record_file(&path) {
                paths.push(path);
            }
        }

        Ok(paths)
    }

    async fn read_record(&self, path: &Path) -> Result<Option<UserRecord>, StoreError> {
        let bytes = fs::read(path).await.map_err(StoreError::io(path))?;
        let decoded = ProtoUserRecord::decode(bytes.as_slice())
            .map_err(|e| e.to_string())
            .and_then(|proto| UserRecord::try_from(proto).map_err(|e| e.to_string()));

        match decoded {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                slog::warn!(self.logger, "Skipping unreadable record file {:?}: {}", path, e);
                Ok(None)
            }
        }
    }
}

fn is_record_file(path: &Path) -> bool {
    path.extension().map(|ext| ext == RECORD_EXTENSION).unwrap_or(false)
}

#[async_trait::async_trait]
impl RecordStore for DiskRecordStore {
    async fn load_all(&self) -> Result<Vec<UserRecord>, StoreError> {
        let mut records = Vec::new();
        for path in self.record_paths().await? {
            if let Some(record) = self.read_record(&path).await? {
                records.push(record);
            }
        }

        Ok(records)
    }

    async fn persist(&self, record: &UserRecord) -> Result<(), StoreError> {
        let proto = ProtoUserRecord::from(record);
        let mut bytes = Vec::with_capacity(proto.encoded_len());
        proto.encode(&mut bytes)?;

        // Write aside and rename so a crash never leaves a half-written record behind.
        let path = self.path_for(&record.username);
        let staging = path.with_extension(STAGING_EXTENSION);
        fs::write(&staging, bytes).await.map_err(StoreError::io(&staging))?;
        fs::rename(&staging, &path).await.map_err(StoreError::io(&path))?;

        Ok(())
    }

    async fn remove(&self, username: &str) -> Result<(), StoreError> {
        let path = self.path_for(username);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io { path, source: e }),
        }
    }

    async fn clear(&self) -> Result<(), StoreError> {
        for path in self.record_paths().await? {
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::Io { path, source: e }),
            }
        }

        Ok(())
    }
}
