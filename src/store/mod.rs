//! The social graph each replica holds, and where it is persisted.
mod directory;
mod disk;
mod error;
mod feed;
mod record;
mod record_store;

pub use directory::UserDirectory;
pub use disk::DiskRecordStore;
pub use error::StoreError;
pub use record::Post;
pub use record::UserRecord;
pub use record_store::InMemoryRecordStore;
pub use record_store::RecordStore;
pub(crate) use record::datetime_from_millis;
pub(crate) use record::now_millis;
