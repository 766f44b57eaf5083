use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Record store I/O failure at {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("Failed to encode user record: {0}")]
    Encode(#[from] prost::EncodeError),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> StoreError {
        let path = path.into();
        move |source| StoreError::Io { path, source }
    }
}
