use async_trait::async_trait;

use crate::error::IngestError;

/// How an object write treats an existing object at the same path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutMode {
    /// Fail with a conflict if the object exists.
    Create,
    /// Overwrite an existing object.
    Upsert,
}

/// Durable object storage for audio files.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores `body` at `path`. Non-success responses map to [`IngestError::UploadFailed`].
    async fn put_object(
        &self,
        path: &str,
        body: Vec<u8>,
        content_type: &str,
        mode: PutMode,
    ) -> Result<(), IngestError>;

    /// Publicly readable URL of the object at `path`.
    fn public_url(&self, path: &str) -> String;
}
