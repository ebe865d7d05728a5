use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Directory, relative to the store root, holding every attachment.
pub const ATTACHMENT_DIR: &str = "pieces_justificatives";

const MAX_FILE_NAME_LEN: usize = 100;

#[async_trait]
pub trait AttachmentStore: Sync + Send {
    /// Stores `content` under a fresh name derived from `file_name` and returns
    /// the relative path of the new blob.
    async fn save(
        &self,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<String, AttachmentStoreError>;

    async fn read(&self, path: &str) -> Result<Vec<u8>, AttachmentStoreError>;

    async fn exists(&self, path: &str) -> Result<bool, AttachmentStoreError>;

    /// Removing a blob that does not exist is not an error.
    async fn remove(&self, path: &str) -> Result<(), AttachmentStoreError>;
}

#[derive(Error, Debug)]
pub enum AttachmentStoreError {
    #[error("Attachment {0} not found")]
    AttachmentNotFound(String),
    #[error("Invalid attachment path: {0}")]
    InvalidPath(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Builds `pieces_justificatives/<uuid>-<name>` from a client supplied file name.
pub fn new_attachment_path(file_name: &str) -> String {
    format!(
        "{}/{}-{}",
        ATTACHMENT_DIR,
        Uuid::new_v4().simple(),
        sanitise_file_name(file_name)
    )
}

/// Keeps the last path component of `file_name`, restricted to ASCII
/// alphanumerics, `.`, `-` and `_`.
pub fn sanitise_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let sanitised: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    // all ASCII at this point, so byte slicing is safe; keep the tail for the extension
    let tail = &sanitised[sanitised.len().saturating_sub(MAX_FILE_NAME_LEN)..];
    let name = tail.trim_start_matches('.');
    if name.is_empty() {
        "fichier".to_owned()
    } else {
        name.to_owned()
    }
}

/// Accepts only paths produced by [`new_attachment_path`].
pub fn check_path(path: &str) -> Result<(), AttachmentStoreError> {
    let Some((dir, name)) = path.split_once('/') else {
        return Err(AttachmentStoreError::InvalidPath(path.to_owned()));
    };
    let name_ok = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
    if dir == ATTACHMENT_DIR && name_ok {
        Ok(())
    } else {
        Err(AttachmentStoreError::InvalidPath(path.to_owned()))
    }
}
