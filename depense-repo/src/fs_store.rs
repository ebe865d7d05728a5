use crate::attachment_store::AttachmentStoreError::AttachmentNotFound;
use crate::attachment_store::{
    check_path, new_attachment_path, AttachmentStore, AttachmentStoreError, ATTACHMENT_DIR,
};
use actix_web::web;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::{fs, io};
use tracing::instrument;

/// Stores attachments as plain files below `root`.
#[derive(Debug)]
pub struct FsAttachmentStore {
    root: PathBuf,
}

impl FsAttachmentStore {
    pub fn new(root: PathBuf) -> FsAttachmentStore {
        FsAttachmentStore { root }
    }

    fn full_path(&self, path: &str) -> Result<PathBuf, AttachmentStoreError> {
        check_path(path)?;
        Ok(self.root.join(path))
    }
}

pub fn create_store(root: PathBuf) -> Arc<dyn AttachmentStore> {
    Arc::new(FsAttachmentStore::new(root))
}

async fn blocking<F, R>(f: F) -> Result<io::Result<R>, AttachmentStoreError>
where
    F: FnOnce() -> io::Result<R> + Send + 'static,
    R: Send + 'static,
{
    web::block(f)
        .await
        .map_err(|e| AttachmentStoreError::Other(anyhow!("Blocking task failed: {}", e)))
}

#[async_trait]
impl AttachmentStore for FsAttachmentStore {
    #[instrument(skip(self, content))]
    async fn save(
        &self,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<String, AttachmentStoreError> {
        let path = new_attachment_path(file_name);
        let dir = self.root.join(ATTACHMENT_DIR);
        let full_path = self.full_path(&path)?;

        blocking(move || {
            fs::create_dir_all(dir)?;
            fs::write(full_path, content)
        })
        .await?
        .with_context(|| format!("Unable to write attachment {}", path))?;

        Ok(path)
    }

    #[instrument(skip(self))]
    async fn read(&self, path: &str) -> Result<Vec<u8>, AttachmentStoreError> {
        let full_path = self.full_path(path)?;

        match blocking(move || fs::read(full_path)).await? {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(AttachmentNotFound(path.to_owned())),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("Unable to read attachment {}", path))
                .into()),
        }
    }

    #[instrument(skip(self))]
    async fn exists(&self, path: &str) -> Result<bool, AttachmentStoreError> {
        let full_path = self.full_path(path)?;

        let exists = blocking(move || full_path.try_exists())
            .await?
            .with_context(|| format!("Unable to check attachment {}", path))?;
        Ok(exists)
    }

    #[instrument(skip(self))]
    async fn remove(&self, path: &str) -> Result<(), AttachmentStoreError> {
        let full_path = self.full_path(path)?;

        match blocking(move || fs::remove_file(full_path)).await? {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(anyhow::Error::new(e)
                .context(format!("Unable to remove attachment {}", path))
                .into()),
            _ => Ok(()),
        }
    }
}
