use crate::attachment_store::AttachmentStoreError::AttachmentNotFound;
use crate::attachment_store::{
    check_path, new_attachment_path, AttachmentStore, AttachmentStoreError,
};
use anyhow::anyhow;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub struct MemAttachmentStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemAttachmentStore {
    pub fn new() -> MemAttachmentStore {
        MemAttachmentStore {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    fn read_lock(&self) -> Result<RwLockReadGuard<HashMap<String, Vec<u8>>>, anyhow::Error> {
        self.blobs
            .read()
            .map_err(|_| anyhow!("Unable to acquire lock"))
    }

    fn write_lock(&self) -> Result<RwLockWriteGuard<HashMap<String, Vec<u8>>>, anyhow::Error> {
        self.blobs
            .write()
            .map_err(|_| anyhow!("Unable to acquire lock"))
    }
}

#[async_trait]
impl AttachmentStore for MemAttachmentStore {
    async fn save(
        &self,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<String, AttachmentStoreError> {
        let path = new_attachment_path(file_name);
        self.write_lock()?.insert(path.clone(), content);
        Ok(path)
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, AttachmentStoreError> {
        check_path(path)?;
        self.read_lock()?
            .get(path)
            .cloned()
            .ok_or_else(|| AttachmentNotFound(path.to_owned()))
    }

    async fn exists(&self, path: &str) -> Result<bool, AttachmentStoreError> {
        check_path(path)?;
        Ok(self.read_lock()?.contains_key(path))
    }

    async fn remove(&self, path: &str) -> Result<(), AttachmentStoreError> {
        check_path(path)?;
        self.write_lock()?.remove(path);
        Ok(())
    }
}
