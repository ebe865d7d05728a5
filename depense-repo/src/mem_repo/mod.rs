use crate::attachment_store::AttachmentStore;
use crate::depense_repo::DepenseRepo;
use std::sync::Arc;

mod attachment_store;
mod depense_repo;

pub fn create_repos() -> (Arc<dyn DepenseRepo>, Arc<dyn AttachmentStore>) {
    let depense_repo = depense_repo::MemDepenseRepo::new();
    let attachment_store = attachment_store::MemAttachmentStore::new();

    (Arc::new(depense_repo), Arc::new(attachment_store))
}
