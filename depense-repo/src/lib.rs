pub mod attachment_store;
pub mod depense_repo;

// implementation modules
pub mod fs_store;
pub mod mem_repo;
pub mod sqlx_repo;
