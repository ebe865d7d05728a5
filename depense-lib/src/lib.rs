#[macro_use]
extern crate actix_web;

use actix_web::web::{self, ServiceConfig};
use depense_repo::attachment_store::AttachmentStore;
use depense_repo::depense_repo::DepenseRepo;
use std::sync::Arc;

use crate::config::MediaConfig;

pub mod config;
pub mod depense;
pub mod error;
pub mod tracing;

/// Registers the shared state and every service of the API.
pub fn configure_app(
    depense_repo: Arc<dyn DepenseRepo>,
    attachment_store: Arc<dyn AttachmentStore>,
    media: MediaConfig,
) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        let media_service = depense::media_service(&media);
        cfg.app_data(web::Data::new(depense_repo))
            .app_data(web::Data::new(attachment_store))
            .app_data(web::Data::new(media))
            .service(depense::depense_service())
            .service(media_service);
    }
}
