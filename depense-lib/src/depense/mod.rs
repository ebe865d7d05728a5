use actix_web::{web, Scope};
use chrono::{DateTime, Utc};
use depense_repo::depense_repo::{Category, Depense, PaymentMethod};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::MediaConfig;

mod handlers;
pub mod payload;
pub mod validation;

/// JSON representation of a depense. The attachment is exposed as an absolute
/// URL under the media prefix.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct DepenseResponse {
    pub id: i32,
    pub title: String,
    pub amount: Decimal,
    pub category: Category,
    pub custom_category: Option<String>,
    pub payment_method: PaymentMethod,
    pub piece_justificative: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DepenseResponse {
    pub fn new(depense: Depense, media_base_url: &str) -> DepenseResponse {
        DepenseResponse {
            id: depense.id,
            title: depense.title,
            amount: depense.amount,
            category: depense.category,
            custom_category: depense.custom_category,
            payment_method: depense.payment_method,
            piece_justificative: depense
                .attachment
                .map(|path| format!("{}/{}", media_base_url, path)),
            timestamp: depense.created_at,
            updated_at: depense.updated_at,
        }
    }
}

pub fn depense_service() -> Scope {
    web::scope("/depenses")
        .service(
            web::resource(["", "/"])
                .route(web::get().to(handlers::list_depenses))
                .route(web::post().to(handlers::create_depense)),
        )
        .service(
            web::resource(["/{depense_id}", "/{depense_id}/"])
                .route(web::get().to(handlers::get_depense))
                .route(web::put().to(handlers::update_depense))
                .route(web::patch().to(handlers::update_depense))
                .route(web::delete().to(handlers::delete_depense)),
        )
}

/// Serves stored attachments so `piece_justificative` URLs resolve. Mounted
/// at the path of the configured `media_url`.
pub fn media_service(media: &MediaConfig) -> Scope {
    web::scope(&media.scope_path()).service(handlers::get_attachment)
}
