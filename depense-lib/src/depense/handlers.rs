use crate::config::MediaConfig;
use crate::depense::payload::{PayloadValue, RawPayload};
use crate::depense::validation::{self, ATTACHMENT, CATEGORY, CUSTOM_CATEGORY};
use crate::depense::DepenseResponse;
use crate::error::HandlerError;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use depense_repo::attachment_store::{AttachmentStore, AttachmentStoreError, ATTACHMENT_DIR};
use depense_repo::depense_repo::{AttachmentChange, Category, DepenseRepo};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use tracing_actix_web::RootSpan;

const DELETE_ATTACHMENT: &str = "delete";

#[instrument(skip_all)]
pub async fn list_depenses(
    req: HttpRequest,
    depense_repo: web::Data<Arc<dyn DepenseRepo>>,
    media: web::Data<MediaConfig>,
) -> Result<impl Responder, HandlerError> {
    let media_base_url = media.base_url(&req.connection_info());
    let depenses: Vec<DepenseResponse> = depense_repo
        .get_all_depenses()
        .await?
        .into_iter()
        .map(|d| DepenseResponse::new(d, &media_base_url))
        .collect();
    Ok(HttpResponse::Ok().json(depenses))
}

#[instrument(skip_all)]
pub async fn create_depense(
    req: HttpRequest,
    body: web::Payload,
    depense_repo: web::Data<Arc<dyn DepenseRepo>>,
    attachment_store: web::Data<Arc<dyn AttachmentStore>>,
    media: web::Data<MediaConfig>,
    root_span: RootSpan,
) -> Result<impl Responder, HandlerError> {
    let mut payload = RawPayload::extract(&req, body, media.max_upload_size).await?;
    // any custom category, even an empty one, means the expense is filed under AUTRE
    if payload.contains_key(CUSTOM_CATEGORY) {
        payload.insert(
            CATEGORY,
            PayloadValue::Text(Category::Autre.as_str().to_owned()),
        );
    }

    let mut validated = validation::validate_new(&payload)?;
    let new_path = match validated.attachment.take() {
        Some(file) => Some(attachment_store.save(&file.file_name, file.content).await?),
        None => None,
    };

    let new_depense = validated.into_new_depense(new_path.clone());
    let depense = match depense_repo.create_depense(new_depense).await {
        Ok(depense) => depense,
        Err(e) => {
            if let Some(path) = new_path {
                release_attachment(&attachment_store, &path).await;
            }
            return Err(e.into());
        }
    };

    root_span.record("depense_id", depense.id);
    info!(%depense, "Created depense");
    let media_base_url = media.base_url(&req.connection_info());
    Ok(HttpResponse::Created().json(DepenseResponse::new(depense, &media_base_url)))
}

#[instrument(skip(req, depense_repo, media, root_span))]
pub async fn get_depense(
    req: HttpRequest,
    depense_repo: web::Data<Arc<dyn DepenseRepo>>,
    media: web::Data<MediaConfig>,
    depense_id: web::Path<i32>,
    root_span: RootSpan,
) -> Result<impl Responder, HandlerError> {
    let depense_id = depense_id.into_inner();
    root_span.record("depense_id", depense_id);

    let depense = depense_repo.get_depense(depense_id).await?;
    let media_base_url = media.base_url(&req.connection_info());
    Ok(HttpResponse::Ok().json(DepenseResponse::new(depense, &media_base_url)))
}

/// Serves both PUT and PATCH; only the fields present in the body change.
#[instrument(skip(req, body, depense_repo, attachment_store, media, root_span))]
pub async fn update_depense(
    req: HttpRequest,
    body: web::Payload,
    depense_repo: web::Data<Arc<dyn DepenseRepo>>,
    attachment_store: web::Data<Arc<dyn AttachmentStore>>,
    media: web::Data<MediaConfig>,
    depense_id: web::Path<i32>,
    root_span: RootSpan,
) -> Result<impl Responder, HandlerError> {
    let depense_id = depense_id.into_inner();
    root_span.record("depense_id", depense_id);

    let mut payload = RawPayload::extract(&req, body, media.max_upload_size).await?;
    let existing = depense_repo.get_depense(depense_id).await?;

    let remove_attachment = take_attachment_removal(&mut payload);
    let validated = validation::validate_update(&payload, &existing)?;
    let mut changes = validated.changes;

    let new_path = match validated.attachment {
        Some(file) => Some(attachment_store.save(&file.file_name, file.content).await?),
        None => None,
    };
    changes.attachment = match &new_path {
        Some(path) => AttachmentChange::Replace(path.clone()),
        None if remove_attachment => AttachmentChange::Remove,
        None => AttachmentChange::Keep,
    };

    let updated = match depense_repo.update_depense(depense_id, changes).await {
        Ok(updated) => updated,
        Err(e) => {
            if let Some(path) = new_path {
                release_attachment(&attachment_store, &path).await;
            }
            return Err(e.into());
        }
    };

    if let Some(path) = updated.released_attachment {
        release_attachment(&attachment_store, &path).await;
    }
    info!(depense = %updated.depense, "Updated depense");
    let media_base_url = media.base_url(&req.connection_info());
    Ok(HttpResponse::Ok().json(DepenseResponse::new(
        updated.depense,
        &media_base_url,
    )))
}

#[instrument(skip(depense_repo, attachment_store, root_span))]
pub async fn delete_depense(
    depense_repo: web::Data<Arc<dyn DepenseRepo>>,
    attachment_store: web::Data<Arc<dyn AttachmentStore>>,
    depense_id: web::Path<i32>,
    root_span: RootSpan,
) -> Result<impl Responder, HandlerError> {
    let depense_id = depense_id.into_inner();
    root_span.record("depense_id", depense_id);

    let depense = depense_repo.delete_depense(depense_id).await?;
    if let Some(path) = &depense.attachment {
        release_attachment(&attachment_store, path).await;
    }
    info!(%depense, "Deleted depense");
    Ok(HttpResponse::NoContent().finish())
}

#[get("/pieces_justificatives/{file_name}")]
pub async fn get_attachment(
    attachment_store: web::Data<Arc<dyn AttachmentStore>>,
    file_name: web::Path<String>,
) -> Result<impl Responder, HandlerError> {
    let path = format!("{}/{}", ATTACHMENT_DIR, file_name.into_inner());
    let content = match attachment_store.read(&path).await {
        Ok(content) => content,
        Err(AttachmentStoreError::AttachmentNotFound(_) | AttachmentStoreError::InvalidPath(_)) => {
            return Err(HandlerError::NotFound)
        }
        Err(e) => return Err(e.into()),
    };
    Ok(HttpResponse::Ok()
        .content_type("application/octet-stream")
        .body(content))
}

/// Takes the deletion sentinel (or a JSON null) out of the payload so it is
/// never validated as a file.
fn take_attachment_removal(payload: &mut RawPayload) -> bool {
    let remove = match payload.get(ATTACHMENT) {
        Some(PayloadValue::Null) => true,
        Some(PayloadValue::Text(value)) => value == DELETE_ATTACHMENT,
        _ => false,
    };
    if remove {
        payload.remove(ATTACHMENT);
    }
    remove
}

/// The record no longer points at `path`, so a failure here only leaves an
/// orphaned blob behind.
async fn release_attachment(attachment_store: &Arc<dyn AttachmentStore>, path: &str) {
    if let Err(e) = attachment_store.remove(path).await {
        warn!(path, error = %e, "Unable to remove attachment");
    }
}
