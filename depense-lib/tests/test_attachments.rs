use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::test;
use actix_web::test::{read_body_json, TestRequest};
use actix_web::App;
use depense_lib::config::MediaConfig;
use depense_lib::depense::DepenseResponse;
use depense_repo::attachment_store::AttachmentStore;
use depense_repo::depense_repo::DepenseRepo;
use rstest::rstest;
use serde_json::{json, Value};
use tracing::instrument;

use utils::repos;
use utils::tracing_setup;

#[macro_use]
mod utils;

macro_rules! upload {
    ($method:ident, &$service:ident, $uri:expr, $parts:expr) => {{
        let request = TestRequest::$method()
            .uri($uri)
            .insert_header(("content-type", utils::multipart_content_type()))
            .set_payload(utils::multipart_body($parts))
            .to_request();
        test::call_service(&$service, request).await
    }};
}

const RECEIPT: &str = "reçu de caisse";

#[instrument(skip(repos))]
#[rstest]
#[actix_rt::test]
async fn test_replace_attachment(
    _tracing_setup: &(),
    repos: (Arc<dyn DepenseRepo>, Arc<dyn AttachmentStore>),
) {
    let (depense_repo, attachment_store) = repos;
    let app = build_app!(depense_repo, attachment_store.clone());
    let service = test::init_service(app).await;

    let response = upload!(
        post,
        &service,
        "/depenses/",
        &[
            ("title", None, "Marché"),
            ("amount", None, "4500"),
            ("category", None, "APPROVISIONNEMENT"),
            ("payment_method", None, "CASH"),
            ("piece_justificative", Some("recu.jpg"), RECEIPT),
        ]
    );
    assert_eq!(response.status(), StatusCode::CREATED);
    let depense: DepenseResponse = read_body_json(response).await;
    let old_path = utils::stored_path(depense.piece_justificative.as_ref().unwrap());

    let uri = format!("/depenses/{}/", depense.id);
    let response = upload!(
        patch,
        &service,
        &uri,
        &[("piece_justificative", Some("nouveau.png"), "autre reçu")]
    );
    assert_eq!(response.status(), StatusCode::OK);
    let updated: DepenseResponse = read_body_json(response).await;
    let new_path = utils::stored_path(updated.piece_justificative.as_ref().unwrap());

    assert_ne!(old_path, new_path);
    assert!(new_path.ends_with("-nouveau.png"));
    assert!(!attachment_store.exists(&old_path).await.unwrap());
    assert_eq!(
        attachment_store.read(&new_path).await.unwrap(),
        "autre reçu".as_bytes().to_vec()
    );
    assert_eq!(updated.title, depense.title);
}

#[instrument(skip(repos))]
#[rstest]
#[actix_rt::test]
async fn test_delete_attachment(
    _tracing_setup: &(),
    repos: (Arc<dyn DepenseRepo>, Arc<dyn AttachmentStore>),
) {
    let (depense_repo, attachment_store) = repos;
    let app = build_app!(depense_repo, attachment_store.clone());
    let service = test::init_service(app).await;

    let response = upload!(
        post,
        &service,
        "/depenses/",
        &[
            ("title", None, "Taxi"),
            ("amount", None, "2000"),
            ("category", None, "TRANSPORT"),
            ("payment_method", None, "WAVE"),
            ("piece_justificative", Some("ticket.pdf"), RECEIPT),
        ]
    );
    assert_eq!(response.status(), StatusCode::CREATED);
    let depense: DepenseResponse = read_body_json(response).await;
    let path = utils::stored_path(depense.piece_justificative.as_ref().unwrap());
    assert!(attachment_store.exists(&path).await.unwrap());

    let uri = format!("/depenses/{}/", depense.id);
    for _ in 0..2 {
        let response = upload!(
            patch,
            &service,
            &uri,
            &[("piece_justificative", None, "delete")]
        );
        assert_eq!(response.status(), StatusCode::OK);
        let updated: DepenseResponse = read_body_json(response).await;
        assert_eq!(updated.piece_justificative, None);
        assert!(!attachment_store.exists(&path).await.unwrap());
    }
}

#[instrument(skip(repos))]
#[rstest]
#[actix_rt::test]
async fn test_delete_attachment_with_json(
    _tracing_setup: &(),
    repos: (Arc<dyn DepenseRepo>, Arc<dyn AttachmentStore>),
) {
    let (depense_repo, attachment_store) = repos;
    let app = build_app!(depense_repo, attachment_store.clone());
    let service = test::init_service(app).await;

    let response = upload!(
        post,
        &service,
        "/depenses/",
        &[
            ("title", None, "Facture eau"),
            ("amount", None, "6200"),
            ("category", None, "EAU"),
            ("payment_method", None, "FREE_MONEY"),
            ("piece_justificative", Some("sde.pdf"), RECEIPT),
        ]
    );
    let depense: DepenseResponse = read_body_json(response).await;
    let path = utils::stored_path(depense.piece_justificative.as_ref().unwrap());

    let request = TestRequest::patch()
        .uri(format!("/depenses/{}/", depense.id).as_str())
        .set_json(json!({ "piece_justificative": "delete", "title": "Facture SDE" }))
        .to_request();
    let response = test::call_service(&service, request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let updated: DepenseResponse = read_body_json(response).await;
    assert_eq!(updated.piece_justificative, None);
    assert_eq!(updated.title, "Facture SDE");
    assert!(!attachment_store.exists(&path).await.unwrap());
}

#[instrument(skip(repos))]
#[rstest]
#[actix_rt::test]
async fn test_empty_attachment_keeps_existing(
    _tracing_setup: &(),
    repos: (Arc<dyn DepenseRepo>, Arc<dyn AttachmentStore>),
) {
    let (depense_repo, attachment_store) = repos;
    let app = build_app!(depense_repo, attachment_store.clone());
    let service = test::init_service(app).await;

    let response = upload!(
        post,
        &service,
        "/depenses/",
        &[
            ("title", None, "Salaire gardien"),
            ("amount", None, "60000"),
            ("category", None, "SALAIRE"),
            ("payment_method", None, "CASH"),
            ("piece_justificative", Some("bulletin.pdf"), RECEIPT),
        ]
    );
    let depense: DepenseResponse = read_body_json(response).await;

    let uri = format!("/depenses/{}/", depense.id);
    let response = upload!(
        patch,
        &service,
        &uri,
        &[
            ("amount", None, "65000"),
            ("piece_justificative", Some(""), ""),
        ]
    );
    assert_eq!(response.status(), StatusCode::OK);

    let updated: DepenseResponse = read_body_json(response).await;
    assert_eq!(updated.piece_justificative, depense.piece_justificative);
    let path = utils::stored_path(updated.piece_justificative.as_ref().unwrap());
    assert!(attachment_store.exists(&path).await.unwrap());
}

#[instrument(skip(repos))]
#[rstest]
#[actix_rt::test]
async fn test_attachment_must_be_a_file(
    _tracing_setup: &(),
    repos: (Arc<dyn DepenseRepo>, Arc<dyn AttachmentStore>),
) {
    let (depense_repo, attachment_store) = repos;
    let app = build_app!(depense_repo.clone(), attachment_store);
    let service = test::init_service(app).await;

    let request = TestRequest::post()
        .uri("/depenses/")
        .set_json(json!({
            "title": "Eau",
            "amount": "100",
            "category": "EAU",
            "payment_method": "CASH",
            "piece_justificative": "facture.pdf",
        }))
        .to_request();
    let response = test::call_service(&service, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let errors: Value = read_body_json(response).await;
    assert_eq!(
        errors,
        json!({
            "piece_justificative": [
                "The submitted data was not a file. Check the encoding type on the form."
            ]
        })
    );
    assert!(depense_repo.get_all_depenses().await.unwrap().is_empty());
}

#[instrument(skip(repos))]
#[rstest]
#[actix_rt::test]
async fn test_invalid_upload_stores_nothing(
    _tracing_setup: &(),
    repos: (Arc<dyn DepenseRepo>, Arc<dyn AttachmentStore>),
) {
    let (depense_repo, attachment_store) = repos;
    let app = build_app!(depense_repo.clone(), attachment_store);
    let service = test::init_service(app).await;

    let response = upload!(
        post,
        &service,
        "/depenses/",
        &[
            ("title", None, "Eau"),
            ("amount", None, "-1"),
            ("category", None, "EAU"),
            ("payment_method", None, "CASH"),
            ("piece_justificative", Some("facture.pdf"), RECEIPT),
        ]
    );
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let errors: Value = read_body_json(response).await;
    assert_eq!(errors, json!({ "amount": ["amount must be greater than 0"] }));
    assert!(depense_repo.get_all_depenses().await.unwrap().is_empty());
}

#[instrument(skip(repos))]
#[rstest]
#[case::relative("/fichiers/", "http://localhost:8080/fichiers/", "/fichiers/")]
#[case::nested("/static/uploads", "http://localhost:8080/static/uploads/", "/static/uploads/")]
#[case::absolute("https://cdn.example.sn/recus/", "https://cdn.example.sn/recus/", "/recus/")]
#[actix_rt::test]
async fn test_custom_media_url(
    _tracing_setup: &(),
    repos: (Arc<dyn DepenseRepo>, Arc<dyn AttachmentStore>),
    #[case] media_url: &str,
    #[case] url_prefix: &str,
    #[case] served_under: &str,
) {
    let (depense_repo, attachment_store) = repos;
    let app = App::new()
        .wrap(depense_lib::tracing::create_middleware())
        .configure(depense_lib::configure_app(
            depense_repo,
            attachment_store.clone(),
            MediaConfig {
                media_url: media_url.to_owned(),
                ..MediaConfig::default()
            },
        ));
    let service = test::init_service(app).await;

    let request = TestRequest::post()
        .uri("/depenses/")
        .insert_header(("host", "localhost:8080"))
        .insert_header(("content-type", utils::multipart_content_type()))
        .set_payload(utils::multipart_body(&[
            ("title", None, "Pharmacie"),
            ("amount", None, "7500"),
            ("category", None, "AUTRE"),
            ("custom_category", None, "Santé"),
            ("payment_method", None, "WAVE"),
            ("piece_justificative", Some("ordonnance.pdf"), RECEIPT),
        ]))
        .to_request();
    let response = test::call_service(&service, request).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let depense: DepenseResponse = read_body_json(response).await;

    let url = depense.piece_justificative.unwrap();
    assert!(url.starts_with(url_prefix), "{}", url);
    let path = url.strip_prefix(url_prefix).unwrap();
    assert_eq!(attachment_store.read(path).await.unwrap(), RECEIPT.as_bytes());

    let request = TestRequest::get()
        .uri(format!("{}{}", served_under, path).as_str())
        .to_request();
    let response = test::call_service(&service, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(test::read_body(response).await.as_ref(), RECEIPT.as_bytes());

    // the default prefix is not served any more
    let request = TestRequest::get()
        .uri(format!("/media/{}", path).as_str())
        .to_request();
    let response = test::call_service(&service, request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
