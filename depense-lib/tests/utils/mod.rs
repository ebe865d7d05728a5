use std::sync::Arc;

use depense_repo::attachment_store::AttachmentStore;
use depense_repo::depense_repo::DepenseRepo;
use rstest::*;
use tracing::info;
use tracing::Level;

pub const BOUNDARY: &str = "depense-test-boundary";

macro_rules! build_app {
    ($depense_repo:expr, $attachment_store:expr) => {{
        let app = App::new()
            .wrap(depense_lib::tracing::create_middleware())
            .configure(depense_lib::configure_app(
                $depense_repo,
                $attachment_store,
                depense_lib::config::MediaConfig::default(),
            ));
        tracing::info!("Built app");
        app
    }};
}

macro_rules! create_depense {
    (&$service:ident, $body:expr) => {{
        let request = TestRequest::post()
            .uri("/depenses/")
            .set_json($body)
            .to_request();
        let response = test::call_service(&$service, request).await;
        assert_eq!(
            response.status(),
            actix_web::http::StatusCode::CREATED,
            "Got {} response when creating depense",
            response.status()
        );
        let depense: depense_lib::depense::DepenseResponse = test::read_body_json(response).await;
        depense
    }};
}

/// A multipart/form-data part: `(name, Some(file_name), content)` for files,
/// `(name, None, content)` for plain fields.
pub type Part<'a> = (&'a str, Option<&'a str>, &'a str);

#[allow(dead_code)]
pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}

#[allow(dead_code)]
pub fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, file_name, content) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match file_name {
            Some(file_name) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(content.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Relative store path from an attachment URL built with the default media prefix.
#[allow(dead_code)]
pub fn stored_path(url: &str) -> String {
    let (_, path) = url.split_once("/media/").unwrap();
    path.to_owned()
}

#[fixture]
#[once]
pub fn tracing_setup() -> () {
    tracing_subscriber::fmt()
        .pretty()
        .with_max_level(Level::DEBUG)
        .init();
    info!("tracing initialized");
}

#[fixture]
pub fn repos() -> (Arc<dyn DepenseRepo>, Arc<dyn AttachmentStore>) {
    depense_repo::mem_repo::create_repos()
}
