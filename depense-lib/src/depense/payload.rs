use actix_multipart::{Field, Multipart, MultipartError};
use actix_web::{web, HttpMessage, HttpRequest};
use futures_util::{StreamExt, TryStreamExt};
use std::collections::HashMap;

use crate::error::HandlerError;

const JSON_ERROR: &str = "Unable to parse JSON payload";
const FORM_ERROR: &str = "Unable to parse form payload";
const MULTIPART_ERROR: &str = "Unable to parse multipart payload";

#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub file_name: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PayloadValue {
    Null,
    Text(String),
    File(UploadedFile),
}

/// Untrusted request fields, whatever encoding the client used.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPayload {
    fields: HashMap<String, PayloadValue>,
}

impl RawPayload {
    pub fn new() -> RawPayload {
        RawPayload::default()
    }

    pub fn with_text(mut self, key: &str, value: &str) -> RawPayload {
        self.insert(key, PayloadValue::Text(value.to_owned()));
        self
    }

    pub fn insert(&mut self, key: &str, value: PayloadValue) {
        self.fields.insert(key.to_owned(), value);
    }

    pub fn get(&self, key: &str) -> Option<&PayloadValue> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<PayloadValue> {
        self.fields.remove(key)
    }

    /// Reads the request body as multipart, urlencoded form or JSON depending on
    /// its content type. JSON is assumed when no content type is given.
    pub async fn extract(
        req: &HttpRequest,
        body: web::Payload,
        max_size: usize,
    ) -> Result<RawPayload, HandlerError> {
        let content_type = req.content_type().to_owned();
        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::new(req.headers(), body);
            return RawPayload::from_multipart(multipart, max_size).await;
        }

        let bytes = read_body(body, max_size).await?;
        if content_type.starts_with("application/x-www-form-urlencoded") {
            RawPayload::from_form(&bytes)
        } else {
            RawPayload::from_json(&bytes)
        }
    }

    pub fn from_json(bytes: &[u8]) -> Result<RawPayload, HandlerError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(RawPayload::new());
        }
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| malformed(JSON_ERROR, e))?;
        let serde_json::Value::Object(object) = value else {
            return Err(malformed(JSON_ERROR, "expected a JSON object"));
        };

        let fields = object
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::Null => PayloadValue::Null,
                    serde_json::Value::String(s) => PayloadValue::Text(s),
                    other => PayloadValue::Text(other.to_string()),
                };
                (key, value)
            })
            .collect();
        Ok(RawPayload { fields })
    }

    pub fn from_form(bytes: &[u8]) -> Result<RawPayload, HandlerError> {
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_bytes(bytes).map_err(|e| malformed(FORM_ERROR, e))?;
        let fields = pairs
            .into_iter()
            .map(|(key, value)| (key, PayloadValue::Text(value)))
            .collect();
        Ok(RawPayload { fields })
    }

    pub async fn from_multipart(
        mut multipart: Multipart,
        max_size: usize,
    ) -> Result<RawPayload, HandlerError> {
        let mut payload = RawPayload::new();
        let mut total_size = 0;

        while let Some(mut field) = multipart.try_next().await.map_err(malformed_multipart)? {
            let disposition = field.content_disposition();
            let Some(name) = disposition.get_name().map(str::to_owned) else {
                return Err(malformed(MULTIPART_ERROR, "field without a name"));
            };
            let file_name = disposition.get_filename().map(str::to_owned);

            let content = read_field(&mut field, max_size, &mut total_size).await?;
            let value = match file_name {
                // browsers send an empty file part when no file was picked
                Some(file_name) if file_name.is_empty() && content.is_empty() => {
                    PayloadValue::Text(String::new())
                }
                Some(file_name) => PayloadValue::File(UploadedFile { file_name, content }),
                None => PayloadValue::Text(
                    String::from_utf8(content).map_err(|e| malformed(MULTIPART_ERROR, e))?,
                ),
            };
            payload.insert(&name, value);
        }

        Ok(payload)
    }
}

async fn read_body(mut body: web::Payload, max_size: usize) -> Result<Vec<u8>, HandlerError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| malformed("Unable to read payload", e))?;
        if bytes.len() + chunk.len() > max_size {
            return Err(HandlerError::PayloadTooLarge(max_size));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

async fn read_field(
    field: &mut Field,
    max_size: usize,
    total_size: &mut usize,
) -> Result<Vec<u8>, HandlerError> {
    let mut content = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(malformed_multipart)? {
        *total_size += chunk.len();
        if *total_size > max_size {
            return Err(HandlerError::PayloadTooLarge(max_size));
        }
        content.extend_from_slice(&chunk);
    }
    Ok(content)
}

fn malformed(error: &'static str, detail: impl ToString) -> HandlerError {
    HandlerError::MalformedPayload {
        error,
        detail: detail.to_string(),
    }
}

fn malformed_multipart(e: MultipartError) -> HandlerError {
    malformed(MULTIPART_ERROR, e)
}
