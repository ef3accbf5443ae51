//! Custom Extractors
//!
//! Axum extractors for request bodies that are not plain JSON.

use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::application::services::ImageUpload;
use crate::shared::error::AppError;
use crate::shared::validation::validation_error;

/// Largest accepted business write body, images included.
pub const MAX_BUSINESS_BODY_BYTES: usize = 10 * 1024 * 1024;

/// A business write body, sent either as JSON or as `multipart/form-data`
/// with a `data` JSON part and any number of `images` file parts.
///
/// `images` is `None` when no image was sent, so updates keep the stored set.
#[derive(Debug)]
pub struct BusinessPayload<T> {
    pub data: T,
    pub images: Option<Vec<ImageUpload>>,
}

impl<T, S> FromRequest<S> for BusinessPayload<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("multipart/form-data"));

        let payload = if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            read_multipart(multipart).await?
        } else {
            let Json(data) = Json::<T>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            Self { data, images: None }
        };

        payload.data.validate().map_err(validation_error)?;
        Ok(payload)
    }
}

async fn read_multipart<T: DeserializeOwned>(
    mut multipart: Multipart,
) -> Result<BusinessPayload<T>, AppError> {
    let mut data = None;
    let mut images = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Formulario inválido: {}", e.body_text())))?
    {
        match field.name().unwrap_or_default() {
            "data" => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| AppError::BadRequest("Campo data inválido".into()))?;
                let parsed = serde_json::from_str(&text)
                    .map_err(|e| AppError::BadRequest(format!("Campo data inválido: {}", e)))?;
                data = Some(parsed);
            }
            "images" => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::BadRequest("Imagen inválida".into()))?;
                if !bytes.is_empty() {
                    images.push(ImageUpload {
                        data: bytes.to_vec(),
                        content_type,
                    });
                }
            }
            _ => {}
        }
    }

    let data = data.ok_or_else(|| AppError::BadRequest("El campo data es requerido".into()))?;
    Ok(BusinessPayload {
        data,
        images: (!images.is_empty()).then_some(images),
    })
}
