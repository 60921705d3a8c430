use actix_cors::Cors;
use actix_multipart::Multipart;
use actix_web::{HttpResponse, http::header, web};
use futures::{StreamExt, TryStreamExt};
use log::{error, info, warn};
use shared::PredictionResponse;

use crate::config::HttpConfig;
use crate::error::PredictError;
use crate::inference::model::{ModelHolder, Prediction, classify};
use crate::inference::preprocess::preprocess;

const FILE_FIELD: &str = "file";

struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/predict").route(web::post().to(handle_predict)));
}

pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CONTENT_TYPE,
        ])
        .max_age(3600)
}

async fn handle_predict(
    model: web::Data<ModelHolder>,
    http: web::Data<HttpConfig>,
    payload: Multipart,
) -> Result<HttpResponse, PredictError> {
    predict(&model, http.max_upload_bytes, payload)
        .await
        .inspect_err(|e| {
            if e.is_client_error() {
                warn!("Rejected prediction request: {}", e);
            } else {
                error!("An error occurred: {}", e);
            }
        })
}

async fn predict(
    model: &ModelHolder,
    max_upload_bytes: usize,
    payload: Multipart,
) -> Result<HttpResponse, PredictError> {
    let classifier = model.classifier().ok_or(PredictError::ModelUnavailable)?;
    let upload = read_upload(payload, max_upload_bytes).await?;
    info!(
        "Received {} ({} bytes) for prediction",
        upload.filename,
        upload.bytes.len()
    );

    let prediction: Prediction = web::block(move || -> Result<Prediction, PredictError> {
        let tensor = preprocess(&upload.bytes)?;
        Ok(classify(classifier.as_ref(), &tensor)?)
    })
    .await
    .map_err(|_| PredictError::Blocking)??;

    info!(
        "Predicted {} with confidence {:.4}",
        prediction.class, prediction.confidence
    );

    Ok(HttpResponse::Ok().json(PredictionResponse {
        prediction: prediction.class.label().to_string(),
        confidence: prediction.confidence,
    }))
}

/// Finds the first `file` part that carries a filename and buffers its body.
/// A `file` part without a filename is an ordinary form value and is skipped.
async fn read_upload(mut payload: Multipart, limit: usize) -> Result<Upload, PredictError> {
    while let Ok(Some(mut field)) = payload.try_next().await {
        let filename = match field.content_disposition() {
            Some(disposition) if disposition.get_name() == Some(FILE_FIELD) => {
                disposition.get_filename().map(str::to_owned)
            }
            _ => None,
        };
        let Some(filename) = filename else {
            continue;
        };
        if filename.is_empty() {
            return Err(PredictError::NoFileSelected);
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk.map_err(|e| PredictError::Upload(e.to_string()))?;
            if bytes.len() + data.len() > limit {
                return Err(PredictError::UploadTooLarge { limit });
            }
            bytes.extend_from_slice(&data);
        }
        return Ok(Upload { filename, bytes });
    }

    Err(PredictError::NoFile)
}
