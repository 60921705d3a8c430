use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use shared::ErrorResponse;

use crate::inference::model::InferenceError;
use crate::inference::preprocess::PreprocessError;

/// Every way a `/predict` request can fail. Only `client_message` reaches the caller.
#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error("Model is not available")]
    ModelUnavailable,
    #[error("No file provided")]
    NoFile,
    #[error("No file selected")]
    NoFileSelected,
    #[error("Failed to read upload: {0}")]
    Upload(String),
    #[error("Upload exceeds {limit} bytes")]
    UploadTooLarge { limit: usize },
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error("Blocking worker pool is gone")]
    Blocking,
}

impl PredictError {
    pub fn client_message(&self) -> &'static str {
        match self {
            PredictError::ModelUnavailable => "Model is not available",
            PredictError::NoFile | PredictError::Upload(_) => "No file provided",
            PredictError::NoFileSelected => "No file selected",
            PredictError::UploadTooLarge { .. }
            | PredictError::Preprocess(_)
            | PredictError::Inference(_)
            | PredictError::Blocking => "Failed to process the image",
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl ResponseError for PredictError {
    fn status_code(&self) -> StatusCode {
        match self {
            PredictError::NoFile | PredictError::NoFileSelected | PredictError::Upload(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse::new(self.client_message()))
    }
}
