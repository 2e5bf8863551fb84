use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{web, HttpResponse, Responder};
use log::{error, info, warn};

use crate::inference::SharedClassifier;
use crate::models::{ErrorResponse, HealthResponse, PredictRequest, PredictResponse};

pub async fn health_check() -> impl Responder {
    info!("Health check endpoint called");
    HttpResponse::Ok().json(HealthResponse::ok())
}

pub async fn model_info(classifier: web::Data<SharedClassifier>) -> impl Responder {
    HttpResponse::Ok().json(classifier.info())
}

/// Classifies the request text. Every classifier failure, including a panic
/// on the blocking thread, is reported as `{"error": "Prediction failed"}`
/// with status 200.
pub async fn predict(
    classifier: web::Data<SharedClassifier>,
    req: web::Json<PredictRequest>,
) -> impl Responder {
    info!("Predict endpoint called");

    let classifier = classifier.get_ref().clone();
    let PredictRequest { text } = req.into_inner();

    let response = match web::block(move || {
        let result = classifier.classify(&text);
        (text, result)
    })
    .await
    {
        Ok((text, Ok(prediction))) => {
            info!(
                "Predicted sentiment: {} with score {}",
                prediction.label, prediction.score
            );
            PredictResponse::success(text, prediction)
        }
        Ok((_, Err(e))) => {
            error!("Error during prediction: {}", e);
            PredictResponse::failure()
        }
        Err(e) => {
            error!("Error during prediction: blocking task failed: {}", e);
            PredictResponse::failure()
        }
    };

    HttpResponse::Ok().json(response)
}

pub async fn not_found() -> impl Responder {
    HttpResponse::NotFound().json(ErrorResponse::new("Not found"))
}

/// JSON extractor settings: body size limit, a JSON-shaped 413 for bodies
/// over the limit and a JSON-shaped 422 for bodies that do not deserialize
/// into the handler's type.
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(|err, _req| {
            let message = err.to_string();
            warn!("Rejected request body: {}", message);
            let mut response = if matches!(
                err,
                JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. }
            ) {
                HttpResponse::PayloadTooLarge()
            } else {
                HttpResponse::UnprocessableEntity()
            };
            let response = response.json(ErrorResponse::new(message));
            InternalError::from_response(err, response).into()
        })
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/model-info", web::get().to(model_info))
        .route("/predict", web::post().to(predict));
}
