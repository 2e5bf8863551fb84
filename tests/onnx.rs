//! Integration tests against the pretrained SST-2 model.
//! Run with: cargo test --features integration
//! Downloads from the Hugging Face Hub unless MODEL_DIR points at a local copy.

#![cfg(feature = "integration")]

use actix_web::{test, web, App};
use serde_json::{json, Value};

use sentiment_service::{build_classifier, routes, ClassifierKind, Config};

fn onnx_config() -> anyhow::Result<Config> {
    let mut config = Config::from_env()?;
    config.classifier = ClassifierKind::Onnx;
    Ok(config)
}

#[::core::prelude::v1::test]
fn sentiment_basic() -> anyhow::Result<()> {
    let classifier = build_classifier(&onnx_config()?)?;

    let res = classifier.classify("I love coding!")?;
    assert_eq!(res.label, "POSITIVE");
    assert!(res.score >= 0.0 && res.score <= 1.0);

    let res = classifier.classify("This was a terrible, boring movie.")?;
    assert_eq!(res.label, "NEGATIVE");
    Ok(())
}

#[::core::prelude::v1::test]
fn sentiment_is_deterministic() -> anyhow::Result<()> {
    let classifier = build_classifier(&onnx_config()?)?;

    let first = classifier.classify("The food was fine, I guess.")?;
    let second = classifier.classify("The food was fine, I guess.")?;
    assert_eq!(first, second);
    Ok(())
}

#[actix_web::test]
async fn predict_endpoint_with_model() -> anyhow::Result<()> {
    let classifier = build_classifier(&onnx_config()?)?;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(classifier))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/predict")
        .set_json(json!({ "text": "I love coding!" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["input"], "I love coding!");
    assert!(["POSITIVE", "NEGATIVE"].contains(&body["label"].as_str().unwrap_or_default()));
    let score = body["score"].as_f64().unwrap_or(-1.0);
    assert!((0.0..=1.0).contains(&score));
    Ok(())
}
