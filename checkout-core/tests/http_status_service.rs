//! Integration tests for the HTTP status service and the polling repository
//! running against a mock backend.
//!
//! ```bash
//! cargo test -p checkout-core --features http-client --test http_status_service
//! ```

#![cfg(feature = "http-client")]

use std::sync::Arc;
use std::time::Duration;

use checkout_core::config::{CheckoutConfiguration, Environment};
use checkout_core::status::{DefaultStatusRepository, HttpStatusService, StatusRepository};
use checkout_core::{CheckoutError, StatusService};
use futures::StreamExt;
use serde_json::json;
use wiremock::{
    matchers::{body_json, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const STATUS_PATH: &str = "/checkoutshopper/services/PaymentInitiation/v1/status";

fn config_for(server: &MockServer) -> CheckoutConfiguration {
    CheckoutConfiguration::new(
        Environment::Custom(format!("{}/checkoutshopper/", server.uri())),
        "test_CLIENTKEY",
    )
}

#[tokio::test]
async fn test_check_status_posts_payment_data() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STATUS_PATH))
        .and(query_param("token", "test_CLIENTKEY"))
        .and(body_json(json!({"paymentData": "Ab02b4c0"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "complete",
            "resultCode": "authorised",
            "payload": "Ab02b4c0!BQABAgA"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = HttpStatusService::new(&config_for(&server)).unwrap();
    let response = service.check_status("Ab02b4c0").await.unwrap();

    assert_eq!(response.result_code, "authorised");
    assert!(response.is_final());
}

#[tokio::test]
async fn test_http_error_maps_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "status": 401,
            "errorCode": "000",
            "message": "HTTP Status Response - Unauthorized",
            "errorType": "security"
        })))
        .mount(&server)
        .await;

    let service = HttpStatusService::new(&config_for(&server)).unwrap();
    let err = service.check_status("pd").await.unwrap_err();

    match err {
        CheckoutError::Http {
            code, error_body, ..
        } => {
            assert_eq!(code, 401);
            assert_eq!(
                error_body.and_then(|b| b.error_type).as_deref(),
                Some("security")
            );
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_serialization_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let service = HttpStatusService::new(&config_for(&server)).unwrap();
    let err = service.check_status("pd").await.unwrap_err();
    assert!(matches!(err, CheckoutError::Serialization(_)));
}

#[tokio::test]
async fn test_repository_polls_until_terminal() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resultCode": "pending"})))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(STATUS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"resultCode": "finished", "payload": "X"})),
        )
        .mount(&server)
        .await;

    let service = Arc::new(HttpStatusService::new(&config_for(&server)).unwrap());
    let repository = DefaultStatusRepository::with_interval(service, Duration::from_millis(20));

    let results: Vec<_> = repository
        .poll("pd", Duration::from_secs(10))
        .collect()
        .await;

    let codes: Vec<_> = results
        .into_iter()
        .map(|r| r.unwrap().result_code)
        .collect();
    assert_eq!(codes, vec!["pending", "pending", "finished"]);
}
