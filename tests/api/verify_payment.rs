use crate::helpers::{
    DATA_API_KEY, PROCESSOR_SECRET_KEY, billing_row_updated, checkout_session,
    no_billing_row_matched, spawn_app, spawn_app_with,
};
use axum::http::StatusCode;
use payment_relay::confirmation::{ConfirmationError, confirm_payment};
use payment_relay::routes::{ErrorBody, VerifyPaymentResponse};
use std::time::Duration;
use wiremock::matchers::{any, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

async fn error_body(response: reqwest::Response) -> ErrorBody {
    response.json().await.expect("Error body is JSON")
}

#[tokio::test]
async fn verify_payment_returns_400_when_session_id_is_missing() {
    // Arrange
    let test_app = spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.processor_server)
        .await;

    let test_cases = vec![(None, "no session_id"), (Some(""), "an empty session_id")];

    for (session_id, description) in test_cases {
        // Act
        let response = test_app.verify_payment(session_id).await;

        // Assert
        assert_eq!(
            StatusCode::BAD_REQUEST,
            response.status(),
            "The API did not return a 400 Bad Request when the request had {description}."
        );
        let body = error_body(response).await;
        assert!(!body.success);
        assert_eq!(body.message, "Missing session_id");
    }
    // Mock asserts on drop that the processor was never called
}

#[tokio::test]
async fn verify_payment_returns_400_when_payment_is_not_completed() {
    let test_app = spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.data_api_server)
        .await;

    for status in ["unpaid", "no_payment_required"] {
        test_app.processor_server.reset().await;
        test_app
            .mount_session("cs_test_123", checkout_session(status, None, Some("bill_42")))
            .await;

        let response = test_app.verify_payment(Some("cs_test_123")).await;

        assert_eq!(
            StatusCode::BAD_REQUEST,
            response.status(),
            "The API did not reject a session with payment status {status}."
        );
        assert_eq!(error_body(response).await.message, "Payment not completed");
    }
}

#[tokio::test]
async fn verify_payment_returns_400_when_billing_id_is_missing_from_metadata() {
    let test_app = spawn_app().await;
    test_app
        .mount_session("cs_test_123", checkout_session("paid", Some("pi_abc"), None))
        .await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.data_api_server)
        .await;

    let response = test_app.verify_payment(Some("cs_test_123")).await;

    assert_eq!(StatusCode::BAD_REQUEST, response.status());
    assert_eq!(
        error_body(response).await.message,
        "Missing billingId in session metadata"
    );
}

#[tokio::test]
async fn verify_payment_returns_200_and_marks_the_billing_record_as_paid() {
    // Arrange
    let test_app = spawn_app().await;

    Mock::given(method("GET"))
        .and(path("/v1/checkout/sessions/cs_test_123"))
        .and(header(
            "Authorization",
            format!("Bearer {PROCESSOR_SECRET_KEY}").as_str(),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(checkout_session(
            "paid",
            Some("pi_abc"),
            Some("bill_42"),
        )))
        .expect(1)
        .mount(&test_app.processor_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/billing"))
        .and(query_param("id", "eq.bill_42"))
        .and(header("apikey", DATA_API_KEY))
        .and(body_partial_json(serde_json::json!({
            "status": "paid",
            "payment_id": "pi_abc"
        })))
        .respond_with(billing_row_updated("bill_42"))
        .expect(1)
        .mount(&test_app.data_api_server)
        .await;

    // Act
    let response = test_app.verify_payment(Some("cs_test_123")).await;

    // Assert
    assert_eq!(StatusCode::OK, response.status());
    let body: VerifyPaymentResponse = response.json().await.expect("Success body is JSON");
    assert!(body.success);
    assert_eq!(body.id, "pi_abc");
    assert_eq!(body.amount, 5000);
    assert_eq!(body.status, "paid");
    assert_eq!(body.billing_id, "bill_42");

    let updates = test_app.billing_updates().await;
    assert_eq!(updates.len(), 1);
    assert!(updates[0]["paid_date"].is_string());
}

#[tokio::test]
async fn verify_payment_uses_the_documented_response_keys() {
    let test_app = spawn_app().await;
    test_app
        .mount_session(
            "cs_test_123",
            checkout_session("paid", Some("pi_abc"), Some("bill_42")),
        )
        .await;
    Mock::given(method("PATCH"))
        .respond_with(billing_row_updated("bill_42"))
        .mount(&test_app.data_api_server)
        .await;

    let response = test_app.verify_payment(Some("cs_test_123")).await;

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "success": true,
            "id": "pi_abc",
            "amount": 5000,
            "status": "paid",
            "billingId": "bill_42"
        })
    );
}

#[tokio::test]
async fn verifying_the_same_session_twice_reapplies_the_update() {
    let test_app = spawn_app().await;
    test_app
        .mount_session(
            "cs_test_123",
            checkout_session("paid", Some("pi_abc"), Some("bill_42")),
        )
        .await;

    Mock::given(method("PATCH"))
        .and(query_param("id", "eq.bill_42"))
        .respond_with(billing_row_updated("bill_42"))
        .expect(2)
        .mount(&test_app.data_api_server)
        .await;

    let first = test_app.verify_payment(Some("cs_test_123")).await;
    let second = test_app.verify_payment(Some("cs_test_123")).await;

    assert_eq!(StatusCode::OK, first.status());
    assert_eq!(StatusCode::OK, second.status());

    let updates = test_app.billing_updates().await;
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0]["status"], updates[1]["status"]);
    assert_eq!(updates[0]["payment_id"], updates[1]["payment_id"]);
}

#[tokio::test]
async fn verify_payment_returns_200_when_no_billing_record_matches() {
    let test_app = spawn_app().await;
    test_app
        .mount_session(
            "cs_test_123",
            checkout_session("paid", Some("pi_abc"), Some("bill_unknown")),
        )
        .await;

    Mock::given(method("PATCH"))
        .respond_with(no_billing_row_matched())
        .expect(1)
        .mount(&test_app.data_api_server)
        .await;

    let response = test_app.verify_payment(Some("cs_test_123")).await;

    assert_eq!(StatusCode::OK, response.status());
    let body: VerifyPaymentResponse = response.json().await.unwrap();
    assert_eq!(body.billing_id, "bill_unknown");
}

#[tokio::test]
async fn confirmation_reports_whether_a_billing_record_was_linked() {
    let test_app = spawn_app().await;
    test_app
        .mount_session(
            "cs_test_123",
            checkout_session("paid", Some("pi_abc"), Some("bill_42")),
        )
        .await;

    Mock::given(method("PATCH"))
        .respond_with(no_billing_row_matched())
        .up_to_n_times(1)
        .mount(&test_app.data_api_server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(billing_row_updated("bill_42"))
        .mount(&test_app.data_api_server)
        .await;

    let unlinked = confirm_payment(
        &test_app.processor,
        test_app.billing_store.as_ref(),
        "cs_test_123",
    )
    .await
    .expect("Payment should be confirmed");
    let linked = confirm_payment(
        &test_app.processor,
        test_app.billing_store.as_ref(),
        "cs_test_123",
    )
    .await
    .expect("Payment should be confirmed");

    assert!(!unlinked.billing_record_linked);
    assert!(linked.billing_record_linked);
    assert_eq!(linked.payment_intent_id, "pi_abc");
}

#[tokio::test]
async fn verify_payment_returns_500_when_the_billing_update_fails() {
    let test_app = spawn_app().await;
    test_app
        .mount_session(
            "cs_test_123",
            checkout_session("paid", Some("pi_abc"), Some("bill_42")),
        )
        .await;

    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&test_app.data_api_server)
        .await;

    let response = test_app.verify_payment(Some("cs_test_123")).await;

    assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, response.status());
    let body = error_body(response).await;
    assert!(!body.success);
    assert_eq!(body.message, "Database update error");
}

#[tokio::test]
async fn verify_payment_returns_500_when_the_processor_fails() {
    let test_app = spawn_app().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": { "type": "invalid_request_error", "message": "No such checkout.session" }
        })))
        .expect(1)
        .mount(&test_app.processor_server)
        .await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.data_api_server)
        .await;

    let response = test_app.verify_payment(Some("cs_test_unknown")).await;

    assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, response.status());
    assert_eq!(error_body(response).await.message, "Error verifying payment");
}

#[tokio::test]
async fn paid_session_without_payment_intent_is_an_upstream_fault() {
    let test_app = spawn_app().await;
    test_app
        .mount_session("cs_test_123", checkout_session("paid", None, Some("bill_42")))
        .await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.data_api_server)
        .await;

    let outcome = confirm_payment(
        &test_app.processor,
        test_app.billing_store.as_ref(),
        "cs_test_123",
    )
    .await;
    assert!(matches!(outcome, Err(ConfirmationError::UpstreamFetch(_))));

    let response = test_app.verify_payment(Some("cs_test_123")).await;
    assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, response.status());
}

#[tokio::test]
async fn unreadable_query_string_is_rejected_with_a_json_body() {
    let test_app = spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.processor_server)
        .await;

    let response = reqwest::get(format!(
        "{}/api/verify-payment?session_id=cs_a&session_id=cs_b",
        test_app.address
    ))
    .await
    .expect("Failed to execute request");

    assert_eq!(StatusCode::BAD_REQUEST, response.status());
    let body = error_body(response).await;
    assert!(!body.success);
    assert_eq!(body.message, "Missing session_id");
}

#[tokio::test]
async fn verify_payment_returns_500_when_the_request_deadline_passes() {
    let test_app = spawn_app_with(|config| {
        config.application.request_timeout_milliseconds = 100;
        // Outlives the request deadline, so only the deadline can end the call
        config.processor.timeout_milliseconds = 5_000;
    })
    .await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(checkout_session("paid", Some("pi_abc"), Some("bill_42")))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&test_app.processor_server)
        .await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.data_api_server)
        .await;

    let response = test_app.verify_payment(Some("cs_test_123")).await;

    assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, response.status());
    let body = error_body(response).await;
    assert!(!body.success);
    assert_eq!(body.message, "Error verifying payment");
}
