use std::env;
use std::sync::OnceLock;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

use durrah_agent::models::payment::{PaymentRecord, PaymentStatus, Plan};
use durrah_agent::services::signing_service::{HashSigner, RemoteSigner};
use durrah_agent::{routes, storage::LocalStore, AppState};

static APP: OnceLock<AppState> = OnceLock::new();

fn setup_app() -> Router {
    let state = APP
        .get_or_init(|| {
            dotenvy::dotenv().ok();
            env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
            env::set_var("GRADING_BASE_URL", "http://localhost:9");
            env::set_var("GRADING_ANON_KEY", "anon-test");
            env::set_var("AGENT_SECRET", "whsec_test");
            env::set_var("PAYSKY_MERCHANT_ID", "10527302281");
            env::set_var("PAYSKY_TERMINAL_ID", "14261833");
            // Test fixture key, not a real credential.
            env::set_var("PAYSKY_SECRET_KEY", "00112233445566778899aabbccddeeff");
            let store_path = std::env::temp_dir()
                .join(format!("durrah-agent-api-test-{}.json", Uuid::new_v4()));
            env::set_var("STORAGE_PATH", &store_path);

            durrah_agent::config::init_config().expect("init config");
            let store = LocalStore::open(&store_path).expect("open store");
            AppState::new(store)
        })
        .clone();

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/payments/sign", post(routes::payments::sign_transaction))
        .route("/api/payments", get(routes::payments::list_payments))
        .route(
            "/api/payments/:reference/reset",
            post(routes::payments::reset_payment),
        )
        .with_state(state)
}

fn sign_request(secret: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/payments/sign")
        .header("content-type", "application/json");
    if let Some(secret) = secret {
        builder = builder.header("x-agent-secret", secret);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn signing_requires_agent_secret() {
    let app = setup_app();
    let body = json!({
        "amount": 100,
        "merchant_reference": "DURRAH_kid1_1700000000001",
        "trx_date_time": "Tue, 14 Nov 2023 22:13:20 GMT",
    });

    let resp = app
        .clone()
        .oneshot(sign_request(None, body.clone()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .oneshot(sign_request(Some("wrong"), body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signing_returns_pinned_hash_for_known_inputs() {
    let app = setup_app();
    let body = json!({
        "amount": 100,
        "merchant_reference": "DURRAH_kid1_1700000000001",
        "trx_date_time": "Tue, 14 Nov 2023 22:13:20 GMT",
    });

    let resp = app
        .oneshot(sign_request(Some("whsec_test"), body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        parsed["secure_hash"].as_str(),
        Some("759CC12CAEFFFBFE74AB4BA14AE1489C930C3B245D2E959A00FC46AFED63172D")
    );
    assert_eq!(parsed["merchant_id"].as_str(), Some("10527302281"));
    assert_eq!(parsed["terminal_id"].as_str(), Some("14261833"));
}

#[tokio::test]
async fn signing_rejects_zero_amounts() {
    let app = setup_app();
    let body = json!({
        "amount": 0,
        "merchant_reference": "DURRAH_kid1_1700000000002",
        "trx_date_time": "Tue, 14 Nov 2023 22:13:20 GMT",
    });

    let resp = app
        .oneshot(sign_request(Some("whsec_test"), body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn remote_signer_obtains_hash_over_http() {
    let app = setup_app();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind signing server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve signing");
    });

    let signer = RemoteSigner::new(
        reqwest::Client::new(),
        format!("http://{}/api/payments/sign", addr),
        "whsec_test".to_string(),
    );

    let hash = signer
        .sign(
            100,
            "DURRAH_kid1_1700000000001",
            "Tue, 14 Nov 2023 22:13:20 GMT",
        )
        .await
        .expect("remote sign");
    assert_eq!(
        hash,
        "759CC12CAEFFFBFE74AB4BA14AE1489C930C3B245D2E959A00FC46AFED63172D"
    );
}

#[tokio::test]
async fn reset_reopens_a_terminal_record() {
    let app = setup_app();
    let state = APP.get().expect("app state");

    let reference = format!("DURRAH_reset_{}", chrono::Utc::now().timestamp_millis());
    let mut record = PaymentRecord::new(reference.clone(), "reset".to_string(), Plan::Monthly, 40000);
    record
        .transition(PaymentStatus::Cancelled, None)
        .expect("cancel");
    state.payment_ledger.create(record).expect("create");

    let req = Request::builder()
        .method("POST")
        .uri(format!("/api/payments/{}/reset", reference))
        .header("x-agent-secret", "whsec_test")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let reopened = state
        .payment_ledger
        .find_by_reference(&reference)
        .expect("record");
    assert_eq!(reopened.status, PaymentStatus::Pending);
}
