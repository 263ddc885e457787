use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, routing::post, Json, Router};
use serde_json::json;
use uuid::Uuid;

use durrah_agent::models::submission::PendingSubmission;
use durrah_agent::services::sync_service::{SyncPolicy, SyncService};
use durrah_agent::storage::{
    exam_state_key, exam_submitted_key, LocalStore, PENDING_SUBMISSIONS_KEY,
};

#[derive(Clone)]
struct EndpointState {
    calls: Arc<AtomicUsize>,
    delay_ms: u64,
}

/// Mock grading endpoint: submissions whose exam id starts with "fail" get an
/// application-level failure, everything else succeeds.
async fn grade_exam(
    State(state): State<EndpointState>,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    state.calls.fetch_add(1, Ordering::SeqCst);
    if state.delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(state.delay_ms)).await;
    }

    let exam_id = body["exam_id"].as_str().unwrap_or("");
    if exam_id.starts_with("fail") {
        Json(json!({ "success": false, "error": "grading unavailable" }))
    } else {
        Json(json!({
            "success": true,
            "score": 8.0,
            "max_score": 10.0,
            "percentage": 80.0,
            "submission_id": format!("sub_{}", exam_id),
        }))
    }
}

async fn spawn_grading_endpoint(delay_ms: u64) -> (String, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let state = EndpointState {
        calls: calls.clone(),
        delay_ms,
    };
    let app = Router::new()
        .route("/functions/v1/grade-exam", post(grade_exam))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock endpoint");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve mock");
    });

    (
        format!("http://{}/functions/v1/grade-exam", addr),
        calls,
    )
}

fn temp_store() -> LocalStore {
    let path = std::env::temp_dir().join(format!("durrah-agent-test-{}.json", Uuid::new_v4()));
    LocalStore::open(path).expect("open store")
}

fn service(store: &LocalStore, endpoint: String, policy: SyncPolicy) -> SyncService {
    SyncService::new(
        store.clone(),
        reqwest::Client::new(),
        endpoint,
        "anon-key".to_string(),
        policy,
    )
}

fn submission(exam_id: &str) -> PendingSubmission {
    PendingSubmission::new(
        exam_id,
        json!({ "name": "Alice", "grade": 5 }),
        vec![json!({ "question_id": 1, "answer": 2 })],
        vec![],
        json!({ "user_agent": "kiosk" }),
        321,
    )
}

fn immediate_retry_policy(max_attempts: u32) -> SyncPolicy {
    SyncPolicy {
        max_attempts,
        backoff_base_secs: 0,
        backoff_cap_secs: 0,
    }
}

#[tokio::test]
async fn failed_entries_survive_in_original_order() {
    let (endpoint, _calls) = spawn_grading_endpoint(0).await;
    let store = temp_store();
    let svc = service(&store, endpoint, immediate_retry_policy(10));

    svc.enqueue(submission("exam-ok-1")).expect("enqueue");
    svc.enqueue(submission("fail-a")).expect("enqueue");
    svc.enqueue(submission("exam-ok-2")).expect("enqueue");
    svc.enqueue(submission("fail-b")).expect("enqueue");

    let report = svc.sync_all().await.expect("sync");
    assert!(report.ran);
    assert_eq!(report.attempted, 4);
    assert_eq!(report.synced, 2);
    assert_eq!(report.failed, 2);

    // Exactly the failed subset survives, in original relative order.
    let survivors = svc.pending().expect("pending");
    let ids: Vec<&str> = survivors.iter().map(|s| s.exam_id.as_str()).collect();
    assert_eq!(ids, vec!["fail-a", "fail-b"]);

    // Synced exams got their local state cleared and marked submitted.
    assert!(store
        .get::<bool>(&exam_submitted_key("exam-ok-1"))
        .unwrap()
        .unwrap_or(false));
    assert!(store
        .get::<bool>(&exam_submitted_key("exam-ok-2"))
        .unwrap()
        .unwrap_or(false));
    assert!(store
        .get::<bool>(&exam_submitted_key("fail-a"))
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn successful_sync_clears_queue_and_exam_state() {
    let (endpoint, _calls) = spawn_grading_endpoint(0).await;
    let store = temp_store();
    let svc = service(&store, endpoint, immediate_retry_policy(10));

    store
        .set(&exam_state_key("exam-9"), &json!({ "answers": [1, 2] }))
        .expect("seed exam state");
    svc.enqueue(submission("exam-9")).expect("enqueue");

    let report = svc.sync_all().await.expect("sync");
    assert_eq!(report.synced, 1);
    assert_eq!(report.failed, 0);

    // The pending key is removed outright when nothing failed.
    assert!(!store.contains(PENDING_SUBMISSIONS_KEY).unwrap());
    assert_eq!(svc.pending_count().unwrap(), 0);
    assert!(!store.contains(&exam_state_key("exam-9")).unwrap());
    assert!(store
        .get::<bool>(&exam_submitted_key("exam-9"))
        .unwrap()
        .unwrap_or(false));
}

#[tokio::test]
async fn overlapping_sync_is_a_noop() {
    // Each delivery takes 200ms, so the first pass is still running when the
    // second trigger fires.
    let (endpoint, calls) = spawn_grading_endpoint(200).await;
    let store = temp_store();
    let svc = service(&store, endpoint, immediate_retry_policy(10));

    for i in 0..3 {
        svc.enqueue(submission(&format!("exam-{}", i))).expect("enqueue");
    }

    let first = {
        let svc = svc.clone();
        tokio::spawn(async move { svc.sync_all().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let second = svc.sync_all().await.expect("second sync");
    assert!(!second.ran);
    assert_eq!(second.attempted, 0);

    let first = first.await.expect("join").expect("first sync");
    assert!(first.ran);
    assert_eq!(first.synced, 3);

    // The endpoint saw exactly one batch of calls.
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn exhausted_submissions_are_parked() {
    let (endpoint, calls) = spawn_grading_endpoint(0).await;
    let store = temp_store();
    let svc = service(&store, endpoint, immediate_retry_policy(2));

    svc.enqueue(submission("fail-forever")).expect("enqueue");

    let first = svc.sync_all().await.expect("first pass");
    assert_eq!(first.failed, 1);
    assert_eq!(first.parked, 0);
    assert_eq!(svc.pending().unwrap()[0].attempts, 1);

    let second = svc.sync_all().await.expect("second pass");
    assert_eq!(second.failed, 0);
    assert_eq!(second.parked, 1);

    assert_eq!(svc.pending_count().unwrap(), 0);
    assert_eq!(svc.parked_count().unwrap(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // Parked entries are terminal: another pass attempts nothing.
    let third = svc.sync_all().await.expect("third pass");
    assert_eq!(third.attempted, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn backoff_defers_retries_until_due() {
    let (endpoint, calls) = spawn_grading_endpoint(0).await;
    let store = temp_store();
    let policy = SyncPolicy {
        max_attempts: 10,
        backoff_base_secs: 3600,
        backoff_cap_secs: 3600,
    };
    let svc = service(&store, endpoint, policy);

    svc.enqueue(submission("fail-later")).expect("enqueue");

    let first = svc.sync_all().await.expect("first pass");
    assert_eq!(first.attempted, 1);
    assert_eq!(first.failed, 1);

    // The entry is not due for another hour: retained untouched, no call.
    let second = svc.sync_all().await.expect("second pass");
    assert!(second.ran);
    assert_eq!(second.attempted, 0);
    assert_eq!(second.failed, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(svc.pending().unwrap()[0].attempts, 1);
}
