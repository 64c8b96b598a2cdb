//! End-to-end tests for one consume cycle over real HTTP.
//!
//! Each test spins up an Axum server on a random port that fakes the queue,
//! the employment registry and the workflow API, then drives the real
//! clients against it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use hr_resolver::config::{QueueConfig, RegistryConfig, WorkflowConfig};
use hr_resolver::error::WorkflowError;
use hr_resolver::queue::{ConsumeReport, QueueConsumer, SqsTransport};
use hr_resolver::registry::HttpRegistryClient;
use hr_resolver::resolution::{Escalation, ResolutionEngine};
use hr_resolver::workflow::{
    ApprovalDecision, HttpWorkflowClient, TaskComment, WorkflowApi, role_at_step,
};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(10);

const ESCALATION_ROLE: i64 = 42;

/// Recorded traffic and scripted answers of the fake services.
#[derive(Default)]
struct FakeServices {
    base_url: String,
    reject_auth: Mutex<bool>,
    logins: Mutex<Vec<Value>>,
    /// (task id, authorization header, body)
    comments: Mutex<Vec<(String, String, Value)>>,
    /// Full name → (status, body).
    registry: Mutex<HashMap<String, (u16, String)>>,
    registry_auth: Mutex<Vec<String>>,
    /// Returned by the next ReceiveMessage, then the queue is empty.
    pending_batch: Mutex<Vec<Value>>,
    sqs_auth: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
}

impl FakeServices {
    fn enqueue(&self, task_id: &str, handle: &str, body: Value) {
        self.pending_batch.lock().unwrap().push(json!({
            "MessageId": handle,
            "ReceiptHandle": handle,
            "Body": body.to_string(),
            "Attributes": { "MessageGroupId": task_id },
        }));
    }

    fn registry_answer(&self, full_name: &str, status: u16, body: Value) {
        self.registry
            .lock()
            .unwrap()
            .insert(full_name.to_string(), (status, body.to_string()));
    }
}

fn header(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn auth(
    State(fake): State<Arc<FakeServices>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    fake.logins.lock().unwrap().push(body);
    if *fake.reject_auth.lock().unwrap() {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "invalid key" })));
    }
    (
        StatusCode::OK,
        Json(json!({
            "api_url": format!("{}/api", fake.base_url),
            "access_token": "token-123",
        })),
    )
}

async fn comment(
    State(fake): State<Arc<FakeServices>>,
    Path(task_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    fake.comments
        .lock()
        .unwrap()
        .push((task_id, header(&headers, "authorization"), body));
    StatusCode::CREATED
}

async fn contracts(
    State(fake): State<Arc<FakeServices>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> (StatusCode, String) {
    fake.registry_auth
        .lock()
        .unwrap()
        .push(header(&headers, "authorization"));

    let name = query.get("Name").cloned().unwrap_or_default();
    match fake.registry.lock().unwrap().get(&name) {
        Some((status, body)) => (
            StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body.clone(),
        ),
        None => (StatusCode::OK, "[]".to_string()),
    }
}

async fn sqs(
    State(fake): State<Arc<FakeServices>>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    fake.sqs_auth
        .lock()
        .unwrap()
        .push(header(&headers, "authorization"));

    let request: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    match header(&headers, "x-amz-target").as_str() {
        "AmazonSQS.ReceiveMessage" => {
            let messages: Vec<Value> = fake.pending_batch.lock().unwrap().drain(..).collect();
            let response = if messages.is_empty() {
                json!({})
            } else {
                json!({ "Messages": messages })
            };
            (StatusCode::OK, response.to_string())
        }
        "AmazonSQS.DeleteMessage" => {
            let handle = request["ReceiptHandle"].as_str().unwrap_or_default();
            fake.deleted.lock().unwrap().push(handle.to_string());
            (StatusCode::OK, "{}".to_string())
        }
        other => (
            StatusCode::BAD_REQUEST,
            json!({ "__type": "InvalidAction", "message": other }).to_string(),
        ),
    }
}

/// Start the fake services on a random port.
async fn start_server() -> Arc<FakeServices> {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let fake = Arc::new(FakeServices {
        base_url: format!("http://127.0.0.1:{port}"),
        ..Default::default()
    });

    let app = Router::new()
        .route("/auth", post(auth))
        .route("/api/tasks/{id}/comments", post(comment))
        .route("/registry/EmployeeContracts", get(contracts))
        .route("/sqs", post(sqs))
        .with_state(Arc::clone(&fake));

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    fake
}

fn workflow_config(fake: &FakeServices) -> WorkflowConfig {
    WorkflowConfig {
        auth_endpoint: format!("{}/auth", fake.base_url),
        login: "resolver".into(),
        secret_key: SecretString::from("secret-key"),
        person_id: Some("17".into()),
        escalation_role_id: ESCALATION_ROLE,
        escalation_step: 3,
        support_url: "https://help.example.com".into(),
    }
}

fn registry_config(fake: &FakeServices) -> RegistryConfig {
    RegistryConfig {
        host: format!("{}/", fake.base_url),
        base_path: "/registry".into(),
        user: "user".into(),
        password: SecretString::from("pass"),
    }
}

fn queue_config(fake: &FakeServices) -> QueueConfig {
    QueueConfig {
        endpoint: format!("{}/sqs", fake.base_url),
        queue_name: "hr-tasks".into(),
        queue_url: "https://message-queue.example.com/b1g/dj6/hr-tasks.fifo".into(),
        access_key_id: "AKIDEXAMPLE".into(),
        secret_access_key: SecretString::from("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY"),
        region: "ru-central1".into(),
        max_messages: 10,
        wait_time: Duration::from_secs(0),
    }
}

fn engine(fake: &FakeServices) -> ResolutionEngine {
    let registry =
        HttpRegistryClient::new(registry_config(fake), Duration::from_secs(5)).unwrap();
    let workflow =
        HttpWorkflowClient::new(workflow_config(fake), Duration::from_secs(5)).unwrap();
    let config = workflow_config(fake);
    ResolutionEngine::new(
        Arc::new(registry),
        Arc::new(workflow),
        Escalation::from(&config),
    )
}

fn consumer(fake: &FakeServices) -> QueueConsumer {
    let config = queue_config(fake);
    let (max_messages, wait_time) = (config.max_messages, config.wait_time);
    let transport = SqsTransport::new(config, Duration::from_secs(5)).unwrap();
    QueueConsumer::new(Arc::new(transport), max_messages, wait_time)
}

fn person(full_name: &str, snils: &str) -> Value {
    json!({ "fullname": full_name, "snils": snils })
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn cycle_resolves_escalates_and_deletes() {
    timeout(TEST_TIMEOUT, async {
        let fake = start_server().await;

        // Task 1001: stale message, then the authoritative one.
        fake.enqueue("1001", "rh-1", person("Old Name", "000-000-000 00"));
        fake.enqueue("1002", "rh-2", person("Petrova Anna", "111-222-333 44"));
        fake.enqueue("1001", "rh-3", person("Ivanov Ivan Ivanovich", "123-456-789 00"));
        fake.enqueue("1003", "rh-4", person("Sidorov Petr", "555-666-777 88"));

        fake.registry_answer(
            "Ivanov Ivan Ivanovich",
            200,
            json!([{
                "WorkerID": "7",
                "SNILS": "123-456-789 00",
                "WorkerName": "Ivanov Ivan Ivanovich",
                "Department": "IT",
                "Position": "ИНЖЕНЕР",
                "ContractType": "Бессрочный",
                "DateStart": "01.02.2019",
                "DateEnd": null,
            }]),
        );
        fake.registry_answer("Sidorov Petr", 500, json!({ "error": "db down" }));

        let report = consumer(&fake).consume_once(&engine(&fake)).await.unwrap();

        assert_eq!(
            report,
            ConsumeReport {
                groups: 3,
                resolved: 2,
                retained: 1,
                deleted: 3,
                delete_failures: 0,
            }
        );

        // Resolved groups are deleted whole; the escalated one stays.
        let mut deleted = fake.deleted.lock().unwrap().clone();
        deleted.sort();
        assert_eq!(deleted, vec!["rh-1", "rh-2", "rh-3"]);

        // One login for the whole cycle.
        let logins = fake.logins.lock().unwrap();
        assert_eq!(logins.len(), 1);
        assert_eq!(
            logins[0],
            json!({ "login": "resolver", "security_key": "secret-key", "person_id": "17" })
        );

        let comments = fake.comments.lock().unwrap();
        assert_eq!(comments.len(), 3);
        assert!(comments.iter().all(|(_, auth, _)| auth == "Bearer token-123"));

        let (task, _, body) = &comments[0];
        assert_eq!(task, "1001");
        assert_eq!(body["approval_choice"], "rejected");
        let text = body["formatted_text"].as_str().unwrap();
        assert!(text.contains("бессрочные трудовые отношения с Академией с 01.02.2019"));
        assert!(text.contains("«Инженер»"));
        assert_eq!(body["approvals_added"], json!([]));

        let (task, _, body) = &comments[1];
        assert_eq!(task, "1002");
        assert_eq!(body["approval_choice"], "approved");
        assert!(body["formatted_text"].as_str().unwrap().contains("не состоит"));

        let (task, _, body) = &comments[2];
        assert_eq!(task, "1003");
        assert_eq!(body["approval_choice"], "revoked");
        assert!(
            body["formatted_text"]
                .as_str()
                .unwrap()
                .contains("Ошибка: RegistryError")
        );
        assert_eq!(body["approvals_added"], json!([[], [], [{ "id": ESCALATION_ROLE }]]));
        assert_eq!(body["approvals_removed"], json!([]));

        // Registry calls use basic auth; queue calls are SigV4-signed.
        assert!(
            fake.registry_auth
                .lock()
                .unwrap()
                .iter()
                .all(|auth| auth == "Basic dXNlcjpwYXNz")
        );
        assert!(fake.sqs_auth.lock().unwrap().iter().all(|auth| {
            auth.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/")
                && auth.contains("/ru-central1/sqs/aws4_request")
        }));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn empty_queue_is_a_quiet_cycle() {
    timeout(TEST_TIMEOUT, async {
        let fake = start_server().await;

        let report = consumer(&fake).consume_once(&engine(&fake)).await.unwrap();

        assert_eq!(report, ConsumeReport::default());
        assert!(fake.logins.lock().unwrap().is_empty());
        assert!(fake.comments.lock().unwrap().is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn malformed_payload_is_escalated_and_discarded() {
    timeout(TEST_TIMEOUT, async {
        let fake = start_server().await;
        fake.enqueue("2001", "rh-1", json!({ "fullname": "No Snils" }));

        let report = consumer(&fake).consume_once(&engine(&fake)).await.unwrap();

        assert_eq!(report.resolved, 1);
        assert_eq!(*fake.deleted.lock().unwrap(), vec!["rh-1"]);
        assert!(fake.registry_auth.lock().unwrap().is_empty());

        let comments = fake.comments.lock().unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].2["approval_choice"], "revoked");
        assert!(
            comments[0].2["formatted_text"]
                .as_str()
                .unwrap()
                .contains("PayloadParseError")
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn rejected_login_fails_the_cycle_and_keeps_messages() {
    timeout(TEST_TIMEOUT, async {
        let fake = start_server().await;
        *fake.reject_auth.lock().unwrap() = true;
        fake.enqueue("3001", "rh-1", person("Ivanov Ivan", "123-456-789 00"));

        // The resolution comment and the escalation both need a login.
        let result = consumer(&fake).consume_once(&engine(&fake)).await;

        assert!(result.is_err());
        assert!(fake.deleted.lock().unwrap().is_empty());
        assert_eq!(fake.logins.lock().unwrap().len(), 2);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn workflow_client_reports_auth_status() {
    timeout(TEST_TIMEOUT, async {
        let fake = start_server().await;
        *fake.reject_auth.lock().unwrap() = true;

        let client =
            HttpWorkflowClient::new(workflow_config(&fake), Duration::from_secs(5)).unwrap();
        let comment = TaskComment::new("text", ApprovalDecision::Revoked)
            .with_approvals_added(role_at_step(ESCALATION_ROLE, 1));

        let err = client.comment_task("4001", &comment).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Auth { status: 401 }));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn workflow_client_reuses_session() {
    timeout(TEST_TIMEOUT, async {
        let fake = start_server().await;

        let client =
            HttpWorkflowClient::new(workflow_config(&fake), Duration::from_secs(5)).unwrap();
        let comment = TaskComment::new("ok", ApprovalDecision::Approved);

        client.comment_task("5001", &comment).await.unwrap();
        client.comment_task("5002", &comment).await.unwrap();

        assert_eq!(fake.logins.lock().unwrap().len(), 1);
        let comments = fake.comments.lock().unwrap();
        assert_eq!(comments[1].0, "5002");
        assert_eq!(comments[1].2["approvals_added"], json!([]));
    })
    .await
    .expect("test timed out");
}
