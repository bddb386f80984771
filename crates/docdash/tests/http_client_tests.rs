//! `HttpJobClient` against a local mock HTTP server.

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use docdash::{ApiError, ChatMessage, HttpJobClient, JobApi, JobStatus, UploadFile};

fn job_json(id: i64, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "status": status,
        "result": null,
        "document": format!("documents/doc-{}.pdf", id),
        "created_at": "2024-05-01T10:00:00Z",
        "updated_at": "2024-05-01T10:00:05Z"
    })
}

fn client_for(server: &MockServer) -> HttpJobClient {
    HttpJobClient::new(&format!("{}/api", server.uri())).unwrap()
}

#[tokio::test]
async fn test_get_jobs() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([job_json(2, "PROCESSING"), job_json(1, "SUCCESS")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let jobs = client_for(&server).get_jobs().await.unwrap();

    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].id, 2);
    assert_eq!(jobs[0].status, JobStatus::Processing);
    assert_eq!(jobs[1].status, JobStatus::Success);
    assert_eq!(jobs[1].display_name(), "doc-1.pdf");
}

#[tokio::test]
async fn test_get_job() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/7/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_json(7, "PENDING")))
        .expect(1)
        .mount(&server)
        .await;

    let job = client_for(&server).get_job(7).await.unwrap();
    assert_eq!(job.id, 7);
    assert_eq!(job.status, JobStatus::Pending);
    assert!(job.result.is_none());
}

#[tokio::test]
async fn test_create_job_sends_multipart_document() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/jobs/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(job_json(11, "PENDING")))
        .expect(1)
        .mount(&server)
        .await;

    let file = UploadFile::new("contract.pdf", b"%PDF-1.4 contract".to_vec());
    let job = client_for(&server).create_job(&file).await.unwrap();
    assert_eq!(job.id, 11);
    assert_eq!(job.status, JobStatus::Pending);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let content_type = requests[0]
        .headers
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("multipart/form-data"));

    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"document\""));
    assert!(body.contains("filename=\"contract.pdf\""));
    assert!(body.contains("application/pdf"));
    assert!(body.contains("%PDF-1.4 contract"));
}

#[tokio::test]
async fn test_delete_job() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/jobs/7/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server).delete_job(7).await.unwrap();
}

#[tokio::test]
async fn test_post_chat_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/jobs/7/chat/"))
        .and(body_json(json!({
            "prompt": "Who is the landlord?",
            "history": [
                {"role": "user", "content": "What is this?"},
                {"role": "assistant", "content": "A lease."}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"reply": "ACME Ltd."})))
        .expect(1)
        .mount(&server)
        .await;

    let history = vec![
        ChatMessage::user("What is this?"),
        ChatMessage::assistant("A lease."),
    ];
    let reply = client_for(&server)
        .post_chat_message(7, "Who is the landlord?", &history)
        .await
        .unwrap();
    assert_eq!(reply.reply, "ACME Ltd.");
}

#[tokio::test]
async fn test_error_status_carries_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/99/"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not found."))
        .mount(&server)
        .await;

    let err = client_for(&server).get_job(99).await.unwrap_err();
    assert_eq!(
        err,
        ApiError::Status {
            status: 404,
            body: "Not found.".to_string()
        }
    );
}

#[tokio::test]
async fn test_long_error_body_is_truncated() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/jobs/3/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("x".repeat(1000)))
        .mount(&server)
        .await;

    match client_for(&server).delete_job(3).await {
        Err(ApiError::Status { status, body }) => {
            assert_eq!(status, 500);
            assert!(body.ends_with("... (truncated)"));
            assert!(body.len() < 300);
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_undecodable_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).get_jobs().await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn test_unknown_status_token_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/5/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_json(5, "done")))
        .mount(&server)
        .await;

    let err = client_for(&server).get_job(5).await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let client = HttpJobClient::new("http://127.0.0.1:1/api").unwrap();

    let err = client.get_jobs().await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}
