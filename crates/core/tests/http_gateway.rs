use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use taskdeck_core::wire::TaskRequest;
use taskdeck_core::{
    AppConfig, Category, GatewayError, HttpGateway, ListQuery, Priority, RecordingNotifier,
    TaskDraft, TaskGateway, TaskPatch, TaskStore,
};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway_for(server: &MockServer) -> HttpGateway {
    let config = AppConfig::new(format!("{}/api", server.uri()), Duration::from_secs(2))
        .expect("config");
    HttpGateway::new(&config).expect("gateway")
}

fn task_json(id: &str, title: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "description": "from server",
        "category": "WORK",
        "priority": "HIGH",
        "deadline": "2025-07-01",
        "completed": false,
        "createdAt": "2025-06-01T09:00:00.123456",
        "updatedAt": "2025-06-01T09:00:00.123456"
    })
}

#[tokio::test]
async fn list_reads_page_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [task_json("1", "Ship"), task_json("2", "Review")],
            "totalElements": 2,
            "totalPages": 1,
            "number": 0,
            "size": 20
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = gateway_for(&server)
        .list(&ListQuery::default())
        .await
        .expect("list");
    assert_eq!(page.content.len(), 2);
    assert_eq!(page.content[1].title, "Review");
    assert_eq!(page.size, 20);
}

#[tokio::test]
async fn list_forwards_query_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .and(query_param("category", "LEARNING"))
        .and(query_param("completed", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "content": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let query = ListQuery {
        category: Some(Category::Learning),
        completed: Some(false),
        ..ListQuery::default()
    };
    let page = gateway_for(&server).list(&query).await.expect("list");
    assert!(page.content.is_empty());
}

#[tokio::test]
async fn create_posts_uppercase_request_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tasks"))
        .and(body_json(json!({
            "title": "Ship",
            "description": "",
            "category": "PERSONAL",
            "priority": "LOW",
            "deadline": null,
            "completed": false
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(task_json("9", "Ship")))
        .expect(1)
        .mount(&server)
        .await;

    let request = TaskRequest::from(&TaskDraft::new("Ship", Category::Personal, Priority::Low));
    let created = gateway_for(&server).create(&request).await.expect("create");
    assert_eq!(created.id, "9");
}

#[tokio::test]
async fn delete_accepts_no_content() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/tasks/abc"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    gateway_for(&server).delete("abc").await.expect("delete");
}

#[tokio::test]
async fn delete_sends_id_as_one_encoded_segment() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/tasks/a%2Fb%3Fx=1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    gateway_for(&server).delete("a/b?x=1").await.expect("delete");
}

#[tokio::test]
async fn error_status_carries_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "status": "NOT_FOUND",
            "message": "Task not found with id missing"
        })))
        .mount(&server)
        .await;

    let err = gateway_for(&server).get("missing").await.unwrap_err();
    assert_eq!(
        err,
        GatewayError::Status {
            status: 404,
            message: Some("Task not found with id missing".into())
        }
    );
}

#[tokio::test]
async fn unknown_enum_in_response_is_a_decode_error() {
    let server = MockServer::start().await;
    let mut body = task_json("1", "Odd");
    body["priority"] = json!("URGENT");
    Mock::given(method("GET"))
        .and(path("/api/tasks/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let err = gateway_for(&server).get("1").await.unwrap_err();
    assert!(matches!(err, GatewayError::Decode(_)), "got {err:?}");
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let config = AppConfig::new("http://127.0.0.1:9/api", Duration::from_millis(500)).unwrap();
    let gateway = HttpGateway::new(&config).unwrap();
    let err = gateway.list(&ListQuery::default()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Transport(_)), "got {err:?}");
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn store_sends_merged_full_replacement_on_update() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [task_json("1", "Ship")]
        })))
        .mount(&server)
        .await;

    let mut updated = task_json("1", "Ship");
    updated["completed"] = json!(true);
    Mock::given(method("PUT"))
        .and(path("/api/tasks/1"))
        .and(body_json(json!({
            "title": "Ship",
            "description": "from server",
            "category": "WORK",
            "priority": "HIGH",
            "deadline": "2025-07-01T00:00:00.000Z",
            "completed": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(updated))
        .expect(1)
        .mount(&server)
        .await;

    let store = TaskStore::new(
        Arc::new(gateway_for(&server)),
        Arc::new(RecordingNotifier::new()),
    );
    assert_eq!(store.initialize().await.expect("initialize"), 1);

    let task = store
        .update("1", TaskPatch::completed(true))
        .await
        .applied()
        .expect("updated");
    assert!(task.completed);
    assert!(store.get("1").unwrap().completed);
}
