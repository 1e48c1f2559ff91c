//! Assistants dashboard flow against a mock backend: list, create,
//! re-fetch, round trip.

use axum::extract::{Multipart, Path};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use voxboard_api::BackendClient;
use voxboard_controllers::{AssistantsController, ControllerError};

/// Mock backend that stores created assistants and serves them back.
fn mock_router(assistants: Arc<Mutex<Vec<Value>>>) -> Router {
    let list_state = assistants.clone();
    Router::new()
        .route(
            "/assistants/{user_id}",
            get(move |Path(user_id): Path<String>| {
                let list_state = list_state.clone();
                async move {
                    let rows: Vec<Value> = list_state
                        .lock()
                        .unwrap()
                        .iter()
                        .filter(|a| a["user_id"] == user_id.as_str())
                        .cloned()
                        .collect();
                    Json(json!({ "assistants": rows }))
                }
            }),
        )
        .route(
            "/assistants/create",
            post(move |mut multipart: Multipart| {
                let assistants = assistants.clone();
                async move {
                    let mut fields = serde_json::Map::new();
                    while let Some(field) = multipart.next_field().await.unwrap() {
                        let name = field.name().unwrap().to_string();
                        if field.file_name().is_some() {
                            let _ = field.bytes().await.unwrap();
                            continue;
                        }
                        let value = field.text().await.unwrap();
                        fields.insert(name, Value::String(value));
                    }
                    if fields.get("name").and_then(Value::as_str) == Some("boom") {
                        return (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            Json(json!({ "detail": "Error creating assistant: boom" })),
                        )
                            .into_response();
                    }
                    let id = format!("a-{}", assistants.lock().unwrap().len() + 1);
                    fields.insert("assistant_id".into(), Value::String(id));
                    fields.insert("file_urls".into(), json!([]));
                    let row = Value::Object(fields);
                    assistants.lock().unwrap().push(row.clone());
                    Json(row).into_response()
                }
            }),
        )
}

async fn spawn_backend(assistants: Arc<Mutex<Vec<Value>>>) -> BackendClient {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("mock listener should bind");
    let addr = listener.local_addr().expect("mock should have an addr");
    tokio::spawn(async move {
        axum::serve(listener, mock_router(assistants)).await.expect("mock serve");
    });
    BackendClient::new(format!("http://{addr}")).expect("client should build")
}

fn seeded_row(id: &str, name: &str) -> Value {
    json!({
        "assistant_id": id,
        "user_id": "u-1",
        "name": name,
        "provider": "groq",
        "model": "llama-3.1-8b-instant",
        "voice_provider": "deepgram",
        "voice_model": "asteria",
        "first_message": "hi",
        "system_prompt": "sp",
        "file_urls": []
    })
}

#[tokio::test]
async fn load_and_filter_the_dashboard_list() {
    let rows = Arc::new(Mutex::new(vec![
        seeded_row("a-1", "Riley"),
        seeded_row("a-2", "Support Bot"),
    ]));
    let api = spawn_backend(rows).await;
    let mut controller = AssistantsController::new(api, "u-1", CancellationToken::new());

    controller.load().await.expect("load should succeed");
    assert_eq!(controller.assistants().len(), 2);

    controller.set_search("rIl");
    let hits = controller.filtered();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "Riley");
}

#[tokio::test]
async fn create_refetches_the_list_before_the_form_closes() {
    let api = spawn_backend(Arc::new(Mutex::new(Vec::new()))).await;
    let mut controller = AssistantsController::new(api, "u-1", CancellationToken::new());
    controller.load().await.expect("load should succeed");
    assert!(controller.assistants().is_empty());

    controller.open_create_form();
    {
        let draft = controller.draft_mut().expect("form should be open");
        draft.name = "Riley".into();
        draft.first_message = "Thank you for calling.".into();
        draft.system_prompt = "You are Riley.".into();
    }
    let created = controller.submit().await.expect("submit should succeed");

    // The refreshed list already reflects the new assistant and the form
    // is closed only now.
    assert!(!controller.form_open());
    assert!(controller
        .assistants()
        .iter()
        .any(|a| a.assistant_id == created.assistant_id));
    assert_eq!(controller.selected().map(|a| a.name.as_str()), Some("Riley"));
}

#[tokio::test]
async fn submitted_fields_round_trip_through_reselection() {
    let api = spawn_backend(Arc::new(Mutex::new(Vec::new()))).await;
    let mut controller = AssistantsController::new(api, "u-1", CancellationToken::new());
    controller.load().await.expect("load should succeed");

    controller.open_create_form();
    {
        let draft = controller.draft_mut().expect("form should be open");
        draft.name = "Wellness Riley".into();
        draft.first_message = "Thank you for calling Wellness Partners.".into();
        draft.system_prompt = "You are Riley, a voice assistant.".into();
        draft.model = "gemma2-9b-it".into();
    }
    let created = controller.submit().await.expect("submit should succeed");

    let reselected = controller
        .select(&created.assistant_id)
        .expect("created assistant should be selectable")
        .clone();
    assert_eq!(reselected.name, "Wellness Riley");
    assert_eq!(reselected.model, "gemma2-9b-it");
    assert_eq!(
        reselected.first_message,
        "Thank you for calling Wellness Partners."
    );

    let draft = controller.draft().expect("selection should prefill the form");
    assert_eq!(draft.system_prompt, "You are Riley, a voice assistant.");
}

#[tokio::test]
async fn validation_failure_keeps_the_form_open() {
    let api = spawn_backend(Arc::new(Mutex::new(Vec::new()))).await;
    let mut controller = AssistantsController::new(api, "u-1", CancellationToken::new());

    controller.open_create_form();
    let err = controller.submit().await.expect_err("empty draft must fail");
    assert!(matches!(err, ControllerError::Draft(_)));
    assert!(controller.form_open());
    assert!(controller.error().is_some());
}

#[tokio::test]
async fn backend_failure_surfaces_the_detail_message() {
    let api = spawn_backend(Arc::new(Mutex::new(Vec::new()))).await;
    let mut controller = AssistantsController::new(api, "u-1", CancellationToken::new());

    controller.open_create_form();
    {
        let draft = controller.draft_mut().expect("form should be open");
        draft.name = "boom".into();
        draft.first_message = "hi".into();
        draft.system_prompt = "sp".into();
    }
    let err = controller.submit().await.expect_err("backend failure must fail");
    assert!(matches!(err, ControllerError::Api(_)));
    assert_eq!(
        controller.error(),
        Some("backend error (500): Error creating assistant: boom")
    );
    assert!(controller.form_open());
}

#[tokio::test]
async fn cancelled_scope_closes_the_controller() {
    let api = spawn_backend(Arc::new(Mutex::new(Vec::new()))).await;
    let scope = CancellationToken::new();
    let mut controller = AssistantsController::new(api, "u-1", scope.clone());

    scope.cancel();
    let err = controller.load().await.expect_err("cancelled scope must close");
    assert!(matches!(err, ControllerError::Closed));
}
