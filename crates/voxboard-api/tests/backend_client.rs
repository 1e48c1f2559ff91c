//! Exercises the backend client against an in-process axum mock.

use axum::extract::{Multipart, Path};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use voxboard_api::{ApiError, BackendClient};
use voxboard_types::{AssistantDraft, FileAttachment, SessionKey};

async fn spawn_mock(app: Router) -> BackendClient {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("mock listener should bind");
    let addr = listener.local_addr().expect("mock should have an addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock serve");
    });
    BackendClient::new(format!("http://{addr}")).expect("client should build")
}

async fn collect_multipart(mut multipart: Multipart) -> (HashMap<String, String>, Vec<(String, usize)>) {
    let mut fields = HashMap::new();
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.expect("multipart field") {
        let name = field.name().expect("field name").to_string();
        match field.file_name() {
            Some(file_name) => {
                let file_name = file_name.to_string();
                let bytes = field.bytes().await.expect("file bytes");
                files.push((file_name, bytes.len()));
            }
            None => {
                let value = field.text().await.expect("field text");
                fields.insert(name, value);
            }
        }
    }
    (fields, files)
}

#[tokio::test]
async fn assistants_for_user_unwraps_the_envelope() {
    let app = Router::new().route(
        "/assistants/{user_id}",
        get(|Path(user_id): Path<String>| async move {
            assert_eq!(user_id, "u-1");
            Json(json!({
                "assistants": [{
                    "assistant_id": "a-1",
                    "user_id": "u-1",
                    "name": "Riley",
                    "provider": "groq",
                    "model": "llama-3.1-8b-instant",
                    "voice_provider": "deepgram",
                    "voice_model": "asteria",
                    "first_message": "hi",
                    "system_prompt": "sp"
                }]
            }))
        }),
    );
    let client = spawn_mock(app).await;

    let assistants = client
        .assistants_for_user("u-1")
        .await
        .expect("listing should succeed");
    assert_eq!(assistants.len(), 1);
    assert_eq!(assistants[0].name, "Riley");
}

#[tokio::test]
async fn assistants_with_unexpected_shape_become_empty() {
    let app = Router::new().route(
        "/assistants/{user_id}",
        get(|| async { Json(json!({ "items": [] })) }),
    );
    let client = spawn_mock(app).await;

    let assistants = client
        .assistants_for_user("u-1")
        .await
        .expect("shape fallback should not error");
    assert!(assistants.is_empty());
}

#[tokio::test]
async fn create_assistant_posts_every_field_and_file() {
    let app = Router::new().route(
        "/assistants/create",
        post(|multipart: Multipart| async move {
            let (fields, files) = collect_multipart(multipart).await;
            assert_eq!(fields["user_id"], "u-1");
            assert_eq!(fields["name"], "Riley");
            assert_eq!(fields["first_message"], "hello");
            assert_eq!(fields["system_prompt"], "sp");
            assert_eq!(fields["provider"], "groq");
            assert_eq!(fields["voice_provider"], "deepgram");
            assert_eq!(files, vec![("notes.pdf".to_string(), 4)]);
            Json(json!({
                "assistant_id": "a-9",
                "user_id": fields["user_id"],
                "name": fields["name"],
                "provider": fields["provider"],
                "model": fields["model"],
                "voice_provider": fields["voice_provider"],
                "voice_model": fields["voice_model"],
                "first_message": fields["first_message"],
                "system_prompt": fields["system_prompt"],
                "file_urls": ["https://files/notes.pdf"]
            }))
        }),
    );
    let client = spawn_mock(app).await;

    let draft = AssistantDraft {
        name: "Riley".into(),
        first_message: "hello".into(),
        system_prompt: "sp".into(),
        files: vec![FileAttachment::new("notes.pdf", "application/pdf", b"%PDF".to_vec())],
        ..AssistantDraft::default()
    };
    let created = client
        .create_assistant("u-1", &draft)
        .await
        .expect("create should succeed");
    assert_eq!(created.assistant_id, "a-9");
    assert_eq!(created.file_urls, vec!["https://files/notes.pdf"]);
}

#[tokio::test]
async fn create_failure_surfaces_the_detail_body() {
    let app = Router::new().route(
        "/assistants/create",
        post(|_: Multipart| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": "Error creating assistant: storage offline" })),
            )
        }),
    );
    let client = spawn_mock(app).await;

    let draft = AssistantDraft {
        name: "Riley".into(),
        first_message: "hello".into(),
        system_prompt: "sp".into(),
        ..AssistantDraft::default()
    };
    let err = client
        .create_assistant("u-1", &draft)
        .await
        .expect_err("backend failure must propagate");
    match err {
        ApiError::Backend { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Error creating assistant: storage offline");
        }
        other => panic!("expected backend error, got {other:?}"),
    }
}

#[tokio::test]
async fn history_parses_entries_in_order() {
    let app = Router::new().route(
        "/history/{assistant_id}/{session_id}",
        get(|Path((assistant_id, session_id)): Path<(String, String)>| async move {
            assert_eq!(assistant_id, "a-1");
            assert_eq!(session_id, "1");
            Json(json!({
                "history": [
                    {
                        "id": 1,
                        "user_query": "hi",
                        "bot_response": "hello!",
                        "created_at": "2025-03-14T09:00:00+00:00"
                    },
                    {
                        "id": 2,
                        "user_query": "what is AUM?",
                        "bot_response": null,
                        "created_at": "2025-03-14T09:01:00+00:00"
                    }
                ]
            }))
        }),
    );
    let client = spawn_mock(app).await;

    let history = client
        .history(&SessionKey::new("a-1", "1"))
        .await
        .expect("history should succeed");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].bot_response.as_deref(), Some("hello!"));
    assert!(history[1].bot_response.is_none());
}

#[tokio::test]
async fn voice_chat_uploads_audio_and_language() {
    let app = Router::new().route(
        "/voice-chat/{assistant_id}/{session_id}",
        post(|multipart: Multipart| async move {
            let (fields, files) = collect_multipart(multipart).await;
            assert_eq!(fields["language"], "en");
            assert_eq!(files, vec![("recording.wav".to_string(), 8)]);
            Json(json!({
                "response": "Happy to help with onboarding.",
                "transcription": "how do I start lending",
                "language": "en"
            }))
        }),
    );
    let client = spawn_mock(app).await;

    let turn = client
        .voice_chat(
            &SessionKey::new("a-1", "1"),
            vec![0u8; 8],
            "recording.wav",
            "en",
        )
        .await
        .expect("voice turn should succeed");
    assert_eq!(turn.transcription, "how do I start lending");
    assert_eq!(turn.language.as_deref(), Some("en"));
}

#[tokio::test]
async fn sentiment_parses_the_aggregate() {
    let app = Router::new().route(
        "/sentiment/{assistant_id}/{session_id}",
        get(|| async {
            Json(json!({
                "assistant_id": "a-1",
                "session_id": "7",
                "sentiment": "Good",
                "message_count": 12
            }))
        }),
    );
    let client = spawn_mock(app).await;

    let sentiment = client
        .sentiment(&SessionKey::new("a-1", "7"))
        .await
        .expect("sentiment should succeed");
    assert_eq!(sentiment.session_id, "7");
    assert_eq!(sentiment.message_count, 12);
    assert_eq!(sentiment.label(), voxboard_types::SentimentLabel::Good);
}

#[tokio::test]
async fn chat_round_trips_a_text_turn() {
    let app = Router::new().route(
        "/chat/{assistant_id}/{session_id}",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["user_query"], "what is the minimum investment?");
            assert_eq!(body["session_id"], "1");
            Json(json!({
                "response": "Diversification starts from 100 rupees.",
                "assistant_id": "a-1",
                "session_id": "1"
            }))
        }),
    );
    let client = spawn_mock(app).await;

    let turn = client
        .chat(&SessionKey::new("a-1", "1"), "what is the minimum investment?")
        .await
        .expect("chat should succeed");
    assert!(turn.response.starts_with("Diversification"));
}

#[tokio::test]
async fn sessions_listing_and_creation() {
    let app = Router::new()
        .route(
            "/sessions/{assistant_id}",
            get(|| async { Json(json!({ "sessions": ["1", "7"] })) }),
        )
        .route(
            "/sessions/create",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["assistant_id"], "a-1");
                assert_eq!(body["session_id"], "8");
                Json(json!({ "message": "Session created", "session_id": "8" }))
            }),
        );
    let client = spawn_mock(app).await;

    let sessions = client
        .sessions_for_assistant("a-1")
        .await
        .expect("listing should succeed");
    assert_eq!(sessions, vec!["1", "7"]);

    client
        .create_session(&SessionKey::new("a-1", "8"))
        .await
        .expect("creation should succeed");
}
