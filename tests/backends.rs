//! HTTP backends against local stub servers.
//!
//! Each test binds an axum app on 127.0.0.1:0 that speaks just enough of the
//! remote protocol, then points the backend at it through the config.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pdf_abstractor::backend::{split_for_speech, GoogleTtsBackend, HuggingFaceBackend, MAX_CHUNK_CHARS};
use pdf_abstractor::{
    AbstractorConfig, BackendError, GenerationConfig, InferenceBackend, LanguageCode,
    SpeechBackend,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

// ── Hugging Face inference API ───────────────────────────────────────────────

#[derive(Clone, Default)]
struct HfStub {
    requests: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
}

async fn hf_handler(
    State(stub): State<HfStub>,
    Path(model): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    stub.requests
        .lock()
        .unwrap()
        .push((model.clone(), auth, body.clone()));

    match model.as_str() {
        "acme/summarizer" => {
            Json(json!([{ "summary_text": "<pad> The parties agree.</s>" }])).into_response()
        }
        "acme/translator" => {
            let tgt = body["parameters"]["tgt_lang"].as_str().unwrap_or("?");
            Json(json!([{ "translation_text": format!("__{tgt}__ Las partes acuerdan.") }]))
                .into_response()
        }
        "acme/loading" => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "Model acme/loading is currently loading", "estimated_time": 20.0 })),
        )
            .into_response(),
        "acme/private" => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid credentials in Authorization header" })),
        )
            .into_response(),
        _ => (StatusCode::NOT_FOUND, Json(json!({ "error": "Model not found" }))).into_response(),
    }
}

async fn hf_backend(summarizer: &str, translator: &str) -> (HuggingFaceBackend, HfStub) {
    let stub = HfStub::default();
    let app = Router::new()
        .route("/models/{*model}", post(hf_handler))
        .with_state(stub.clone());
    let base = spawn(app).await;

    let config = AbstractorConfig::builder()
        .hf_base_url(format!("{base}/models/"))
        .hf_api_token("hf_test_token")
        .summarization_model(summarizer)
        .translation_model(translator)
        .api_timeout_secs(5)
        .build()
        .unwrap();
    (HuggingFaceBackend::from_config(&config).unwrap(), stub)
}

#[tokio::test]
async fn hf_summarize_sends_generation_parameters() {
    let (backend, stub) = hf_backend("acme/summarizer", "acme/translator").await;

    let text = backend
        .summarize("A long contract.", &GenerationConfig::default())
        .await
        .unwrap();
    assert_eq!(text, "<pad> The parties agree.</s>");

    let requests = stub.requests.lock().unwrap();
    let (model, auth, body) = &requests[0];
    assert_eq!(model, "acme/summarizer");
    assert_eq!(auth.as_deref(), Some("Bearer hf_test_token"));
    assert_eq!(body["inputs"], "A long contract.");
    assert_eq!(body["parameters"]["num_beams"], 5);
    assert_eq!(body["parameters"]["max_length"], 512);
    assert_eq!(body["parameters"]["do_sample"], false);
    assert_eq!(body["options"]["wait_for_model"], true);
}

#[tokio::test]
async fn hf_wait_for_model_can_be_disabled() {
    let stub = HfStub::default();
    let app = Router::new()
        .route("/models/{*model}", post(hf_handler))
        .with_state(stub.clone());
    let base = spawn(app).await;
    let config = AbstractorConfig::builder()
        .hf_base_url(format!("{base}/models"))
        .summarization_model("acme/summarizer")
        .hf_wait_for_model(false)
        .api_timeout_secs(5)
        .build()
        .unwrap();
    let backend = HuggingFaceBackend::from_config(&config).unwrap();

    backend
        .summarize("A long contract.", &GenerationConfig::default())
        .await
        .unwrap();
    let requests = stub.requests.lock().unwrap();
    assert_eq!(requests[0].2["options"]["wait_for_model"], false);
}

#[tokio::test]
async fn hf_translate_sends_language_pair() {
    let (backend, stub) = hf_backend("acme/summarizer", "acme/translator").await;

    let text = backend
        .translate("The parties agree.", &"en".into(), &"es".into())
        .await
        .unwrap();
    assert_eq!(text, "__es__ Las partes acuerdan.");

    let requests = stub.requests.lock().unwrap();
    let (model, _, body) = &requests[0];
    assert_eq!(model, "acme/translator");
    assert_eq!(body["parameters"]["src_lang"], "en");
    assert_eq!(body["parameters"]["tgt_lang"], "es");
}

#[tokio::test]
async fn hf_loading_model_is_reported() {
    let (backend, _) = hf_backend("acme/loading", "acme/translator").await;
    let err = backend
        .summarize("text", &GenerationConfig::default())
        .await
        .unwrap_err();
    match err {
        BackendError::ModelLoading {
            model,
            estimated_secs,
        } => {
            assert_eq!(model, "acme/loading");
            assert_eq!(estimated_secs, 20.0);
        }
        other => panic!("expected ModelLoading, got {other:?}"),
    }
}

#[tokio::test]
async fn hf_bad_token_is_an_auth_error() {
    let (backend, _) = hf_backend("acme/private", "acme/translator").await;
    let err = backend
        .summarize("text", &GenerationConfig::default())
        .await
        .unwrap_err();
    assert!(
        matches!(err, BackendError::Auth { ref detail, .. } if detail.contains("Invalid credentials")),
        "got {err:?}"
    );
}

#[tokio::test]
async fn hf_unknown_model_is_an_http_error() {
    let (backend, _) = hf_backend("acme/missing", "acme/translator").await;
    let err = backend
        .summarize("text", &GenerationConfig::default())
        .await
        .unwrap_err();
    assert!(
        matches!(err, BackendError::Http { status: 404, ref body, .. } if body == "Model not found"),
        "got {err:?}"
    );
}

#[tokio::test]
async fn hf_unreachable_server_is_a_network_error() {
    let config = AbstractorConfig::builder()
        .hf_base_url("http://127.0.0.1:1/models")
        .api_timeout_secs(2)
        .build()
        .unwrap();
    let backend = HuggingFaceBackend::from_config(&config).unwrap();
    let err = backend
        .summarize("text", &GenerationConfig::default())
        .await
        .unwrap_err();
    assert!(
        matches!(err, BackendError::Network { .. } | BackendError::Timeout { .. }),
        "got {err:?}"
    );
}

// ── Google TTS ───────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct TtsStub {
    queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    fail_idx: Option<usize>,
}

async fn tts_handler(
    State(stub): State<TtsStub>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let idx: usize = q.get("idx").and_then(|i| i.parse().ok()).unwrap_or(0);
    stub.queries.lock().unwrap().push(q);
    if stub.fail_idx == Some(idx) {
        return (StatusCode::TOO_MANY_REQUESTS, "slow down").into_response();
    }
    format!("[chunk{idx}]").into_response()
}

async fn tts_backend(fail_idx: Option<usize>, slow: bool) -> (GoogleTtsBackend, TtsStub) {
    let stub = TtsStub {
        fail_idx,
        ..Default::default()
    };
    let app = Router::new()
        .route("/translate_tts", get(tts_handler))
        .with_state(stub.clone());
    let base = spawn(app).await;

    let config = AbstractorConfig::builder()
        .tts_base_url(base)
        .tts_slow(slow)
        .api_timeout_secs(5)
        .build()
        .unwrap();
    (GoogleTtsBackend::from_config(&config).unwrap(), stub)
}

#[tokio::test]
async fn tts_concatenates_chunks_in_order() {
    let (backend, stub) = tts_backend(None, false).await;
    let text = "The first party shall deliver the goods within thirty days of signature. \
                The second party shall pay the full price on delivery. \
                Either party may terminate on written notice.";
    let expected_chunks = split_for_speech(text, MAX_CHUNK_CHARS);
    assert!(expected_chunks.len() >= 2);

    let audio = backend.synthesize(text, &LanguageCode::new("en")).await.unwrap();

    let expected: String = (0..expected_chunks.len())
        .map(|i| format!("[chunk{i}]"))
        .collect();
    assert_eq!(String::from_utf8(audio).unwrap(), expected);

    let queries = stub.queries.lock().unwrap();
    assert_eq!(queries.len(), expected_chunks.len());
    for q in queries.iter() {
        assert_eq!(q["tl"], "en");
        assert_eq!(q["client"], "tw-ob");
        assert_eq!(q["ttsspeed"], "1");
        assert_eq!(q["total"], expected_chunks.len().to_string());
        let idx: usize = q["idx"].parse().unwrap();
        assert_eq!(q["q"], expected_chunks[idx]);
    }
}

#[tokio::test]
async fn tts_synthesis_runs_on_a_spawned_task() {
    let (backend, stub) = tts_backend(None, false).await;
    let backend = Arc::new(backend);
    let text = "The first party shall deliver the goods within thirty days of signature. \
                The second party shall pay the full price on delivery.";
    let chunks = split_for_speech(text, MAX_CHUNK_CHARS).len();

    let task = {
        let backend = Arc::clone(&backend);
        tokio::spawn(async move { backend.synthesize(text, &LanguageCode::new("en")).await })
    };
    let audio = task.await.unwrap().unwrap();

    let expected: String = (0..chunks).map(|i| format!("[chunk{i}]")).collect();
    assert_eq!(String::from_utf8(audio).unwrap(), expected);
    assert_eq!(stub.queries.lock().unwrap().len(), chunks);
}

#[tokio::test]
async fn tts_maps_language_codes_and_speed() {
    let (backend, stub) = tts_backend(None, true).await;
    backend
        .synthesize("שלום עולם.", &LanguageCode::new("he"))
        .await
        .unwrap();
    let queries = stub.queries.lock().unwrap();
    assert_eq!(queries[0]["tl"], "iw");
    assert_eq!(queries[0]["ttsspeed"], "0.3");
}

#[tokio::test]
async fn tts_failed_chunk_fails_the_call() {
    let (backend, _) = tts_backend(Some(1), false).await;
    let text = "One sentence that is long enough to need its own chunk on the wire. \
                Another sentence that is also long enough to need its own chunk.";
    let err = backend
        .synthesize(text, &LanguageCode::new("en"))
        .await
        .unwrap_err();
    assert!(
        matches!(err, BackendError::Http { status: 429, .. }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn tts_rejects_unpronounceable_text() {
    let (backend, stub) = tts_backend(None, false).await;
    let err = backend
        .synthesize(" ... !!! ", &LanguageCode::new("en"))
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Rejected(_)), "got {err:?}");
    assert!(stub.queries.lock().unwrap().is_empty());
}
