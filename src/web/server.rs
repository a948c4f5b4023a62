use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::{collections::HashMap, env, error::Error, net::SocketAddr, sync::Arc};
use tokio::{net::TcpListener, task};
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use heart_sound::analysis::{
    self, AnalysisConfig, AnalysisError, AnalysisResult, RecordingComparison,
};
use heart_sound::audio;
use heart_sound::config::{self, ServerConfig};

// App state
struct AppState {
    analysis: AnalysisConfig,
}

// Response for a single analysis
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisResponse {
    analysis_id: Uuid,
    #[serde(flatten)]
    result: AnalysisResult,
}

// Response for a side-by-side comparison
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ComparisonResponse {
    comparison_id: Uuid,
    #[serde(flatten)]
    comparison: RecordingComparison,
}

type HandlerError = (StatusCode, String);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "heart_sound_web=debug,heart_sound=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::load_config()?;
    let server = config.server.unwrap_or_default();

    // Command line port wins over config.toml
    let port = parse_port_from_args().unwrap_or(server.port);

    let state = Arc::new(AppState {
        analysis: config.analysis,
    });

    let app = router(state, &server);

    // Start server
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!("Listening on http://localhost:{}", port);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: Arc<AppState>, server: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/analyze", post(analyze_handler))
        .route("/compare", post(compare_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::default().include_headers(true)),
                )
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(server.max_file_size_bytes())),
        )
}

// Parse port from command line arguments
// Format: --port XXXX or -p XXXX
fn parse_port_from_args() -> Option<u16> {
    let args: Vec<String> = env::args().collect();

    args.windows(2)
        .find(|pair| pair[0] == "--port" || pair[0] == "-p")
        .and_then(|pair| pair[1].parse::<u16>().ok())
}

// Map pipeline errors to HTTP responses
fn error_response(err: AnalysisError) -> HandlerError {
    let status = match err {
        AnalysisError::Decode(_) | AnalysisError::InvalidParams(_) | AnalysisError::Io(_) => {
            StatusCode::BAD_REQUEST
        }
        AnalysisError::InsufficientData { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        AnalysisError::Computation(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::warn!("Analysis failed ({}): {}", status, err);
    (status, err.to_string())
}

// Accept audio/wav style content types, or a .wav file name as a fallback
fn is_wav_upload(content_type: Option<&str>, file_name: Option<&str>) -> bool {
    let by_type = content_type
        .and_then(|ct| ct.parse::<mime::Mime>().ok())
        .map_or(false, |m| {
            m.type_() == mime::AUDIO
                && matches!(m.subtype().as_str(), "wav" | "wave" | "x-wav" | "vnd.wave")
        });
    let by_name = file_name.map_or(false, |name| name.to_ascii_lowercase().ends_with(".wav"));
    by_type || by_name
}

// Read the named WAV fields of a multipart form
async fn collect_uploads(
    mut multipart: Multipart,
    wanted: &[&str],
) -> Result<HashMap<String, Bytes>, HandlerError> {
    let mut uploads = HashMap::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to process form: {}", e),
        )
    })? {
        let name = field.name().unwrap_or("").to_string();
        if !wanted.contains(&name.as_str()) {
            continue;
        }

        if !is_wav_upload(field.content_type(), field.file_name()) {
            return Err((
                StatusCode::BAD_REQUEST,
                "Only WAV files (.wav) are accepted".to_string(),
            ));
        }

        let data = field.bytes().await.map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                format!("Failed to read file: {}", e),
            )
        })?;
        uploads.insert(name, data);
    }

    for name in wanted {
        if !uploads.contains_key(*name) {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("Missing WAV file field: {}", name),
            ));
        }
    }

    Ok(uploads)
}

// Handler for the index page
async fn index_handler() -> impl IntoResponse {
    let html = include_str!("static/index.html");
    Html(html)
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// Handler for analyzing one uploaded recording
async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HandlerError> {
    let mut uploads = collect_uploads(multipart, &["audio_file"]).await?;
    let bytes = uploads.remove("audio_file").unwrap_or_default();
    let analysis_id = Uuid::new_v4();
    tracing::debug!("Analysis {}: {} bytes uploaded", analysis_id, bytes.len());

    // Decoding and DSP are CPU-bound; keep them off the async workers
    let config = state.analysis.clone();
    let result = task::spawn_blocking(move || {
        analysis::analyze_decoded(audio::decode_wav_bytes(&bytes), &config)
    })
    .await
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Analysis task failed: {}", e),
        )
    })?
    .map_err(error_response)?;

    Ok(Json(AnalysisResponse {
        analysis_id,
        result,
    }))
}

// Handler for comparing two uploaded recordings
async fn compare_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HandlerError> {
    let mut uploads = collect_uploads(multipart, &["recording_a", "recording_b"]).await?;
    let first = uploads.remove("recording_a").unwrap_or_default();
    let second = uploads.remove("recording_b").unwrap_or_default();
    let comparison_id = Uuid::new_v4();

    let config = state.analysis.clone();
    let comparison = task::spawn_blocking(move || {
        let first = audio::decode_wav_bytes(&first)?;
        let second = audio::decode_wav_bytes(&second)?;
        analysis::compare_recordings(&first, &second, &config)
    })
    .await
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Comparison task failed: {}", e),
        )
    })?
    .map_err(error_response)?;

    Ok(Json(ComparisonResponse {
        comparison_id,
        comparison,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_upload_detection() {
        assert!(is_wav_upload(Some("audio/wav"), None));
        assert!(is_wav_upload(Some("audio/x-wav"), Some("beat.bin")));
        assert!(is_wav_upload(Some("application/octet-stream"), Some("Beat.WAV")));
        assert!(!is_wav_upload(Some("audio/mpeg"), Some("beat.mp3")));
        assert!(!is_wav_upload(None, None));
    }

    #[test]
    fn test_error_status_mapping() {
        let (status, _) = error_response(AnalysisError::InsufficientData {
            samples: 0,
            segment_samples: 441,
        });
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let (status, _) = error_response(AnalysisError::Decode("bad header".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
