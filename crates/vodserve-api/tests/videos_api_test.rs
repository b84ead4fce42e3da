//! End-to-end tests for the HTTP surface, driven through the router with an
//! in-memory repository and a fake transcoder so neither Postgres nor ffmpeg
//! is required.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::tempdir;
use tower::ServiceExt;
use uuid::Uuid;

use vodserve_api::setup::routes::setup_routes;
use vodserve_api::state::AppState;
use vodserve_core::{Config, ThumbnailStrategy};
use vodserve_db::InMemoryVideoRepository;
use vodserve_processing::{
    AssetPublisher, IngestionOrchestrator, TranscodeError, TranscodeOutput, Transcoder,
};
use vodserve_storage::StagingStore;

const BOUNDARY: &str = "vodserve-test-boundary";

/// Produces a minimal playable HLS layout without invoking ffmpeg.
struct FakeTranscoder;

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn transcode(
        &self,
        _input_path: &Path,
        output_dir: &Path,
    ) -> Result<TranscodeOutput, TranscodeError> {
        tokio::fs::create_dir_all(output_dir).await.unwrap();
        let playlist_path = output_dir.join("index.m3u8");
        tokio::fs::write(
            &playlist_path,
            "#EXTM3U\n#EXTINF:10.0,\nsegment000.ts\n#EXT-X-ENDLIST\n",
        )
        .await
        .unwrap();
        tokio::fs::write(output_dir.join("segment000.ts"), b"mpegts")
            .await
            .unwrap();
        let thumbnail_path = output_dir.join("thumbnail.jpg");
        tokio::fs::write(&thumbnail_path, b"jpeg").await.unwrap();
        Ok(TranscodeOutput {
            dir: output_dir.to_path_buf(),
            playlist_path,
            thumbnail_path,
        })
    }
}

struct TestApp {
    router: Router,
    repository: Arc<InMemoryVideoRepository>,
    media_root: PathBuf,
    staging_dir: PathBuf,
    _dir: tempfile::TempDir,
}

async fn test_app() -> TestApp {
    test_app_with_cap(1024 * 1024).await
}

async fn test_app_with_cap(max_upload_bytes: u64) -> TestApp {
    let dir = tempdir().unwrap();
    let media_root = dir.path().join("uploads");
    let staging_dir = dir.path().join("staging");
    tokio::fs::create_dir_all(&media_root).await.unwrap();

    let config = Config {
        server_port: 8000,
        cors_origins: vec!["http://localhost:5173".to_string()],
        database_url: String::new(),
        db_max_connections: 1,
        public_base_url: "http://localhost:8000".to_string(),
        media_root: media_root.clone(),
        staging_dir: staging_dir.clone(),
        max_upload_bytes,
        video_allowed_content_types: vec![
            "video/mp4".to_string(),
            "video/webm".to_string(),
            "video/ogg".to_string(),
        ],
        ffmpeg_path: "ffmpeg".to_string(),
        hls_segment_duration: 10,
        thumbnail_width: 640,
        thumbnail_height: 360,
        thumbnail_strategy: ThumbnailStrategy::SinglePass,
    };

    let staging = StagingStore::new(
        &config.staging_dir,
        config.max_upload_bytes,
        config.video_allowed_content_types.clone(),
    )
    .await
    .unwrap();

    let repository = Arc::new(InMemoryVideoRepository::new());
    let orchestrator = IngestionOrchestrator::new(
        staging,
        Arc::new(FakeTranscoder),
        AssetPublisher::new(&config.public_base_url),
        repository.clone(),
        &config.media_root,
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        orchestrator,
        repository: repository.clone(),
    });

    let router = setup_routes(&config, state).unwrap();

    TestApp {
        router,
        repository,
        media_root,
        staging_dir,
        _dir: dir,
    }
}

fn mp4_payload(extra_len: usize) -> Vec<u8> {
    let mut data = vec![0x00, 0x00, 0x00, 0x20];
    data.extend_from_slice(b"ftypisom");
    data.extend_from_slice(&vec![0u8; extra_len]);
    data
}

fn multipart_body(
    file: Option<(&str, &str, &[u8])>,
    description: Option<&str>,
) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    if let Some((filename, content_type, bytes)) = file {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    if let Some(description) = description {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"description\"\r\n\r\n");
        body.extend_from_slice(description.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (
        format!("multipart/form-data; boundary={}", BOUNDARY),
        body,
    )
}

fn upload_request(file: Option<(&str, &str, &[u8])>, description: Option<&str>) -> Request<Body> {
    let (content_type, body) = multipart_body(file, description);
    Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn dir_entry_count(dir: &Path) -> usize {
    let mut count = 0;
    let mut entries = tokio::fs::read_dir(dir).await.unwrap();
    while entries.next_entry().await.unwrap().is_some() {
        count += 1;
    }
    count
}

#[tokio::test]
async fn test_upload_then_list_get_and_play() {
    let app = test_app().await;

    let payload = mp4_payload(256);
    let response = app
        .router
        .clone()
        .oneshot(upload_request(
            Some(("holiday.mp4", "video/mp4", &payload)),
            Some("Surfing at dawn"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["message"], "Video uploaded successfully");
    assert_eq!(json["video"]["title"], "holiday.mp4");
    assert_eq!(json["video"]["description"], "Surfing at dawn");

    let id = json["video"]["id"].as_str().unwrap().to_string();
    let video_path = json["video"]["videoPath"].as_str().unwrap();
    assert_eq!(
        video_path,
        format!("http://localhost:8000/uploads/videos/{}/index.m3u8", id)
    );
    assert!(json["video"]["thumbnailPath"]
        .as_str()
        .unwrap()
        .ends_with(&format!("/uploads/videos/{}/thumbnail.jpg", id)));

    // The staged input is gone once the pipeline finished.
    assert_eq!(dir_entry_count(&app.staging_dir).await, 0);

    // The playlist on disk references a segment that exists next to it.
    let asset_dir = app.media_root.join("videos").join(&id);
    let manifest = tokio::fs::read_to_string(asset_dir.join("index.m3u8"))
        .await
        .unwrap();
    assert!(manifest.contains("segment000.ts"));
    assert!(asset_dir.join("segment000.ts").exists());

    // Listing returns the new record.
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/videos")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let list = json_body(response).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["id"], id.as_str());

    // Fetch by id.
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/videos/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let record = json_body(response).await;
    assert_eq!(record["videoPath"], video_path);

    // The playlist is byte-served under /uploads.
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/uploads/videos/{}/index.m3u8", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(std::str::from_utf8(&bytes).unwrap().contains("#EXTM3U"));
}

#[tokio::test]
async fn test_missing_description_gets_placeholder() {
    let app = test_app().await;

    let payload = mp4_payload(64);
    let response = app
        .router
        .clone()
        .oneshot(upload_request(Some(("clip.mp4", "video/mp4", &payload)), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["video"]["description"], "No description");
}

#[tokio::test]
async fn test_non_video_upload_rejected_without_side_effects() {
    let app = test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(upload_request(
            Some(("report.pdf", "application/pdf", b"%PDF-1.7 definitely not video")),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let json = json_body(response).await;
    assert!(json["message"].as_str().unwrap().contains("application/pdf"));
    assert_eq!(json["code"], "UNSUPPORTED_MEDIA_TYPE");

    // Nothing staged, nothing published, nothing recorded.
    assert_eq!(dir_entry_count(&app.staging_dir).await, 0);
    assert!(!app.media_root.join("videos").exists());
    assert!(app.repository.is_empty());
}

#[tokio::test]
async fn test_upload_larger_than_two_megabytes_accepted_within_cap() {
    // The router-level body limit must track the configured cap, not any
    // framework default.
    let app = test_app_with_cap(64 * 1024 * 1024).await;

    let payload = mp4_payload(3 * 1024 * 1024);
    let response = app
        .router
        .clone()
        .oneshot(upload_request(Some(("large.mp4", "video/mp4", &payload)), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["video"]["title"], "large.mp4");
}

#[tokio::test]
async fn test_oversized_upload_returns_413() {
    let app = test_app().await;

    // Config caps uploads at 1 MiB.
    let payload = mp4_payload(2 * 1024 * 1024);
    let response = app
        .router
        .clone()
        .oneshot(upload_request(Some(("big.mp4", "video/mp4", &payload)), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(dir_entry_count(&app.staging_dir).await, 0);
}

#[tokio::test]
async fn test_upload_without_file_field_is_400() {
    let app = test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(upload_request(None, Some("only a description")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = json_body(response).await;
    assert_eq!(json["message"], "No file provided");
}

#[tokio::test]
async fn test_get_unknown_video_is_404_with_message() {
    let app = test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/videos/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = json_body(response).await;
    assert_eq!(json["message"], "Video not found");
}

#[tokio::test]
async fn test_malformed_id_returns_structured_400() {
    let app = test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/videos/not-a-uuid")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Same structured body as every other error path.
    let json = json_body(response).await;
    assert_eq!(json["code"], "INVALID_INPUT");
    assert!(json["message"].as_str().unwrap().starts_with("Invalid path parameter"));
    assert_eq!(json["recoverable"], false);
}

#[tokio::test]
async fn test_persistence_failure_returns_500_with_generic_message() {
    let app = test_app().await;
    app.repository.fail_creates(true);

    let payload = mp4_payload(64);
    let response = app
        .router
        .clone()
        .oneshot(upload_request(Some(("clip.mp4", "video/mp4", &payload)), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = json_body(response).await;
    assert_eq!(json["message"], "Error saving video metadata");
}

#[tokio::test]
async fn test_cors_preflight_allows_configured_origin() {
    let app = test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/upload")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:5173")
    );
}

#[tokio::test]
async fn test_concurrent_uploads_produce_distinct_assets() {
    let app = test_app().await;

    let mut handles = Vec::new();
    for i in 0..4 {
        let router = app.router.clone();
        handles.push(tokio::spawn(async move {
            let payload = mp4_payload(128);
            let response = router
                .oneshot(upload_request(
                    Some((&format!("clip{}.mp4", i), "video/mp4", &payload)),
                    None,
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let json = json_body(response).await;
            json["video"]["id"].as_str().unwrap().to_string()
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);
    assert_eq!(app.repository.len(), 4);
}
