//! Test helpers: build AppState and router against mocked remove.bg and Replicate servers.
//!
//! Run from workspace root: `cargo test -p pixlift-api`.

#![allow(dead_code)]

pub mod fixtures;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use mockito::{Mock, ServerGuard};
use pixlift_api::setup::{routes, services};
use pixlift_core::config::{DEFAULT_REMOVE_BG_API_URL, DEFAULT_REPLICATE_MODEL_VERSION};
use pixlift_core::{
    BaseConfig, Config, LogFormat, RemoveBgConfig, ReplicateConfig, UploadConfig,
};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

pub const TEST_REMOVE_BG_KEY: &str = "test-remove-bg-key";
pub const TEST_REPLICATE_TOKEN: &str = "r8_test_token";
pub const TEST_MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Test application: server, mocked collaborators, and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub remove_bg: ServerGuard,
    pub replicate: ServerGuard,
    pub upload_dir: PathBuf,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Number of artifacts currently stored.
    pub fn artifact_count(&self) -> usize {
        std::fs::read_dir(&self.upload_dir)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    pub fn poll_url(&self, prediction_id: &str) -> String {
        format!("{}/predictions/{}", self.replicate.url(), prediction_id)
    }

    /// remove.bg answers with a cut-out PNG.
    pub async fn mock_remove_bg_success(&mut self, png: Vec<u8>) -> Mock {
        self.remove_bg
            .mock("POST", "/v1.0/removebg")
            .match_header("x-api-key", TEST_REMOVE_BG_KEY)
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(png)
            .create_async()
            .await
    }

    /// Replicate accepts the prediction and points at its poll URL.
    pub async fn mock_submit(&mut self, prediction_id: &str) -> Mock {
        let body = serde_json::json!({
            "id": prediction_id,
            "status": "starting",
            "urls": { "get": self.poll_url(prediction_id) }
        });
        self.replicate
            .mock("POST", "/predictions")
            .match_header("authorization", format!("Bearer {}", TEST_REPLICATE_TOKEN).as_str())
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await
    }

    /// Every poll of the prediction returns `body`; the mock expects exactly `hits` polls.
    pub async fn mock_poll(
        &mut self,
        prediction_id: &str,
        body: serde_json::Value,
        hits: usize,
    ) -> Mock {
        self.replicate
            .mock("GET", format!("/predictions/{}", prediction_id).as_str())
            .match_header("authorization", format!("Bearer {}", TEST_REPLICATE_TOKEN).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .expect(hits)
            .create_async()
            .await
    }
}

pub fn create_test_config(
    environment: &str,
    remove_bg_url: String,
    replicate_base: String,
    upload_dir: &std::path::Path,
    poll_interval: Duration,
    poll_max_attempts: u32,
) -> Config {
    Config {
        base: BaseConfig {
            server_port: 0,
            cors_origins: vec!["*".to_string()],
            environment: environment.to_string(),
            http_concurrency_limit: 64,
            log_format: LogFormat::Pretty,
            outbound_timeout: Duration::from_secs(5),
        },
        remove_bg: RemoveBgConfig {
            api_key: TEST_REMOVE_BG_KEY.to_string(),
            api_url: remove_bg_url,
        },
        replicate: ReplicateConfig {
            api_token: TEST_REPLICATE_TOKEN.to_string(),
            api_base: replicate_base,
            model_version: DEFAULT_REPLICATE_MODEL_VERSION.to_string(),
            poll_interval,
            poll_max_attempts,
        },
        uploads: UploadConfig {
            upload_dir: upload_dir.to_string_lossy().into_owned(),
            public_base_url: "/uploads".to_string(),
            max_file_size_bytes: TEST_MAX_FILE_SIZE,
            allowed_content_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/webp".to_string(),
            ],
        },
    }
}

/// Setup test app with the given poll policy.
pub async fn setup_test_app_with_polling(poll_interval: Duration, poll_max_attempts: u32) -> TestApp {
    build_test_app("test", poll_interval, poll_max_attempts).await
}

/// Setup test app running under the given `ENVIRONMENT` value.
pub async fn setup_test_app_in_environment(environment: &str) -> TestApp {
    build_test_app(environment, Duration::from_millis(10), 5).await
}

async fn build_test_app(
    environment: &str,
    poll_interval: Duration,
    poll_max_attempts: u32,
) -> TestApp {
    let remove_bg = mockito::Server::new_async().await;
    let replicate = mockito::Server::new_async().await;

    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let upload_dir = temp_dir.path().join("uploads");

    let config = create_test_config(
        environment,
        format!("{}/v1.0/removebg", remove_bg.url()),
        replicate.url(),
        &upload_dir,
        poll_interval,
        poll_max_attempts,
    );
    assert_ne!(config.remove_bg.api_url, DEFAULT_REMOVE_BG_API_URL);

    let state = services::initialize_services(&config)
        .await
        .expect("Failed to initialize services");
    let app = routes::setup_routes(&config, state).expect("Failed to setup routes");

    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        remove_bg,
        replicate,
        upload_dir,
        _temp_dir: temp_dir,
    }
}

/// Setup test app with a fast poll policy (10 ms interval, 5 attempts).
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with_polling(Duration::from_millis(10), 5).await
}

/// Multipart form with a single `image` field.
pub fn image_form(data: Vec<u8>, filename: &str, mime_type: &str) -> MultipartForm {
    let part = Part::bytes(bytes::Bytes::from(data))
        .file_name(filename.to_string())
        .mime_type(mime_type.to_string());
    MultipartForm::new().add_part("image", part)
}
