//! Shared test helpers for integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use porter_api::{AppState, build_router};
use porter_core::config::AppConfig;
use porter_core::config::jobs::JobsConfig;
use porter_core::config::logging::LoggingConfig;
use porter_core::config::storage::StorageConfig;
use porter_core::config::targets::TargetDefinition;

/// Test application context: the router plus the roots of the registered
/// localdir targets.
pub struct TestApp {
    /// The Axum router for making test requests.
    pub router: Router,
    /// Root of the `src` target.
    pub source_root: PathBuf,
    /// Root of the `dst` target.
    pub dest_root: PathBuf,
    /// Root of the flat `vault` target.
    pub vault_root: PathBuf,
    _tmp: TempDir,
}

impl TestApp {
    /// Create a test application with four localdir targets: `src` and
    /// `dst` with full capabilities, a download-only `archive`, and a
    /// flat `vault` that cannot hold directory trees.
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().expect("Failed to create temp dir");
        let source_root = tmp.path().join("src");
        let dest_root = tmp.path().join("dst");
        let archive_root = tmp.path().join("archive");
        let vault_root = tmp.path().join("vault");
        fs::create_dir_all(&source_root).expect("Failed to create source root");
        fs::create_dir_all(&dest_root).expect("Failed to create dest root");
        fs::create_dir_all(&archive_root).expect("Failed to create archive root");
        fs::create_dir_all(&vault_root).expect("Failed to create vault root");

        let config = AppConfig {
            server: serde_json::from_value(serde_json::json!({}))
                .expect("Failed to build server defaults"),
            jobs: JobsConfig {
                cancel_poll_attempts: 10,
                cancel_poll_millis: 10,
                ..JobsConfig::default()
            },
            storage: StorageConfig {
                data_root: tmp.path().join("work").display().to_string(),
            },
            targets: vec![
                target_definition("src", &source_root, true, true, true),
                target_definition("dst", &dest_root, true, true, true),
                target_definition("archive", &archive_root, true, false, true),
                target_definition("vault", &vault_root, true, true, false),
            ],
            logging: LoggingConfig::default(),
        };

        let state = AppState::from_config(config).expect("Failed to build state");
        Self {
            router: build_router(state),
            source_root,
            dest_root,
            vault_root,
            _tmp: tmp,
        }
    }

    /// Seed the `src` target with a small project.
    pub fn seed_source_project(&self) {
        fs::create_dir_all(self.source_root.join("project/docs")).expect("Failed to mkdir");
        fs::write(self.source_root.join("project/readme.txt"), b"hello")
            .expect("Failed to write");
        fs::write(self.source_root.join("project/docs/a.txt"), b"alpha")
            .expect("Failed to write");
    }

    /// Send a request and parse the response body as JSON where possible.
    pub async fn send(
        &self,
        method: &str,
        path: &str,
        headers: &[(&str, &str)],
        content_type: Option<&str>,
        body: Vec<u8>,
    ) -> TestResponse {
        let mut req = Request::builder().method(method).uri(path);
        if let Some(content_type) = content_type {
            req = req.header("Content-Type", content_type);
        }
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        let req = req.body(Body::from(body)).expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let raw = axum::body::to_bytes(response.into_body(), 64 * 1024 * 1024)
            .await
            .expect("Failed to read body")
            .to_vec();
        let body: Value = serde_json::from_slice(&raw).unwrap_or(Value::Null);

        TestResponse { status, body, raw }
    }

    /// JSON request shorthand.
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let bytes = body
            .map(|b| serde_json::to_vec(&b).expect("Failed to serialize body"))
            .unwrap_or_default();
        self.send(method, path, headers, Some("application/json"), bytes)
            .await
    }

    /// Poll a job until its record is terminal.
    pub async fn poll_until_terminal(
        &self,
        ticket: &str,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        for _ in 0..500 {
            let response = self
                .request("GET", &format!("/api/jobs/{ticket}"), None, headers)
                .await;
            if response.status != StatusCode::ACCEPTED {
                return response;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("Job '{ticket}' never reached a terminal state");
    }
}

fn target_definition(
    name: &str,
    root: &Path,
    allow_download: bool,
    allow_upload: bool,
    nested_hierarchy: bool,
) -> TargetDefinition {
    TargetDefinition {
        name: name.to_string(),
        kind: "localdir".to_string(),
        root: root.display().to_string(),
        nested_hierarchy,
        allow_download,
        allow_upload,
    }
}

/// Build a `multipart/form-data` body holding one `file` part.
pub fn multipart_body(file_bytes: &[u8]) -> (String, Vec<u8>) {
    let boundary = "porter-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"bag.zip\"\r\nContent-Type: application/zip\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(file_bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}

/// Response from a test request.
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Parsed JSON body (`Null` when the body is not JSON).
    pub body: Value,
    /// Raw body bytes.
    pub raw: Vec<u8>,
}
