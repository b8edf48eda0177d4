//! Server test utilities.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bitpres_core::config::{
    AdminConfig, AppConfig, BatchConfig, MetadataConfig, ReplicaConfig, ScheduleConfig,
    ServerConfig, StorageConfig,
};
use bitpres_core::credentials::hash_secret;
use bitpres_core::{AdminRecord, Checksum, ReplicaId, ReplicaKind};
use bitpres_metadata::AdminDataStore;
use bitpres_server::{AppState, Services, create_router};
use bytes::Bytes;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;
use time::OffsetDateTime;
use tower::ServiceExt;

/// Operator token matching `AdminConfig::for_testing`.
#[allow(dead_code)]
pub const ADMIN_TOKEN: &str = "test-admin-token";

/// Replica credential configured on every test replica.
#[allow(dead_code)]
pub const CREDENTIALS: &str = "test-credentials";

/// Configuration for two bit archives and a checksum archive under `root`.
#[allow(dead_code)]
pub fn test_config(root: &Path) -> AppConfig {
    let replica = |id: &str, kind: ReplicaKind| ReplicaConfig {
        id: id.to_string(),
        name: None,
        kind,
        storage: StorageConfig::Filesystem {
            path: root.join("replicas").join(id),
        },
        credentials_hash: Some(hash_secret(CREDENTIALS)),
    };
    AppConfig {
        server: ServerConfig::default(),
        admin: AdminConfig::for_testing(),
        metadata: MetadataConfig::Sqlite {
            path: root.join("admin.db"),
            query_timeout_secs: None,
        },
        replicas: vec![
            replica("ONE", ReplicaKind::BitArchive),
            replica("TWO", ReplicaKind::BitArchive),
            replica("CS", ReplicaKind::ChecksumArchive),
        ],
        batch: BatchConfig {
            list_files_timeout_secs: 30,
            checksum_timeout_secs: 30,
            ..Default::default()
        },
        schedule: ScheduleConfig::default(),
    }
}

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    services: Services,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server with temporary replicas and admin data.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        bitpres_server::metrics::register_metrics();
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let mut config = test_config(temp_dir.path());
        modifier(&mut config);

        let services = Services::start(config)
            .await
            .expect("Failed to start services");
        let state = services.state.clone();
        let router = create_router(state.clone());

        Self {
            router,
            state,
            services,
            _temp_dir: temp_dir,
        }
    }

    /// Record a file in admin data with the digest of `content`.
    pub async fn admit(&self, filename: &str, content: &[u8]) {
        let record = AdminRecord::new(
            filename,
            Checksum::compute(content),
            OffsetDateTime::now_utc(),
        )
        .unwrap();
        self.state.metadata.put_admin_record(&record).await.unwrap();
    }

    /// Store a file on a replica.
    pub async fn put(&self, replica: &str, filename: &str, content: &[u8]) {
        self.state
            .replicas
            .get(&ReplicaId::parse(replica).unwrap())
            .unwrap()
            .store_file(filename, Bytes::copy_from_slice(content))
            .await
            .unwrap();
    }

    /// Overwrite a file on a bit archive.
    pub async fn corrupt(&self, replica: &str, filename: &str, content: &[u8]) {
        self.state
            .replicas
            .get(&ReplicaId::parse(replica).unwrap())
            .unwrap()
            .store()
            .put(filename, Bytes::copy_from_slice(content))
            .await
            .unwrap();
    }

    /// Send a request and decode the JSON response body.
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        auth_token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = auth_token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let body = match body {
            Some(v) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(serde_json::to_vec(&v).unwrap())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request("GET", uri, None, None).await
    }

    /// POST with the operator token.
    pub async fn post(&self, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.request("POST", uri, body, Some(ADMIN_TOKEN)).await
    }

    /// Stop agents and wait for them.
    pub async fn shutdown(self) {
        self.services.shutdown().await;
    }
}
