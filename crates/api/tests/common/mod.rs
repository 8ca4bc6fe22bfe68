#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use recipe_api::config::{ExecutionMode, ServerConfig, StorageConfig, VisionConfig};
use recipe_api::router::build_app_router;
use recipe_api::state::AppState;
use recipe_core::backends::{ObjectStore, RecordStore, VisionBackend};
use recipe_core::job::{Lifecycle, RunState};
use recipe_core::protocol::{BackendError, JobBackend, RemoteJobs};
use recipe_core::types::{InputRef, JobHandle};
use recipe_storage::StorageBackendType;
use recipe_worker::{InMemoryTaskStore, TaskRegistry, WorkerPool};
use serde_json::Value;
use tower::ServiceExt;

pub const BOUNDARY: &str = "recipe-test-boundary";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(mode: ExecutionMode) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        execution_mode: mode,
        max_upload_bytes: 1024 * 1024,
        poll_retry_after_secs: 5,
        worker_pool_size: 2,
        task_timeout_secs: 5,
        databricks: None,
        vision: VisionConfig {
            api_key: None,
            base_url: "http://localhost".to_string(),
            model: "gpt-4o-mini".to_string(),
            prompt_path: PathBuf::from("prompt.txt"),
        },
        storage: StorageConfig {
            // S3 keeps the router from mounting a static directory in tests.
            backend: StorageBackendType::S3,
            upload_dir: PathBuf::from("unused"),
            public_base_url: "http://localhost:3000".to_string(),
            s3_bucket: None,
            presign_expiry_secs: 3600,
        },
        database_url: None,
    }
}

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Job backend replaying a scripted sequence of run states per handle.
#[derive(Default)]
pub struct ScriptedJobs {
    pub started: Mutex<Vec<InputRef>>,
    pub states: Mutex<HashMap<String, VecDeque<RunState>>>,
    pub outputs: Mutex<HashMap<String, String>>,
    pub fail_start: bool,
}

impl ScriptedJobs {
    pub fn script(&self, handle: &str, states: Vec<RunState>, output: &str) {
        self.states
            .lock()
            .unwrap()
            .insert(handle.to_string(), states.into());
        self.outputs
            .lock()
            .unwrap()
            .insert(handle.to_string(), output.to_string());
    }
}

#[async_trait]
impl JobBackend for ScriptedJobs {
    async fn start(&self, input: &InputRef) -> Result<JobHandle, BackendError> {
        if self.fail_start {
            return Err("403 Forbidden".into());
        }
        let mut started = self.started.lock().unwrap();
        started.push(input.clone());
        Ok(JobHandle::new(format!("{}", 100 + started.len())))
    }

    async fn get_status(&self, handle: &JobHandle) -> Result<RunState, BackendError> {
        let mut states = self.states.lock().unwrap();
        let queue = states
            .get_mut(handle.as_str())
            .ok_or_else(|| BackendError::from("unknown run"))?;
        // The last scripted state repeats.
        Ok(if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap()
        })
    }

    async fn get_output(&self, handle: &JobHandle) -> Result<String, BackendError> {
        self.outputs
            .lock()
            .unwrap()
            .get(handle.as_str())
            .cloned()
            .ok_or_else(|| "no output".into())
    }

    fn accepts_handle(&self, handle: &JobHandle) -> bool {
        handle.as_str().parse::<i64>().is_ok()
    }
}

pub fn running() -> RunState {
    RunState::new(Lifecycle::Running)
}

pub fn succeeded() -> RunState {
    RunState::new(Lifecycle::Terminated).with_result(true)
}

/// Databricks-style delivery envelope around a `{status, data}` record.
pub fn delivered(result: Value) -> String {
    serde_json::json!({"notebook_output": {"result": result.to_string()}}).to_string()
}

#[derive(Default)]
pub struct MemoryObjects {
    pub puts: Mutex<Vec<(String, usize, String)>>,
}

#[async_trait]
impl ObjectStore for MemoryObjects {
    async fn put_object(
        &self,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BackendError> {
        self.puts
            .lock()
            .unwrap()
            .push((name.to_string(), bytes.len(), content_type.to_string()));
        Ok(format!("https://blob.test/{name}"))
    }
}

#[derive(Default)]
pub struct MemoryRecords {
    pub rows: Mutex<HashMap<String, String>>,
    pub inserts: AtomicUsize,
}

impl MemoryRecords {
    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for MemoryRecords {
    async fn insert(&self, name: &str, base64_blob: &str) -> Result<(), BackendError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.rows
            .lock()
            .unwrap()
            .insert(name.to_string(), base64_blob.to_string());
        Ok(())
    }

    async fn fetch(&self, name: &str) -> Result<Option<String>, BackendError> {
        Ok(self.rows.lock().unwrap().get(name).cloned())
    }
}

/// Vision backend answering with a fixed completion after `delay`.
pub struct FixedVision {
    pub content: String,
    pub delay: Duration,
    /// Image URLs received, in call order.
    pub seen: Mutex<Vec<String>>,
}

#[async_trait]
impl VisionBackend for FixedVision {
    async fn complete(&self, _prompt: &str, image: &InputRef) -> Result<Value, BackendError> {
        self.seen.lock().unwrap().push(image.to_image_url());
        tokio::time::sleep(self.delay).await;
        Ok(serde_json::json!({"choices": [{"message": {"content": self.content}}]}))
    }
}

// ---------------------------------------------------------------------------
// App builders
// ---------------------------------------------------------------------------

pub struct RemoteHarness {
    pub app: Router,
    pub jobs: Arc<ScriptedJobs>,
    pub objects: Arc<MemoryObjects>,
}

/// Remote-mode app over a scripted job backend.
pub fn build_remote_app(jobs: ScriptedJobs) -> RemoteHarness {
    let config = test_config(ExecutionMode::Remote);
    let jobs = Arc::new(jobs);
    let objects = Arc::new(MemoryObjects::default());

    let state = AppState {
        config: Arc::new(config.clone()),
        remote_jobs: Some(Arc::new(RemoteJobs::new(
            Arc::clone(&jobs) as Arc<dyn JobBackend>
        ))),
        tasks: None,
        objects: Arc::clone(&objects) as Arc<dyn ObjectStore>,
        records: None,
    };

    RemoteHarness {
        app: build_app_router(state, &config),
        jobs,
        objects,
    }
}

pub struct LocalHarness {
    pub app: Router,
    pub registry: Arc<TaskRegistry>,
    pub records: Arc<MemoryRecords>,
    pub objects: Arc<MemoryObjects>,
    pub vision: Arc<FixedVision>,
}

/// Local-mode app whose vision backend returns `content` after `delay`.
pub fn build_local_app(content: &str, delay: Duration) -> LocalHarness {
    let config = test_config(ExecutionMode::Local);
    let records = Arc::new(MemoryRecords::default());
    let objects = Arc::new(MemoryObjects::default());
    let vision = Arc::new(FixedVision {
        content: content.to_string(),
        delay,
        seen: Mutex::new(Vec::new()),
    });

    let registry = Arc::new(
        TaskRegistry::new(
            Arc::new(InMemoryTaskStore::new()),
            WorkerPool::new(config.worker_pool_size),
            Arc::clone(&vision) as Arc<dyn VisionBackend>,
            "Suggest recipes".to_string(),
            config.task_timeout(),
        )
        .with_records(Arc::clone(&records) as Arc<dyn RecordStore>),
    );

    let state = AppState {
        config: Arc::new(config.clone()),
        remote_jobs: None,
        tasks: Some(Arc::clone(&registry)),
        objects: Arc::clone(&objects) as Arc<dyn ObjectStore>,
        records: Some(Arc::clone(&records) as Arc<dyn RecordStore>),
    };

    LocalHarness {
        app: build_app_router(state, &config),
        registry,
        records,
        objects,
        vision,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Multipart body with one field. `filename: None` sends a plain form field.
pub fn multipart_body(field: &str, filename: Option<&str>, bytes: &[u8]) -> Vec<u8> {
    let disposition = match filename {
        Some(name) => format!("form-data; name=\"{field}\"; filename=\"{name}\""),
        None => format!("form-data; name=\"{field}\""),
    };
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: {disposition}\r\nContent-Type: image/jpeg\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn post_multipart(app: Router, uri: &str, body: Vec<u8>) -> Response<Body> {
    let request = Request::post(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Upload `bytes` as the `file` field under `filename`.
pub async fn upload(app: Router, uri: &str, filename: &str, bytes: &[u8]) -> Response<Body> {
    post_multipart(app, uri, multipart_body("file", Some(filename), bytes)).await
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
