use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use recipe_core::backends::{ObjectStore, RecordStore};
use recipe_core::protocol::RemoteJobs;
use recipe_databricks::api::DatabricksApi;
use recipe_databricks::backend::DatabricksJobs;
use recipe_databricks::statements::{StatementRecordStore, DEFAULT_IMAGE_TABLE};
use recipe_storage::local::LocalObjectStore;
use recipe_storage::s3::S3ObjectStore;
use recipe_storage::StorageBackendType;
use recipe_vision::openai::{CompletionParams, OpenAiVision};
use recipe_worker::{InMemoryTaskStore, TaskRegistry, WorkerPool};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recipe_api::config::{ExecutionMode, ServerConfig};
use recipe_api::router::build_app_router;
use recipe_api::state::AppState;

/// Notebook widget carrying the model API key in remote mode.
const NOTEBOOK_API_KEY_PARAM: &str = "openai_api_key";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "recipe_api=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        mode = config.execution_mode.name(),
        storage = config.storage.backend.name(),
        "Loaded server configuration",
    );

    // --- Backends ---
    let records = build_record_store(&config).await?;
    let objects = build_object_store(&config).await?;

    let (remote_jobs, tasks) = match config.execution_mode {
        ExecutionMode::Remote => (Some(Arc::new(build_remote_jobs(&config)?)), None),
        ExecutionMode::Local => {
            let registry = build_task_registry(&config, records.clone()).await?;
            (None, Some(Arc::new(registry)))
        }
    };

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        remote_jobs,
        tasks: tasks.clone(),
        objects,
        records,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().context("Invalid HOST address")?,
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    if let Some(tasks) = tasks {
        tasks.shutdown(config.shutdown_timeout()).await;
        tracing::info!("Task registry shut down");
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

fn databricks_api(config: &ServerConfig) -> Option<DatabricksApi> {
    config
        .databricks
        .as_ref()
        .map(|db| DatabricksApi::new(db.url.clone(), db.token.clone()))
}

/// Postgres when `DATABASE_URL` is set, else the Databricks SQL warehouse
/// when one is configured, else none.
async fn build_record_store(
    config: &ServerConfig,
) -> anyhow::Result<Option<Arc<dyn RecordStore>>> {
    if let Some(database_url) = &config.database_url {
        let pool = recipe_db::create_pool(database_url)
            .await
            .context("Failed to connect to database")?;
        tracing::info!("Database connection pool created");

        recipe_db::health_check(&pool)
            .await
            .context("Database health check failed")?;

        recipe_db::run_migrations(&pool)
            .await
            .context("Failed to run database migrations")?;
        tracing::info!("Database migrations applied");

        return Ok(Some(Arc::new(recipe_db::PgRecordStore::new(pool))));
    }

    let warehouse = config
        .databricks
        .as_ref()
        .and_then(|db| db.warehouse_id.clone());
    if let (Some(api), Some(warehouse_id)) = (databricks_api(config), warehouse) {
        let store = StatementRecordStore::new(api, warehouse_id, DEFAULT_IMAGE_TABLE)?;
        tracing::info!(table = DEFAULT_IMAGE_TABLE, "Using Databricks SQL record store");
        return Ok(Some(Arc::new(store)));
    }

    tracing::warn!("No record store configured; processed images will not be persisted");
    Ok(None)
}

async fn build_object_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn ObjectStore>> {
    let storage = &config.storage;
    Ok(match storage.backend {
        StorageBackendType::Local => Arc::new(LocalObjectStore::new(
            &storage.upload_dir,
            &storage.public_base_url,
        )),
        StorageBackendType::S3 => {
            let Some(bucket) = storage.s3_bucket.clone() else {
                bail!("STORAGE_BACKEND=s3 requires S3_BUCKET");
            };
            let expiry = Duration::from_secs(storage.presign_expiry_secs);
            Arc::new(S3ObjectStore::from_env(bucket, expiry).await)
        }
    })
}

fn build_remote_jobs(config: &ServerConfig) -> anyhow::Result<RemoteJobs> {
    let (Some(api), Some(job_id)) = (
        databricks_api(config),
        config.databricks.as_ref().and_then(|db| db.job_id),
    ) else {
        bail!("Remote mode requires DATABRICKS_URL, DATABRICKS_TOKEN and DATABRICKS_JOB_ID");
    };

    let mut backend = DatabricksJobs::new(api, job_id);
    if let Some(key) = &config.vision.api_key {
        backend = backend.with_param(NOTEBOOK_API_KEY_PARAM, key.clone());
    }
    tracing::info!(job_id, "Remote job backend ready");
    Ok(RemoteJobs::new(Arc::new(backend)))
}

async fn build_task_registry(
    config: &ServerConfig,
    records: Option<Arc<dyn RecordStore>>,
) -> anyhow::Result<TaskRegistry> {
    let Some(api_key) = config.vision.api_key.clone() else {
        bail!("Local mode requires OPENAI_API_KEY");
    };

    let params = CompletionParams {
        model: config.vision.model.clone(),
        ..CompletionParams::default()
    };
    let vision = OpenAiVision::new(config.vision.base_url.clone(), api_key, params)
        .context("Failed to build vision client")?;
    let prompt = recipe_vision::prompt::load_prompt(&config.vision.prompt_path).await;

    let mut registry = TaskRegistry::new(
        Arc::new(InMemoryTaskStore::new()),
        WorkerPool::new(config.worker_pool_size),
        Arc::new(vision),
        prompt,
        config.task_timeout(),
    );
    if let Some(records) = records {
        registry = registry.with_records(records);
    }
    tracing::info!(
        pool_size = config.worker_pool_size,
        model = %config.vision.model,
        "Local task registry ready",
    );
    Ok(registry)
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
