use std::path::PathBuf;
use std::time::Duration;

use recipe_core::error::CoreError;
use recipe_core::upload::DEFAULT_MAX_UPLOAD_BYTES;
use recipe_storage::StorageBackendType;

/// Where recipe jobs execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// A Databricks notebook run per photo, polled by run id.
    Remote,
    /// In-process inference on a bounded worker pool, polled by filename.
    Local,
}

impl ExecutionMode {
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "remote" => Ok(Self::Remote),
            "local" => Ok(Self::Local),
            other => Err(CoreError::Validation(format!(
                "Unknown execution mode '{other}'. Must be one of: remote, local"
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Local => "local",
        }
    }
}

/// Databricks workspace settings.
#[derive(Debug, Clone)]
pub struct DatabricksConfig {
    pub url: String,
    pub token: String,
    /// Required for remote execution.
    pub job_id: Option<i64>,
    /// Enables the SQL warehouse record store.
    pub warehouse_id: Option<String>,
}

/// Vision model settings.
#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub prompt_path: PathBuf,
}

/// Object storage settings.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackendType,
    pub upload_dir: PathBuf,
    pub public_base_url: String,
    pub s3_bucket: Option<String>,
    pub presign_expiry_secs: u64,
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Budget for draining background work on shutdown (default: `30`).
    pub shutdown_timeout_secs: u64,
    pub execution_mode: ExecutionMode,
    /// Multipart body limit in bytes (default: 10 MiB).
    pub max_upload_bytes: usize,
    /// `Retry-After` value for jobs that are still running (default: `5`).
    pub poll_retry_after_secs: u64,
    /// Local-mode concurrency (default: `4`).
    pub worker_pool_size: usize,
    /// Local-mode bound on one computation (default: `120`).
    pub task_timeout_secs: u64,
    /// Set when `DATABRICKS_URL` and `DATABRICKS_TOKEN` are both present.
    pub databricks: Option<DatabricksConfig>,
    pub vision: VisionConfig,
    pub storage: StorageConfig,
    /// Enables the Postgres record store.
    pub database_url: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                    |
    /// |---------------------------|----------------------------|
    /// | `HOST`                    | `0.0.0.0`                  |
    /// | `PORT`                    | `3000`                     |
    /// | `CORS_ORIGINS`            | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`   | `30`                       |
    /// | `EXECUTION_MODE`          | `remote`                   |
    /// | `MAX_UPLOAD_BYTES`        | `10485760`                 |
    /// | `POLL_RETRY_AFTER_SECS`   | `5`                        |
    /// | `WORKER_POOL_SIZE`        | `4`                        |
    /// | `TASK_TIMEOUT_SECS`       | `120`                      |
    /// | `DATABRICKS_URL`          | unset                      |
    /// | `DATABRICKS_TOKEN`        | unset                      |
    /// | `DATABRICKS_JOB_ID`       | unset                      |
    /// | `DATABRICKS_WAREHOUSE_ID` | unset                      |
    /// | `OPENAI_API_KEY`          | unset                      |
    /// | `OPENAI_BASE_URL`         | `https://api.openai.com`   |
    /// | `OPENAI_MODEL`            | `gpt-4o-mini`              |
    /// | `PROMPT_PATH`             | `prompt.txt`               |
    /// | `STORAGE_BACKEND`         | `local`                    |
    /// | `UPLOAD_DIR`              | `static/uploads`           |
    /// | `PUBLIC_BASE_URL`         | `http://localhost:3000`    |
    /// | `S3_BUCKET`               | unset                      |
    /// | `S3_PRESIGN_EXPIRY_SECS`  | `3600`                     |
    /// | `DATABASE_URL`            | unset                      |
    pub fn from_env() -> Self {
        let host = env_or("HOST", "0.0.0.0");

        let port: u16 = env_or("PORT", "3000")
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = env_or("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", "30")
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = env_or("SHUTDOWN_TIMEOUT_SECS", "30")
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let execution_mode = ExecutionMode::from_name(&env_or("EXECUTION_MODE", "remote"))
            .unwrap_or_else(|e| panic!("EXECUTION_MODE: {e}"));

        let max_upload_bytes: usize = std::env::var("MAX_UPLOAD_BYTES")
            .map(|v| v.parse().expect("MAX_UPLOAD_BYTES must be a valid usize"))
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        let poll_retry_after_secs: u64 = env_or("POLL_RETRY_AFTER_SECS", "5")
            .parse()
            .expect("POLL_RETRY_AFTER_SECS must be a valid u64");

        let worker_pool_size: usize = env_or("WORKER_POOL_SIZE", "4")
            .parse()
            .expect("WORKER_POOL_SIZE must be a valid usize");

        let task_timeout_secs: u64 = env_or("TASK_TIMEOUT_SECS", "120")
            .parse()
            .expect("TASK_TIMEOUT_SECS must be a valid u64");

        let databricks = match (env_opt("DATABRICKS_URL"), env_opt("DATABRICKS_TOKEN")) {
            (Some(url), Some(token)) => Some(DatabricksConfig {
                url,
                token,
                job_id: env_opt("DATABRICKS_JOB_ID")
                    .map(|v| v.parse().expect("DATABRICKS_JOB_ID must be a valid i64")),
                warehouse_id: env_opt("DATABRICKS_WAREHOUSE_ID"),
            }),
            _ => None,
        };

        let vision = VisionConfig {
            api_key: env_opt("OPENAI_API_KEY"),
            base_url: env_or("OPENAI_BASE_URL", recipe_vision::openai::DEFAULT_BASE_URL),
            model: env_or("OPENAI_MODEL", recipe_vision::openai::DEFAULT_MODEL),
            prompt_path: env_or("PROMPT_PATH", recipe_vision::prompt::DEFAULT_PROMPT_PATH).into(),
        };

        let storage = StorageConfig {
            backend: StorageBackendType::from_name(&env_or("STORAGE_BACKEND", "local"))
                .unwrap_or_else(|e| panic!("STORAGE_BACKEND: {e}")),
            upload_dir: env_or("UPLOAD_DIR", "static/uploads").into(),
            public_base_url: env_or("PUBLIC_BASE_URL", "http://localhost:3000"),
            s3_bucket: env_opt("S3_BUCKET"),
            presign_expiry_secs: std::env::var("S3_PRESIGN_EXPIRY_SECS")
                .map(|v| v.parse().expect("S3_PRESIGN_EXPIRY_SECS must be a valid u64"))
                .unwrap_or(recipe_storage::s3::DEFAULT_PRESIGN_EXPIRY.as_secs()),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            execution_mode,
            max_upload_bytes,
            poll_retry_after_secs,
            worker_pool_size,
            task_timeout_secs,
            databricks,
            vision,
            storage,
            database_url: env_opt("DATABASE_URL"),
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}

/// Unset and empty values are both treated as absent.
fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_mode_names_round_trip() {
        for mode in [ExecutionMode::Remote, ExecutionMode::Local] {
            assert_eq!(ExecutionMode::from_name(mode.name()).unwrap(), mode);
        }
        assert!(ExecutionMode::from_name("hybrid").is_err());
    }
}
