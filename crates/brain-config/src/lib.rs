//! Environment-driven configuration for timeouts, concurrency, and the
//! session HMAC secret.

use std::path::PathBuf;
use std::time::Duration;

/// Resolved configuration, read once at startup and held immutably for the
/// lifetime of the process (per the design notes: "HMAC secret: read once
/// at startup, held immutably").
#[derive(Debug, Clone)]
pub struct Config {
    pub ollama_base_url: String,
    pub ollama_timeout: Duration,
    pub ollama_health_timeout: Duration,
    pub embedding_concurrency: usize,
    pub session_secret: String,
    pub project: String,
    /// Root directory the `NoteStore` reads and writes markdown under.
    pub vault_path: PathBuf,
    /// Directory holding process-local state not owned by the NoteStore,
    /// namely the vector store's `brain_embeddings.db` (see §6 "Persisted
    /// state layout").
    pub state_dir: PathBuf,
}

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_HEALTH_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_CONCURRENCY: usize = 4;
const DEFAULT_PROJECT: &str = "default";

fn default_state_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("brain")
}

fn default_vault_path() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join("vault")
}

impl Config {
    /// Resolves configuration from environment variables, per §6.
    ///
    /// `BRAIN_SESSION_SECRET` is required; its absence fails the whole
    /// subsystem to start rather than defaulting to an insecure value.
    pub fn from_env() -> anyhow::Result<Self> {
        let ollama_base_url =
            std::env::var("OLLAMA_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let timeout_ms = parse_env_u64("OLLAMA_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?;
        if timeout_ms < 1_000 {
            anyhow::bail!("OLLAMA_TIMEOUT_MS must be >= 1000, got {timeout_ms}");
        }
        if timeout_ms > 300_000 {
            tracing::warn!(timeout_ms, "OLLAMA_TIMEOUT_MS is unusually large (>300000ms)");
        }

        let health_timeout_ms = parse_env_u64("OLLAMA_HEALTH_TIMEOUT_MS", DEFAULT_HEALTH_TIMEOUT_MS)?;

        let concurrency = parse_env_u64("EMBEDDING_CONCURRENCY", DEFAULT_CONCURRENCY as u64)?
            .clamp(1, 16) as usize;

        let session_secret = std::env::var("BRAIN_SESSION_SECRET")
            .map_err(|_| anyhow::anyhow!("BRAIN_SESSION_SECRET is required but not set"))?;
        if session_secret.is_empty() {
            anyhow::bail!("BRAIN_SESSION_SECRET must not be empty");
        }

        let project = std::env::var("BRAIN_PROJECT").unwrap_or_else(|_| DEFAULT_PROJECT.to_string());

        let vault_path = std::env::var("BRAIN_VAULT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_vault_path());
        let state_dir = std::env::var("BRAIN_STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_state_dir());

        Ok(Self {
            ollama_base_url,
            ollama_timeout: Duration::from_millis(timeout_ms),
            ollama_health_timeout: Duration::from_millis(health_timeout_ms),
            embedding_concurrency: concurrency,
            session_secret,
            project,
            vault_path,
            state_dir,
        })
    }

    /// Builds a config for tests without reading the environment.
    pub fn for_test(session_secret: impl Into<String>) -> Self {
        Self {
            ollama_base_url: DEFAULT_BASE_URL.to_string(),
            ollama_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            ollama_health_timeout: Duration::from_millis(DEFAULT_HEALTH_TIMEOUT_MS),
            embedding_concurrency: DEFAULT_CONCURRENCY,
            session_secret: session_secret.into(),
            project: DEFAULT_PROJECT.to_string(),
            vault_path: default_vault_path(),
            state_dir: default_state_dir(),
        }
    }

    /// Path to the vector store's database file under `state_dir`.
    pub fn vector_db_path(&self) -> PathBuf {
        self.state_dir.join("brain_embeddings.db")
    }
}

fn parse_env_u64(name: &str, default: u64) -> anyhow::Result<u64> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<u64>()
            .map_err(|e| anyhow::anyhow!("invalid {name}={raw:?}: {e}")),
        Err(_) => Ok(default),
    }
}
