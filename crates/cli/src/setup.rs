//! Startup: project directory, config, backend checks, memory.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use localcoder_agent::AgentLoop;
use localcoder_config::AppConfig;
use localcoder_core::provider::Provider;
use localcoder_core::session::SessionContext;
use localcoder_memory::MemoryStore;
use localcoder_providers::OllamaProvider;
use tracing::{debug, info, warn};

use crate::console::Console;

/// Seconds to wait for a freshly started `ollama serve` to answer.
const STARTUP_WAIT_SECS: u32 = 15;

pub struct Workspace {
    pub agent: AgentLoop,
    pub session: SessionContext,
}

/// Resolve the project directory, offering to create it when missing.
/// Returns `None` when the user declines.
pub async fn project_dir(
    console: &Console,
    requested: Option<PathBuf>,
) -> Result<Option<PathBuf>, Box<dyn std::error::Error>> {
    let dir = match requested {
        Some(dir) => expand_home(&dir),
        None => std::env::current_dir()?,
    };

    if !dir.exists() {
        let question = format!("Directory {} does not exist. Create it?", dir.display());
        if !console.confirm_yes(&question).await? {
            return Ok(None);
        }
        std::fs::create_dir_all(&dir)?;
        console.info(&format!("Created {}", dir.display()));
    } else if !dir.is_dir() {
        return Err(format!("{} is not a directory", dir.display()).into());
    }

    Ok(Some(dir.canonicalize()?))
}

fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}

/// Load config for `root` and apply the command-line model override.
pub fn load_config(root: &Path, model: Option<String>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = AppConfig::load_for_project(root)
        .map_err(|e| format!("Failed to load config: {e}"))?;
    if let Some(model) = model {
        config.model = model;
        config.validate()?;
    }
    debug!(model = %config.model, base_url = %config.base_url, "Config loaded");
    Ok(config)
}

/// Check the backend and model, then assemble the agent and session.
pub async fn open(
    console: &Console,
    root: PathBuf,
    config: &AppConfig,
) -> Result<Workspace, Box<dyn std::error::Error>> {
    let provider = Arc::new(OllamaProvider::from_config(config)?);

    if provider.health_check().await.unwrap_or(false) {
        debug!(base_url = %provider.base_url(), "Ollama reachable");
    } else {
        start_backend(console, &provider).await?;
    }

    if !provider.has_model(&config.model).await? {
        pull_model(console, &provider, &config.model).await?;
    }

    let memory = Arc::new(MemoryStore::open(config.memory.path_for(&root)));
    let tools = Arc::new(localcoder_tools::default_registry(&root, &config.tools));

    let mut session = SessionContext::new(&config.model, &root);
    session.memory_count = memory.count().await;

    info!(
        project = %root.display(),
        model = %config.model,
        memories = session.memory_count,
        "Workspace ready"
    );

    let agent = AgentLoop::new(provider, tools, memory).with_config(config);
    Ok(Workspace { agent, session })
}

/// Launch `ollama serve` in the background and wait for it to answer.
async fn start_backend(console: &Console, provider: &OllamaProvider) -> Result<(), Box<dyn std::error::Error>> {
    console.info("Ollama is not running; starting `ollama serve`...");
    let spawned = tokio::process::Command::new("ollama")
        .arg("serve")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    // The server outlives this process, like one started by hand.
    let _server = match spawned {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            console.error("Ollama is not installed. Get it from https://ollama.com");
            return Err("ollama executable not found".into());
        }
        Err(e) => return Err(format!("Failed to start ollama: {e}").into()),
    };

    let ready = wait_until(
        move || async move { provider.health_check().await.unwrap_or(false) },
        STARTUP_WAIT_SECS,
        Duration::from_secs(1),
    )
    .await;
    if !ready {
        console.error(&format!("Ollama did not come up at {}.", provider.base_url()));
        console.error("Run `ollama serve` manually, or set OLLAMA_HOST / base_url in .coder/config.toml.");
        return Err("Ollama is not reachable".into());
    }

    info!(base_url = %provider.base_url(), "Started Ollama");
    console.info("Ollama started.");
    Ok(())
}

/// Download a missing model, showing progress on the status line.
async fn pull_model(
    console: &Console,
    provider: &OllamaProvider,
    model: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    console.info(&format!("Pulling {model} (this may take a while)..."));
    let pulled = provider
        .pull_model(model, |status| console.progress(&format!("  Pulling {model}: {status}")))
        .await;

    if let Err(e) = pulled {
        warn!(model, error = %e, "Model pull failed");
        console.error(&format!("Failed to pull model: {e}"));
        let available = provider.list_models().await.unwrap_or_default();
        if !available.is_empty() {
            console.error(&format!("Available models: {}", available.join(", ")));
        }
        return Err(format!("Model '{model}' not available").into());
    }

    console.info(&format!("Model {model} ready."));
    Ok(())
}

/// Poll `probe` up to `attempts` times, sleeping `interval` before each try.
async fn wait_until<F, Fut>(mut probe: F, attempts: u32, interval: Duration) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for attempt in 1..=attempts {
        tokio::time::sleep(interval).await;
        if probe().await {
            debug!(attempt, "Backend answered");
            return true;
        }
    }
    false
}
