use log::LevelFilter;
use scribe::process::OrchestratorState;
use std::io::Write;
use tokio::sync::watch;
use tokio::task::JoinHandle;

// Library crates whose records are shown at info without RUST_LOG.
const LIBRARY_CRATES: [&str; 2] = ["scribe", "scribescan"];

pub fn init_logger_exe() {
    let name = std::env::current_exe()
        .ok()
        .and_then(|path| path.file_stem().and_then(|stem| stem.to_str()).map(str::to_string))
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());
    init_logger(name);
}

pub fn init_logger(name: impl Into<String>) {
    let crate_name = name.into().replace('-', "_");

    let mut builder = env_logger::builder();
    for library in LIBRARY_CRATES {
        builder.filter(Some(library), LevelFilter::Info);
    }

    builder
        .filter(Some(&crate_name), LevelFilter::Trace)
        .parse_default_env()
        .format(move |f, rec| {
            let now = humantime::format_rfc3339_millis(std::time::SystemTime::now());
            let module = rec.module_path().unwrap_or("<unknown>");
            let line = rec.line().unwrap_or(u32::MIN);
            let level = rec.level();

            writeln!(
                f,
                "[{} {} {} {}:{}] {}",
                level,
                crate_name,
                now,
                module,
                line,
                rec.args()
            )
        })
        .init();
}

/// Loads `.env` from the working directory or its parents, if there is one.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => log::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => log::warn!("Failed to load .env: {}", e),
    }
}

/// Logs every progress change of a running recognition. The task ends once
/// the orchestrator owning the sender is dropped.
pub fn spawn_progress_logger(mut progress: watch::Receiver<OrchestratorState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let state = progress.borrow_and_update().clone();
            if state.is_running && !state.progress.message.is_empty() {
                log::info!("{:>3}% {}", state.progress.percent, state.progress.message);
            }
        }
    })
}

/// Waits for a background task; returns false when it panicked or was cancelled.
pub async fn join_task(name: &str, handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            log::warn!("{} stopped abnormally: {}", name, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_progress_logger_ends_with_sender() {
        let (sender, receiver) = watch::channel(OrchestratorState::idle());
        let handle = spawn_progress_logger(receiver);

        sender.send_modify(|state| state.is_running = true);
        drop(sender);

        assert!(join_task("progress logger", handle).await);
    }

    #[tokio::test]
    async fn test_join_task_reports_panics() {
        let handle: JoinHandle<()> = tokio::spawn(async { panic!("reporter crashed") });
        assert!(!join_task("progress logger", handle).await);
    }
}
