//! Composition root: loads `AppState`, starts the background backup
//! daemon, and serves the HTTP router until shutdown.

use crate::routes::build_router;
use crate::state::AppState;
use midas_models::MidasError;
use std::path::Path;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

pub struct MidasKernel {
    state: AppState,
}

impl MidasKernel {
    /// Builds the full dependency graph. Any failure here is fatal;
    /// there is no partial startup (spec §4.2).
    pub async fn ignite(config_path: impl AsRef<Path>) -> Result<Self, MidasError> {
        let state = AppState::bootstrap(config_path).await?;
        Ok(Self { state })
    }

    /// Spawns the backup daemon, binds the HTTP listener, and serves
    /// until a shutdown signal arrives. On shutdown, every job still
    /// `running` or `pending` is marked `failed` (spec §5).
    pub async fn launch(self) -> Result<(), MidasError> {
        let tree = self.state.config.get();
        let backup_dir = self.state.config.resolve_path(&tree.storage.backup_dir);
        spawn_backup_daemon(self.state.clone(), backup_dir, tree.storage.backup_interval_seconds);

        let bind_addr = format!("{}:{}", tree.runtime.bind_host, tree.runtime.bind_port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| MidasError::internal(format!("cannot bind {bind_addr}: {e}")))?;
        info!(addr = %bind_addr, "midas listening");

        let router = build_router(self.state.clone());
        let jobs = self.state.jobs.clone();

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| MidasError::internal(format!("server error: {e}")))?;

        jobs.abandon_running_jobs("process shutdown").await;
        info!("midas shut down cleanly");
        Ok(())
    }
}

fn spawn_backup_daemon(state: AppState, backup_dir: std::path::PathBuf, interval_seconds: u64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_seconds.max(1)));
        loop {
            ticker.tick().await;
            match midas_db::snapshot(&state.db, &backup_dir).await {
                Ok(path) => info!(path = %path.display(), "backup snapshot written"),
                Err(e) => warn!(error = %e, "backup snapshot failed"),
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!(error = %e, "failed to install sigterm handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received, draining in-flight jobs");
}
