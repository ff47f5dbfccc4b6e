mod ui;

use anyhow::{Context, Result};
use flume::unbounded;
use tracing_subscriber::EnvFilter;

use mindspace_backend::config::AppConfig;
use mindspace_backend::runtime::MindspaceRuntime;
use ui::shell::Shell;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,mindspace=debug")),
        )
        .init();

    tracing::info!("MindSpace starting...");

    let config = AppConfig::load();
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    rt.block_on(async move {
        let (session_tx, session_rx) = unbounded();
        let runtime = MindspaceRuntime::bootstrap(config, session_tx)
            .context("failed to bootstrap MindSpace runtime")?;
        Shell::new(runtime, session_rx).run().await
    })
}
