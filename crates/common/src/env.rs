//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use std::path::Path;

use tracing::warn;

/// Warn when the SPA bundle is missing and create the data directory if one is needed.
pub async fn ensure_env(frontend_dir: &str, data_dir: Option<&str>) -> anyhow::Result<()> {
    let index = Path::new(frontend_dir).join("index.html");
    if tokio::fs::metadata(&index).await.is_err() {
        warn!(%frontend_dir, "frontend bundle not found; static assets may 404");
    }
    if let Some(data_dir) = data_dir.filter(|d| !d.is_empty()) {
        tokio::fs::create_dir_all(data_dir)
            .await
            .map_err(|e| anyhow::anyhow!("cannot create {data_dir}: {e}"))?;
    }
    Ok(())
}
