mod logic;
pub(crate) mod client_invoke;
pub(crate) mod log_parse;

use anyhow::Result;
use std::path::Path;

use crate::config::AppConfig;

/// Public entry point for the upload process.
/// Runs the storage client, the optional backup replication and the
/// mapping persist for one staged file.
pub async fn run_upload_flow(
    app_config: &AppConfig,
    staging_path: &Path,
    logical_path: &str,
) -> Result<()> {
    logic::perform_upload_orchestration(app_config, staging_path, logical_path).await
}
