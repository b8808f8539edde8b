pub(crate) mod scp_transfer;

use std::path::Path;

use crate::config::BackupConfig;
use crate::errors::{AppError, Result};
use crate::utils::find_scp_executable;

/// Public entry point for backup replication.
/// Copies the staged file to `host:destination_root/logical_path` over scp.
pub async fn replicate(
    staging_path: &Path,
    backup_config: &BackupConfig,
    logical_path: &str,
) -> Result<()> {
    let scp_path =
        find_scp_executable().map_err(|e| AppError::BackupTransferFailed(e.to_string()))?;
    scp_transfer::replicate_with_transport(&scp_path, staging_path, backup_config, logical_path)
        .await
}
