// ingesttool/src/backup/scp_transfer.rs
use std::path::Path;
use tokio::process::Command;

use crate::config::BackupConfig;
use crate::errors::{AppError, Result};

/// Copies the staged file to the remote backup destination using the given
/// transport binary. Success is decided by the transport's exit status
/// alone, never by the fact that it could be invoked.
pub async fn replicate_with_transport(
    transport: &Path,
    staging_path: &Path,
    backup_config: &BackupConfig,
    logical_path: &str,
) -> Result<()> {
    let target = backup_config.remote_target(logical_path);
    println!("📦 Replicating {} to {}", staging_path.display(), target);

    let mut command = Command::new(transport);
    // Batch mode: fail on missing credentials instead of prompting.
    command.arg("-B");
    if let Some(port) = backup_config.port {
        command.arg("-P").arg(port.to_string());
    }
    command.arg(staging_path).arg(&target);

    let output = command.output().await.map_err(|e| {
        AppError::BackupTransferFailed(format!(
            "failed to launch {}: {}",
            transport.display(),
            e
        ))
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let diagnostic = if !stderr.is_empty() { stderr } else { stdout };
        return Err(AppError::BackupTransferFailed(format!(
            "{} -> {} ({}): {}",
            staging_path.display(),
            target,
            output.status,
            diagnostic
        )));
    }

    println!("✓ Backup replicated to {}", target);
    Ok(())
}
