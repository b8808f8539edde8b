use anyhow::{Context, Result};
use std::path::Path;

use crate::backup;
use crate::config::AppConfig;
use crate::mapping::MappingStore;
use crate::upload::client_invoke::UploadCoordinator;
use crate::utils::find_client_executable;

/// Orchestrates one upload request.
///
/// 1. Runs the external storage client and extracts the storage identifier.
/// 2. Replicates the staged file to the backup host, when configured.
/// 3. Persists the logical-path-to-identifier mapping.
///
/// A failed backup never blocks the mapping persist; it is surfaced as the
/// flow's error only after the mapping outcome is settled. A failed persist
/// leaves the uploaded object orphaned in storage; nothing here rolls the
/// upload back.
pub async fn perform_upload_orchestration(
    app_config: &AppConfig,
    staging_path: &Path,
    logical_path: &str,
) -> Result<()> {
    let client_binary = match &app_config.client.binary_path {
        Some(path) => path.clone(),
        None => find_client_executable()?,
    };
    let work_dir = app_config
        .client
        .work_dir
        .clone()
        .unwrap_or_else(std::env::temp_dir);
    let coordinator = UploadCoordinator::new(client_binary, work_dir, app_config.client.timeout);

    println!("📤 Uploading {} as {}", staging_path.display(), logical_path);
    let result = coordinator
        .upload(staging_path, logical_path)
        .await
        .with_context(|| format!("Upload of {} failed", staging_path.display()))?;

    println!("File ID: {}", result.identifier);
    if let Some(summary) = &result.transfer_summary {
        println!("Last successful upload: {}", summary);
    }

    let backup_outcome = match &app_config.backup {
        Some(backup_config) => {
            backup::replicate(staging_path, backup_config, logical_path).await
        }
        None => Ok(()),
    };
    if let Err(e) = &backup_outcome {
        eprintln!("⚠ Backup replication failed, continuing with mapping persist: {}", e);
    }

    let store = MappingStore::connect(&app_config.database_url)
        .await
        .context("Failed to open mapping store")?;
    store
        .upsert(logical_path, &result.identifier)
        .await
        .with_context(|| {
            format!(
                "Upload {} succeeded but its mapping could not be persisted; the storage object is orphaned until reconciled",
                result.identifier
            )
        })?;
    println!("✅ Saved mapping {} -> {}", logical_path, result.identifier);

    backup_outcome.with_context(|| {
        format!(
            "Backup replication of {} failed; the upload and its mapping are intact",
            staging_path.display()
        )
    })?;

    Ok(())
}
