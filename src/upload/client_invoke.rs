// ingesttool/src/upload/client_invoke.rs
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;
use tempfile::{Builder as TempFileBuilder, NamedTempFile};
use tokio::process::Command;
use tokio::time::timeout;
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::upload::log_parse::{self, log_excerpt};

/// Erasure-coding scheme passed to the storage client.
pub const ENCODING_SCHEME: &str = "evenodd";
/// Number of fragments the storage client splits each file into.
pub const SHARD_COUNT: u32 = 7;

#[derive(Debug, Clone, PartialEq)]
pub struct UploadResult {
    /// Opaque identifier assigned to the uploaded object by the client.
    pub identifier: String,
    /// The client's transfer statistics line, when it emitted one.
    pub transfer_summary: Option<String>,
}

/// Runs the external storage client for one staged file and extracts the
/// resulting storage identifier from its log output. One blocking attempt,
/// no internal retries.
#[derive(Debug, Clone)]
pub struct UploadCoordinator {
    client_binary: PathBuf,
    work_dir: PathBuf,
    client_timeout: Duration,
}

impl UploadCoordinator {
    pub fn new(client_binary: PathBuf, work_dir: PathBuf, client_timeout: Duration) -> Self {
        UploadCoordinator {
            client_binary,
            work_dir,
            client_timeout,
        }
    }

    pub async fn upload(&self, staging_path: &Path, logical_path: &str) -> Result<UploadResult> {
        if logical_path.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "logical path must not be empty".to_string(),
            ));
        }
        let staging_meta = std::fs::metadata(staging_path).map_err(|e| {
            AppError::InvalidInput(format!(
                "staging file {} is not readable: {}",
                staging_path.display(),
                e
            ))
        })?;
        if !staging_meta.is_file() {
            return Err(AppError::InvalidInput(format!(
                "staging path {} is not a regular file",
                staging_path.display()
            )));
        }

        // The token is embedded in the log file name, so it must be unique
        // across concurrently running invocations.
        let token = Uuid::new_v4();
        let log_file = TempFileBuilder::new()
            .prefix(&format!("client_{}_", token))
            .suffix(".log")
            .tempfile_in(&self.work_dir)
            .map_err(|e| {
                AppError::ClientInvocationFailed(format!(
                    "failed to create client log file in {}: {}",
                    self.work_dir.display(),
                    e
                ))
            })?;

        // The guard removes the log on every exit path below.
        let status = self.run_client(&token, staging_path, &log_file).await?;
        let log_content = std::fs::read_to_string(log_file.path())?;
        let parsed = log_parse::parse_client_log(&log_content);

        if let Err(e) = log_file.close() {
            eprintln!("⚠ Failed to remove client log file: {}", e);
        }

        let exit_code = status.code();
        match (status.success(), parsed.identifier) {
            (true, Some(identifier)) => Ok(UploadResult {
                identifier,
                transfer_summary: parsed.transfer_summary,
            }),
            (false, Some(identifier)) => Err(AppError::ClientExecutionFailed {
                status: describe_exit(&status),
                detail: format!(
                    "client emitted upload marker [{}] but exited abnormally; the object may exist in storage",
                    identifier
                ),
                partial_identifier: Some(identifier),
            }),
            (success, None) => {
                let mut detail = format!(
                    "no 'Upload ... Done [id]' line in client log ({} bytes)",
                    log_content.len()
                );
                if !success {
                    detail.push_str(&format!("; client {}", describe_exit(&status)));
                }
                if !log_content.trim().is_empty() {
                    detail.push_str(&format!("; log tail: {}", log_excerpt(&log_content)));
                }
                Err(AppError::LogParseFailed {
                    exit_status: if success { None } else { exit_code },
                    detail,
                })
            }
        }
    }

    async fn run_client(
        &self,
        token: &Uuid,
        staging_path: &Path,
        log_file: &NamedTempFile,
    ) -> Result<ExitStatus> {
        // stdout and stderr share one file description so their writes
        // interleave in the log the same way `> log 2>&1` would.
        let stdout_handle = log_file.reopen().map_err(|e| {
            AppError::ClientInvocationFailed(format!("failed to open client log for writing: {}", e))
        })?;
        let stderr_handle = stdout_handle.try_clone().map_err(|e| {
            AppError::ClientInvocationFailed(format!("failed to open client log for writing: {}", e))
        })?;

        let mut child = Command::new(&self.client_binary)
            .arg("-i")
            .arg(token.to_string())
            .arg("-a")
            .arg("upload")
            .arg("-c")
            .arg(ENCODING_SCHEME)
            .arg("-n")
            .arg(SHARD_COUNT.to_string())
            .arg("-t")
            .arg(staging_path)
            .stdin(std::process::Stdio::null())
            .stdout(stdout_handle)
            .stderr(stderr_handle)
            .spawn()
            .map_err(|e| {
                AppError::ClientInvocationFailed(format!(
                    "failed to launch {}: {}",
                    self.client_binary.display(),
                    e
                ))
            })?;

        match timeout(self.client_timeout, child.wait()).await {
            Ok(Ok(status)) => Ok(status),
            Ok(Err(e)) => Err(AppError::ClientExecutionFailed {
                status: "unknown".to_string(),
                detail: format!("failed waiting for storage client: {}", e),
                partial_identifier: None,
            }),
            Err(_) => {
                if let Err(e) = child.start_kill() {
                    eprintln!("⚠ Failed to kill timed-out storage client: {}", e);
                }
                let _ = child.wait().await;
                Err(AppError::ClientExecutionFailed {
                    status: "timeout".to_string(),
                    detail: format!(
                        "storage client did not finish within {}s and was terminated",
                        self.client_timeout.as_secs()
                    ),
                    partial_identifier: None,
                })
            }
        }
    }
}

fn describe_exit(status: &ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn write_stub_client(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("stub_client.sh");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    fn stage_file(dir: &Path) -> PathBuf {
        let path = dir.join("staged.bin");
        fs::write(&path, b"payload").unwrap();
        path
    }

    fn assert_no_log_left(work_dir: &TempDir) {
        let leftover: Vec<_> = fs::read_dir(work_dir.path()).unwrap().collect();
        assert!(leftover.is_empty(), "client log left behind: {:?}", leftover);
    }

    #[tokio::test]
    async fn test_successful_upload_returns_identifier() -> anyhow::Result<()> {
        let assets = TempDir::new()?;
        let work = TempDir::new()?;
        let stub = write_stub_client(
            assets.path(),
            "echo \"Upload staged.bin Done [abc123]\"\necho \"5MB transferred in 2s\"",
        );
        let staged = stage_file(assets.path());
        let coordinator =
            UploadCoordinator::new(stub, work.path().to_path_buf(), Duration::from_secs(10));

        let result = coordinator.upload(&staged, "/photos/cat.jpg").await?;

        assert_eq!(result.identifier, "abc123");
        assert_eq!(result.transfer_summary.as_deref(), Some("5MB transferred in 2s"));
        assert_no_log_left(&work);
        Ok(())
    }

    #[tokio::test]
    async fn test_clean_exit_without_marker_is_log_parse_failure() -> anyhow::Result<()> {
        let assets = TempDir::new()?;
        let work = TempDir::new()?;
        let stub = write_stub_client(assets.path(), "echo \"nothing useful\"");
        let staged = stage_file(assets.path());
        let coordinator =
            UploadCoordinator::new(stub, work.path().to_path_buf(), Duration::from_secs(10));

        let err = coordinator.upload(&staged, "/a").await.unwrap_err();

        match err {
            AppError::LogParseFailed { exit_status, .. } => assert_eq!(exit_status, None),
            other => panic!("expected LogParseFailed, got {:?}", other),
        }
        assert_no_log_left(&work);
        Ok(())
    }

    #[tokio::test]
    async fn test_nonzero_exit_without_marker_attaches_exit_status() -> anyhow::Result<()> {
        let assets = TempDir::new()?;
        let work = TempDir::new()?;
        let stub = write_stub_client(
            assets.path(),
            "echo \"client started\"\necho \"error: disk full\" 1>&2\nexit 3",
        );
        let staged = stage_file(assets.path());
        let coordinator =
            UploadCoordinator::new(stub, work.path().to_path_buf(), Duration::from_secs(10));

        let err = coordinator.upload(&staged, "/a").await.unwrap_err();

        match err {
            AppError::LogParseFailed { exit_status, detail } => {
                assert_eq!(exit_status, Some(3));
                assert!(detail.contains("disk full"), "detail should carry the log tail: {}", detail);
            }
            other => panic!("expected LogParseFailed, got {:?}", other),
        }
        assert_no_log_left(&work);
        Ok(())
    }

    #[tokio::test]
    async fn test_nonzero_exit_with_marker_surfaces_partial_identifier() -> anyhow::Result<()> {
        let assets = TempDir::new()?;
        let work = TempDir::new()?;
        let stub = write_stub_client(
            assets.path(),
            "echo \"Upload staged.bin Done [partial9]\"\nexit 1",
        );
        let staged = stage_file(assets.path());
        let coordinator =
            UploadCoordinator::new(stub, work.path().to_path_buf(), Duration::from_secs(10));

        let err = coordinator.upload(&staged, "/a").await.unwrap_err();

        match err {
            AppError::ClientExecutionFailed { status, partial_identifier, .. } => {
                assert_eq!(status, "exit code 1");
                assert_eq!(partial_identifier.as_deref(), Some("partial9"));
            }
            other => panic!("expected ClientExecutionFailed, got {:?}", other),
        }
        assert_no_log_left(&work);
        Ok(())
    }

    #[tokio::test]
    async fn test_unlaunchable_client_is_invocation_failure() -> anyhow::Result<()> {
        let assets = TempDir::new()?;
        let work = TempDir::new()?;
        let staged = stage_file(assets.path());
        let coordinator = UploadCoordinator::new(
            assets.path().join("no_such_client"),
            work.path().to_path_buf(),
            Duration::from_secs(10),
        );

        let err = coordinator.upload(&staged, "/a").await.unwrap_err();

        assert!(matches!(err, AppError::ClientInvocationFailed(_)), "got {:?}", err);
        assert_no_log_left(&work);
        Ok(())
    }

    #[tokio::test]
    async fn test_timeout_terminates_client() -> anyhow::Result<()> {
        let assets = TempDir::new()?;
        let work = TempDir::new()?;
        let stub = write_stub_client(assets.path(), "sleep 30");
        let staged = stage_file(assets.path());
        let coordinator =
            UploadCoordinator::new(stub, work.path().to_path_buf(), Duration::from_millis(200));

        let err = coordinator.upload(&staged, "/a").await.unwrap_err();

        match err {
            AppError::ClientExecutionFailed { status, partial_identifier, .. } => {
                assert_eq!(status, "timeout");
                assert_eq!(partial_identifier, None);
            }
            other => panic!("expected ClientExecutionFailed, got {:?}", other),
        }
        assert_no_log_left(&work);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_staging_file_rejected() -> anyhow::Result<()> {
        let assets = TempDir::new()?;
        let work = TempDir::new()?;
        let stub = write_stub_client(assets.path(), "echo \"Upload x Done [y]\"");
        let coordinator =
            UploadCoordinator::new(stub, work.path().to_path_buf(), Duration::from_secs(10));

        let err = coordinator
            .upload(&assets.path().join("absent.bin"), "/a")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidInput(_)), "got {:?}", err);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_logical_path_rejected() -> anyhow::Result<()> {
        let assets = TempDir::new()?;
        let work = TempDir::new()?;
        let stub = write_stub_client(assets.path(), "echo \"Upload x Done [y]\"");
        let staged = stage_file(assets.path());
        let coordinator =
            UploadCoordinator::new(stub, work.path().to_path_buf(), Duration::from_secs(10));

        let err = coordinator.upload(&staged, "  ").await.unwrap_err();

        assert!(matches!(err, AppError::InvalidInput(_)), "got {:?}", err);
        Ok(())
    }

    #[tokio::test]
    async fn test_client_receives_fixed_invocation_parameters() -> anyhow::Result<()> {
        let assets = TempDir::new()?;
        let work = TempDir::new()?;
        let args_file = assets.path().join("seen_args");
        let stub = write_stub_client(
            assets.path(),
            &format!("echo \"$@\" > {}\necho \"Upload x Done [y]\"", args_file.display()),
        );
        let staged = stage_file(assets.path());
        let coordinator =
            UploadCoordinator::new(stub, work.path().to_path_buf(), Duration::from_secs(10));

        coordinator.upload(&staged, "/a").await?;

        let seen = fs::read_to_string(&args_file)?;
        assert!(seen.contains("-a upload"), "args were: {}", seen);
        assert!(seen.contains("-c evenodd"), "args were: {}", seen);
        assert!(seen.contains("-n 7"), "args were: {}", seen);
        assert!(seen.contains(&staged.display().to_string()), "args were: {}", seen);
        Ok(())
    }
}
