use anyhow::{Context, Result};
use std::path::PathBuf;
use which::which;

/// Finds the storage client executable in the system PATH.
pub fn find_client_executable() -> Result<PathBuf> {
    which("CLIENT_p").context("CLIENT_p executable not found in PATH. Please install the storage client tools or set client_binary_path in config.json.")
}

/// Finds the scp executable in the system PATH.
pub fn find_scp_executable() -> Result<PathBuf> {
    which("scp").context("scp executable not found in PATH. Please ensure OpenSSH client tools are installed and in your PATH.")
}
