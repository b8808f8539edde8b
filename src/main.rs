//! Erasure-Coded Storage Ingestion Proxy
//!
//! Provides CLI interface for uploading staged files through the external
//! storage client and maintaining the logical-path-to-file-id mapping

// ingesttool/src/main.rs
mod backup;
mod config;
mod errors;
mod mapping;
mod upload;
mod utils;

use anyhow::{Context, Result};
use config::AppConfig;
use mapping::MappingStore;
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Main entry point for the ingestion tool
#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    match run_app().await {
        Ok(_) => {
            println!("✅ Operation completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app() -> Result<()> {
    // Define the path to config.json. Expects it in the same directory as
    // the executable or the project root if running with `cargo run`.
    let config_path = PathBuf::from("config.json");
    let app_config = AppConfig::load_from_json(&config_path)
        .context(format!("Failed to load application configuration from {}", config_path.display()))?;

    let args: Vec<String> = env::args().collect();
    let choice = if args.len() > 1 {
        args[1].trim().to_string()
    } else {
        prompt_choice()?
    };

    match choice.as_str() {
        "1" | "upload" => {
            let (staging, logical) = upload_args(&args)?;
            println!("🚀 Starting Upload Process...");
            upload::run_upload_flow(&app_config, Path::new(&staging), &logical)
                .await
                .context("Upload process failed")?;
        }
        "2" | "list" => {
            let store = open_store(&app_config).await?;
            let records = store.list_all().await?;
            if records.is_empty() {
                println!("No mappings recorded.");
            }
            for record in records {
                println!("{}\t{}\t{}", record.path, record.fileid, record.updated_at);
            }
        }
        "3" | "lookup" => {
            let logical = logical_path_arg(&args, "lookup")?;
            let store = open_store(&app_config).await?;
            match store.lookup(&logical).await? {
                Some(record) => println!("{} -> {}", record.path, record.fileid),
                None => anyhow::bail!("No mapping recorded for {}", logical),
            }
        }
        "4" | "delete" => {
            let logical = logical_path_arg(&args, "delete")?;
            let store = open_store(&app_config).await?;
            if store.remove(&logical).await? {
                println!("🗑 Removed mapping for {}", logical);
            } else {
                anyhow::bail!("No mapping recorded for {}", logical);
            }
        }
        _ => {
            println!("❌ Invalid choice. Please enter '1' (upload), '2' (list), '3' (lookup) or '4' (delete).");
            anyhow::bail!("Invalid operation choice");
        }
    }
    Ok(())
}

async fn open_store(app_config: &AppConfig) -> Result<MappingStore> {
    MappingStore::connect(&app_config.database_url)
        .await
        .context("Failed to open mapping store")
}

fn upload_args(args: &[String]) -> Result<(String, String)> {
    if args.len() != 4 {
        anyhow::bail!("Usage: {} upload <staging-path> <logical-path>", tool_name(args));
    }
    Ok((args[2].clone(), args[3].clone()))
}

fn logical_path_arg(args: &[String], operation: &str) -> Result<String> {
    if args.len() != 3 {
        anyhow::bail!("Usage: {} {} <logical-path>", tool_name(args), operation);
    }
    Ok(args[2].clone())
}

fn tool_name(args: &[String]) -> &str {
    args.first().map(|s| s.as_str()).unwrap_or("ingesttool")
}

/// Prompts user to select an operation
///
/// Returns the user's choice as String
fn prompt_choice() -> Result<String> {
    use std::io::{stdin, stdout, Write};

    println!("Select an operation:");
    println!("1. Upload a staged file (or type 'upload')");
    println!("2. List recorded mappings (or type 'list')");
    println!("3. Look up a mapping (or type 'lookup')");
    println!("4. Delete a mapping (or type 'delete')");
    print!("Enter your choice: ");
    let _ = stdout().flush().context("Failed to flush stdout")?;

    let mut input = String::new();
    stdin().read_line(&mut input).context("Failed to read user input")?;
    Ok(input.trim().to_string())
}
