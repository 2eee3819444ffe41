use std::sync::Arc;
use std::time::SystemTime;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use colored::Colorize;
use ferry_store::{DirObjectStore, ObjectInfo, ObjectStore};
use ferry_transfer::{DownloadRequest, Transfers, UploadRequest};
use ferry_types::{DownloadOptions, Handle, HandleKind};
use tracing::warn;

use crate::cli::*;
use crate::config::FerryConfig;

/// A store opened for one command.
struct Workspace {
    transfers: Transfers,
    store: Arc<DirObjectStore>,
    project: Handle,
}

impl Workspace {
    fn open(config: &FerryConfig) -> anyhow::Result<Self> {
        let store = Arc::new(
            DirObjectStore::open(&config.store_root)
                .with_context(|| format!("opening store {}", config.store_root.display()))?,
        );
        let transfers = Transfers::new(config.transfer());
        let project = transfers.open_project(store.clone());
        Ok(Self {
            transfers,
            store,
            project,
        })
    }

    fn close(self) -> anyhow::Result<()> {
        self.transfers.close_project(self.project)?;
        Ok(())
    }
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = FerryConfig::resolve(cli.config.as_deref(), cli.root.as_deref())?;
    let ws = Workspace::open(&config)?;
    let result = match cli.command {
        Command::Put(args) => cmd_put(&ws, args),
        Command::Get(args) => cmd_get(&ws, args),
        Command::Stat(args) => cmd_stat(&ws, args),
    };
    finish(result, ws.close())
}

/// Combine a command's outcome with closing its workspace. The command's own
/// error takes precedence over a failed close.
fn finish(result: anyhow::Result<()>, closed: anyhow::Result<()>) -> anyhow::Result<()> {
    match (result, closed) {
        (Err(e), Err(close_err)) => {
            warn!(error = %close_err, "failed to close project");
            Err(e)
        }
        (result, Ok(())) => result,
        (Ok(()), Err(close_err)) => Err(close_err),
    }
}

fn cmd_put(ws: &Workspace, args: PutArgs) -> anyhow::Result<()> {
    let info = put(ws, &args)?;
    println!(
        "{} {} -> {}",
        "✓".green().bold(),
        args.src.display(),
        format!("{}/{}", info.bucket, info.key).yellow()
    );
    print_info(&info);
    Ok(())
}

fn put(ws: &Workspace, args: &PutArgs) -> anyhow::Result<ObjectInfo> {
    let mut request = UploadRequest::new(ws.project, &args.bucket, &args.key);
    if let Some(expires) = &args.expires {
        request = request.with_expires(parse_expires(expires)?);
    }
    let handle = ws.transfers.upload_object_from_file(&request, &args.src)?;
    let status = ws.transfers.upload_status(handle)?;
    ws.transfers.release(handle, HandleKind::Upload)?;
    status.info.context("upload finished without object metadata")
}

fn cmd_get(ws: &Workspace, args: GetArgs) -> anyhow::Result<()> {
    let bytes = get(ws, &args)?;
    println!(
        "{} {} -> {} ({} bytes)",
        "✓".green().bold(),
        format!("{}/{}", args.bucket, args.key).yellow(),
        args.dest.display(),
        bytes.to_string().bold()
    );
    Ok(())
}

fn get(ws: &Workspace, args: &GetArgs) -> anyhow::Result<u64> {
    let request = DownloadRequest::new(ws.project, &args.bucket, &args.key).with_options(
        DownloadOptions {
            offset: args.offset,
            length: args.length,
        },
    );
    let handle = ws.transfers.download_object_to_file(&request, &args.dest)?;
    let status = ws.transfers.download_status(handle)?;
    ws.transfers.release(handle, HandleKind::Download)?;
    Ok(status.bytes_read)
}

fn cmd_stat(ws: &Workspace, args: StatArgs) -> anyhow::Result<()> {
    let info = ws.store.stat(&args.bucket, &args.key)?;
    println!("{}", format!("{}/{}", info.bucket, info.key).yellow().bold());
    print_info(&info);
    Ok(())
}

fn print_info(info: &ObjectInfo) {
    println!("  Size:    {}", info.size.to_string().bold());
    println!("  Hash:    {}", info.content_hash_hex().cyan());
    println!("  Created: {}", timestamp(info.created));
    match info.expires {
        Some(t) => println!("  Expires: {}", timestamp(t)),
        None => println!("  Expires: {}", "never".dimmed()),
    }
}

fn timestamp(t: SystemTime) -> String {
    DateTime::<Utc>::from(t).to_rfc3339()
}

/// Parse `--expires` as unix seconds or an RFC 3339 timestamp.
fn parse_expires(value: &str) -> anyhow::Result<i64> {
    if let Ok(secs) = value.parse::<i64>() {
        return Ok(secs);
    }
    match DateTime::parse_from_rfc3339(value) {
        Ok(t) => Ok(t.timestamp()),
        Err(_) => bail!("invalid expiration {value:?}: expected unix seconds or RFC 3339"),
    }
}
