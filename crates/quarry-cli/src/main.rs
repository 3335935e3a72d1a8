use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use quarry_config::QuarryConfig;
use quarry_core::FileKind;
use quarry_vfs::{
    CancellationToken, FileCacheStats, FileContentCache, FileUri, Handle, IoLimiter, LocalFs,
    OverlayStore,
};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "quarry", version, about = "Quarry CLI (memoized file reads, cache stats)")]
struct Cli {
    /// Config file (defaults to `quarry.toml` or `.quarry/config.toml` in the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read files through the cache and print what was observed for each
    Read(ReadArgs),
    /// Read files through the cache and print only the cache statistics
    Stats(ReadArgs),
}

#[derive(Args)]
struct ReadArgs {
    /// Files to read (relative paths resolve against the current directory)
    #[arg(required = true)]
    paths: Vec<PathBuf>,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct FileReport {
    uri: String,
    kind: FileKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    hash: Option<String>,
    bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct StatsReport {
    identities: usize,
    aliases: usize,
    largest_content_bytes: usize,
    error_entries: usize,
}

impl From<FileCacheStats> for StatsReport {
    fn from(stats: FileCacheStats) -> Self {
        Self {
            identities: stats.identities,
            aliases: stats.aliases,
            largest_content_bytes: stats.largest_content_bytes,
            error_entries: stats.error_entries,
        }
    }
}

#[derive(Debug, Serialize)]
struct ReadReport {
    files: Vec<FileReport>,
    stats: StatsReport,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    let config = load_config(cli.config.as_deref(), &cwd)?;
    quarry_config::init_tracing(&config.logging);

    let (args, files_wanted) = match cli.command {
        Command::Read(args) => (args, true),
        Command::Stats(args) => (args, false),
    };

    let uris = args
        .paths
        .iter()
        .map(|path| {
            let absolute = if path.is_absolute() {
                path.clone()
            } else {
                cwd.join(path)
            };
            FileUri::from_path(&absolute)
                .with_context(|| format!("invalid path {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    let report = runtime.block_on(read_all(&config, uris))?;

    let exit = if report.files.iter().any(|file| file.error.is_some()) {
        1
    } else {
        0
    };

    if args.json {
        let out = if files_wanted {
            serde_json::to_string_pretty(&report)?
        } else {
            serde_json::to_string_pretty(&report.stats)?
        };
        println!("{out}");
    } else {
        if files_wanted {
            for file in &report.files {
                print_file(file);
            }
        }
        print_stats(&report.stats);
    }
    Ok(exit)
}

fn load_config(explicit: Option<&Path>, cwd: &Path) -> Result<QuarryConfig> {
    match explicit {
        Some(path) => QuarryConfig::load_from_path(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => {
            let (config, _path) = quarry_config::load_for_workspace(cwd)?;
            Ok(config)
        }
    }
}

async fn read_all(config: &QuarryConfig, uris: Vec<FileUri>) -> Result<ReadReport> {
    let cache = FileContentCache::new(
        Arc::new(LocalFs::new()),
        IoLimiter::new(config.vfs.io_concurrency),
    )
    .with_freshness_window(config.vfs.freshness_window());
    let store = Arc::new(OverlayStore::new(Arc::new(cache)));

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!(target = "quarry.cli", "interrupted; cancelling reads");
                cancel.cancel();
            }
        });
    }

    let tasks: Vec<_> = uris
        .into_iter()
        .map(|uri| {
            let store = Arc::clone(&store);
            let cancel = cancel.clone();
            tokio::spawn(async move { store.read_file(&cancel, &uri).await })
        })
        .collect();

    let mut files = Vec::with_capacity(tasks.len());
    for task in tasks {
        let handle = task.await.context("read task failed")??;
        files.push(file_report(handle.as_ref()));
    }

    Ok(ReadReport {
        files,
        stats: store.file_cache().stats().into(),
    })
}

fn file_report(handle: &dyn Handle) -> FileReport {
    let identity = handle.identity();
    match handle.content() {
        Ok(content) => FileReport {
            uri: identity.uri.to_string(),
            kind: handle.kind(),
            hash: Some(identity.hash.to_hex()),
            bytes: content.len(),
            error: None,
        },
        Err(err) => FileReport {
            uri: identity.uri.to_string(),
            kind: handle.kind(),
            hash: None,
            bytes: 0,
            error: Some(err.to_string()),
        },
    }
}

fn print_file(file: &FileReport) {
    match (&file.hash, &file.error) {
        (_, Some(error)) => println!("{}: error: {error}", file.uri),
        (Some(hash), None) => println!(
            "{}: {} {} bytes {}",
            file.uri,
            file.kind.as_str(),
            file.bytes,
            &hash[..8]
        ),
        (None, None) => println!("{}: {} bytes", file.uri, file.bytes),
    }
}

fn print_stats(stats: &StatsReport) {
    println!("cache:");
    println!("  identities: {}", stats.identities);
    println!("  aliases: {}", stats.aliases);
    println!("  largest_content_bytes: {}", stats.largest_content_bytes);
    println!("  error_entries: {}", stats.error_entries);
}
