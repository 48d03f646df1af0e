mod cli;

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};

use pv_core::config::Config;
use pv_core::{PictureRef, SessionId, StoreMode};
use pv_server::context::AppContext;
use pv_store::{PutRequest, RandomSessions, SessionScope};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "picvault=trace,pv_server=trace,pv_store=trace,pv_db=debug,pv_core=debug,tower_http=debug"
                .to_string()
        } else {
            "picvault=info,pv_server=info,pv_store=info,pv_db=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(pv_server::start(config))?;
            Ok(())
        }
        Commands::Put { file, session } => put_file(cli.config.as_deref(), &file, session),
        Commands::Get { target, output } => {
            get_picture(cli.config.as_deref(), &target, output.as_deref())
        }
        Commands::List { session } => list_pictures(cli.config.as_deref(), session),
        Commands::Delete { target } => delete_picture(cli.config.as_deref(), &target),
        Commands::Sweep {
            dry_run,
            grace_secs,
        } => sweep(cli.config.as_deref(), dry_run, grace_secs),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("picvault {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Load the config file if one was given and exists; defaults otherwise.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) if p.exists() => {
            Config::load(p).with_context(|| format!("failed to load config {}", p.display()))
        }
        Some(p) => {
            tracing::info!("No config file at {}; using defaults", p.display());
            Ok(Config::default())
        }
        None => Ok(Config::default()),
    }
}

fn open_context(config_path: Option<&Path>) -> Result<AppContext> {
    let config = load_config(config_path)?;
    Ok(AppContext::from_config(config)?)
}

fn put_file(config_path: Option<&Path>, file: &Path, session: Option<String>) -> Result<()> {
    let ctx = open_context(config_path)?;

    let bytes = std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut request = PutRequest::new(filename, bytes);

    if ctx.store.mode() == StoreMode::Session {
        let (session, issued) = RandomSessions.resolve(session.as_deref())?;
        if issued {
            println!("Session: {session}");
        }
        request = request.with_session(session);
    }

    let picture = ctx.store.put(request)?;
    println!("Stored picture {} ({})", picture.id, picture.filename);
    Ok(())
}

fn get_picture(config_path: Option<&Path>, target: &str, output: Option<&Path>) -> Result<()> {
    let target: PictureRef = target.parse()?;
    let ctx = open_context(config_path)?;
    let stored = ctx.store.get(target)?;

    match output {
        Some(path) => {
            std::fs::write(path, &stored.bytes)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!(
                "Wrote picture {} ({}, {} bytes) to {}",
                stored.picture.id,
                stored.content_type(),
                stored.bytes.len(),
                path.display()
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&stored.bytes)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn list_pictures(config_path: Option<&Path>, session: Option<String>) -> Result<()> {
    let ctx = open_context(config_path)?;
    let session: Option<SessionId> = session.map(|s| s.parse()).transpose()?;
    let pictures = ctx.store.list(session.as_ref())?;

    if pictures.is_empty() {
        println!("No pictures stored");
    }
    for picture in pictures {
        println!("{}\t{}", picture.id, picture.filename);
    }
    Ok(())
}

fn delete_picture(config_path: Option<&Path>, target: &str) -> Result<()> {
    let target: PictureRef = target.parse()?;
    let ctx = open_context(config_path)?;
    let removed = ctx.store.delete(target)?;
    println!("Deleted picture {} ({})", removed.id, removed.filename);
    Ok(())
}

fn sweep(config_path: Option<&Path>, dry_run: bool, grace_secs: u64) -> Result<()> {
    let ctx = open_context(config_path)?;
    let report = ctx
        .store
        .sweep(Duration::from_secs(grace_secs), dry_run)?;

    let verb = if dry_run { "Would remove" } else { "Removed" };
    println!("Scanned {} blobs", report.scanned);
    println!("{verb} {} orphaned blobs", report.orphans.len());
    for key in &report.orphans {
        println!("  {key}");
    }
    if !dry_run {
        println!("Removed {} partial writes", report.partials_removed);
    }
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = Config::load(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Database: {}", config.server.db_path.display());
    println!("  Mode: {}", config.store.mode);
    println!("  Backend: {}", config.store.backend);
    if config.store.backend == pv_core::BlobBackend::Filesystem {
        println!("  Blob dir: {}", config.store.blob_dir.display());
    }

    for warning in config.validate() {
        println!("  warning: {warning}");
    }
    Ok(())
}
