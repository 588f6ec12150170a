//! sysstats binary: serves host metrics over HTTP until interrupted.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sysstats::{start_web_server, SnapshotAssembler, SysinfoSource, WebConfig};
use tracing::{error, info, Level};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "sysstats")]
#[command(about = "Host resource metrics over HTTP and Server-Sent Events")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Web server bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Web server port (overrides the PORT environment variable)
    #[arg(short, long)]
    port: Option<u16>,

    /// Disable CORS headers
    #[arg(long)]
    no_cors: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server (default)
    Serve,

    /// Take a single snapshot, print it and exit
    Snapshot(SnapshotArgs),
}

#[derive(Args)]
struct SnapshotArgs {
    /// Output format: json or pretty
    #[arg(short, long, default_value = "json")]
    format: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    match &cli.command {
        Some(Commands::Snapshot(args)) => snapshot_command(args).await,
        Some(Commands::Serve) | None => serve_command(&cli).await,
    }
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(cli, rust_log.as_deref()))
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

/// `RUST_LOG` directives win; otherwise the level comes from the flags.
fn log_filter(cli: &Cli, rust_log: Option<&str>) -> EnvFilter {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .parse_lossy(rust_log.unwrap_or_default())
}

fn web_config(cli: &Cli) -> anyhow::Result<WebConfig> {
    let mut config = WebConfig::from_env()?
        .with_host(&cli.host)
        .with_cors(!cli.no_cors);
    if let Some(port) = cli.port {
        config = config.with_port(port);
    }
    Ok(config)
}

async fn serve_command(cli: &Cli) -> anyhow::Result<()> {
    let config = web_config(cli)?;

    info!("Web server configuration:");
    info!("  - Bind address: {}", config.bind_address());
    info!("  - CORS enabled: {}", config.enable_cors);
    info!("  - Stream interval: {:?}", config.stream_interval);

    let source = tokio::task::spawn_blocking(SysinfoSource::new)
        .await
        .context("failed to initialize metrics source")?;

    if let Err(e) = start_web_server(config, source, shutdown_signal()).await {
        error!("{}", e);
        return Err(e.into());
    }
    Ok(())
}

async fn snapshot_command(args: &SnapshotArgs) -> anyhow::Result<()> {
    let assembler = std::sync::Arc::new(SnapshotAssembler::new(SysinfoSource::new()));
    let snapshot = assembler.sample().await?;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        "pretty" => print_pretty_snapshot(&snapshot),
        other => anyhow::bail!("Unsupported format: {}. Use 'json' or 'pretty'", other),
    }

    Ok(())
}

fn print_pretty_snapshot(snapshot: &sysstats::Snapshot) {
    println!("CPU:     {:.1}%", snapshot.cpu_usage_percent());
    println!("Memory:  {:.1}%", snapshot.mem_usage_percent());
    println!("Disk:    {:.1}%", snapshot.disk_usage_percent());
    println!(
        "Network: {:.1} MB total",
        snapshot.net_traffic_bytes() as f64 / 1024.0 / 1024.0
    );
    println!("Processes: {}", snapshot.processes().len());
    for process in snapshot.processes() {
        println!(
            "  {:>7}  {:<24} {:>6.1}% {:>9.1} MB",
            process.pid(),
            process.name(),
            process.cpu_percent(),
            process.memory_usage_mb()
        );
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received interrupt"),
        _ = terminate => info!("Received termination request"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["sysstats", "--port", "9090"]).unwrap();
        assert_eq!(cli.port, Some(9090));
    }

    #[test]
    fn test_default_values() {
        let cli = Cli::try_parse_from(["sysstats"]).unwrap();
        assert_eq!(cli.port, None);
        assert_eq!(cli.host, "0.0.0.0");
        assert!(!cli.no_cors);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_snapshot_subcommand() {
        let cli = Cli::try_parse_from(["sysstats", "snapshot", "--format", "pretty"]).unwrap();
        match cli.command {
            Some(Commands::Snapshot(args)) => assert_eq!(args.format, "pretty"),
            _ => panic!("expected snapshot subcommand"),
        }
    }

    fn max_level(args: &[&str], rust_log: Option<&str>) -> Option<LevelFilter> {
        use tracing::Subscriber;

        let cli = Cli::try_parse_from(args).unwrap();
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(log_filter(&cli, rust_log))
            .finish();
        subscriber.max_level_hint()
    }

    #[test]
    fn test_log_level_follows_flags() {
        assert_eq!(max_level(&["sysstats"], None), Some(LevelFilter::WARN));
        assert_eq!(max_level(&["sysstats", "--verbose"], None), Some(LevelFilter::INFO));
        assert_eq!(max_level(&["sysstats", "--debug"], None), Some(LevelFilter::DEBUG));
        assert_eq!(max_level(&["sysstats", "--debug"], Some("")), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_rust_log_overrides_flags() {
        assert_eq!(
            max_level(&["sysstats", "--verbose"], Some("trace")),
            Some(LevelFilter::TRACE)
        );
    }

    #[test]
    fn test_cli_port_overrides_config() {
        let cli = Cli::try_parse_from(["sysstats", "-p", "4000", "--host", "127.0.0.1"]).unwrap();
        let config = web_config(&cli).unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:4000");
    }
}
