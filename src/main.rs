//! host_stats - Linux host telemetry server binary
//!
//! Serves static and dynamic host snapshots over HTTP and WebSocket, prints a
//! one-off snapshot, or follows a running server from the terminal.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use host_stats::{
    start_web_server, watch, CollectorConfig, DashboardSession, DiskDevice, DynamicSnapshot,
    HostCollector, SnapshotSource, StaticSnapshot, WatchConfig, WebConfig, DEFAULT_CPU_SAMPLE_MS,
    DEFAULT_REFRESH_MS, DEFAULT_WEB_PORT,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::{filter::LevelFilter, EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "host_stats")]
#[command(about = "Linux host telemetry over HTTP and WebSocket")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    long_about = "Reads host metrics from mounted /proc, /sys and /etc trees and serves them to dashboard clients"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    collector: CollectorArgs,

    /// Web server bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Web server port
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_WEB_PORT)]
    port: u16,

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

#[derive(Args)]
struct CollectorArgs {
    /// Host /proc mount
    #[arg(long, default_value = "/host/proc")]
    proc_root: PathBuf,

    /// Host /sys mount
    #[arg(long, default_value = "/host/sys")]
    sys_root: PathBuf,

    /// Host /etc mount
    #[arg(long, default_value = "/host/etc")]
    etc_root: PathBuf,

    /// Gap between CPU counter samples in milliseconds (0 = since boot)
    #[arg(long, default_value_t = DEFAULT_CPU_SAMPLE_MS)]
    cpu_sample_ms: u64,

    /// Mount point included in disk totals (repeatable)
    #[arg(long = "disk-mount", default_value = "/")]
    disk_mounts: Vec<String>,

    /// Device included in disk totals, as DEV or DEV=LABEL (repeatable)
    #[arg(long = "disk-device")]
    disk_devices: Vec<DiskDevice>,

    /// Container runtime CLI
    #[arg(long, default_value = "docker")]
    docker_bin: String,

    /// Run the address tool in this process's own network namespace
    #[arg(long)]
    no_host_netns: bool,
}

impl CollectorArgs {
    fn to_config(&self) -> CollectorConfig {
        CollectorConfig::default()
            .with_proc_root(&self.proc_root)
            .with_sys_root(&self.sys_root)
            .with_etc_root(&self.etc_root)
            .with_cpu_sample_interval(Duration::from_millis(self.cpu_sample_ms))
            .with_disk_mounts(self.disk_mounts.clone())
            .with_disk_devices(self.disk_devices.clone())
            .with_docker_bin(&self.docker_bin)
            .with_host_netns(!self.no_host_netns)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server (default)
    Serve,

    /// Build one static and one dynamic snapshot and exit
    Snapshot(SnapshotArgs),

    /// Follow a running server
    Watch(WatchArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Args)]
struct SnapshotArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,
}

#[derive(Args)]
struct WatchArgs {
    /// Server base URL
    #[arg(long, default_value = "http://localhost:8080")]
    url: String,

    /// Refresh interval in milliseconds
    #[arg(long, default_value_t = DEFAULT_REFRESH_MS)]
    interval_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    match &cli.command {
        Some(Commands::Serve) | None => {
            print_banner();
            serve_command(&cli).await?;
        }
        Some(Commands::Snapshot(args)) => {
            snapshot_command(&cli, args).await?;
        }
        Some(Commands::Watch(args)) => {
            watch_command(args).await?;
        }
    }

    Ok(())
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(log_level(cli), rust_log.as_deref()))
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn log_level(cli: &Cli) -> Level {
    if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    }
}

/// `RUST_LOG` directives when given, otherwise everything at `level` and above.
fn log_filter(level: Level, rust_log: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .parse_lossy(rust_log.unwrap_or_default())
}

fn print_banner() {
    println!("host_stats - Linux host telemetry");
    println!("   Version: {}", env!("CARGO_PKG_VERSION"));
    println!();
}

async fn serve_command(cli: &Cli) -> anyhow::Result<()> {
    let collector_config = cli.collector.to_config();
    let web_config = WebConfig::new(&cli.host, cli.port).with_cors(!cli.no_cors);

    info!("Collector configuration:");
    info!("  - proc: {}", collector_config.proc_root.display());
    info!("  - sys: {}", collector_config.sys_root.display());
    info!("  - etc: {}", collector_config.etc_root.display());
    info!("  - Disk mounts: {:?}", collector_config.disk_mounts);
    info!("  - CPU sample: {:?}", collector_config.cpu_sample_interval);
    info!("Web server configuration:");
    info!("  - Bind address: {}", web_config.bind_address());
    info!("  - CORS enabled: {}", web_config.enable_cors);

    let source = Arc::new(HostCollector::new(collector_config));
    start_web_server(web_config, source).await?;

    Ok(())
}

async fn snapshot_command(cli: &Cli, args: &SnapshotArgs) -> anyhow::Result<()> {
    let collector = HostCollector::new(cli.collector.to_config());

    let (static_data, dynamic_data) = tokio::task::spawn_blocking(move || {
        (collector.static_snapshot(), collector.dynamic_snapshot())
    })
    .await
    .context("Snapshot task failed")?;

    match args.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "static": static_data,
                "dynamic": dynamic_data,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Pretty => print_pretty_snapshot(&static_data, &dynamic_data),
    }

    Ok(())
}

async fn watch_command(args: &WatchArgs) -> anyhow::Result<()> {
    let config =
        WatchConfig::new(&args.url).with_interval(Duration::from_millis(args.interval_ms.max(1)));
    info!("Watching {} every {:?}", config.base_url, config.interval);

    tokio::select! {
        result = watch(config, print_update) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Stopped watching");
            Ok(())
        }
    }
}

fn print_update(session: &DashboardSession) {
    if let (Some(static_data), Some(dynamic_data)) = (session.static_data(), session.dynamic_data())
    {
        print_pretty_snapshot(static_data, dynamic_data);
    }
}

fn print_pretty_snapshot(static_data: &StaticSnapshot, dynamic: &DynamicSnapshot) {
    println!(
        "{} ({} {} {}) at {}",
        static_data.hostname,
        static_data.platform,
        static_data.arch,
        static_data.kernel,
        chrono::DateTime::from_timestamp_millis(dynamic.timestamp)
            .unwrap_or_default()
            .format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("==========================================");

    println!("CPU:");
    println!("  Model: {} ({} cores)", static_data.cpu.model, static_data.cpu.cores);
    println!("  Usage: {:.2}%", dynamic.cpu.usage_percent);
    println!(
        "  Load: {:.2}, {:.2}, {:.2}",
        dynamic.loadavg.load1, dynamic.loadavg.load5, dynamic.loadavg.load15
    );
    match dynamic.temperature.cpu_c {
        Some(celsius) => println!("  Temperature: {:.1}°C", celsius),
        None => println!("  Temperature: unavailable"),
    }

    println!("Memory:");
    println!(
        "  {:.2} GB used of {:.2} GB ({:.2}%)",
        dynamic.memory.used_gb, dynamic.memory.total_gb, dynamic.memory.usage_percent
    );

    println!("Uptime: {}", dynamic.uptime.formatted);

    if !dynamic.disk.filesystems.is_empty() {
        println!("Disk:");
        for fs in &dynamic.disk.filesystems {
            println!(
                "  {} on {}: {} of {} ({:.0}%)",
                fs.device, fs.mountpoint, fs.used_gb, fs.total_gb, fs.usage_percent
            );
        }
    }

    if !dynamic.network.is_empty() {
        println!("Network:");
        for iface in &dynamic.network {
            let addresses: Vec<&str> = iface.addresses.iter().map(|a| a.ip.as_str()).collect();
            println!("  {} [{}] {}", iface.name, iface.state, addresses.join(", "));
        }
    }

    for battery in &dynamic.battery {
        println!("Battery {}: {}% {}", battery.id, battery.percent, battery.status);
    }

    if !dynamic.docker.is_empty() {
        println!("Containers:");
        for container in &dynamic.docker {
            println!("  {} ({}) {}", container.name, container.image, container.status);
        }
    }

    println!();
}
