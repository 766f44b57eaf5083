use chirp::{ReplicaConfig, ReplicaOptions};
use chrono::Utc;
use clap::Parser;
use slog::Drain;
use std::error::Error;
use std::fs::OpenOptions;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tokio::time::Duration;

/// Backend replica for the chirp social network. The first replica to start becomes master,
/// later ones join it as followers.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address every replica of this deployment listens on.
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port the master serves front-end commands on.
    #[arg(long, default_value_t = 5000)]
    master_port: u16,

    /// Port the master admits new replicas on.
    #[arg(long, default_value_t = 4000)]
    bootstrap_port: u16,

    /// Followers listen on this plus their id.
    #[arg(long, default_value_t = 5100)]
    follower_port_base: u16,

    /// Id taken by the first master.
    #[arg(long, default_value_t = 1)]
    master_id: u32,

    /// How often the master pings followers, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    ping_interval_ms: u64,

    /// How long a follower waits without contact before holding an election, in milliseconds.
    #[arg(long, default_value_t = 3000)]
    follower_timeout_ms: u64,

    /// Directory for persisted user records. Records stay in memory only when unset.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory to write the info log to, instead of stdout.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let info_logger = match args.log_dir.as_deref() {
        Some(directory) => create_root_logger_for_file(directory)?,
        None => create_root_logger_for_stdout(),
    };

    let config = ReplicaConfig {
        data_directory: args.data_dir,
        info_logger: info_logger.clone(),
        options: ReplicaOptions {
            host: Some(args.host),
            master_command_port: Some(args.master_port),
            bootstrap_port: Some(args.bootstrap_port),
            follower_port_base: Some(args.follower_port_base),
            master_id: Some(args.master_id),
            ping_interval: Some(Duration::from_millis(args.ping_interval_ms)),
            follower_accept_timeout: Some(Duration::from_millis(args.follower_timeout_ms)),
            ..ReplicaOptions::default()
        },
    };
    let replica = chirp::try_create_replica(config).await?;

    tokio::signal::ctrl_c().await?;
    slog::info!(info_logger, "Interrupted. Last known membership: {:?}", replica.status());
    replica.shutdown().await;

    Ok(())
}

fn create_root_logger_for_stdout() -> slog::Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).use_file_location().build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    slog::Logger::root(drain, slog::o!())
}

fn create_root_logger_for_file(directory: &Path) -> Result<slog::Logger, Box<dyn Error>> {
    std::fs::create_dir_all(directory)?;
    let now = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(directory.join(format!("{}_info.log", now)))?;

    let decorator = slog_term::PlainDecorator::new(file);
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    Ok(slog::Logger::root(drain, slog::o!()))
}
