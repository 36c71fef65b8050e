use chatlog_tail::{
    Comment, DEFAULT_CHANNEL, LogWatcherFactory, RelayConfig, WatcherConfig, default_log_dir,
    relay,
};
use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Print chat lines of one channel from the live PSO2 chat log.
#[derive(Parser, Debug)]
#[command(name = "chatlog-tail", version)]
struct Args {
    /// Log directory (defaults to <documents>/SEGA/PHANTASYSTARONLINE2/log)
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Channel to relay
    #[arg(long, default_value = DEFAULT_CHANNEL)]
    channel: String,

    /// In-game name to replace with --stream-user
    #[arg(long, requires = "stream_user")]
    game_user: Option<String>,

    /// Name shown for lines sent by --game-user
    #[arg(long, requires = "game_user")]
    stream_user: Option<String>,

    /// Read retry interval in milliseconds
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u64).range(1..))]
    poll_ms: u64,

    /// Directory scan interval in milliseconds
    #[arg(long, default_value_t = 250, value_parser = clap::value_parser!(u64).range(1..))]
    scan_ms: u64,
}

fn print_comment(comment: Comment) {
    println!("{}: {}", comment.author, comment.text);
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let Some(dir) = args.dir.or_else(default_log_dir) else {
        eprintln!("No log directory given and no default could be determined; use --dir");
        process::exit(2);
    };

    let factory = LogWatcherFactory::new(
        WatcherConfig::default()
            .with_poll_interval(Duration::from_millis(args.poll_ms))
            .with_scan_interval(Duration::from_millis(args.scan_ms)),
    );
    let config = RelayConfig {
        channel: args.channel,
        game_user: args.game_user,
        stream_user: args.stream_user,
    };

    info!(dir = %dir.display(), channel = %config.channel, "relaying chat log, Ctrl-C to stop");

    let wait = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "listening for Ctrl-C failed");
        }
    };

    if let Err(e) = relay(&factory, &dir, config, print_comment, wait).await {
        error!(error = %e, "chat log relay failed");
        process::exit(1);
    }
}
