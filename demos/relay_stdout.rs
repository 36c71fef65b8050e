use chatlog_tail::{LogWatcherFactory, RelayConfig, WatcherConfig, relay};
use std::path::PathBuf;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    // Relay the guild channel of a log directory for half a minute
    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("logs"));

    let factory = LogWatcherFactory::new(WatcherConfig::default());
    let config = RelayConfig {
        game_user: Some("白 菜".to_string()),
        stream_user: Some("hakusai".to_string()),
        ..RelayConfig::default()
    };

    println!("Relaying {} from {}...", config.channel, dir.display());
    relay(
        &factory,
        &dir,
        config,
        |comment| println!("{} > {}", comment.author, comment.text),
        tokio::time::sleep(Duration::from_secs(30)),
    )
    .await?;

    println!("Done");
    Ok(())
}
