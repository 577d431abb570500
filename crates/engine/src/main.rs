//! ApBridge - console runner.
//!
//! Reads chat events and commands from stdin and writes the host chat to stdout.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use apbridge_engine::api::Console;
use apbridge_engine::infrastructure::{
    archipelago::WebSocketConnector,
    config::{ConfigSource, LiveConfig},
    random::SystemRandom,
    stdio_host::StdioHost,
};
use apbridge_engine::App;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    // Initialize logging (stderr, so stdout stays the chat transcript)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "apbridge_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // tokio-tungstenite builds its TLS config from the process-wide provider.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config_path: PathBuf = std::env::var("APBRIDGE_CONFIG")
        .unwrap_or_else(|_| "apbridge.toml".into())
        .into();
    let config = Arc::new(LiveConfig::load(&config_path)?);
    let connector = WebSocketConnector::from_config(&config.current().connection);

    let app = App::new(
        config,
        Arc::new(connector),
        Arc::new(StdioHost::new()),
        Arc::new(SystemRandom::new()),
        Handle::current(),
    );
    app.rewards.attach();
    tracing::info!("ApBridge ready; type :connect to sign in");

    let console = Console::new(&app);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    if !console.execute(&line).await {
                        break;
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    app.shutdown().await;
    tracing::info!("ApBridge stopped");
    Ok(())
}

fn load_dotenv() {
    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let _ = dotenvy::from_filename(filename);
    }
}
