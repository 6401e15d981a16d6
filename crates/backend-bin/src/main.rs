use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use puzzlee_common::Applied;
use puzzlee_realtime::{client::RoomClient, telemetry, ws_router, AppState, Settings};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "puzzlee-realtime", version, about = "Realtime fan-out for Puzzlee event rooms")]
struct Cli {
    /// Config file (defaults to ./puzzlee.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the WebSocket server and publish API
    Serve {
        /// Override the configured bind address
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Join a room on a running server and log the local feed as it changes
    Watch {
        /// WebSocket endpoint, e.g. ws://127.0.0.1:4000/ws
        url: String,
        /// Event id or join code
        room: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    telemetry::init_tracing(&settings)?;

    match cli.command {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                settings.bind_addr = bind;
            }
            serve(settings).await
        },
        Command::Watch { url, room } => watch(&url, room).await,
    }
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    let addr = settings.bind_addr;
    let state = Arc::new(AppState::new(settings));
    let app = ws_router::create_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn watch(url: &str, room: String) -> anyhow::Result<()> {
    let mut client = RoomClient::connect(url).await?;
    let mut subscription = client.subscribe(room);
    info!(room = subscription.room(), "watching");

    loop {
        tokio::select! {
            msg = client.next_message() => {
                let Some(msg) = msg else {
                    info!("connection closed by server");
                    break;
                };
                let applied = subscription.handle(&msg);
                if applied != Applied::Ignored {
                    let feed = subscription.feed();
                    info!(
                        kind = %msg.kind,
                        seq = msg.seq,
                        ?applied,
                        questions = feed.questions().len(),
                        answers = feed.answers().len(),
                        comments = feed.comments().len(),
                        gaps = feed.gaps(),
                        "feed updated"
                    );
                }
            }
            _ = shutdown_signal() => break,
        }
    }

    subscription.unmount();
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
