//! volsock-relay binary.

use clap::Parser;
use tokio::net::TcpListener;
use volsock_relay::{serve, GroupStore};

#[derive(Parser)]
#[command(name = "volsock-relay", about = "WebSocket relay for VolSock volume sync")]
struct Args {
    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = 8888)]
    port: u16,

    /// Request path that accepts WebSocket upgrades.
    #[arg(long, default_value = "/ws")]
    path: String,
}

#[tokio::main]
async fn main() -> volsock_common::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "volsock_relay=info".into()),
        )
        .init();

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("volsock-relay listening on ws://{}{}", addr, args.path);

    serve(listener, GroupStore::new(), args.path).await;
    Ok(())
}
