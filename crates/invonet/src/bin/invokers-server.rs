use std::sync::Arc;

use anyhow::Result;
use invonet::Server;
use invonet::ServerConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env()?;
    let registry = Arc::new(invorpc::registry()?);
    let (server, mut calls) = Server::bind(config, registry).await?;
    let handle = server.handle();

    tokio::spawn(async move {
        while let Some(call) = calls.recv().await {
            info!(
                peer = call.peer,
                addr = %call.addr,
                method = %call.body.method,
                args = ?call.body.args.argvs,
                "rpc"
            );
        }
    });

    let shutdown = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received");
            shutdown.shutdown();
        }
    });

    server.run().await?;
    Ok(())
}
