use std::net::SocketAddr;

use tracing::info;

use pizza_mock_web::MockServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let addr: SocketAddr = std::env::var("PIZZA_MOCK_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
        .parse()?;

    let server = MockServer::pizza()?;
    info!("Starting pizza mock backend on http://{}", addr);

    server.serve(addr).await
}
