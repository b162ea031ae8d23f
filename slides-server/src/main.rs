use anyhow::Result;
use slides_core::SlidesConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let app = slides_server::build()?;
    let addr = slides_server::app::listen_addr(&SlidesConfig::from_env().snapshot());

    app.listen(addr).await?;

    Ok(())
}
