#[tokio::main]
async fn main() -> anyhow::Result<()> {
    balcao_observability::init();

    let config = balcao_gateway::GatewayConfig::from_env();
    let addr = config.bind_addr.clone();

    let app = balcao_gateway::app::build_app(config)?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
