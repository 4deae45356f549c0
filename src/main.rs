use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use quickcode_core::CoreConfig;

/// Main entry point for the QuickCode analysis server
///
/// Serves the REST API (`POST /api/analyze`, `GET /health`, Swagger UI) on all interfaces.
///
/// # Environment Variables
/// - `GEMINI_API_KEY`: model provider credential (required; startup fails without it)
/// - `GEMINI_MODEL`: model name (default: "gemini-1.5-flash")
/// - `GEMINI_API_BASE`: provider base URL
/// - `PROVIDER_TIMEOUT_SECS`: per-request provider timeout (default: 60)
/// - `PORT`: listen port (default: 3001)
///
/// `QUICKCODE_CONFLICT_RULES` is ignored here: conflict checks run in the review session, which
/// the server does not host.
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration, startup or serving fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("quickcode=info".parse()?)
                .add_directive("quickcode_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = CoreConfig::from_env().context("invalid QuickCode configuration")?;
    let gateway =
        quickcode_core::gemini_gateway(&cfg).context("failed to build model provider client")?;

    let addr = format!("0.0.0.0:{}", cfg.port());
    tracing::info!("++ Starting QuickCode REST on {} (model {})", addr, cfg.model());

    let app = api_rest::router(AppState::new(gateway));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
