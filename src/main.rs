use kandle::KandleError;
use kandle::config::fetch_config;
use kandle::context::Context;
use kandle::runner::run;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), KandleError> {
    let config = fetch_config()?;
    kandle::logging::init(config.log_level, config.environment)?;

    info!(
        environment = %config.environment,
        exchanges = ?config.exchanges,
        symbols = ?config.symbols,
        data_dir = %config.data_dir.display(),
        proxy = config.http.proxy_url.is_some(),
        "starting"
    );

    let ctx = Context::new(config)?;
    let summary = run(&ctx).await;

    for failure in &summary.failures {
        warn!(
            exchange = %failure.exchange,
            symbol = failure.symbol.as_deref().unwrap_or("-"),
            error = %failure.error,
            "unit failed"
        );
    }

    Ok(())
}
