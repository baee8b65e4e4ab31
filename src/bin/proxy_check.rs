//! Issues one HTTPS request through the configured proxy and reports the
//! response status and size.

use kandle::KandleError;
use kandle::config::fetch_config;
use kandle::http::build_client;
use kandle::proxy::check_proxy;

#[tokio::main]
async fn main() -> Result<(), KandleError> {
    let config = fetch_config()?;
    kandle::logging::init(config.log_level, config.environment)?;

    let client = build_client(&config.http)?;
    check_proxy(
        &client,
        &config.http.proxy_check_url,
        config.http.proxy_url.as_ref(),
    )
    .await?;

    Ok(())
}
