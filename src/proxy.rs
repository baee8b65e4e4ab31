//! Proxy connectivity smoke test.

use reqwest::{Client, StatusCode, Url};
use tracing::{error, info};

use crate::Result;
use crate::http::transport_error;

/// What the smoke test observed.
#[derive(Debug, Clone, Copy)]
pub struct ProxyReport {
    pub status: StatusCode,
    pub bytes: usize,
}

/// Issues one GET to `url` through `client` and logs the status and body
/// size.
///
/// Any HTTP status counts as connectivity; only transport failures are
/// errors.
///
/// # Errors
///
/// Returns [`KandleError::Network`](crate::KandleError::Network) if the
/// request cannot be completed.
pub async fn check_proxy(client: &Client, url: &Url, proxy: Option<&Url>) -> Result<ProxyReport> {
    let via = proxy.map_or_else(|| "direct".to_string(), Url::to_string);
    info!(url = %url, via = %via, "checking connectivity");

    let result = async {
        let response = client.get(url.clone()).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        Ok::<_, reqwest::Error>(ProxyReport {
            status,
            bytes: body.len(),
        })
    }
    .await;

    match result {
        Ok(report) => {
            info!(status = %report.status, bytes = report.bytes, "connectivity check succeeded");
            Ok(report)
        }
        Err(e) => {
            let err = transport_error("proxy-check", e);
            error!(url = %url, via = %via, error = %err, "connectivity check failed");
            Err(err)
        }
    }
}
