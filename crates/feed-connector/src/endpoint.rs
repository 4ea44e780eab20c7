//! Feed URL construction.

use gsefeed_telemetry_types::constants::API_KEY_PARAM;

use crate::types::FeedConfig;

/// Builds the resolved feed URL: base, an optional `/{target}` path
/// segment for the per-vehicle detail feed, and the credential token as
/// a query parameter.
pub(crate) fn feed_url(config: &FeedConfig, target: Option<&str>) -> String {
    let base = config.base_url.trim_end_matches('/');
    match target {
        Some(id) => format!("{base}/{id}?{API_KEY_PARAM}={}", config.api_key),
        None => format!("{base}?{API_KEY_PARAM}={}", config.api_key),
    }
}
