//! Minimal feed consumer: subscribes to the fleet-wide feed and logs
//! vehicle positions. Stands in for the dashboard UI.
//!
//! ```sh
//! FEED_URL=ws://localhost:9000/feed/vehicles FEED_API_KEY=dev \
//!     cargo run -p gsefeed-connector --example fleet_watch
//! ```

use gsefeed_connector::{FeedConfig, FeedConnector};
use gsefeed_telemetry_types::FleetSnapshot;
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let base_url =
        std::env::var("FEED_URL").unwrap_or_else(|_| "ws://localhost:9000/feed/vehicles".into());
    let api_key = std::env::var("FEED_API_KEY").unwrap_or_else(|_| "dev".into());

    let feed = FeedConnector::<FleetSnapshot>::new(FeedConfig::new(base_url, api_key));

    feed.set_connect_callback(|| info!("fleet feed connected"));
    feed.set_error_callback(|e| warn!("fleet feed error: {e}"));
    feed.set_message_callback(|snapshot: FleetSnapshot| {
        for v in &snapshot.vehicles {
            info!(
                id = %v.id,
                lat = v.position.lat,
                lon = v.position.lon,
                speed = v.speed,
                battery = v.battery_level,
                state = ?v.state,
                "vehicle"
            );
        }
    });

    feed.connect(None);

    if tokio::signal::ctrl_c().await.is_ok() {
        feed.disconnect().await;
    }
}
