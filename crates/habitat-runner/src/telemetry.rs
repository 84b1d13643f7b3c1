//! Logging setup for the runner.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,habitat_world=debug";

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the default filter; `HABITAT_LOG_FORMAT=json` switches
/// the output to one JSON object per line.
pub fn init_logging() -> Result<()> {
    let json = std::env::var("HABITAT_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let (text_layer, json_layer) = if json {
        (None, Some(fmt::layer().json().with_target(true)))
    } else {
        (Some(fmt::layer().with_target(true)), None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text_layer)
        .with(json_layer)
        .try_init()?;

    info!(json, "Logging initialized");
    Ok(())
}
