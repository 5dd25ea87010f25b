use tracing_subscriber::{fmt, fmt::format::FmtSpan, EnvFilter};

use crate::core::config::Settings;

const FALLBACK_DIRECTIVES: &str = "markpilot_rust=info,tower_http=info";

/// `RUST_LOG` wins over the configured level; a malformed configured level
/// falls back to the crate defaults instead of failing startup.
pub(crate) fn init_tracing(settings: &Settings) -> anyhow::Result<()> {
    let telemetry = settings.telemetry();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&telemetry.log_level))
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_DIRECTIVES));

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE);

    let installed =
        if telemetry.json { builder.json().try_init() } else { builder.try_init() };

    installed.map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {err}"))
}
