use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

/// Installs the Prometheus recorder when the exporter is enabled. The handle
/// lives in `AppState` so the `/metrics` handler can render from it.
pub(crate) fn install(settings: &Settings) -> anyhow::Result<Option<PrometheusHandle>> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(None);
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    Ok(Some(handle))
}
