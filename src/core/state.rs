use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;

use crate::core::config::Settings;
use crate::services::canvas::CanvasClient;
use crate::services::feedback::FeedbackService;
use crate::services::progress::ProgressStore;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    canvas: CanvasClient,
    feedback: FeedbackService,
    progress: ProgressStore,
    metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        db: PgPool,
        canvas: CanvasClient,
        feedback: FeedbackService,
        progress: ProgressStore,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        Self { inner: Arc::new(InnerState { settings, db, canvas, feedback, progress, metrics }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn canvas(&self) -> &CanvasClient {
        &self.inner.canvas
    }

    pub(crate) fn feedback(&self) -> &FeedbackService {
        &self.inner.feedback
    }

    pub(crate) fn progress(&self) -> &ProgressStore {
        &self.inner.progress
    }

    pub(crate) fn metrics_handle(&self) -> Option<&PrometheusHandle> {
        self.inner.metrics.as_ref()
    }
}
