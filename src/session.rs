//! Activation and request handling for a mock session.
//!
//! A session owns at most one installed [`MockLayer`]. Activations may
//! overlap: each takes a generation number, and only the most recent one
//! is allowed to install its layer.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::compose::{ComposeError, Composer, Selection};
use crate::interceptor::{MockRequest, MockResponse};
use crate::layer::MockLayer;
use crate::preset::PresetRegistry;
use crate::report::ActivationReport;
use crate::state::MockState;

/// Reason returned for requests made while no layer is installed.
pub const NO_LAYER_REASON: &str = "no mock layer installed";

pub struct MockSession {
    registry: &'static PresetRegistry,
    generation: AtomicU64,
    layer: Mutex<Option<Installed>>,
}

struct Installed {
    generation: u64,
    layer: MockLayer,
}

impl MockSession {
    pub fn new(registry: &'static PresetRegistry) -> Self {
        Self {
            registry,
            generation: AtomicU64::new(0),
            layer: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &'static PresetRegistry {
        self.registry
    }

    /// Generation of the most recently started activation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Compose a selection and install the resulting layer.
    ///
    /// The previous layer keeps serving requests until the new one is
    /// installed. If another activation starts before this one finishes
    /// composing, this one returns [`ComposeError::Superseded`] and
    /// installs nothing.
    pub async fn activate(&self, selection: &Selection) -> Result<ActivationReport, ComposeError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(generation, presets = ?selection.preset_ids, "activating mock presets");

        let composed = Composer::new(self.registry).compose(selection).await?;

        let mut slot = self.layer.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            warn!(generation, "discarding superseded composition");
            return Err(ComposeError::Superseded { generation });
        }
        let layer = MockLayer::from(composed);
        let report = ActivationReport::new(generation, &layer, self.registry);
        *slot = Some(Installed { generation, layer });
        info!(
            generation,
            interceptors = report.interceptors,
            "mock layer installed"
        );
        Ok(report)
    }

    /// Serve a request through the installed layer.
    pub async fn handle(&self, request: MockRequest) -> MockResponse {
        let mut slot = self.layer.lock().await;
        match slot.as_mut() {
            Some(installed) => installed.layer.dispatch(request),
            None => MockResponse::api_error(404, NO_LAYER_REASON),
        }
    }

    /// Uninstall the current layer, returning its final state.
    pub async fn deactivate(&self) -> Option<MockState> {
        // Invalidate in-flight activations too.
        self.generation.fetch_add(1, Ordering::SeqCst);
        let installed = self.layer.lock().await.take()?;
        info!(generation = installed.generation, "mock layer removed");
        Some(installed.layer.into_state())
    }

    pub async fn is_active(&self) -> bool {
        self.layer.lock().await.is_some()
    }

    /// Clone of the installed layer's state.
    pub async fn snapshot(&self) -> Option<MockState> {
        self.layer
            .lock()
            .await
            .as_ref()
            .map(|installed| installed.layer.state().clone())
    }

    /// Report for the installed layer.
    pub async fn report(&self) -> Option<ActivationReport> {
        self.layer
            .lock()
            .await
            .as_ref()
            .map(|installed| {
                ActivationReport::new(installed.generation, &installed.layer, self.registry)
            })
    }
}

impl Default for MockSession {
    fn default() -> Self {
        Self::new(PresetRegistry::global())
    }
}
