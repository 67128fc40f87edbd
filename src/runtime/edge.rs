//! Edge workers create one client per request, so the subject is fixed at initialization.
use async_trait::async_trait;

use crate::{
    backend::BackendResult,
    Adapter, AdapterError, AnalyticsEvent, BackendScope, ClientConfig, DynamicConfigValue,
    EvaluationContext, ExperimentValue, LayerValue, Services, Subject,
};

/// Client interface of an edge-runtime backend SDK.
#[async_trait]
pub trait EdgeClient: Send + Sync {
    /// Initialize the client for the request's subject.
    async fn initialize(&self, config: &ClientConfig, subject: &Subject) -> BackendResult<()>;

    /// Release the client's resources.
    async fn shutdown(&self) -> BackendResult<()>;

    /// Evaluate `gate`, recording an exposure when `expose` is set.
    async fn check_gate(&self, gate: &str, expose: bool) -> BackendResult<bool>;

    /// Assignment of `experiment`.
    async fn get_experiment(&self, experiment: &str) -> BackendResult<ExperimentValue>;

    /// Parameters of `layer`.
    async fn get_layer(&self, layer: &str) -> BackendResult<LayerValue>;

    /// Values of `config`.
    async fn get_dynamic_config(&self, config: &str) -> BackendResult<DynamicConfigValue>;

    /// Queue `event` for delivery.
    async fn log_event(&self, event: &AnalyticsEvent) -> BackendResult<()>;

    /// Send buffered events before the request ends.
    async fn flush(&self) -> BackendResult<()>;
}

/// Binds an [`EdgeClient`] to the [`Backend`](crate::backend::Backend) shape.
pub struct EdgeBackend<C>(C);

impl<C: EdgeClient> EdgeBackend<C> {
    /// Wrap `client`.
    pub fn new(client: C) -> EdgeBackend<C> {
        EdgeBackend(client)
    }

    /// The wrapped client.
    pub fn client(&self) -> &C {
        &self.0
    }
}

forward_bound_client!(EdgeBackend, EdgeClient);

/// Services on a client that was already initialized for its subject.
pub fn edge_services<C: EdgeClient + 'static>(client: C) -> Services {
    Adapter::new(EdgeBackend::new(client)).into_services()
}

/// Initialize `client` for the context's subject until the scope is released.
pub async fn edge_scope<C: EdgeClient + 'static>(
    client: C,
    context: &EvaluationContext,
) -> Result<BackendScope<EdgeBackend<C>>, AdapterError> {
    BackendScope::acquire(EdgeBackend::new(client), context).await
}
