//! Mobile SDKs behave like browser SDKs: one bound user, replaceable with `update_user`.
use async_trait::async_trait;

use crate::{
    backend::BackendResult,
    Adapter, AdapterError, AnalyticsEvent, BackendScope, ClientConfig, DynamicConfigValue,
    EvaluationContext, ExperimentValue, LayerValue, Services, Subject,
};

/// Client interface of a mobile backend SDK.
#[async_trait]
pub trait MobileClient: Send + Sync {
    /// Initialize the client for the device's user.
    async fn initialize(&self, config: &ClientConfig, subject: &Subject) -> BackendResult<()>;

    /// Replace the user the client evaluates for.
    async fn update_user(&self, subject: &Subject) -> BackendResult<()>;

    /// Release the client's resources.
    async fn shutdown(&self) -> BackendResult<()>;

    /// Evaluate `gate`, recording an exposure when `expose` is set.
    async fn check_gate(&self, gate: &str, expose: bool) -> BackendResult<bool>;

    /// Assignment of `experiment` for the current user.
    async fn get_experiment(&self, experiment: &str) -> BackendResult<ExperimentValue>;

    /// Parameters of `layer` for the current user.
    async fn get_layer(&self, layer: &str) -> BackendResult<LayerValue>;

    /// Values of `config` for the current user.
    async fn get_dynamic_config(&self, config: &str) -> BackendResult<DynamicConfigValue>;

    /// Queue `event` for delivery. Mobile SDKs usually batch.
    async fn log_event(&self, event: &AnalyticsEvent) -> BackendResult<()>;

    /// Send buffered events.
    async fn flush(&self) -> BackendResult<()>;
}

/// Binds a [`MobileClient`] to the [`Backend`](crate::backend::Backend) and
/// [`Rebind`](crate::backend::Rebind) shapes.
pub struct MobileBackend<C>(C);

impl<C: MobileClient> MobileBackend<C> {
    /// Wrap `client`.
    pub fn new(client: C) -> MobileBackend<C> {
        MobileBackend(client)
    }

    /// The wrapped client.
    pub fn client(&self) -> &C {
        &self.0
    }
}

forward_bound_client!(MobileBackend, MobileClient, rebind);

/// Services on a client already initialized for its user.
pub fn mobile_services<C: MobileClient + 'static>(client: C) -> Services {
    Adapter::new(MobileBackend::new(client)).into_services()
}

/// Initialize `client` for the context's subject until the scope is released.
pub async fn mobile_scope<C: MobileClient + 'static>(
    client: C,
    context: &EvaluationContext,
) -> Result<BackendScope<MobileBackend<C>>, AdapterError> {
    BackendScope::acquire(MobileBackend::new(client), context).await
}
