//! Server SDKs evaluate on behalf of many users, so the subject travels with every call.
use async_trait::async_trait;

use crate::{
    backend::{Backend, BackendResult},
    Adapter, AdapterError, AnalyticsEvent, BackendScope, ClientConfig, DynamicConfigValue,
    EvaluationContext, ExperimentValue, LayerValue, Services, Subject,
};

/// Client interface of a server-side backend SDK.
#[async_trait]
pub trait ServerClient: Send + Sync {
    /// Connect the client. Subjects are passed per call.
    async fn initialize(&self, config: &ClientConfig) -> BackendResult<()>;

    /// Release the client's resources.
    async fn shutdown(&self) -> BackendResult<()>;

    /// Evaluate `gate` for `subject`, recording an exposure when `expose` is set.
    async fn check_gate(&self, subject: &Subject, gate: &str, expose: bool) -> BackendResult<bool>;

    /// Assignment of `experiment` for `subject`.
    async fn get_experiment(
        &self,
        subject: &Subject,
        experiment: &str,
    ) -> BackendResult<ExperimentValue>;

    /// Parameters of `layer` for `subject`.
    async fn get_layer(&self, subject: &Subject, layer: &str) -> BackendResult<LayerValue>;

    /// Values of `config` for `subject`.
    async fn get_dynamic_config(
        &self,
        subject: &Subject,
        config: &str,
    ) -> BackendResult<DynamicConfigValue>;

    /// Queue `event` for delivery.
    async fn log_event(&self, event: &AnalyticsEvent) -> BackendResult<()>;

    /// Send buffered events.
    async fn flush(&self) -> BackendResult<()>;
}

/// A [`ServerClient`] evaluating for one fixed subject.
pub struct ServerBackend<C> {
    client: C,
    subject: Subject,
}

impl<C: ServerClient> ServerBackend<C> {
    /// Evaluate every call through `client` for `subject`.
    pub fn new(client: C, subject: Subject) -> ServerBackend<C> {
        ServerBackend { client, subject }
    }

    /// The wrapped client.
    pub fn client(&self) -> &C {
        &self.client
    }
}

#[async_trait]
impl<C: ServerClient> Backend for ServerBackend<C> {
    async fn initialize(&self, config: &ClientConfig, _subject: &Subject) -> BackendResult<()> {
        self.client.initialize(config).await
    }

    async fn shutdown(&self) -> BackendResult<()> {
        self.client.shutdown().await
    }

    async fn check_gate(&self, gate: &str, expose: bool) -> BackendResult<bool> {
        self.client.check_gate(&self.subject, gate, expose).await
    }

    async fn get_experiment(&self, experiment: &str) -> BackendResult<ExperimentValue> {
        self.client.get_experiment(&self.subject, experiment).await
    }

    async fn get_layer(&self, layer: &str) -> BackendResult<LayerValue> {
        self.client.get_layer(&self.subject, layer).await
    }

    async fn get_dynamic_config(&self, config: &str) -> BackendResult<DynamicConfigValue> {
        self.client.get_dynamic_config(&self.subject, config).await
    }

    async fn log_event(&self, event: &AnalyticsEvent) -> BackendResult<()> {
        self.client.log_event(event).await
    }

    async fn flush(&self) -> BackendResult<()> {
        self.client.flush().await
    }
}

/// Services evaluating for `subject` on an already initialized client.
pub fn server_services<C: ServerClient + 'static>(client: C, subject: Subject) -> Services {
    Adapter::new(ServerBackend::new(client, subject)).into_services()
}

/// Initialize `client` and evaluate for the context's subject until the scope is released.
pub async fn server_scope<C: ServerClient + 'static>(
    client: C,
    context: &EvaluationContext,
) -> Result<BackendScope<ServerBackend<C>>, AdapterError> {
    BackendScope::acquire(ServerBackend::new(client, context.subject.clone()), context).await
}
