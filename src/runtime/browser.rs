//! Browser SDKs hold one signed-in user at a time and switch it with `update_user`.
use async_trait::async_trait;

use crate::{
    backend::BackendResult,
    Adapter, AdapterError, AnalyticsEvent, BackendScope, ClientConfig, DynamicConfigValue,
    EvaluationContext, ExperimentValue, LayerValue, Services, Subject,
};

/// Client interface of a browser backend SDK.
#[async_trait]
pub trait BrowserClient: Send + Sync {
    /// Initialize the client for the signed-in subject.
    async fn initialize(&self, config: &ClientConfig, subject: &Subject) -> BackendResult<()>;

    /// Replace the subject the client evaluates for.
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

    /// Queue `event` for delivery.
    async fn log_event(&self, event: &AnalyticsEvent) -> BackendResult<()>;

    /// Send buffered events.
    async fn flush(&self) -> BackendResult<()>;
}

/// Binds a [`BrowserClient`] to the [`Backend`](crate::backend::Backend) and
/// [`Rebind`](crate::backend::Rebind) shapes.
pub struct BrowserBackend<C>(C);

impl<C: BrowserClient> BrowserBackend<C> {
    /// Wrap `client`.
    pub fn new(client: C) -> BrowserBackend<C> {
        BrowserBackend(client)
    }

    /// The wrapped client.
    pub fn client(&self) -> &C {
        &self.0
    }
}

forward_bound_client!(BrowserBackend, BrowserClient, rebind);

/// Services on a client already initialized for its user.
pub fn browser_services<C: BrowserClient + 'static>(client: C) -> Services {
    Adapter::new(BrowserBackend::new(client)).into_services()
}

/// Initialize `client` for the context's subject. Use
/// [`BackendScope::update_user`] to switch users afterwards.
pub async fn browser_scope<C: BrowserClient + 'static>(
    client: C,
    context: &EvaluationContext,
) -> Result<BackendScope<BrowserBackend<C>>, AdapterError> {
    BackendScope::acquire(BrowserBackend::new(client), context).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{context, RecordingClient};

    #[async_trait]
    impl BrowserClient for RecordingClient {
        async fn initialize(&self, _config: &ClientConfig, subject: &Subject) -> BackendResult<()> {
            self.on_initialize(Some(subject))
        }

        async fn update_user(&self, subject: &Subject) -> BackendResult<()> {
            self.on_update_user(subject)
        }

        async fn shutdown(&self) -> BackendResult<()> {
            self.on_shutdown()
        }

        async fn check_gate(&self, gate: &str, expose: bool) -> BackendResult<bool> {
            self.on_check_gate(None, gate, expose)
        }

        async fn get_experiment(&self, experiment: &str) -> BackendResult<ExperimentValue> {
            self.on_get_experiment(None, experiment)
        }

        async fn get_layer(&self, layer: &str) -> BackendResult<LayerValue> {
            self.on_get_layer(None, layer)
        }

        async fn get_dynamic_config(&self, config: &str) -> BackendResult<DynamicConfigValue> {
            self.on_get_dynamic_config(None, config)
        }

        async fn log_event(&self, event: &AnalyticsEvent) -> BackendResult<()> {
            self.on_log_event(event)
        }

        async fn flush(&self) -> BackendResult<()> {
            self.on_flush()
        }
    }

    #[tokio::test]
    async fn switches_users_within_a_scope() {
        let client = RecordingClient::new();
        let scope = browser_scope(client.clone(), &context()).await.unwrap();

        scope.services().feature_flags.check("enabled").await.unwrap();
        scope.update_user(Subject::new("u-2")).await.unwrap();
        scope.services().experiments.get("exp").await.unwrap();
        scope.release().await;

        assert_eq!(scope.subject().user_id, "u-2");
        assert_eq!(
            client.calls(),
            vec![
                "initialize@u-1",
                "checkGate:enabled:false",
                "updateUser:u-2",
                "getExperiment:exp",
                "shutdown"
            ]
        );
    }

    #[tokio::test]
    async fn check_reasons() {
        let services = browser_services(RecordingClient::failing(&["checkGate"]));

        assert_eq!(services.feature_flags.check("g").await.unwrap_err().reason, "check");
        assert_eq!(
            services
                .feature_flags
                .check_with_exposure("g")
                .await
                .unwrap_err()
                .reason,
            "checkWithExposure"
        );
    }
}
