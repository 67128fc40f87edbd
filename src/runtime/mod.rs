//! Bindings from concrete backend SDK shapes onto [`Backend`](crate::backend::Backend).
//!
//! - [`server`]: the subject is passed on every evaluation; no update operation.
//! - [`edge`]: the subject is bound at initialization; no update operation.
//! - [`browser`] and [`mobile`]: the subject is bound at initialization and can be replaced with
//!   [`BackendScope::update_user`](crate::BackendScope::update_user).
//!
//! Each binding only forwards calls. Error translation and lifecycle handling are shared by every
//! runtime through [`Adapter`](crate::Adapter) and [`BackendScope`](crate::BackendScope).

/// Forwards [`Backend`](crate::backend::Backend) (and, with `rebind`,
/// [`Rebind`](crate::backend::Rebind)) from a single-field wrapper to a client whose subject is
/// bound at initialization.
macro_rules! forward_bound_client {
    ($backend:ident, $client:ident) => {
        #[async_trait::async_trait]
        impl<C: $client> $crate::backend::Backend for $backend<C> {
            async fn initialize(
                &self,
                config: &$crate::ClientConfig,
                subject: &$crate::Subject,
            ) -> $crate::backend::BackendResult<()> {
                self.0.initialize(config, subject).await
            }

            async fn shutdown(&self) -> $crate::backend::BackendResult<()> {
                self.0.shutdown().await
            }

            async fn check_gate(
                &self,
                gate: &str,
                expose: bool,
            ) -> $crate::backend::BackendResult<bool> {
                self.0.check_gate(gate, expose).await
            }

            async fn get_experiment(
                &self,
                experiment: &str,
            ) -> $crate::backend::BackendResult<$crate::ExperimentValue> {
                self.0.get_experiment(experiment).await
            }

            async fn get_layer(
                &self,
                layer: &str,
            ) -> $crate::backend::BackendResult<$crate::LayerValue> {
                self.0.get_layer(layer).await
            }

            async fn get_dynamic_config(
                &self,
                config: &str,
            ) -> $crate::backend::BackendResult<$crate::DynamicConfigValue> {
                self.0.get_dynamic_config(config).await
            }

            async fn log_event(
                &self,
                event: &$crate::AnalyticsEvent,
            ) -> $crate::backend::BackendResult<()> {
                self.0.log_event(event).await
            }

            async fn flush(&self) -> $crate::backend::BackendResult<()> {
                self.0.flush().await
            }
        }
    };
    ($backend:ident, $client:ident, rebind) => {
        forward_bound_client!($backend, $client);

        #[async_trait::async_trait]
        impl<C: $client> $crate::backend::Rebind for $backend<C> {
            async fn update_user(
                &self,
                subject: &$crate::Subject,
            ) -> $crate::backend::BackendResult<()> {
                self.0.update_user(subject).await
            }
        }
    };
}

pub mod browser;
pub mod edge;
pub mod mobile;
pub mod server;
