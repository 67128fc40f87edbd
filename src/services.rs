//! Capability contracts every backend and every composed evaluator implements.
//!
//! Each contract is an object-safe async trait. Implementations never panic across the contract
//! boundary: failures are reported as the contract's own error type.
use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    noop::{NoopAnalytics, NoopDynamicConfig, NoopExperiments, NoopFeatureFlags},
    AnalyticsError, AnalyticsEvent, DynamicConfigError, DynamicConfigValue, ExperimentError,
    ExperimentValue, FeatureFlagError, LayerValue,
};

/// Boolean feature gates.
#[async_trait]
pub trait FeatureFlagEvaluator: Send + Sync {
    /// Evaluate `gate` without recording an exposure.
    async fn check(&self, gate: &str) -> Result<bool, FeatureFlagError>;

    /// Evaluate `gate` and let the backend record an exposure event.
    ///
    /// Returns the same value as [`FeatureFlagEvaluator::check`] would.
    async fn check_with_exposure(&self, gate: &str) -> Result<bool, FeatureFlagError>;
}

/// Experiments and layers.
#[async_trait]
pub trait ExperimentEvaluator: Send + Sync {
    /// The caller's assignment in `experiment`.
    async fn get(&self, experiment: &str) -> Result<ExperimentValue, ExperimentError>;

    /// Parameters of `layer`, as resolved by the experiments it contains.
    async fn get_layer(&self, layer: &str) -> Result<LayerValue, ExperimentError>;
}

/// Dynamic configs.
#[async_trait]
pub trait DynamicConfigProvider: Send + Sync {
    /// Current values of `config`.
    async fn get(&self, config: &str) -> Result<DynamicConfigValue, DynamicConfigError>;
}

/// Custom analytics events.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    /// Record a custom event. Delivery may be deferred until [`AnalyticsSink::flush`].
    async fn log_event(&self, event: AnalyticsEvent) -> Result<(), AnalyticsError>;

    /// Deliver buffered events.
    async fn flush(&self) -> Result<(), AnalyticsError>;

    /// Flush and stop the sink. The sink should not be used afterwards.
    async fn shutdown(&self) -> Result<(), AnalyticsError>;
}

#[async_trait]
impl<T: FeatureFlagEvaluator + ?Sized> FeatureFlagEvaluator for Arc<T> {
    async fn check(&self, gate: &str) -> Result<bool, FeatureFlagError> {
        (**self).check(gate).await
    }

    async fn check_with_exposure(&self, gate: &str) -> Result<bool, FeatureFlagError> {
        (**self).check_with_exposure(gate).await
    }
}

#[async_trait]
impl<T: ExperimentEvaluator + ?Sized> ExperimentEvaluator for Arc<T> {
    async fn get(&self, experiment: &str) -> Result<ExperimentValue, ExperimentError> {
        (**self).get(experiment).await
    }

    async fn get_layer(&self, layer: &str) -> Result<LayerValue, ExperimentError> {
        (**self).get_layer(layer).await
    }
}

#[async_trait]
impl<T: DynamicConfigProvider + ?Sized> DynamicConfigProvider for Arc<T> {
    async fn get(&self, config: &str) -> Result<DynamicConfigValue, DynamicConfigError> {
        (**self).get(config).await
    }
}

#[async_trait]
impl<T: AnalyticsSink + ?Sized> AnalyticsSink for Arc<T> {
    async fn log_event(&self, event: AnalyticsEvent) -> Result<(), AnalyticsError> {
        (**self).log_event(event).await
    }

    async fn flush(&self) -> Result<(), AnalyticsError> {
        (**self).flush().await
    }

    async fn shutdown(&self) -> Result<(), AnalyticsError> {
        (**self).shutdown().await
    }
}

/// One implementation of each contract, passed explicitly to whatever consumes them.
///
/// ```
/// # use std::sync::Arc;
/// # use flagbridge::{buildtime::{compose, flags_from_json, Precedence}, Services};
/// let services = Services::noop();
/// let flags = flags_from_json(r#"{"new_checkout": true}"#).unwrap();
/// let services = services.clone().with_feature_flags(Arc::new(compose(
///     flags,
///     services.feature_flags,
///     Precedence::BuildtimeFirst,
/// )));
/// ```
#[derive(Clone)]
pub struct Services {
    /// Gate evaluation.
    pub feature_flags: Arc<dyn FeatureFlagEvaluator>,
    /// Experiment and layer lookups.
    pub experiments: Arc<dyn ExperimentEvaluator>,
    /// Dynamic config lookups.
    pub dynamic_config: Arc<dyn DynamicConfigProvider>,
    /// Event logging.
    pub analytics: Arc<dyn AnalyticsSink>,
}

impl Services {
    /// Bundle one implementation of each contract.
    pub fn new(
        feature_flags: Arc<dyn FeatureFlagEvaluator>,
        experiments: Arc<dyn ExperimentEvaluator>,
        dynamic_config: Arc<dyn DynamicConfigProvider>,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Services {
        Services {
            feature_flags,
            experiments,
            dynamic_config,
            analytics,
        }
    }

    /// Services that evaluate everything to defaults and drop analytics.
    pub fn noop() -> Services {
        Services::new(
            Arc::new(NoopFeatureFlags),
            Arc::new(NoopExperiments),
            Arc::new(NoopDynamicConfig),
            Arc::new(NoopAnalytics),
        )
    }

    /// Replace the feature flag evaluator, keeping the other services.
    pub fn with_feature_flags(mut self, feature_flags: Arc<dyn FeatureFlagEvaluator>) -> Services {
        self.feature_flags = feature_flags;
        self
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;

    struct NamedGate(&'static str);

    #[async_trait]
    impl FeatureFlagEvaluator for NamedGate {
        async fn check(&self, gate: &str) -> Result<bool, FeatureFlagError> {
            Ok(gate == self.0)
        }

        async fn check_with_exposure(&self, gate: &str) -> Result<bool, FeatureFlagError> {
            Ok(gate == self.0)
        }
    }

    #[tokio::test]
    async fn explicitly_constructed_services_are_used() {
        let services = Services::noop().with_feature_flags(Arc::new(NamedGate("new-home")));

        assert!(services.feature_flags.check("new-home").await.unwrap());
        assert!(!services.feature_flags.check("other").await.unwrap());
        assert_eq!(
            services.dynamic_config.get("homepage").await.unwrap().name,
            "homepage"
        );
    }

    #[tokio::test]
    async fn shared_evaluators_implement_contracts() {
        let shared: Arc<NamedGate> = Arc::new(NamedGate("g"));
        assert!(shared.check_with_exposure("g").await.unwrap());
    }
}
