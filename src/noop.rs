//! Inert implementations of every contract: gates are off, experiments serve control, configs are
//! empty and analytics events are dropped.
use async_trait::async_trait;

use crate::{
    AnalyticsError, AnalyticsEvent, AnalyticsSink, DynamicConfigError, DynamicConfigProvider,
    DynamicConfigValue, ExperimentError, ExperimentEvaluator, ExperimentValue, FeatureFlagError,
    FeatureFlagEvaluator, LayerValue,
};

/// Every gate is off.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFeatureFlags;

#[async_trait]
impl FeatureFlagEvaluator for NoopFeatureFlags {
    async fn check(&self, _gate: &str) -> Result<bool, FeatureFlagError> {
        Ok(false)
    }

    async fn check_with_exposure(&self, _gate: &str) -> Result<bool, FeatureFlagError> {
        Ok(false)
    }
}

/// Every experiment serves control; every layer is empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExperiments;

#[async_trait]
impl ExperimentEvaluator for NoopExperiments {
    async fn get(&self, experiment: &str) -> Result<ExperimentValue, ExperimentError> {
        Ok(ExperimentValue::control(experiment))
    }

    async fn get_layer(&self, layer: &str) -> Result<LayerValue, ExperimentError> {
        Ok(LayerValue::empty(layer))
    }
}

/// Every config is empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDynamicConfig;

#[async_trait]
impl DynamicConfigProvider for NoopDynamicConfig {
    async fn get(&self, config: &str) -> Result<DynamicConfigValue, DynamicConfigError> {
        Ok(DynamicConfigValue::empty(config))
    }
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAnalytics;

#[async_trait]
impl AnalyticsSink for NoopAnalytics {
    async fn log_event(&self, _event: AnalyticsEvent) -> Result<(), AnalyticsError> {
        Ok(())
    }

    async fn flush(&self) -> Result<(), AnalyticsError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), AnalyticsError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{AnalyticsEvent, Services, Subject};

    #[tokio::test]
    async fn noop_services_return_defaults() {
        let services = Services::noop();

        assert!(!services.feature_flags.check("missing").await.unwrap());
        assert!(!services
            .feature_flags
            .check_with_exposure("missing")
            .await
            .unwrap());

        let experiment = services.experiments.get("exp").await.unwrap();
        assert_eq!(experiment.name, "exp");
        assert_eq!(experiment.variant, "control");
        assert!(experiment.parameters.is_empty());

        assert_eq!(services.experiments.get_layer("layer").await.unwrap().name, "layer");
        assert_eq!(services.dynamic_config.get("cfg").await.unwrap().name, "cfg");

        services
            .analytics
            .log_event(AnalyticsEvent::new("event", Subject::new("u-1")))
            .await
            .unwrap();
        services.analytics.flush().await.unwrap();
        services.analytics.shutdown().await.unwrap();
    }
}
