//! Turns a [`Backend`] into the service contracts.
//!
//! Every backend call goes through [`wrap`], which turns a returned error or a panic into an
//! [`AdapterError`] naming the operation. The contract implementations then convert it into their
//! own error type, so a consumer can always tell which operation failed from the error alone. No
//! call is ever retried.
use std::{future::Future, panic::AssertUnwindSafe, sync::Arc};

use async_trait::async_trait;
use derive_more::Display;
use futures::FutureExt;

use crate::{
    backend::{Backend, BackendResult},
    error::{BackendPanic, Cause},
    AdapterError, AnalyticsError, AnalyticsEvent, AnalyticsSink, DynamicConfigError,
    DynamicConfigProvider, DynamicConfigValue, ExperimentError, ExperimentEvaluator,
    ExperimentValue, FeatureFlagError, FeatureFlagEvaluator, LayerValue, Services,
};

/// Operations the adapter issues against a backend. The display form is the `reason` of the
/// resulting domain error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Operation {
    /// Backend setup at scope entry.
    #[display("initialize")]
    Initialize,
    /// Backend teardown, at scope exit or through [`AnalyticsSink::shutdown`](crate::AnalyticsSink::shutdown).
    #[display("shutdown")]
    Shutdown,
    /// Replacing the bound subject.
    #[display("updateUser")]
    UpdateUser,
    /// [`FeatureFlagEvaluator::check`](crate::FeatureFlagEvaluator::check).
    #[display("check")]
    Check,
    /// [`FeatureFlagEvaluator::check_with_exposure`](crate::FeatureFlagEvaluator::check_with_exposure).
    #[display("checkWithExposure")]
    CheckWithExposure,
    /// [`ExperimentEvaluator::get`](crate::ExperimentEvaluator::get).
    #[display("getExperiment")]
    GetExperiment,
    /// [`ExperimentEvaluator::get_layer`](crate::ExperimentEvaluator::get_layer).
    #[display("getLayer")]
    GetLayer,
    /// [`DynamicConfigProvider::get`](crate::DynamicConfigProvider::get).
    #[display("getDynamicConfig")]
    GetDynamicConfig,
    /// [`AnalyticsSink::log_event`](crate::AnalyticsSink::log_event).
    #[display("logEvent")]
    LogEvent,
    /// [`AnalyticsSink::flush`](crate::AnalyticsSink::flush).
    #[display("flush")]
    Flush,
}

/// Run a backend call, translating failures into an [`AdapterError`] for `operation`.
pub(crate) async fn wrap<T, F>(operation: Operation, call: F) -> Result<T, AdapterError>
where
    F: Future<Output = BackendResult<T>>,
{
    let result = match AssertUnwindSafe(call).catch_unwind().await {
        Ok(result) => result.map_err(|err| -> Cause { Arc::from(err) }),
        Err(payload) => Err(Arc::new(BackendPanic::from_payload(payload)) as Cause),
    };

    result.map_err(|cause| {
        log::warn!(target: "flagbridge",
                   operation:display = operation;
                   "backend operation failed: {}", cause);
        AdapterError::new(operation, cause)
    })
}

/// Implements all four service contracts on top of a single backend.
pub struct Adapter<B> {
    backend: Arc<B>,
}

impl<B> Clone for Adapter<B> {
    fn clone(&self) -> Self {
        Adapter {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: Backend> Adapter<B> {
    /// Create an adapter owning `backend`.
    pub fn new(backend: B) -> Adapter<B> {
        Adapter::from_arc(Arc::new(backend))
    }

    /// Create an adapter sharing `backend` with other owners (e.g., a [`BackendScope`](crate::BackendScope)).
    pub fn from_arc(backend: Arc<B>) -> Adapter<B> {
        Adapter { backend }
    }

    /// The backend every call goes through.
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }
}

impl<B: Backend + 'static> Adapter<B> {
    /// Bundle this adapter as [`Services`]. All four services share the same backend.
    pub fn into_services(self) -> Services {
        let adapter = Arc::new(self);
        Services::new(adapter.clone(), adapter.clone(), adapter.clone(), adapter)
    }
}

#[async_trait]
impl<B: Backend> FeatureFlagEvaluator for Adapter<B> {
    async fn check(&self, gate: &str) -> Result<bool, FeatureFlagError> {
        Ok(wrap(Operation::Check, self.backend.check_gate(gate, false)).await?)
    }

    async fn check_with_exposure(&self, gate: &str) -> Result<bool, FeatureFlagError> {
        Ok(wrap(Operation::CheckWithExposure, self.backend.check_gate(gate, true)).await?)
    }
}

#[async_trait]
impl<B: Backend> ExperimentEvaluator for Adapter<B> {
    async fn get(&self, experiment: &str) -> Result<ExperimentValue, ExperimentError> {
        Ok(wrap(Operation::GetExperiment, self.backend.get_experiment(experiment)).await?)
    }

    async fn get_layer(&self, layer: &str) -> Result<LayerValue, ExperimentError> {
        Ok(wrap(Operation::GetLayer, self.backend.get_layer(layer)).await?)
    }
}

#[async_trait]
impl<B: Backend> DynamicConfigProvider for Adapter<B> {
    async fn get(&self, config: &str) -> Result<DynamicConfigValue, DynamicConfigError> {
        Ok(wrap(Operation::GetDynamicConfig, self.backend.get_dynamic_config(config)).await?)
    }
}

#[async_trait]
impl<B: Backend> AnalyticsSink for Adapter<B> {
    async fn log_event(&self, event: AnalyticsEvent) -> Result<(), AnalyticsError> {
        Ok(wrap(Operation::LogEvent, self.backend.log_event(&event)).await?)
    }

    async fn flush(&self) -> Result<(), AnalyticsError> {
        Ok(wrap(Operation::Flush, self.backend.flush()).await?)
    }

    async fn shutdown(&self) -> Result<(), AnalyticsError> {
        Ok(wrap(Operation::Shutdown, self.backend.shutdown()).await?)
    }
}
