//! The normalized backend operation shape.
//!
//! Concrete backend SDKs differ in how they take the subject: server SDKs want it on every call,
//! client-side SDKs bind it once at initialization. Each [`runtime`](crate::runtime) binding maps
//! its client interface onto [`Backend`], so the adapter and the scope are written once.
use async_trait::async_trait;

use crate::{
    AnalyticsEvent, ClientConfig, DynamicConfigValue, ExperimentValue, LayerValue, Subject,
};

/// Error returned by a backend client. Any error type works.
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// Result of a backend call.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// A backend client, already bound to whatever subject it evaluates for.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Called once at scope entry. Backends that evaluate per call may ignore `subject`.
    async fn initialize(&self, config: &ClientConfig, subject: &Subject) -> BackendResult<()>;

    /// Called at most once, when the owning scope ends.
    async fn shutdown(&self) -> BackendResult<()>;

    /// Evaluate a gate. `expose` asks the backend to record an exposure event.
    async fn check_gate(&self, gate: &str, expose: bool) -> BackendResult<bool>;

    /// Assignment of `experiment` for the bound subject.
    async fn get_experiment(&self, experiment: &str) -> BackendResult<ExperimentValue>;

    /// Parameters of `layer` for the bound subject.
    async fn get_layer(&self, layer: &str) -> BackendResult<LayerValue>;

    /// Values of `config` for the bound subject.
    async fn get_dynamic_config(&self, config: &str) -> BackendResult<DynamicConfigValue>;

    /// Queue `event` for delivery.
    async fn log_event(&self, event: &AnalyticsEvent) -> BackendResult<()>;

    /// Send queued events.
    async fn flush(&self) -> BackendResult<()>;
}

/// A backend whose bound subject can be replaced after initialization.
#[async_trait]
pub trait Rebind: Backend {
    /// Evaluate for `subject` from now on.
    async fn update_user(&self, subject: &Subject) -> BackendResult<()>;
}
