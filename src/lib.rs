//! Backend-agnostic feature flags, experiments, dynamic configs and analytics.
//!
//! # Overview
//!
//! Application code depends on four capability contracts: [`FeatureFlagEvaluator`],
//! [`ExperimentEvaluator`], [`DynamicConfigProvider`] and [`AnalyticsSink`], bundled together as
//! [`Services`]. A concrete backend SDK is bound to these contracts by one of the
//! [`runtime`] bindings (server, edge, browser or mobile) through the generic [`Adapter`], which
//! reports every backend failure as the contract's own error type.
//!
//! [`scoped`] and [`BackendScope`] tie a backend's `initialize` and `shutdown` to a usage scope, so
//! shutdown happens exactly once however the scope ends.
//!
//! Flags known when the application is built can be loaded with the [`buildtime`] loaders and
//! layered over a remote evaluator with [`buildtime::compose`]. Values rendered on a server can be
//! reconciled with live lookups using [`hydration::Reconciler`].
//!
//! # Error Handling
//!
//! Each contract has its own error type carrying a `reason` and an optional `cause`. For errors
//! produced by the adapter, `reason` is the name of the failed operation (e.g., `"check"`,
//! `"getLayer"`). Errors are never retried.
//!
//! # Logging
//!
//! The crate uses the [`log`](https://docs.rs/log/latest/log/) crate with structured key-values,
//! under the `flagbridge` target. Install a `log`-compatible logger to see backend failures and
//! lifecycle events.
//!
//! # Examples
//!
//! A complete example lives in `demos/simple` and runs with `cargo run --example simple`.

#![warn(missing_docs)]
#![cfg_attr(test, deny(missing_docs))]
#![warn(rustdoc::missing_crate_level_docs)]

mod adapter;
pub mod backend;
pub mod buildtime;
mod config;
mod error;
pub mod hydration;
mod model;
mod noop;
pub mod runtime;
mod scope;
mod services;

#[cfg(test)]
mod test_support;

pub use adapter::{Adapter, Operation};
pub use config::ClientConfig;
pub use error::{
    AdapterError, AnalyticsError, BackendPanic, BuildtimeError, Cause, DynamicConfigError,
    ExperimentError, FeatureFlagError, ModelError,
};
pub use model::{
    AnalyticsEvent, DynamicConfigValue, EvaluationContext, ExperimentValue, JsonMap, LayerValue,
    Subject,
};
pub use noop::{NoopAnalytics, NoopDynamicConfig, NoopExperiments, NoopFeatureFlags};
pub use scope::{scoped, BackendScope};
pub use services::{
    AnalyticsSink, DynamicConfigProvider, ExperimentEvaluator, FeatureFlagEvaluator, Services,
};
