use std::{any::Any, sync::Arc};

use crate::adapter::Operation;

/// Opaque, cheaply clonable failure cause.
///
/// Backend errors are generally not clonable, so they are shared behind an `Arc`. This keeps every
/// error in the taxonomy `Clone`, which in turn lets composed evaluators hand the exact same failure
/// back to the caller.
pub type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Failure reported by a [`FeatureFlagEvaluator`](crate::FeatureFlagEvaluator).
#[derive(thiserror::Error, Debug, Clone)]
#[error("feature flag evaluation failed: {reason}")]
pub struct FeatureFlagError {
    /// Name of the failed operation for adapter-produced errors (e.g., `"check"`).
    pub reason: String,
    /// Underlying failure, if any.
    #[source]
    pub cause: Option<Cause>,
}

/// Failure reported by an [`ExperimentEvaluator`](crate::ExperimentEvaluator).
#[derive(thiserror::Error, Debug, Clone)]
#[error("experiment evaluation failed: {reason}")]
pub struct ExperimentError {
    /// Name of the failed operation for adapter-produced errors (e.g., `"getLayer"`).
    pub reason: String,
    /// Underlying failure, if any.
    #[source]
    pub cause: Option<Cause>,
}

/// Failure reported by a [`DynamicConfigProvider`](crate::DynamicConfigProvider).
#[derive(thiserror::Error, Debug, Clone)]
#[error("dynamic config evaluation failed: {reason}")]
pub struct DynamicConfigError {
    /// Name of the failed operation for adapter-produced errors (`"getDynamicConfig"`).
    pub reason: String,
    /// Underlying failure, if any.
    #[source]
    pub cause: Option<Cause>,
}

/// Failure reported by an [`AnalyticsSink`](crate::AnalyticsSink).
#[derive(thiserror::Error, Debug, Clone)]
#[error("analytics operation failed: {reason}")]
pub struct AnalyticsError {
    /// Name of the failed operation for adapter-produced errors (e.g., `"flush"`).
    pub reason: String,
    /// Underlying failure, if any.
    #[source]
    pub cause: Option<Cause>,
}

macro_rules! impl_domain_error {
    ($($error:ident),+) => {$(
        impl $error {
            /// Create an error without an underlying cause.
            pub fn new(reason: impl Into<String>) -> Self {
                $error {
                    reason: reason.into(),
                    cause: None,
                }
            }

            /// Attach an underlying cause.
            pub fn with_cause(
                mut self,
                cause: impl std::error::Error + Send + Sync + 'static,
            ) -> Self {
                self.cause = Some(Arc::new(cause));
                self
            }
        }

        impl From<AdapterError> for $error {
            fn from(value: AdapterError) -> Self {
                $error {
                    reason: value.operation.to_string(),
                    cause: Some(value.cause),
                }
            }
        }
    )+};
}

impl_domain_error!(
    FeatureFlagError,
    ExperimentError,
    DynamicConfigError,
    AnalyticsError
);

/// A backend call failed.
///
/// This is the adapter-internal form of every backend failure. It is converted into the domain
/// error of the contract being served before it reaches the caller. Lifecycle operations
/// (`initialize`, `updateUser`) that are not part of any contract surface it directly.
#[derive(thiserror::Error, Debug, Clone)]
#[error("backend operation `{operation}` failed")]
pub struct AdapterError {
    /// The single operation that failed.
    pub operation: Operation,
    /// The backend's own error, unchanged.
    #[source]
    pub cause: Cause,
}

impl AdapterError {
    /// Failure of `operation` caused by `cause`.
    pub fn new(operation: Operation, cause: Cause) -> Self {
        AdapterError { operation, cause }
    }
}

/// A backend panicked while an operation was being polled.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("backend panicked: {message}")]
pub struct BackendPanic {
    /// The panic payload if it was a string.
    pub message: String,
}

impl BackendPanic {
    pub(crate) fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_owned()
        };
        BackendPanic { message }
    }
}

/// A build-time flag source could not be parsed.
#[derive(thiserror::Error, Debug, Clone)]
#[error("{reason}")]
pub struct BuildtimeError {
    /// Human-readable reason. Per-key failures name the offending key.
    pub reason: String,
    /// Underlying parse failure, if any.
    #[source]
    pub cause: Option<Cause>,
}

impl BuildtimeError {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        BuildtimeError {
            reason: reason.into(),
            cause: None,
        }
    }
}

/// An untyped configuration or subject value failed validation.
#[derive(thiserror::Error, Debug, Clone)]
#[error("{reason}")]
pub struct ModelError {
    /// Which field failed and why.
    pub reason: String,
    /// Underlying deserialization failure, if any.
    #[source]
    pub cause: Option<Cause>,
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn adapter_error_maps_operation_to_reason() {
        let error = AdapterError::new(
            Operation::CheckWithExposure,
            Arc::new(BackendPanic {
                message: "boom".to_owned(),
            }),
        );

        let flag_error = FeatureFlagError::from(error.clone());
        assert_eq!(flag_error.reason, "checkWithExposure");
        assert_eq!(
            flag_error.source().map(|it| it.to_string()),
            Some("backend panicked: boom".to_owned())
        );

        let analytics_error = AnalyticsError::from(error);
        assert_eq!(analytics_error.reason, "checkWithExposure");
    }

    #[test]
    fn panic_payloads_are_described() {
        assert_eq!(BackendPanic::from_payload(Box::new("static")).message, "static");
        assert_eq!(
            BackendPanic::from_payload(Box::new("owned".to_owned())).message,
            "owned"
        );
        assert_eq!(
            BackendPanic::from_payload(Box::new(42)).message,
            "non-string panic payload"
        );
    }

    #[test]
    fn domain_errors_keep_cause() {
        let error = ExperimentError::new("remote down").with_cause(BackendPanic {
            message: "x".to_owned(),
        });
        assert_eq!(error.reason, "remote down");
        assert!(error.cause.is_some());
    }
}
