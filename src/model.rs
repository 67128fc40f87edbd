use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{ClientConfig, ModelError};

/// A JSON object, used for experiment parameters, layer values and config values.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// The subject (usually, a user) that flags and experiments are evaluated for.
///
/// Subjects are immutable. Rebinding a backend to another subject goes through
/// [`BackendScope::update_user`](crate::BackendScope::update_user).
///
/// ```
/// # use flagbridge::Subject;
/// let subject = Subject::new("user-1")
///     .with_country("NZ")
///     .with_custom("plan", "enterprise");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    /// Stable identifier of the subject.
    pub user_id: String,
    /// Contact email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Country code, as the backend expects it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Free-form attributes for targeting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<JsonMap>,
}

impl Subject {
    /// A subject with only an identifier.
    pub fn new(user_id: impl Into<String>) -> Subject {
        Subject {
            user_id: user_id.into(),
            email: None,
            country: None,
            custom: None,
        }
    }

    /// Set the email attribute.
    pub fn with_email(mut self, email: impl Into<String>) -> Subject {
        self.email = Some(email.into());
        self
    }

    /// Set the country attribute.
    pub fn with_country(mut self, country: impl Into<String>) -> Subject {
        self.country = Some(country.into());
        self
    }

    /// Add a custom attribute, replacing a previous value under the same name.
    pub fn with_custom(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Subject {
        self.custom
            .get_or_insert_with(JsonMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Validate an untyped value (e.g., a request body) as a subject.
    ///
    /// `userId` is required; `email` and `country` must be strings and `custom` must be an object
    /// when present. Unknown fields are ignored.
    pub fn from_json(value: serde_json::Value) -> Result<Subject, ModelError> {
        serde_json::from_value(value).map_err(|err| ModelError {
            reason: "Invalid subject".to_owned(),
            cause: Some(Arc::new(err)),
        })
    }
}

/// Everything a backend needs at initialization: client configuration and the subject.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationContext {
    /// Client configuration.
    pub config: ClientConfig,
    /// Subject the backend is initialized for.
    pub subject: Subject,
}

impl EvaluationContext {
    /// Pair a configuration with the subject to evaluate for.
    pub fn new(config: ClientConfig, subject: Subject) -> EvaluationContext {
        EvaluationContext { config, subject }
    }
}

/// Result of evaluating an experiment for a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentValue {
    /// Experiment name.
    pub name: String,
    /// Assigned variant; [`ExperimentValue::CONTROL_VARIANT`] when unassigned.
    pub variant: String,
    /// Parameters of the assigned variant.
    #[serde(default)]
    pub parameters: JsonMap,
}

impl ExperimentValue {
    /// The variant served when nothing better is known.
    pub const CONTROL_VARIANT: &'static str = "control";

    /// Control variant with no parameters.
    pub fn control(name: impl Into<String>) -> ExperimentValue {
        ExperimentValue {
            name: name.into(),
            variant: ExperimentValue::CONTROL_VARIANT.to_owned(),
            parameters: JsonMap::new(),
        }
    }
}

/// Result of evaluating a layer for a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerValue {
    /// Layer name.
    pub name: String,
    /// Parameters resolved for the subject.
    #[serde(default)]
    pub values: JsonMap,
}

impl LayerValue {
    /// A layer with no values.
    pub fn empty(name: impl Into<String>) -> LayerValue {
        LayerValue {
            name: name.into(),
            values: JsonMap::new(),
        }
    }
}

/// Result of resolving a dynamic config for a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicConfigValue {
    /// Config name.
    pub name: String,
    /// Config contents.
    #[serde(default)]
    pub values: JsonMap,
}

impl DynamicConfigValue {
    /// A config with no values.
    pub fn empty(name: impl Into<String>) -> DynamicConfigValue {
        DynamicConfigValue {
            name: name.into(),
            values: JsonMap::new(),
        }
    }
}

/// A custom analytics event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    /// Event name.
    pub name: String,
    /// Subject the event is attributed to.
    pub user: Subject,
    /// Optional numeric value (e.g., a price).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Optional extra attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonMap>,
}

impl AnalyticsEvent {
    /// An event with no value or metadata.
    pub fn new(name: impl Into<String>, user: Subject) -> AnalyticsEvent {
        AnalyticsEvent {
            name: name.into(),
            user,
            value: None,
            metadata: None,
        }
    }

    /// Attach a numeric value.
    pub fn with_value(mut self, value: f64) -> AnalyticsEvent {
        self.value = Some(value);
        self
    }

    /// Attach metadata.
    pub fn with_metadata(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> AnalyticsEvent {
        self.metadata
            .get_or_insert_with(JsonMap::new)
            .insert(name.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_subject_with_optional_fields() {
        let subject = Subject::from_json(json!({
            "userId": "u-1",
            "country": "NZ",
            "custom": {"plan": "pro"},
            "unknown": 1
        }))
        .unwrap();

        assert_eq!(
            subject,
            Subject::new("u-1")
                .with_country("NZ")
                .with_custom("plan", "pro")
        );
    }

    #[test]
    fn rejects_subject_without_user_id() {
        let err = Subject::from_json(json!({"email": "a@example.com"})).unwrap_err();
        assert_eq!(err.reason, "Invalid subject");
        assert!(err.cause.is_some());
    }

    #[test]
    fn rejects_subject_with_non_object_custom() {
        assert!(Subject::from_json(json!({"userId": "u-1", "custom": [1, 2]})).is_err());
    }

    #[test]
    fn analytics_event_serializes_camel_case() {
        let event = AnalyticsEvent::new("purchase", Subject::new("u-1"))
            .with_value(9.5)
            .with_metadata("sku", "abc");

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "name": "purchase",
                "user": {"userId": "u-1"},
                "value": 9.5,
                "metadata": {"sku": "abc"}
            })
        );
    }
}
