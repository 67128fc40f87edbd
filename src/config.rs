use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{model::JsonMap, ModelError};

/// Configuration handed to a backend client on initialization.
///
/// Server-side backends usually need a server secret key, client-side ones a client key. Neither
/// is validated here: the backend decides what it requires.
///
/// ```
/// # use flagbridge::ClientConfig;
/// let config = ClientConfig::new("production").with_client_key("client-key");
/// ```
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Environment label, e.g. `production`.
    pub environment: String,
    /// Secret key for server-side backends. Redacted from `Debug` output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_secret_key: Option<String>,
    /// Public key for client-side backends. Redacted from `Debug` output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key: Option<String>,
    /// Backend API URL override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<Url>,
    /// Opaque values the backend may use to start without a network round-trip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap_values: Option<JsonMap>,
}

impl ClientConfig {
    /// Create a configuration for the given environment label.
    pub fn new(environment: impl Into<String>) -> ClientConfig {
        ClientConfig {
            environment: environment.into(),
            server_secret_key: None,
            client_key: None,
            api_url: None,
            bootstrap_values: None,
        }
    }

    /// Set the server secret key.
    pub fn with_server_secret_key(mut self, key: impl Into<String>) -> ClientConfig {
        self.server_secret_key = Some(key.into());
        self
    }

    /// Set the client key.
    pub fn with_client_key(mut self, key: impl Into<String>) -> ClientConfig {
        self.client_key = Some(key.into());
        self
    }

    /// Override the backend API URL. Clients should use the backend's default in most cases.
    pub fn with_api_url(mut self, api_url: Url) -> ClientConfig {
        self.api_url = Some(api_url);
        self
    }

    /// Set the values a client-side backend can start from.
    pub fn with_bootstrap_values(mut self, values: JsonMap) -> ClientConfig {
        self.bootstrap_values = Some(values);
        self
    }

    /// Validate an untyped value (e.g., a parsed settings file) as a client configuration.
    ///
    /// ```
    /// # use flagbridge::ClientConfig;
    /// let config = ClientConfig::from_json(serde_json::json!({
    ///     "environment": "staging",
    ///     "apiUrl": "https://flags.example.com/v1"
    /// }))
    /// .unwrap();
    /// assert_eq!(config.environment, "staging");
    /// ```
    pub fn from_json(value: serde_json::Value) -> Result<ClientConfig, ModelError> {
        serde_json::from_value(value).map_err(|err| ModelError {
            reason: "Invalid client config".to_owned(),
            cause: Some(Arc::new(err)),
        })
    }
}

// Keys are credentials and must not end up in logs.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn redacted(value: &Option<String>) -> Option<&'static str> {
            value.as_ref().map(|_| "<redacted>")
        }

        f.debug_struct("ClientConfig")
            .field("environment", &self.environment)
            .field("server_secret_key", &redacted(&self.server_secret_key))
            .field("client_key", &redacted(&self.client_key))
            .field("api_url", &self.api_url.as_ref().map(Url::as_str))
            .field("bootstrap_values", &self.bootstrap_values)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::ClientConfig;

    #[test]
    fn requires_environment() {
        let err = ClientConfig::from_json(json!({"clientKey": "key"})).unwrap_err();
        assert_eq!(err.reason, "Invalid client config");
    }

    #[test]
    fn rejects_invalid_api_url() {
        assert!(
            ClientConfig::from_json(json!({"environment": "dev", "apiUrl": "not a url"})).is_err()
        );
    }

    #[test]
    fn rejects_non_object_bootstrap_values() {
        assert!(
            ClientConfig::from_json(json!({"environment": "dev", "bootstrapValues": "x"})).is_err()
        );
    }

    #[test]
    fn parses_full_config() {
        let config = ClientConfig::from_json(json!({
            "environment": "production",
            "serverSecretKey": "secret",
            "apiUrl": "https://flags.example.com/",
            "bootstrapValues": {"gates": {}}
        }))
        .unwrap();

        assert_eq!(config.server_secret_key.as_deref(), Some("secret"));
        assert_eq!(
            config.api_url.as_ref().map(|it| it.as_str()),
            Some("https://flags.example.com/")
        );
        assert!(config.bootstrap_values.is_some());
    }

    #[test]
    fn debug_output_redacts_keys() {
        let config = ClientConfig::new("dev")
            .with_server_secret_key("super-secret")
            .with_client_key("client-secret");

        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("client-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
