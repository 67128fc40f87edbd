//! A recording backend client shared by the tests of every runtime binding.
//!
//! Each runtime's test module implements its client trait for [`RecordingClient`] by forwarding to
//! the `on_*` helpers below, so all runtimes are exercised against identical behavior.
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{
    backend::{Backend, BackendResult, Rebind},
    AnalyticsEvent, ClientConfig, DynamicConfigValue, ExperimentValue, LayerValue, Subject,
};

/// The only gate that evaluates to `true`.
pub(crate) const ENABLED_GATE: &str = "enabled";

pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Clone, Default)]
pub(crate) struct RecordingClient {
    calls: Arc<Mutex<Vec<String>>>,
    failing: Arc<Vec<&'static str>>,
    panicking: Arc<Vec<&'static str>>,
}

impl RecordingClient {
    pub fn new() -> RecordingClient {
        RecordingClient::default()
    }

    /// Fail the listed backend operations (e.g., `"checkGate"`), `"*"` fails all of them.
    pub fn failing(operations: &[&'static str]) -> RecordingClient {
        RecordingClient {
            failing: Arc::new(operations.to_vec()),
            ..RecordingClient::default()
        }
    }

    /// Fail everything except `initialize`.
    pub fn failing_all() -> RecordingClient {
        RecordingClient::failing(&["*"])
    }

    pub fn panicking(operations: &[&'static str]) -> RecordingClient {
        RecordingClient {
            panicking: Arc::new(operations.to_vec()),
            ..RecordingClient::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    fn record<T>(&self, operation: &'static str, call: String, value: T) -> BackendResult<T> {
        self.calls.lock().unwrap().push(call);
        if self.panicking.contains(&operation) {
            panic!("{operation} panicked");
        }
        let fails_all = self.failing.contains(&"*") && operation != "initialize";
        if fails_all || self.failing.contains(&operation) {
            return Err(format!("{operation} failed").into());
        }
        Ok(value)
    }

    fn with_subject(call: String, subject: Option<&Subject>) -> String {
        match subject {
            Some(subject) => format!("{call}@{}", subject.user_id),
            None => call,
        }
    }

    pub fn on_initialize(&self, subject: Option<&Subject>) -> BackendResult<()> {
        self.record(
            "initialize",
            RecordingClient::with_subject("initialize".to_owned(), subject),
            (),
        )
    }

    pub fn on_shutdown(&self) -> BackendResult<()> {
        self.record("shutdown", "shutdown".to_owned(), ())
    }

    pub fn on_update_user(&self, subject: &Subject) -> BackendResult<()> {
        self.record("updateUser", format!("updateUser:{}", subject.user_id), ())
    }

    pub fn on_check_gate(
        &self,
        subject: Option<&Subject>,
        gate: &str,
        expose: bool,
    ) -> BackendResult<bool> {
        self.record(
            "checkGate",
            RecordingClient::with_subject(format!("checkGate:{gate}:{expose}"), subject),
            gate == ENABLED_GATE,
        )
    }

    pub fn on_get_experiment(
        &self,
        subject: Option<&Subject>,
        experiment: &str,
    ) -> BackendResult<ExperimentValue> {
        self.record(
            "getExperiment",
            RecordingClient::with_subject(format!("getExperiment:{experiment}"), subject),
            ExperimentValue {
                name: experiment.to_owned(),
                variant: "a".to_owned(),
                parameters: Default::default(),
            },
        )
    }

    pub fn on_get_layer(&self, subject: Option<&Subject>, layer: &str) -> BackendResult<LayerValue> {
        self.record(
            "getLayer",
            RecordingClient::with_subject(format!("getLayer:{layer}"), subject),
            LayerValue::empty(layer),
        )
    }

    pub fn on_get_dynamic_config(
        &self,
        subject: Option<&Subject>,
        config: &str,
    ) -> BackendResult<DynamicConfigValue> {
        self.record(
            "getDynamicConfig",
            RecordingClient::with_subject(format!("getDynamicConfig:{config}"), subject),
            DynamicConfigValue::empty(config),
        )
    }

    pub fn on_log_event(&self, event: &AnalyticsEvent) -> BackendResult<()> {
        self.record("logEvent", format!("logEvent:{}", event.name), ())
    }

    pub fn on_flush(&self) -> BackendResult<()> {
        self.record("flush", "flush".to_owned(), ())
    }
}

#[async_trait]
impl Backend for RecordingClient {
    async fn initialize(&self, _config: &ClientConfig, subject: &Subject) -> BackendResult<()> {
        self.on_initialize(Some(subject))
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

#[async_trait]
impl Rebind for RecordingClient {
    async fn update_user(&self, subject: &Subject) -> BackendResult<()> {
        self.on_update_user(subject)
    }
}

pub(crate) fn context() -> crate::EvaluationContext {
    crate::EvaluationContext::new(
        ClientConfig::new("dev").with_client_key("client-key"),
        Subject::new("u-1"),
    )
}
