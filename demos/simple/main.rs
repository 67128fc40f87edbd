use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use flagbridge::{
    backend::BackendResult,
    buildtime::{compose, flags_from_env, Precedence, DEFAULT_ENV_PREFIX},
    hydration::{HydrationSnapshot, Reconciler},
    runtime::edge::{EdgeBackend, EdgeClient},
    scoped, AnalyticsEvent, ClientConfig, DynamicConfigValue, EvaluationContext, ExperimentValue,
    LayerValue, Subject,
};

/// A backend serving gates from memory and printing logged events.
#[derive(Default)]
struct InMemoryClient {
    gates: HashMap<String, bool>,
    events: Mutex<Vec<String>>,
}

#[async_trait]
impl EdgeClient for InMemoryClient {
    async fn initialize(&self, config: &ClientConfig, subject: &Subject) -> BackendResult<()> {
        println!(
            "initialize: environment={} user={}",
            config.environment, subject.user_id
        );
        Ok(())
    }

    async fn shutdown(&self) -> BackendResult<()> {
        println!("shutdown");
        Ok(())
    }

    async fn check_gate(&self, gate: &str, _expose: bool) -> BackendResult<bool> {
        match self.gates.get(gate) {
            Some(value) => Ok(*value),
            None => Err(format!("unknown gate {gate}").into()),
        }
    }

    async fn get_experiment(&self, experiment: &str) -> BackendResult<ExperimentValue> {
        Ok(ExperimentValue::control(experiment))
    }

    async fn get_layer(&self, layer: &str) -> BackendResult<LayerValue> {
        Ok(LayerValue::empty(layer))
    }

    async fn get_dynamic_config(&self, config: &str) -> BackendResult<DynamicConfigValue> {
        Ok(DynamicConfigValue::empty(config))
    }

    async fn log_event(&self, event: &AnalyticsEvent) -> BackendResult<()> {
        self.events.lock().unwrap().push(event.name.clone());
        Ok(())
    }

    async fn flush(&self) -> BackendResult<()> {
        println!("flushed events: {:?}", self.events.lock().unwrap());
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    // e.g., FF_OFFLINE_MODE=true cargo run --example simple
    let flags = flags_from_env(
        std::env::vars().map(|(key, value)| (key, Some(value))),
        DEFAULT_ENV_PREFIX,
    )
    .expect("build-time flags should be booleans");

    let client = InMemoryClient {
        gates: HashMap::from([("new_checkout".to_owned(), true)]),
        ..InMemoryClient::default()
    };
    let context = EvaluationContext::new(
        ClientConfig::new("development").with_client_key("client-demo"),
        Subject::new("user-1").with_country("NZ"),
    );

    let subject = context.subject.clone();
    scoped(EdgeBackend::new(client), &context, |services| async move {
        let services = services.clone().with_feature_flags(Arc::new(compose(
            flags,
            services.feature_flags,
            Precedence::RemoteFirst,
        )));

        for gate in ["new_checkout", "offline_mode"] {
            match services.feature_flags.check(gate).await {
                Ok(value) => println!("{gate}: {value}"),
                Err(err) => println!("{gate}: {err}"),
            }
        }

        let snapshot = Arc::new(HydrationSnapshot {
            flags: HashMap::from([("new_checkout".to_owned(), false)]),
            ..HydrationSnapshot::default()
        });
        let reconciler = Reconciler::feature_flag(&services, snapshot, "new_checkout");
        let mut updates = reconciler.subscribe();
        println!("hydrated: {:?}", reconciler.view());
        updates
            .changed()
            .await
            .expect("reconciler should still be alive");
        println!("reconciled: {:?}", reconciler.view());

        let _ = services
            .analytics
            .log_event(AnalyticsEvent::new("checkout", subject))
            .await;
        let _ = services.analytics.flush().await;
    })
    .await
    .expect("backend should initialize");
}
