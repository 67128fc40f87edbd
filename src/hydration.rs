//! Reconciles values known up front (a server-rendered hydration snapshot) with live lookups.
//!
//! A [`Reconciler`] tracks one key of one capability. It starts from the snapshot value if there
//! is one, issues a live lookup and publishes every transition through a
//! [`tokio::sync::watch`] channel, so a presentation layer can render the current [`LookupView`]
//! and re-render on change.
//!
//! ```text
//!   Hydrated ──┐
//!              ├── lookup ok ──▶ Resolved
//!   Pending  ──┤
//!              └── lookup err ─▶ Errored (default value + error)
//! ```
//!
//! A lookup whose result arrives after [`Reconciler::teardown`], or after the key or source
//! changed, is discarded. A lookup that panics counts as a failed lookup.
use std::{
    collections::HashMap,
    panic::AssertUnwindSafe,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::{
    error::BackendPanic, DynamicConfigProvider, DynamicConfigValue, ExperimentEvaluator, ExperimentValue,
    FeatureFlagEvaluator, JsonMap, Services,
};

/// Values rendered on the server and shipped to the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HydrationSnapshot {
    /// Gate name to value.
    pub flags: HashMap<String, bool>,
    /// Experiment name to the assignment the server rendered.
    pub experiments: HashMap<String, HydratedExperiment>,
    /// Config name to config values.
    pub dynamic_configs: HashMap<String, JsonMap>,
}

/// An experiment assignment as rendered on the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydratedExperiment {
    /// Assigned variant.
    pub variant: String,
    /// Parameters of the variant.
    #[serde(default)]
    pub parameters: JsonMap,
}

/// Where a reconciled lookup stands.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupState<V> {
    /// Seeded from the snapshot, live lookup in flight.
    Hydrated(V),
    /// Not in the snapshot, live lookup in flight. Holds the default value.
    Pending(V),
    /// The live lookup succeeded.
    Resolved(V),
    /// The live lookup failed.
    Errored {
        /// The default value.
        value: V,
        /// Description of the failure.
        error: String,
    },
}

impl<V> LookupState<V> {
    /// Current value, whatever the state.
    pub fn value(&self) -> &V {
        match self {
            LookupState::Hydrated(value)
            | LookupState::Pending(value)
            | LookupState::Resolved(value)
            | LookupState::Errored { value, .. } => value,
        }
    }

    /// Whether the state is [`LookupState::Pending`]. A hydrated value is not loading.
    pub fn is_loading(&self) -> bool {
        matches!(self, LookupState::Pending(_))
    }

    /// Description of the failed lookup, if it failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            LookupState::Errored { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl<V: Clone> LookupState<V> {
    /// Flatten the state for rendering.
    pub fn view(&self) -> LookupView<V> {
        LookupView {
            value: self.value().clone(),
            loading: self.is_loading(),
            error: self.error().map(str::to_owned),
        }
    }
}

/// What a presentation layer renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupView<V> {
    /// Value to render.
    pub value: V,
    /// See [`LookupState::is_loading`].
    pub loading: bool,
    /// Why the lookup failed, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A kind of value that can be reconciled: where to find it in a snapshot, what to show when it
/// is unknown and how to look it up live.
#[async_trait]
pub trait Capability: Send + Sync + 'static {
    /// The value a lookup produces.
    type Value: Clone + Send + Sync + 'static;

    /// Value shown while `key` is unknown, or after its lookup failed.
    fn default_value(&self, key: &str) -> Self::Value;

    /// Value of `key` in `snapshot`, if the server rendered one.
    fn hydrated(&self, snapshot: &HydrationSnapshot, key: &str) -> Option<Self::Value>;

    /// Live lookup. Failures are described as a string for display.
    async fn lookup(&self, key: &str) -> Result<Self::Value, String>;
}

/// Gate values, off by default.
#[derive(Clone)]
pub struct FlagLookup(pub Arc<dyn FeatureFlagEvaluator>);

#[async_trait]
impl Capability for FlagLookup {
    type Value = bool;

    fn default_value(&self, _key: &str) -> bool {
        false
    }

    fn hydrated(&self, snapshot: &HydrationSnapshot, key: &str) -> Option<bool> {
        snapshot.flags.get(key).copied()
    }

    async fn lookup(&self, key: &str) -> Result<bool, String> {
        self.0.check(key).await.map_err(|err| err.to_string())
    }
}

/// Experiments, serving the control variant by default.
#[derive(Clone)]
pub struct ExperimentLookup(pub Arc<dyn ExperimentEvaluator>);

#[async_trait]
impl Capability for ExperimentLookup {
    type Value = ExperimentValue;

    fn default_value(&self, key: &str) -> ExperimentValue {
        ExperimentValue::control(key)
    }

    fn hydrated(&self, snapshot: &HydrationSnapshot, key: &str) -> Option<ExperimentValue> {
        snapshot.experiments.get(key).map(|hydrated| ExperimentValue {
            name: key.to_owned(),
            variant: hydrated.variant.clone(),
            parameters: hydrated.parameters.clone(),
        })
    }

    async fn lookup(&self, key: &str) -> Result<ExperimentValue, String> {
        self.0.get(key).await.map_err(|err| err.to_string())
    }
}

/// Dynamic configs, empty by default.
#[derive(Clone)]
pub struct DynamicConfigLookup(pub Arc<dyn DynamicConfigProvider>);

#[async_trait]
impl Capability for DynamicConfigLookup {
    type Value = DynamicConfigValue;

    fn default_value(&self, key: &str) -> DynamicConfigValue {
        DynamicConfigValue::empty(key)
    }

    fn hydrated(&self, snapshot: &HydrationSnapshot, key: &str) -> Option<DynamicConfigValue> {
        snapshot
            .dynamic_configs
            .get(key)
            .map(|values| DynamicConfigValue {
                name: key.to_owned(),
                values: values.clone(),
            })
    }

    async fn lookup(&self, key: &str) -> Result<DynamicConfigValue, String> {
        self.0.get(key).await.map_err(|err| err.to_string())
    }
}

/// Reconciles one key of one capability. See the [module docs](self).
pub struct Reconciler<C: Capability> {
    inner: Arc<Inner<C>>,
}

struct Inner<C: Capability> {
    snapshot: Arc<HydrationSnapshot>,
    current: Mutex<Current<C>>,
    state: watch::Sender<LookupState<C::Value>>,
}

struct Current<C> {
    capability: Arc<C>,
    key: String,
    /// Bumped whenever in-flight lookups become stale.
    generation: u64,
    torn_down: bool,
}

impl<C: Capability> Reconciler<C> {
    /// Start reconciling `key`. The live lookup is spawned right away.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn new(
        capability: C,
        snapshot: Arc<HydrationSnapshot>,
        key: impl Into<String>,
    ) -> Reconciler<C> {
        let key = key.into();
        let capability = Arc::new(capability);
        let (state, _) = watch::channel(initial_state(capability.as_ref(), &snapshot, &key));

        let reconciler = Reconciler {
            inner: Arc::new(Inner {
                snapshot,
                current: Mutex::new(Current {
                    capability: Arc::clone(&capability),
                    key: key.clone(),
                    generation: 0,
                    torn_down: false,
                }),
                state,
            }),
        };
        Inner::spawn_lookup(&reconciler.inner, 0, capability, key);
        reconciler
    }

    /// Current state.
    pub fn state(&self) -> LookupState<C::Value> {
        self.inner.state.borrow().clone()
    }

    /// Current state, flattened for rendering.
    pub fn view(&self) -> LookupView<C::Value> {
        self.inner.state.borrow().view()
    }

    /// Receive every transition applied from now on.
    pub fn subscribe(&self) -> watch::Receiver<LookupState<C::Value>> {
        self.inner.state.subscribe()
    }

    /// The key being reconciled.
    pub fn key(&self) -> String {
        self.lock().key.clone()
    }

    /// Switch to another key. The state restarts from the snapshot value for `key` (or pending) and
    /// a new lookup is issued. Setting the current key again does nothing.
    pub fn set_key(&self, key: impl Into<String>) {
        let key = key.into();
        let mut current = self.lock();
        if current.torn_down || current.key == key {
            return;
        }

        current.generation += 1;
        current.key = key.clone();
        self.inner.state.send_replace(initial_state(
            current.capability.as_ref(),
            &self.inner.snapshot,
            &key,
        ));
        Inner::spawn_lookup(
            &self.inner,
            current.generation,
            Arc::clone(&current.capability),
            key,
        );
    }

    /// Switch to another source for the same key. The current value stays visible until the new
    /// lookup settles.
    pub fn set_source(&self, capability: C) {
        let mut current = self.lock();
        if current.torn_down {
            return;
        }

        current.generation += 1;
        current.capability = Arc::new(capability);
        Inner::spawn_lookup(
            &self.inner,
            current.generation,
            Arc::clone(&current.capability),
            current.key.clone(),
        );
    }

    /// Stop applying lookup results. In-flight lookups run to completion and are discarded.
    pub fn teardown(&self) {
        let mut current = self.lock();
        current.torn_down = true;
        current.generation += 1;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Current<C>> {
        self.inner
            .current
            .lock()
            .expect("thread holding reconciler lock should not panic")
    }
}

impl<C: Capability> Drop for Reconciler<C> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<C: Capability> Inner<C> {
    fn spawn_lookup(this: &Arc<Inner<C>>, generation: u64, capability: Arc<C>, key: String) {
        log::debug!(target: "flagbridge", key:display = key, generation; "issuing lookup");

        let inner = Arc::clone(this);
        tokio::spawn(async move {
            let result = match AssertUnwindSafe(capability.lookup(&key)).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => Err(BackendPanic::from_payload(payload).to_string()),
            };
            inner.apply(generation, capability.as_ref(), &key, result);
        });
    }

    fn apply(&self, generation: u64, capability: &C, key: &str, result: Result<C::Value, String>) {
        let current = self
            .current
            .lock()
            .expect("thread holding reconciler lock should not panic");
        if current.torn_down || current.generation != generation {
            log::debug!(target: "flagbridge", key, generation; "discarding stale lookup");
            return;
        }

        let state = match result {
            Ok(value) => LookupState::Resolved(value),
            Err(error) => LookupState::Errored {
                value: capability.default_value(key),
                error,
            },
        };
        self.state.send_replace(state);
    }
}

fn initial_state<C: Capability>(
    capability: &C,
    snapshot: &HydrationSnapshot,
    key: &str,
) -> LookupState<C::Value> {
    match capability.hydrated(snapshot, key) {
        Some(value) => LookupState::Hydrated(value),
        None => LookupState::Pending(capability.default_value(key)),
    }
}

impl Reconciler<FlagLookup> {
    /// Reconcile `gate` against the feature flag evaluator of `services`.
    pub fn feature_flag(
        services: &Services,
        snapshot: Arc<HydrationSnapshot>,
        gate: impl Into<String>,
    ) -> Reconciler<FlagLookup> {
        Reconciler::new(
            FlagLookup(Arc::clone(&services.feature_flags)),
            snapshot,
            gate,
        )
    }
}

impl Reconciler<ExperimentLookup> {
    /// Reconcile `experiment` against the experiment evaluator of `services`.
    pub fn experiment(
        services: &Services,
        snapshot: Arc<HydrationSnapshot>,
        experiment: impl Into<String>,
    ) -> Reconciler<ExperimentLookup> {
        Reconciler::new(
            ExperimentLookup(Arc::clone(&services.experiments)),
            snapshot,
            experiment,
        )
    }
}

impl Reconciler<DynamicConfigLookup> {
    /// Reconcile `config` against the dynamic config provider of `services`.
    pub fn dynamic_config(
        services: &Services,
        snapshot: Arc<HydrationSnapshot>,
        config: impl Into<String>,
    ) -> Reconciler<DynamicConfigLookup> {
        Reconciler::new(
            DynamicConfigLookup(Arc::clone(&services.dynamic_config)),
            snapshot,
            config,
        )
    }
}
