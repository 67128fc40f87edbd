//! Ties a backend's `initialize` and `shutdown` to the lifetime of a usage scope.
//!
//! [`scoped`] is the simplest way to use a backend: it initializes it, runs the body with the
//! backend's [`Services`] and always shuts the backend down afterwards. [`BackendScope`] exposes
//! the same lifecycle for callers that need to hold the backend across a longer window.
use std::{
    future::Future,
    panic::AssertUnwindSafe,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, RwLock,
    },
};

use futures::FutureExt;

use crate::{
    adapter::{wrap, Adapter, Operation},
    backend::{Backend, Rebind},
    AdapterError, EvaluationContext, Services, Subject,
};

/// An initialized backend together with the services evaluating against it.
///
/// The backend is shut down at most once: either by [`BackendScope::release`] or, as a fallback,
/// when the scope is dropped. A half-torn-down backend cannot be reused safely, so shutdown
/// failures are fatal:
///
/// - [`BackendScope::release`] panics in the caller.
/// - A scope dropped without release shuts down on a spawned tokio task, where a panic would go
///   unnoticed. A failure there is logged at `error` and the process is aborted.
pub struct BackendScope<B: Backend + 'static> {
    backend: Arc<B>,
    services: Services,
    /// Subject the backend is currently bound to.
    subject: RwLock<Arc<Subject>>,
    released: AtomicBool,
}

impl<B: Backend + 'static> BackendScope<B> {
    /// Initialize `backend` for `context`.
    ///
    /// # Errors
    ///
    /// Returns an [`AdapterError`] with [`Operation::Initialize`] if the backend fails to
    /// initialize. No scope is created and shutdown is not called in that case.
    pub async fn acquire(
        backend: B,
        context: &EvaluationContext,
    ) -> Result<BackendScope<B>, AdapterError> {
        let backend = Arc::new(backend);

        log::debug!(target: "flagbridge",
                    environment:display = context.config.environment,
                    user_id:display = context.subject.user_id;
                    "initializing backend");
        wrap(
            Operation::Initialize,
            backend.initialize(&context.config, &context.subject),
        )
        .await?;

        Ok(BackendScope {
            services: Adapter::from_arc(Arc::clone(&backend)).into_services(),
            backend,
            subject: RwLock::new(Arc::new(context.subject.clone())),
            released: AtomicBool::new(false),
        })
    }

    /// Services evaluating against this scope's backend. They stay usable after release, but the
    /// backend will have been shut down.
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// The subject the backend is currently bound to.
    pub fn subject(&self) -> Arc<Subject> {
        self.subject
            .read()
            .expect("thread holding subject lock should not panic")
            .clone()
    }

    /// Whether shutdown has been issued, by [`BackendScope::release`] or by dropping the scope.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Shut the backend down. Calls after the first one do nothing.
    ///
    /// # Panics
    ///
    /// Panics if the backend fails to shut down.
    pub async fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(err) = release_backend(self.backend.as_ref()).await {
            panic!("backend shutdown failed: {}", err.cause);
        }
    }
}

impl<B: Rebind + 'static> BackendScope<B> {
    /// Rebind the backend to another subject.
    ///
    /// Evaluations that are in flight while the subject changes may observe either subject; no
    /// ordering between them is guaranteed.
    pub async fn update_user(&self, subject: Subject) -> Result<(), AdapterError> {
        wrap(Operation::UpdateUser, self.backend.update_user(&subject)).await?;

        log::debug!(target: "flagbridge",
                    user_id:display = subject.user_id;
                    "updated backend subject");
        *self
            .subject
            .write()
            .expect("thread holding subject lock should not panic") = Arc::new(subject);
        Ok(())
    }
}

impl<B: Backend + 'static> Drop for BackendScope<B> {
    fn drop(&mut self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                log::warn!(target: "flagbridge", "backend scope dropped without release, shutting down in background");
                let backend = Arc::clone(&self.backend);
                handle.spawn(async move {
                    if release_backend(backend.as_ref()).await.is_err() {
                        log::error!(target: "flagbridge", "aborting: backend of a dropped scope failed to shut down");
                        std::process::abort();
                    }
                });
            }
            Err(_) => {
                log::error!(target: "flagbridge", "backend scope dropped outside of a tokio runtime, backend was not shut down");
            }
        }
    }
}

async fn release_backend<B: Backend + ?Sized>(backend: &B) -> Result<(), AdapterError> {
    log::debug!(target: "flagbridge", "shutting down backend");
    wrap(Operation::Shutdown, backend.shutdown())
        .await
        .map_err(|err| {
            log::error!(target: "flagbridge", "backend shutdown failed: {}", err.cause);
            err
        })
}

/// Initialize `backend`, run `body` with its services and shut the backend down.
///
/// Shutdown happens exactly once whether `body` completes, returns an error value, panics (the
/// panic is resumed after shutdown) or never touches the services.
///
/// # Panics
///
/// Panics if the backend fails to shut down. If `body` panicked as well, the shutdown failure is
/// logged and the panic of `body` is the one resumed.
///
/// ```
/// # use flagbridge::{scoped, runtime::edge::EdgeBackend, ClientConfig, EvaluationContext, Subject};
/// # async fn run(backend: EdgeBackend<impl flagbridge::runtime::edge::EdgeClient + 'static>) {
/// let context = EvaluationContext::new(ClientConfig::new("production"), Subject::new("u-1"));
/// let enabled = scoped(backend, &context, |services| async move {
///     services.feature_flags.check("new_checkout").await
/// })
/// .await;
/// # }
/// ```
///
/// # Errors
///
/// Returns an [`AdapterError`] if the backend fails to initialize; `body` is not run then.
pub async fn scoped<B, F, Fut, T>(
    backend: B,
    context: &EvaluationContext,
    body: F,
) -> Result<T, AdapterError>
where
    B: Backend + 'static,
    F: FnOnce(Services) -> Fut,
    Fut: Future<Output = T>,
{
    let scope = BackendScope::acquire(backend, context).await?;
    let services = scope.services().clone();

    let outcome = AssertUnwindSafe(async move { body(services).await })
        .catch_unwind()
        .await;

    let body_panic = match outcome {
        Ok(value) => {
            scope.release().await;
            return Ok(value);
        }
        Err(payload) => payload,
    };

    log::error!(target: "flagbridge", "scope body panicked, shutting down backend before resuming");
    if AssertUnwindSafe(scope.release()).catch_unwind().await.is_err() {
        log::error!(target: "flagbridge", "backend shutdown failed after the scope body panicked");
    }
    std::panic::resume_unwind(body_panic)
}
