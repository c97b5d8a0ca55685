//! Runtime builder and the runtime itself.

use crate::cancel::CancelSignal;
use crate::env::{context_ref, Env};
use crate::error::{ConfigError, Error};
use crate::runtime::config::RuntimeConfig;
use crate::runtime::env_config::apply_env_overrides;
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};
use std::thread::Thread;

/// Builder for constructing a runtime with custom configuration.
#[derive(Debug, Clone)]
pub struct RuntimeBuilder {
    config: RuntimeConfig,
}

impl RuntimeBuilder {
    /// Create a new builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
        }
    }

    /// Create a builder whose defaults are overridden by `EFFECTUM_*` variables.
    ///
    /// Setters called afterwards take precedence over the environment.
    pub fn from_env() -> Result<Self, Error> {
        let mut config = RuntimeConfig::default();
        apply_env_overrides(&mut config)?;
        Ok(Self { config })
    }

    /// Set the runtime name used in log events.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Enable or disable `warn!` events for runs that end in a defect.
    #[must_use]
    pub fn log_defects(mut self, enable: bool) -> Self {
        self.config.log_defects = enable;
        self
    }

    /// Replace the dependency context installed in every root environment.
    #[must_use]
    pub fn root_context(mut self, context: crate::env::Context) -> Self {
        self.config.root_context = context;
        self
    }

    /// Add one service to the root dependency context.
    #[must_use]
    pub fn provide_service<S>(mut self, service: S) -> Self
    where
        S: Any + Send + Sync,
    {
        self.config.root_context = self.config.root_context.with(service);
        self
    }

    /// Build a runtime from this configuration.
    pub fn build(self) -> Result<Runtime, Error> {
        Runtime::with_config(self.config)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Runtime instance created from a [`RuntimeBuilder`].
///
/// A runtime holds no threads of its own. Computations run on the thread
/// that starts them and continue wherever their async operations resume.
#[derive(Debug, Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

impl Runtime {
    /// Creates a runtime with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RuntimeInner {
                config: RuntimeConfig::default(),
            }),
        }
    }

    /// Returns a builder for a custom runtime.
    #[must_use]
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Construct a runtime from the given configuration.
    pub fn with_config(mut config: RuntimeConfig) -> Result<Self, Error> {
        config.normalize();
        if config.name.is_empty() {
            return Err(ConfigError::EmptyName.into());
        }
        Ok(Self {
            inner: Arc::new(RuntimeInner { config }),
        })
    }

    /// Returns a reference to the runtime configuration.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Builds the environment of a new top-level run driven by `controller`.
    pub(crate) fn root_env(&self, controller: CancelSignal) -> Env {
        let env = Env::root(controller);
        let ctx = &self.inner.config.root_context;
        if ctx.is_empty() {
            env
        } else {
            env.with_slot(&context_ref(), ctx.clone())
        }
    }

    /// Run a future to completion on the current thread.
    ///
    /// The thread parks between polls and is unparked by the future's waker.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        let waker = Waker::from(Arc::new(ThreadWaker(std::thread::current())));
        let mut cx = Context::from_waker(&waker);
        let mut future = std::pin::pin!(future);
        loop {
            match future.as_mut().poll(&mut cx) {
                Poll::Ready(output) => return output,
                Poll::Pending => std::thread::park(),
            }
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct RuntimeInner {
    config: RuntimeConfig,
}

struct ThreadWaker(Thread);

impl Wake for ThreadWaker {
    fn wake(self: Arc<Self>) {
        self.0.unpark();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.0.unpark();
    }
}
