//! Builder pattern for `HalModule`.

use std::sync::Arc;

use crate::backend::PlatformBackend;
use crate::module::{HalModule, ModuleParts};
use crate::stream::{StreamFactory, StreamLifecycleObserver};
use crate::voice::VoiceRouter;
use crate::{event_callback, EventCallback, HalConfig, HalError, HalEvent};

/// Builder for configuring a [`HalModule`].
///
/// Use [`HalModule::builder()`] to create a new builder.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use hal_route::backend::mock::MockBackend;
/// use hal_route::stream::mock::MockStreamFactory;
/// use hal_route::HalModule;
///
/// let module = HalModule::builder()
///     .backend(Arc::new(MockBackend::new()))
///     .stream_factory(Arc::new(MockStreamFactory::new()))
///     .on_event(|event| tracing::debug!(?event, "hal event"))
///     .build()
///     .unwrap();
///
/// let device = module.open().unwrap();
/// assert_eq!(device.stats().patches_created, 0);
/// module.close().unwrap();
/// ```
#[must_use]
pub struct HalModuleBuilder {
    /// Platform backend.
    backend: Option<Arc<dyn PlatformBackend>>,
    /// Stream factory.
    stream_factory: Option<Arc<dyn StreamFactory>>,
    /// Optional voice path.
    voice: Option<Arc<dyn VoiceRouter>>,
    /// Post-processing hooks handed to every output stream.
    observers: Vec<Arc<dyn StreamLifecycleObserver>>,
    /// Event callback.
    event_callback: Option<EventCallback>,
    /// Tunables.
    config: HalConfig,
}

impl Default for HalModuleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HalModuleBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            backend: None,
            stream_factory: None,
            voice: None,
            observers: Vec::new(),
            event_callback: None,
            config: HalConfig::default(),
        }
    }

    /// Set the platform backend. Required.
    pub fn backend(mut self, backend: Arc<dyn PlatformBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the factory that creates stream objects. Required.
    pub fn stream_factory(mut self, factory: Arc<dyn StreamFactory>) -> Self {
        self.stream_factory = Some(factory);
        self
    }

    /// Set the voice path, routed alongside every playback patch.
    pub fn voice_router(mut self, voice: Arc<dyn VoiceRouter>) -> Self {
        self.voice = Some(voice);
        self
    }

    /// Add a lifecycle observer bound to every output stream opened later.
    pub fn observer(mut self, observer: Arc<dyn StreamLifecycleObserver>) -> Self {
        tracing::debug!(observer = observer.name(), "observer registered");
        self.observers.push(observer);
        self
    }

    /// Set a callback to receive runtime events.
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(HalEvent) + Send + Sync + 'static,
    {
        self.event_callback = Some(event_callback(callback));
        self
    }

    /// Set custom configuration.
    pub fn with_config(mut self, config: HalConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the builder configuration.
    fn validate(&self) -> Result<(), HalError> {
        if self.backend.is_none() {
            return Err(HalError::NoBackendConfigured);
        }
        if self.stream_factory.is_none() {
            return Err(HalError::NoStreamFactoryConfigured);
        }
        if self.config.max_patch_ports == 0 {
            return Err(HalError::invalid("max_patch_ports must be at least 1"));
        }
        if self.config.max_streams_per_controller <= 0 {
            return Err(HalError::invalid(
                "max_streams_per_controller must be positive",
            ));
        }
        Ok(())
    }

    /// Builds the module. The backend is not touched until
    /// [`HalModule::open()`].
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No backend is configured
    /// - No stream factory is configured
    /// - The configuration is out of range
    pub fn build(self) -> Result<HalModule, HalError> {
        self.validate()?;

        let (Some(backend), Some(stream_factory)) = (self.backend, self.stream_factory) else {
            return Err(HalError::NoBackendConfigured);
        };

        Ok(HalModule::new(ModuleParts {
            config: self.config,
            backend,
            stream_factory,
            voice: self.voice,
            observers: self.observers,
            event_callback: self.event_callback,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockBackend;
    use crate::stream::mock::MockStreamFactory;

    #[test]
    fn test_builder_requires_backend() {
        let result = HalModuleBuilder::new()
            .stream_factory(Arc::new(MockStreamFactory::new()))
            .build();
        assert!(matches!(result, Err(HalError::NoBackendConfigured)));
    }

    #[test]
    fn test_builder_requires_stream_factory() {
        let result = HalModuleBuilder::new()
            .backend(Arc::new(MockBackend::new()))
            .build();
        assert!(matches!(result, Err(HalError::NoStreamFactoryConfigured)));
    }

    #[test]
    fn test_builder_rejects_zero_ports() {
        let result = HalModuleBuilder::new()
            .backend(Arc::new(MockBackend::new()))
            .stream_factory(Arc::new(MockStreamFactory::new()))
            .with_config(HalConfig {
                max_patch_ports: 0,
                ..Default::default()
            })
            .build();
        assert!(matches!(result, Err(HalError::InvalidArgument { .. })));
    }

    #[test]
    fn test_builder_does_not_init_backend() {
        let backend = Arc::new(MockBackend::new());
        let _module = HalModuleBuilder::new()
            .backend(backend.clone())
            .stream_factory(Arc::new(MockStreamFactory::new()))
            .build()
            .unwrap();
        assert_eq!(backend.init_calls(), 0);
    }
}
