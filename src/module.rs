//! Module open/close with backend initialisation.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::PlatformBackend;
use crate::device_facade::HalDevice;
use crate::stream::{StreamFactory, StreamLifecycleObserver};
use crate::voice::VoiceRouter;
use crate::{EventCallback, HalConfig, HalError, HalModuleBuilder};

/// Everything a [`HalDevice`] is built from.
pub(crate) struct ModuleParts {
    pub config: HalConfig,
    pub backend: Arc<dyn PlatformBackend>,
    pub stream_factory: Arc<dyn StreamFactory>,
    pub voice: Option<Arc<dyn VoiceRouter>>,
    pub observers: Vec<Arc<dyn StreamLifecycleObserver>>,
    pub event_callback: Option<EventCallback>,
}

/// Guarded by the init lock.
struct OpenState {
    ref_count: usize,
    device: Option<Arc<HalDevice>>,
}

/// Entry point of the routing core.
///
/// The first [`open()`](Self::open) initialises the backend, builds the
/// [`HalDevice`] and registers the platform event callback; later opens
/// share that device. The last [`close()`](Self::close) shuts the backend
/// down. Nothing is global: each module is independent.
pub struct HalModule {
    parts: ModuleParts,
    open: Mutex<OpenState>,
}

impl HalModule {
    /// Creates a builder for configuring the module.
    pub fn builder() -> HalModuleBuilder {
        HalModuleBuilder::new()
    }

    pub(crate) fn new(parts: ModuleParts) -> Self {
        Self {
            parts,
            open: Mutex::new(OpenState {
                ref_count: 0,
                device: None,
            }),
        }
    }

    /// Opens the module, returning the shared device.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::Backend`] if the backend fails to initialise. A
    /// failed callback registration is logged but not fatal.
    pub fn open(&self) -> Result<Arc<HalDevice>, HalError> {
        let mut open = self.open.lock();

        if open.ref_count != 0 {
            if let Some(device) = open.device.clone() {
                open.ref_count += 1;
                tracing::debug!(ref_count = open.ref_count, "returning existing device");
                return Ok(device);
            }
        }

        if let Err(err) = self.parts.backend.init() {
            tracing::error!(error = %err, "backend init failed");
            return Err(err.into());
        }

        let device = Arc::new(HalDevice::new(&self.parts));
        if let Err(err) = self
            .parts
            .backend
            .register_global_callback(device.monitor().platform_callback())
        {
            tracing::error!(error = %err, "registering the platform callback failed");
        }

        open.ref_count = 1;
        open.device = Some(Arc::clone(&device));
        tracing::info!("hal module opened");
        Ok(device)
    }

    /// Drops one reference; the last one shuts the backend down.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::InvalidArgument`] if the module is not open.
    pub fn close(&self) -> Result<(), HalError> {
        let mut open = self.open.lock();
        if open.ref_count == 0 {
            return Err(HalError::invalid("hal module is not open"));
        }

        open.ref_count -= 1;
        if open.ref_count == 0 {
            open.device = None;
            self.parts.backend.deinit();
            tracing::info!("hal module closed");
        } else {
            tracing::debug!(ref_count = open.ref_count, "hal module reference dropped");
        }
        Ok(())
    }

    /// Number of outstanding opens.
    pub fn ref_count(&self) -> usize {
        self.open.lock().ref_count
    }

    /// Returns `true` while at least one open is outstanding.
    pub fn is_open(&self) -> bool {
        self.ref_count() != 0
    }
}

impl std::fmt::Debug for HalModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HalModule")
            .field("config", &self.parts.config)
            .field("ref_count", &self.ref_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockBackend;
    use crate::stream::mock::MockStreamFactory;
    use crate::BackendError;

    fn module(backend: Arc<MockBackend>) -> HalModule {
        HalModule::builder()
            .backend(backend)
            .stream_factory(Arc::new(MockStreamFactory::new()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_open_is_reference_counted() {
        let backend = Arc::new(MockBackend::new());
        let module = module(backend.clone());

        let first = module.open().unwrap();
        let second = module.open().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(module.ref_count(), 2);
        assert_eq!(backend.init_calls(), 1);
        assert!(backend.has_callback());

        module.close().unwrap();
        assert_eq!(backend.deinit_calls(), 0);
        module.close().unwrap();
        assert_eq!(backend.deinit_calls(), 1);
        assert!(!module.is_open());
    }

    #[test]
    fn test_close_when_not_open() {
        let module = module(Arc::new(MockBackend::new()));
        assert!(matches!(
            module.close(),
            Err(HalError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_init_failure() {
        let backend = Arc::new(MockBackend::new());
        backend.fail_init_with(BackendError::rejected(-22));
        let module = module(backend.clone());

        let err = module.open().unwrap_err();
        assert!(matches!(err, HalError::Backend(_)));
        assert_eq!(module.ref_count(), 0);
        assert!(!backend.has_callback());
    }

    #[test]
    fn test_callback_registration_failure_is_not_fatal() {
        let backend = Arc::new(MockBackend::new());
        backend.fail_callback_registration_with(BackendError::custom("busy"));
        let module = module(backend.clone());

        module.open().unwrap();
        assert_eq!(module.ref_count(), 1);
        assert!(!backend.has_callback());
    }

    #[test]
    fn test_reopen_after_close_reinitialises() {
        let backend = Arc::new(MockBackend::new());
        let module = module(backend.clone());

        module.open().unwrap();
        module.close().unwrap();
        module.open().unwrap();
        assert_eq!(backend.init_calls(), 2);
    }
}
