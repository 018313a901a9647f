//! Mock platform backend for testing without hardware.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::{PlatformBackend, PlatformCallback, PlatformEvent, PlatformParam, PlatformQuery, PlatformValue};
use crate::{BackendError, HalError};

/// A backend that records every parameter and can replay platform events.
///
/// # Example
///
/// ```
/// use hal_route::backend::mock::MockBackend;
/// use hal_route::backend::{PlatformBackend, PlatformParam};
///
/// let backend = MockBackend::new();
/// backend.set_param(&PlatformParam::ScreenState { on: true }).unwrap();
/// assert_eq!(backend.params(), vec![PlatformParam::ScreenState { on: true }]);
/// ```
pub struct MockBackend {
    params: Mutex<Vec<PlatformParam>>,
    callback: Mutex<Option<PlatformCallback>>,
    init_calls: AtomicUsize,
    deinit_calls: AtomicUsize,
    init_failure: Mutex<Option<BackendError>>,
    param_failure: Mutex<Option<BackendError>>,
    callback_failure: Mutex<Option<BackendError>>,
    a2dp_reply: Mutex<Result<PlatformValue, BackendError>>,
}

impl MockBackend {
    /// Creates a backend that accepts everything.
    pub fn new() -> Self {
        Self {
            params: Mutex::new(Vec::new()),
            callback: Mutex::new(None),
            init_calls: AtomicUsize::new(0),
            deinit_calls: AtomicUsize::new(0),
            init_failure: Mutex::new(None),
            param_failure: Mutex::new(None),
            callback_failure: Mutex::new(None),
            a2dp_reply: Mutex::new(Ok(PlatformValue::A2dpReconfigSupported(true))),
        }
    }

    /// Makes `init()` fail.
    pub fn fail_init_with(&self, error: BackendError) {
        *self.init_failure.lock() = Some(error);
    }

    /// Makes every `set_param()` fail after recording the parameter.
    pub fn fail_params_with(&self, error: BackendError) {
        *self.param_failure.lock() = Some(error);
    }

    /// Makes callback registration fail.
    pub fn fail_callback_registration_with(&self, error: BackendError) {
        *self.callback_failure.lock() = Some(error);
    }

    /// Sets the reply to [`PlatformQuery::A2dpReconfigSupported`].
    pub fn set_a2dp_reply(&self, reply: Result<PlatformValue, BackendError>) {
        *self.a2dp_reply.lock() = reply;
    }

    /// Every parameter pushed so far, failed ones included.
    pub fn params(&self) -> Vec<PlatformParam> {
        self.params.lock().clone()
    }

    /// Forgets the recorded parameters.
    pub fn clear_params(&self) {
        self.params.lock().clear();
    }

    /// Number of `init()` calls.
    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    /// Number of `deinit()` calls.
    pub fn deinit_calls(&self) -> usize {
        self.deinit_calls.load(Ordering::SeqCst)
    }

    /// Returns `true` if a global callback is installed.
    pub fn has_callback(&self) -> bool {
        self.callback.lock().is_some()
    }

    /// Delivers `event` to the installed callback, as the platform would.
    ///
    /// # Errors
    ///
    /// Returns the callback's result, or [`HalError::InvalidArgument`] if no
    /// callback is installed.
    pub fn raise(&self, event: PlatformEvent) -> Result<(), HalError> {
        let callback = self.callback.lock().clone();
        match callback {
            Some(callback) => callback(event),
            None => Err(HalError::invalid("no global callback registered")),
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformBackend for MockBackend {
    fn init(&self) -> Result<(), BackendError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        match self.init_failure.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn deinit(&self) {
        self.deinit_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn set_param(&self, param: &PlatformParam) -> Result<(), BackendError> {
        self.params.lock().push(param.clone());
        match self.param_failure.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn get_param(&self, query: PlatformQuery) -> Result<PlatformValue, BackendError> {
        match query {
            PlatformQuery::A2dpReconfigSupported => self.a2dp_reply.lock().clone(),
        }
    }

    fn register_global_callback(&self, callback: PlatformCallback) -> Result<(), BackendError> {
        if let Some(err) = self.callback_failure.lock().clone() {
            return Err(err);
        }
        *self.callback.lock() = Some(callback);
        Ok(())
    }
}
